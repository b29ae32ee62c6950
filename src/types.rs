//! A2A protocol types: the wire data model the recording client speaks.
//!
//! Deserialization is deliberately forgiving where the protocol has drifted
//! between agent implementations: task status may arrive as a bare string or a
//! `{ "state": ... }` object, task history may live under `history` or the
//! legacy `messages` key, and unknown states coerce to [`TaskState::Pending`].
//!
//! Untyped JSON-RPC results are turned into typed values by two ordered
//! classifiers: [`SendMessageResponse::classify`] for unary results and
//! [`StreamEvent::classify`] for SSE frames.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::error::{A2AError, A2AResult};

// ============================================================================
// Enums
// ============================================================================

/// The lifecycle state of a task.
///
/// Parsing never fails: anything outside the seven known states (including a
/// missing status) becomes [`TaskState::Pending`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskState {
    /// Task has been received but not yet started.
    #[default]
    Pending,
    /// Task is actively being processed.
    Working,
    /// Task requires additional input from the user.
    InputRequired,
    /// Task completed successfully.
    Completed,
    /// Task failed.
    Failed,
    /// Task was canceled.
    Canceled,
    /// Task was rejected by the agent.
    Rejected,
}

impl TaskState {
    /// All seven states, in lifecycle order.
    pub const ALL: [TaskState; 7] = [
        TaskState::Pending,
        TaskState::Working,
        TaskState::InputRequired,
        TaskState::Completed,
        TaskState::Failed,
        TaskState::Canceled,
        TaskState::Rejected,
    ];

    /// Wire name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Pending => "pending",
            TaskState::Working => "working",
            TaskState::InputRequired => "input_required",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Canceled => "canceled",
            TaskState::Rejected => "rejected",
        }
    }

    /// Coerce a wire string into a state. Unknown values yield `Pending`.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            "working" => TaskState::Working,
            "input_required" | "input-required" => TaskState::InputRequired,
            "completed" => TaskState::Completed,
            "failed" => TaskState::Failed,
            "canceled" => TaskState::Canceled,
            "rejected" => TaskState::Rejected,
            _ => TaskState::Pending,
        }
    }

    /// Coerce a wire `status` field, which is either a bare state string or an
    /// object carrying a `state` key.
    pub fn from_status_value(status: Option<&Value>) -> Self {
        match status {
            Some(Value::String(s)) => Self::from_wire(s),
            Some(Value::Object(obj)) => obj
                .get("state")
                .and_then(Value::as_str)
                .map(Self::from_wire)
                .unwrap_or_default(),
            _ => TaskState::Pending,
        }
    }

    /// Whether the task can no longer change state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled | TaskState::Rejected
        )
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TaskState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TaskState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(TaskState::from_status_value(Some(&value)))
    }
}

/// The role of a message sender.
///
/// Anything other than `"user"` on the wire (`"agent"`, `"assistant"`, ...)
/// is treated as agent-authored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Message from the user / client.
    User,
    /// Message from the remote agent.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(if raw == "user" {
            Role::User
        } else {
            Role::Assistant
        })
    }
}

// ============================================================================
// Message & Parts
// ============================================================================

/// A content part within a message or artifact.
///
/// JSON wire format:
/// - Text: `{"kind": "text", "text": "hello"}`
/// - Data: `{"kind": "data", "data": {"key": "value"}, "mimeType": "application/json"}`
///
/// Other part kinds (files, future extensions) deserialize to
/// [`Part::Unsupported`] so that one exotic part does not reject a whole task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Part {
    /// A text content part.
    #[serde(rename = "text")]
    Text {
        /// The text content.
        text: String,
    },
    /// A structured data content part.
    #[serde(rename = "data", rename_all = "camelCase")]
    Data {
        /// Arbitrary structured data.
        data: Value,
        /// MIME type of the data.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
    /// A part kind this client does not interpret.
    #[serde(other)]
    Unsupported,
}

impl Part {
    /// Create a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// Create a data part.
    pub fn data(data: Value, mime_type: Option<String>) -> Self {
        Part::Data { data, mime_type }
    }

    /// The text of a text part, `None` for everything else.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique message identifier.
    #[serde(default)]
    pub message_id: String,

    /// Who sent this message.
    pub role: Role,

    /// Discriminator field — always "message".
    #[serde(default = "kind_message")]
    pub kind: String,

    /// Content parts of the message.
    #[serde(default)]
    pub parts: Vec<Part>,

    /// Context this message belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    /// Task this message is associated with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Message {
    /// Create a message with a fresh id.
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self {
            message_id: uuid::Uuid::new_v4().to_string(),
            role,
            kind: kind_message(),
            parts,
            context_id: None,
            task_id: None,
            metadata: None,
        }
    }

    /// Set the context id (builder-style).
    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = Some(context_id.into());
        self
    }
}

/// An artifact produced by a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    /// Unique artifact identifier.
    #[serde(default)]
    pub artifact_id: String,

    /// Human-readable name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Description of the artifact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Content parts of the artifact.
    #[serde(default)]
    pub parts: Vec<Part>,

    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

// ============================================================================
// Core Task Types
// ============================================================================

/// A task, the protocol's unit of long-running work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "WireTask")]
pub struct Task {
    /// Unique task identifier.
    pub id: String,

    /// Current task state.
    pub status: TaskState,

    /// Message history, from `history` or the legacy `messages` field.
    #[serde(rename = "history")]
    pub messages: Vec<Message>,

    /// Artifacts produced by the task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<Artifact>>,

    /// Context identifier (groups related tasks/messages).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    /// Creation timestamp as sent by the agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    /// Last-update timestamp as sent by the agent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Lenient on-the-wire shape of a task.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTask {
    #[serde(default)]
    id: String,
    #[serde(default)]
    status: Option<Value>,
    #[serde(default)]
    history: Option<Vec<Message>>,
    #[serde(default)]
    messages: Option<Vec<Message>>,
    #[serde(default)]
    artifacts: Option<Vec<Artifact>>,
    #[serde(default)]
    context_id: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

impl From<WireTask> for Task {
    fn from(wire: WireTask) -> Self {
        Task {
            id: wire.id,
            status: TaskState::from_status_value(wire.status.as_ref()),
            messages: wire.history.or(wire.messages).unwrap_or_default(),
            artifacts: wire.artifacts,
            context_id: wire.context_id,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
        }
    }
}

// ============================================================================
// Streaming Events
// ============================================================================

/// Notification that a task's status has changed.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    /// ID of the task whose status changed.
    pub task_id: String,
    /// Context this task belongs to.
    pub context_id: Option<String>,
    /// The new state.
    pub status: TaskState,
    /// Whether this is the last status update of the stream.
    pub r#final: bool,
    /// Optional message attached to the status.
    pub message: Option<Message>,
}

/// Notification that an artifact has been created or updated.
#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactEvent {
    /// ID of the task that produced the artifact.
    pub task_id: String,
    /// The artifact.
    pub artifact: Artifact,
}

/// A typed event decoded from one SSE frame.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Task status changed.
    Status(StatusEvent),
    /// Artifact produced.
    Artifact(ArtifactEvent),
    /// Direct message from the agent.
    Message(Message),
    /// Full task snapshot.
    TaskSnapshot(Task),
}

impl StreamEvent {
    /// Classify an untyped JSON-RPC `result` object.
    ///
    /// Precedence is fixed: status > artifact > task snapshot > message.
    /// - status: has `status` and either `taskId` or `final`
    /// - artifact: has `artifact`
    /// - task snapshot: has `status` (and is not a status event)
    /// - message: has `role`
    pub fn classify(value: &Value) -> A2AResult<StreamEvent> {
        let obj = value
            .as_object()
            .ok_or_else(|| A2AError::unknown_response(value))?;

        if obj.contains_key("status") && (obj.contains_key("taskId") || obj.contains_key("final"))
        {
            let status_value = obj.get("status");
            let message = status_value
                .and_then(|s| s.get("message"))
                .or_else(|| obj.get("message"))
                .filter(|m| !m.is_null())
                .map(|m| from_value::<Message>(m.clone()))
                .transpose()?;
            return Ok(StreamEvent::Status(StatusEvent {
                task_id: str_field(obj, "taskId").unwrap_or_default(),
                context_id: str_field(obj, "contextId"),
                status: TaskState::from_status_value(status_value),
                r#final: obj.get("final").and_then(Value::as_bool).unwrap_or(false),
                message,
            }));
        }

        if let Some(artifact) = obj.get("artifact") {
            return Ok(StreamEvent::Artifact(ArtifactEvent {
                task_id: str_field(obj, "taskId").unwrap_or_default(),
                artifact: from_value(artifact.clone())?,
            }));
        }

        if obj.contains_key("status") {
            return Ok(StreamEvent::TaskSnapshot(from_value(value.clone())?));
        }

        if obj.contains_key("role") {
            return Ok(StreamEvent::Message(from_value(value.clone())?));
        }

        Err(A2AError::unknown_response(value))
    }
}

// ============================================================================
// Unary results
// ============================================================================

/// Response payload for `message/send`, `tasks/get` and `tasks/cancel`.
#[derive(Debug, Clone, PartialEq)]
pub enum SendMessageResponse {
    /// A task was created/updated.
    Task(Task),

    /// A direct message response.
    Message(Message),
}

impl SendMessageResponse {
    /// Classify an untyped JSON-RPC `result`: a `status` field means Task,
    /// a `role` field means Message, anything else is an unknown response.
    pub fn classify(result: &Value) -> A2AResult<Self> {
        if result.get("status").is_some() {
            return Ok(SendMessageResponse::Task(from_value(result.clone())?));
        }
        if result.get("role").is_some() {
            return Ok(SendMessageResponse::Message(from_value(result.clone())?));
        }
        Err(A2AError::unknown_response(result))
    }

    /// The task, if this response is one.
    pub fn into_task(self) -> Option<Task> {
        match self {
            SendMessageResponse::Task(task) => Some(task),
            SendMessageResponse::Message(_) => None,
        }
    }
}

impl Serialize for SendMessageResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SendMessageResponse::Task(inner) => inner.serialize(serializer),
            SendMessageResponse::Message(inner) => inner.serialize(serializer),
        }
    }
}

// ============================================================================
// Agent Card & Related Types
// ============================================================================

/// Self-describing manifest for an A2A agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    /// Human-readable name.
    pub name: String,

    /// Primary URL for the agent.
    pub url: String,

    /// Agent version string.
    pub version: String,

    /// Description of the agent's capabilities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Protocol version advertised by the agent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,

    /// Agent capabilities.
    #[serde(default)]
    pub capabilities: AgentCapabilities,

    /// Skills the agent supports.
    #[serde(default)]
    pub skills: Vec<AgentSkill>,

    /// Default MIME types accepted as input.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_input_modes: Vec<String>,

    /// Default MIME types produced as output.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub default_output_modes: Vec<String>,
}

impl AgentCard {
    /// Fields every card must carry, checked before deserialization.
    pub const REQUIRED_FIELDS: [&'static str; 3] = ["name", "url", "version"];

    /// Structurally validate and parse a card.
    ///
    /// Each required field must be present and be a string.
    pub fn from_json(value: &Value) -> A2AResult<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| A2AError::validation("agent card must be a JSON object"))?;
        for field in Self::REQUIRED_FIELDS {
            match obj.get(field) {
                Some(Value::String(_)) => {}
                Some(_) => {
                    return Err(A2AError::validation(format!(
                        "agent card field '{field}' must be a string"
                    )))
                }
                None => {
                    return Err(A2AError::validation(format!(
                        "agent card missing required field '{field}'"
                    )))
                }
            }
        }
        serde_json::from_value(value.clone())
            .map_err(|e| A2AError::validation(format!("invalid agent card: {e}")))
    }

    /// Whether the agent advertises SSE streaming.
    pub fn supports_streaming(&self) -> bool {
        self.capabilities.streaming.unwrap_or(false)
    }
}

/// Agent capabilities declaration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    /// Whether the agent supports streaming responses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub streaming: Option<bool>,

    /// Whether the agent supports push notifications.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub push_notifications: Option<bool>,

    /// Whether the agent provides a history of state transitions for a task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_transition_history: Option<bool>,

    /// Capability flags this crate does not model explicitly.
    #[serde(flatten)]
    pub other: serde_json::Map<String, Value>,
}

/// A skill that an agent can perform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    /// Unique skill identifier.
    pub id: String,

    /// Human-readable skill name.
    pub name: String,

    /// Description of what the skill does.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Categorization tags.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Example prompts/inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Vec<String>>,
}

// ============================================================================
// JSON-RPC Foundation
// ============================================================================

/// A JSON-RPC 2.0 request ID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcId {
    /// String identifier.
    String(String),
    /// Numeric identifier.
    Number(i64),
}

impl fmt::Display for JsonRpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsonRpcId::String(s) => write!(f, "{}", s),
            JsonRpcId::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A JSON-RPC 2.0 request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version — always "2.0".
    pub jsonrpc: String,

    /// Request identifier.
    pub id: JsonRpcId,

    /// Method name.
    pub method: String,

    /// Method parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a request with a fresh UUID id.
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: JsonRpcId::String(uuid::Uuid::new_v4().to_string()),
            method: method.into(),
            params,
        }
    }
}

/// Unwrap a JSON-RPC 2.0 response envelope into its `result`.
///
/// The envelope is read loosely: an `error` member becomes
/// [`A2AError::JsonRpc`] whatever the types of its `code` and `message`, the
/// `id` is ignored, and a payload with neither `error` nor `result` is an
/// unknown response.
pub fn unwrap_envelope(mut envelope: Value) -> A2AResult<Value> {
    if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
        return Err(json_rpc_error(error));
    }
    match envelope.get_mut("result") {
        Some(result) => Ok(result.take()),
        None => Err(A2AError::unknown_response(&envelope)),
    }
}

fn json_rpc_error(error: &Value) -> A2AError {
    let text = |field: &str| match error.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    };
    let code = match error.get("code") {
        Some(Value::Null) | None => "unknown".to_string(),
        _ => text("code"),
    };
    let message = match error {
        Value::Object(_) => text("message"),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    A2AError::JsonRpc {
        code,
        message,
        data: error.get("data").cloned(),
    }
}

// ============================================================================
// Request / Response Parameter Types
// ============================================================================

/// Parameters for `message/send` and `message/stream`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageParams {
    /// The message to send.
    pub message: Message,

    /// Optional send configuration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<SendMessageConfiguration>,

    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl SendMessageParams {
    /// Wrap a message with no configuration.
    pub fn new(message: Message) -> Self {
        Self {
            message,
            configuration: None,
            metadata: None,
        }
    }
}

/// Configuration for a `message/send` request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageConfiguration {
    /// MIME types the client can accept as output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepted_output_modes: Option<Vec<String>>,

    /// Maximum number of history messages to include in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<u32>,

    /// Whether the request should block until the task completes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocking: Option<bool>,
}

/// Parameters for `tasks/get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTaskParams {
    /// Task ID to retrieve.
    pub id: String,

    /// Maximum number of history messages to include.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history_length: Option<u32>,
}

/// Parameters for `tasks/list`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksParams {
    /// Filter by context ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,

    /// Filter by task state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskState>,

    /// Maximum number of tasks to return per page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,

    /// Token for paginating through results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

/// Response for `tasks/list`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksResponse {
    /// Tasks matching the query.
    #[serde(default)]
    pub tasks: Vec<Task>,

    /// Token for retrieving the next page, absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,

    /// Total number of matching tasks, when the agent reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size: Option<u64>,
}

/// Parameters for `tasks/cancel`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelTaskParams {
    /// ID of the task to cancel.
    pub id: String,

    /// Arbitrary metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

// ============================================================================
// Helpers
// ============================================================================

fn kind_message() -> String {
    "message".to_string()
}

fn str_field(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

pub(crate) fn from_value<T: serde::de::DeserializeOwned>(value: Value) -> A2AResult<T> {
    let raw = value.to_string();
    serde_json::from_value(value).map_err(|e| A2AError::invalid_json(e.to_string(), &raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn task_state_round_trips_every_known_value() {
        for state in TaskState::ALL {
            assert_eq!(TaskState::from_wire(state.as_str()), state);
        }
    }

    #[test]
    fn unknown_or_missing_status_parses_to_pending() {
        let missing: Task = serde_json::from_value(json!({"id": "t1"})).unwrap();
        assert_eq!(missing.status, TaskState::Pending);

        let bogus: Task = serde_json::from_value(json!({"id": "t1", "status": "exploded"})).unwrap();
        assert_eq!(bogus.status, TaskState::Pending);

        let wrong_type: Task = serde_json::from_value(json!({"id": "t1", "status": 42})).unwrap();
        assert_eq!(wrong_type.status, TaskState::Pending);
    }

    #[test]
    fn status_object_form_is_accepted() {
        let task: Task = serde_json::from_value(json!({
            "id": "t1",
            "status": {"state": "input-required", "timestamp": "2024-01-01T00:00:00Z"}
        }))
        .unwrap();
        assert_eq!(task.status, TaskState::InputRequired);
    }

    #[test]
    fn history_wins_over_legacy_messages() {
        let task: Task = serde_json::from_value(json!({
            "id": "t1",
            "status": "completed",
            "history": [{"role": "user", "parts": [{"kind": "text", "text": "new"}]}],
            "messages": [{"role": "user", "parts": [{"kind": "text", "text": "old"}]}]
        }))
        .unwrap();
        assert_eq!(task.messages.len(), 1);
        assert_eq!(task.messages[0].parts[0].as_text(), Some("new"));

        let legacy: Task = serde_json::from_value(json!({
            "id": "t2",
            "status": "working",
            "messages": [{"role": "agent", "parts": []}]
        }))
        .unwrap();
        assert_eq!(legacy.messages.len(), 1);
        assert_eq!(legacy.messages[0].role, Role::Assistant);
    }

    #[test]
    fn unrecognized_part_kind_does_not_fail_message() {
        let msg: Message = serde_json::from_value(json!({
            "role": "agent",
            "parts": [
                {"kind": "file", "file": {"uri": "https://example.com/a.pdf"}},
                {"kind": "data", "data": {"k": 1}, "mimeType": "application/json"}
            ]
        }))
        .unwrap();
        assert_eq!(msg.parts[0], Part::Unsupported);
        assert_eq!(
            msg.parts[1],
            Part::data(json!({"k": 1}), Some("application/json".to_string()))
        );
    }

    #[test]
    fn classify_result_prefers_status_over_role() {
        let both = json!({"id": "t1", "status": "working", "role": "agent"});
        assert!(matches!(
            SendMessageResponse::classify(&both).unwrap(),
            SendMessageResponse::Task(_)
        ));

        let msg = json!({"role": "agent", "parts": [{"kind": "text", "text": "hi"}]});
        assert!(matches!(
            SendMessageResponse::classify(&msg).unwrap(),
            SendMessageResponse::Message(_)
        ));

        let neither = json!({"foo": "bar"});
        let err = SendMessageResponse::classify(&neither).unwrap_err();
        assert!(err.to_string().contains("unknown response type"));
    }

    #[test]
    fn stream_classification_precedence() {
        let status = json!({"taskId": "t1", "status": {"state": "working"}, "final": false});
        match StreamEvent::classify(&status).unwrap() {
            StreamEvent::Status(ev) => {
                assert_eq!(ev.task_id, "t1");
                assert_eq!(ev.status, TaskState::Working);
                assert!(!ev.r#final);
            }
            other => panic!("expected status, got {other:?}"),
        }

        // `artifact` plus `status` still classifies as status first.
        let mixed = json!({"taskId": "t1", "status": "working", "artifact": {"parts": []}});
        assert!(matches!(
            StreamEvent::classify(&mixed).unwrap(),
            StreamEvent::Status(_)
        ));

        let artifact = json!({"taskId": "t1", "artifact": {"artifactId": "a1", "parts": []}});
        assert!(matches!(
            StreamEvent::classify(&artifact).unwrap(),
            StreamEvent::Artifact(_)
        ));

        let snapshot = json!({"id": "t1", "status": "completed", "role": "agent"});
        assert!(matches!(
            StreamEvent::classify(&snapshot).unwrap(),
            StreamEvent::TaskSnapshot(_)
        ));

        let message = json!({"role": "agent", "parts": []});
        assert!(matches!(
            StreamEvent::classify(&message).unwrap(),
            StreamEvent::Message(_)
        ));

        assert!(StreamEvent::classify(&json!({"hello": 1})).is_err());
        assert!(StreamEvent::classify(&json!("text")).is_err());
    }

    #[test]
    fn agent_card_requires_name_url_version() {
        let ok = json!({"name": "A", "url": "https://a.example", "version": "1"});
        let card = AgentCard::from_json(&ok).unwrap();
        assert_eq!(card.name, "A");
        assert!(!card.supports_streaming());

        let missing = json!({"name": "A", "url": "https://a.example"});
        let err = AgentCard::from_json(&missing).unwrap_err();
        assert!(err.to_string().contains("version"));

        let wrong = json!({"name": "A", "url": 3, "version": "1"});
        assert!(AgentCard::from_json(&wrong).is_err());
    }

    #[test]
    fn capabilities_keep_unknown_flags() {
        let card = AgentCard::from_json(&json!({
            "name": "A", "url": "u", "version": "1",
            "capabilities": {"streaming": true, "extendedAgentCard": true}
        }))
        .unwrap();
        assert!(card.supports_streaming());
        assert_eq!(card.capabilities.other.get("extendedAgentCard"), Some(&json!(true)));
    }

    #[test]
    fn json_rpc_error_unwraps() {
        let err = unwrap_envelope(json!({
            "jsonrpc": "2.0", "id": "1",
            "error": {"code": -32601, "message": "Method not found"}
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "-32601: Method not found");
        assert_eq!(err.code(), -32601);
    }

    #[test]
    fn json_rpc_error_with_string_code() {
        let err = unwrap_envelope(json!({
            "jsonrpc": "2.0", "id": 1,
            "error": {"code": "E_BUSY", "message": "agent busy"}
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "E_BUSY: agent busy");
        assert_eq!(err.code(), crate::error::INTERNAL_ERROR);
    }

    #[test]
    fn envelope_id_shape_is_not_checked() {
        let result = unwrap_envelope(json!({
            "jsonrpc": "2.0", "id": 1.5,
            "result": {"role": "agent", "parts": []}
        }))
        .unwrap();
        assert_eq!(result["role"], "agent");
    }

    #[test]
    fn envelope_without_result_is_unknown() {
        let err = unwrap_envelope(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, A2AError::UnknownResponse { .. }));
        assert!(err.to_string().contains("[1,2,3]"));
    }

    #[test]
    fn request_ids_are_unique() {
        let a = JsonRpcRequest::new("message/send", None);
        let b = JsonRpcRequest::new("message/send", None);
        assert_ne!(a.id, b.id);
        assert_eq!(a.jsonrpc, "2.0");
    }
}
