//! High-level A2A client for interacting with remote agents.
//!
//! Composes the unary transport, the SSE stream reader and the card resolver
//! behind typed methods for each JSON-RPC operation.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::{A2AError, A2AResult};
use crate::types::{
    CancelTaskParams, GetTaskParams, JsonRpcRequest, ListTasksParams, ListTasksResponse, Message,
    Role, SendMessageParams, SendMessageResponse, Task,
};
use crate::utils::constants::{methods, DEFAULT_STREAM_TIMEOUT, STREAM_PATH};
use crate::utils::create_text_message;

use super::card_resolver::{CardFetchOptions, CardFetchResult, CardResolver};
use super::guard;
use super::sse::{run_stream, StreamHandler, StreamOptions, StreamOutcome, StreamRequest};
use super::transport::{private_target_error, JsonRpcTransport, TransportConfig};

/// Client for interacting with A2A-compatible agents.
///
/// Provides typed methods for the A2A JSON-RPC methods:
/// - `message/send`: send a message and get a task or message back
/// - `message/stream`: send a message and receive status/artifact updates over SSE
/// - `tasks/get`: retrieve a task by ID
/// - `tasks/list`: list tasks with filtering and pagination
/// - `tasks/cancel`: cancel a running task
///
/// The target URL is validated once at construction (malformed URLs and,
/// unless `allow_local` is set, private addresses fail fast) and again on
/// every call.
///
/// ```no_run
/// use a2a_recorder::client::A2AClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = A2AClient::new("https://agent.example.com/a2a")?;
/// let response = client.send_text("Hello, agent!").await?;
/// println!("{response:?}");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct A2AClient {
    transport: JsonRpcTransport,
    stream_url: Url,
    stream_timeout: Duration,
}

impl A2AClient {
    /// Create a client for the agent at `url` with default configuration.
    pub fn new(url: &str) -> A2AResult<Self> {
        Self::with_config(url, TransportConfig::default())
    }

    /// Create a client with a custom transport configuration.
    pub fn with_config(url: &str, config: TransportConfig) -> A2AResult<Self> {
        Self::from_transport(JsonRpcTransport::with_config(url, config)?)
    }

    /// Start a [`ClientBuilder`] for `url`.
    pub fn builder(url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(url)
    }

    /// Wrap an existing transport.
    pub fn from_transport(transport: JsonRpcTransport) -> A2AResult<Self> {
        let stream_url = stream_endpoint(transport.url())?;
        Ok(Self {
            transport,
            stream_url,
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
        })
    }

    /// The agent base URL unary calls are posted to.
    pub fn base_url(&self) -> &Url {
        self.transport.url()
    }

    /// The SSE endpoint, `<base>/message/stream`.
    pub fn stream_url(&self) -> &Url {
        &self.stream_url
    }

    /// The underlying unary transport.
    pub fn transport(&self) -> &JsonRpcTransport {
        &self.transport
    }

    // ──────────────────────────────────────────────────
    // Core A2A JSON-RPC Methods
    // ──────────────────────────────────────────────────

    /// Send a prepared JSON-RPC request and return the raw `result`.
    ///
    /// Use this when the request id is needed up front, e.g. to correlate
    /// the call in a [`SessionRecorder`](crate::recorder::SessionRecorder).
    pub async fn call(
        &self,
        request: &JsonRpcRequest,
        headers: &HashMap<String, String>,
    ) -> A2AResult<Value> {
        self.transport.send(request, headers).await
    }

    /// Send a message to the agent (`message/send`).
    ///
    /// The agent answers with either a [`Task`] or a direct [`Message`].
    pub async fn send_message(&self, params: SendMessageParams) -> A2AResult<SendMessageResponse> {
        let request = build_request(methods::MESSAGE_SEND, &params)?;
        let result = self.call(&request, &HashMap::new()).await?;
        SendMessageResponse::classify(&result)
    }

    /// Get the current state of a task (`tasks/get`).
    pub async fn get_task(&self, task_id: &str, history_length: Option<u32>) -> A2AResult<Task> {
        let params = GetTaskParams {
            id: task_id.to_string(),
            history_length,
        };
        let request = build_request(methods::TASKS_GET, &params)?;
        let result = self.call(&request, &HashMap::new()).await?;
        expect_task(&result)
    }

    /// List tasks, optionally filtered by context and status (`tasks/list`).
    pub async fn list_tasks(&self, params: ListTasksParams) -> A2AResult<ListTasksResponse> {
        let request = build_request(methods::TASKS_LIST, &params)?;
        let result = self.call(&request, &HashMap::new()).await?;
        crate::types::from_value(result)
    }

    /// Cancel a running task (`tasks/cancel`).
    pub async fn cancel_task(&self, task_id: &str) -> A2AResult<Task> {
        let params = CancelTaskParams {
            id: task_id.to_string(),
            metadata: None,
        };
        let request = build_request(methods::TASKS_CANCEL, &params)?;
        let result = self.call(&request, &HashMap::new()).await?;
        expect_task(&result)
    }

    /// Send a message over SSE (`message/stream`) and feed every event to
    /// `handler`.
    ///
    /// Returns once a `final: true` status arrives or the server closes the
    /// stream, whichever comes first. The deadline is taken from `options`;
    /// [`stream_options`](Self::stream_options) starts from the client's
    /// configured stream timeout.
    pub async fn stream_message(
        &self,
        params: SendMessageParams,
        handler: &mut dyn StreamHandler,
        options: StreamOptions,
    ) -> A2AResult<StreamOutcome> {
        let config = self.transport.config();
        if !config.allow_local && guard::is_private(&self.stream_url) {
            return Err(private_target_error(self.stream_url.as_str()));
        }

        let request = build_request(methods::MESSAGE_STREAM, &params)?;
        debug!(url = %self.stream_url, id = %request.id, "starting message stream");

        let req = StreamRequest {
            client: self.transport.http_client(),
            url: &self.stream_url,
            request: &request,
            default_headers: &config.headers,
        };
        run_stream(req, &options, handler).await
    }

    /// Stream options carrying this client's stream timeout.
    pub fn stream_options(&self) -> StreamOptions {
        StreamOptions::default().with_timeout(self.stream_timeout)
    }

    /// Stream a single-text-part user message with [`stream_options`](Self::stream_options).
    pub async fn stream_text(
        &self,
        text: &str,
        handler: &mut dyn StreamHandler,
    ) -> A2AResult<StreamOutcome> {
        self.stream_message(text_params(text, None), handler, self.stream_options())
            .await
    }

    /// Discover the agent card at the client's base URL.
    pub async fn fetch_card(&self) -> CardFetchResult {
        let config = self.transport.config();
        let options = CardFetchOptions {
            headers: config.headers.clone(),
            allow_local: config.allow_local,
            ..CardFetchOptions::default()
        };
        CardResolver::with_client(self.transport.http_client().clone())
            .fetch(self.base_url().as_str(), &options)
            .await
    }

    // ──────────────────────────────────────────────────
    // Convenience Helpers
    // ──────────────────────────────────────────────────

    /// Send a single-text-part user message.
    pub async fn send_text(&self, text: &str) -> A2AResult<SendMessageResponse> {
        self.send_message(text_params(text, None)).await
    }

    /// Send a single-text-part user message within an existing context.
    pub async fn send_text_in_context(
        &self,
        text: &str,
        context_id: &str,
    ) -> A2AResult<SendMessageResponse> {
        self.send_message(text_params(text, Some(context_id))).await
    }
}

/// Builder for [`A2AClient`].
///
/// ```
/// use a2a_recorder::client::ClientBuilder;
/// use std::time::Duration;
///
/// let client = ClientBuilder::new("https://agent.example.com/a2a")
///     .with_timeout(Duration::from_secs(5))
///     .with_bearer_token("secret")
///     .build()?;
/// assert_eq!(client.stream_url().path(), "/a2a/message/stream");
/// # Ok::<(), a2a_recorder::A2AError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    url: String,
    config: TransportConfig,
    stream_timeout: Duration,
    http_client: Option<reqwest::Client>,
}

impl ClientBuilder {
    /// Create a new client builder for the given base URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            config: TransportConfig::default(),
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            http_client: None,
        }
    }

    /// Set the unary request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the default streaming deadline.
    pub fn with_stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// Add a custom HTTP header sent on every request.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(key.into(), value.into());
        self
    }

    /// Add an Authorization header with a bearer token.
    pub fn with_bearer_token(self, token: impl Into<String>) -> Self {
        let value = format!("Bearer {}", token.into());
        self.with_header("Authorization", value)
    }

    /// Add an API key header.
    pub fn with_api_key(self, header_name: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.with_header(header_name, api_key)
    }

    /// Permit loopback/private targets.
    pub fn with_allow_local(mut self, allow_local: bool) -> Self {
        self.config.allow_local = allow_local;
        self
    }

    /// Override the response body cap.
    pub fn with_max_response_bytes(mut self, max: u64) -> Self {
        self.config.max_response_bytes = max;
        self
    }

    /// Reuse an existing `reqwest::Client`.
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Validate the URL and build the client.
    pub fn build(self) -> A2AResult<A2AClient> {
        let client = self.http_client.unwrap_or_default();
        let transport = JsonRpcTransport::with_client(&self.url, self.config, client)?;
        let mut a2a = A2AClient::from_transport(transport)?;
        a2a.stream_timeout = self.stream_timeout;
        Ok(a2a)
    }
}

// ──────────────────────────────────────────────────
// Internal helpers
// ──────────────────────────────────────────────────

/// Build a JSON-RPC request with a random UUID ID.
fn build_request(method: &str, params: &impl Serialize) -> A2AResult<JsonRpcRequest> {
    let params = serde_json::to_value(params)
        .map_err(|e| A2AError::Transport(format!("failed to serialize request params: {e}")))?;
    Ok(JsonRpcRequest::new(method, Some(params)))
}

/// Classify a unary result that must be a task.
fn expect_task(result: &Value) -> A2AResult<Task> {
    SendMessageResponse::classify(result)?
        .into_task()
        .ok_or_else(|| A2AError::unknown_response(result))
}

fn text_params(text: &str, context_id: Option<&str>) -> SendMessageParams {
    let message: Message = match context_id {
        Some(id) => create_text_message(Role::User, text).with_context_id(id),
        None => create_text_message(Role::User, text),
    };
    SendMessageParams::new(message)
}

/// `<base>/message/stream`, keeping the base query string.
fn stream_endpoint(base: &Url) -> A2AResult<Url> {
    if base.cannot_be_a_base() {
        return Err(A2AError::validation(format!(
            "invalid agent base URL: {base}"
        )));
    }
    let mut url = base.clone();
    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(&format!("{path}{STREAM_PATH}"));
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stream_endpoint_appends_path() {
        let base = Url::parse("https://agent.example.com/a2a/").unwrap();
        assert_eq!(
            stream_endpoint(&base).unwrap().as_str(),
            "https://agent.example.com/a2a/message/stream"
        );
        let root = Url::parse("https://agent.example.com").unwrap();
        assert_eq!(
            stream_endpoint(&root).unwrap().as_str(),
            "https://agent.example.com/message/stream"
        );
    }

    #[test]
    fn builder_applies_settings() {
        let client = ClientBuilder::new("http://localhost:8080")
            .with_timeout(Duration::from_secs(5))
            .with_stream_timeout(Duration::from_secs(90))
            .with_bearer_token("test-token")
            .with_api_key("X-Api-Key", "k")
            .with_allow_local(true)
            .build()
            .unwrap();

        let config = client.transport().config();
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(
            config.headers.get("Authorization"),
            Some(&"Bearer test-token".to_string())
        );
        assert_eq!(config.headers.get("X-Api-Key"), Some(&"k".to_string()));
        assert_eq!(client.stream_timeout, Duration::from_secs(90));
    }

    #[test]
    fn builder_rejects_private_target_by_default() {
        let err = ClientBuilder::new("http://localhost:8080").build().unwrap_err();
        assert!(matches!(err, A2AError::Validation(_)));
    }

    #[test]
    fn text_params_carry_context() {
        let params = text_params("hi", Some("ctx-1"));
        assert_eq!(params.message.role, Role::User);
        assert_eq!(params.message.context_id.as_deref(), Some("ctx-1"));
        assert_eq!(params.message.parts[0].as_text(), Some("hi"));
    }

    #[test]
    fn expect_task_rejects_messages() {
        let err = expect_task(&json!({"role": "agent", "parts": []})).unwrap_err();
        assert!(matches!(err, A2AError::UnknownResponse { .. }));

        let task = expect_task(&json!({"id": "t1", "status": {"state": "working"}})).unwrap();
        assert_eq!(task.id, "t1");
    }
}
