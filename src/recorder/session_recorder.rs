//! Correlates client-observed traffic into session, RPC-call and event rows.
//!
//! A [`SessionRecorder`] belongs to exactly one conversation. It remembers
//! only the most recently used `(session_id, context_id)` pair, so concurrent
//! conversations need one recorder each.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::{A2AError, A2AResult, RECORDED_FAILURE_CODE};
use crate::types::{Message, Role, Task};
use crate::utils::constants::methods;
use crate::utils::summarize_message;

use super::store::{Direction, EventKind, EventPayload, EventRecord, SessionStore};

/// Protocol tag written on every event.
pub const PROTOCOL: &str = "a2a";

/// The cached session of a recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentSession {
    pub session_id: String,
    pub context_id: Option<String>,
}

/// Records one conversation with one agent.
///
/// ```
/// use std::sync::Arc;
/// use a2a_recorder::recorder::{InMemorySessionStore, SessionRecorder};
/// use a2a_recorder::types::Role;
/// use a2a_recorder::utils::create_text_message;
///
/// # async fn example() -> a2a_recorder::A2AResult<()> {
/// let store = Arc::new(InMemorySessionStore::new());
/// let mut recorder = SessionRecorder::new(store.clone(), "target-1");
///
/// let request = create_text_message(Role::User, "ping");
/// recorder.record_message(Some("ctx-1"), &request, true, Some("rpc-1")).await?;
/// let reply = create_text_message(Role::Assistant, "pong");
/// recorder.record_message(Some("ctx-1"), &reply, false, Some("rpc-1")).await?;
///
/// let session = recorder.current_session().unwrap();
/// assert_eq!(store.events(&session.session_id).await.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct SessionRecorder {
    store: Arc<dyn SessionStore>,
    target_id: String,
    actor_meta: Value,
    current: Option<CurrentSession>,
}

impl std::fmt::Debug for SessionRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRecorder")
            .field("target_id", &self.target_id)
            .field("current", &self.current)
            .finish_non_exhaustive()
    }
}

impl SessionRecorder {
    /// Create a recorder writing sessions for `target_id` into `store`.
    pub fn new(store: Arc<dyn SessionStore>, target_id: impl Into<String>) -> Self {
        Self {
            store,
            target_id: target_id.into(),
            actor_meta: json!({}),
            current: None,
        }
    }

    /// Set the actor metadata stored on new sessions (builder-style).
    pub fn with_actor_meta(mut self, actor_meta: Value) -> Self {
        self.actor_meta = actor_meta;
        self
    }

    /// The cached session, if any.
    pub fn current_session(&self) -> Option<&CurrentSession> {
        self.current.as_ref()
    }

    /// Forget the cached session; the next call creates a new one.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Return the session for `context_id`, creating one if needed.
    ///
    /// Reuses the cached session when its context matches. Otherwise a new
    /// session is created and becomes the cached one.
    pub async fn get_or_create(&mut self, context_id: Option<&str>) -> A2AResult<String> {
        if let Some(current) = &self.current {
            if current.context_id.as_deref() == context_id {
                return Ok(current.session_id.clone());
            }
        }

        if let Some(session_id) = self.find_by_context(context_id) {
            self.cache(session_id.clone(), context_id);
            return Ok(session_id);
        }

        let record = self
            .store
            .create_session(&self.target_id, context_id, self.actor_meta.clone())
            .await?;
        info!(
            session_id = %record.session_id,
            target_id = %self.target_id,
            context_id = ?context_id,
            "recording session created"
        );
        self.cache(record.session_id.clone(), context_id);
        Ok(record.session_id)
    }

    /// Record one message.
    ///
    /// A request with an `rpc_id` opens a `message/send` RPC call; a
    /// response with an `rpc_id` closes it successfully. Responses are stored
    /// wrapped as `{"id": rpc_id, "result": message}`.
    pub async fn record_message(
        &mut self,
        context_id: Option<&str>,
        message: &Message,
        is_request: bool,
        rpc_id: Option<&str>,
    ) -> A2AResult<EventRecord> {
        let session_id = self.get_or_create(context_id).await?;

        if let (true, Some(rpc_id)) = (is_request, rpc_id) {
            self.store
                .save_rpc_call(&session_id, rpc_id, methods::MESSAGE_SEND)
                .await?;
        }

        let message_json = serde_json::to_value(message)
            .map_err(|e| A2AError::Storage(format!("failed to serialize message: {e}")))?;
        let raw = if is_request {
            message_json
        } else {
            json!({ "id": rpc_id, "result": message_json })
        };

        let (direction, kind) = if is_request {
            (Direction::Outbound, EventKind::Request)
        } else {
            (Direction::Inbound, EventKind::Response)
        };

        let event = self
            .store
            .save_event(
                &session_id,
                direction,
                kind,
                EventPayload {
                    rpc_id: rpc_id.map(str::to_string),
                    raw_json: raw.to_string(),
                    summary: summarize_message(message),
                    protocol: PROTOCOL.to_string(),
                },
            )
            .await?;

        if let (false, Some(rpc_id)) = (is_request, rpc_id) {
            self.store
                .complete_rpc_call(&session_id, rpc_id, true, None)
                .await?;
        }

        Ok(event)
    }

    /// Record every message in a task's history as a response.
    ///
    /// Only agent-authored messages are linked to `rpc_id`; user messages
    /// replayed in the history are stored unlinked.
    pub async fn record_task(
        &mut self,
        context_id: Option<&str>,
        task: &Task,
        rpc_id: Option<&str>,
    ) -> A2AResult<Vec<EventRecord>> {
        let mut events = Vec::with_capacity(task.messages.len());
        for message in &task.messages {
            let linked = match message.role {
                Role::User => None,
                Role::Assistant => rpc_id,
            };
            events.push(self.record_message(context_id, message, false, linked).await?);
        }
        debug!(task_id = %task.id, recorded = events.len(), "task history recorded");
        Ok(events)
    }

    /// Close an RPC call as failed with code 500.
    ///
    /// `message` is logged but not stored.
    pub async fn record_error(
        &mut self,
        context_id: Option<&str>,
        rpc_id: &str,
        message: &str,
    ) -> A2AResult<()> {
        let session_id = self.get_or_create(context_id).await?;
        debug!(session_id = %session_id, rpc_id = %rpc_id, error = %message, "recording RPC failure");
        self.store
            .complete_rpc_call(&session_id, rpc_id, false, Some(RECORDED_FAILURE_CODE))
            .await
    }

    /// Cross-instance session lookup by context id. Never finds anything
    /// yet; resuming sessions across recorders is not supported.
    fn find_by_context(&self, _context_id: Option<&str>) -> Option<String> {
        None
    }

    fn cache(&mut self, session_id: String, context_id: Option<&str>) {
        self.current = Some(CurrentSession {
            session_id,
            context_id: context_id.map(str::to_string),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::InMemorySessionStore;
    use crate::types::Part;
    use crate::utils::create_text_message;

    fn recorder() -> (Arc<InMemorySessionStore>, SessionRecorder) {
        let store = Arc::new(InMemorySessionStore::new());
        let recorder = SessionRecorder::new(store.clone(), "target-1");
        (store, recorder)
    }

    #[tokio::test]
    async fn same_context_reuses_session() {
        let (store, mut rec) = recorder();
        let a = rec.get_or_create(Some("ctx")).await.unwrap();
        let b = rec.get_or_create(Some("ctx")).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(store.sessions().await.len(), 1);
    }

    #[tokio::test]
    async fn single_slot_cache_forgets_previous_context() {
        let (store, mut rec) = recorder();
        let a = rec.get_or_create(Some("ctx-a")).await.unwrap();
        let b = rec.get_or_create(Some("ctx-b")).await.unwrap();
        let a_again = rec.get_or_create(Some("ctx-a")).await.unwrap();
        assert_ne!(a, b);
        assert_ne!(a, a_again);
        assert_eq!(store.sessions().await.len(), 3);
        assert_eq!(
            rec.current_session().unwrap().context_id.as_deref(),
            Some("ctx-a")
        );
    }

    #[tokio::test]
    async fn reset_clears_cache() {
        let (store, mut rec) = recorder();
        rec.get_or_create(Some("ctx")).await.unwrap();
        rec.reset();
        assert!(rec.current_session().is_none());
        rec.get_or_create(Some("ctx")).await.unwrap();
        assert_eq!(store.sessions().await.len(), 2);
    }

    #[tokio::test]
    async fn request_then_response_closes_one_rpc_call() {
        let (store, mut rec) = recorder();
        let request = create_text_message(Role::User, "hello");
        let reply = create_text_message(Role::Assistant, "hi there");

        let req_event = rec
            .record_message(Some("ctx"), &request, true, Some("rpc-1"))
            .await
            .unwrap();
        let session_id = req_event.session_id.clone();
        assert!(store.rpc_call(&session_id, "rpc-1").await.unwrap().is_open());

        let resp_event = rec
            .record_message(Some("ctx"), &reply, false, Some("rpc-1"))
            .await
            .unwrap();
        assert_eq!(resp_event.session_id, session_id);

        let calls = store.rpc_calls(&session_id).await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].method, "message/send");
        assert_eq!(calls[0].success, Some(true));

        let events = store.events(&session_id).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Request);
        assert_eq!(events[1].kind, EventKind::Response);
    }

    #[tokio::test]
    async fn response_raw_json_is_wrapped_in_envelope() {
        let (_store, mut rec) = recorder();
        let reply = create_text_message(Role::Assistant, "done");
        let event = rec
            .record_message(None, &reply, false, Some("rpc-9"))
            .await
            .unwrap();
        let raw: Value = serde_json::from_str(&event.payload.raw_json).unwrap();
        assert_eq!(raw["id"], "rpc-9");
        assert_eq!(raw["result"]["parts"][0]["text"], "done");

        let request = create_text_message(Role::User, "go");
        let event = rec.record_message(None, &request, true, None).await.unwrap();
        let raw: Value = serde_json::from_str(&event.payload.raw_json).unwrap();
        assert_eq!(raw["role"], "user");
        assert!(raw.get("result").is_none());
    }

    #[tokio::test]
    async fn summary_truncates_long_text() {
        let (_store, mut rec) = recorder();
        let long = create_text_message(Role::User, "a".repeat(80));
        let event = rec.record_message(None, &long, true, None).await.unwrap();
        assert!(event.payload.summary.ends_with("..."));
        assert_eq!(event.payload.summary.len(), 53);

        let short = create_text_message(Role::User, "b".repeat(50));
        let event = rec.record_message(None, &short, true, None).await.unwrap();
        assert_eq!(event.payload.summary, "b".repeat(50));
    }

    #[tokio::test]
    async fn data_parts_do_not_contribute_to_summary() {
        let (_store, mut rec) = recorder();
        let message = Message::new(
            Role::Assistant,
            vec![
                Part::text("see "),
                Part::data(json!({"k": 1}), Some("application/json".to_string())),
                Part::text("attached"),
            ],
        );
        let event = rec.record_message(None, &message, false, None).await.unwrap();
        assert_eq!(event.payload.summary, "see attached");
    }

    #[tokio::test]
    async fn record_task_links_only_agent_messages() {
        let (store, mut rec) = recorder();
        let request = create_text_message(Role::User, "question");
        rec.record_message(Some("ctx"), &request, true, Some("rpc-1"))
            .await
            .unwrap();

        let task: Task = serde_json::from_value(json!({
            "id": "task-1",
            "status": {"state": "completed"},
            "history": [
                {"role": "user", "parts": [{"kind": "text", "text": "question"}]},
                {"role": "agent", "parts": [{"kind": "text", "text": "thinking"}]},
                {"role": "agent", "parts": [{"kind": "text", "text": "answer"}]}
            ]
        }))
        .unwrap();

        let events = rec.record_task(Some("ctx"), &task, Some("rpc-1")).await.unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].payload.rpc_id, None);
        assert_eq!(events[1].payload.rpc_id.as_deref(), Some("rpc-1"));
        assert_eq!(events[2].payload.rpc_id.as_deref(), Some("rpc-1"));
        assert!(events.iter().all(|e| e.kind == EventKind::Response));

        let session_id = &events[0].session_id;
        let call = store.rpc_call(session_id, "rpc-1").await.unwrap();
        assert_eq!(call.success, Some(true));
    }

    #[tokio::test]
    async fn record_error_closes_call_with_500() {
        let (store, mut rec) = recorder();
        let request = create_text_message(Role::User, "boom?");
        let event = rec
            .record_message(Some("ctx"), &request, true, Some("rpc-2"))
            .await
            .unwrap();

        rec.record_error(Some("ctx"), "rpc-2", "agent exploded").await.unwrap();

        let call = store.rpc_call(&event.session_id, "rpc-2").await.unwrap();
        assert_eq!(call.success, Some(false));
        assert_eq!(call.error_code, Some(500));
        assert_eq!(call.error_message, None);
    }

    #[tokio::test]
    async fn error_after_success_is_rejected() {
        let (_store, mut rec) = recorder();
        let request = create_text_message(Role::User, "q");
        let reply = create_text_message(Role::Assistant, "a");
        rec.record_message(Some("ctx"), &request, true, Some("rpc-3"))
            .await
            .unwrap();
        rec.record_message(Some("ctx"), &reply, false, Some("rpc-3"))
            .await
            .unwrap();

        let err = rec.record_error(Some("ctx"), "rpc-3", "late").await.unwrap_err();
        assert!(matches!(err, A2AError::RpcAlreadyCompleted { .. }));
    }
}
