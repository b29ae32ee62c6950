//! Session store: persistence layer for recorded A2A traffic.
//!
//! The [`SessionStore`] trait is the narrow interface the recorder writes
//! through: one session row per conversation, one RPC-call row per request id
//! and one event row per observed message. [`InMemorySessionStore`] is
//! provided for development and testing; production deployments implement the
//! trait over a database.
//!
//! Writes are single-row operations. Nothing spans "open an RPC call" and
//! "write its event", so a failure between the two leaves an open RPC call
//! behind; that is accepted and not repaired here.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{A2AError, A2AResult};

/// Which way a recorded message travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Client to agent.
    Outbound,
    /// Agent to client.
    Inbound,
}

/// Whether a recorded message was a request or a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// A request sent to the agent.
    Request,
    /// A response received from the agent.
    Response,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Request => write!(f, "request"),
            EventKind::Response => write!(f, "response"),
        }
    }
}

/// One recorded conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Storage-assigned identifier.
    pub session_id: String,
    /// Registry id of the agent talked to.
    pub target_id: String,
    /// Caller conversation key; a soft correlation, not a primary key.
    pub context_id: Option<String>,
    /// Free-form description of who drove the session.
    pub actor_meta: Value,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

/// One JSON-RPC call inside a session. `rpc_id` is unique per session only.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcCallRecord {
    /// Session owning the call.
    pub session_id: String,
    /// JSON-RPC request id.
    pub rpc_id: String,
    /// JSON-RPC method, e.g. `message/send`.
    pub method: String,
    /// `None` while the call is open.
    pub success: Option<bool>,
    /// Error code of a failed call.
    pub error_code: Option<i64>,
    /// Reserved; nothing in this crate writes it.
    pub error_message: Option<String>,
    /// When the request was recorded.
    pub request_ts: DateTime<Utc>,
    /// When the call was completed.
    pub response_ts: Option<DateTime<Utc>>,
}

impl RpcCallRecord {
    /// Whether the call has not been completed yet.
    pub fn is_open(&self) -> bool {
        self.success.is_none()
    }
}

/// Body of an event row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    /// RPC the event belongs to, if linked.
    pub rpc_id: Option<String>,
    /// The observed message as JSON text.
    pub raw_json: String,
    /// Short human-readable summary.
    pub summary: String,
    /// Protocol tag, e.g. `a2a`.
    pub protocol: String,
}

/// One observed message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// Monotonic sequence number across the store.
    pub seq: u64,
    /// Session the event was recorded under.
    pub session_id: String,
    /// Outbound for requests, inbound for responses.
    pub direction: Direction,
    /// Request or response.
    pub kind: EventKind,
    /// Event body.
    #[serde(flatten)]
    pub payload: EventPayload,
    /// When the event was recorded.
    pub ts: DateTime<Utc>,
}

/// Persistence interface consumed by the session recorder.
///
/// Implementations must be `Send + Sync`; all methods take `&self` and use
/// interior mutability.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a new session row.
    async fn create_session(
        &self,
        target_id: &str,
        context_id: Option<&str>,
        actor_meta: Value,
    ) -> A2AResult<SessionRecord>;

    /// Open an RPC-call row for `rpc_id` within `session_id`.
    ///
    /// Fails if the session already has a call with that id.
    async fn save_rpc_call(&self, session_id: &str, rpc_id: &str, method: &str) -> A2AResult<()>;

    /// Close an RPC-call row.
    ///
    /// Completing an already-closed call with the same outcome is a no-op;
    /// with a different outcome it fails with
    /// [`A2AError::RpcAlreadyCompleted`]. Completing an unknown call is a
    /// no-op.
    async fn complete_rpc_call(
        &self,
        session_id: &str,
        rpc_id: &str,
        success: bool,
        error_code: Option<i64>,
    ) -> A2AResult<()>;

    /// Append an event row.
    async fn save_event(
        &self,
        session_id: &str,
        direction: Direction,
        kind: EventKind,
        payload: EventPayload,
    ) -> A2AResult<EventRecord>;
}

#[derive(Debug, Default)]
struct Tables {
    sessions: Vec<SessionRecord>,
    /// Keyed by (session_id, rpc_id); `rpc_order` keeps insertion order.
    rpc_calls: HashMap<(String, String), RpcCallRecord>,
    rpc_order: Vec<(String, String)>,
    events: Vec<EventRecord>,
}

/// In-memory session store.
///
/// Suitable for development, testing and short-lived processes. All data is
/// lost when the process exits. Thread-safe via `tokio::sync::RwLock`.
#[derive(Debug, Clone, Default)]
pub struct InMemorySessionStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemorySessionStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// All sessions in creation order.
    pub async fn sessions(&self) -> Vec<SessionRecord> {
        self.tables.read().await.sessions.clone()
    }

    /// RPC calls of one session in the order they were opened.
    pub async fn rpc_calls(&self, session_id: &str) -> Vec<RpcCallRecord> {
        let tables = self.tables.read().await;
        tables
            .rpc_order
            .iter()
            .filter(|(session, _)| session == session_id)
            .filter_map(|key| tables.rpc_calls.get(key).cloned())
            .collect()
    }

    /// One RPC call, if present.
    pub async fn rpc_call(&self, session_id: &str, rpc_id: &str) -> Option<RpcCallRecord> {
        self.tables
            .read()
            .await
            .rpc_calls
            .get(&(session_id.to_string(), rpc_id.to_string()))
            .cloned()
    }

    /// Events of one session in the order they were written.
    pub async fn events(&self, session_id: &str) -> Vec<EventRecord> {
        self.tables
            .read()
            .await
            .events
            .iter()
            .filter(|event| event.session_id == session_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(
        &self,
        target_id: &str,
        context_id: Option<&str>,
        actor_meta: Value,
    ) -> A2AResult<SessionRecord> {
        let record = SessionRecord {
            session_id: uuid::Uuid::new_v4().to_string(),
            target_id: target_id.to_string(),
            context_id: context_id.map(str::to_string),
            actor_meta,
            created_at: Utc::now(),
        };
        self.tables.write().await.sessions.push(record.clone());
        debug!(session_id = %record.session_id, target_id = %target_id, "Session saved");
        Ok(record)
    }

    async fn save_rpc_call(&self, session_id: &str, rpc_id: &str, method: &str) -> A2AResult<()> {
        let key = (session_id.to_string(), rpc_id.to_string());
        let mut tables = self.tables.write().await;
        if tables.rpc_calls.contains_key(&key) {
            return Err(A2AError::Storage(format!(
                "rpc call {rpc_id} already exists in session {session_id}"
            )));
        }
        tables.rpc_calls.insert(
            key.clone(),
            RpcCallRecord {
                session_id: session_id.to_string(),
                rpc_id: rpc_id.to_string(),
                method: method.to_string(),
                success: None,
                error_code: None,
                error_message: None,
                request_ts: Utc::now(),
                response_ts: None,
            },
        );
        tables.rpc_order.push(key);
        debug!(session_id = %session_id, rpc_id = %rpc_id, method = %method, "RPC call opened");
        Ok(())
    }

    async fn complete_rpc_call(
        &self,
        session_id: &str,
        rpc_id: &str,
        success: bool,
        error_code: Option<i64>,
    ) -> A2AResult<()> {
        let key = (session_id.to_string(), rpc_id.to_string());
        let mut tables = self.tables.write().await;
        let Some(call) = tables.rpc_calls.get_mut(&key) else {
            warn!(session_id = %session_id, rpc_id = %rpc_id, "Completing unknown RPC call");
            return Ok(());
        };

        match call.success {
            None => {
                call.success = Some(success);
                call.error_code = error_code;
                call.response_ts = Some(Utc::now());
                debug!(session_id = %session_id, rpc_id = %rpc_id, success, "RPC call completed");
                Ok(())
            }
            Some(done) if done == success && call.error_code == error_code => Ok(()),
            Some(_) => {
                warn!(
                    session_id = %session_id,
                    rpc_id = %rpc_id,
                    success,
                    "Conflicting completion for closed RPC call"
                );
                Err(A2AError::RpcAlreadyCompleted {
                    session_id: session_id.to_string(),
                    rpc_id: rpc_id.to_string(),
                })
            }
        }
    }

    async fn save_event(
        &self,
        session_id: &str,
        direction: Direction,
        kind: EventKind,
        payload: EventPayload,
    ) -> A2AResult<EventRecord> {
        let mut tables = self.tables.write().await;
        let record = EventRecord {
            seq: tables.events.len() as u64 + 1,
            session_id: session_id.to_string(),
            direction,
            kind,
            payload,
            ts: Utc::now(),
        };
        tables.events.push(record.clone());
        debug!(session_id = %session_id, seq = record.seq, kind = %kind, "Event saved");
        Ok(record)
    }
}
