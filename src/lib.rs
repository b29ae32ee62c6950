//! # a2a-recorder: recording client for the Agent-to-Agent (A2A) protocol
//!
//! Issues JSON-RPC 2.0 calls to a remote A2A agent, consumes the SSE
//! streaming variant of the same protocol, and correlates every
//! request/response pair into a session/event log for later audit.
//!
//! ## Feature flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `client` | yes     | HTTP client, SSE streaming and agent card discovery (reqwest) |
//!
//! Types and the recorder are always available.
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::collections::HashMap;
//!
//! use a2a_recorder::client::A2AClient;
//! use a2a_recorder::recorder::{InMemorySessionStore, SessionRecorder};
//! use a2a_recorder::types::{JsonRpcRequest, Role, SendMessageParams, SendMessageResponse};
//! use a2a_recorder::utils::create_text_message;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = A2AClient::new("https://agent.example.com/a2a")?;
//!     let store = Arc::new(InMemorySessionStore::new());
//!     let mut recorder = SessionRecorder::new(store.clone(), "agent-1");
//!
//!     let message = create_text_message(Role::User, "Write a haiku about Rust");
//!     let request = JsonRpcRequest::new(
//!         "message/send",
//!         Some(serde_json::to_value(SendMessageParams::new(message.clone()))?),
//!     );
//!     let rpc_id = request.id.to_string();
//!
//!     recorder.record_message(None, &message, true, Some(&rpc_id)).await?;
//!     match client.call(&request, &HashMap::new()).await {
//!         Ok(result) => match SendMessageResponse::classify(&result)? {
//!             SendMessageResponse::Task(task) => {
//!                 recorder.record_task(None, &task, Some(&rpc_id)).await?;
//!             }
//!             SendMessageResponse::Message(reply) => {
//!                 recorder.record_message(None, &reply, false, Some(&rpc_id)).await?;
//!             }
//!         },
//!         Err(e) => recorder.record_error(None, &rpc_id, &e.to_string()).await?,
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ### Client
//!
//! - [`client::A2AClient`]: send, get/list/cancel task, stream
//! - [`client::JsonRpcTransport`]: unary JSON-RPC over HTTP
//! - [`client::StreamHandler`]: callbacks for SSE stream events
//! - [`client::CardResolver`] / [`client::CardCache`]: agent card discovery and caching
//! - [`client::is_private_url`]: private-address guard
//!
//! ### Recorder
//!
//! - [`recorder::SessionRecorder`]: correlates traffic into sessions, RPC calls and events
//! - [`recorder::SessionStore`] / [`recorder::InMemorySessionStore`]: persistence
//!
//! ### Core Types
//!
//! - [`types::Task`], [`types::TaskState`], [`types::Message`], [`types::Part`]
//! - [`types::StreamEvent`] and [`types::SendMessageResponse`] with their classifiers
//! - [`types::AgentCard`]
//! - [`error::A2AError`]

pub mod error;
pub mod recorder;
pub mod types;
pub mod utils;

#[cfg(feature = "client")]
pub mod client;

/// Prelude module that re-exports commonly used types and traits.
///
/// ```
/// use a2a_recorder::prelude::*;
///
/// let state = TaskState::from_wire("input-required");
/// assert_eq!(state, TaskState::InputRequired);
/// ```
pub mod prelude {
    pub use crate::types::{
        AgentCapabilities, AgentCard, AgentSkill, Artifact, Message, Part, Role,
        SendMessageParams, SendMessageResponse, StreamEvent, Task, TaskState,
    };

    pub use crate::error::{A2AError, A2AResult};

    pub use crate::recorder::{InMemorySessionStore, SessionRecorder, SessionStore};

    #[cfg(feature = "client")]
    pub use crate::client::{A2AClient, ClientBuilder, StreamHandler, StreamOptions};
}

// Re-export core types at crate root for convenience.
pub use error::{A2AError, A2AResult};
pub use types::*;

#[cfg(feature = "client")]
pub use client::{A2AClient, ClientBuilder};
