//! A2A client: call remote A2A agents.
//!
//! - [`A2AClient`]: typed methods for every A2A JSON-RPC operation
//! - [`JsonRpcTransport`]: unary JSON-RPC over HTTP with size and content-type checks
//! - [`StreamHandler`] / [`StreamOptions`]: SSE streaming callbacks and cancellation
//! - [`CardResolver`] / [`CardCache`]: agent card discovery and caching
//! - [`is_private_url`]: the private-address guard applied to every target
//!
//! # Quick Start
//!
//! ```no_run
//! use a2a_recorder::client::{A2AClient, CollectingHandler, StreamOptions};
//! use a2a_recorder::types::SendMessageParams;
//! use a2a_recorder::utils::create_text_message;
//! use a2a_recorder::types::Role;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = A2AClient::new("https://agent.example.com/a2a")?;
//!
//! let mut handler = CollectingHandler::default();
//! let params = SendMessageParams::new(create_text_message(Role::User, "Write a haiku"));
//! let outcome = client
//!     .stream_message(params, &mut handler, StreamOptions::default())
//!     .await?;
//! println!("task {:?} finished as {:?}", outcome.task_id, outcome.final_state);
//! # Ok(())
//! # }
//! ```

mod a2a_client;
mod card_cache;
mod card_resolver;
mod guard;
mod sse;
mod transport;

pub use a2a_client::{A2AClient, ClientBuilder};
pub use card_cache::{CachedCard, CardCache, CardRefresh, Target};
pub use card_resolver::{content_hash, CardFetchOptions, CardFetchResult, CardResolver};
pub use guard::{is_private, is_private_url};
pub use sse::{
    data_payload, parse_frame, CollectingHandler, SseLineBuffer, StreamHandler, StreamOptions,
    StreamOutcome,
};
pub use transport::{JsonRpcTransport, TransportConfig};

pub use crate::types::SendMessageResponse;
pub use tokio_util::sync::CancellationToken;
