//! Protocol paths, limits and default timeouts.

use std::time::Duration;

/// The well-known path for the agent card.
pub const AGENT_CARD_WELL_KNOWN_PATH: &str = "/.well-known/agent.json";

/// Path, relative to the agent base URL, of the SSE streaming endpoint.
pub const STREAM_PATH: &str = "/message/stream";

/// Hard cap on any response body the client will accept (1 MiB).
pub const MAX_RESPONSE_BYTES: u64 = 1024 * 1024;

/// Default deadline for a unary JSON-RPC call.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Default deadline for a streaming call.
pub const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Default deadline for an agent card fetch.
pub const DEFAULT_CARD_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Number of characters kept in an event summary before `...` is appended.
pub const SUMMARY_MAX_CHARS: usize = 50;

/// JSON-RPC method names.
pub mod methods {
    /// Send a message.
    pub const MESSAGE_SEND: &str = "message/send";
    /// Send a message over SSE.
    pub const MESSAGE_STREAM: &str = "message/stream";
    /// Fetch a task.
    pub const TASKS_GET: &str = "tasks/get";
    /// List tasks.
    pub const TASKS_LIST: &str = "tasks/list";
    /// Cancel a task.
    pub const TASKS_CANCEL: &str = "tasks/cancel";
}
