//! Session/RPC recorder: turns observed A2A traffic into an audit log.
//!
//! - [`SessionRecorder`]: per-conversation correlation of messages, tasks and errors
//! - [`SessionStore`]: the persistence interface it writes through
//! - [`InMemorySessionStore`]: in-memory store for development and tests

mod session_recorder;
mod store;

pub use session_recorder::{CurrentSession, SessionRecorder, PROTOCOL};
pub use store::{
    Direction, EventKind, EventPayload, EventRecord, InMemorySessionStore, RpcCallRecord,
    SessionRecord, SessionStore,
};
