//! A2A error types: client-side failure taxonomy and JSON-RPC error codes.
//!
//! Every failure the client or recorder can report falls into one of the
//! [`ErrorKind`] buckets:
//! - validation (bad URL, private/local target, card schema mismatch)
//! - timeout (deadline or caller cancellation)
//! - protocol (content type, JSON, JSON-RPC error, unknown result shape)
//! - size limit (response body over the configured cap)
//! - transport (network, non-2xx HTTP)
//! - storage (persistence collaborator)

// ---------------------------------------------------------------------------
// Standard JSON-RPC 2.0 error codes
// ---------------------------------------------------------------------------

/// Invalid JSON was received by the server.
pub const PARSE_ERROR: i64 = -32700;

/// The JSON sent is not a valid Request object.
pub const INVALID_REQUEST: i64 = -32600;

/// The method does not exist / is not available.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Invalid method parameter(s).
pub const INVALID_PARAMS: i64 = -32602;

/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i64 = -32603;

/// Error code stored on an RPC-call record closed through
/// [`SessionRecorder::record_error`](crate::recorder::SessionRecorder::record_error).
pub const RECORDED_FAILURE_CODE: i64 = 500;

/// Maximum number of characters of a raw payload attached to an error.
pub const EXCERPT_LIMIT: usize = 200;

// ---------------------------------------------------------------------------
// A2AError enum
// ---------------------------------------------------------------------------

/// Coarse classification of an [`A2AError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input or a rejected target address.
    Validation,
    /// Deadline exceeded or operation canceled.
    Timeout,
    /// The remote agent answered with something we cannot use.
    Protocol,
    /// Response body over the size cap.
    SizeLimit,
    /// Network or HTTP-level failure.
    Transport,
    /// Persistence collaborator failure.
    Storage,
}

/// Unified error type for the A2A client and the session recorder.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum A2AError {
    /// Malformed URL, private/local address rejected, or invalid agent card.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The internal deadline fired before the operation finished.
    #[error("timeout after {after_ms}ms")]
    Timeout {
        /// The deadline that was exceeded, in milliseconds.
        after_ms: u64,
    },

    /// The caller-supplied cancellation token fired.
    #[error("operation canceled by caller")]
    Cancelled,

    /// The response carried an unexpected `Content-Type`.
    #[error("unexpected content type: expected {expected}, got {actual}")]
    ContentType {
        /// Content type we require.
        expected: String,
        /// Content type the server sent (`<none>` when absent).
        actual: String,
    },

    /// Response body exceeded the size cap.
    #[error("response too large: {actual} bytes exceeds maximum of {max} bytes")]
    SizeLimit {
        /// Observed byte count (header or measured).
        actual: u64,
        /// Configured maximum.
        max: u64,
    },

    /// Invalid JSON received from remote.
    #[error("Invalid JSON: {message} (body: {excerpt})")]
    InvalidJson {
        /// Parser error message.
        message: String,
        /// Truncated raw body.
        excerpt: String,
    },

    /// A JSON-RPC error response was received from the remote agent.
    #[error("{code}: {message}")]
    JsonRpc {
        /// JSON-RPC error code as the agent sent it.
        code: String,
        /// Error message.
        message: String,
        /// Optional structured error data.
        data: Option<serde_json::Value>,
    },

    /// The JSON-RPC result was neither a Task nor a Message.
    #[error("unknown response type: {excerpt}")]
    UnknownResponse {
        /// Truncated result payload.
        excerpt: String,
    },

    /// A streaming response arrived without a body.
    #[error("no response body")]
    NoResponseBody,

    /// HTTP error with status code and response body.
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// Transport-level error (connection failed, request failed, etc.).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The persistence collaborator failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// An RPC-call record was completed twice with different outcomes.
    #[error("rpc call {rpc_id} in session {session_id} is already completed")]
    RpcAlreadyCompleted {
        /// Session owning the record.
        session_id: String,
        /// Session-scoped RPC id.
        rpc_id: String,
    },
}

/// Convenience result type for A2A operations.
pub type A2AResult<T> = Result<T, A2AError>;

impl A2AError {
    /// Create a `Validation` error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an `InvalidJson` error, truncating the raw body to [`EXCERPT_LIMIT`] chars.
    pub fn invalid_json(message: impl Into<String>, raw: &str) -> Self {
        Self::InvalidJson {
            message: message.into(),
            excerpt: excerpt(raw),
        }
    }

    /// Create an `UnknownResponse` error from the offending payload.
    pub fn unknown_response(payload: &serde_json::Value) -> Self {
        Self::UnknownResponse {
            excerpt: excerpt(&payload.to_string()),
        }
    }

    /// Which bucket of the error taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            A2AError::Validation(_) => ErrorKind::Validation,
            A2AError::Timeout { .. } | A2AError::Cancelled => ErrorKind::Timeout,
            A2AError::ContentType { .. }
            | A2AError::InvalidJson { .. }
            | A2AError::JsonRpc { .. }
            | A2AError::UnknownResponse { .. }
            | A2AError::NoResponseBody => ErrorKind::Protocol,
            A2AError::SizeLimit { .. } => ErrorKind::SizeLimit,
            A2AError::Http { .. } | A2AError::Transport(_) => ErrorKind::Transport,
            A2AError::Storage(_) | A2AError::RpcAlreadyCompleted { .. } => ErrorKind::Storage,
        }
    }

    /// True for both deadline expiry and caller cancellation.
    pub fn is_timeout(&self) -> bool {
        self.kind() == ErrorKind::Timeout
    }

    /// Returns the JSON-RPC error code for this error.
    ///
    /// Errors that did not come from the remote agent, and agent errors
    /// with a non-integer code, map to -32603.
    pub fn code(&self) -> i64 {
        match self {
            A2AError::JsonRpc { code, .. } => code.parse().unwrap_or(INTERNAL_ERROR),
            A2AError::InvalidJson { .. } => PARSE_ERROR,
            _ => INTERNAL_ERROR,
        }
    }
}

/// Truncate `raw` to at most [`EXCERPT_LIMIT`] characters.
pub(crate) fn excerpt(raw: &str) -> String {
    match raw.char_indices().nth(EXCERPT_LIMIT) {
        Some((idx, _)) => raw[..idx].to_string(),
        None => raw.to_string(),
    }
}
