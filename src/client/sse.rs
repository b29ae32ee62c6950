//! Server-Sent Events (SSE) stream handling for A2A streaming responses.
//!
//! The response body is read incrementally. Bytes are line-buffered across
//! network reads, `data:` lines are JSON-parsed and classified into
//! [`StreamEvent`]s, and each event is pushed to a [`StreamHandler`].
//!
//! A malformed frame is reported through [`StreamHandler::on_error`] and the
//! stream keeps going. The call returns as soon as a status event with
//! `final: true` arrives, without waiting for the server to close the
//! connection.

use std::collections::HashMap;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::CONTENT_LENGTH;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::error::{A2AError, A2AResult};
use crate::types::{
    unwrap_envelope, ArtifactEvent, JsonRpcRequest, Message, StatusEvent, StreamEvent, Task,
    TaskState,
};
use crate::utils::constants::{DEFAULT_STREAM_TIMEOUT, MAX_RESPONSE_BYTES};

use super::transport::{
    http_status_error, map_reqwest_error, merge_headers, require_content_type, timeout_error,
    EVENT_STREAM,
};

/// Sentinel payload some agents send to mark the end of a stream.
const DONE_SENTINEL: &str = "[DONE]";

/// Receives decoded stream events. Every method defaults to a no-op.
pub trait StreamHandler: Send {
    /// A task status update.
    fn on_status(&mut self, _event: &StatusEvent) {}

    /// An artifact update.
    fn on_artifact(&mut self, _event: &ArtifactEvent) {}

    /// A direct message from the agent.
    fn on_message(&mut self, _message: &Message) {}

    /// A full task snapshot.
    fn on_task(&mut self, _task: &Task) {}

    /// A frame that could not be parsed or classified. Not fatal.
    fn on_error(&mut self, _error: &A2AError) {}
}

/// A [`StreamHandler`] that keeps everything it receives.
#[derive(Debug, Default, Clone)]
pub struct CollectingHandler {
    /// Events in arrival order.
    pub events: Vec<StreamEvent>,
    /// Per-frame errors in arrival order.
    pub errors: Vec<A2AError>,
}

impl CollectingHandler {
    /// Status events only.
    pub fn statuses(&self) -> Vec<&StatusEvent> {
        self.events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Status(status) => Some(status),
                _ => None,
            })
            .collect()
    }
}

impl StreamHandler for CollectingHandler {
    fn on_status(&mut self, event: &StatusEvent) {
        self.events.push(StreamEvent::Status(event.clone()));
    }

    fn on_artifact(&mut self, event: &ArtifactEvent) {
        self.events.push(StreamEvent::Artifact(event.clone()));
    }

    fn on_message(&mut self, message: &Message) {
        self.events.push(StreamEvent::Message(message.clone()));
    }

    fn on_task(&mut self, task: &Task) {
        self.events.push(StreamEvent::TaskSnapshot(task.clone()));
    }

    fn on_error(&mut self, error: &A2AError) {
        self.errors.push(error.clone());
    }
}

/// Per-call options for a streaming request.
#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Internal deadline for the whole stream. Defaults to 60 seconds.
    pub timeout: Duration,
    /// Caller-owned cancellation token.
    pub cancel: Option<CancellationToken>,
    /// Per-call headers; they win over the instance defaults.
    pub headers: HashMap<String, String>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_STREAM_TIMEOUT,
            cancel: None,
            headers: HashMap::new(),
        }
    }
}

impl StreamOptions {
    /// Set the deadline (builder-style).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attach a cancellation token (builder-style).
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Add a per-call header (builder-style).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// How a streaming call ended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamOutcome {
    /// Last task id seen on a status event or task snapshot.
    pub task_id: Option<String>,
    /// State of the final status event, when the stream ended with one.
    pub final_state: Option<TaskState>,
    /// Number of events delivered to the handler.
    pub events: usize,
    /// Number of frames reported through `on_error`.
    pub errors: usize,
}

impl StreamOutcome {
    /// Whether the stream ended on a `final: true` status event.
    pub fn is_final(&self) -> bool {
        self.final_state.is_some()
    }
}

// ──────────────────────────────────────────────────
// Line buffering and frame decoding
// ──────────────────────────────────────────────────

/// Reassembles lines split across network reads.
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
    /// Prefix of `pending` already known to hold no newline.
    scanned: usize,
}

impl SseLineBuffer {
    /// Append a chunk and return every line it completed, without the
    /// trailing `\n` / `\r\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(offset) = self.pending[self.scanned..].iter().position(|b| *b == b'\n') {
            let end = self.scanned + offset;
            lines.push(decode_line_bytes(&self.pending[start..end]));
            start = end + 1;
            self.scanned = start;
        }
        self.pending.drain(..start);
        self.scanned = self.pending.len();
        lines
    }

    /// Bytes held back waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The trailing fragment left when the stream ends without a newline.
    pub fn finish(self) -> Option<String> {
        if self.pending.iter().all(u8::is_ascii_whitespace) {
            None
        } else {
            Some(decode_line_bytes(&self.pending))
        }
    }
}

fn decode_line_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// The JSON payload of a `data:` line, or `None` for anything to skip
/// (other SSE fields, comments, blank lines, the `[DONE]` sentinel).
pub fn data_payload(line: &str) -> Option<&str> {
    let data = line.strip_prefix("data:")?;
    let data = data.strip_prefix(' ').unwrap_or(data).trim_end();
    if data.is_empty() || data == DONE_SENTINEL {
        None
    } else {
        Some(data)
    }
}

/// Parse one `data:` payload into a classified event.
///
/// Accepts both a bare result object and a full JSON-RPC envelope; an
/// envelope carrying `error` becomes [`A2AError::JsonRpc`].
pub fn parse_frame(payload: &str) -> A2AResult<StreamEvent> {
    let value: Value = serde_json::from_str(payload).map_err(|e| {
        A2AError::invalid_json(format!("failed to parse SSE event data: {e}"), payload)
    })?;

    let result = if value.get("jsonrpc").is_some() {
        unwrap_envelope(value)?
    } else {
        value
    };

    StreamEvent::classify(&result)
}

// ──────────────────────────────────────────────────
// Streaming call
// ──────────────────────────────────────────────────

/// Everything a streaming call needs besides the handler.
pub(crate) struct StreamRequest<'a> {
    pub client: &'a reqwest::Client,
    pub url: &'a Url,
    pub request: &'a JsonRpcRequest,
    pub default_headers: &'a HashMap<String, String>,
}

/// Run one streaming call under the internal deadline and the caller token,
/// whichever fires first.
pub(crate) async fn run_stream(
    req: StreamRequest<'_>,
    options: &StreamOptions,
    handler: &mut dyn StreamHandler,
) -> A2AResult<StreamOutcome> {
    let cancel = options.cancel.clone().unwrap_or_default();
    let deadline = tokio::time::sleep(options.timeout);
    let request_id = req.request.id.clone();

    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!(id = %request_id, "stream canceled by caller");
            Err(A2AError::Cancelled)
        }
        _ = deadline => {
            warn!(id = %request_id, timeout_ms = options.timeout.as_millis() as u64, "stream deadline exceeded");
            Err(timeout_error(options.timeout))
        }
        result = read_stream(req, options, handler) => result,
    }
}

async fn read_stream(
    req: StreamRequest<'_>,
    options: &StreamOptions,
    handler: &mut dyn StreamHandler,
) -> A2AResult<StreamOutcome> {
    let body = serde_json::to_vec(req.request)
        .map_err(|e| A2AError::Transport(format!("failed to serialize JSON-RPC request: {e}")))?;

    debug!(url = %req.url, id = %req.request.id, "opening SSE stream");

    let response = req
        .client
        .post(req.url.clone())
        .headers(merge_headers(req.default_headers, &options.headers))
        .body(body)
        .send()
        .await
        .map_err(|e| map_reqwest_error(e, options.timeout))?;

    if !response.status().is_success() {
        return Err(http_status_error(response, MAX_RESPONSE_BYTES, options.timeout).await);
    }

    require_content_type(&response, EVENT_STREAM)?;

    let empty = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim() == "0");
    if empty {
        return Err(A2AError::NoResponseBody);
    }

    let mut state = StreamOutcome::default();
    let mut lines = SseLineBuffer::default();
    let mut bytes = response.bytes_stream();

    while let Some(chunk) = bytes.next().await {
        let chunk = chunk.map_err(|e| map_reqwest_error(e, options.timeout))?;
        for line in lines.push(&chunk) {
            if dispatch(&line, &mut state, handler) {
                debug!(task_id = ?state.task_id, "final status received, closing stream");
                return Ok(state);
            }
        }
        if lines.pending_len() as u64 > MAX_RESPONSE_BYTES {
            return Err(A2AError::SizeLimit {
                actual: lines.pending_len() as u64,
                max: MAX_RESPONSE_BYTES,
            });
        }
    }

    if let Some(line) = lines.finish() {
        dispatch(&line, &mut state, handler);
    }

    debug!(task_id = ?state.task_id, events = state.events, "SSE stream ended");
    Ok(state)
}

/// Decode and deliver one line. Returns `true` when the stream is finished.
fn dispatch(line: &str, state: &mut StreamOutcome, handler: &mut dyn StreamHandler) -> bool {
    let Some(payload) = data_payload(line) else {
        return false;
    };

    let event = match parse_frame(payload) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "skipping malformed SSE frame");
            state.errors += 1;
            handler.on_error(&e);
            return false;
        }
    };

    state.events += 1;
    match event {
        StreamEvent::Status(status) => {
            if !status.task_id.is_empty() {
                state.task_id = Some(status.task_id.clone());
            }
            handler.on_status(&status);
            if status.r#final {
                state.final_state = Some(status.status);
                return true;
            }
        }
        StreamEvent::Artifact(artifact) => handler.on_artifact(&artifact),
        StreamEvent::Message(message) => handler.on_message(&message),
        StreamEvent::TaskSnapshot(task) => {
            if !task.id.is_empty() {
                state.task_id = Some(task.id.clone());
            }
            handler.on_task(&task);
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_split_across_reads_is_reassembled() {
        let mut buf = SseLineBuffer::default();
        assert!(buf.push(b"data: {\"taskId\":").is_empty());
        let lines = buf.push(b"\"t1\"}\r\ndata: next");
        assert_eq!(lines, vec!["data: {\"taskId\":\"t1\"}".to_string()]);
        assert_eq!(buf.finish(), Some("data: next".to_string()));
    }

    #[test]
    fn multibyte_char_split_across_reads() {
        let text = "data: é\n".as_bytes();
        let mut buf = SseLineBuffer::default();
        assert!(buf.push(&text[..7]).is_empty());
        assert_eq!(buf.push(&text[7..]), vec!["data: é".to_string()]);
    }

    #[test]
    fn long_line_in_small_reads() {
        let payload = format!("data: {}", "y".repeat(10_000));
        let mut buf = SseLineBuffer::default();
        for piece in payload.as_bytes().chunks(7) {
            assert!(buf.push(piece).is_empty());
        }
        assert_eq!(buf.pending_len(), payload.len());

        let lines = buf.push(b"\r\ndata: 2\n");
        assert_eq!(lines, vec![payload, "data: 2".to_string()]);
        assert_eq!(buf.pending_len(), 0);
        assert!(buf.finish().is_none());
    }

    #[test]
    fn several_lines_in_one_read() {
        let mut buf = SseLineBuffer::default();
        let lines = buf.push(b"event: x\ndata: 1\n\n");
        assert_eq!(lines, vec!["event: x", "data: 1", ""]);
        assert!(buf.finish().is_none());
    }

    #[test]
    fn non_data_lines_and_sentinel_are_skipped() {
        assert_eq!(data_payload(""), None);
        assert_eq!(data_payload(": keepalive"), None);
        assert_eq!(data_payload("event: update"), None);
        assert_eq!(data_payload("id: 123"), None);
        assert_eq!(data_payload("data: [DONE]"), None);
        assert_eq!(data_payload("data:"), None);
        assert_eq!(data_payload("data: {\"a\":1}"), Some("{\"a\":1}"));
        assert_eq!(data_payload("data:{\"a\":1}"), Some("{\"a\":1}"));
    }

    #[test]
    fn parse_frame_unwraps_json_rpc_envelope() {
        let event = parse_frame(
            r#"{"jsonrpc":"2.0","id":"1","result":{"taskId":"t1","status":{"state":"working"},"final":false}}"#,
        )
        .unwrap();
        assert!(matches!(event, StreamEvent::Status(ref s) if s.task_id == "t1"));

        let err = parse_frame(r#"{"jsonrpc":"2.0","id":"1","error":{"code":-32000,"message":"boom"}}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "-32000: boom");
    }

    #[test]
    fn parse_frame_accepts_non_numeric_error_code() {
        let err = parse_frame(r#"{"jsonrpc":"2.0","id":7.5,"error":{"code":"E_BUSY","message":"busy"}}"#)
            .unwrap_err();
        assert_eq!(err.to_string(), "E_BUSY: busy");
        assert!(matches!(err, A2AError::JsonRpc { .. }));
    }

    #[test]
    fn parse_frame_reports_invalid_json() {
        let err = parse_frame("{not valid json}").unwrap_err();
        assert!(matches!(err, A2AError::InvalidJson { .. }));
    }

    #[test]
    fn dispatch_stops_on_final_status() {
        let mut handler = CollectingHandler::default();
        let mut state = StreamOutcome::default();

        let working = r#"data: {"taskId":"t1","status":"working","final":false}"#;
        let bad = "data: {oops";
        let done = r#"data: {"taskId":"t1","status":"completed","final":true}"#;

        assert!(!dispatch(working, &mut state, &mut handler));
        assert!(!dispatch(bad, &mut state, &mut handler));
        assert!(dispatch(done, &mut state, &mut handler));

        assert_eq!(handler.statuses().len(), 2);
        assert_eq!(handler.errors.len(), 1);
        assert_eq!(state.task_id.as_deref(), Some("t1"));
        assert_eq!(state.final_state, Some(TaskState::Completed));
        assert_eq!(state.errors, 1);
    }

    #[test]
    fn default_stream_options() {
        let options = StreamOptions::default();
        assert_eq!(options.timeout, Duration::from_millis(60_000));
        assert!(options.cancel.is_none());
    }
}
