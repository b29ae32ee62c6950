//! Unary JSON-RPC over HTTP transport.
//!
//! [`JsonRpcTransport::send`] posts one JSON-RPC 2.0 envelope and validates
//! the answer in a fixed order:
//!
//! 1. private-address guard (again, even though the client checked at construction)
//! 2. non-2xx HTTP status becomes [`A2AError::Http`]
//! 3. `Content-Type` must include `application/json`
//! 4. body size cap, via `Content-Length` and via the measured body
//! 5. JSON parse
//! 6. JSON-RPC `error` member unwrapped into [`A2AError::JsonRpc`]
//!
//! Result-shape classification is left to the caller.

use std::collections::HashMap;
use std::time::Duration;

use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_LENGTH, CONTENT_TYPE};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::error::{A2AError, A2AResult};
use crate::types::{unwrap_envelope, JsonRpcRequest};
use crate::utils::constants::{DEFAULT_RPC_TIMEOUT, MAX_RESPONSE_BYTES};

use super::guard;

pub(crate) const APPLICATION_JSON: &str = "application/json";
pub(crate) const EVENT_STREAM: &str = "text/event-stream";

/// Configuration for [`JsonRpcTransport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Deadline for one call, covering the round trip and body read. Defaults to 30 seconds.
    pub timeout: Duration,
    /// Additional HTTP headers to include on every request.
    pub headers: HashMap<String, String>,
    /// Response body cap in bytes. Defaults to 1 MiB.
    pub max_response_bytes: u64,
    /// Permit loopback/private targets (local development, tests).
    pub allow_local: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_RPC_TIMEOUT,
            headers: HashMap::new(),
            max_response_bytes: MAX_RESPONSE_BYTES,
            allow_local: false,
        }
    }
}

impl TransportConfig {
    /// Set the per-call deadline (builder-style).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a default header (builder-style).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Override the response body cap (builder-style).
    pub fn with_max_response_bytes(mut self, max: u64) -> Self {
        self.max_response_bytes = max;
        self
    }

    /// Permit loopback/private targets (builder-style).
    pub fn with_allow_local(mut self, allow_local: bool) -> Self {
        self.allow_local = allow_local;
        self
    }
}

/// JSON-RPC over HTTP transport using `reqwest`.
///
/// # Example
///
/// ```no_run
/// use a2a_recorder::client::JsonRpcTransport;
///
/// let transport = JsonRpcTransport::new("https://agent.example.com/a2a")?;
/// # Ok::<(), a2a_recorder::A2AError>(())
/// ```
#[derive(Debug, Clone)]
pub struct JsonRpcTransport {
    client: reqwest::Client,
    url: Url,
    config: TransportConfig,
}

impl JsonRpcTransport {
    /// Create a new transport targeting the given A2A endpoint URL with default configuration.
    pub fn new(url: &str) -> A2AResult<Self> {
        Self::with_config(url, TransportConfig::default())
    }

    /// Create a new transport with custom configuration.
    ///
    /// Fails fast on a malformed URL or, unless `allow_local` is set, on a
    /// private/loopback target.
    pub fn with_config(url: &str, config: TransportConfig) -> A2AResult<Self> {
        Self::with_client(url, config, reqwest::Client::new())
    }

    /// Create a new transport with an existing `reqwest::Client`.
    pub fn with_client(url: &str, config: TransportConfig, client: reqwest::Client) -> A2AResult<Self> {
        let url = validate_target(url, config.allow_local)?;
        Ok(Self {
            client,
            url,
            config,
        })
    }

    /// Returns the URL this transport sends requests to.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the transport configuration.
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub(crate) fn http_client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Send a JSON-RPC request and return its `result` value.
    ///
    /// `headers` are per-call headers; they win over the instance defaults.
    pub async fn send(
        &self,
        request: &JsonRpcRequest,
        headers: &HashMap<String, String>,
    ) -> A2AResult<Value> {
        let timeout = self.config.timeout;
        match tokio::time::timeout(timeout, self.send_inner(request, headers)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(method = %request.method, id = %request.id, "JSON-RPC call timed out");
                Err(timeout_error(timeout))
            }
        }
    }

    async fn send_inner(
        &self,
        request: &JsonRpcRequest,
        headers: &HashMap<String, String>,
    ) -> A2AResult<Value> {
        if !self.config.allow_local && guard::is_private(&self.url) {
            return Err(private_target_error(self.url.as_str()));
        }

        let body = serde_json::to_vec(request).map_err(|e| {
            A2AError::Transport(format!("failed to serialize JSON-RPC request: {e}"))
        })?;

        debug!(url = %self.url, method = %request.method, id = %request.id, "sending JSON-RPC request");

        let response = self
            .client
            .post(self.url.clone())
            .headers(merge_headers(&self.config.headers, headers))
            .body(body)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.config.timeout))?;

        let status = response.status();
        debug!(status = status.as_u16(), id = %request.id, "JSON-RPC response received");

        if !status.is_success() {
            return Err(
                http_status_error(response, self.config.max_response_bytes, self.config.timeout)
                    .await,
            );
        }

        require_content_type(&response, APPLICATION_JSON)?;

        let bytes =
            read_limited_body(response, self.config.max_response_bytes, self.config.timeout)
                .await?;

        let envelope: Value = serde_json::from_slice(&bytes).map_err(|e| {
            A2AError::invalid_json(
                format!("failed to parse JSON-RPC response: {e}"),
                &String::from_utf8_lossy(&bytes),
            )
        })?;

        unwrap_envelope(envelope)
    }
}

// ──────────────────────────────────────────────────
// Shared HTTP helpers
// ──────────────────────────────────────────────────

/// Parse `url` and, unless `allow_local`, reject private targets.
pub(crate) fn validate_target(url: &str, allow_local: bool) -> A2AResult<Url> {
    let parsed =
        Url::parse(url).map_err(|e| A2AError::validation(format!("invalid URL '{url}': {e}")))?;
    if !allow_local && guard::is_private(&parsed) {
        return Err(private_target_error(url));
    }
    Ok(parsed)
}

pub(crate) fn private_target_error(url: &str) -> A2AError {
    warn!(url = %url, "refusing private or local target");
    A2AError::validation(format!(
        "refusing to contact private or local address: {url}"
    ))
}

pub(crate) fn timeout_error(timeout: Duration) -> A2AError {
    A2AError::Timeout {
        after_ms: timeout.as_millis() as u64,
    }
}

/// Build the request headers: `Content-Type`/`Accept: application/json`, then
/// instance defaults, then per-call headers. Later layers replace earlier ones
/// (header names compare case-insensitively).
pub(crate) fn merge_headers(
    defaults: &HashMap<String, String>,
    per_call: &HashMap<String, String>,
) -> HeaderMap {
    let mut merged = HeaderMap::new();
    merged.insert(CONTENT_TYPE, HeaderValue::from_static(APPLICATION_JSON));
    merged.insert(ACCEPT, HeaderValue::from_static(APPLICATION_JSON));

    for (key, value) in defaults.iter().chain(per_call.iter()) {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(val)) => {
                merged.insert(name, val);
            }
            _ => warn!(header = %key, "skipping invalid HTTP header"),
        }
    }
    merged
}

/// Fail unless the response `Content-Type` includes `expected`.
pub(crate) fn require_content_type(response: &reqwest::Response, expected: &str) -> A2AResult<()> {
    let actual = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if actual.to_ascii_lowercase().contains(expected) {
        Ok(())
    } else {
        Err(A2AError::ContentType {
            expected: expected.to_string(),
            actual: if actual.is_empty() {
                "<none>".to_string()
            } else {
                actual.to_string()
            },
        })
    }
}

/// Read a response body, enforcing `max` bytes against the `Content-Length`
/// header first and then against the bytes actually received.
pub(crate) async fn read_limited_body(
    response: reqwest::Response,
    max: u64,
    timeout: Duration,
) -> A2AResult<Vec<u8>> {
    let declared = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    if let Some(len) = declared {
        if len > max {
            warn!(declared = len, max, "response Content-Length over limit");
            return Err(A2AError::SizeLimit { actual: len, max });
        }
    }

    let mut body = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| map_reqwest_error(e, timeout))?;
        body.extend_from_slice(&chunk);
        if body.len() as u64 > max {
            warn!(received = body.len(), max, "response body over limit");
            return Err(A2AError::SizeLimit {
                actual: body.len() as u64,
                max,
            });
        }
    }
    Ok(body)
}

/// Turn a non-2xx response into [`A2AError::Http`], reading at most `max`
/// bytes of its body. An oversized error body is a [`A2AError::SizeLimit`].
pub(crate) async fn http_status_error(
    response: reqwest::Response,
    max: u64,
    timeout: Duration,
) -> A2AError {
    let status = response.status().as_u16();
    match read_limited_body(response, max, timeout).await {
        Ok(bytes) => A2AError::Http {
            status,
            body: crate::error::excerpt(&String::from_utf8_lossy(&bytes)),
        },
        Err(err @ A2AError::SizeLimit { .. }) => err,
        Err(err) => {
            debug!(status, error = %err, "failed to read error response body");
            A2AError::Http {
                status,
                body: String::new(),
            }
        }
    }
}

pub(crate) fn map_reqwest_error(e: reqwest::Error, timeout: Duration) -> A2AError {
    if e.is_timeout() {
        timeout_error(timeout)
    } else if e.is_connect() {
        A2AError::Transport(format!("connection failed: {e}"))
    } else {
        A2AError::Transport(format!("HTTP request failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_transport_config() {
        let config = TransportConfig::default();
        assert_eq!(config.timeout, Duration::from_millis(30_000));
        assert_eq!(config.max_response_bytes, 1_048_576);
        assert!(config.headers.is_empty());
        assert!(!config.allow_local);
    }

    #[test]
    fn construction_rejects_private_target() {
        let err = JsonRpcTransport::new("http://127.0.0.1:9000/a2a").unwrap_err();
        assert!(matches!(err, A2AError::Validation(_)));

        let ok = JsonRpcTransport::with_config(
            "http://127.0.0.1:9000/a2a",
            TransportConfig::default().with_allow_local(true),
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn construction_rejects_malformed_url() {
        let err = JsonRpcTransport::new("::not a url::").unwrap_err();
        assert!(err.to_string().contains("invalid URL"));
    }

    #[test]
    fn per_call_headers_win() {
        let defaults: HashMap<String, String> = [
            ("X-Team".to_string(), "default".to_string()),
            ("Authorization".to_string(), "Bearer a".to_string()),
        ]
        .into();
        let per_call: HashMap<String, String> =
            [("authorization".to_string(), "Bearer b".to_string())].into();

        let merged = merge_headers(&defaults, &per_call);
        assert_eq!(merged.get("authorization").unwrap(), "Bearer b");
        assert_eq!(merged.get("x-team").unwrap(), "default");
        assert_eq!(merged.get(CONTENT_TYPE).unwrap(), APPLICATION_JSON);
        assert_eq!(merged.get(ACCEPT).unwrap(), APPLICATION_JSON);
    }

    #[test]
    fn caller_can_override_accept() {
        let per_call: HashMap<String, String> =
            [("Accept".to_string(), EVENT_STREAM.to_string())].into();
        let merged = merge_headers(&HashMap::new(), &per_call);
        assert_eq!(merged.get(ACCEPT).unwrap(), EVENT_STREAM);
    }

    #[test]
    fn invalid_headers_are_skipped() {
        let per_call: HashMap<String, String> =
            [("bad header".to_string(), "v".to_string())].into();
        let merged = merge_headers(&HashMap::new(), &per_call);
        assert_eq!(merged.len(), 2);
    }
}
