//! Agent card discovery.
//!
//! Fetches the agent card from `{base_url}/.well-known/agent.json`, enforces
//! the response size cap, validates the required fields and fingerprints the
//! raw body so a caller-side cache can tell when a card changed.
//!
//! Expected failures (bad URL, private target, timeout, oversize body, invalid
//! JSON, schema mismatch) are reported inside [`CardFetchResult`], never as an
//! `Err` or a panic.

use std::collections::HashMap;
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use url::Url;

use crate::error::{A2AError, A2AResult};
use crate::types::AgentCard;
use crate::utils::constants::{AGENT_CARD_WELL_KNOWN_PATH, DEFAULT_CARD_TIMEOUT, MAX_RESPONSE_BYTES};

use super::transport::{map_reqwest_error, merge_headers, read_limited_body, timeout_error, validate_target};

/// Options for a single [`CardResolver::fetch`].
#[derive(Debug, Clone)]
pub struct CardFetchOptions {
    /// Deadline for the whole fetch. Defaults to 10 seconds.
    pub timeout: Duration,
    /// Extra headers; they win over the `Accept` default.
    pub headers: HashMap<String, String>,
    /// Permit loopback/private targets.
    pub allow_local: bool,
}

impl Default for CardFetchOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_CARD_TIMEOUT,
            headers: HashMap::new(),
            allow_local: false,
        }
    }
}

impl CardFetchOptions {
    /// Set the deadline (builder-style).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Add a header (builder-style).
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Permit loopback/private targets (builder-style).
    pub fn with_allow_local(mut self, allow_local: bool) -> Self {
        self.allow_local = allow_local;
        self
    }
}

/// Outcome of an agent card fetch.
#[derive(Debug, Clone)]
pub struct CardFetchResult {
    /// The normalized card URL, or the input when it could not be normalized.
    pub url: String,
    /// The validated card, or why there is none.
    pub card: A2AResult<AgentCard>,
    /// Hex SHA-256 of the raw response body, present whenever a body was read.
    pub hash: Option<String>,
    /// HTTP status of the response, when one was received.
    pub status_code: Option<u16>,
}

impl CardFetchResult {
    fn failed(url: String, error: A2AError) -> Self {
        Self {
            url,
            card: Err(error),
            hash: None,
            status_code: None,
        }
    }

    /// Whether a valid card was fetched.
    pub fn is_ok(&self) -> bool {
        self.card.is_ok()
    }

    /// The card, if the fetch succeeded.
    pub fn agent_card(&self) -> Option<&AgentCard> {
        self.card.as_ref().ok()
    }

    /// The error, if the fetch failed.
    pub fn error(&self) -> Option<&A2AError> {
        self.card.as_ref().err()
    }
}

/// Resolves [`AgentCard`]s from agent base URLs.
///
/// # Example
///
/// ```no_run
/// use a2a_recorder::client::{CardFetchOptions, CardResolver};
///
/// # async fn example() {
/// let resolver = CardResolver::new();
/// let result = resolver
///     .fetch("https://agent.example.com", &CardFetchOptions::default())
///     .await;
/// if let Some(card) = result.agent_card() {
///     println!("Agent: {} v{} (hash {:?})", card.name, card.version, result.hash);
/// }
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct CardResolver {
    client: reqwest::Client,
}

impl CardResolver {
    /// Create a new resolver with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new resolver with an existing `reqwest::Client`.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Append the well-known card path unless the URL already ends with it.
    ///
    /// Any query string is kept and moved after the appended path.
    ///
    /// ```
    /// use a2a_recorder::client::CardResolver;
    ///
    /// assert_eq!(
    ///     CardResolver::normalize("https://example.com").unwrap(),
    ///     "https://example.com/.well-known/agent.json"
    /// );
    /// assert_eq!(
    ///     CardResolver::normalize("https://example.com/agents/a?v=2").unwrap(),
    ///     "https://example.com/agents/a/.well-known/agent.json?v=2"
    /// );
    /// ```
    pub fn normalize(url: &str) -> A2AResult<String> {
        let mut parsed = Url::parse(url)
            .map_err(|e| A2AError::validation(format!("invalid URL '{url}': {e}")))?;
        let path = parsed.path().trim_end_matches('/').to_string();
        if !path.ends_with(AGENT_CARD_WELL_KNOWN_PATH) {
            parsed.set_path(&format!("{path}{AGENT_CARD_WELL_KNOWN_PATH}"));
        }
        parsed.set_fragment(None);
        Ok(parsed.to_string())
    }

    /// Fetch, size-check, hash and validate the agent card at `url`.
    pub async fn fetch(&self, url: &str, options: &CardFetchOptions) -> CardFetchResult {
        let card_url = match Self::normalize(url) {
            Ok(card_url) => card_url,
            Err(e) => return CardFetchResult::failed(url.to_string(), e),
        };
        if let Err(e) = validate_target(&card_url, options.allow_local) {
            return CardFetchResult::failed(card_url, e);
        }

        debug!(url = %card_url, "fetching agent card");

        match tokio::time::timeout(options.timeout, self.fetch_inner(&card_url, options)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(url = %card_url, "agent card fetch timed out");
                CardFetchResult::failed(card_url, timeout_error(options.timeout))
            }
        }
    }

    async fn fetch_inner(&self, card_url: &str, options: &CardFetchOptions) -> CardFetchResult {
        let response = match self
            .client
            .get(card_url)
            .headers(merge_headers(&HashMap::new(), &options.headers))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return CardFetchResult::failed(
                    card_url.to_string(),
                    map_reqwest_error(e, options.timeout),
                )
            }
        };

        let status = response.status();
        let status_code = Some(status.as_u16());

        let bytes = match read_limited_body(response, MAX_RESPONSE_BYTES, options.timeout).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return CardFetchResult {
                    status_code,
                    ..CardFetchResult::failed(card_url.to_string(), e)
                }
            }
        };
        let hash = Some(content_hash(&bytes));

        let card = if status.is_success() {
            parse_card(&bytes)
        } else {
            Err(A2AError::Http {
                status: status.as_u16(),
                body: crate::error::excerpt(&String::from_utf8_lossy(&bytes)),
            })
        };

        match &card {
            Ok(card) => debug!(name = %card.name, version = %card.version, "resolved agent card"),
            Err(e) => warn!(url = %card_url, error = %e, "agent card rejected"),
        }

        CardFetchResult {
            url: card_url.to_string(),
            card,
            hash,
            status_code,
        }
    }
}

/// Stable fingerprint of a raw card body (lowercase hex SHA-256).
pub fn content_hash(body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(body);
    format!("{:x}", hasher.finalize())
}

fn parse_card(bytes: &[u8]) -> A2AResult<AgentCard> {
    let value: serde_json::Value = serde_json::from_slice(bytes).map_err(|e| {
        A2AError::invalid_json(
            format!("failed to parse agent card: {e}"),
            &String::from_utf8_lossy(bytes),
        )
    })?;
    AgentCard::from_json(&value)
}
