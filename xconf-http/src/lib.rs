//! Minimal JSON-over-HTTP client shared by the xconf crates.
//!
//! - One attempt per call: no retries happen here, callers own any policy
//! - Per-request options: headers, query params, timeout
//! - Paths are joined onto the base URL; absolute URLs pass through unchanged
//! - Optional [`ResponseCache`] in front of the network for GET requests
//! - Optional *raw* response logging via `XCONF_HTTP_RAW=1`
//!
//! Example (no_run):
//! ```rust
//! # async fn demo() -> Result<(), xconf_http::HttpError> {
//! let client = xconf_http::HttpClient::new("https://sourcegraph.com/api/")?;
//! let got: serde_json::Value = client
//!     .get_json(".units", xconf_http::RequestOpts::default())
//!     .await?;
//! # Ok(()) }
//! ```
//!
//! Observability: structured `tracing` events are emitted for request start,
//! response headers, body snippets (truncated), cache hits and final errors.
//! Raw response bodies go to target `http.raw` when `XCONF_HTTP_RAW=1`.

mod cache;

pub use cache::ResponseCache;

use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;

// ==============================
// Raw logging toggles
// ==============================

const RAW_ENV: &str = "XCONF_HTTP_RAW";
const RAW_MAX_BODY: usize = 64 * 1024;
const SNIPPET_MAX: usize = 500;

fn raw_enabled() -> bool {
    matches!(
        env::var(RAW_ENV).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

static REQUEST_SEQ: AtomicU64 = AtomicU64::new(1);

fn next_request_id() -> String {
    format!("r{:x}", REQUEST_SEQ.fetch_add(1, Ordering::Relaxed))
}

// ==============================
// Errors
// ==============================

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("invalid URL: {0}")]
    Url(String),
    #[error("request build failed: {0}")]
    Build(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("decode error: {0}, body_snippet: {1}")]
    Decode(String, String),
    #[error("http response status {} from {url}: {message}", .status.as_u16())]
    Status {
        status: StatusCode,
        url: String,
        message: String,
    },
}

impl HttpError {
    /// True when the transport gave up waiting (connect or read timeout).
    pub fn is_timeout(&self) -> bool {
        matches!(self, HttpError::Timeout { .. })
    }

    /// The HTTP status for [`HttpError::Status`], `None` otherwise.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn classify_send_error(err: reqwest::Error, url: &Url) -> HttpError {
    if err.is_timeout() {
        HttpError::Timeout {
            url: url.to_string(),
        }
    } else if err.is_builder() {
        HttpError::Build(err.to_string())
    } else {
        HttpError::Network(err.to_string())
    }
}

// ==============================
// Request Options
// ==============================

/// Per-request tuning knobs.
///
/// ```
/// use xconf_http::RequestOpts;
/// use std::borrow::Cow;
/// use std::time::Duration;
///
/// let opts = RequestOpts {
///     timeout: Some(Duration::from_secs(2)),
///     query: Some(vec![("Query", Cow::Borrowed("nodejs"))]),
///     ..Default::default()
/// };
///
/// assert_eq!(opts.timeout.unwrap().as_secs(), 2);
/// assert!(opts.headers.is_none());
/// ```
#[derive(Clone, Debug, Default)]
pub struct RequestOpts<'a> {
    pub timeout: Option<Duration>,
    pub headers: Option<HeaderMap>,
    pub query: Option<Vec<(&'a str, Cow<'a, str>)>>,
}

// ==============================
// Client
// ==============================

#[derive(Clone, Debug)]
pub struct HttpClient {
    base: Url,
    inner: Client,
    cache: Option<ResponseCache>,
    pub default_timeout: Duration,
}

impl HttpClient {
    /// Construct a client anchored to a base URL.
    ///
    /// ```no_run
    /// use xconf_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://sourcegraph.com/api/")?;
    /// assert_eq!(client.default_timeout, Duration::from_secs(5));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn new(base: &str) -> Result<Self, HttpError> {
        Self::with_user_agent(base, concat!("xconf/", env!("CARGO_PKG_VERSION")))
    }

    /// Like [`HttpClient::new`] with an explicit `User-Agent`.
    pub fn with_user_agent(base: &str, user_agent: &str) -> Result<Self, HttpError> {
        let base = Url::parse(base).map_err(|e| HttpError::Url(e.to_string()))?;
        let mut defaults = HeaderMap::new();
        defaults.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent).map_err(|e| HttpError::Build(e.to_string()))?,
        );
        let inner = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .default_headers(defaults)
            .build()
            .map_err(|e| HttpError::Build(e.to_string()))?;
        Ok(Self {
            base,
            inner,
            cache: None,
            default_timeout: Duration::from_secs(5),
        })
    }

    /// Override the per-request timeout.
    ///
    /// ```no_run
    /// use xconf_http::{HttpClient, HttpError};
    /// use std::time::Duration;
    ///
    /// let client = HttpClient::new("https://sourcegraph.com/api/")?
    ///     .with_timeout(Duration::from_secs(2));
    /// assert_eq!(client.default_timeout, Duration::from_secs(2));
    /// # Ok::<(), HttpError>(())
    /// ```
    pub fn with_timeout(mut self, dur: Duration) -> Self {
        self.default_timeout = dur;
        self
    }

    /// Serve repeated GETs from `cache` while entries are fresh.
    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// GET JSON with per-request options.
    pub async fn get_json<T>(&self, path: &str, opts: RequestOpts<'_>) -> Result<T, HttpError>
    where
        T: DeserializeOwned,
    {
        let url = self.resolve(path, &opts)?;
        let req_id = next_request_id();

        if let Some(cache) = &self.cache {
            if let Some(bytes) = cache.get(url.as_str()).await {
                tracing::debug!(
                    req_id=%req_id,
                    host_path=%host_path(&url),
                    body_len=bytes.len(),
                    "http.cache.hit"
                );
                return decode_json(&req_id, &bytes);
            }
        }

        let bytes = self.send(Method::GET, &url, &req_id, &opts).await?;
        let value = decode_json(&req_id, &bytes)?;

        if let Some(cache) = &self.cache {
            cache.insert(url.to_string(), bytes).await;
        }
        Ok(value)
    }

    fn resolve(&self, path: &str, opts: &RequestOpts<'_>) -> Result<Url, HttpError> {
        let mut url = self
            .base
            .join(path)
            .map_err(|e| HttpError::Url(e.to_string()))?;
        if let Some(q) = &opts.query {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in q {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Perform exactly one request and return the body of a 2xx response.
    async fn send(
        &self,
        method: Method,
        url: &Url,
        req_id: &str,
        opts: &RequestOpts<'_>,
    ) -> Result<Bytes, HttpError> {
        let timeout = opts.timeout.unwrap_or(self.default_timeout);
        let mut rb = self
            .inner
            .request(method.clone(), url.clone())
            .timeout(timeout);
        if let Some(hdrs) = &opts.headers {
            rb = rb.headers(hdrs.clone());
        }

        tracing::debug!(
            req_id=%req_id,
            method=%method,
            host_path=%host_path(url),
            query=?url.query(),
            timeout_ms=timeout.as_millis() as u64,
            "http.request.start"
        );

        let t0 = std::time::Instant::now();
        let resp = rb.send().await.map_err(|err| {
            let err = classify_send_error(err, url);
            tracing::warn!(req_id=%req_id, error=%err, "http.network_error.send");
            err
        })?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = resp.bytes().await.map_err(|err| {
            let err = classify_send_error(err, url);
            tracing::warn!(req_id=%req_id, error=%err, "http.network_error.body");
            err
        })?;
        let dur_ms = t0.elapsed().as_millis() as u64;

        let x_request_id = headers
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::debug!(
            req_id=%req_id,
            %status,
            duration_ms=dur_ms,
            body_len=bytes.len(),
            x_request_id=%x_request_id,
            "http.response.headers"
        );

        if raw_enabled() {
            let truncated = bytes.len() > RAW_MAX_BODY;
            let shown = &bytes[..bytes.len().min(RAW_MAX_BODY)];
            tracing::info!(
                target: "http.raw",
                %req_id,
                %status,
                duration_ms=dur_ms,
                body=%String::from_utf8_lossy(shown),
                truncated
            );
        }

        if status.is_success() {
            return Ok(bytes);
        }

        let message = extract_error_message(&bytes);
        tracing::warn!(
            req_id=%req_id,
            %status,
            message=%message,
            host_path=%host_path(url),
            "http.error"
        );
        Err(HttpError::Status {
            status,
            url: url.to_string(),
            message,
        })
    }
}

// ==============================
// Helpers
// ==============================

fn decode_json<T: DeserializeOwned>(req_id: &str, bytes: &[u8]) -> Result<T, HttpError> {
    serde_json::from_slice::<T>(bytes).map_err(|e| {
        let snippet = snip_body(bytes);
        tracing::warn!(
            req_id=%req_id,
            serde_line=%e.line(),
            serde_col=%e.column(),
            serde_err=%e,
            body_snippet=%snippet,
            "http.response.decode_error"
        );
        HttpError::Decode(e.to_string(), snippet)
    })
}

fn host_path(url: &Url) -> String {
    format!("{}{}", url.host_str().unwrap_or("-"), url.path())
}

/// Best-effort error message from a JSON error body, else a body snippet.
fn extract_error_message(body: &[u8]) -> String {
    // {"Error":"..."} (Sourcegraph), {"message":"..."} or {"error":"..."}
    #[derive(Deserialize)]
    struct Msg {
        #[serde(default, rename = "Error")]
        upper_error: String,
        #[serde(default)]
        message: String,
        #[serde(default)]
        error: String,
    }

    if let Ok(m) = serde_json::from_slice::<Msg>(body) {
        for candidate in [m.upper_error, m.message, m.error] {
            if !candidate.is_empty() {
                return candidate;
            }
        }
    }
    snip_body(body)
}

fn snip_body(body: &[u8]) -> String {
    let mut snip = String::from_utf8_lossy(body).trim().to_string();
    if snip.len() > SNIPPET_MAX {
        let mut cut = SNIPPET_MAX;
        while !snip.is_char_boundary(cut) {
            cut -= 1;
        }
        snip.truncate(cut);
        snip.push_str("...");
    }
    snip
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_json_fields() {
        assert_eq!(extract_error_message(br#"{"Error":"no such repo"}"#), "no such repo");
        assert_eq!(extract_error_message(br#"{"message":"bad"}"#), "bad");
        assert_eq!(extract_error_message(b"plain text"), "plain text");
    }

    #[test]
    fn snippet_is_truncated_on_char_boundary() {
        let body = "é".repeat(400);
        let snip = snip_body(body.as_bytes());
        assert!(snip.ends_with("..."));
        assert!(snip.len() <= SNIPPET_MAX + 3);
    }

    #[test]
    fn paths_join_base_and_absolute_urls_pass_through() {
        let client = HttpClient::new("https://sourcegraph.com/api/").unwrap();
        let joined = client.resolve(".units", &RequestOpts::default()).unwrap();
        assert_eq!(joined.as_str(), "https://sourcegraph.com/api/.units");

        let abs = client
            .resolve("https://other.example/x", &RequestOpts::default())
            .unwrap();
        assert_eq!(abs.as_str(), "https://other.example/x");
    }

    #[test]
    fn query_pairs_are_encoded() {
        let client = HttpClient::new("https://sourcegraph.com/api/").unwrap();
        let url = client
            .resolve(
                ".units",
                &RequestOpts {
                    query: Some(vec![("Query", Cow::Borrowed("apt-get install"))]),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(url.query(), Some("Query=apt-get+install"));
    }
}
