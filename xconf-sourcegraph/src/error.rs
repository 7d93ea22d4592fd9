use thiserror::Error;
use xconf_http::HttpError;

/// Why a single detail fetch produced no document.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport, status or decode failure from the HTTP client.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// The fetch task itself died (panicked or was aborted).
    #[error("fetch task for {target} failed: {message}")]
    Task { target: String, message: String },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Http(e) if e.is_timeout())
    }
}

/// The single representative error of one fan-out.
#[derive(Debug, Error)]
pub enum AggregateError {
    /// First failure observed by the collection loop.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// The deadline passed before every target reported back.
    #[error("results timeout ({collected} collected, {outstanding} outstanding)")]
    Timeout { collected: usize, outstanding: usize },
}

impl AggregateError {
    pub fn is_timeout(&self) -> bool {
        match self {
            AggregateError::Timeout { .. } => true,
            AggregateError::Fetch(e) => e.is_timeout(),
        }
    }
}

/// Failures that stop a query before any detail fetch is issued.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("units search failed: {0}")]
    Search(#[source] HttpError),

    #[error("unit in {repo} is unusable: {message}")]
    Unit { repo: String, message: String },

    #[error("cannot build sourcebox URL: {0}")]
    Url(String),
}

impl QueryError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, QueryError::Search(e) if e.is_timeout())
    }
}
