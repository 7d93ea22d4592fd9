//! Single detail-document fetch.
use async_trait::async_trait;
use std::time::Instant;
use xconf_http::{HttpClient, RequestOpts};

use crate::error::FetchError;
use crate::types::{Sourcebox, Target};

/// One network fetch of the document at `target`.
///
/// Implementations make exactly one attempt. Cancellation is by drop: the
/// aggregator aborts the task running `fetch` once it stops waiting.
#[async_trait]
pub trait Fetcher: Send + Sync {
    type Document: Send + 'static;

    async fn fetch(&self, target: &Target) -> Result<Self::Document, FetchError>;
}

/// Fetches `.sourcebox.json` documents over the shared HTTP client.
#[derive(Clone, Debug)]
pub struct SourceboxFetcher {
    http: HttpClient,
}

impl SourceboxFetcher {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Fetcher for SourceboxFetcher {
    type Document = Sourcebox;

    async fn fetch(&self, target: &Target) -> Result<Sourcebox, FetchError> {
        let started = Instant::now();
        let result = self
            .http
            .get_json::<Sourcebox>(target.as_str(), RequestOpts::default())
            .await;

        match &result {
            Ok(sb) => tracing::debug!(
                target: "sourcegraph.fetch",
                url = %target,
                file = %sb.file,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "sourcebox.fetch.success"
            ),
            Err(e) => tracing::debug!(
                target: "sourcegraph.fetch",
                url = %target,
                error = %e,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "sourcebox.fetch.error"
            ),
        }
        result.map_err(FetchError::from)
    }
}
