//! End-to-end query: units search, then the sourcebox fan-out.
use std::time::Duration;

use tokio::time::Instant;
use url::Url;
use xconf_http::{HttpClient, HttpError, ResponseCache};

use crate::aggregate::{AggregateResult, Aggregator};
use crate::error::QueryError;
use crate::fetcher::SourceboxFetcher;
use crate::types::{Sourcebox, Target, UnitListOptions};
use crate::units::{UnitsApi, search_text};

pub const USER_AGENT: &str = "xconf/0.0.1";

/// Connection settings for [`SourceboxSearch::connect`].
#[derive(Clone, Debug)]
pub struct SearchSettings {
    /// Site root, e.g. `https://sourcegraph.com`.
    pub sourcegraph_url: String,
    /// Per-request HTTP timeout.
    pub client_timeout: Duration,
    pub cache: Option<ResponseCache>,
}

#[derive(Clone)]
pub struct SourceboxSearch {
    units: UnitsApi,
    aggregator: Aggregator<SourceboxFetcher>,
}

impl SourceboxSearch {
    pub fn new(units: UnitsApi, aggregator: Aggregator<SourceboxFetcher>) -> Self {
        Self { units, aggregator }
    }

    /// Build the API client, units search and fetcher from `settings`. Units
    /// listing and sourcebox fetches share one connection pool and cache.
    pub fn connect(settings: &SearchSettings) -> Result<Self, HttpError> {
        let site = Url::parse(&settings.sourcegraph_url).map_err(|e| HttpError::Url(e.to_string()))?;
        let api_base = site
            .join("/api/")
            .map_err(|e| HttpError::Url(e.to_string()))?;

        let mut http = HttpClient::with_user_agent(api_base.as_str(), USER_AGENT)?
            .with_timeout(settings.client_timeout);
        if let Some(cache) = &settings.cache {
            http = http.with_cache(cache.clone());
        }

        Ok(Self::new(
            UnitsApi::new(http.clone()),
            Aggregator::new(SourceboxFetcher::new(http)),
        ))
    }

    /// Resolve `query` to Dockerfile units and fetch their sourceboxes,
    /// collecting whatever arrives by `deadline`.
    ///
    /// A failed units search fails the whole query; fetch failures and the
    /// deadline only show up as the result's representative error.
    pub async fn query(
        &self,
        query: &str,
        deadline: Instant,
    ) -> Result<AggregateResult<Sourcebox>, QueryError> {
        let opts = UnitListOptions::dockerfiles(search_text(query));
        let units = self.units.list(&opts).await.map_err(QueryError::Search)?;

        let targets = units
            .iter()
            .map(|u| self.units.sourcebox_url(u))
            .collect::<Result<Vec<Target>, _>>()?;

        Ok(self.aggregator.aggregate(targets, deadline).await)
    }
}
