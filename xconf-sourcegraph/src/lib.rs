//! Sourcegraph client pieces behind the xconf search page.
//!
//! - [`units`]: the `.units` search step that turns a query into sourcebox URLs
//! - [`fetcher`]: one detail fetch per URL ([`Fetcher`], [`SourceboxFetcher`])
//! - [`aggregate`]: concurrent fan-out with a caller deadline and a single
//!   representative error
//! - [`search`]: the two steps wired together
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::time::Duration;
//! use xconf_sourcegraph::{SearchSettings, SourceboxSearch};
//!
//! let search = SourceboxSearch::connect(&SearchSettings {
//!     sourcegraph_url: "https://sourcegraph.com".into(),
//!     client_timeout: Duration::from_secs(5),
//!     cache: None,
//! })?;
//! let deadline = tokio::time::Instant::now() + Duration::from_secs(7);
//! let result = search.query("nodejs", deadline).await?;
//! println!("{} sourceboxes, error: {:?}", result.documents.len(), result.error);
//! # Ok(()) }
//! ```
pub mod aggregate;
pub mod error;
pub mod fetcher;
pub mod search;
pub mod types;
pub mod units;

pub use aggregate::{AggregateResult, Aggregator};
pub use error::{AggregateError, FetchError, QueryError};
pub use fetcher::{Fetcher, SourceboxFetcher};
pub use search::{SearchSettings, SourceboxSearch};
pub use types::{RepoSourceUnit, Sourcebox, SourceUnit, Target, UnitListOptions};
pub use units::{UnitsApi, tree_url};
