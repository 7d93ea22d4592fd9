//! The xconf page server: a search box over Dockerfile sourceboxes.
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Html;
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tower_http::trace::TraceLayer;
use url::Url;
use xconf_config::AppConfig;
use xconf_sourcegraph::SourceboxSearch;

pub mod render;

pub use render::{PageSettings, SearchPage, html_escape, query_url, render_home, render_results};

const ROBOTS_TXT: &str = "User-agent: *\nAllow: /\n";

/// Shared handler state. Cheap to clone.
#[derive(Clone)]
pub struct WebState {
    search: SourceboxSearch,
    page: Arc<PageSettings>,
    query_timeout: Duration,
}

impl WebState {
    pub fn new(search: SourceboxSearch, page: PageSettings, query_timeout: Duration) -> Self {
        Self {
            search,
            page: Arc::new(page),
            query_timeout,
        }
    }

    pub fn from_config(cfg: &AppConfig, search: SourceboxSearch) -> Result<Self, url::ParseError> {
        let page = PageSettings {
            sourcegraph_url: Url::parse(&cfg.sourcegraph_url)?,
            asset_url: Url::parse(&cfg.asset_url)?,
            dev: cfg.dev,
        };
        Ok(Self::new(search, page, cfg.query_timeout()))
    }

    /// Run `query` against the backend with a fresh deadline. An empty query
    /// skips the backend entirely.
    pub async fn search_page(&self, query: &str) -> SearchPage {
        let mut page = SearchPage {
            query: query.to_string(),
            ..Default::default()
        };
        if query.is_empty() {
            return page;
        }

        let deadline = Instant::now() + self.query_timeout;
        match self.search.query(query, deadline).await {
            Ok(result) => {
                let (documents, error) = result.into_parts();
                page.results = documents;
                if let Some(e) = error {
                    flag_error(&mut page, e.is_timeout(), &e);
                }
            }
            Err(e) => flag_error(&mut page, e.is_timeout(), &e),
        }
        page
    }
}

fn flag_error(page: &mut SearchPage, timeout: bool, err: &dyn std::error::Error) {
    page.timeout_error = timeout;
    page.other_error = !timeout;
    tracing::warn!(
        target: "xconf.web",
        query = %page.query,
        timeout,
        collected = page.results.len(),
        error = %err,
        "query.error"
    );
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/robots.txt", get(robots))
        .fallback(home)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: WebState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(target: "xconf.web", %addr, "server.listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn home(
    State(state): State<WebState>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Html<String> {
    let page = state.search_page(params.q.trim()).await;
    let pjax = headers.get("x-pjax").is_some_and(|v| !v.is_empty());
    if pjax {
        Html(render_results(&page, &state.page))
    } else {
        Html(render_home(&page, &state.page))
    }
}

async fn robots() -> &'static str {
    ROBOTS_TXT
}
