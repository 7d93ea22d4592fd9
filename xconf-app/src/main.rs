use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use xconf_common::observability::{LogConfig, init_logging};
use xconf_config::{AppConfig, XconfConfigLoader};
use xconf_http::ResponseCache;
use xconf_sourcegraph::{SearchSettings, SourceboxSearch};
use xconf_web::WebState;

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Config: defaults, file, env; flags win over all of them.
    let loader = match &cli.config {
        Some(path) => XconfConfigLoader::new().with_file(path),
        None => XconfConfigLoader::new().with_optional_file("xconf.yaml"),
    };
    let mut cfg: AppConfig = loader.load().context("loading configuration")?;
    cli.apply(&mut cfg);
    cfg.validate().context("invalid configuration")?;

    // 2) Logging
    let log_file = init_logging(LogConfig {
        app_name: "xconf",
        log_dir: cfg.log.dir.as_ref().map(PathBuf::from),
        emit_stderr: cfg.log.stderr,
        format: cfg.log.format,
        default_filter: cfg.log.filter.clone(),
    })?;
    tracing::info!(
        log_file = %log_file.display(),
        sourcegraph = %cfg.sourcegraph_url,
        dev = cfg.dev,
        cache = cfg.cache_enabled(),
        "xconf.start"
    );

    // 3) Backend and pages
    let cache = cfg.cache_enabled().then(|| {
        ResponseCache::new(
            std::time::Duration::from_secs(cfg.cache.ttl_secs),
            cfg.cache.max_entries,
        )
    });
    let search = SourceboxSearch::connect(&SearchSettings {
        sourcegraph_url: cfg.sourcegraph_url.clone(),
        client_timeout: cfg.client_timeout(),
        cache,
    })?;
    let state = WebState::from_config(&cfg, search)?;

    // 4) Serve until Ctrl-C
    let listener = tokio::net::TcpListener::bind(&cfg.http_addr)
        .await
        .with_context(|| format!("binding {}", cfg.http_addr))?;
    xconf_web::serve(listener, state, async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("xconf.shutdown");
    })
    .await?;
    Ok(())
}
