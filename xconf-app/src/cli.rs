use std::path::PathBuf;

use clap::{ArgAction, Parser};
use xconf_config::AppConfig;

/// Command-line overrides. Anything left unset keeps the value from the
/// config file or `XCONF__*` environment.
#[derive(Debug, Default, Parser)]
#[command(name = "xconf")]
#[command(about = "Search Dockerfiles on Sourcegraph", long_about = None)]
pub struct Cli {
    /// YAML config file. `xconf.yaml` is read if present.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// HTTP listen address
    #[arg(long = "http", value_name = "ADDR")]
    pub http_addr: Option<String>,

    /// Development mode (unminified assets, no response cache)
    #[arg(long, action = ArgAction::SetTrue)]
    pub dev: bool,

    /// Base Sourcegraph URL
    #[arg(long = "sg", value_name = "URL")]
    pub sourcegraph_url: Option<String>,

    /// Base Sourcegraph asset URL
    #[arg(long = "sg-asset", value_name = "URL")]
    pub asset_url: Option<String>,

    /// Per-request HTTP timeout, in milliseconds
    #[arg(long, value_name = "MS")]
    pub client_timeout_ms: Option<u64>,

    /// Deadline for a whole query, in milliseconds
    #[arg(long, value_name = "MS")]
    pub query_timeout_ms: Option<u64>,
}

impl Cli {
    pub fn apply(&self, cfg: &mut AppConfig) {
        if let Some(addr) = &self.http_addr {
            cfg.http_addr = addr.clone();
        }
        if self.dev {
            cfg.dev = true;
        }
        if let Some(url) = &self.sourcegraph_url {
            cfg.sourcegraph_url = url.clone();
        }
        if let Some(url) = &self.asset_url {
            cfg.asset_url = url.clone();
        }
        if let Some(ms) = self.client_timeout_ms {
            cfg.client_timeout_ms = ms;
        }
        if let Some(ms) = self.query_timeout_ms {
            cfg.query_timeout_ms = ms;
        }
    }
}
