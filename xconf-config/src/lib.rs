//! Typed application configuration: built-in defaults, optional YAML files,
//! then `XCONF__`-prefixed environment variables.
//!
//! String values may reference other environment variables as `${VAR}`;
//! references are expanded after all sources are merged. Nested keys use `__`
//! in the environment, e.g. `XCONF__CACHE__TTL_SECS=60`.
use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use url::Url;
use xconf_common::LogFormat;

pub use config::ConfigError;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "XCONF";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Socket address the page server binds to.
    pub http_addr: String,
    /// Development mode: unminified assets, no response cache.
    pub dev: bool,
    /// Base Sourcegraph site URL; the API lives under `/api/`.
    pub sourcegraph_url: String,
    /// Base URL for static assets referenced by rendered pages.
    pub asset_url: String,
    /// Per-request HTTP timeout.
    pub client_timeout_ms: u64,
    /// Deadline for a whole query (search plus all detail fetches).
    pub query_timeout_ms: u64,
    pub cache: CacheConfig,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_secs: u64,
    pub max_entries: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LogSettings {
    #[serde(default)]
    pub dir: Option<String>,
    pub format: LogFormat,
    pub stderr: bool,
    pub filter: String,
}

impl AppConfig {
    pub fn client_timeout(&self) -> Duration {
        Duration::from_millis(self.client_timeout_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// The response cache is only used outside dev mode.
    pub fn cache_enabled(&self) -> bool {
        self.cache.enabled && !self.dev
    }

    /// Check URLs and timeouts before anything is wired up.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, raw) in [
            ("sourcegraph_url", &self.sourcegraph_url),
            ("asset_url", &self.asset_url),
        ] {
            Url::parse(raw)
                .map_err(|e| ConfigError::Message(format!("{key}: invalid URL {raw:?}: {e}")))?;
        }
        if self.http_addr.trim().is_empty() {
            return Err(ConfigError::Message("http_addr must not be empty".into()));
        }
        if self.client_timeout_ms == 0 || self.query_timeout_ms == 0 {
            return Err(ConfigError::Message("timeouts must be non-zero".into()));
        }
        Ok(())
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

fn with_defaults(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    builder
        .set_default("http_addr", "0.0.0.0:5400")?
        .set_default("dev", false)?
        .set_default("sourcegraph_url", "https://sourcegraph.com")?
        .set_default("asset_url", "https://sourcegraph.com/static/")?
        .set_default("client_timeout_ms", 5_000)?
        .set_default("query_timeout_ms", 7_000)?
        .set_default("cache.enabled", true)?
        .set_default("cache.ttl_secs", 300)?
        .set_default("cache.max_entries", 1_000)?
        .set_default("log.format", "text")?
        .set_default("log.stderr", true)?
        .set_default("log.filter", "info")
}

/// Builder over the `config` crate wiring. Environment overrides are applied
/// last, so they win over every file.
pub struct XconfConfigLoader {
    builder: ConfigBuilder<DefaultState>,
}

impl Default for XconfConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl XconfConfigLoader {
    /// Start from built-in defaults.
    ///
    /// ```
    /// use xconf_config::XconfConfigLoader;
    ///
    /// let config = XconfConfigLoader::new()
    ///     .with_yaml_str("dev: true\nquery_timeout_ms: 1500")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert!(config.dev);
    /// assert_eq!(config.query_timeout_ms, 1500);
    /// assert_eq!(config.http_addr, "0.0.0.0:5400");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a required YAML/TOML/JSON file; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Merge all sources, expand `${VAR}` references and deserialize.
    ///
    /// ```
    /// use xconf_config::XconfConfigLoader;
    ///
    /// unsafe { std::env::set_var("SG_HOST", "sourcegraph.example.com"); }
    ///
    /// let config = XconfConfigLoader::new()
    ///     .with_yaml_str(r#"sourcegraph_url: "https://${SG_HOST}""#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.sourcegraph_url, "https://sourcegraph.example.com");
    ///
    /// unsafe { std::env::remove_var("SG_HOST"); }
    /// ```
    pub fn load(self) -> Result<AppConfig, ConfigError> {
        let cfg = with_defaults(self.builder)?
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}
