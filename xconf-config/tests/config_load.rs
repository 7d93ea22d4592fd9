use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;
use xconf_common::LogFormat;
use xconf_config::XconfConfigLoader;

fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn defaults_match_the_command_line_defaults() {
    let config = XconfConfigLoader::new().load().expect("defaults load");

    assert_eq!(config.http_addr, "0.0.0.0:5400");
    assert!(!config.dev);
    assert_eq!(config.sourcegraph_url, "https://sourcegraph.com");
    assert_eq!(config.asset_url, "https://sourcegraph.com/static/");
    assert_eq!(config.client_timeout().as_secs(), 5);
    assert_eq!(config.query_timeout().as_secs(), 7);
    assert!(config.cache.enabled);
    assert_eq!(config.log.format, LogFormat::Text);
    assert!(config.log.dir.is_none());
    config.validate().expect("defaults are valid");
}

#[test]
#[serial]
fn file_then_env_overrides() {
    let tmp = TempDir::new().unwrap();
    let p = write_yaml(
        &tmp,
        "xconf.yaml",
        r#"
http_addr: "127.0.0.1:8080"
sourcegraph_url: "https://${SG_HOST}"
query_timeout_ms: 2500
cache:
  ttl_secs: 30
log:
  format: json
  dir: "${LOG_ROOT}/xconf"
"#,
    );

    temp_env::with_vars(
        [
            ("SG_HOST", Some("sg.internal")),
            ("LOG_ROOT", Some("/tmp/logs")),
            ("XCONF__DEV", Some("true")),
            ("XCONF__QUERY_TIMEOUT_MS", Some("900")),
        ],
        || {
            let config = XconfConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load system config");

            assert_eq!(config.http_addr, "127.0.0.1:8080");
            assert_eq!(config.sourcegraph_url, "https://sg.internal");
            assert!(config.dev);
            assert_eq!(config.query_timeout_ms, 900);
            assert_eq!(config.cache.ttl_secs, 30);
            assert_eq!(config.cache.max_entries, 1_000);
            assert_eq!(config.log.format, LogFormat::Json);
            assert_eq!(config.log.dir.as_deref(), Some("/tmp/logs/xconf"));
            assert!(!config.cache_enabled());
        },
    );
}

#[test]
#[serial]
fn missing_optional_file_is_fine_but_required_is_not() {
    let tmp = TempDir::new().unwrap();
    let absent = tmp.path().join("absent.yaml");

    assert!(
        XconfConfigLoader::new()
            .with_optional_file(&absent)
            .load()
            .is_ok()
    );
    assert!(XconfConfigLoader::new().with_file(&absent).load().is_err());
}
