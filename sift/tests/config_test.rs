//! Tests for config module

use sift::config::{Config, ENGINE_URL_ENV};
use sift::query::SearchDefaults;
use tempfile::tempdir;

fn engine_url_overridden() -> bool {
    std::env::var(ENGINE_URL_ENV).is_ok()
}

#[test]
fn test_default_config() {
    let config = Config::default();

    assert_eq!(config.engine.url, "http://localhost:9200");
    assert!(config.engine.username.is_none());
    assert!(config.engine.api_key.is_none());
    assert_eq!(config.engine.connect_timeout_ms, 5000);
    assert_eq!(config.engine.request_timeout_ms, 60000);
    assert_eq!(config.search.default_timeout_ms, 30_000);
    assert_eq!(config.search.allow_partial_search_results, Some(true));
    assert_eq!(config.observability.log_format, "pretty");
}

#[test]
fn test_load_partial_file_fills_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sift.toml");
    std::fs::write(
        &path,
        r#"
[engine]
username = "reader"
password = "secret"

[search]
default_timeout_ms = 1500
"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.engine.username.as_deref(), Some("reader"));
    assert_eq!(config.engine.password.as_deref(), Some("secret"));
    assert_eq!(config.engine.connect_timeout_ms, 5000);
    assert_eq!(config.search.default_timeout_ms, 1500);
    assert_eq!(config.search.allow_partial_search_results, Some(true));
    assert_eq!(config.observability.log_level, "info,sift=debug");
}

#[test]
fn test_partial_results_flag_unset() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sift.toml");
    std::fs::write(
        &path,
        r#"
[search]
default_timeout_ms = 0
allow_partial_search_results = "unset"
"#,
    )
    .unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.search, SearchDefaults::new(0, None));
}

#[test]
fn test_partial_results_flag_false() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sift.toml");
    std::fs::write(&path, "[search]\nallow_partial_search_results = false\n").unwrap();

    let config = Config::load(&path).unwrap();
    assert_eq!(config.search.allow_partial_search_results, Some(false));
}

#[test]
fn test_save_and_reload() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("sift.toml");

    let mut config = Config::default();
    config.engine.url = "https://search.internal:9243".to_string();
    config.engine.api_key = Some("a2V5OnNlY3JldA==".to_string());
    config.search = SearchDefaults::new(10_000, None);
    config.observability.log_format = "json".to_string();
    config.save(&path).unwrap();

    let loaded = Config::load(&path).unwrap();
    if !engine_url_overridden() {
        assert_eq!(loaded.engine.url, "https://search.internal:9243");
    }
    assert_eq!(loaded.engine.api_key.as_deref(), Some("a2V5OnNlY3JldA=="));
    assert_eq!(loaded.search, SearchDefaults::new(10_000, None));
    assert_eq!(loaded.observability.log_format, "json");
}

#[test]
fn test_load_or_default_missing_file() {
    let dir = tempdir().unwrap();
    let config = Config::load_or_default(&dir.path().join("absent.toml")).unwrap();
    assert_eq!(config.search, SearchDefaults::default());
    if !engine_url_overridden() {
        assert_eq!(config.engine.url, "http://localhost:9200");
    }
}

#[test]
fn test_invalid_file_is_config_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sift.toml");
    std::fs::write(&path, "[search]\ndefault_timeout_ms = \"soon\"\n").unwrap();

    let err = Config::load(&path).unwrap_err();
    assert_eq!(err.kind(), sift::ErrorKind::Config);
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = tempdir().unwrap();
    let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, sift::Error::Config(_)));
}
