//! Configuration file loading.

use std::io::Write;

use fastgpt_proxy::config::{Config, ConfigError};

#[test]
fn test_partial_file_keeps_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"upstream": {{"timeout_secs": 30}}, "stream": {{"chunk_size": 8}}}}"#
    )
    .unwrap();

    let cfg = Config::load(file.path()).unwrap();
    assert_eq!(cfg.upstream.timeout_secs, 30);
    assert_eq!(cfg.stream.chunk_size, 8);
    assert_eq!(cfg.stream.model, "fastgpt");
    assert_eq!(cfg.server.listen, "0.0.0.0:5000");
    assert!(cfg.auth.api_key.is_none());
}

#[test]
fn test_keys_in_file_are_ignored() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"auth": {{"api_key": "from-file"}}, "upstream": {{"api_key": "from-file"}}}}"#
    )
    .unwrap();

    let cfg = Config::load(file.path()).unwrap();
    assert!(cfg.auth.api_key.is_none());
    assert!(cfg.upstream.api_key.is_none());
}

#[test]
fn test_invalid_json_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();
    assert!(matches!(
        Config::load(file.path()),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Config::load(&dir.path().join("absent.json")).unwrap();
    assert_eq!(cfg.stream.chunk_size, 20);
}
