//! Tests for configuration file loading and priority resolution
//!
//! - Missing TOML files SHALL NOT cause termination
//! - Unparseable TOML files SHALL be reported, not ignored
//! - Priority: CLI/env override > TOML > compiled default

use epe_common::config::{load_toml_config, Overrides, ServerConfig, TomlConfig};
use epe_common::Error;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_missing_config_file_uses_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let config = load_toml_config(&temp_dir.path().join("config.toml")).unwrap();

    assert!(config.port.is_none());
    assert!(config.data_dir.is_none());
    assert_eq!(config.logging.level, "info");
    assert!(config.logging.file.is_none());
}

#[test]
fn test_full_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
bind_address = "0.0.0.0"
port = 8081
data_dir = "/srv/epe/data"
static_dir = "/srv/epe/static"

[logging]
level = "debug"
file = "/var/log/epe/server.log"
"#,
    )
    .unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.bind_address.as_deref(), Some("0.0.0.0"));
    assert_eq!(config.port, Some(8081));
    assert_eq!(config.data_dir, Some(PathBuf::from("/srv/epe/data")));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.logging.file,
        Some(PathBuf::from("/var/log/epe/server.log"))
    );
}

#[test]
fn test_partial_logging_table_keeps_default_level() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "[logging]\nfile = \"server.log\"\n").unwrap();

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.file, Some(PathBuf::from("server.log")));
}

#[test]
fn test_invalid_config_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(&path, "port = \"eighty\"\n").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(matches!(err, Error::Config(msg) if msg.contains("Parse")));
}

#[test]
fn test_priority_override_then_toml_then_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    fs::write(
        &path,
        "port = 8081\nstatic_dir = \"/srv/static\"\n[logging]\nlevel = \"warn\"\n",
    )
    .unwrap();
    let toml_config = load_toml_config(&path).unwrap();

    let overrides = Overrides {
        port: Some(9999),
        log_file: Some(PathBuf::from("/tmp/epe.log")),
        ..Default::default()
    };
    let config = ServerConfig::resolve(overrides, toml_config);

    // Override
    assert_eq!(config.port, 9999);
    assert_eq!(config.logging.file, Some(PathBuf::from("/tmp/epe.log")));
    // TOML
    assert_eq!(config.static_dir, PathBuf::from("/srv/static"));
    assert_eq!(config.logging.level, "warn");
    // Compiled default
    assert_eq!(config.bind_address, "127.0.0.1");
}

#[test]
fn test_ensure_data_dir_creates_folder() {
    let temp_dir = TempDir::new().unwrap();
    let data_dir = temp_dir.path().join("nested").join("data");

    let overrides = Overrides {
        data_dir: Some(data_dir.clone()),
        static_dir: Some(temp_dir.path().to_path_buf()),
        ..Default::default()
    };
    let config = ServerConfig::resolve(overrides, TomlConfig::default());
    config.ensure_data_dir().unwrap();

    assert!(data_dir.is_dir());
}
