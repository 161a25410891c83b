//! Configuration loading and data folder resolution
//!
//! Bootstrap settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (handled by the binary's argument parser)
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Bootstrap configuration loaded from TOML file
///
/// Every field is optional; absent values fall through to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub bind_address: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// Folder holding witnesses.json, annotations.json, alignment_groups.json
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Folder served for every path outside `/api` and `/health`
    #[serde(default)]
    pub static_dir: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level or filter directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr only if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Compiled defaults used when neither CLI, environment nor TOML set a value
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub bind_address: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub log_level: String,
}

impl CompiledDefaults {
    pub fn for_current_platform() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8000,
            data_dir: default_data_dir(),
            static_dir: PathBuf::from("./static"),
            log_level: default_log_level(),
        }
    }
}

/// `~/.local/share/epe/data` (or the platform equivalent), else `./data`
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("epe").join("data"))
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// Platform config file location: `<config_dir>/epe/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("epe").join("config.toml"))
}

/// Load the TOML config file.
///
/// A missing file yields defaults. A file that exists but does not parse is
/// a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        info!("No config file at {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;

    info!("Loaded config file {}", path.display());
    Ok(config)
}

/// Values supplied on the command line (or via their environment fallbacks)
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub static_dir: Option<PathBuf>,
    pub log_level: Option<String>,
    pub log_file: Option<PathBuf>,
}

/// Fully resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub static_dir: PathBuf,
    pub logging: LoggingConfig,
}

impl ServerConfig {
    /// Merge overrides, TOML and compiled defaults, highest priority first
    pub fn resolve(overrides: Overrides, toml_config: TomlConfig) -> Self {
        let defaults = CompiledDefaults::for_current_platform();

        let level = overrides
            .log_level
            .unwrap_or(toml_config.logging.level);
        let level = if level.trim().is_empty() {
            defaults.log_level
        } else {
            level
        };

        Self {
            bind_address: overrides
                .bind_address
                .or(toml_config.bind_address)
                .unwrap_or(defaults.bind_address),
            port: overrides.port.or(toml_config.port).unwrap_or(defaults.port),
            data_dir: overrides
                .data_dir
                .or(toml_config.data_dir)
                .unwrap_or(defaults.data_dir),
            static_dir: overrides
                .static_dir
                .or(toml_config.static_dir)
                .unwrap_or(defaults.static_dir),
            logging: LoggingConfig {
                level,
                file: overrides.log_file.or(toml_config.logging.file),
            },
        }
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.bind_address.parse().map_err(|e| {
            Error::Config(format!("Invalid bind address '{}': {}", self.bind_address, e))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Create the data folder if missing
    pub fn ensure_data_dir(&self) -> Result<()> {
        if !self.data_dir.exists() {
            std::fs::create_dir_all(&self.data_dir)?;
            info!("Created data directory: {}", self.data_dir.display());
        }
        if !self.static_dir.exists() {
            warn!(
                "Static directory {} does not exist; only the API will be served",
                self.static_dir.display()
            );
        }
        Ok(())
    }
}
