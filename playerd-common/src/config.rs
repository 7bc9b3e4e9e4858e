//! Bootstrap configuration loading
//!
//! The daemon reads a single TOML file at startup. The file location is
//! resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. `PLAYERD_CONFIG` environment variable
//! 3. Per-user / system config file
//! 4. Compiled defaults (no file)
//!
//! A missing file is not an error: the daemon starts with defaults and the
//! returned [`ConfigSource`] says so, for the caller to log once tracing is
//! up. A file that exists but fails to parse is rejected.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "PLAYERD_CONFIG";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    /// Address the HTTP server binds to
    pub bind_address: IpAddr,

    /// HTTP server port
    pub port: u16,

    /// Directory of static assets served at `/`
    pub assets_dir: PathBuf,

    /// Playlist loaded by `GET /play`
    pub playlist: Option<PathBuf>,

    /// Open the engine connection at startup
    pub autostart: bool,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Engine startup flags and options
    pub engine: EngineConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::from([0, 0, 0, 0]),
            port: 3000,
            assets_dir: PathBuf::from("./assets"),
            playlist: None,
            autostart: true,
            logging: LoggingConfig::default(),
            engine: EngineConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Startup flags and options applied to every new engine connection
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Boolean options (`keep-open = true`)
    pub flags: BTreeMap<String, bool>,

    /// String options (`hwdec = "auto"`)
    pub options: BTreeMap<String, String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let flags = [
            ("no-resume-playback", true),
            ("keep-open", true),
            ("ytdl", true),
            ("video", false),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            flags,
            options: BTreeMap::new(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load configuration from a file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }
}

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Read from this file
    File(PathBuf),

    /// This file was named explicitly but does not exist
    Missing(PathBuf),

    /// No file anywhere; compiled defaults
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Missing(path) => {
                write!(f, "{} (not found, using defaults)", path.display())
            }
            ConfigSource::Defaults => write!(f, "compiled defaults"),
        }
    }
}

/// Resolves which config file (if any) to load
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// Create a resolver with an optional `--config` argument
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Resolve the config file path following the priority order
    ///
    /// Explicit paths (CLI, environment) are returned even if the file does
    /// not exist, so the caller can report it. Default locations are only
    /// returned when the file is present.
    pub fn resolve_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        default_config_paths().into_iter().find(|p| p.exists())
    }

    /// Load the configuration, falling back to defaults when no file exists
    ///
    /// Runs before logging is set up, so it reports the source instead of
    /// logging it.
    pub fn load(&self) -> Result<(TomlConfig, ConfigSource)> {
        match self.resolve_path() {
            Some(path) if path.exists() => {
                let config = TomlConfig::load(&path)?;
                Ok((config, ConfigSource::File(path)))
            }
            Some(path) => Ok((TomlConfig::default(), ConfigSource::Missing(path))),
            None => Ok((TomlConfig::default(), ConfigSource::Defaults)),
        }
    }
}

/// Platform default config file locations, most specific first
fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("playerd").join("config.toml"));
    }

    if cfg!(target_os = "linux") {
        paths.push(PathBuf::from("/etc/playerd/config.toml"));
    }

    paths
}
