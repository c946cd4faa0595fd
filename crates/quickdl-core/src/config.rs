//! Configuration management for quickdl

use crate::error::ConfigError;
use crate::storage::CollisionPolicy;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub downloads: DownloadsConfig,
    pub extractor: ExtractorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the web server to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadsConfig {
    /// Directory that finished downloads are placed in and served from
    pub directory: PathBuf,
    /// What to do when a finished file's name is already taken
    pub collision: CollisionPolicy,
    /// Delete downloads older than this many hours (never if unset)
    pub retention_hours: Option<u64>,
    /// Seconds between retention passes
    pub prune_interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Path to yt-dlp binary (auto-detected if not set)
    pub yt_dlp: Option<PathBuf>,
    /// Skip TLS certificate validation
    pub no_check_certificates: bool,
    /// Try to bypass geographic restrictions
    pub geo_bypass: bool,
    /// Ask yt-dlp for verbose diagnostics
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 5000,
            },
            downloads: DownloadsConfig {
                directory: PathBuf::from("downloads"),
                collision: CollisionPolicy::KeepBoth,
                retention_hours: None,
                prune_interval_secs: 3600,
            },
            extractor: ExtractorConfig {
                yt_dlp: None,
                no_check_certificates: true,
                geo_bypass: true,
                verbose: true,
            },
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Load from default config directory
        if let Some(config_dir) = dirs::config_dir() {
            let default_config = config_dir.join("quickdl/config.toml");
            if default_config.exists() {
                figment = figment.merge(Toml::file(&default_config));
            }
        }

        // Load from specified config file
        if let Some(path) = config_file {
            if !path.exists() {
                return Err(ConfigError::LoadError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }

        // Field names contain underscores, so nesting uses a double underscore
        figment = figment.merge(Env::prefixed("QUICKDL_").split("__"));

        let config: Config = figment
            .extract()
            .map_err(|e| ConfigError::LoadError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.downloads.directory.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue(
                "downloads.directory must not be empty".to_string(),
            ));
        }
        if let Some(hours) = self.downloads.retention_hours {
            if retention_from_hours(hours).is_none() {
                return Err(ConfigError::InvalidValue(format!(
                    "downloads.retention_hours is too large: {}",
                    hours
                )));
            }
        }
        if self.downloads.prune_interval_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "downloads.prune_interval_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Get yt-dlp path, auto-detecting if not configured
    pub fn yt_dlp_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(ref path) = self.extractor.yt_dlp {
            Ok(path.clone())
        } else {
            which::which("yt-dlp")
                .map_err(|_| ConfigError::InvalidValue("yt-dlp not found in PATH".to_string()))
        }
    }

    /// Socket address string for the web server
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Maximum download age, if retention is enabled and representable
    pub fn retention(&self) -> Option<Duration> {
        self.downloads.retention_hours.and_then(retention_from_hours)
    }
}

/// `None` when the hour count does not fit in seconds
pub fn retention_from_hours(hours: u64) -> Option<Duration> {
    hours.checked_mul(3600).map(Duration::from_secs)
}
