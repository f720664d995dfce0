//! Bootstrap configuration loading
//!
//! Resolution priority, highest first:
//! 1. Command-line argument (clap also folds in `MLIB_*` environment variables)
//! 2. TOML config file (`--config`, else the platform config locations)
//! 3. Compiled defaults

use crate::db::PoolSettings;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

const CONFIG_DIR_NAME: &str = "music-library";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Service bootstrap configuration
///
/// Static for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Path to SQLite database file (created if missing)
    pub database_path: PathBuf,

    /// Address the HTTP server binds to
    pub bind_address: String,

    /// HTTP server port
    pub port: u16,

    /// Default log level (trace, debug, info, warn, error); `RUST_LOG` wins
    pub log_level: String,

    /// Base URL of the song metadata provider (`{url}/info?group=..&song=..`)
    pub metadata_api_url: String,

    /// Metadata provider request timeout in milliseconds
    pub metadata_timeout_ms: u64,

    /// Database pool size
    pub max_connections: u32,

    /// SQLite busy timeout in milliseconds
    pub busy_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("music-library.db"),
            bind_address: "127.0.0.1".to_string(),
            port: 5730,
            log_level: "info".to_string(),
            metadata_api_url: "http://127.0.0.1:8081".to_string(),
            metadata_timeout_ms: 10_000,
            max_connections: 10,
            busy_timeout_ms: 5000,
        }
    }
}

/// Values supplied on the command line (or through their environment variables)
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_file: Option<PathBuf>,
    pub database_path: Option<PathBuf>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
    pub metadata_api_url: Option<String>,
}

impl Config {
    /// Resolve the configuration from overrides, TOML file, and defaults
    ///
    /// An explicitly named config file must exist; the platform locations are
    /// optional.
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let base = match &overrides.config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(path)?
            }
            None => match find_config_file() {
                Some(path) => Self::from_file(&path)?,
                None => {
                    debug!("No config file found, using built-in defaults");
                    Self::default()
                }
            },
        };

        Ok(base.with_overrides(overrides))
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse TOML content; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply command-line values on top of this configuration
    pub fn with_overrides(mut self, overrides: &ConfigOverrides) -> Self {
        if let Some(path) = &overrides.database_path {
            self.database_path = path.clone();
        }
        if let Some(addr) = &overrides.bind_address {
            self.bind_address = addr.clone();
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(level) = &overrides.log_level {
            self.log_level = level.clone();
        }
        if let Some(url) = &overrides.metadata_api_url {
            self.metadata_api_url = url.clone();
        }
        self
    }

    /// `host:port` listen address
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_timeout_ms)
    }

    pub fn pool_settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections.max(1),
            busy_timeout: Duration::from_millis(self.busy_timeout_ms),
        }
    }
}

/// Look for a config file in the user, then system, config locations
fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc").join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = Config::from_toml_str(
            r#"
            port = 8080
            metadata_api_url = "http://lyrics.local"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.metadata_api_url, "http://lyrics.local");
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let result = Config::from_toml_str("postgres_host = \"db\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = 9000\nlog_level = \"warn\"").unwrap();

        let overrides = ConfigOverrides {
            config_file: Some(file.path().to_path_buf()),
            port: Some(9100),
            ..Default::default()
        };

        let config = Config::load(&overrides).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.listen_address(), "127.0.0.1:9100");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let overrides = ConfigOverrides {
            config_file: Some(PathBuf::from("/nonexistent/music-library.toml")),
            ..Default::default()
        };

        assert!(matches!(Config::load(&overrides), Err(Error::Config(_))));
    }

    #[test]
    fn test_pool_settings_never_zero_connections() {
        let config = Config {
            max_connections: 0,
            ..Default::default()
        };
        assert_eq!(config.pool_settings().max_connections, 1);
    }
}
