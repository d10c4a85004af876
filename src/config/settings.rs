//! Application settings loaded from `config.toml`.
//!
//! Every section and field has a default, so a missing file yields a working
//! configuration. A file that exists but does not parse is a hard error.

use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default location of the settings file, overridable with `CONFIG_PATH`.
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Configuration structure representing the entire config.toml file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP listener settings
    pub server: ServerConfig,
    /// Claim document upload settings
    pub uploads: UploadConfig,
    /// Session token settings
    pub auth: AuthConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address the server binds to
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
        }
    }
}

/// Claim document upload settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Directory stored documents are written to
    pub directory: PathBuf,
    /// Largest accepted file in bytes
    pub max_file_bytes: u64,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("uploads/benefits"),
            max_file_bytes: 5 * 1024 * 1024,
        }
    }
}

/// Session token settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of issued tokens in days
    pub token_ttl_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { token_ttl_days: 30 }
    }
}

/// Parses settings from TOML text.
pub fn parse_config(contents: &str) -> Result<AppConfig> {
    toml::from_str(contents).map_err(|e| Error::Config {
        message: format!("Failed to parse config.toml: {e}"),
    })
}

/// Loads settings from a TOML file, falling back to defaults if the file is absent.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    if !path_ref.exists() {
        info!("No config file at {:?}; using defaults", path_ref);
        return Ok(AppConfig::default());
    }

    debug!("Loading configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {}: {e}", path_ref.display()),
    })?;
    parse_config(&contents)
}

/// Loads settings from `CONFIG_PATH`, or `./config.toml` when unset.
pub fn load_app_config() -> Result<AppConfig> {
    let path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    load_config(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_config_keeps_defaults() {
        let toml_str = r#"
            [server]
            bind_address = "127.0.0.1:8080"

            [uploads]
            max_file_bytes = 1024
        "#;

        let config = parse_config(toml_str).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:8080");
        assert_eq!(config.uploads.max_file_bytes, 1024);
        assert_eq!(config.uploads.directory, PathBuf::from("uploads/benefits"));
        assert_eq!(config.auth.token_ttl_days, 30);
    }

    #[test]
    fn test_parse_empty_config_is_default() {
        let config = parse_config("").unwrap();
        assert_eq!(config.server.bind_address, "0.0.0.0:5000");
        assert_eq!(config.uploads.max_file_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn test_malformed_config_is_error() {
        let result = parse_config("[server\nbind_address = 1");
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config("definitely/not/here.toml").unwrap();
        assert_eq!(config.auth.token_ttl_days, 30);
    }
}
