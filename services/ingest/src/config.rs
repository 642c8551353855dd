//! services/ingest/src/config.rs
//!
//! Defines the service's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use content_ingest_core::upload::{UploadLimits, MIB};
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Base URL of the backend API, without a trailing slash.
    pub backend_url: String,
    pub auth_token: Option<String>,
    pub log_level: Level,
    pub image_max_bytes: u64,
    pub proxy_threshold_bytes: u64,
    pub editor_image_folder: String,
    pub connect_timeout: Option<Duration>,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Backend ---
        let backend_url = lookup("INGEST_BACKEND_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingVar("INGEST_BACKEND_URL".to_string()))?;
        if !(backend_url.starts_with("http://") || backend_url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue(
                "INGEST_BACKEND_URL".to_string(),
                format!("'{}' is not an http(s) URL", backend_url),
            ));
        }
        let backend_url = backend_url.trim_end_matches('/').to_string();
        let auth_token = lookup("INGEST_AUTH_TOKEN").filter(|t| !t.trim().is_empty());

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Upload Limits ---
        let image_max_bytes = parse_or(&lookup, "INGEST_IMAGE_MAX_BYTES", 15 * MIB)?;
        let proxy_threshold_bytes = parse_or(&lookup, "INGEST_PROXY_THRESHOLD_BYTES", 50 * MIB)?;
        let editor_image_folder = lookup("INGEST_EDITOR_IMAGE_FOLDER")
            .filter(|f| !f.trim().is_empty())
            .unwrap_or_else(|| "editor-images".to_string());

        let connect_timeout = match lookup("INGEST_CONNECT_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(parse_u64("INGEST_CONNECT_TIMEOUT_SECS", &raw)?)),
            None => None,
        };

        Ok(Self {
            backend_url,
            auth_token,
            log_level,
            image_max_bytes,
            proxy_threshold_bytes,
            editor_image_folder,
            connect_timeout,
        })
    }

    pub fn upload_limits(&self) -> UploadLimits {
        UploadLimits {
            image_max_bytes: self.image_max_bytes,
            proxy_threshold_bytes: self.proxy_threshold_bytes,
        }
    }
}

fn parse_or<F>(lookup: &F, key: &str, default: u64) -> Result<u64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse_u64(key, &raw),
        None => Ok(default),
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|_| {
        ConfigError::InvalidValue(key.to_string(), format!("'{}' is not a whole number", raw))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_backend_is_set() {
        let config = load(&[("INGEST_BACKEND_URL", "https://api.example.com/")]).unwrap();

        assert_eq!(config.backend_url, "https://api.example.com");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.upload_limits(), UploadLimits::default());
        assert_eq!(config.editor_image_folder, "editor-images");
        assert!(config.auth_token.is_none());
        assert!(config.connect_timeout.is_none());
    }

    #[test]
    fn backend_url_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingVar(_))));
        assert!(matches!(
            load(&[("INGEST_BACKEND_URL", "ftp://x")]),
            Err(ConfigError::InvalidValue(_, _))
        ));
    }

    #[test]
    fn limits_and_timeout_are_parsed() {
        let config = load(&[
            ("INGEST_BACKEND_URL", "http://localhost:4000"),
            ("INGEST_IMAGE_MAX_BYTES", "1024"),
            ("INGEST_PROXY_THRESHOLD_BYTES", "2048"),
            ("INGEST_CONNECT_TIMEOUT_SECS", "5"),
            ("INGEST_AUTH_TOKEN", "secret"),
            ("RUST_LOG", "debug"),
        ])
        .unwrap();

        assert_eq!(config.upload_limits().image_max_bytes, 1024);
        assert_eq!(config.upload_limits().proxy_threshold_bytes, 2048);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    fn bad_numbers_name_the_variable() {
        let err = load(&[
            ("INGEST_BACKEND_URL", "http://localhost"),
            ("INGEST_PROXY_THRESHOLD_BYTES", "lots"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("INGEST_PROXY_THRESHOLD_BYTES"));
    }
}
