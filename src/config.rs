//! Configuration for the authority and gateway processes.
//!
//! Both binaries read the same TOML file. Each process only looks at the
//! sections it needs, but the `[session]` secret must be identical for the
//! gateway to verify tokens issued by the authority.

use serde::Deserialize;
use std::path::Path;

use crate::{FileShareError, Result};

/// Authority process configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorityConfig {
    /// Host address to bind.
    #[serde(default = "default_authority_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_authority_port")]
    pub port: u16,
    /// Upper bound for a single store call, in seconds.
    #[serde(default = "default_store_timeout")]
    pub store_timeout_secs: u64,
    /// Whether the daily sweep of unverified accounts runs.
    #[serde(default = "default_purge_unverified")]
    pub purge_unverified: bool,
    /// UTC hour at which the unverified account sweep runs.
    #[serde(default = "default_purge_hour")]
    pub purge_hour_utc: u32,
}

fn default_authority_host() -> String {
    "127.0.0.1".to_string()
}

fn default_authority_port() -> u16 {
    3000
}

fn default_store_timeout() -> u64 {
    5
}

fn default_purge_unverified() -> bool {
    true
}

fn default_purge_hour() -> u32 {
    5
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            host: default_authority_host(),
            port: default_authority_port(),
            store_timeout_secs: default_store_timeout(),
            purge_unverified: default_purge_unverified(),
            purge_hour_utc: default_purge_hour(),
        }
    }
}

/// Edge gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Host address to bind.
    #[serde(default = "default_gateway_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_gateway_port")]
    pub port: u16,
    /// Base URL of the authority process on the private network.
    #[serde(default = "default_authority_url")]
    pub authority_url: String,
    /// Timeout for a forwarded request, in seconds.
    #[serde(default = "default_upstream_timeout")]
    pub upstream_timeout_secs: u64,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Rate limit for login and registration (requests per minute).
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: u32,
    /// Rate limit for the rest of the API (requests per minute).
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: u32,
}

fn default_gateway_host() -> String {
    "0.0.0.0".to_string()
}

fn default_gateway_port() -> u16 {
    8080
}

fn default_authority_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_upstream_timeout() -> u64 {
    10
}

fn default_login_rate_limit() -> u32 {
    10
}

fn default_api_rate_limit() -> u32 {
    300
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            authority_url: default_authority_url(),
            upstream_timeout_secs: default_upstream_timeout(),
            cors_origins: vec![],
            login_rate_limit: default_login_rate_limit(),
            api_rate_limit: default_api_rate_limit(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/fileshare.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Stored object configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding uploaded bytes.
    #[serde(default = "default_media_path")]
    pub media_path: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_media_path() -> String {
    "data/media".to_string()
}

fn default_max_upload_size() -> u64 {
    50
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_path: default_media_path(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

/// Session token configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// HMAC secret shared by the authority and the gateway.
    #[serde(default)]
    pub jwt_secret: String,
    /// Session token lifetime in seconds.
    #[serde(default = "default_token_expiry")]
    pub token_expiry_secs: u64,
    /// Issuer label embedded in OTP provisioning URIs.
    #[serde(default = "default_otp_issuer")]
    pub otp_issuer: String,
}

fn default_token_expiry() -> u64 {
    12 * 60 * 60
}

fn default_otp_issuer() -> String {
    "FileShare".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_expiry_secs: default_token_expiry(),
            otp_issuer: default_otp_issuer(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/fileshare.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Authority process configuration.
    #[serde(default)]
    pub authority: AuthorityConfig,
    /// Gateway process configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Stored object configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Session token configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(FileShareError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| FileShareError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `FILESHARE_JWT_SECRET`: session signing secret
    /// - `FILESHARE_AUTHORITY_URL`: authority base URL used by the gateway
    /// - `FILESHARE_DB_PATH`: SQLite database path
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("FILESHARE_JWT_SECRET") {
            if !secret.is_empty() {
                self.session.jwt_secret = secret;
            }
        }
        if let Ok(url) = std::env::var("FILESHARE_AUTHORITY_URL") {
            if !url.is_empty() {
                self.gateway.authority_url = url;
            }
        }
        if let Ok(path) = std::env::var("FILESHARE_DB_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - the JWT secret is empty
    /// - the token lifetime is zero
    /// - the sweep hour is not a valid hour of the day
    pub fn validate(&self) -> Result<()> {
        if self.session.jwt_secret.is_empty() {
            return Err(FileShareError::Config(
                "session.jwt_secret is not set. \
                 Set it in config.toml or via FILESHARE_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.session.token_expiry_secs == 0 {
            return Err(FileShareError::Config(
                "session.token_expiry_secs must be greater than zero".to_string(),
            ));
        }
        if self.authority.purge_hour_utc > 23 {
            return Err(FileShareError::Config(
                "authority.purge_hour_utc must be between 0 and 23".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.authority.host, "127.0.0.1");
        assert_eq!(config.authority.port, 3000);
        assert_eq!(config.authority.store_timeout_secs, 5);
        assert!(config.authority.purge_unverified);
        assert_eq!(config.authority.purge_hour_utc, 5);

        assert_eq!(config.gateway.host, "0.0.0.0");
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.authority_url, "http://127.0.0.1:3000");
        assert_eq!(config.gateway.upstream_timeout_secs, 10);
        assert!(config.gateway.cors_origins.is_empty());

        assert_eq!(config.database.path, "data/fileshare.db");
        assert_eq!(config.storage.media_path, "data/media");
        assert_eq!(config.storage.max_upload_size_mb, 50);

        assert!(config.session.jwt_secret.is_empty());
        assert_eq!(config.session.token_expiry_secs, 43200);
        assert_eq!(config.session.otp_issuer, "FileShare");

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.file, "logs/fileshare.log");
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[authority]
host = "10.0.0.2"
port = 4000
store_timeout_secs = 2
purge_unverified = false
purge_hour_utc = 3

[gateway]
host = "127.0.0.1"
port = 9000
authority_url = "http://backend:4000"
upstream_timeout_secs = 3
cors_origins = ["http://localhost:5173"]
login_rate_limit = 3
api_rate_limit = 50

[database]
path = "custom/db.sqlite"

[storage]
media_path = "custom/media"
max_upload_size_mb = 5

[session]
jwt_secret = "shared-secret"
token_expiry_secs = 600
otp_issuer = "Acme"

[logging]
level = "debug"
file = "custom/logs/app.log"
"#;

        let config = Config::parse(toml).unwrap();

        assert_eq!(config.authority.host, "10.0.0.2");
        assert_eq!(config.authority.port, 4000);
        assert_eq!(config.authority.store_timeout_secs, 2);
        assert!(!config.authority.purge_unverified);
        assert_eq!(config.authority.purge_hour_utc, 3);

        assert_eq!(config.gateway.port, 9000);
        assert_eq!(config.gateway.authority_url, "http://backend:4000");
        assert_eq!(config.gateway.upstream_timeout_secs, 3);
        assert_eq!(config.gateway.cors_origins.len(), 1);
        assert_eq!(config.gateway.login_rate_limit, 3);
        assert_eq!(config.gateway.api_rate_limit, 50);

        assert_eq!(config.database.path, "custom/db.sqlite");
        assert_eq!(config.storage.media_path, "custom/media");
        assert_eq!(config.storage.max_upload_size_mb, 5);

        assert_eq!(config.session.jwt_secret, "shared-secret");
        assert_eq!(config.session.token_expiry_secs, 600);
        assert_eq!(config.session.otp_issuer, "Acme");

        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml = r#"
[gateway]
port = 8181
"#;

        let config = Config::parse(toml).unwrap();
        assert_eq!(config.gateway.port, 8181);
        assert_eq!(config.gateway.authority_url, "http://127.0.0.1:3000");
        assert_eq!(config.authority.port, 3000);
    }

    #[test]
    fn test_parse_invalid_config() {
        let result = Config::parse("this is not valid toml [[[");
        assert!(matches!(result, Err(FileShareError::Config(msg)) if msg.contains("config parse error")));
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = Config::load("nonexistent.toml");
        assert!(matches!(result, Err(FileShareError::Io(_))));
    }

    #[test]
    fn test_validate_requires_secret() {
        let config = Config::default();
        let result = config.validate();
        assert!(matches!(result, Err(FileShareError::Config(msg)) if msg.contains("jwt_secret")));
    }

    #[test]
    fn test_validate_rejects_zero_expiry() {
        let mut config = Config::default();
        config.session.jwt_secret = "secret".to_string();
        config.session.token_expiry_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_purge_hour() {
        let mut config = Config::default();
        config.session.jwt_secret = "secret".to_string();
        config.authority.purge_hour_utc = 24;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_ok() {
        let mut config = Config::default();
        config.session.jwt_secret = "secret".to_string();
        assert!(config.validate().is_ok());
    }
}
