//! SSO Configuration System
//!
//! TOML-based configuration with environment variable overrides. Resolved
//! once at startup; nothing below the server binary reads the environment.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

mod loader;

pub use loader::ConfigLoader;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Root application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub mongodb: MongoConfig,
    pub provider: ProviderConfig,
    pub login: LoginConfig,

    /// Enable development mode
    pub dev_mode: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            mongodb: MongoConfig::default(),
            provider: ProviderConfig::default(),
            login: LoginConfig::default(),
            dev_mode: false,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub port: u16,
    pub host: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

/// MongoDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
}

impl Default for MongoConfig {
    fn default() -> Self {
        Self {
            uri: "mongodb://localhost:27017".to_string(),
            database: "sso".to_string(),
        }
    }
}

/// Identity provider (OAuth2 authorization server) settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Base URL, e.g. "https://auth.example.net"
    pub base_url: String,
    /// Token endpoint path appended to `base_url`
    pub token_path: String,
    /// User-info endpoint path appended to `base_url`
    pub user_path: String,
    pub client_id: String,
    pub client_secret: String,
    /// Per-request HTTP timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token_path: "/oauth/token".to_string(),
            user_path: "/api/user".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            timeout_secs: 10,
        }
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("token_path", &self.token_path)
            .field("user_path", &self.user_path)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Login callback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Cookie carrying the pending-login state token
    pub state_cookie_name: String,
    /// How long a pending login stays valid after creation
    pub validity_secs: u64,
    /// Scheme used when the callback URL is derived from the request host
    pub callback_scheme: String,
    /// Path of the callback endpoint, sent to the provider as redirect_uri
    pub callback_path: String,
    /// Fixed external base URL; empty means derive from the request host
    pub external_base_url: String,
    /// Upper bound on the whole provider round trip
    pub exchange_timeout_secs: u64,
    /// Interval of the expired pending-login sweep
    pub sweep_interval_secs: u64,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            state_cookie_name: "sso_token".to_string(),
            validity_secs: 300, // 5 minutes
            callback_scheme: "https".to_string(),
            callback_path: "/oauth/callback".to_string(),
            external_base_url: String::new(),
            exchange_timeout_secs: 10,
            sweep_interval_secs: 60,
        }
    }
}

impl LoginConfig {
    /// External base URL, if one is configured
    pub fn external_base_url(&self) -> Option<&str> {
        let url = self.external_base_url.trim();
        if url.is_empty() {
            None
        } else {
            Some(url)
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration with environment variable override
    pub fn load() -> Result<Self, ConfigError> {
        let loader = ConfigLoader::new();
        loader.load()
    }

    /// Reject configurations the callback cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "provider.base_url is required".to_string(),
            ));
        }
        if self.provider.client_id.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "provider.client_id is required".to_string(),
            ));
        }
        if self.login.validity_secs == 0 {
            return Err(ConfigError::ValidationError(
                "login.validity_secs must be greater than zero".to_string(),
            ));
        }
        if self.login.exchange_timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "login.exchange_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if !self.login.callback_path.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "login.callback_path must start with '/'".to_string(),
            ));
        }
        Ok(())
    }

    /// Generate an example TOML configuration
    pub fn example_toml() -> String {
        r#"# SSO Callback Service Configuration
# Environment variables (SSO_*) override these settings

dev_mode = false

[http]
port = 3000
host = "0.0.0.0"

[mongodb]
uri = "mongodb://localhost:27017"
database = "sso"

[provider]
base_url = "https://auth.example.net"
token_path = "/oauth/token"
user_path = "/api/user"
client_id = ""
client_secret = ""
timeout_secs = 10

[login]
state_cookie_name = "sso_token"
validity_secs = 300
callback_scheme = "https"
callback_path = "/oauth/callback"
external_base_url = ""
exchange_timeout_secs = 10
sweep_interval_secs = 60
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.login.state_cookie_name, "sso_token");
        assert_eq!(config.login.validity_secs, 300);
        assert_eq!(config.login.callback_scheme, "https");
        assert_eq!(config.login.external_base_url(), None);
        assert!(!config.dev_mode);
    }

    #[test]
    fn test_example_toml_parses() {
        let config: AppConfig = toml::from_str(&AppConfig::example_toml()).unwrap();
        assert_eq!(config.provider.base_url, "https://auth.example.net");
        assert_eq!(config.login.callback_path, "/oauth/callback");
        assert_eq!(config.http.port, 3000);
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[provider]
base_url = "https://provider.test"
client_id = "client-1"
client_secret = "s3cret"

[login]
external_base_url = "https://sso.example.org"
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.provider.client_id, "client-1");
        // Unspecified sections fall back to defaults
        assert_eq!(config.provider.token_path, "/oauth/token");
        assert_eq!(config.mongodb.database, "sso");
        assert_eq!(config.login.external_base_url(), Some("https://sso.example.org"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_provider() {
        let config = AppConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::ValidationError(_))));

        let mut config = AppConfig::default();
        config.provider.base_url = "https://provider.test".to_string();
        assert!(config.validate().is_err());

        config.provider.client_id = "client".to_string();
        assert!(config.validate().is_ok());

        config.login.validity_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_client_secret_redacted_in_debug() {
        let mut config = ProviderConfig::default();
        config.client_secret = "very-secret".to_string();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("very-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[provider\nbase_url = ").unwrap();
        assert!(matches!(
            AppConfig::from_file(file.path()),
            Err(ConfigError::ParseError(_))
        ));
    }
}
