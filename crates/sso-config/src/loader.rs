//! Configuration loader with file and environment variable support

use crate::{AppConfig, ConfigError};
use std::env;
use std::path::PathBuf;
use tracing::info;

/// Standard config file search paths
const CONFIG_PATHS: &[&str] = &[
    "config.toml",
    "sso.toml",
    "./config/config.toml",
    "./config/sso.toml",
    "/etc/sso/config.toml",
];

/// Configuration loader
pub struct ConfigLoader {
    config_path: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Create a loader with a specific config file path
    pub fn with_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            config_path: Some(path.into()),
        }
    }

    /// Load configuration from file (if found) with environment variable overrides
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let mut config = AppConfig::default();

        if let Some(path) = self.find_config_file() {
            info!(?path, "Loading configuration from file");
            config = AppConfig::from_file(&path)?;
        }

        self.apply_overrides(&mut config, |key| env::var(key).ok());

        Ok(config)
    }

    /// Find the configuration file to use
    fn find_config_file(&self) -> Option<PathBuf> {
        if let Some(path) = &self.config_path {
            if path.exists() {
                return Some(path.clone());
            }
        }

        if let Ok(path) = env::var("SSO_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists())
    }

    /// Apply `SSO_*` overrides using the given variable lookup
    fn apply_overrides<F>(&self, config: &mut AppConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // HTTP
        if let Some(port) = lookup("SSO_HTTP_PORT").and_then(|v| v.parse().ok()) {
            config.http.port = port;
        }
        if let Some(val) = lookup("SSO_HTTP_HOST") {
            config.http.host = val;
        }

        // MongoDB
        if let Some(val) = lookup("SSO_MONGODB_URI") {
            config.mongodb.uri = val;
        }
        if let Some(val) = lookup("SSO_MONGODB_DATABASE") {
            config.mongodb.database = val;
        }

        // Provider
        if let Some(val) = lookup("SSO_PROVIDER_BASE_URL") {
            config.provider.base_url = val;
        }
        if let Some(val) = lookup("SSO_PROVIDER_TOKEN_PATH") {
            config.provider.token_path = val;
        }
        if let Some(val) = lookup("SSO_PROVIDER_USER_PATH") {
            config.provider.user_path = val;
        }
        if let Some(val) = lookup("SSO_PROVIDER_CLIENT_ID") {
            config.provider.client_id = val;
        }
        if let Some(val) = lookup("SSO_PROVIDER_CLIENT_SECRET") {
            config.provider.client_secret = val;
        }
        if let Some(secs) = lookup("SSO_PROVIDER_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.provider.timeout_secs = secs;
        }

        // Login
        if let Some(val) = lookup("SSO_STATE_COOKIE_NAME") {
            config.login.state_cookie_name = val;
        }
        if let Some(secs) = lookup("SSO_LOGIN_VALIDITY_SECS").and_then(|v| v.parse().ok()) {
            config.login.validity_secs = secs;
        }
        if let Some(val) = lookup("SSO_CALLBACK_SCHEME") {
            config.login.callback_scheme = val;
        }
        if let Some(val) = lookup("SSO_CALLBACK_PATH") {
            config.login.callback_path = val;
        }
        if let Some(val) = lookup("SSO_EXTERNAL_BASE_URL") {
            config.login.external_base_url = val;
        }
        if let Some(secs) = lookup("SSO_EXCHANGE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.login.exchange_timeout_secs = secs;
        }
        if let Some(secs) = lookup("SSO_SWEEP_INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            config.login.sweep_interval_secs = secs;
        }

        // General
        if let Some(val) = lookup("SSO_DEV_MODE") {
            config.dev_mode = val == "true" || val == "1";
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
