// common/src/config.rs
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use config::{Config as ConfigFile, File, Environment};
use thiserror::Error;

/// Errors raised while building the process configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("failed to load configuration: {0}")]
    Source(#[from] config::ConfigError),
}

/// Central configuration for the authentication service
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_addr: String,
    /// Maximum tracing level, overridden by `LOG_LEVEL`
    pub log_level: String,
    pub auth: AuthConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Secret used to sign session tokens
    pub secret: String,
    /// Project identifier forwarded to the signature verification RPC
    pub project_id: String,
    /// Absolute lifetime of a session token
    pub session_max_age_secs: u64,
    /// Age after which a presented token is re-issued
    pub session_update_age_secs: u64,
    pub cookie_name: String,
    /// Cookie holding the CSRF token that doubles as the SIWE nonce
    pub csrf_cookie_name: String,
    /// How long an issued nonce stays redeemable
    pub nonce_ttl_secs: u64,
    pub secure_cookie: bool,
    pub rpc_url: String,
    /// Upper bound on a single ERC-1271 RPC call
    pub rpc_timeout_secs: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub paths: Vec<String>,
    pub max_requests: usize,
    pub window_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:3000".to_string(),
            log_level: "info".to_string(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            project_id: String::new(),
            session_max_age_secs: 30 * 24 * 60 * 60, // 30 days
            session_update_age_secs: 24 * 60 * 60,
            cookie_name: "siwe.session-token".to_string(),
            csrf_cookie_name: "siwe.csrf-token".to_string(),
            nonce_ttl_secs: 10 * 60,
            secure_cookie: true,
            rpc_url: "https://rpc.walletconnect.org/v1/".to_string(),
            rpc_timeout_secs: 10,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            paths: vec!["/api/auth/callback".to_string()],
            max_requests: 5,
            window_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from files and environment, then validate it.
    ///
    /// Sources are layered in order: `default.toml`, `<RUN_MODE>.toml`,
    /// `local.toml`, `APP__*` environment variables and finally the plain
    /// `SESSION_SECRET` / `PROJECT_ID` / `LOG_LEVEL` variables.
    ///
    /// Runs before tracing is installed, so it does not log.
    pub fn load() -> Result<Self, ConfigError> {
        // Get the run mode, defaulting to "development"
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        // Locate the config directory
        let config_dir = env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                // Check if we're in the project root or a subcrate
                let mut path = PathBuf::from("./config");
                if !path.exists() {
                    path = PathBuf::from("../config");
                }
                path
            });

        let config: Config = ConfigFile::builder()
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", run_mode))).required(false))
            .add_source(File::from(config_dir.join("local.toml")).required(false))
            // e.g. APP__AUTH__SECRET
            .add_source(Environment::with_prefix("APP").separator("__"))
            .set_override_option("auth.secret", env::var("SESSION_SECRET").ok())?
            .set_override_option("auth.project_id", env::var("PROJECT_ID").ok())?
            .set_override_option("log_level", env::var("LOG_LEVEL").ok())?
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations missing a mandatory value
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret.trim().is_empty() {
            return Err(ConfigError::Missing("auth.secret"));
        }
        if self.auth.project_id.trim().is_empty() {
            return Err(ConfigError::Missing("auth.project_id"));
        }
        Ok(())
    }
}
