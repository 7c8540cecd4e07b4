//! Layered configuration for the receiving client and its binaries.
//!
//! Sources, later entries winning: built-in defaults, `config/default.toml`,
//! `config/{RECEIVING_ENV}.toml`, `config/local.toml`, then environment
//! variables prefixed `RECEIVING__` (double underscore as the separator,
//! e.g. `RECEIVING__API_BASE_URL`).

use std::env;
use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;
use validator::Validate;

const DEFAULT_ENV: &str = "development";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_BASE_URL: &str = "http://localhost:8081";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SESSION_FILE: &str = ".receiving-session.json";
const CONFIG_DIR: &str = "config";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Everything the binaries need to talk to a receiving backend.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Configuration profile the values were loaded for.
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Base URL of the receiving API.
    #[validate(length(min = 1))]
    pub api_base_url: String,

    /// Per-request timeout.
    #[validate(range(min = 1))]
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging).
    #[serde(default)]
    pub log_json: bool,

    /// Where the CLI keeps the last reconciled form state.
    #[serde(default = "default_session_file")]
    pub session_file: String,

    /// Whether the current location tracks bin locations.
    #[serde(default = "default_true")]
    pub bin_location_support: bool,

    /// Whether the current location allows partial receiving.
    #[serde(default = "default_true")]
    pub partial_receiving_support: bool,
}

fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_session_file() -> String {
    DEFAULT_SESSION_FILE.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            api_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: default_timeout_secs(),
            log_level: default_log_level(),
            log_json: false,
            session_file: default_session_file(),
            bin_location_support: true,
            partial_receiving_support: true,
        }
    }
}

impl ClientConfig {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }

    pub fn capabilities(&self) -> crate::models::LocationCapabilities {
        crate::models::LocationCapabilities {
            bin_location_support: self.bin_location_support,
            partial_receiving_support: self.partial_receiving_support,
        }
    }
}

/// Loads configuration from the default `config/` directory and the
/// `RECEIVING__` environment.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from(Path::new(CONFIG_DIR))
}

/// Loads configuration with an explicit config directory, so tests can point
/// at a temporary one.
pub fn load_config_from(config_dir: &Path) -> Result<ClientConfig, ConfigError> {
    let run_env = env::var("RECEIVING_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    if !config_dir.exists() {
        info!(
            config_dir = %config_dir.display(),
            "config directory not found; using built-in defaults and environment variables"
        );
    }

    let file = |name: &str| {
        File::with_name(&config_dir.join(name).to_string_lossy()).required(false)
    };

    let config = Config::builder()
        .set_default("environment", run_env.clone())?
        .set_default("api_base_url", DEFAULT_BASE_URL)?
        .set_default("request_timeout_secs", DEFAULT_TIMEOUT_SECS)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .set_default("session_file", DEFAULT_SESSION_FILE)?
        .set_default("bin_location_support", true)?
        .set_default("partial_receiving_support", true)?
        .add_source(file("default"))
        .add_source(file(&run_env))
        .add_source(file("local"))
        .add_source(Environment::with_prefix("RECEIVING").separator("__"))
        .build()?;

    let client_config: ClientConfig = config.try_deserialize()?;
    client_config.validate()?;

    info!(environment = %client_config.environment, "configuration loaded");
    Ok(client_config)
}

/// Installs the global tracing subscriber according to the configuration.
/// `RUST_LOG` overrides the configured level when set.
pub fn init_tracing(config: &ClientConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    if config.log_json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
