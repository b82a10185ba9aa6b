use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port (HTTP API and WebSocket)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Environment (dev, staging, prod)
    #[serde(default = "default_environment")]
    pub environment: String,

    /// CORS allowed origins, comma separated
    pub cors_origins: Option<String>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Path of the app description document the hangout page is built from
    pub app_description: Option<String>,

    /// Explicit path of the saved states file
    pub states_file: Option<String>,

    /// Period of the simulated volume feed
    #[serde(default = "default_volume_interval_ms")]
    pub volume_interval_ms: u64,

    /// Upper bound on a single saved states write
    #[serde(default = "default_persist_timeout_ms")]
    pub persist_timeout_ms: u64,

    /// Delay before a failed saved states write is retried
    #[serde(default = "default_persist_retry_ms")]
    pub persist_retry_ms: u64,

    /// How long shutdown waits for the last saved states write
    #[serde(default = "default_shutdown_flush_ms")]
    pub shutdown_flush_ms: u64,
}

impl Config {
    /// Load configuration from environment variables or app.env file
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load from app.env file first
        if Path::new("app.env").exists() {
            dotenvy::from_filename("app.env").ok();
        } else {
            // Fallback to .env file
            dotenvy::dotenv().ok();
        }

        // Load from environment variables using envy. Runs before tracing is
        // set up, so the caller reports the outcome.
        Ok(envy::from_env::<Config>()?)
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode
    pub fn is_development(&self) -> bool {
        self.environment.to_lowercase() == "dev" || self.environment.to_lowercase() == "development"
    }

    /// Where the saved states catalog lives.
    ///
    /// An explicit `STATES_FILE` wins. Otherwise the file sits in the working
    /// directory and is named after the app description, e.g. `app.xml` gives
    /// `app.xml.states.json`.
    pub fn states_path(&self) -> PathBuf {
        if let Some(path) = &self.states_file {
            return PathBuf::from(path);
        }
        self.app_description
            .as_deref()
            .and_then(|desc| Path::new(desc).file_name())
            .map(|name| PathBuf::from(format!("{}.states.json", name.to_string_lossy())))
            .unwrap_or_else(|| PathBuf::from("saved-states.json"))
    }

    /// Parsed CORS origins, empty when none are configured.
    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .as_deref()
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn volume_interval(&self) -> Duration {
        Duration::from_millis(self.volume_interval_ms)
    }

    pub fn persist_timeout(&self) -> Duration {
        Duration::from_millis(self.persist_timeout_ms)
    }

    pub fn persist_retry(&self) -> Duration {
        Duration::from_millis(self.persist_retry_ms)
    }

    pub fn shutdown_flush(&self) -> Duration {
        Duration::from_millis(self.shutdown_flush_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
            log_level: default_log_level(),
            cors_origins: None,
            app_description: None,
            states_file: None,
            volume_interval_ms: default_volume_interval_ms(),
            persist_timeout_ms: default_persist_timeout_ms(),
            persist_retry_ms: default_persist_retry_ms(),
            shutdown_flush_ms: default_shutdown_flush_ms(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvError(#[from] envy::Error),
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_volume_interval_ms() -> u64 {
    2000
}

fn default_persist_timeout_ms() -> u64 {
    5000
}

fn default_persist_retry_ms() -> u64 {
    1000
}

fn default_shutdown_flush_ms() -> u64 {
    3000
}
