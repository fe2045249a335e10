//! Configuration management
//!
//! Loads configuration from config.toml with support for:
//! - Server binding settings
//! - Draw ledger database path
//! - Bluesky service endpoint and paging parameters
//!
//! The service credentials only ever come from the environment, optionally
//! seeded from a `.env` file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

pub const USERNAME_ENV: &str = "BSKY_USERNAME";
pub const APP_PASSWORD_ENV: &str = "BSKY_APP_PASSWORD";

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub bluesky: BlueskyConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Draw ledger location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
}

/// Bluesky service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueskyConfig {
    /// PDS / entryway used for login and proxied app.bsky calls
    pub service_url: String,
    /// Page size for paginated listings (the API caps this at 100)
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_page_limit() -> u32 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

/// Login pair for the service's own account.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub app_password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("app_password", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read both values from the environment. Returns `None` if either is
    /// missing or blank.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let identifier = non_blank(lookup(USERNAME_ENV))?;
        let app_password = non_blank(lookup(APP_PASSWORD_ENV))?;
        Some(Self {
            identifier,
            app_password,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn non_empty_env(key: &str) -> Option<String> {
    non_blank(std::env::var(key).ok())
}

/// Load a `.env` file from the working directory (or a parent) into the
/// process environment. Variables that are already set are left alone.
pub fn load_dotenv() {
    match dotenvy::dotenv() {
        Ok(path) => debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring unreadable .env file: {}", e),
    }
}

impl Config {
    /// Load from config.toml or use defaults
    pub fn load() -> Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load from specific path, then apply environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config: Config = if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")?
        } else {
            toml::from_str(DEFAULT_CONFIG).context("Failed to parse default config")?
        };

        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(host) = non_empty_env("PICKER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = non_empty_env("PICKER_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(path) = non_empty_env("PICKER_DB_PATH") {
            self.database.path = path;
        }
        if let Some(url) = non_empty_env("BSKY_SERVICE_URL") {
            self.bluesky.service_url = url;
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).unwrap_or_else(|_| Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
            },
            database: DatabaseConfig {
                path: "history.db".to_string(),
            },
            bluesky: BlueskyConfig {
                service_url: "https://bsky.social".to_string(),
                page_limit: default_page_limit(),
                timeout_secs: default_timeout_secs(),
            },
        })
    }
}
