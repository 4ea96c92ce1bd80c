//! Global configuration parsing and validation.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// Base URLs for the external collaborator services.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct UpstreamConfig {
    /// Cart-read service returning the current lines for a session.
    pub cart_service_url: String,
    /// Product catalog service resolving product IDs to display names.
    pub product_catalog_url: String,
    /// Recipe suggestion orchestrator (generation, availability, cart apply).
    pub recipe_service_url: String,
}

/// Tunables for suggestion generation, image polling, and debounce.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SuggestConfig {
    /// Generation timeout; generous to accommodate slow image pipelines.
    #[serde(default = "default_generate_timeout_seconds")]
    pub generate_timeout_seconds: u64,
    /// Fixed cadence between image poll attempts.
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,
    /// Per-attempt timeout for an image poll fetch.
    #[serde(default = "default_poll_timeout_seconds")]
    pub poll_timeout_seconds: u64,
    /// Attempt budget before imageless entries are left as-is.
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
    /// Quiescence window after the last observed cart change.
    #[serde(default = "default_debounce_window_ms")]
    pub debounce_window_ms: u64,
    /// Age after which a session's cached suggestions are evicted.
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
}

fn default_generate_timeout_seconds() -> u64 {
    30
}

fn default_poll_interval_seconds() -> u64 {
    3
}

fn default_poll_timeout_seconds() -> u64 {
    5
}

fn default_poll_attempts() -> u32 {
    10
}

fn default_debounce_window_ms() -> u64 {
    2000
}

fn default_cache_ttl_seconds() -> u64 {
    1800
}

fn default_http_port() -> u16 {
    8080
}

fn default_mailbox_capacity() -> usize {
    10
}

fn default_cart_settle_ms() -> u64 {
    2000
}

impl SuggestConfig {
    /// Generation timeout as a [`Duration`].
    #[must_use]
    pub fn generate_timeout(&self) -> Duration {
        Duration::from_secs(self.generate_timeout_seconds)
    }

    /// Poll cadence as a [`Duration`].
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }

    /// Per-attempt poll timeout as a [`Duration`].
    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_seconds)
    }

    /// Debounce quiescence window as a [`Duration`].
    #[must_use]
    pub fn debounce_window(&self) -> Duration {
        Duration::from_millis(self.debounce_window_ms)
    }
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// HTTP port for the API and SSE transport.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Bounded capacity of each session's update mailbox.
    #[serde(default = "default_mailbox_capacity")]
    pub mailbox_capacity: usize,
    /// Delay before re-reading the cart after a recipe-to-cart apply,
    /// giving the asynchronous cart mutation time to land.
    #[serde(default = "default_cart_settle_ms")]
    pub cart_settle_ms: u64,
    /// External collaborator endpoints.
    pub upstream: UpstreamConfig,
    /// Suggestion scheduling tunables.
    #[serde(default)]
    pub suggest: SuggestConfig,
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            generate_timeout_seconds: default_generate_timeout_seconds(),
            poll_interval_seconds: default_poll_interval_seconds(),
            poll_timeout_seconds: default_poll_timeout_seconds(),
            poll_attempts: default_poll_attempts(),
            debounce_window_ms: default_debounce_window_ms(),
            cache_ttl_seconds: default_cache_ttl_seconds(),
        }
    }
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Cart settle delay as a [`Duration`].
    #[must_use]
    pub fn cart_settle(&self) -> Duration {
        Duration::from_millis(self.cart_settle_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.mailbox_capacity == 0 {
            return Err(AppError::Config(
                "mailbox_capacity must be greater than zero".into(),
            ));
        }
        if self.suggest.poll_attempts == 0 {
            return Err(AppError::Config(
                "suggest.poll_attempts must be greater than zero".into(),
            ));
        }
        for (field, url) in [
            ("cart_service_url", &self.upstream.cart_service_url),
            ("product_catalog_url", &self.upstream.product_catalog_url),
            ("recipe_service_url", &self.upstream.recipe_service_url),
        ] {
            if url.is_empty() {
                return Err(AppError::Config(format!("upstream.{field} must be set")));
            }
        }
        Ok(())
    }
}
