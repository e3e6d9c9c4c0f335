//! Config - Application Configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_PAGE_SIZE, MAX_CACHED_LISTS, REQUEST_TIMEOUT_SECS,
    RETRY_INITIAL_DELAY_MS, RETRY_JITTER, RETRY_MAX_ATTEMPTS, RETRY_MAX_DELAY_MS,
    RETRY_MULTIPLIER, SEARCH_DEBOUNCE_MS,
};
use crate::error::{Error, Result};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// REST backend configuration
    pub api: ApiConfig,
    /// List view behaviour
    pub lists: ListConfig,
    /// Retry policy for idempotent requests
    pub retry: RetryConfig,
}

impl AppConfig {
    /// Parse a TOML document, filling missing sections with defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to pretty TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Reject values the list machinery cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.lists.page_size == 0 {
            return Err(Error::Invalid {
                message: "lists.page_size must be at least 1".to_string(),
            });
        }
        if self.lists.max_cached_lists == 0 {
            return Err(Error::Invalid {
                message: "lists.max_cached_lists must be at least 1".to_string(),
            });
        }
        if self.api.base_url.trim().is_empty() {
            return Err(Error::Invalid {
                message: "api.base_url is empty".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            return Err(Error::Invalid {
                message: format!("retry.jitter must be within 0.0..=1.0, got {}", self.retry.jitter),
            });
        }
        Ok(())
    }
}

/// REST backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL, e.g. "https://crm.example.com/api"
    pub base_url: String,
    /// Bearer token sent with every request (optional)
    pub token: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            token: None,
            timeout_secs: REQUEST_TIMEOUT_SECS,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// List view configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ListConfig {
    /// Records per page
    pub page_size: u32,
    /// Search input quiet period in milliseconds
    pub search_debounce_ms: u64,
    /// Lists kept per cache before the least recently used one is evicted
    pub max_cached_lists: usize,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            search_debounce_ms: SEARCH_DEBOUNCE_MS,
            max_cached_lists: MAX_CACHED_LISTS,
        }
    }
}

impl ListConfig {
    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

/// Retry configuration for idempotent requests
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Delay before the first retry, in milliseconds
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay, in milliseconds
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff
    pub multiplier: f64,
    /// Jitter factor (0.0 - 1.0) to randomize delays
    pub jitter: f64,
    /// Maximum number of retries after the first attempt (0 = never retry)
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: RETRY_INITIAL_DELAY_MS,
            max_delay_ms: RETRY_MAX_DELAY_MS,
            multiplier: RETRY_MULTIPLIER,
            jitter: RETRY_JITTER,
            max_attempts: RETRY_MAX_ATTEMPTS,
        }
    }
}
