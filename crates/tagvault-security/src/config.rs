//! Security service configuration.
//!
//! Platform differences are data, not branches: [`SecurityConfig::for_platform`]
//! picks the discovery timeout and write retry policy.

use crate::strategy::LockStrategy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tagvault_core::{
    Error, Result,
    constants::{
        ANDROID_DISCOVERY_TIMEOUT_MS, DEFAULT_WRITE_ATTEMPTS, DEFAULT_WRITE_BACKOFF_MS,
        IOS_DISCOVERY_TIMEOUT_MS,
    },
};
use tagvault_simulator::SimulatorConfig;

/// Mobile platform whose radio stack is being driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Android,
    Ios,
}

/// Bounded, sequential write retries with a fixed backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl RetryPolicy {
    /// One attempt, no retry.
    pub fn single() -> Self {
        Self {
            max_attempts: 1,
            backoff_ms: 0,
        }
    }

    pub fn fixed(max_attempts: u32, backoff_ms: u64) -> Self {
        Self {
            max_attempts,
            backoff_ms,
        }
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_WRITE_ATTEMPTS, DEFAULT_WRITE_BACKOFF_MS)
    }
}

/// Configuration for [`SecurityService`](crate::SecurityService).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SecurityConfigFile", rename_all = "camelCase")]
pub struct SecurityConfig {
    pub platform: Platform,

    /// How long to wait for a tag before giving up.
    pub discovery_timeout_ms: u64,

    pub write_retry: RetryPolicy,

    /// Lock strategies, tried in order.
    pub strategies: Vec<LockStrategy>,
}

impl SecurityConfig {
    /// Defaults for a platform.
    ///
    /// iOS gets a longer discovery timeout and retried writes; Core NFC
    /// regularly reports a write as failed when the tag leaves the field just
    /// after the write landed.
    pub fn for_platform(platform: Platform) -> Self {
        let (discovery_timeout_ms, write_retry) = match platform {
            Platform::Android => (ANDROID_DISCOVERY_TIMEOUT_MS, RetryPolicy::single()),
            Platform::Ios => (IOS_DISCOVERY_TIMEOUT_MS, RetryPolicy::default()),
        };

        Self {
            platform,
            discovery_timeout_ms,
            write_retry,
            strategies: vec![LockStrategy::Hardware, LockStrategy::Software],
        }
    }

    pub fn with_discovery_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.discovery_timeout_ms = timeout_ms;
        self
    }

    pub fn with_write_retry(mut self, write_retry: RetryPolicy) -> Self {
        self.write_retry = write_retry;
        self
    }

    pub fn with_strategies(mut self, strategies: Vec<LockStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    /// # Errors
    /// Returns `Error::Config` for a zero timeout, zero attempts, or an empty
    /// strategy list.
    pub fn validate(&self) -> Result<()> {
        if self.discovery_timeout_ms == 0 {
            return Err(Error::Config("discovery timeout must be positive".into()));
        }
        if self.write_retry.max_attempts == 0 {
            return Err(Error::Config("write retry needs at least one attempt".into()));
        }
        if self.strategies.is_empty() {
            return Err(Error::Config("at least one lock strategy is required".into()));
        }
        Ok(())
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::for_platform(Platform::default())
    }
}

/// On-disk form: anything omitted falls back to the platform defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SecurityConfigFile {
    platform: Platform,
    discovery_timeout_ms: Option<u64>,
    write_retry: Option<RetryPolicy>,
    strategies: Option<Vec<LockStrategy>>,
}

impl From<SecurityConfigFile> for SecurityConfig {
    fn from(file: SecurityConfigFile) -> Self {
        let defaults = Self::for_platform(file.platform);
        Self {
            platform: file.platform,
            discovery_timeout_ms: file
                .discovery_timeout_ms
                .unwrap_or(defaults.discovery_timeout_ms),
            write_retry: file.write_retry.unwrap_or(defaults.write_retry),
            strategies: file.strategies.unwrap_or(defaults.strategies),
        }
    }
}

/// Top-level configuration: which backend to build and how.
///
/// ```json
/// {
///   "security": { "platform": "ios" },
///   "simulator": { "enabled": true, "delayMs": 0 },
///   "reader": "ACS ACR122U PICC Interface 00 00"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TagVaultConfig {
    pub security: SecurityConfig,
    pub simulator: SimulatorConfig,

    /// PC/SC reader name; the first reader is used when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reader: Option<String>,
}

impl TagVaultConfig {
    /// Load and validate a JSON configuration file.
    ///
    /// # Errors
    /// Returns `Error::Config` if the file cannot be read, parsed, or
    /// validated.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json_str(&text)
    }

    /// # Errors
    /// Returns `Error::Config` if the text is not a valid configuration.
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.security.validate()?;
        self.simulator.validate()
    }
}
