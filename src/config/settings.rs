use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, logging::LoggingConfig};

/// Base name of the optional configuration file (any extension supported by
/// the `config` crate: toml, yaml, json, ...).
pub const DEFAULT_CONFIG_FILE: &str = "config/switchyard";
/// Prefix of environment overrides, e.g.
/// `SWITCHYARD__ROUTER__MAILBOX_CAPACITY=64`.
pub const ENV_PREFIX: &str = "SWITCHYARD";

/// What happens to a channel once its last member leaves.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptyChannelPolicy {
    /// Keep the channel addressable while empty.
    #[default]
    Retain,
    /// Delete the channel exactly when the last member leaves.
    Prune,
}

/// Router settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Capacity of every subscriber mailbox.
    pub mailbox_capacity: usize,
    pub empty_channel_policy: EmptyChannelPolicy,
}

/// Heartbeat-based eviction of unresponsive subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LivenessConfig {
    pub enabled: bool,
    /// A subscriber silent for longer than this is evicted.
    pub timeout_ms: u64,
    /// How often the sweep runs.
    pub sweep_interval_ms: u64,
}

/// Top-level configuration settings for the application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub router: RouterConfig,
    pub liveness: LivenessConfig,
    pub logging: LoggingConfig,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 1024,
            empty_channel_policy: EmptyChannelPolicy::Retain,
        }
    }
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 30_000,
            sweep_interval_ms: 5_000,
        }
    }
}

impl RouterConfig {
    pub fn with_mailbox_capacity(
        mut self,
        capacity: usize,
    ) -> Self {
        self.mailbox_capacity = capacity;
        self
    }

    pub fn with_policy(
        mut self,
        policy: EmptyChannelPolicy,
    ) -> Self {
        self.empty_channel_policy = policy;
        self
    }
}

impl LivenessConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

impl Settings {
    /// Loads settings from [`DEFAULT_CONFIG_FILE`] (if present) and
    /// `SWITCHYARD__*` environment variables on top of built-in defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Same as [`load`](Self::load) with an explicit file base name.
    pub fn load_from(file: &str) -> Result<Self, ConfigError> {
        let cfg = Config::builder()
            .add_source(File::with_name(file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = cfg.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.router.mailbox_capacity == 0 {
            return Err(ConfigError::Invalid(
                "router.mailbox_capacity must be greater than 0".to_string(),
            ));
        }
        if self.liveness.enabled {
            if self.liveness.timeout_ms == 0 {
                return Err(ConfigError::Invalid(
                    "liveness.timeout_ms must be greater than 0".to_string(),
                ));
            }
            if self.liveness.sweep_interval_ms == 0 {
                return Err(ConfigError::Invalid(
                    "liveness.sweep_interval_ms must be greater than 0".to_string(),
                ));
            }
        }
        self.logging
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
