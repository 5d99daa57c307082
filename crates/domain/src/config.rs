//! Configuration structures
//!
//! Loaded by `courier-infra::config` from the environment or from a JSON /
//! TOML file. Every field has a default so partial files are accepted.

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_JOIN_TIMEOUT_MS, DEFAULT_LOG_LEVEL, DEFAULT_MAX_RETRIES,
};
use crate::impl_domain_enum_conversions;

/// Where callbacks run once a request's attempt loop has finished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackMode {
    /// On the dispatch worker, before the next entry is dequeued
    #[default]
    Inline,
    /// On the blocking thread pool; the worker moves on immediately
    Detached,
}

impl_domain_enum_conversions!(CallbackMode {
    Inline => "inline",
    Detached => "detached",
});

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dispatcher: DispatcherConfig,
    pub transport: TransportConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Retries granted by the default policy. `None` disables the default
    /// policy, so entries without their own policy are attempted once.
    pub max_retries: Option<u32>,
    pub callback_mode: CallbackMode,
    pub join_timeout_ms: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_retries: Some(DEFAULT_MAX_RETRIES),
            callback_mode: CallbackMode::Inline,
            join_timeout_ms: DEFAULT_JOIN_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub timeout_secs: u64,
    pub user_agent: Option<String>,
    /// Log full request and response payloads at trace level
    pub log_payloads: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self { timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS, user_agent: None, log_payloads: false }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `"info"` or `"courier_core=debug"`
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: DEFAULT_LOG_LEVEL.to_string(), json: false }
    }
}
