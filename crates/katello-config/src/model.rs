//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers; every section falls back to defaults when omitted.
//! - Keeps IO in `loader.rs` and checks in `validate.rs`.

use std::time::Duration;

use katello_telemetry::{LogFormat, LoggingConfig, build_sha};
use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_MAX_ATTEMPTS, DEFAULT_QUEUE_CAPACITY, DEFAULT_RETRY_DELAY_MS, DEFAULT_WORKER_COUNT,
};

/// Root configuration document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KatelloConfig {
    /// Task engine sizing and retry policy.
    pub tasks: TaskEngineConfig,
    /// Backend content-service endpoints.
    pub backend: BackendConfig,
    /// Logging output.
    pub logging: LoggingSettings,
}

/// Task engine sizing and retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaskEngineConfig {
    /// Worker tasks pulling from the queue.
    pub worker_count: usize,
    /// Bounded queue size.
    pub queue_capacity: usize,
    /// Attempts per task, including the first.
    pub max_attempts: u32,
    /// Delay before re-queueing a retryable failure, in milliseconds.
    pub retry_delay_ms: u64,
}

impl TaskEngineConfig {
    /// Retry delay as a [`Duration`].
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for TaskEngineConfig {
    fn default() -> Self {
        Self {
            worker_count: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay_ms: DEFAULT_RETRY_DELAY_MS,
        }
    }
}

/// Backend content-service endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    /// Known smart proxies; exactly one is primary when any are listed.
    pub proxies: Vec<SmartProxyConfig>,
}

impl BackendConfig {
    /// The proxy flagged as primary, if any.
    #[must_use]
    pub fn primary(&self) -> Option<&SmartProxyConfig> {
        self.proxies.iter().find(|proxy| proxy.primary)
    }
}

/// A single smart proxy entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SmartProxyConfig {
    /// Proxy name.
    pub name: String,
    /// Base URL (`http://` or `https://`).
    pub url: String,
    /// Whether this proxy hosts the primary content service.
    #[serde(default)]
    pub primary: bool,
}

/// Logging output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl LoggingSettings {
    /// Borrow the settings as a telemetry logging config.
    #[must_use]
    pub fn as_logging_config(&self) -> LoggingConfig<'_> {
        LoggingConfig {
            level: &self.level,
            format: self.format,
            build_sha: build_sha(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: katello_telemetry::DEFAULT_LOG_LEVEL.to_string(),
            format: LogFormat::infer(),
        }
    }
}
