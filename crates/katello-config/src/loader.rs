//! Configuration loading from a YAML document and environment overrides.
//!
//! # Design
//! - The file named by `KATELLO_CONFIG` is optional; defaults apply without it.
//! - `KATELLO_*` variables override individual fields after the file is read.
//! - The environment is injected as a lookup function so callers and tests
//!   never need to mutate process state.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use katello_telemetry::LogFormat;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::model::KatelloConfig;
use crate::validate::validate;

/// Environment variable naming the YAML configuration file.
pub const CONFIG_PATH_ENV: &str = "KATELLO_CONFIG";

const WORKERS_ENV: &str = "KATELLO_TASK_WORKERS";
const QUEUE_CAPACITY_ENV: &str = "KATELLO_TASK_QUEUE_CAPACITY";
const MAX_ATTEMPTS_ENV: &str = "KATELLO_TASK_MAX_ATTEMPTS";
const RETRY_DELAY_ENV: &str = "KATELLO_TASK_RETRY_DELAY_MS";
const LOG_LEVEL_ENV: &str = "KATELLO_LOG_LEVEL";
const LOG_FORMAT_ENV: &str = "KATELLO_LOG_FORMAT";

type ProcessEnv = fn(&str) -> Option<String>;

/// Loads and validates [`KatelloConfig`].
pub struct ConfigLoader<F> {
    env: F,
}

impl ConfigLoader<ProcessEnv> {
    /// Loader reading the process environment.
    #[must_use]
    pub fn from_process_env() -> Self {
        Self {
            env: process_env as ProcessEnv,
        }
    }
}

impl<F> ConfigLoader<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Loader reading variables through `env`.
    pub const fn with_env(env: F) -> Self {
        Self { env }
    }

    /// Read the optional file, apply overrides, and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, an override is
    /// malformed, or the resulting document fails validation.
    pub fn load(&self) -> ConfigResult<KatelloConfig> {
        let mut config = match self.var(CONFIG_PATH_ENV) {
            Some(path) => load_file(Path::new(&path))?,
            None => KatelloConfig::default(),
        };
        self.apply_overrides(&mut config)?;
        validate(&config)?;
        debug!(
            workers = config.tasks.worker_count,
            queue_capacity = config.tasks.queue_capacity,
            max_attempts = config.tasks.max_attempts,
            proxies = config.backend.proxies.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    fn apply_overrides(&self, config: &mut KatelloConfig) -> ConfigResult<()> {
        if let Some(workers) = self.parsed(WORKERS_ENV)? {
            config.tasks.worker_count = workers;
        }
        if let Some(capacity) = self.parsed(QUEUE_CAPACITY_ENV)? {
            config.tasks.queue_capacity = capacity;
        }
        if let Some(attempts) = self.parsed(MAX_ATTEMPTS_ENV)? {
            config.tasks.max_attempts = attempts;
        }
        if let Some(delay) = self.parsed(RETRY_DELAY_ENV)? {
            config.tasks.retry_delay_ms = delay;
        }
        if let Some(level) = self.var(LOG_LEVEL_ENV) {
            config.logging.level = level;
        }
        if let Some(format) = self.var(LOG_FORMAT_ENV) {
            config.logging.format =
                LogFormat::from_str(&format).map_err(|_| ConfigError::InvalidEnv {
                    name: LOG_FORMAT_ENV,
                    value: format.clone(),
                })?;
        }
        Ok(())
    }

    fn var(&self, name: &str) -> Option<String> {
        (self.env)(name).filter(|value| !value.trim().is_empty())
    }

    fn parsed<T: FromStr>(&self, name: &'static str) -> ConfigResult<Option<T>> {
        let Some(value) = self.var(name) else {
            return Ok(None);
        };
        let parsed = value.trim().parse::<T>();
        parsed
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value })
    }
}

/// Parse a YAML configuration file without applying overrides or validation.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid document.
pub fn load_file(path: &Path) -> ConfigResult<KatelloConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    info!(path = %path.display(), "read configuration file");
    Ok(config)
}

fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
