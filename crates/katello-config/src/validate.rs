//! Validation helpers for configuration documents.

use crate::defaults::{MAX_ATTEMPTS_LIMIT, MAX_WORKER_COUNT};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{BackendConfig, KatelloConfig, TaskEngineConfig};

/// Check every section, returning the first violation.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] describing the offending field.
pub fn validate(config: &KatelloConfig) -> ConfigResult<()> {
    validate_tasks(&config.tasks)?;
    validate_backend(&config.backend)?;
    if config.logging.level.trim().is_empty() {
        return Err(ConfigError::invalid(
            "logging",
            "level",
            &config.logging.level,
            "must not be empty",
        ));
    }
    Ok(())
}

fn validate_tasks(tasks: &TaskEngineConfig) -> ConfigResult<()> {
    if !(1..=MAX_WORKER_COUNT).contains(&tasks.worker_count) {
        return Err(ConfigError::invalid(
            "tasks",
            "worker_count",
            tasks.worker_count,
            "must be between 1 and 64",
        ));
    }
    if tasks.queue_capacity == 0 {
        return Err(ConfigError::invalid(
            "tasks",
            "queue_capacity",
            tasks.queue_capacity,
            "must be at least 1",
        ));
    }
    if !(1..=MAX_ATTEMPTS_LIMIT).contains(&tasks.max_attempts) {
        return Err(ConfigError::invalid(
            "tasks",
            "max_attempts",
            tasks.max_attempts,
            "must be between 1 and 10",
        ));
    }
    Ok(())
}

fn validate_backend(backend: &BackendConfig) -> ConfigResult<()> {
    for proxy in &backend.proxies {
        if proxy.name.trim().is_empty() {
            return Err(ConfigError::invalid(
                "backend",
                "proxies.name",
                &proxy.name,
                "must not be empty",
            ));
        }
        if !(proxy.url.starts_with("http://") || proxy.url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "backend",
                "proxies.url",
                &proxy.url,
                "must be an http(s) url",
            ));
        }
    }

    let primaries = backend.proxies.iter().filter(|proxy| proxy.primary).count();
    if !backend.proxies.is_empty() && primaries != 1 {
        return Err(ConfigError::invalid(
            "backend",
            "proxies.primary",
            primaries,
            "exactly one proxy must be primary",
        ));
    }
    Ok(())
}
