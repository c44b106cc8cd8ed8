//! Wiring of the copy task and its engine from configuration.
//!
//! # Design
//! - Collaborators that touch storage or the content service are injected;
//!   everything else is built from [`KatelloConfig`].
//! - Logging is installed separately so embedders that already own a
//!   subscriber can skip it.

use std::sync::Arc;

use katello_config::KatelloConfig;
use katello_content_core::{
    BackendLocator, ContentUnit, CopyOptions, Repository, RepositoryLookup, UnitStores,
};
use katello_events::EventBus;
use katello_telemetry::Metrics;
use tracing::info;

use crate::builder::CopyUnits;
use crate::engine::{LocalTaskEngine, TaskId};
use crate::error::{TaskError, TaskResult};
use crate::executor::CopyUnitsExecutor;
use crate::locator::{BackendConnector, StaticBackendLocator};

/// Storage and content-service adapters supplied by the embedding application.
pub struct Collaborators {
    /// Repository lookup by id.
    pub repositories: Arc<dyn RepositoryLookup>,
    /// Per-kind unit stores.
    pub stores: UnitStores,
    /// Builds content service clients.
    pub connector: Arc<dyn BackendConnector>,
}

/// A running task engine with the copy handler registered.
pub struct TaskRuntime {
    engine: Arc<LocalTaskEngine>,
    events: EventBus,
    metrics: Metrics,
    locator: Arc<StaticBackendLocator>,
}

impl TaskRuntime {
    /// Build the event bus, metrics, locator, and engine, then register the
    /// copy handler.
    ///
    /// # Errors
    ///
    /// Returns an error if the metrics registry cannot be created.
    pub async fn start(config: &KatelloConfig, collaborators: Collaborators) -> TaskResult<Self> {
        let events = EventBus::new();
        let metrics =
            Metrics::new().map_err(|err| TaskError::telemetry("telemetry.metrics", err))?;
        let locator = Arc::new(StaticBackendLocator::new(
            &config.backend,
            collaborators.connector,
        ));

        let backend_locator: Arc<dyn BackendLocator> = locator.clone();
        let executor = CopyUnitsExecutor::new(
            collaborators.repositories,
            collaborators.stores,
            backend_locator,
        )
        .with_events(events.clone())
        .with_metrics(metrics.clone());
        let engine = Arc::new(LocalTaskEngine::start(
            &config.tasks,
            events.clone(),
            metrics.clone(),
        ));
        engine.register(Arc::new(executor)).await;
        info!("task runtime ready");

        Ok(Self {
            engine,
            events,
            metrics,
            locator,
        })
    }

    /// Plan a copy and queue it; `None` when there is nothing to copy.
    ///
    /// # Errors
    ///
    /// Returns an error if planning fails or the engine rejects the task.
    pub async fn copy_units<U: ContentUnit>(
        &self,
        source: &Repository,
        target: &Repository,
        units: &[U],
        options: CopyOptions,
    ) -> TaskResult<Option<TaskId>> {
        CopyUnits::schedule(self.engine.as_ref(), source, target, units, options).await
    }

    /// Engine running the tasks.
    #[must_use]
    pub const fn engine(&self) -> &Arc<LocalTaskEngine> {
        &self.engine
    }

    /// Bus carrying task lifecycle events.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Task metrics registry.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Locator serving backend lookups; reload it when proxies change.
    #[must_use]
    pub const fn locator(&self) -> &Arc<StaticBackendLocator> {
        &self.locator
    }

    /// Drain queued work and stop the workers.
    pub async fn shutdown(&self) {
        self.engine.shutdown().await;
    }
}

/// Install the global tracing subscriber described by `config.logging`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(config: &KatelloConfig) -> TaskResult<()> {
    katello_telemetry::init_logging(&config.logging.as_logging_config())
        .map_err(|err| TaskError::telemetry("telemetry.init", err))
}
