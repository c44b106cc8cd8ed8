//! Execution of copy-units descriptors against the backend content service.
//!
//! # Design
//! - Every entity is re-resolved by id when the task runs; nothing from
//!   planning time is trusted beyond the identifiers.
//! - Missing repositories fail before the backend is contacted.
//! - Units that vanished after planning are passed through as
//!   [`ResolvedUnit::Missing`], in descriptor order.
//! - The backend is called once per attempt and its error is returned as is.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use katello_content_core::{
    BackendLocator, ContentError, ContentUnitRecord, Repository, RepositoryId, RepositoryLookup,
    ResolvedUnit, UnitId, UnitStores,
};
use katello_events::{Event, EventBus};
use katello_telemetry::Metrics;
use tracing::{info, warn};

use crate::descriptor::CopyJobDescriptor;
use crate::engine::AsyncTask;
use crate::error::CopyUnitsError;

/// Handler for `copy_units` tasks.
pub struct CopyUnitsExecutor {
    repositories: Arc<dyn RepositoryLookup>,
    stores: UnitStores,
    locator: Arc<dyn BackendLocator>,
    events: Option<EventBus>,
    metrics: Option<Metrics>,
}

impl CopyUnitsExecutor {
    /// Executor resolving entities through the given collaborators.
    #[must_use]
    pub fn new(
        repositories: Arc<dyn RepositoryLookup>,
        stores: UnitStores,
        locator: Arc<dyn BackendLocator>,
    ) -> Self {
        Self {
            repositories,
            stores,
            locator,
            events: None,
            metrics: None,
        }
    }

    /// Publish [`Event::UnitsCopied`] after each successful copy.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Count copied units in `metrics`.
    #[must_use]
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Copy the descriptor's units from its source into its target repository.
    ///
    /// # Errors
    ///
    /// - [`CopyUnitsError::RepositoryNotFound`] if either repository is gone;
    ///   the backend is not contacted.
    /// - [`CopyUnitsError::UnitLookup`] if the unit store fails.
    /// - [`CopyUnitsError::BackendUnavailable`] if no backend can be located.
    /// - [`CopyUnitsError::Backend`] with the backend's own error if the copy
    ///   fails.
    pub async fn execute(&self, descriptor: &CopyJobDescriptor) -> Result<(), CopyUnitsError> {
        let source = self.repository(descriptor.source_repo_id()).await?;
        let target = self.repository(descriptor.target_repo_id()).await?;
        let units = self.resolve_units(descriptor).await?;

        let proxy = self
            .locator
            .primary_proxy()
            .await
            .map_err(|source| CopyUnitsError::BackendUnavailable { source })?;
        let backend = self
            .locator
            .backend_service(&source, &proxy)
            .map_err(|source| CopyUnitsError::BackendUnavailable { source })?;

        backend
            .copy_units(&target, &units, descriptor.options())
            .await
            .map_err(CopyUnitsError::Backend)?;

        let kind = descriptor.unit_class();
        info!(
            source_repo_id = %source.id,
            target_repo_id = %target.id,
            unit_kind = %kind,
            unit_count = units.len(),
            proxy = %proxy.name,
            "content units copied"
        );
        if let Some(metrics) = &self.metrics {
            metrics.add_units_copied(kind.as_str(), units.len());
        }
        if let Some(events) = &self.events {
            events.publish(Event::UnitsCopied {
                source_repo_id: source.id.0,
                target_repo_id: target.id.0,
                unit_kind: kind.as_str().to_string(),
                unit_count: units.len(),
            });
        }
        Ok(())
    }

    async fn repository(&self, repository_id: RepositoryId) -> Result<Repository, CopyUnitsError> {
        match self.repositories.find_repository(repository_id).await {
            Ok(Some(repository)) => Ok(repository),
            Ok(None) | Err(ContentError::RepositoryNotFound { .. }) => {
                Err(CopyUnitsError::RepositoryNotFound { repository_id })
            }
            Err(source) => Err(CopyUnitsError::RepositoryLookup {
                repository_id,
                source,
            }),
        }
    }

    async fn resolve_units(
        &self,
        descriptor: &CopyJobDescriptor,
    ) -> Result<Vec<ResolvedUnit>, CopyUnitsError> {
        let kind = descriptor.unit_class();
        let records = self
            .stores
            .for_kind(kind)
            .find_units(descriptor.unit_ids())
            .await
            .map_err(|source| CopyUnitsError::UnitLookup { kind, source })?;
        let found: HashMap<UnitId, ContentUnitRecord> = records
            .into_iter()
            .map(|record| (record.id, record))
            .collect();

        let resolved: Vec<ResolvedUnit> = descriptor
            .unit_refs()
            .map(|unit| {
                found.get(&unit.id).cloned().map_or(
                    ResolvedUnit::Missing { kind, id: unit.id },
                    ResolvedUnit::Present,
                )
            })
            .collect();
        let missing = resolved.iter().filter(|unit| !unit.is_present()).count();
        if missing > 0 {
            warn!(
                unit_kind = %kind,
                missing,
                requested = resolved.len(),
                "content units no longer exist; passing them to the backend as missing"
            );
        }
        Ok(resolved)
    }
}

#[async_trait]
impl AsyncTask for CopyUnitsExecutor {
    const KIND: &'static str = "copy_units";
    type Input = CopyJobDescriptor;
    type Error = CopyUnitsError;

    async fn run(&self, input: CopyJobDescriptor) -> Result<(), CopyUnitsError> {
        self.execute(&input).await
    }
}
