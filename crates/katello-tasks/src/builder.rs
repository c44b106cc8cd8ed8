//! Planning and scheduling of copy-units tasks.

use katello_content_core::{ContentUnit, CopyOptions, Repository};
use tracing::debug;

use crate::descriptor::CopyJobDescriptor;
use crate::engine::{AsyncTask, TaskId, TaskScheduler};
use crate::error::{PlanError, TaskError, TaskResult};
use crate::executor::CopyUnitsExecutor;

/// Entry point for copying content units between repositories.
pub struct CopyUnits;

impl CopyUnits {
    /// Describe copying `units` from `source` into `target`.
    ///
    /// Returns `Ok(None)` when there is nothing to copy. The descriptor keeps
    /// unit ids in input order and takes its unit class from the first unit.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::MixedUnitKinds`] when the units are not all of
    /// the same kind.
    pub fn plan<U: ContentUnit>(
        source: &Repository,
        target: &Repository,
        units: &[U],
        options: CopyOptions,
    ) -> Result<Option<CopyJobDescriptor>, PlanError> {
        let Some(first) = units.first() else {
            debug!(
                source_repo_id = %source.id,
                target_repo_id = %target.id,
                "no units to copy"
            );
            return Ok(None);
        };

        let kind = first.kind();
        if let Some(other) = units.iter().find(|unit| unit.kind() != kind) {
            return Err(PlanError::MixedUnitKinds {
                expected: kind,
                found: other.kind(),
                unit_id: other.id(),
            });
        }

        let unit_ids = units.iter().map(ContentUnit::id).collect::<Vec<_>>();
        debug!(
            source_repo_id = %source.id,
            target_repo_id = %target.id,
            unit_kind = %kind,
            unit_count = unit_ids.len(),
            recursive = options.recursive,
            resolve_dependencies = options.resolve_dependencies,
            "planned unit copy"
        );
        Ok(Some(CopyJobDescriptor::new(
            source.id, target.id, kind, unit_ids, options,
        )))
    }

    /// Plan the copy and hand the descriptor to `scheduler`.
    ///
    /// The scheduler is not called when there is nothing to copy.
    ///
    /// # Errors
    ///
    /// Returns an error if planning fails, the descriptor cannot be encoded,
    /// or the scheduler rejects the task.
    pub async fn schedule<S, U>(
        scheduler: &S,
        source: &Repository,
        target: &Repository,
        units: &[U],
        options: CopyOptions,
    ) -> TaskResult<Option<TaskId>>
    where
        S: TaskScheduler + ?Sized,
        U: ContentUnit,
    {
        let Some(descriptor) = Self::plan(source, target, units, options)? else {
            return Ok(None);
        };
        let input = serde_json::to_value(&descriptor).map_err(|source| TaskError::Encode {
            kind: CopyUnitsExecutor::KIND,
            source,
        })?;
        scheduler
            .schedule(CopyUnitsExecutor::KIND, input)
            .await
            .map(Some)
    }
}
