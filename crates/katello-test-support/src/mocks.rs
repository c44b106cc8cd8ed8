//! In-memory collaborators for exercising the copy task without a database or
//! a content service.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::anyhow;
use async_trait::async_trait;
use katello_content_core::{
    BackendLocator, ContentBackend, ContentError, ContentResult, ContentUnitKind,
    ContentUnitRecord, CopyOptions, Repository, RepositoryId, RepositoryLookup, ResolvedUnit,
    SmartProxy, UnitId, UnitStore,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Repository table keyed by id; rows can be removed to simulate deletion.
#[derive(Default)]
pub struct InMemoryRepositories {
    rows: Mutex<HashMap<RepositoryId, Repository>>,
}

impl InMemoryRepositories {
    /// Table pre-populated with `repositories`.
    #[must_use]
    pub fn with(repositories: impl IntoIterator<Item = Repository>) -> Self {
        let table = Self::default();
        for repository in repositories {
            table.insert(repository);
        }
        table
    }

    /// Insert or replace a row.
    pub fn insert(&self, repository: Repository) {
        lock(&self.rows).insert(repository.id, repository);
    }

    /// Delete a row, returning it when present.
    #[must_use]
    pub fn remove(&self, id: RepositoryId) -> Option<Repository> {
        lock(&self.rows).remove(&id)
    }
}

#[async_trait]
impl RepositoryLookup for InMemoryRepositories {
    async fn find_repository(&self, id: RepositoryId) -> ContentResult<Option<Repository>> {
        Ok(lock(&self.rows).get(&id).cloned())
    }
}

/// Unit table for one or more kinds, recording every lookup.
#[derive(Default)]
pub struct InMemoryUnitStore {
    rows: Mutex<BTreeMap<UnitId, ContentUnitRecord>>,
    lookups: Mutex<Vec<Vec<UnitId>>>,
    failure: Option<(ContentUnitKind, String)>,
}

impl InMemoryUnitStore {
    /// Store pre-populated with `units`.
    #[must_use]
    pub fn with(units: impl IntoIterator<Item = ContentUnitRecord>) -> Self {
        let store = Self::default();
        for unit in units {
            store.insert(unit);
        }
        store
    }

    /// Store whose every lookup fails with `message`.
    #[must_use]
    pub fn failing(kind: ContentUnitKind, message: &str) -> Self {
        Self {
            failure: Some((kind, message.to_string())),
            ..Self::default()
        }
    }

    /// Insert or replace a unit.
    pub fn insert(&self, unit: ContentUnitRecord) {
        lock(&self.rows).insert(unit.id, unit);
    }

    /// Delete a unit, returning it when present.
    #[must_use]
    pub fn remove(&self, id: UnitId) -> Option<ContentUnitRecord> {
        lock(&self.rows).remove(&id)
    }

    /// Id lists passed to [`UnitStore::find_units`], oldest first.
    #[must_use]
    pub fn lookups(&self) -> Vec<Vec<UnitId>> {
        lock(&self.lookups).clone()
    }
}

#[async_trait]
impl UnitStore for InMemoryUnitStore {
    async fn find_units(&self, ids: &[UnitId]) -> ContentResult<Vec<ContentUnitRecord>> {
        lock(&self.lookups).push(ids.to_vec());
        if let Some((kind, message)) = &self.failure {
            return Err(ContentError::unit_lookup(*kind, message.clone()));
        }
        let rows = lock(&self.rows);
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }
}

/// Arguments of one [`ContentBackend::copy_units`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyCall {
    /// Repository the units were copied into.
    pub target: Repository,
    /// Units as handed to the backend.
    pub units: Vec<ResolvedUnit>,
    /// Flags as handed to the backend.
    pub options: CopyOptions,
}

/// Backend that records every call and can be scripted to fail.
#[derive(Default)]
pub struct RecordingBackend {
    calls: Mutex<Vec<CopyCall>>,
    failures: Mutex<VecDeque<String>>,
}

impl RecordingBackend {
    /// Backend that accepts every call.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next calls, one message per call, before accepting again.
    #[must_use]
    pub fn failing_with<I, S>(self, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.failures).extend(messages.into_iter().map(Into::into));
        self
    }

    /// Every call received so far, including failed ones.
    #[must_use]
    pub fn calls(&self) -> Vec<CopyCall> {
        lock(&self.calls).clone()
    }

    /// Number of calls received so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl ContentBackend for RecordingBackend {
    async fn copy_units(
        &self,
        target: &Repository,
        units: &[ResolvedUnit],
        options: CopyOptions,
    ) -> anyhow::Result<()> {
        lock(&self.calls).push(CopyCall {
            target: target.clone(),
            units: units.to_vec(),
            options,
        });
        let failure = lock(&self.failures).pop_front();
        failure.map_or(Ok(()), |message| Err(anyhow!(message)))
    }
}

/// Locator returning a fixed proxy and backend, recording how it was used.
pub struct FixedLocator {
    proxy: Option<SmartProxy>,
    backend: Arc<dyn ContentBackend>,
    proxy_lookups: AtomicUsize,
    services: Mutex<Vec<(RepositoryId, String)>>,
}

impl FixedLocator {
    /// Locator serving `backend` through `proxy`.
    #[must_use]
    pub fn new(proxy: SmartProxy, backend: Arc<dyn ContentBackend>) -> Self {
        Self {
            proxy: Some(proxy),
            backend,
            proxy_lookups: AtomicUsize::new(0),
            services: Mutex::new(Vec::new()),
        }
    }

    /// Locator with no primary proxy configured.
    #[must_use]
    pub fn unavailable(backend: Arc<dyn ContentBackend>) -> Self {
        Self {
            proxy: None,
            ..Self::new(crate::fixtures::proxy("unused"), backend)
        }
    }

    /// Number of [`BackendLocator::primary_proxy`] calls.
    #[must_use]
    pub fn proxy_lookups(&self) -> usize {
        self.proxy_lookups.load(Ordering::SeqCst)
    }

    /// `(repository, proxy name)` pairs passed to [`BackendLocator::backend_service`].
    #[must_use]
    pub fn services(&self) -> Vec<(RepositoryId, String)> {
        lock(&self.services).clone()
    }
}

#[async_trait]
impl BackendLocator for FixedLocator {
    async fn primary_proxy(&self) -> ContentResult<SmartProxy> {
        self.proxy_lookups.fetch_add(1, Ordering::SeqCst);
        self.proxy
            .clone()
            .ok_or(ContentError::BackendUnavailable {
                reason: "no primary smart proxy configured",
            })
    }

    fn backend_service(
        &self,
        repository: &Repository,
        proxy: &SmartProxy,
    ) -> ContentResult<Arc<dyn ContentBackend>> {
        lock(&self.services).push((repository.id, proxy.name.clone()));
        Ok(Arc::clone(&self.backend))
    }
}
