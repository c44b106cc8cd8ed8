//! Lookup and backend traits implemented by persistence and content-service adapters.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ContentResult;
use crate::model::{
    ContentUnitKind, ContentUnitRecord, CopyOptions, Repository, RepositoryId, ResolvedUnit,
    SmartProxy, UnitId,
};

/// Repository lookup by primary key.
#[async_trait]
pub trait RepositoryLookup: Send + Sync {
    /// Fetch the live repository, or `None` when it has been deleted.
    async fn find_repository(&self, id: RepositoryId) -> ContentResult<Option<Repository>>;
}

/// Storage for a single content unit kind.
#[async_trait]
pub trait UnitStore: Send + Sync {
    /// Load every unit in `ids` that still exists. Missing ids are skipped.
    async fn find_units(&self, ids: &[UnitId]) -> ContentResult<Vec<ContentUnitRecord>>;
}

/// Content service client bound to one repository and backend endpoint.
#[async_trait]
pub trait ContentBackend: Send + Sync {
    /// Make `units` present in `target`.
    ///
    /// Units that no longer exist are passed as [`ResolvedUnit::Missing`]; how
    /// they are treated is up to the backend.
    async fn copy_units(
        &self,
        target: &Repository,
        units: &[ResolvedUnit],
        options: CopyOptions,
    ) -> anyhow::Result<()>;
}

/// Resolves backend endpoints and the content service for a repository.
///
/// Both calls are made when a task executes so that endpoint changes made
/// after planning are honoured.
#[async_trait]
pub trait BackendLocator: Send + Sync {
    /// Current primary backend endpoint.
    async fn primary_proxy(&self) -> ContentResult<SmartProxy>;

    /// Content service for `repository` served through `proxy`.
    fn backend_service(
        &self,
        repository: &Repository,
        proxy: &SmartProxy,
    ) -> ContentResult<Arc<dyn ContentBackend>>;
}

/// One unit store per content unit kind.
#[derive(Clone)]
pub struct UnitStores {
    rpm: Arc<dyn UnitStore>,
    srpm: Arc<dyn UnitStore>,
    erratum: Arc<dyn UnitStore>,
    package_group: Arc<dyn UnitStore>,
    module_stream: Arc<dyn UnitStore>,
    docker_manifest: Arc<dyn UnitStore>,
    docker_tag: Arc<dyn UnitStore>,
    file: Arc<dyn UnitStore>,
    ansible_collection: Arc<dyn UnitStore>,
}

impl UnitStores {
    /// Route every kind to `store`; override individual kinds with [`Self::with_store`].
    #[must_use]
    pub fn uniform(store: Arc<dyn UnitStore>) -> Self {
        Self {
            rpm: Arc::clone(&store),
            srpm: Arc::clone(&store),
            erratum: Arc::clone(&store),
            package_group: Arc::clone(&store),
            module_stream: Arc::clone(&store),
            docker_manifest: Arc::clone(&store),
            docker_tag: Arc::clone(&store),
            file: Arc::clone(&store),
            ansible_collection: store,
        }
    }

    /// Replace the store used for `kind`.
    #[must_use]
    pub fn with_store(mut self, kind: ContentUnitKind, store: Arc<dyn UnitStore>) -> Self {
        *self.slot_mut(kind) = store;
        self
    }

    /// Store responsible for `kind`.
    #[must_use]
    pub fn for_kind(&self, kind: ContentUnitKind) -> &dyn UnitStore {
        match kind {
            ContentUnitKind::Rpm => self.rpm.as_ref(),
            ContentUnitKind::Srpm => self.srpm.as_ref(),
            ContentUnitKind::Erratum => self.erratum.as_ref(),
            ContentUnitKind::PackageGroup => self.package_group.as_ref(),
            ContentUnitKind::ModuleStream => self.module_stream.as_ref(),
            ContentUnitKind::DockerManifest => self.docker_manifest.as_ref(),
            ContentUnitKind::DockerTag => self.docker_tag.as_ref(),
            ContentUnitKind::File => self.file.as_ref(),
            ContentUnitKind::AnsibleCollection => self.ansible_collection.as_ref(),
        }
    }

    const fn slot_mut(&mut self, kind: ContentUnitKind) -> &mut Arc<dyn UnitStore> {
        match kind {
            ContentUnitKind::Rpm => &mut self.rpm,
            ContentUnitKind::Srpm => &mut self.srpm,
            ContentUnitKind::Erratum => &mut self.erratum,
            ContentUnitKind::PackageGroup => &mut self.package_group,
            ContentUnitKind::ModuleStream => &mut self.module_stream,
            ContentUnitKind::DockerManifest => &mut self.docker_manifest,
            ContentUnitKind::DockerTag => &mut self.docker_tag,
            ContentUnitKind::File => &mut self.file,
            ContentUnitKind::AnsibleCollection => &mut self.ansible_collection,
        }
    }
}
