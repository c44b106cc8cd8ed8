use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use katello_config::{BackendConfig, SmartProxyConfig};
use katello_content_core::{
    ContentBackend, ContentResult, ContentUnitKind, ContentUnitRef, CopyOptions, Repository,
    RepositoryId, ResolvedUnit, SmartProxy, UnitId, UnitStores,
};
use katello_tasks::{
    BackendConnector, CopyUnits, CopyUnitsError, CopyUnitsExecutor, StaticBackendLocator,
    TaskResult, TaskScheduler,
};
use katello_test_support::fixtures::{proxy, repository, rpm, unit};
use katello_test_support::mocks::{
    FixedLocator, InMemoryRepositories, InMemoryUnitStore, RecordingBackend,
};
use serde_json::{Value, json};
use uuid::Uuid;

struct Harness {
    repositories: Arc<InMemoryRepositories>,
    rpms: Arc<InMemoryUnitStore>,
    errata: Arc<InMemoryUnitStore>,
    backend: Arc<RecordingBackend>,
    locator: Arc<FixedLocator>,
    executor: CopyUnitsExecutor,
}

fn harness() -> Harness {
    harness_with(RecordingBackend::new(), None)
}

fn harness_with(backend: RecordingBackend, stores: Option<UnitStores>) -> Harness {
    let repositories = Arc::new(InMemoryRepositories::with([
        repository(1, "rhel-9-baseos"),
        repository(2, "rhel-9-baseos-dev"),
    ]));
    let rpms = Arc::new(InMemoryUnitStore::with([
        rpm(10, "bash-5.1.8-9.el9.x86_64"),
        rpm(11, "zsh-5.8-9.el9.x86_64"),
        rpm(12, "tmux-3.2a-5.el9.x86_64"),
    ]));
    let errata = Arc::new(InMemoryUnitStore::with([unit(
        ContentUnitKind::Erratum,
        10,
        "RHSA-2024:0001",
    )]));
    let stores = stores.unwrap_or_else(|| {
        UnitStores::uniform(Arc::new(InMemoryUnitStore::default()))
            .with_store(ContentUnitKind::Rpm, rpms.clone())
            .with_store(ContentUnitKind::Erratum, errata.clone())
    });
    let backend = Arc::new(backend);
    let shared: Arc<dyn ContentBackend> = backend.clone();
    let locator = Arc::new(FixedLocator::new(proxy("katello.example.com"), shared));
    let executor = CopyUnitsExecutor::new(repositories.clone(), stores, locator.clone());
    Harness {
        repositories,
        rpms,
        errata,
        backend,
        locator,
        executor,
    }
}

fn rpm_refs(ids: &[u64]) -> Vec<ContentUnitRef> {
    ids.iter()
        .map(|id| ContentUnitRef::new(ContentUnitKind::Rpm, UnitId(*id)))
        .collect()
}

fn plan(ids: &[u64], options: CopyOptions) -> katello_tasks::CopyJobDescriptor {
    CopyUnits::plan(
        &repository(1, "rhel-9-baseos"),
        &repository(2, "rhel-9-baseos-dev"),
        &rpm_refs(ids),
        options,
    )
    .expect("plan")
    .expect("descriptor")
}

#[derive(Default)]
struct CountingScheduler {
    scheduled: Mutex<Vec<(String, Value)>>,
}

#[async_trait]
impl TaskScheduler for CountingScheduler {
    async fn schedule(&self, kind: &str, input: Value) -> TaskResult<Uuid> {
        self.scheduled
            .lock()
            .expect("scheduler lock")
            .push((kind.to_string(), input));
        Ok(Uuid::new_v4())
    }
}

#[tokio::test]
async fn empty_unit_sets_schedule_nothing() {
    let scheduler = CountingScheduler::default();
    let scheduled = CopyUnits::schedule(
        &scheduler,
        &repository(1, "a"),
        &repository(2, "b"),
        &rpm_refs(&[]),
        CopyOptions::default(),
    )
    .await
    .expect("schedule");

    assert!(scheduled.is_none());
    assert!(scheduler.scheduled.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn scheduled_input_is_the_serialized_descriptor() {
    let scheduler = CountingScheduler::default();
    let options = CopyOptions {
        recursive: true,
        resolve_dependencies: false,
    };
    let scheduled = CopyUnits::schedule(
        &scheduler,
        &repository(1, "a"),
        &repository(2, "b"),
        &[rpm(10, "bash"), rpm(11, "zsh")],
        options,
    )
    .await
    .expect("schedule");
    assert!(scheduled.is_some());

    let calls = scheduler.scheduled.lock().expect("lock").clone();
    assert_eq!(
        calls,
        vec![(
            "copy_units".to_string(),
            json!({
                "source_repo_id": 1,
                "target_repo_id": 2,
                "unit_class": "rpm",
                "unit_ids": [10, 11],
                "recursive": true,
                "resolve_dependencies": false,
            })
        )]
    );
}

#[tokio::test]
async fn backend_is_called_once_with_resolved_entities_and_flags() {
    let h = harness();
    let options = CopyOptions {
        recursive: true,
        resolve_dependencies: true,
    };
    h.executor
        .execute(&plan(&[10, 11], options))
        .await
        .expect("execute");

    let calls = h.backend.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].target, repository(2, "rhel-9-baseos-dev"));
    assert_eq!(calls[0].options, options);
    assert_eq!(
        calls[0].units,
        vec![
            ResolvedUnit::Present(rpm(10, "bash-5.1.8-9.el9.x86_64")),
            ResolvedUnit::Present(rpm(11, "zsh-5.8-9.el9.x86_64")),
        ]
    );
    assert_eq!(
        h.locator.services(),
        vec![(RepositoryId(1), "katello.example.com".to_string())]
    );
}

#[tokio::test]
async fn deleted_source_fails_before_any_backend_call() {
    let h = harness();
    let descriptor = plan(&[10], CopyOptions::default());
    assert!(h.repositories.remove(RepositoryId(1)).is_some());

    let err = h.executor.execute(&descriptor).await.expect_err("missing source");
    assert!(matches!(
        err,
        CopyUnitsError::RepositoryNotFound { repository_id } if repository_id == RepositoryId(1)
    ));
    assert!(!err.is_retryable());
    assert_eq!(h.backend.call_count(), 0);
    assert_eq!(h.locator.proxy_lookups(), 0);
}

#[tokio::test]
async fn target_deleted_after_planning_fails_before_any_backend_call() {
    let h = harness();
    let descriptor = plan(&[10, 11], CopyOptions::default());
    assert!(h.repositories.remove(RepositoryId(2)).is_some());

    let err = h.executor.execute(&descriptor).await.expect_err("missing target");
    assert!(matches!(
        err,
        CopyUnitsError::RepositoryNotFound { repository_id } if repository_id == RepositoryId(2)
    ));
    assert_eq!(h.backend.call_count(), 0);
}

#[tokio::test]
async fn vanished_units_are_passed_through_in_descriptor_order() {
    let h = harness();
    let descriptor = plan(&[12, 11, 10], CopyOptions::default());
    assert!(h.rpms.remove(UnitId(11)).is_some());

    h.executor.execute(&descriptor).await.expect("execute");

    let calls = h.backend.calls();
    assert_eq!(
        calls[0].units,
        vec![
            ResolvedUnit::Present(rpm(12, "tmux-3.2a-5.el9.x86_64")),
            ResolvedUnit::Missing {
                kind: ContentUnitKind::Rpm,
                id: UnitId(11),
            },
            ResolvedUnit::Present(rpm(10, "bash-5.1.8-9.el9.x86_64")),
        ]
    );
}

#[tokio::test]
async fn units_are_loaded_from_the_store_for_their_kind() {
    let h = harness();
    let descriptor = CopyUnits::plan(
        &repository(1, "rhel-9-baseos"),
        &repository(2, "rhel-9-baseos-dev"),
        &[ContentUnitRef::new(ContentUnitKind::Erratum, UnitId(10))],
        CopyOptions::default(),
    )
    .expect("plan")
    .expect("descriptor");

    h.executor.execute(&descriptor).await.expect("execute");

    assert_eq!(h.errata.lookups(), vec![vec![UnitId(10)]]);
    assert!(h.rpms.lookups().is_empty());
    assert_eq!(
        h.backend.calls()[0].units,
        vec![ResolvedUnit::Present(unit(
            ContentUnitKind::Erratum,
            10,
            "RHSA-2024:0001"
        ))]
    );
}

#[tokio::test]
async fn backend_errors_propagate_unchanged() {
    let h = harness_with(
        RecordingBackend::new().failing_with(["pulp task 7f3a failed: 503"]),
        None,
    );

    let err = h
        .executor
        .execute(&plan(&[10], CopyOptions::default()))
        .await
        .expect_err("backend failure");

    assert!(err.is_retryable());
    match err {
        CopyUnitsError::Backend(source) => {
            assert_eq!(source.to_string(), "pulp task 7f3a failed: 503");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(h.backend.call_count(), 1);
}

#[tokio::test]
async fn unit_store_failures_stop_before_the_backend() {
    let failing = UnitStores::uniform(Arc::new(InMemoryUnitStore::failing(
        ContentUnitKind::Rpm,
        "connection reset",
    )));
    let h = harness_with(RecordingBackend::new(), Some(failing));

    let err = h
        .executor
        .execute(&plan(&[10], CopyOptions::default()))
        .await
        .expect_err("store failure");

    assert!(matches!(
        err,
        CopyUnitsError::UnitLookup {
            kind: ContentUnitKind::Rpm,
            ..
        }
    ));
    assert!(!err.is_retryable());
    assert_eq!(h.backend.call_count(), 0);
}

#[tokio::test]
async fn missing_primary_proxy_is_retryable() {
    let repositories = Arc::new(InMemoryRepositories::with([
        repository(1, "rhel-9-baseos"),
        repository(2, "rhel-9-baseos-dev"),
    ]));
    let backend = Arc::new(RecordingBackend::new());
    let shared: Arc<dyn ContentBackend> = backend.clone();
    let executor = CopyUnitsExecutor::new(
        repositories,
        UnitStores::uniform(Arc::new(InMemoryUnitStore::with([rpm(10, "bash")]))),
        Arc::new(FixedLocator::unavailable(shared)),
    );

    let err = executor
        .execute(&plan(&[10], CopyOptions::default()))
        .await
        .expect_err("no proxy");

    assert!(matches!(err, CopyUnitsError::BackendUnavailable { .. }));
    assert!(err.is_retryable());
    assert_eq!(backend.call_count(), 0);
}

struct ProxyRecordingConnector {
    backend: Arc<dyn ContentBackend>,
    proxies: Mutex<Vec<String>>,
}

impl BackendConnector for ProxyRecordingConnector {
    fn connect(
        &self,
        _repository: &Repository,
        proxy: &SmartProxy,
    ) -> ContentResult<Arc<dyn ContentBackend>> {
        self.proxies
            .lock()
            .expect("connector lock")
            .push(proxy.name.clone());
        Ok(Arc::clone(&self.backend))
    }
}

fn primary_config(primary: &str) -> BackendConfig {
    BackendConfig {
        proxies: ["katello.example.com", "capsule.example.com"]
            .into_iter()
            .map(|name| SmartProxyConfig {
                name: name.into(),
                url: format!("https://{name}"),
                primary: name == primary,
            })
            .collect(),
    }
}

#[tokio::test]
async fn proxy_reload_between_planning_and_execution_is_honoured() {
    let backend = Arc::new(RecordingBackend::new());
    let shared: Arc<dyn ContentBackend> = backend.clone();
    let connector = Arc::new(ProxyRecordingConnector {
        backend: shared,
        proxies: Mutex::new(Vec::new()),
    });
    let locator = Arc::new(StaticBackendLocator::new(
        &primary_config("katello.example.com"),
        connector.clone(),
    ));
    let executor = CopyUnitsExecutor::new(
        Arc::new(InMemoryRepositories::with([
            repository(1, "rhel-9-baseos"),
            repository(2, "rhel-9-baseos-dev"),
        ])),
        UnitStores::uniform(Arc::new(InMemoryUnitStore::with([rpm(10, "bash")]))),
        locator.clone(),
    );

    let descriptor = plan(&[10], CopyOptions::default());
    locator.reload(&primary_config("capsule.example.com")).await;
    executor.execute(&descriptor).await.expect("execute");

    assert_eq!(
        connector.proxies.lock().expect("connector lock").clone(),
        vec!["capsule.example.com".to_string()]
    );
    assert_eq!(backend.call_count(), 1);
}
