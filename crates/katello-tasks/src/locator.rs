//! Backend locator built from the `backend.proxies` configuration section.

use std::sync::Arc;

use async_trait::async_trait;
use katello_config::BackendConfig;
use katello_content_core::{
    BackendLocator, ContentBackend, ContentError, ContentResult, Repository, SmartProxy,
};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Builds content service clients for a repository served through a proxy.
pub trait BackendConnector: Send + Sync {
    /// Client for `repository` on `proxy`.
    ///
    /// # Errors
    ///
    /// Returns an error if no client can be built for the pair.
    fn connect(
        &self,
        repository: &Repository,
        proxy: &SmartProxy,
    ) -> ContentResult<Arc<dyn ContentBackend>>;
}

/// A single shared client serves every repository and proxy.
impl BackendConnector for Arc<dyn ContentBackend> {
    fn connect(
        &self,
        _repository: &Repository,
        _proxy: &SmartProxy,
    ) -> ContentResult<Arc<dyn ContentBackend>> {
        Ok(Arc::clone(self))
    }
}

/// [`BackendLocator`] over the configured proxy list.
///
/// The primary proxy is read on every lookup, so [`Self::reload`] takes
/// effect for tasks that were planned earlier.
pub struct StaticBackendLocator {
    primary: RwLock<Option<SmartProxy>>,
    connector: Arc<dyn BackendConnector>,
}

impl StaticBackendLocator {
    /// Locator over `config`, building clients with `connector`.
    #[must_use]
    pub fn new(config: &BackendConfig, connector: Arc<dyn BackendConnector>) -> Self {
        Self {
            primary: RwLock::new(primary_of(config)),
            connector,
        }
    }

    /// Replace the primary proxy with the one flagged in `config`.
    pub async fn reload(&self, config: &BackendConfig) {
        let primary = primary_of(config);
        info!(
            primary = primary.as_ref().map_or("none", |proxy| proxy.name.as_str()),
            "backend proxies reloaded"
        );
        *self.primary.write().await = primary;
    }
}

fn primary_of(config: &BackendConfig) -> Option<SmartProxy> {
    config.primary().map(|proxy| SmartProxy {
        name: proxy.name.clone(),
        url: proxy.url.clone(),
    })
}

#[async_trait]
impl BackendLocator for StaticBackendLocator {
    async fn primary_proxy(&self) -> ContentResult<SmartProxy> {
        self.primary
            .read()
            .await
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
        debug!(
            repository_id = %repository.id,
            proxy = %proxy.name,
            "resolving content backend"
        );
        self.connector.connect(repository, proxy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use katello_config::SmartProxyConfig;
    use katello_test_support::fixtures::repository;
    use katello_test_support::mocks::RecordingBackend;

    fn config(primary: &str) -> BackendConfig {
        BackendConfig {
            proxies: vec![
                SmartProxyConfig {
                    name: "capsule.example.com".into(),
                    url: "https://capsule.example.com".into(),
                    primary: primary == "capsule.example.com",
                },
                SmartProxyConfig {
                    name: "katello.example.com".into(),
                    url: "https://katello.example.com".into(),
                    primary: primary == "katello.example.com",
                },
            ],
        }
    }

    fn connector() -> Arc<dyn BackendConnector> {
        let backend: Arc<dyn ContentBackend> = Arc::new(RecordingBackend::new());
        Arc::new(backend)
    }

    #[tokio::test]
    async fn primary_proxy_follows_reloads() {
        let locator = StaticBackendLocator::new(&config("katello.example.com"), connector());
        assert_eq!(
            locator.primary_proxy().await.expect("primary").name,
            "katello.example.com"
        );

        locator.reload(&config("capsule.example.com")).await;
        let proxy = locator.primary_proxy().await.expect("primary");
        assert_eq!(proxy.url, "https://capsule.example.com");
        assert!(locator.backend_service(&repository(1, "rhel"), &proxy).is_ok());
    }

    #[tokio::test]
    async fn missing_primary_is_unavailable() {
        let locator = StaticBackendLocator::new(&BackendConfig::default(), connector());
        let err = locator.primary_proxy().await.expect_err("no proxies");
        assert!(matches!(err, ContentError::BackendUnavailable { .. }));
    }
}
