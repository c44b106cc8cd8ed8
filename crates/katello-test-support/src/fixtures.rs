//! Builders for domain values used throughout the integration suites.

use katello_content_core::{
    ContentUnitKind, ContentUnitRecord, ProductId, Repository, RepositoryId, SmartProxy, UnitId,
};

/// Unpromoted custom repository in `Library` owned by product 1.
#[must_use]
pub fn repository(id: u64, name: &str) -> Repository {
    Repository {
        id: RepositoryId(id),
        name: name.to_string(),
        product_id: ProductId(1),
        environment: "Library".to_string(),
        promoted: false,
        redhat: false,
    }
}

/// Stored unit of `kind` with a backend id derived from its kind and id.
#[must_use]
pub fn unit(kind: ContentUnitKind, id: u64, name: &str) -> ContentUnitRecord {
    ContentUnitRecord {
        id: UnitId(id),
        kind,
        backend_id: format!("{}-{id}", kind.as_str()),
        name: name.to_string(),
    }
}

/// Stored RPM unit.
#[must_use]
pub fn rpm(id: u64, name: &str) -> ContentUnitRecord {
    unit(ContentUnitKind::Rpm, id, name)
}

/// Smart proxy named `name` at `https://{name}`.
#[must_use]
pub fn proxy(name: &str) -> SmartProxy {
    SmartProxy {
        name: name.to_string(),
        url: format!("https://{name}"),
    }
}
