//! Instance-level repository permission predicates.
//!
//! Repositories do not carry their own grants; every check is answered by the
//! owning product, with deletion additionally blocked once the repository has
//! been promoted.

use crate::model::{ProductId, Repository};

/// Product-scoped permission checks for the current user.
pub trait ProductPermissions {
    /// The user may edit the product and its repositories.
    fn editable(&self, product: ProductId) -> bool;
    /// The user may synchronise the product's repositories.
    fn syncable(&self, product: ProductId) -> bool;
    /// The user may view the product.
    fn readable(&self, product: ProductId) -> bool;
}

/// Permission predicates for a single repository.
pub struct RepositoryAuthorization<'a, P: ?Sized> {
    permissions: &'a P,
}

impl<'a, P> RepositoryAuthorization<'a, P>
where
    P: ProductPermissions + ?Sized,
{
    /// Bind the predicates to a permission source.
    #[must_use]
    pub const fn new(permissions: &'a P) -> Self {
        Self { permissions }
    }

    /// Editing is delegated to the product.
    #[must_use]
    pub fn editable(&self, repository: &Repository) -> bool {
        self.permissions.editable(repository.product_id)
    }

    /// Custom repositories are deletable while unpromoted and the product is editable.
    #[must_use]
    pub fn deletable(&self, repository: &Repository) -> bool {
        self.permissions.editable(repository.product_id) && !repository.promoted
    }

    /// Red Hat repositories follow the same rule as custom ones.
    #[must_use]
    pub fn redhat_deletable(&self, repository: &Repository) -> bool {
        !repository.promoted && self.permissions.editable(repository.product_id)
    }

    /// Picks the deletion rule matching the repository's origin.
    #[must_use]
    pub fn can_delete(&self, repository: &Repository) -> bool {
        if repository.redhat {
            self.redhat_deletable(repository)
        } else {
            self.deletable(repository)
        }
    }

    /// Syncing is delegated to the product.
    #[must_use]
    pub fn syncable(&self, repository: &Repository) -> bool {
        self.permissions.syncable(repository.product_id)
    }

    /// Viewing is delegated to the product.
    #[must_use]
    pub fn readable(&self, repository: &Repository) -> bool {
        self.permissions.readable(repository.product_id)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::model::RepositoryId;

    #[derive(Default)]
    struct Grants {
        edit: HashSet<ProductId>,
        sync: HashSet<ProductId>,
        view: HashSet<ProductId>,
    }

    impl ProductPermissions for Grants {
        fn editable(&self, product: ProductId) -> bool {
            self.edit.contains(&product)
        }

        fn syncable(&self, product: ProductId) -> bool {
            self.sync.contains(&product)
        }

        fn readable(&self, product: ProductId) -> bool {
            self.view.contains(&product)
        }
    }

    fn repository(product: u64, promoted: bool, redhat: bool) -> Repository {
        Repository {
            id: RepositoryId(1),
            name: "zoo".into(),
            product_id: ProductId(product),
            environment: "Library".into(),
            promoted,
            redhat,
        }
    }

    #[test]
    fn promoted_repositories_cannot_be_deleted() {
        let mut grants = Grants::default();
        grants.edit.insert(ProductId(1));
        let auth = RepositoryAuthorization::new(&grants);

        assert!(auth.deletable(&repository(1, false, false)));
        assert!(!auth.deletable(&repository(1, true, false)));
        assert!(auth.redhat_deletable(&repository(1, false, true)));
        assert!(!auth.can_delete(&repository(1, true, true)));
    }

    #[test]
    fn checks_delegate_to_the_owning_product() {
        let mut grants = Grants::default();
        grants.sync.insert(ProductId(1));
        grants.view.insert(ProductId(2));
        let auth = RepositoryAuthorization::new(&grants);

        assert!(!auth.editable(&repository(1, false, false)));
        assert!(!auth.can_delete(&repository(1, false, false)));
        assert!(auth.syncable(&repository(1, false, false)));
        assert!(!auth.syncable(&repository(2, false, false)));
        assert!(auth.readable(&repository(2, false, false)));
        assert!(!auth.readable(&repository(1, false, false)));
    }
}
