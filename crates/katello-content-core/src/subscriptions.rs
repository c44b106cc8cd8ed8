//! Subscription allocation helpers.
//!
//! Subscriptions sharing a product are grouped; a closed group surfaces only its
//! first member. Quantity edits are collected per pool id and sent upstream as
//! [`PoolQuantity`] updates.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Upstream availability value meaning "no limit".
pub const UNLIMITED: i64 = -1;

/// Subscription pool attached to an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Pool identifier.
    pub id: String,
    /// Product the pool grants.
    pub product_id: String,
    /// Display name.
    pub name: String,
    /// Entitlements currently allocated to the organization.
    pub quantity: i64,
}

/// Subscriptions that share a product.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubscriptionGroup {
    /// Whether every member is listed, or only the first.
    pub open: bool,
    /// Members, most recently seen first.
    pub subscriptions: Vec<Subscription>,
}

/// Groups keyed by product id, in first-seen order.
pub type GroupedSubscriptions = Vec<(String, SubscriptionGroup)>;

/// Subscription enriched with upstream availability and pending edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRow {
    /// Subscription, with `quantity` replaced by any pending edit.
    #[serde(flatten)]
    pub subscription: Subscription,
    /// Entitlements still available upstream, when known.
    pub upstream_available: Option<i64>,
    /// Whether upstream availability has been fetched at all.
    pub upstream_available_loaded: bool,
    /// Largest quantity the organization may allocate.
    pub max_quantity: Option<i64>,
    /// Whether `quantity` carries a pending edit.
    pub entitlements_changed: bool,
}

/// Quantity update sent upstream for a pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolQuantity {
    /// Pool identifier.
    pub id: String,
    /// Requested quantity.
    pub quantity: i64,
}

/// Largest quantity that may be allocated given what remains upstream.
#[must_use]
pub const fn max_quantity(subscription: &Subscription, upstream_available: i64) -> i64 {
    if upstream_available == UNLIMITED {
        return UNLIMITED;
    }
    upstream_available + subscription.quantity
}

/// Group subscriptions by product; every group starts closed.
#[must_use]
pub fn group_by_product(subscriptions: &[Subscription]) -> GroupedSubscriptions {
    let mut grouped: GroupedSubscriptions = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for subscription in subscriptions {
        let slot = *index
            .entry(subscription.product_id.as_str())
            .or_insert_with(|| {
                grouped.push((
                    subscription.product_id.clone(),
                    SubscriptionGroup::default(),
                ));
                grouped.len() - 1
            });
        grouped[slot].1.subscriptions.insert(0, subscription.clone());
    }

    grouped
}

/// Build the visible rows for every group.
///
/// `available` is `None` until upstream availability has been fetched. A zero
/// entry in `updated` counts as "no edit".
#[must_use]
pub fn build_rows(
    groups: &GroupedSubscriptions,
    available: Option<&HashMap<String, i64>>,
    updated: &BTreeMap<String, i64>,
) -> Vec<SubscriptionRow> {
    groups
        .iter()
        .flat_map(|(_, group)| {
            let visible = if group.open {
                group.subscriptions.as_slice()
            } else {
                group.subscriptions.get(..1).unwrap_or_default()
            };
            visible
                .iter()
                .map(move |subscription| build_row(subscription, available, updated))
        })
        .collect()
}

fn build_row(
    subscription: &Subscription,
    available: Option<&HashMap<String, i64>>,
    updated: &BTreeMap<String, i64>,
) -> SubscriptionRow {
    let upstream_available =
        available.and_then(|quantities| quantities.get(&subscription.id).copied());
    let max = upstream_available.map(|upstream| max_quantity(subscription, upstream));

    let mut row = SubscriptionRow {
        subscription: subscription.clone(),
        upstream_available,
        upstream_available_loaded: available.is_some(),
        max_quantity: max,
        entitlements_changed: false,
    };

    if let Some(quantity) = updated
        .get(&subscription.id)
        .copied()
        .filter(|quantity| *quantity != 0)
    {
        row.subscription.quantity = quantity;
        row.entitlements_changed = true;
    }
    row
}

/// Turn pending edits into upstream pool updates.
#[must_use]
pub fn build_pools(updated: &BTreeMap<String, i64>) -> Vec<PoolQuantity> {
    updated
        .iter()
        .map(|(id, quantity)| PoolQuantity {
            id: id.clone(),
            quantity: *quantity,
        })
        .collect()
}
