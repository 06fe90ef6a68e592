//! Ephemeral interaction state
//!
//! Short-lived, per-subscriber UI state kept apart from the durable store.
//! Losing it (restart, idle expiry) only costs the subscriber a retap.

use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;

use dramapass_types::{ContentSlug, Package, SubscriberId, TransactionId};

/// Checkout awaiting payment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActiveCheckout {
    pub transaction_id: TransactionId,
    pub package: Package,
    /// Amount requested from the gateway
    pub amount: u64,
}

/// Session store backed by idle-expiring caches
#[derive(Clone)]
pub struct SessionStore {
    checkouts: Cache<SubscriberId, ActiveCheckout>,
    last_delivered: Cache<SubscriberId, ContentSlug>,
}

impl SessionStore {
    /// Store whose entries expire after `idle` without access
    pub fn new(idle: Duration) -> Self {
        Self {
            checkouts: Cache::builder()
                .time_to_idle(idle)
                .max_capacity(100_000)
                .build(),
            last_delivered: Cache::builder()
                .time_to_idle(idle)
                .max_capacity(100_000)
                .build(),
        }
    }

    /// Remember the subscriber's outstanding checkout, replacing any earlier one
    pub async fn set_active_checkout(&self, subscriber: SubscriberId, checkout: ActiveCheckout) {
        self.checkouts.insert(subscriber, checkout).await;
    }

    /// Outstanding checkout, if any
    pub async fn active_checkout(&self, subscriber: SubscriberId) -> Option<ActiveCheckout> {
        self.checkouts.get(&subscriber).await
    }

    /// Remove and return the outstanding checkout
    pub async fn take_active_checkout(&self, subscriber: SubscriberId) -> Option<ActiveCheckout> {
        self.checkouts.remove(&subscriber).await
    }

    /// Forget the checkout if it is still the one for `transaction_id`
    pub async fn clear_checkout_for(&self, subscriber: SubscriberId, transaction_id: &TransactionId) {
        if self
            .checkouts
            .get(&subscriber)
            .await
            .is_some_and(|c| &c.transaction_id == transaction_id)
        {
            self.checkouts.invalidate(&subscriber).await;
        }
    }

    /// Record the content part last sent to the subscriber
    pub async fn set_last_delivered(&self, subscriber: SubscriberId, slug: ContentSlug) {
        self.last_delivered.insert(subscriber, slug).await;
    }

    /// Content part last sent to the subscriber
    pub async fn last_delivered(&self, subscriber: SubscriberId) -> Option<ContentSlug> {
        self.last_delivered.get(&subscriber).await
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkout(id: &str) -> ActiveCheckout {
        ActiveCheckout {
            transaction_id: TransactionId(id.into()),
            package: Package::SevenDays,
            amount: 9_000,
        }
    }

    #[tokio::test]
    async fn test_take_removes_checkout() {
        let store = SessionStore::default();
        let subscriber = SubscriberId(1);
        store.set_active_checkout(subscriber, checkout("INV1")).await;

        assert_eq!(store.take_active_checkout(subscriber).await, Some(checkout("INV1")));
        assert_eq!(store.take_active_checkout(subscriber).await, None);
    }

    #[tokio::test]
    async fn test_clear_only_matching_checkout() {
        let store = SessionStore::default();
        let subscriber = SubscriberId(2);
        store.set_active_checkout(subscriber, checkout("INV2")).await;

        store
            .clear_checkout_for(subscriber, &TransactionId("INV1".into()))
            .await;
        assert!(store.active_checkout(subscriber).await.is_some());

        store
            .clear_checkout_for(subscriber, &TransactionId("INV2".into()))
            .await;
        assert!(store.active_checkout(subscriber).await.is_none());
    }

    #[tokio::test]
    async fn test_last_delivered_per_subscriber() {
        let store = SessionStore::default();
        let slug = ContentSlug::new("love_in_seoul", 2);
        store.set_last_delivered(SubscriberId(3), slug.clone()).await;

        assert_eq!(store.last_delivered(SubscriberId(3)).await, Some(slug));
        assert_eq!(store.last_delivered(SubscriberId(4)).await, None);
    }
}
