//! Operator VIP adjustments against in-memory repositories

mod common;

use chrono::Duration;

use common::Harness;
use dramapass_billing_core::{BillingError, MAX_ADJUST_DAYS};
use dramapass_types::SubscriberId;

#[tokio::test]
async fn test_grant_then_revoke() {
    let h = Harness::new();
    h.seed_subscriber(1, "aaaa0001");

    let granted = h.billing.admin.adjust_vip(SubscriberId(1), 7).await.unwrap();
    assert!(granted.is_vip);
    assert_eq!(granted.expire_time, Some(h.now() + Duration::days(7)));
    assert_eq!(
        granted.expire_display.as_deref(),
        Some("16 March 2025 - 12:00 WIB")
    );

    let shortened = h.billing.admin.adjust_vip(SubscriberId(1), -3).await.unwrap();
    assert_eq!(shortened.expire_time, Some(h.now() + Duration::days(4)));

    let revoked = h.billing.admin.adjust_vip(SubscriberId(1), -4).await.unwrap();
    assert!(!revoked.is_vip);
    assert_eq!(revoked.expire_time, None);
    assert_eq!(revoked.expire_display, None);

    let stored = h.subscriber(1);
    assert!(!stored.is_vip);
    assert_eq!(stored.expire_time, None);
}

#[tokio::test]
async fn test_grant_compounds_onto_paid_window() {
    let h = Harness::new();
    h.seed_subscriber(1, "aaaa0001");
    let now = h.now();
    h.update_subscriber(1, |s| {
        s.is_vip = true;
        s.expire_time = Some(now + Duration::days(2));
    });

    let adjusted = h.billing.admin.adjust_vip(SubscriberId(1), 30).await.unwrap();

    assert_eq!(adjusted.expire_time, Some(now + Duration::days(32)));
}

#[tokio::test]
async fn test_rejects_bad_input() {
    let h = Harness::new();
    h.seed_subscriber(1, "aaaa0001");

    for days in [0, MAX_ADJUST_DAYS + 1, -MAX_ADJUST_DAYS - 1] {
        let err = h.billing.admin.adjust_vip(SubscriberId(1), days).await.unwrap_err();
        assert!(err.is_validation(), "{days}: {err}");
    }

    let err = h.billing.admin.adjust_vip(SubscriberId(99), 3).await.unwrap_err();
    assert!(matches!(err, BillingError::SubscriberNotFound(SubscriberId(99))));
}
