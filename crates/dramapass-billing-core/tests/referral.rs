//! Referral redemption tests

mod common;

use common::Harness;
use dramapass_billing_core::BillingError;
use dramapass_types::{ReferralCode, SubscriberId};

#[tokio::test]
async fn test_redeem_links_referrer() {
    let h = Harness::new();
    h.seed_subscriber(1, "ref00001");
    h.seed_subscriber(2, "new00002");

    let code = h
        .billing
        .referrals
        .redeem(SubscriberId(2), "  REF00001 ")
        .await
        .unwrap();

    assert_eq!(code.as_str(), "ref00001");
    assert_eq!(h.subscriber(2).referred_by, Some(code));
}

#[tokio::test]
async fn test_empty_code_rejected() {
    let h = Harness::new();
    h.seed_subscriber(2, "new00002");

    let err = h.billing.referrals.redeem(SubscriberId(2), "   ").await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_unknown_redeemer() {
    let h = Harness::new();
    h.seed_subscriber(1, "ref00001");

    let err = h
        .billing
        .referrals
        .redeem(SubscriberId(9), "ref00001")
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::SubscriberNotFound(SubscriberId(9))));
}

#[tokio::test]
async fn test_code_can_only_be_set_once() {
    let h = Harness::new();
    h.seed_subscriber(1, "ref00001");
    h.seed_subscriber(3, "ref00003");
    h.seed_subscriber(2, "new00002");

    h.billing
        .referrals
        .redeem(SubscriberId(2), "ref00001")
        .await
        .unwrap();
    let err = h
        .billing
        .referrals
        .redeem(SubscriberId(2), "ref00003")
        .await
        .unwrap_err();

    assert!(
        matches!(err, BillingError::ReferralAlreadySet(ref code) if code == &ReferralCode("ref00001".into()))
    );
}

#[tokio::test]
async fn test_unknown_code() {
    let h = Harness::new();
    h.seed_subscriber(2, "new00002");

    let err = h
        .billing
        .referrals
        .redeem(SubscriberId(2), "nobody99")
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::ReferralCodeNotFound(_)));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_self_referral_rejected() {
    let h = Harness::new();
    h.seed_subscriber(2, "new00002");

    let err = h
        .billing
        .referrals
        .redeem(SubscriberId(2), "new00002")
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::SelfReferral));
    assert_eq!(h.subscriber(2).referred_by, None);
}

#[tokio::test]
async fn test_concurrent_redemptions_keep_first_code() {
    let h = Harness::new();
    h.seed_subscriber(1, "ref00001");
    h.seed_subscriber(3, "ref00003");
    h.seed_subscriber(2, "new00002");

    let referrals = h.billing.referrals.clone();
    let (a, b) = tokio::join!(
        referrals.redeem(SubscriberId(2), "ref00001"),
        referrals.redeem(SubscriberId(2), "ref00003")
    );

    assert_eq!([&a, &b].iter().filter(|r| r.is_ok()).count(), 1);
    let stored = h.subscriber(2).referred_by.unwrap();
    let winner = a.or(b).unwrap();
    assert_eq!(stored, winner);
}
