//! Access evaluator tests against in-memory repositories

mod common;

use chrono::Duration;
use futures::future::join_all;

use common::Harness;
use dramapass_billing_core::AccessOutcome;
use dramapass_types::{AccessDenial, ContentSlug, SubscriberId, SubscriberProfile};

fn profile() -> SubscriberProfile {
    SubscriberProfile {
        display_name: "Siti".into(),
        username: Some("siti".into()),
    }
}

async fn request(h: &Harness, id: i64, slug: &ContentSlug) -> AccessOutcome {
    h.billing
        .access
        .evaluate(SubscriberId(id), profile(), slug)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_first_contact_creates_subscriber_and_consumes_view() {
    let h = Harness::new();
    let slug = h.seed_content("love_in_seoul", 1, 3, false).await;

    let outcome = request(&h, 5, &slug).await;

    let AccessOutcome::Granted(access) = outcome else {
        panic!("expected Granted, got {outcome:?}");
    };
    assert_eq!(access.daily_limit, 9);
    assert!(!access.vip);

    let subscriber = h.subscriber(5);
    assert_eq!(subscriber.display_name, "Siti");
    assert_eq!(subscriber.daily_limit, 9);
    assert_eq!(subscriber.referral_code.as_str().len(), 8);
    assert!(!subscriber.is_vip);
}

#[tokio::test]
async fn test_quota_exhausts_after_ten_views() {
    let h = Harness::new();
    h.seed_subscriber(1, "aaaa0001");
    let slug = h.seed_content("love_in_seoul", 1, 3, false).await;

    for remaining in (0..10).rev() {
        let AccessOutcome::Granted(access) = request(&h, 1, &slug).await else {
            panic!("view should be granted");
        };
        assert_eq!(access.daily_limit, remaining);
    }

    assert_eq!(
        request(&h, 1, &slug).await,
        AccessOutcome::Denied(AccessDenial::QuotaExhausted)
    );
    assert_eq!(h.subscriber(1).daily_limit, 0);
}

#[tokio::test]
async fn test_concurrent_requests_never_overdraw_quota() {
    let h = Harness::new();
    h.seed_subscriber(1, "aaaa0001");
    let slug = h.seed_content("love_in_seoul", 1, 3, false).await;

    let tasks = (0..30).map(|_| {
        let access = h.billing.access.clone();
        let slug = slug.clone();
        tokio::spawn(async move { access.evaluate(SubscriberId(1), profile(), &slug).await })
    });
    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    let granted = outcomes
        .iter()
        .filter(|o| matches!(o, AccessOutcome::Granted(_)))
        .count();
    assert_eq!(granted, 10);
    assert_eq!(h.subscriber(1).daily_limit, 0);
}

#[tokio::test]
async fn test_new_business_day_resets_quota_first() {
    let h = Harness::new();
    h.seed_subscriber(1, "aaaa0001");
    let yesterday = h.config.calendar.business_day(h.now()) - Duration::days(1);
    h.update_subscriber(1, |s| {
        s.daily_limit = 0;
        s.last_access_day = yesterday;
    });
    let slug = h.seed_content("love_in_seoul", 1, 3, false).await;

    let AccessOutcome::Granted(access) = request(&h, 1, &slug).await else {
        panic!("quota should have been reset");
    };
    assert_eq!(access.daily_limit, 9);
}

#[tokio::test]
async fn test_reset_follows_business_midnight() {
    let h = Harness::new();
    h.seed_subscriber(1, "aaaa0001");
    let slug = h.seed_content("love_in_seoul", 1, 3, false).await;
    h.update_subscriber(1, |s| s.daily_limit = 0);

    // 12:00 -> 23:59 WIB, same business day
    h.clock.advance(Duration::hours(11) + Duration::minutes(59));
    assert_eq!(
        request(&h, 1, &slug).await,
        AccessOutcome::Denied(AccessDenial::QuotaExhausted)
    );

    // 00:01 WIB next day, still the same UTC date
    h.clock.advance(Duration::minutes(2));
    assert!(matches!(request(&h, 1, &slug).await, AccessOutcome::Granted(_)));
}

#[tokio::test]
async fn test_vip_only_content_refused_without_consuming_quota() {
    let h = Harness::new();
    h.seed_subscriber(1, "aaaa0001");
    let slug = h.seed_content("love_in_seoul", 5, 10, true).await;

    assert_eq!(
        request(&h, 1, &slug).await,
        AccessOutcome::Denied(AccessDenial::VipRequired)
    );
    assert_eq!(h.subscriber(1).daily_limit, 10);
}

#[tokio::test]
async fn test_vip_bypasses_quota() {
    let h = Harness::new();
    h.seed_subscriber(1, "aaaa0001");
    let now = h.now();
    h.update_subscriber(1, |s| {
        s.daily_limit = 0;
        s.is_vip = true;
        s.expire_time = Some(now + Duration::days(1));
    });
    let slug = h.seed_content("love_in_seoul", 5, 10, true).await;

    let AccessOutcome::Granted(access) = request(&h, 1, &slug).await else {
        panic!("VIP should be granted");
    };
    assert!(access.vip);
    assert_eq!(h.subscriber(1).daily_limit, 0);
}

#[tokio::test]
async fn test_lapsed_vip_is_swept_before_gating() {
    let h = Harness::new();
    h.seed_subscriber(1, "aaaa0001");
    let now = h.now();
    h.update_subscriber(1, |s| {
        s.is_vip = true;
        s.expire_time = Some(now - Duration::minutes(1));
    });
    let slug = h.seed_content("love_in_seoul", 5, 10, true).await;

    assert_eq!(
        request(&h, 1, &slug).await,
        AccessOutcome::Denied(AccessDenial::VipRequired)
    );
    let subscriber = h.subscriber(1);
    assert!(!subscriber.is_vip);
    assert_eq!(subscriber.expire_time, None);
}

#[tokio::test]
async fn test_unknown_content_is_not_found() {
    let h = Harness::new();
    let err = h
        .billing
        .access
        .evaluate(
            SubscriberId(1),
            profile(),
            &ContentSlug::new("missing_series", 1),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_pagination_hints() {
    let h = Harness::new();
    h.seed_subscriber(1, "aaaa0001");
    let slug = h.seed_content("love_in_seoul", 3, 3, false).await;

    let AccessOutcome::Granted(access) = request(&h, 1, &slug).await else {
        panic!("view should be granted");
    };
    assert_eq!(
        access.pagination.previous,
        Some(ContentSlug::new("love_in_seoul", 2))
    );
    assert_eq!(access.pagination.next, None);
}

#[tokio::test]
async fn test_status_reports_window_and_last_watched() {
    let h = Harness::new();
    h.seed_subscriber(1, "aaaa0001");
    let now = h.now();
    h.update_subscriber(1, |s| {
        s.is_vip = true;
        s.expire_time = Some(now + Duration::hours(30));
    });
    let slug = h.seed_content("love_in_seoul", 2, 3, false).await;
    request(&h, 1, &slug).await;

    let status = h
        .billing
        .access
        .status(SubscriberId(1), SubscriberProfile::default())
        .await
        .unwrap();

    assert!(status.vip_active);
    assert_eq!(status.remaining_vip_hours, 30);
    assert_eq!(
        status.expires_at_display.as_deref(),
        Some("10 March 2025 - 18:00 WIB")
    );
    assert_eq!(status.daily_limit, 10);
    assert_eq!(status.daily_max, 10);
    assert_eq!(status.last_watched, Some(slug));
}
