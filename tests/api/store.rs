use chrono::{Duration, Utc};
use claim::{assert_matches, assert_none, assert_ok, assert_some};
use serde_json::json;

use crate::helpers::spawn_store;
use fan_site::domain::new_subscription::{NewSubscription, NewSubscriptionBody};
use fan_site::domain::subscriber_email::SubscriberEmail;
use fan_site::domain::subscription_status::SubscriptionStatus;
use fan_site::store::StoreError;

fn new_subscription(email: &str, source: Option<&str>) -> NewSubscription {
    NewSubscriptionBody {
        email: email.to_string(),
        source: source.map(String::from),
        tags: Some(vec![String::from("launch"), String::from("beta")]),
        metadata: Some(json!({ "campaign": "spring", "visits": 3 })),
    }
    .try_into()
    .unwrap()
}

#[tokio::test]
async fn inserted_subscriptions_keep_tags_and_metadata() {
    let store = spawn_store().await;

    let inserted = store
        .insert(&new_subscription("fan@test.com", Some("landing")), "token-1")
        .await
        .unwrap();
    let email = SubscriberEmail::parse(String::from("fan@test.com")).unwrap();
    let found = store.find_by_email(&email).await.unwrap().unwrap();

    assert_eq!(found.id, inserted.id);
    assert_eq!(found.status, SubscriptionStatus::Pending);
    assert_eq!(found.source.as_ref(), "landing");
    assert_eq!(
        found
            .tags
            .iter()
            .map(|tag| tag.as_ref())
            .collect::<Vec<_>>(),
        vec!["launch", "beta"]
    );
    assert_eq!(found.metadata, json!({ "campaign": "spring", "visits": 3 }));
    assert_some!(store.find_by_token("token-1").await.unwrap());
    assert_none!(store.find_by_token("unknown").await.unwrap());
}

#[tokio::test]
async fn inserting_a_known_email_is_a_duplicate() {
    let store = spawn_store().await;

    store
        .insert(&new_subscription("fan@test.com", None), "token-1")
        .await
        .unwrap();

    let result = store
        .insert(&new_subscription("fan@test.com", None), "token-2")
        .await;

    assert_matches!(result, Err(StoreError::Duplicate));
}

#[tokio::test]
async fn status_updates_maintain_lifecycle_timestamps() {
    let store = spawn_store().await;
    let subscription = store
        .insert(&new_subscription("fan@test.com", None), "token-1")
        .await
        .unwrap();

    let active = store
        .update_status(subscription.id, SubscriptionStatus::Active)
        .await
        .unwrap();

    assert_eq!(active.status, SubscriptionStatus::Active);
    assert_some!(active.confirmed_at);
    assert!(active.updated_at >= subscription.updated_at);

    let unsubscribed = store
        .update_status(subscription.id, SubscriptionStatus::Unsubscribed)
        .await
        .unwrap();

    assert_some!(unsubscribed.unsubscribed_at);
}

#[tokio::test]
async fn disallowed_transitions_are_rejected() {
    let store = spawn_store().await;
    let subscription = store
        .insert(&new_subscription("fan@test.com", None), "token-1")
        .await
        .unwrap();

    store
        .update_status(subscription.id, SubscriptionStatus::Blocked)
        .await
        .unwrap();

    let result = store
        .update_status(subscription.id, SubscriptionStatus::Active)
        .await;

    assert_matches!(
        result,
        Err(StoreError::InvalidTransition {
            from: SubscriptionStatus::Blocked,
            to: SubscriptionStatus::Active
        })
    );
}

#[tokio::test]
async fn updating_an_unknown_id_is_not_found() {
    let store = spawn_store().await;

    let result = store
        .update_status(uuid::Uuid::new_v4(), SubscriptionStatus::Active)
        .await;

    assert_matches!(result, Err(StoreError::NotFound));
}

#[tokio::test]
async fn resubscribe_resets_an_unsubscribed_record() {
    let store = spawn_store().await;
    let subscription = store
        .insert(&new_subscription("fan@test.com", None), "token-1")
        .await
        .unwrap();

    store
        .update_status(subscription.id, SubscriptionStatus::Unsubscribed)
        .await
        .unwrap();

    let resubscribed = store
        .resubscribe(
            subscription.id,
            &new_subscription("fan@test.com", Some("comeback")),
            "token-2",
        )
        .await
        .unwrap();

    assert_eq!(resubscribed.status, SubscriptionStatus::Pending);
    assert_eq!(resubscribed.source.as_ref(), "comeback");
    assert_eq!(resubscribed.token, "token-2");
    assert_none!(resubscribed.unsubscribed_at);

    // the second of two racing resubscribes finds the record already pending
    let result = store
        .resubscribe(
            subscription.id,
            &new_subscription("fan@test.com", None),
            "token-3",
        )
        .await;

    assert_matches!(result, Err(StoreError::InvalidTransition { .. }));
}

#[tokio::test]
async fn stats_group_by_status_and_source() {
    let store = spawn_store().await;

    for (email, source) in [
        ("first@test.com", Some("landing")),
        ("second@test.com", Some("landing")),
        ("third@test.com", None),
    ] {
        store
            .insert(&new_subscription(email, source), email)
            .await
            .unwrap();
    }

    let third = store.find_by_token("third@test.com").await.unwrap().unwrap();

    store
        .update_status(third.id, SubscriptionStatus::Bounced)
        .await
        .unwrap();

    let stats = store.stats(Utc::now()).await.unwrap();

    assert_eq!(stats.total, 3);
    assert_eq!(stats.pending, 2);
    assert_eq!(stats.bounced, 1);
    assert_eq!(stats.by_source.get("landing"), Some(&2));
    assert_eq!(stats.by_source.get("website"), Some(&1));
    assert_eq!(stats.last_24_hours, 3);

    let tomorrow = store.stats(Utc::now() + Duration::hours(25)).await.unwrap();

    assert_eq!(tomorrow.total, 3);
    assert_eq!(tomorrow.last_24_hours, 0);
}

#[tokio::test]
async fn list_by_status_only_returns_matching_records() {
    let store = spawn_store().await;
    let first = store
        .insert(&new_subscription("first@test.com", None), "token-1")
        .await
        .unwrap();

    store
        .insert(&new_subscription("second@test.com", None), "token-2")
        .await
        .unwrap();
    store
        .update_status(first.id, SubscriptionStatus::Active)
        .await
        .unwrap();

    let active = store
        .list_by_status(SubscriptionStatus::Active)
        .await
        .unwrap();

    assert_eq!(active.len(), 1);
    assert_eq!(active[0].email.as_ref(), "first@test.com");
    assert_ok!(store.ping().await);
}
