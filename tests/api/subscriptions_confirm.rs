use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::TestApp;
use fan_site::domain::subscription_status::SubscriptionStatus;

async fn subscribe_and_get_confirmation_link(test_app: &TestApp, email: &str) -> reqwest::Url {
    Mock::given(path("/mail/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&test_app.email_server)
        .await;

    test_app.post_subscription(json!({ "email": email })).await;

    // Get the first request that was sent to the email server
    let received_requests = &test_app.email_server.received_requests().await.unwrap();

    test_app.get_email_link(&received_requests[0]).html
}

#[tokio::test]
async fn confirmations_without_token_are_rejected_with_400() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app.get("/subscriptions/confirm").await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn confirmations_with_an_unknown_token_are_rejected_with_404() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .get("/subscriptions/confirm?token=doesnotexist")
        .await;

    assert_eq!(response.status(), 404);

    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn subscriptions_change_to_active_after_clicking_the_confirmation_link() {
    let test_app = TestApp::spawn_app().await;
    let confirmation_link = subscribe_and_get_confirmation_link(&test_app, "fan@test.com").await;

    let response = test_app
        .api_client
        .get(confirmation_link)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["data"]["status"], "active");

    let subscription = test_app.find_subscription("fan@test.com").await;

    assert_eq!(subscription.status, SubscriptionStatus::Active);
    assert!(subscription.confirmed_at.is_some());
}

#[tokio::test]
async fn confirming_twice_is_idempotent() {
    let test_app = TestApp::spawn_app().await;
    let confirmation_link = subscribe_and_get_confirmation_link(&test_app, "fan@test.com").await;

    for _ in 0..2 {
        let response = test_app
            .api_client
            .get(confirmation_link.clone())
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
    }

    // one confirmation email and a single welcome email
    let received_requests = test_app.email_server.received_requests().await.unwrap();

    assert_eq!(received_requests.len(), 2);
}

#[tokio::test]
async fn unsubscribe_link_moves_the_subscription_to_unsubscribed() {
    let test_app = TestApp::spawn_app().await;
    let confirmation_link = subscribe_and_get_confirmation_link(&test_app, "fan@test.com").await;
    let token = confirmation_link
        .query_pairs()
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
        .unwrap();

    let response = test_app
        .get(&format!("/subscriptions/unsubscribe?token={}", token))
        .await;

    assert_eq!(response.status(), 200);

    let subscription = test_app.find_subscription("fan@test.com").await;

    assert_eq!(subscription.status, SubscriptionStatus::Unsubscribed);
    assert!(subscription.unsubscribed_at.is_some());
}

#[tokio::test]
async fn blocked_subscriptions_cannot_be_confirmed() {
    let test_app = TestApp::spawn_app().await;
    let confirmation_link = subscribe_and_get_confirmation_link(&test_app, "fan@test.com").await;
    let subscription = test_app.find_subscription("fan@test.com").await;

    test_app
        .store
        .update_status(subscription.id, SubscriptionStatus::Blocked)
        .await
        .unwrap();

    let response = test_app
        .api_client
        .get(confirmation_link)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 409);

    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");
}
