use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::TestApp;
use fan_site::domain::subscription_status::SubscriptionStatus;

async fn mount_email_provider(test_app: &TestApp) {
    Mock::given(path("/mail/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&test_app.email_server)
        .await;
}

#[tokio::test]
async fn subscribe_returns_201_for_valid_data() {
    let test_app = TestApp::spawn_app().await;

    mount_email_provider(&test_app).await;

    let response = test_app
        .post_subscription(json!({ "email": "fan@test.com", "source": "landing", "tags": ["launch"] }))
        .await;

    assert_eq!(response.status().as_u16(), 201);

    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "fan@test.com");
    assert_eq!(body["data"]["status"], "pending");
    assert_eq!(body["data"]["source"], "landing");
}

#[tokio::test]
async fn subscribe_persists_a_pending_subscription() {
    let test_app = TestApp::spawn_app().await;

    mount_email_provider(&test_app).await;

    test_app
        .post_subscription(json!({ "email": "  Fan@Test.com ", "metadata": { "campaign": "spring" } }))
        .await;

    let subscription = test_app.find_subscription("fan@test.com").await;

    assert_eq!(subscription.email.as_ref(), "fan@test.com");
    assert_eq!(subscription.status, SubscriptionStatus::Pending);
    assert_eq!(subscription.source.as_ref(), "website");
    assert_eq!(subscription.metadata["campaign"], "spring");
    assert!(subscription.confirmed_at.is_none());
}

#[tokio::test]
async fn subscribe_sends_a_confirmation_email_with_a_link() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/mail/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&test_app.email_server)
        .await;

    test_app
        .post_subscription(json!({ "email": "fan@test.com" }))
        .await;

    let received_requests = &test_app.email_server.received_requests().await.unwrap();
    let links = test_app.get_email_link(&received_requests[0]);

    assert_eq!(links.html.path(), "/subscriptions/confirm");
}

#[tokio::test]
async fn subscribe_returns_400_when_data_is_missing() {
    let test_app = TestApp::spawn_app().await;

    let test_cases = vec![
        (json!({}), "missing the email"),
        (json!({ "source": "landing" }), "missing the email with a source"),
        (json!("fan@test.com"), "not an object"),
    ];

    for (invalid_body, error_message) in test_cases {
        let response = test_app.post_subscription(invalid_body).await;

        assert_eq!(
            response.status().as_u16(),
            400,
            // Additional customised error message on test failure
            "The API did not fail with 400 Bad Request when the payload was {}.",
            error_message
        );

        let body: serde_json::Value = response.json().await.unwrap();

        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }
}

#[tokio::test]
async fn subscribe_returns_400_when_fields_are_present_but_invalid() {
    let test_app = TestApp::spawn_app().await;

    let test_cases = vec![
        (json!({ "email": "" }), "empty email"),
        (json!({ "email": "definitely-not-an-email" }), "invalid email"),
        (json!({ "email": "fan@test.com", "source": "bad source!" }), "invalid source"),
        (json!({ "email": "fan@test.com", "tags": ["no spaces"] }), "invalid tag"),
        (json!({ "email": "fan@test.com", "metadata": [1, 2] }), "metadata not an object"),
    ];

    for (body, description) in test_cases {
        let response = test_app.post_subscription(body).await;

        assert_eq!(
            response.status().as_u16(),
            400,
            "The API did not return a 400 Bad Request when the payload was {}.",
            description
        );
    }
}

#[tokio::test]
async fn subscribe_returns_409_for_an_existing_subscription() {
    let test_app = TestApp::spawn_app().await;

    mount_email_provider(&test_app).await;

    let first = test_app
        .post_subscription(json!({ "email": "fan@test.com" }))
        .await;
    let second = test_app
        .post_subscription(json!({ "email": "FAN@test.com" }))
        .await;

    assert_eq!(first.status().as_u16(), 201);
    assert_eq!(second.status().as_u16(), 409);

    let body: serde_json::Value = second.json().await.unwrap();

    assert_eq!(body["error"]["code"], "DUPLICATE_EMAIL");
}

#[tokio::test]
async fn subscribe_succeeds_even_if_the_confirmation_email_fails() {
    let test_app = TestApp::spawn_app().await;

    Mock::given(path("/mail/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_subscription(json!({ "email": "fan@test.com" }))
        .await;

    assert_eq!(response.status().as_u16(), 201);

    let subscription = test_app.find_subscription("fan@test.com").await;

    assert_eq!(subscription.status, SubscriptionStatus::Pending);
}

#[tokio::test]
async fn subscribe_is_rate_limited_per_client() {
    let test_app = TestApp::spawn_app_with(|config| config.rate_limit.max_requests = 2).await;

    mount_email_provider(&test_app).await;

    for index in 0..2 {
        let response = test_app
            .post_subscription(json!({ "email": format!("fan{}@test.com", index) }))
            .await;

        assert_eq!(response.status().as_u16(), 201);
    }

    let response = test_app
        .post_subscription(json!({ "email": "fan3@test.com" }))
        .await;

    assert_eq!(response.status().as_u16(), 429);
    assert!(response.headers().get("Retry-After").is_some());

    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["error"]["code"], "RATE_LIMITED");
    assert!(body["error"]["retry_after"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn unsubscribed_emails_can_subscribe_again() {
    let test_app = TestApp::spawn_app().await;

    mount_email_provider(&test_app).await;

    test_app
        .post_subscription(json!({ "email": "fan@test.com" }))
        .await;

    let subscription = test_app.find_subscription("fan@test.com").await;

    test_app
        .store
        .update_status(subscription.id, SubscriptionStatus::Unsubscribed)
        .await
        .unwrap();

    let response = test_app
        .post_subscription(json!({ "email": "fan@test.com", "source": "comeback" }))
        .await;

    assert_eq!(response.status().as_u16(), 201);

    let resubscribed = test_app.find_subscription("fan@test.com").await;

    assert_eq!(resubscribed.id, subscription.id);
    assert_eq!(resubscribed.status, SubscriptionStatus::Pending);
    assert_eq!(resubscribed.source.as_ref(), "comeback");
    assert_ne!(resubscribed.token, subscription.token);
}
