use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::TestApp;
use fan_site::domain::subscription_status::SubscriptionStatus;

async fn subscribe(test_app: &TestApp, email: &str) {
    Mock::given(path("/mail/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&test_app.email_server)
        .await;

    test_app
        .post_subscription(json!({ "email": email }))
        .await
        .error_for_status()
        .unwrap();
}

#[tokio::test]
async fn bounces_and_spam_reports_update_the_subscription() {
    let test_app = TestApp::spawn_app().await;

    subscribe(&test_app, "bounced@test.com").await;
    subscribe(&test_app, "annoyed@test.com").await;

    let response = test_app
        .post_email_events(json!([
            { "email": "bounced@test.com", "event": "bounce" },
            { "email": "annoyed@test.com", "event": "spamreport" },
            { "email": "annoyed@test.com", "event": "open" },
            { "email": "stranger@test.com", "event": "bounce" },
            { "email": "not an email", "event": "bounce" }
        ]))
        .await;

    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["processed"], 2);
    assert_eq!(
        test_app.find_subscription("bounced@test.com").await.status,
        SubscriptionStatus::Bounced
    );
    assert_eq!(
        test_app.find_subscription("annoyed@test.com").await.status,
        SubscriptionStatus::Blocked
    );
}

#[tokio::test]
async fn email_events_require_the_admin_api_key() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .api_client
        .post(&format!("{}/api/email/events", test_app.address))
        .json(&json!([{ "email": "fan@test.com", "event": "bounce" }]))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 401);
}
