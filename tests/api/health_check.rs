use crate::helpers::TestApp;

#[tokio::test]
async fn health_check_answers_200_when_the_store_is_reachable() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app.get("/health_check").await;

    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length())
}

#[tokio::test]
async fn health_check_is_not_rate_limited() {
    let test_app = TestApp::spawn_app_with(|config| config.rate_limit.max_requests = 1).await;

    for _ in 0..3 {
        let response = test_app.get("/health_check").await;

        assert_eq!(response.status().as_u16(), 200);
    }
}
