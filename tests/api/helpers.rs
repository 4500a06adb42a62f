use reqwest::{Response, Url};
use sqlx::{Connection, Executor, PgConnection};
use std::sync::Arc;
use uuid::Uuid;
use wiremock::MockServer;

use fan_site::{
    config::{get_configuration, DatabaseBackend, DatabaseSettings, Settings},
    domain::subscription::Subscription,
    startup::Application,
    store::{build_store, SubscriptionStore},
};

pub const ADMIN_API_KEY: &str = "test-admin-key";

pub struct TestApp {
    pub config: Settings,
    pub address: String,
    pub port: u16,
    pub store: Arc<dyn SubscriptionStore>,
    pub email_server: MockServer,
    pub api_client: reqwest::Client,
}

/// Links found in an email sent through the mock email provider.
pub struct EmailLinks {
    pub html: Url,
}

impl TestApp {
    pub async fn spawn_app() -> TestApp {
        TestApp::spawn_app_with(|_| {}).await
    }

    /// Spawns the application on a random port with a mock email provider.
    /// The store follows `database.backend`: in memory by default, a throwaway Postgres
    /// database when `APP_DATABASE__BACKEND=postgres`.
    /// `customize` can tweak the configuration before the application is built.
    pub async fn spawn_app_with(customize: impl FnOnce(&mut Settings)) -> TestApp {
        let mut config = get_configuration().expect("Missing configuration file.");
        let email_server = MockServer::start().await;

        // We are using port 0 as way to define a different port per each test. Port 0 is a special case that operating systems
        // take into account: when port is 0, the OS will search for the first available port
        config.set_app_port(0);
        config.set_email_client_base_url(email_server.uri());
        config.application.admin_api_key = secrecy::Secret::new(ADMIN_API_KEY.to_string());
        config.rate_limit.max_requests = 100;
        config.retry.base_delay_milliseconds = 5;
        config.retry.max_delay_milliseconds = 10;

        customize(&mut config);
        configure_db(&mut config.database).await;

        let application = Application::build(config.clone())
            .await
            .expect("Failed to build application.");
        let port = application.get_port();
        let store = application.get_store();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(application.run_until_stop());

        TestApp {
            address,
            port,
            config,
            store,
            email_server,
            api_client: reqwest::Client::new(),
        }
    }

    pub async fn post_subscription(&self, body: serde_json::Value) -> Response {
        self.api_client
            .post(&format!("{}/api/subscribe", self.address))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_newsletter(&self, body: serde_json::Value) -> Response {
        self.api_client
            .post(&format!("{}/api/newsletters", self.address))
            .bearer_auth(ADMIN_API_KEY)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_email_events(&self, body: serde_json::Value) -> Response {
        self.api_client
            .post(&format!("{}/api/email/events", self.address))
            .bearer_auth(ADMIN_API_KEY)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get(&self, path: &str) -> Response {
        self.api_client
            .get(&format!("{}{}", self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Extracts the single link of an email body and points it to the test server port.
    pub fn get_email_link(&self, email_request: &wiremock::Request) -> EmailLinks {
        let body: serde_json::Value = serde_json::from_slice(&email_request.body).unwrap();
        let html = body["content"][0]["value"].as_str().unwrap();
        let links: Vec<_> = linkify::LinkFinder::new()
            .links(html)
            .filter(|link| *link.kind() == linkify::LinkKind::Url)
            .collect();

        assert_eq!(links.len(), 1);

        let mut link = Url::parse(links[0].as_str()).unwrap();

        // Links must point to this application, never to a random host
        assert_eq!(link.host_str().unwrap(), "127.0.0.1");
        link.set_port(Some(self.port)).unwrap();

        EmailLinks { html: link }
    }

    pub async fn find_subscription(&self, email: &str) -> Subscription {
        let email = fan_site::domain::subscriber_email::SubscriberEmail::parse(email.to_string())
            .unwrap();

        self.store
            .find_by_email(&email)
            .await
            .expect("Failed to query the store.")
            .expect("Subscription not found.")
    }
}

/// Builds a store for the configured backend, bypassing the HTTP layer.
pub async fn spawn_store() -> Arc<dyn SubscriptionStore> {
    let mut config = get_configuration().expect("Missing configuration file.");

    configure_db(&mut config.database).await;

    build_store(&config.database)
        .await
        .expect("Failed to build the subscription store.")
}

/// Creates a fresh database per test when running against Postgres. Migrations are run by
/// `build_store`.
async fn configure_db(db_config: &mut DatabaseSettings) {
    if db_config.backend != DatabaseBackend::Postgres {
        return;
    }

    let db_test_name = format!("db_{}", Uuid::new_v4().to_string().replace('-', "_"));
    let mut connection = PgConnection::connect_with(&db_config.get_server_options())
        .await
        .expect("Failed to connect to Postgres.");

    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, db_test_name))
        .await
        .expect("Failed to create database.");

    connection
        .close()
        .await
        .expect("Failed to close connection.");

    db_config.set_name(db_test_name);
}
