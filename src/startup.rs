use actix_web::dev::Server;
use actix_web::{error, http::StatusCode, web, App, HttpServer};
use secrecy::Secret;
use std::net::TcpListener;
use std::sync::Arc;
use tracing_actix_web::TracingLogger;

use crate::cache::ResponseCache;
use crate::config::{SiteSettings, Settings};
use crate::content::timeline::{Timeline, TimelineError};
use crate::email_client::{EmailClient, EmailError};
use crate::error::{error_chain_fmt, ErrorCode, ErrorResponse};
use crate::rate_limit::RateLimiter;
use crate::routes::{
    about_page, countdown, handle_confirm_subscription, handle_create_subscription,
    handle_email_events, handle_unsubscribe, health_check, home_page, newsletter_page,
    publish_newsletter, rss_feed, sitemap, subscriber_stats, timeline, timeline_page,
};
use crate::store::{build_store, StoreError, SubscriptionStore};
use crate::triggers::EmailTriggers;

/// Public URL of the site, used to build links in emails, the feed and the sitemap.
pub struct ApplicationBaseUrl(pub String);

pub struct AdminApiKey(pub Secret<String>);

/// Site settings together with the announcement timeline loaded at startup.
pub struct SiteContent {
    pub site: SiteSettings,
    pub timeline: Timeline,
}

pub struct Application {
    pub port: u16,
    pub server: Server,
    store: Arc<dyn SubscriptionStore>,
}

#[derive(thiserror::Error)]
pub enum ApplicationError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Failed to load the announcement timeline.")]
    Timeline(#[from] TimelineError),
    #[error("Failed to build the email client.")]
    EmailClient(#[from] EmailError),
    #[error("Failed to set up the subscription store.")]
    Store(#[from] StoreError),
    #[error("Failed to start the HTTP server.")]
    Io(#[from] std::io::Error),
}

impl std::fmt::Debug for ApplicationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, ApplicationError> {
        let store = build_store(&config.database).await?;
        let sender_email = config
            .get_email_client_sender()
            .map_err(ApplicationError::Configuration)?;
        let email_client = EmailClient::new(
            config.email_client.base_url.clone(),
            sender_email,
            config.email_client.api_key.clone(),
            Some(config.email_client.get_timeout()),
            config.retry.get_policy(),
        )?;
        let timeline = Timeline::load(&config.site.timeline_path)?;

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(
            listener,
            store.clone(),
            Arc::new(email_client),
            SiteContent {
                site: config.site.clone(),
                timeline,
            },
            &config,
        )?;

        Ok(Self {
            port,
            server,
            store,
        })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn get_store(&self) -> Arc<dyn SubscriptionStore> {
        self.store.clone()
    }

    pub async fn run_until_stop(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

pub fn run(
    listener: TcpListener,
    store: Arc<dyn SubscriptionStore>,
    email_client: Arc<EmailClient>,
    content: SiteContent,
    config: &Settings,
) -> Result<Server, std::io::Error> {
    let base_url = config.get_app_base_url();
    let store: web::Data<dyn SubscriptionStore> = web::Data::from(store);
    let triggers = web::Data::new(EmailTriggers::new(email_client.clone(), base_url.clone()));
    let email_client: web::Data<EmailClient> = web::Data::from(email_client);
    let base_url = web::Data::new(ApplicationBaseUrl(base_url));
    let admin_api_key = web::Data::new(AdminApiKey(config.application.admin_api_key.clone()));
    let content = web::Data::new(content);
    let rate_limiter = web::Data::new(RateLimiter::new(
        config.rate_limit.max_requests,
        config.rate_limit.get_window(),
    ));
    let cache = web::Data::new(ResponseCache::new(config.cache.get_ttl()));

    let server = HttpServer::new(move || {
        // App is where your application logic lives: routing, middlewares, request handler, etc
        App::new()
            // 'wrap' method adds a middleware to the App. This specific middleware provide incoming
            // request logger
            .wrap(TracingLogger::default())
            .app_data(json_config())
            .app_data(query_config())
            .route("/health_check", web::get().to(health_check))
            .route("/api/subscribe", web::post().to(handle_create_subscription))
            .route("/api/stats", web::get().to(subscriber_stats))
            .route("/api/email/events", web::post().to(handle_email_events))
            .route("/api/newsletters", web::post().to(publish_newsletter))
            .route("/api/countdown", web::get().to(countdown))
            .route("/api/timeline", web::get().to(timeline))
            .route(
                "/subscriptions/confirm",
                web::get().to(handle_confirm_subscription),
            )
            .route("/subscriptions/unsubscribe", web::get().to(handle_unsubscribe))
            .route("/rss.xml", web::get().to(rss_feed))
            .route("/sitemap.xml", web::get().to(sitemap))
            .route("/", web::get().to(home_page))
            .route("/timeline", web::get().to(timeline_page))
            .route("/newsletter", web::get().to(newsletter_page))
            .route("/about", web::get().to(about_page))
            .app_data(store.clone())
            .app_data(email_client.clone())
            .app_data(triggers.clone())
            .app_data(base_url.clone())
            .app_data(admin_api_key.clone())
            .app_data(content.clone())
            .app_data(rate_limiter.clone())
            .app_data(cache.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

// Malformed bodies and query strings get the same JSON error shape as every other failure
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _request| {
        let response = ErrorResponse::new(ErrorCode::ValidationError, err.to_string())
            .respond(StatusCode::BAD_REQUEST);

        error::InternalError::from_response(err, response).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _request| {
        let response = ErrorResponse::new(ErrorCode::ValidationError, err.to_string())
            .respond(StatusCode::BAD_REQUEST);

        error::InternalError::from_response(err, response).into()
    })
}
