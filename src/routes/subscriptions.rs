use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, ResponseError};
use rand::Rng;
use std::time::{Duration, Instant};

use crate::{
    cache::ResponseCache,
    domain::{
        new_subscription::{NewSubscription, NewSubscriptionBody},
        subscription::Subscription,
    },
    error::{error_chain_fmt, ErrorCode, ErrorResponse},
    rate_limit::{client_key, RateLimiter},
    routes::STATS_CACHE_KEY,
    store::{StoreError, SubscriptionStore},
    triggers::{EmailTriggers, SubscriptionEvent},
};

const SUBSCRIPTION_TOKEN_LENGTH: usize = 32;

#[derive(serde::Serialize)]
pub struct SubscriptionResponse<'a> {
    pub success: bool,
    pub data: SubscriptionSummary<'a>,
    pub message: &'a str,
}

#[derive(serde::Serialize)]
pub struct SubscriptionSummary<'a> {
    pub id: uuid::Uuid,
    pub email: &'a str,
    pub status: &'a str,
    pub source: &'a str,
}

impl<'a> SubscriptionSummary<'a> {
    pub fn from_subscription(subscription: &'a Subscription) -> Self {
        Self {
            id: subscription.id,
            email: subscription.email.as_ref(),
            status: subscription.status.as_ref(),
            source: subscription.source.as_ref(),
        }
    }
}

#[derive(thiserror::Error)]
pub enum SubscribeError {
    #[error("{0}")]
    ValidationError(String),
    #[error("Too many subscription attempts. Please try again later.")]
    RateLimited(Duration),
    #[error("This email is already subscribed.")]
    Duplicate,
    #[error("Failed to store the subscription.")]
    StoreError(#[source] StoreError),
}

impl std::fmt::Debug for SubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<StoreError> for SubscribeError {
    fn from(err: StoreError) -> Self {
        match err {
            // Two signups for the same email can race between the lookup and the insert
            StoreError::Duplicate => SubscribeError::Duplicate,
            // ...and between the lookup and the resubscribe, where the loser finds it pending
            StoreError::InvalidTransition { .. } => SubscribeError::Duplicate,
            err => SubscribeError::StoreError(err),
        }
    }
}

impl SubscribeError {
    fn retry_after_seconds(retry_after: &Duration) -> u64 {
        // round up so clients never retry a moment too early
        retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0)
    }
}

impl ResponseError for SubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscribeError::ValidationError(_) => StatusCode::BAD_REQUEST,
            SubscribeError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            SubscribeError::Duplicate => StatusCode::CONFLICT,
            SubscribeError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let code = match self {
            SubscribeError::ValidationError(_) => ErrorCode::ValidationError,
            SubscribeError::RateLimited(_) => ErrorCode::RateLimited,
            SubscribeError::Duplicate => ErrorCode::DuplicateEmail,
            SubscribeError::StoreError(_) => ErrorCode::DatabaseError,
        };
        let body = ErrorResponse::new(code, self.to_string());

        match self {
            SubscribeError::RateLimited(retry_after) => {
                let seconds = Self::retry_after_seconds(retry_after);

                HttpResponse::build(self.status_code())
                    .insert_header(("Retry-After", seconds.to_string()))
                    .json(body.with_retry_after(seconds))
            }
            _ => body.respond(self.status_code()),
        }
    }
}

#[tracing::instrument(
    name = "Creating a new subscription handler",
    skip(request, body, store, triggers, rate_limiter, cache),
    fields(
        subscriber_email = %body.email,
        subscription_source = ?body.source
    )
)]
pub async fn handle_create_subscription(
    request: HttpRequest,
    body: web::Json<NewSubscriptionBody>,
    store: web::Data<dyn SubscriptionStore>,
    triggers: web::Data<EmailTriggers>,
    rate_limiter: web::Data<RateLimiter>,
    cache: web::Data<ResponseCache>,
) -> Result<HttpResponse, SubscribeError> {
    rate_limiter
        .check(&client_key(&request), Instant::now())
        .map_err(SubscribeError::RateLimited)?;

    let new_subscription: NewSubscription = body
        .into_inner()
        .try_into()
        .map_err(SubscribeError::ValidationError)?;
    let subscription_token = generate_subscription_token();

    let (subscription, event) = match store.find_by_email(&new_subscription.email).await? {
        Some(existing) if existing.status.is_unsubscribed() => {
            let subscription = store
                .resubscribe(existing.id, &new_subscription, &subscription_token)
                .await?;

            (subscription, SubscriptionEvent::Resubscribed)
        }
        Some(_) => return Err(SubscribeError::Duplicate),
        None => {
            let subscription = store
                .insert(&new_subscription, &subscription_token)
                .await?;

            (subscription, SubscriptionEvent::Subscribed)
        }
    };

    // The subscription is stored either way; the email can be resent by signing up again later
    if let Err(err) = triggers.fire(event, &subscription).await {
        tracing::error!(
            "Failed to send an email to {}: {:?}",
            subscription.email.as_ref(),
            err
        );
    }

    cache.invalidate(STATS_CACHE_KEY);

    Ok(HttpResponse::Created().json(SubscriptionResponse {
        success: true,
        data: SubscriptionSummary::from_subscription(&subscription),
        message: "Check your inbox to confirm your subscription.",
    }))
}

fn generate_subscription_token() -> String {
    let mut rng = rand::thread_rng();

    std::iter::repeat_with(|| rng.sample(rand::distributions::Alphanumeric))
        .map(char::from)
        .take(SUBSCRIPTION_TOKEN_LENGTH)
        .collect()
}
