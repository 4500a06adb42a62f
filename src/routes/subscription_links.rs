use actix_web::{http::StatusCode, web, HttpResponse, ResponseError};
use serde::Deserialize;

use crate::{
    cache::ResponseCache,
    domain::{subscription::Subscription, subscription_status::SubscriptionStatus},
    error::{error_chain_fmt, ErrorCode, ErrorResponse},
    routes::{SubscriptionResponse, SubscriptionSummary, STATS_CACHE_KEY},
    store::{StoreError, SubscriptionStore},
    triggers::{EmailTriggers, SubscriptionEvent},
};

#[derive(Deserialize, Debug)]
pub struct Parameters {
    pub token: String,
}

#[derive(thiserror::Error)]
pub enum SubscriptionLinkError {
    #[error("This link is not valid or has expired.")]
    UnknownToken,
    #[error("This subscription cannot be changed anymore.")]
    InvalidTransition(#[source] StoreError),
    #[error("Failed to update the subscription.")]
    StoreError(#[source] StoreError),
}

impl std::fmt::Debug for SubscriptionLinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<StoreError> for SubscriptionLinkError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => SubscriptionLinkError::UnknownToken,
            StoreError::InvalidTransition { .. } => SubscriptionLinkError::InvalidTransition(err),
            err => SubscriptionLinkError::StoreError(err),
        }
    }
}

impl ResponseError for SubscriptionLinkError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionLinkError::UnknownToken => StatusCode::NOT_FOUND,
            SubscriptionLinkError::InvalidTransition(_) => StatusCode::CONFLICT,
            SubscriptionLinkError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let code = match self {
            SubscriptionLinkError::UnknownToken => ErrorCode::NotFound,
            SubscriptionLinkError::InvalidTransition(_) => ErrorCode::InvalidTransition,
            SubscriptionLinkError::StoreError(_) => ErrorCode::DatabaseError,
        };

        ErrorResponse::new(code, self.to_string()).respond(self.status_code())
    }
}

#[tracing::instrument(
    name = "Confirm a newsletter subscription",
    skip(parameters, store, triggers, cache)
)]
pub async fn handle_confirm_subscription(
    parameters: web::Query<Parameters>,
    store: web::Data<dyn SubscriptionStore>,
    triggers: web::Data<EmailTriggers>,
    cache: web::Data<ResponseCache>,
) -> Result<HttpResponse, SubscriptionLinkError> {
    apply_link(
        &parameters.token,
        SubscriptionStatus::Active,
        SubscriptionEvent::Confirmed,
        store.get_ref(),
        &triggers,
        &cache,
    )
    .await
    .map(|subscription| {
        respond(
            &subscription,
            "Your subscription is confirmed. See you on launch day!",
        )
    })
}

#[tracing::instrument(
    name = "Unsubscribe from the newsletter",
    skip(parameters, store, triggers, cache)
)]
pub async fn handle_unsubscribe(
    parameters: web::Query<Parameters>,
    store: web::Data<dyn SubscriptionStore>,
    triggers: web::Data<EmailTriggers>,
    cache: web::Data<ResponseCache>,
) -> Result<HttpResponse, SubscriptionLinkError> {
    apply_link(
        &parameters.token,
        SubscriptionStatus::Unsubscribed,
        SubscriptionEvent::Unsubscribed,
        store.get_ref(),
        &triggers,
        &cache,
    )
    .await
    .map(|subscription| respond(&subscription, "You have been unsubscribed."))
}

/// Moves the subscription behind `token` to `target`. Following the same link twice
/// is not an error: the second visit finds the subscription already there and sends nothing.
async fn apply_link(
    token: &str,
    target: SubscriptionStatus,
    event: SubscriptionEvent,
    store: &dyn SubscriptionStore,
    triggers: &EmailTriggers,
    cache: &ResponseCache,
) -> Result<Subscription, SubscriptionLinkError> {
    let subscription = store
        .find_by_token(token)
        .await?
        .ok_or(SubscriptionLinkError::UnknownToken)?;

    if subscription.status == target {
        return Ok(subscription);
    }

    let subscription = store.update_status(subscription.id, target).await?;

    if let Err(err) = triggers.fire(event, &subscription).await {
        tracing::error!(
            "Failed to send an email to {}: {:?}",
            subscription.email.as_ref(),
            err
        );
    }

    cache.invalidate(STATS_CACHE_KEY);

    Ok(subscription)
}

fn respond(subscription: &Subscription, message: &str) -> HttpResponse {
    HttpResponse::Ok().json(SubscriptionResponse {
        success: true,
        data: SubscriptionSummary::from_subscription(subscription),
        message,
    })
}
