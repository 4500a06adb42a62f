use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, ResponseError};
use serde::Deserialize;

use crate::{
    cache::ResponseCache,
    domain::{subscriber_email::SubscriberEmail, subscription_status::SubscriptionStatus},
    error::{error_chain_fmt, ErrorCode, ErrorResponse},
    routes::{is_admin_request, STATS_CACHE_KEY},
    startup::AdminApiKey,
    store::{StoreError, SubscriptionStore},
};

/// One entry of the email provider event webhook payload. Unknown fields are ignored.
#[derive(Deserialize, Debug)]
pub struct EmailEvent {
    pub email: String,
    pub event: String,
}

#[derive(serde::Serialize)]
pub struct EmailEventsResponse {
    pub processed: usize,
}

#[derive(thiserror::Error)]
pub enum EmailEventsError {
    #[error("Missing or invalid credentials.")]
    Unauthorized,
    #[error("Failed to record email events.")]
    StoreError(#[from] StoreError),
}

impl std::fmt::Debug for EmailEventsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for EmailEventsError {
    fn status_code(&self) -> StatusCode {
        match self {
            EmailEventsError::Unauthorized => StatusCode::UNAUTHORIZED,
            EmailEventsError::StoreError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let code = match self {
            EmailEventsError::Unauthorized => ErrorCode::Unauthorized,
            EmailEventsError::StoreError(_) => ErrorCode::DatabaseError,
        };

        ErrorResponse::new(code, self.to_string()).respond(self.status_code())
    }
}

/// Status a delivery event moves a subscription to, if it matters to us.
pub fn status_for_event(event: &str) -> Option<SubscriptionStatus> {
    match event {
        "bounce" | "dropped" => Some(SubscriptionStatus::Bounced),
        "spamreport" => Some(SubscriptionStatus::Blocked),
        _ => None,
    }
}

#[tracing::instrument(
    name = "Record email provider events",
    skip(request, events, store, cache, admin_api_key),
    fields(events = events.len())
)]
pub async fn handle_email_events(
    request: HttpRequest,
    events: web::Json<Vec<EmailEvent>>,
    store: web::Data<dyn SubscriptionStore>,
    cache: web::Data<ResponseCache>,
    admin_api_key: web::Data<AdminApiKey>,
) -> Result<HttpResponse, EmailEventsError> {
    if !is_admin_request(&request, &admin_api_key.0) {
        return Err(EmailEventsError::Unauthorized);
    }

    let mut processed = 0;

    for event in events.iter() {
        let status = match status_for_event(&event.event) {
            Some(status) => status,
            None => continue,
        };
        let email = match SubscriberEmail::parse(event.email.clone()) {
            Ok(email) => email,
            Err(err) => {
                tracing::warn!("Skipping email event with an invalid address: {}", err);
                continue;
            }
        };
        let subscription = match store.find_by_email(&email).await? {
            Some(subscription) => subscription,
            None => continue,
        };

        if !subscription.status.is_transition_allowed(status) {
            continue;
        }

        match store.update_status(subscription.id, status).await {
            Ok(_) => processed += 1,
            // a concurrent update got there first
            Err(StoreError::InvalidTransition { .. }) => {}
            Err(err) => return Err(err.into()),
        }
    }

    if processed > 0 {
        cache.invalidate(STATS_CACHE_KEY);
    }

    Ok(HttpResponse::Ok().json(EmailEventsResponse { processed }))
}
