use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscription_status::SubscriptionStatus;
use crate::email_client::{EmailClient, EmailError};
use crate::error::{error_chain_fmt, ErrorCode, ErrorResponse};
use crate::routes::is_admin_request;
use crate::startup::AdminApiKey;
use crate::store::{StoreError, SubscriptionStore};
use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, ResponseError};
use serde::Deserialize;

#[derive(Deserialize, Debug)]
pub struct NewNewsletter {
    pub title: String,
    pub content: NewsletterContent,
}

#[derive(Deserialize, Debug)]
pub struct NewsletterContent {
    pub html: String,
}

#[derive(serde::Serialize)]
pub struct PublishNewsletterResponse {
    pub recipients: usize,
}

#[tracing::instrument(
    name = "Publishing a newsletter to all subscribers",
    skip(request, body, store, email_client, admin_api_key),
    fields(
        title = %body.title
    )
)]
pub async fn publish_newsletter(
    request: HttpRequest,
    body: web::Json<NewNewsletter>,
    store: web::Data<dyn SubscriptionStore>,
    email_client: web::Data<EmailClient>,
    admin_api_key: web::Data<AdminApiKey>,
) -> Result<HttpResponse, PublishNewsletterError> {
    if !is_admin_request(&request, &admin_api_key.0) {
        return Err(PublishNewsletterError::Unauthorized);
    }

    if body.title.trim().is_empty() || body.content.html.trim().is_empty() {
        return Err(PublishNewsletterError::ValidationError);
    }

    let subscriber_emails: Vec<SubscriberEmail> = store
        .list_by_status(SubscriptionStatus::Active)
        .await?
        .into_iter()
        .map(|subscription| subscription.email)
        .collect();

    if !subscriber_emails.is_empty() {
        email_client
            .broadcast_email(&subscriber_emails, &body.title, &body.content.html)
            .await?;
    }

    Ok(HttpResponse::Ok().json(PublishNewsletterResponse {
        recipients: subscriber_emails.len(),
    }))
}

#[derive(thiserror::Error)]
pub enum PublishNewsletterError {
    #[error("Missing or invalid credentials.")]
    Unauthorized,
    #[error("A newsletter needs a title and some content.")]
    ValidationError,
    #[error("Failed to send the newsletter.")]
    SendEmailError(#[from] EmailError),
    #[error("Failed to get subscribers from the database.")]
    GetSubscribersError(#[from] StoreError),
}

impl std::fmt::Debug for PublishNewsletterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for PublishNewsletterError {
    fn status_code(&self) -> StatusCode {
        match self {
            PublishNewsletterError::Unauthorized => StatusCode::UNAUTHORIZED,
            PublishNewsletterError::ValidationError => StatusCode::BAD_REQUEST,
            PublishNewsletterError::SendEmailError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PublishNewsletterError::GetSubscribersError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let code = match self {
            PublishNewsletterError::Unauthorized => ErrorCode::Unauthorized,
            PublishNewsletterError::ValidationError => ErrorCode::ValidationError,
            PublishNewsletterError::SendEmailError(_) => ErrorCode::NetworkError,
            PublishNewsletterError::GetSubscribersError(_) => ErrorCode::DatabaseError,
        };

        ErrorResponse::new(code, self.to_string()).respond(self.status_code())
    }
}
