use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use std::time;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::error::error_chain_fmt;
use crate::retry::{retry_with_backoff, RetryPolicy};

const REQUEST_TIMEOUT: time::Duration = time::Duration::from_secs(10);
// SendGrid rejects requests with more than 1000 personalizations
const MAX_PERSONALIZATIONS: usize = 1000;

pub struct EmailClient {
    http_client: Client,
    base_url: String,
    sender: SubscriberEmail,
    api_key: Secret<String>,
    retry_policy: RetryPolicy,
}

#[derive(serde::Serialize)]
pub struct SendEmailBody<'a> {
    personalizations: Vec<SengridPersonalization<'a>>,
    from: SengridEmail<'a>,
    subject: &'a str,
    content: Vec<SengridContent<'a>>,
}

#[derive(serde::Serialize)]
struct SengridEmail<'a> {
    email: &'a str,
}

#[derive(serde::Serialize)]
struct SengridPersonalization<'a> {
    to: Vec<SengridEmail<'a>>,
}

#[derive(serde::Serialize)]
struct SengridContent<'a> {
    #[serde(rename = "type")]
    content_type: &'a str,
    value: &'a str,
}

#[derive(thiserror::Error)]
pub enum EmailError {
    #[error("Failed to build the email provider HTTP client.")]
    Client(#[source] reqwest::Error),
    #[error("The email provider request failed.")]
    Request(#[from] reqwest::Error),
}

impl std::fmt::Debug for EmailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl EmailError {
    /// Timeouts, connection failures, throttling and 5xx answers are worth another try.
    /// Any other 4xx means the request itself is wrong.
    pub fn is_transient(&self) -> bool {
        match self {
            EmailError::Client(_) => false,
            EmailError::Request(err) => match err.status() {
                Some(status) => {
                    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
                }
                None => err.is_timeout() || err.is_connect() || err.is_request(),
            },
        }
    }
}

impl EmailClient {
    pub fn new(
        base_url: String,
        sender: SubscriberEmail,
        api_key: Secret<String>,
        timeout: Option<time::Duration>,
        retry_policy: RetryPolicy,
    ) -> Result<EmailClient, EmailError> {
        let http_client = Client::builder()
            .timeout(timeout.unwrap_or(REQUEST_TIMEOUT))
            .build()
            .map_err(EmailError::Client)?;

        Ok(EmailClient {
            http_client,
            base_url: base_url.trim_end_matches('/').to_string(),
            sender,
            api_key,
            retry_policy,
        })
    }

    #[tracing::instrument(
        name = "Send an email",
        skip(self, html_content),
        fields(recipient = %recipient)
    )]
    pub async fn send_email(
        &self,
        recipient: &SubscriberEmail,
        subject: &str,
        html_content: &str,
    ) -> Result<(), EmailError> {
        self.send_with_retry(std::slice::from_ref(recipient), subject, html_content)
            .await
    }

    /// Sends the same email to every recipient. Each recipient gets its own
    /// personalization so nobody sees the rest of the list.
    #[tracing::instrument(
        name = "Broadcast an email",
        skip(self, recipients, html_content),
        fields(recipients = recipients.len())
    )]
    pub async fn broadcast_email(
        &self,
        recipients: &[SubscriberEmail],
        subject: &str,
        html_content: &str,
    ) -> Result<(), EmailError> {
        for chunk in recipients.chunks(MAX_PERSONALIZATIONS) {
            self.send_with_retry(chunk, subject, html_content).await?;
        }

        Ok(())
    }

    async fn send_with_retry(
        &self,
        recipients: &[SubscriberEmail],
        subject: &str,
        html_content: &str,
    ) -> Result<(), EmailError> {
        retry_with_backoff(
            &self.retry_policy,
            move || self.post_mail_send(recipients, subject, html_content),
            |err: &EmailError| {
                let transient = err.is_transient();
                if transient {
                    tracing::warn!("Email provider call failed, retrying: {:?}", err);
                }
                transient
            },
        )
        .await
    }

    async fn post_mail_send(
        &self,
        recipients: &[SubscriberEmail],
        subject: &str,
        html_content: &str,
    ) -> Result<(), EmailError> {
        let url = format!("{}/mail/send", self.base_url);
        let body = SendEmailBody {
            from: SengridEmail {
                email: self.sender.as_ref(),
            },
            personalizations: recipients
                .iter()
                .map(|recipient| SengridPersonalization {
                    to: vec![SengridEmail {
                        email: recipient.as_ref(),
                    }],
                })
                .collect(),
            subject,
            content: vec![SengridContent {
                content_type: "text/html",
                value: html_content,
            }],
        };

        self.http_client
            .post(&url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&body)
            .send()
            .await?
            .error_for_status()?; // return an error when server response status code is 4xx or 5xx

        Ok(())
    }
}
