//! Transactional emails sent on subscription lifecycle events.
use std::sync::Arc;

use crate::content::escape_xml;
use crate::domain::subscription::Subscription;
use crate::email_client::{EmailClient, EmailError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionEvent {
    Subscribed,
    Resubscribed,
    Confirmed,
    Unsubscribed,
    Bounced,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTemplate {
    Confirmation,
    Welcome,
    Goodbye,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

impl SubscriptionEvent {
    /// Template sent for this event, if any. Bounced and blocked addresses are never emailed.
    pub fn template(&self) -> Option<EmailTemplate> {
        match self {
            SubscriptionEvent::Subscribed | SubscriptionEvent::Resubscribed => {
                Some(EmailTemplate::Confirmation)
            }
            SubscriptionEvent::Confirmed => Some(EmailTemplate::Welcome),
            SubscriptionEvent::Unsubscribed => Some(EmailTemplate::Goodbye),
            SubscriptionEvent::Bounced | SubscriptionEvent::Blocked => None,
        }
    }
}

impl EmailTemplate {
    pub fn render(&self, base_url: &str, subscription: &Subscription) -> RenderedEmail {
        let token = escape_xml(&subscription.token);

        match self {
            EmailTemplate::Confirmation => {
                let confirmation_link =
                    format!("{}/subscriptions/confirm?token={}", base_url, token);

                RenderedEmail {
                    subject: String::from("Confirm your newsletter subscription"),
                    html: format!(
                        r#"<div>
    <h1>One more step!</h1>
    <p>Click <a href="{}">here</a> to confirm your subscription to the launch newsletter.</p>
    <p>If you did not sign up you can ignore this email.</p>
</div>"#,
                        confirmation_link
                    ),
                }
            }
            EmailTemplate::Welcome => {
                let unsubscribe_link =
                    format!("{}/subscriptions/unsubscribe?token={}", base_url, token);

                RenderedEmail {
                    subject: String::from("Welcome to the launch newsletter"),
                    html: format!(
                        r#"<div>
    <h1>You are in!</h1>
    <p>We will email you when there is news, and once more on launch day.</p>
    <p><a href="{}">Unsubscribe</a></p>
</div>"#,
                        unsubscribe_link
                    ),
                }
            }
            EmailTemplate::Goodbye => RenderedEmail {
                subject: String::from("You have been unsubscribed"),
                html: format!(
                    r#"<div>
    <h1>Sorry to see you go</h1>
    <p>You will not receive any more emails from us. Changed your mind? Sign up again at <a href="{0}/newsletter">{0}/newsletter</a>.</p>
</div>"#,
                    base_url
                ),
            },
        }
    }
}

pub struct EmailTriggers {
    email_client: Arc<EmailClient>,
    base_url: String,
}

impl EmailTriggers {
    pub fn new(email_client: Arc<EmailClient>, base_url: String) -> Self {
        Self {
            email_client,
            base_url,
        }
    }

    /// Sends the email mapped to `event`. Returns `false` when the event has no email.
    #[tracing::instrument(
        name = "Fire a subscription email trigger",
        skip(self, subscription),
        fields(subscriber_email = %subscription.email)
    )]
    pub async fn fire(
        &self,
        event: SubscriptionEvent,
        subscription: &Subscription,
    ) -> Result<bool, EmailError> {
        let template = match event.template() {
            Some(template) => template,
            None => return Ok(false),
        };
        let email = template.render(&self.base_url, subscription);

        self.email_client
            .send_email(&subscription.email, &email.subject, &email.html)
            .await?;

        Ok(true)
    }
}
