use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscription_source::{SubscriptionSource, SubscriptionTag};
use crate::domain::subscription_status::SubscriptionStatus;

#[derive(Debug, Clone, serde::Serialize)]
pub struct Subscription {
    pub id: Uuid,
    pub email: SubscriberEmail,
    pub status: SubscriptionStatus,
    pub source: SubscriptionSource,
    pub tags: Vec<SubscriptionTag>,
    pub metadata: serde_json::Value,
    #[serde(skip_serializing)]
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub unsubscribed_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Moves the record to `next`, keeping the lifecycle timestamps in sync.
    /// Returns the rejected pair when the transition is not allowed.
    pub fn transition_to(
        &mut self,
        next: SubscriptionStatus,
        now: DateTime<Utc>,
    ) -> Result<(), (SubscriptionStatus, SubscriptionStatus)> {
        if !self.status.is_transition_allowed(next) {
            return Err((self.status, next));
        }

        match next {
            SubscriptionStatus::Active => self.confirmed_at = Some(now),
            SubscriptionStatus::Unsubscribed => self.unsubscribed_at = Some(now),
            SubscriptionStatus::Pending => {
                self.confirmed_at = None;
                self.unsubscribed_at = None;
            }
            SubscriptionStatus::Bounced | SubscriptionStatus::Blocked => {}
        }

        self.status = next;
        self.updated_at = now;

        Ok(())
    }
}
