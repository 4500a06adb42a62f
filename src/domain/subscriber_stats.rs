use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};

use crate::domain::subscription::Subscription;
use crate::domain::subscription_status::SubscriptionStatus;

#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct SubscriberStats {
    pub total: i64,
    pub pending: i64,
    pub active: i64,
    pub unsubscribed: i64,
    pub bounced: i64,
    pub blocked: i64,
    pub by_source: BTreeMap<String, i64>,
    pub last_24_hours: i64,
}

impl SubscriberStats {
    pub fn record_status(&mut self, status: SubscriptionStatus, count: i64) {
        let slot = match status {
            SubscriptionStatus::Pending => &mut self.pending,
            SubscriptionStatus::Active => &mut self.active,
            SubscriptionStatus::Unsubscribed => &mut self.unsubscribed,
            SubscriptionStatus::Bounced => &mut self.bounced,
            SubscriptionStatus::Blocked => &mut self.blocked,
        };

        *slot += count;
        self.total += count;
    }

    pub fn from_subscriptions<'a>(
        subscriptions: impl IntoIterator<Item = &'a Subscription>,
        now: DateTime<Utc>,
    ) -> SubscriberStats {
        let since = now - Duration::hours(24);
        let mut stats = SubscriberStats::default();

        for subscription in subscriptions {
            stats.record_status(subscription.status, 1);
            *stats
                .by_source
                .entry(subscription.source.as_ref().to_string())
                .or_insert(0) += 1;

            if subscription.created_at >= since {
                stats.last_24_hours += 1;
            }
        }

        stats
    }
}
