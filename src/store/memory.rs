use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{StoreError, SubscriptionStore};
use crate::domain::new_subscription::NewSubscription;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_stats::SubscriberStats;
use crate::domain::subscription::Subscription;
use crate::domain::subscription_status::SubscriptionStatus;

/// Process-local store used for development and the API test-suite.
#[derive(Default)]
pub struct InMemoryStore {
    subscriptions: RwLock<HashMap<Uuid, Subscription>>,
}

#[async_trait]
impl SubscriptionStore for InMemoryStore {
    #[tracing::instrument(name = "Insert a new subscription in memory", skip_all)]
    async fn insert(
        &self,
        new_subscription: &NewSubscription,
        token: &str,
    ) -> Result<Subscription, StoreError> {
        let mut subscriptions = self.subscriptions.write().await;

        if subscriptions
            .values()
            .any(|subscription| subscription.email == new_subscription.email)
        {
            return Err(StoreError::Duplicate);
        }

        let now = Utc::now();
        let subscription = Subscription {
            id: Uuid::new_v4(),
            email: new_subscription.email.clone(),
            status: SubscriptionStatus::Pending,
            source: new_subscription.source.clone(),
            tags: new_subscription.tags.clone(),
            metadata: new_subscription.metadata.clone(),
            token: token.to_string(),
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            unsubscribed_at: None,
        };

        subscriptions.insert(subscription.id, subscription.clone());

        Ok(subscription)
    }

    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscription>, StoreError> {
        let subscriptions = self.subscriptions.read().await;

        Ok(subscriptions
            .values()
            .find(|subscription| &subscription.email == email)
            .cloned())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Subscription>, StoreError> {
        let subscriptions = self.subscriptions.read().await;

        Ok(subscriptions
            .values()
            .find(|subscription| subscription.token == token)
            .cloned())
    }

    #[tracing::instrument(name = "Update subscription status in memory", skip(self))]
    async fn update_status(
        &self,
        id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<Subscription, StoreError> {
        let mut subscriptions = self.subscriptions.write().await;
        let subscription = subscriptions.get_mut(&id).ok_or(StoreError::NotFound)?;

        subscription.transition_to(status, Utc::now())?;

        Ok(subscription.clone())
    }

    async fn resubscribe(
        &self,
        id: Uuid,
        new_subscription: &NewSubscription,
        token: &str,
    ) -> Result<Subscription, StoreError> {
        let mut subscriptions = self.subscriptions.write().await;
        let subscription = subscriptions.get_mut(&id).ok_or(StoreError::NotFound)?;

        subscription.transition_to(SubscriptionStatus::Pending, Utc::now())?;
        subscription.source = new_subscription.source.clone();
        subscription.tags = new_subscription.tags.clone();
        subscription.metadata = new_subscription.metadata.clone();
        subscription.token = token.to_string();

        Ok(subscription.clone())
    }

    async fn list_by_status(
        &self,
        status: SubscriptionStatus,
    ) -> Result<Vec<Subscription>, StoreError> {
        let subscriptions = self.subscriptions.read().await;
        let mut matching: Vec<Subscription> = subscriptions
            .values()
            .filter(|subscription| subscription.status == status)
            .cloned()
            .collect();

        matching.sort_by_key(|subscription| subscription.created_at);

        Ok(matching)
    }

    async fn stats(&self, now: DateTime<Utc>) -> Result<SubscriberStats, StoreError> {
        let subscriptions = self.subscriptions.read().await;

        Ok(SubscriberStats::from_subscriptions(
            subscriptions.values(),
            now,
        ))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
