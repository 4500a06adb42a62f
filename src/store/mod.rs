//! Storage adapters for subscriptions.
//!
//! Every backend implements [`SubscriptionStore`], so handlers only ever see a
//! `web::Data<dyn SubscriptionStore>` and never know which database sits behind it.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::{DatabaseBackend, DatabaseSettings};
use crate::domain::new_subscription::NewSubscription;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_stats::SubscriberStats;
use crate::domain::subscription::Subscription;
use crate::domain::subscription_status::SubscriptionStatus;
use crate::error::error_chain_fmt;

mod memory;
mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Stores a new pending subscription. Fails with [`StoreError::Duplicate`] when the
    /// email is already known, whatever its status.
    async fn insert(
        &self,
        new_subscription: &NewSubscription,
        token: &str,
    ) -> Result<Subscription, StoreError>;

    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscription>, StoreError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<Subscription>, StoreError>;

    /// Applies a status transition, rejecting the ones the lifecycle does not allow.
    async fn update_status(
        &self,
        id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<Subscription, StoreError>;

    /// Puts an unsubscribed record back to pending with the details of the new signup.
    async fn resubscribe(
        &self,
        id: Uuid,
        new_subscription: &NewSubscription,
        token: &str,
    ) -> Result<Subscription, StoreError>;

    async fn list_by_status(
        &self,
        status: SubscriptionStatus,
    ) -> Result<Vec<Subscription>, StoreError>;

    async fn stats(&self, now: DateTime<Utc>) -> Result<SubscriberStats, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

#[derive(thiserror::Error)]
pub enum StoreError {
    #[error("A subscription for this email already exists.")]
    Duplicate,
    #[error("Subscription not found.")]
    NotFound,
    #[error("A subscription cannot move from {from} to {to}.")]
    InvalidTransition {
        from: SubscriptionStatus,
        to: SubscriptionStatus,
    },
    #[error("Stored subscription is not valid: {0}")]
    InvalidRecord(String),
    #[error("Failed to execute a database query.")]
    Database(#[from] sqlx::Error),
    #[error("Failed to run database migrations.")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl std::fmt::Debug for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<(SubscriptionStatus, SubscriptionStatus)> for StoreError {
    fn from((from, to): (SubscriptionStatus, SubscriptionStatus)) -> Self {
        StoreError::InvalidTransition { from, to }
    }
}

/// Builds the configured backend. Postgres schemas are migrated before the store is handed out.
pub async fn build_store(
    config: &DatabaseSettings,
) -> Result<Arc<dyn SubscriptionStore>, StoreError> {
    match config.backend {
        DatabaseBackend::Postgres => {
            let store = PostgresStore::new(config.get_connection_pool());

            store.migrate().await?;

            Ok(Arc::new(store))
        }
        DatabaseBackend::Memory => {
            tracing::warn!("Using the in-memory subscription store, data is lost on restart");

            Ok(Arc::new(InMemoryStore::default()))
        }
    }
}
