use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{postgres::PgRow, types::Json, PgPool, Row};
use uuid::Uuid;

use super::{StoreError, SubscriptionStore};
use crate::domain::new_subscription::NewSubscription;
use crate::domain::subscriber_email::SubscriberEmail;
use crate::domain::subscriber_stats::SubscriberStats;
use crate::domain::subscription::Subscription;
use crate::domain::subscription_source::{SubscriptionSource, SubscriptionTag};
use crate::domain::subscription_status::SubscriptionStatus;

const UNIQUE_VIOLATION: &str = "23505";
const SUBSCRIPTION_COLUMNS: &str = "id, email, status, source, tags, metadata, token, \
    created_at, updated_at, confirmed_at, unsubscribed_at";

/// Adapter for the hosted Postgres database. The schema lives in `migrations/`.
pub struct PostgresStore {
    db_pool: PgPool,
}

impl PostgresStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }

    #[tracing::instrument(name = "Run database migrations", skip(self))]
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.db_pool).await?;

        Ok(())
    }

    async fn find_one(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<Subscription>, StoreError> {
        // `column` only ever comes from this module, never from user input
        let query = format!(
            "SELECT {} FROM subscriptions WHERE {} = $1",
            SUBSCRIPTION_COLUMNS, column
        );

        sqlx::query(&query)
            .bind(value)
            .fetch_optional(&self.db_pool)
            .await?
            .map(|row| subscription_from_row(&row))
            .transpose()
    }

    /// Loads a subscription with a row lock, applies `change` and writes it back in one
    /// transaction, so concurrent status updates cannot interleave.
    async fn modify<F>(&self, id: Uuid, change: F) -> Result<Subscription, StoreError>
    where
        F: FnOnce(&mut Subscription) -> Result<(), StoreError> + Send,
    {
        let mut transaction = self.db_pool.begin().await?;
        let query = format!(
            "SELECT {} FROM subscriptions WHERE id = $1 FOR UPDATE",
            SUBSCRIPTION_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&mut transaction)
            .await?
            .ok_or(StoreError::NotFound)?;
        let mut subscription = subscription_from_row(&row)?;

        change(&mut subscription)?;

        let query = format!(
            r#"
            UPDATE subscriptions
            SET status = $2, source = $3, tags = $4, metadata = $5, token = $6,
                updated_at = $7, confirmed_at = $8, unsubscribed_at = $9
            WHERE id = $1
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(subscription.id)
            .bind(subscription.status.as_ref())
            .bind(subscription.source.as_ref())
            .bind(tag_values(&subscription.tags))
            .bind(Json(&subscription.metadata))
            .bind(&subscription.token)
            .bind(subscription.updated_at)
            .bind(subscription.confirmed_at)
            .bind(subscription.unsubscribed_at)
            .fetch_one(&mut transaction)
            .await?;

        transaction.commit().await?;

        subscription_from_row(&row)
    }
}

#[async_trait]
impl SubscriptionStore for PostgresStore {
    #[tracing::instrument(
        name = "Insert a new subscription into the database",
        skip(self, new_subscription, token)
    )]
    async fn insert(
        &self,
        new_subscription: &NewSubscription,
        token: &str,
    ) -> Result<Subscription, StoreError> {
        let query = format!(
            r#"
            INSERT INTO subscriptions (id, email, status, source, tags, metadata, token, created_at, updated_at)
            VALUES ($1, $2, 'pending', $3, $4, $5, $6, $7, $7)
            RETURNING {}
            "#,
            SUBSCRIPTION_COLUMNS
        );
        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(new_subscription.email.as_ref())
            .bind(new_subscription.source.as_ref())
            .bind(tag_values(&new_subscription.tags))
            .bind(Json(&new_subscription.metadata))
            .bind(token)
            .bind(Utc::now())
            .fetch_one(&self.db_pool)
            .await
            .map_err(|err| {
                let is_duplicate = matches!(
                    &err,
                    sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
                );

                if is_duplicate {
                    return StoreError::Duplicate;
                }

                tracing::error!("Failed to execute query: {:?}", err);
                StoreError::Database(err)
            })?;

        subscription_from_row(&row)
    }

    #[tracing::instrument(name = "Find a subscription by email", skip(self))]
    async fn find_by_email(
        &self,
        email: &SubscriberEmail,
    ) -> Result<Option<Subscription>, StoreError> {
        self.find_one("email", email.as_ref()).await
    }

    #[tracing::instrument(name = "Find a subscription by token", skip_all)]
    async fn find_by_token(&self, token: &str) -> Result<Option<Subscription>, StoreError> {
        self.find_one("token", token).await
    }

    #[tracing::instrument(name = "Update a subscription status", skip(self))]
    async fn update_status(
        &self,
        id: Uuid,
        status: SubscriptionStatus,
    ) -> Result<Subscription, StoreError> {
        self.modify(id, |subscription| {
            subscription.transition_to(status, Utc::now())?;
            Ok(())
        })
        .await
    }

    #[tracing::instrument(
        name = "Resubscribe an unsubscribed email",
        skip(self, new_subscription, token)
    )]
    async fn resubscribe(
        &self,
        id: Uuid,
        new_subscription: &NewSubscription,
        token: &str,
    ) -> Result<Subscription, StoreError> {
        self.modify(id, |subscription| {
            subscription.transition_to(SubscriptionStatus::Pending, Utc::now())?;
            subscription.source = new_subscription.source.clone();
            subscription.tags = new_subscription.tags.clone();
            subscription.metadata = new_subscription.metadata.clone();
            subscription.token = token.to_string();
            Ok(())
        })
        .await
    }

    #[tracing::instrument(name = "List subscriptions by status", skip(self))]
    async fn list_by_status(
        &self,
        status: SubscriptionStatus,
    ) -> Result<Vec<Subscription>, StoreError> {
        let query = format!(
            "SELECT {} FROM subscriptions WHERE status = $1 ORDER BY created_at",
            SUBSCRIPTION_COLUMNS
        );

        sqlx::query(&query)
            .bind(status.as_ref())
            .fetch_all(&self.db_pool)
            .await?
            .iter()
            .map(subscription_from_row)
            .collect()
    }

    #[tracing::instrument(name = "Compute subscriber statistics", skip(self))]
    async fn stats(&self, now: DateTime<Utc>) -> Result<SubscriberStats, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT status, source,
                   COUNT(*) AS count,
                   COUNT(*) FILTER (WHERE created_at >= $1) AS recent
            FROM subscriptions
            GROUP BY status, source
            "#,
        )
        .bind(now - Duration::hours(24))
        .fetch_all(&self.db_pool)
        .await?;

        let mut stats = SubscriberStats::default();

        for row in rows {
            let status = SubscriptionStatus::parse(row.try_get("status")?)
                .map_err(StoreError::InvalidRecord)?;
            let source: String = row.try_get("source")?;
            let count: i64 = row.try_get("count")?;
            let recent: i64 = row.try_get("recent")?;

            stats.record_status(status, count);
            *stats.by_source.entry(source).or_insert(0) += count;
            stats.last_24_hours += recent;
        }

        Ok(stats)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.db_pool).await?;

        Ok(())
    }
}

fn tag_values(tags: &[SubscriptionTag]) -> Vec<String> {
    tags.iter().map(|tag| tag.as_ref().to_string()).collect()
}

fn subscription_from_row(row: &PgRow) -> Result<Subscription, StoreError> {
    let tags: Vec<String> = row.try_get("tags")?;
    let Json(metadata): Json<serde_json::Value> = row.try_get("metadata")?;

    Ok(Subscription {
        id: row.try_get("id")?,
        email: SubscriberEmail::parse(row.try_get("email")?).map_err(StoreError::InvalidRecord)?,
        status: SubscriptionStatus::parse(row.try_get("status")?)
            .map_err(StoreError::InvalidRecord)?,
        source: SubscriptionSource::parse(row.try_get("source")?)
            .map_err(StoreError::InvalidRecord)?,
        tags: tags
            .into_iter()
            .map(SubscriptionTag::parse)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::InvalidRecord)?,
        metadata,
        token: row.try_get("token")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        confirmed_at: row.try_get("confirmed_at")?,
        unsubscribed_at: row.try_get("unsubscribed_at")?,
    })
}
