use actix_web::{http::StatusCode, web, HttpRequest, HttpResponse, ResponseError};
use chrono::Utc;

use crate::{
    cache::{ResponseCache, JSON},
    error::{error_chain_fmt, ErrorCode, ErrorResponse},
    store::{StoreError, SubscriptionStore},
};

pub const STATS_CACHE_KEY: &str = "/api/stats";

#[derive(thiserror::Error)]
pub enum StatsError {
    #[error("Failed to compute subscriber statistics.")]
    StoreError(#[from] StoreError),
    #[error("Failed to serialize subscriber statistics.")]
    SerializeError(#[from] serde_json::Error),
}

impl std::fmt::Debug for StatsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for StatsError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        ErrorResponse::new(ErrorCode::DatabaseError, self.to_string()).respond(self.status_code())
    }
}

#[tracing::instrument(name = "Subscriber statistics handler", skip(request, store, cache))]
pub async fn subscriber_stats(
    request: HttpRequest,
    store: web::Data<dyn SubscriptionStore>,
    cache: web::Data<ResponseCache>,
) -> Result<HttpResponse, StatsError> {
    let page = cache
        .get_or_render(STATS_CACHE_KEY, JSON, || async {
            let stats = store.stats(Utc::now()).await?;

            Ok::<_, StatsError>(serde_json::to_string(&stats)?)
        })
        .await?;

    Ok(page.respond(&request, cache.ttl()))
}
