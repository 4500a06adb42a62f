use actix_web::{web, HttpResponse, Responder};

use crate::store::SubscriptionStore;

/// Endpoint used by clients to know if the server is working
#[tracing::instrument(name = "Health Check handler", skip(store))]
pub async fn health_check(store: web::Data<dyn SubscriptionStore>) -> impl Responder {
    match store.ping().await {
        Ok(()) => HttpResponse::Ok().finish(),
        Err(err) => {
            tracing::error!("Subscription store is not reachable: {:?}", err);
            HttpResponse::ServiceUnavailable().finish()
        }
    }
}
