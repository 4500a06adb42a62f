mod email_events;
mod health_check;
mod newsletters;
mod site;
mod stats;
mod subscription_links;
mod subscriptions;

pub use email_events::*;
pub use health_check::*;
pub use newsletters::*;
pub use site::*;
pub use stats::*;
pub use subscription_links::*;
pub use subscriptions::*;

use actix_web::{http::header, HttpRequest};
use secrecy::{ExposeSecret, Secret};

/// Checks the `Authorization: Bearer <key>` header against the admin API key.
pub fn is_admin_request(request: &HttpRequest, admin_api_key: &Secret<String>) -> bool {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|key| key.trim() == admin_api_key.expose_secret())
        .unwrap_or(false)
}
