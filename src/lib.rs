pub mod cache;
pub mod config;
pub mod content;
pub mod domain;
pub mod email_client;
pub mod error;
pub mod rate_limit;
pub mod retry;
pub mod routes;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod triggers;
