pub mod new_subscription;
pub mod subscriber_email;
pub mod subscriber_stats;
pub mod subscription;
pub mod subscription_source;
pub mod subscription_status;
