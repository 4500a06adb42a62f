use chrono::{DateTime, Utc};
use config::{Config, ConfigError, File};
use secrecy::{ExposeSecret, Secret};
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    ConnectOptions, PgPool,
};
use std::time;

use crate::domain::subscriber_email::SubscriberEmail;
use crate::retry::RetryPolicy;

#[derive(Debug)]
pub enum Environment {
    Development,
    Production,
}

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub email_client: EmailClientSettings,
    pub rate_limit: RateLimitSettings,
    pub retry: RetrySettings,
    pub cache: CacheSettings,
    pub site: SiteSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub base_url: String,
    // Bearer token required to publish newsletters
    pub admin_api_key: Secret<String>,
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    Postgres,
    Memory,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub backend: DatabaseBackend,
    pub username: String,
    // secrecy protects secret information and prevents them to be exposed (eg: via logs)
    pub password: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub name: String,
    pub require_ssl: bool,
}

#[derive(serde::Deserialize, Clone)]
pub struct EmailClientSettings {
    pub base_url: String,
    pub sender_email: String,
    pub api_key: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub timeout_milliseconds: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct RateLimitSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_requests: usize,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub window_seconds: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct RetrySettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_attempts: u32,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub base_delay_milliseconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub max_delay_milliseconds: u64,
}

#[derive(serde::Deserialize, Clone)]
pub struct CacheSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub ttl_seconds: u64,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct SiteSettings {
    pub title: String,
    pub description: String,
    pub launch_date: DateTime<Utc>,
    pub timeline_path: String,
}

impl Settings {
    pub fn get_address(&self) -> String {
        format!(
            "{}:{}",
            self.application.get_host(),
            self.application.get_port()
        )
    }

    pub fn get_app_base_url(&self) -> String {
        self.application.get_base_url()
    }

    pub fn get_email_client_sender(&self) -> Result<SubscriberEmail, String> {
        self.email_client.get_sender_email()
    }

    pub fn set_email_client_base_url(&mut self, new_base_url: String) {
        self.email_client.set_base_url(new_base_url)
    }

    pub fn set_app_port(&mut self, port: u16) {
        self.application.port = port;
    }
}

impl DatabaseSettings {
    /// Options to reach the Postgres server without selecting a database, e.g. to create one.
    pub fn get_server_options(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };

        PgConnectOptions::new()
            .host(&self.host)
            .password(self.password.expose_secret())
            .username(&self.username)
            .port(self.port)
            .ssl_mode(ssl_mode)
    }

    pub fn get_db_options(&self) -> PgConnectOptions {
        let mut db_options = self.get_server_options().database(&self.name);

        db_options.log_statements(log::LevelFilter::Trace);

        db_options
    }

    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }

    pub fn get_connection_pool(&self) -> PgPool {
        PgPoolOptions::new()
            .acquire_timeout(time::Duration::from_secs(2))
            .connect_lazy_with(self.get_db_options())
    }
}

impl ApplicationSettings {
    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn get_host(&self) -> String {
        self.host.clone()
    }

    pub fn get_base_url(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }
}

impl EmailClientSettings {
    pub fn get_sender_email(&self) -> Result<SubscriberEmail, String> {
        SubscriberEmail::parse(self.sender_email.clone())
    }

    pub fn get_timeout(&self) -> time::Duration {
        time::Duration::from_millis(self.timeout_milliseconds)
    }

    pub fn set_base_url(&mut self, new_base_url: String) {
        self.base_url = new_base_url
    }
}

impl RateLimitSettings {
    pub fn get_window(&self) -> time::Duration {
        time::Duration::from_secs(self.window_seconds)
    }
}

impl RetrySettings {
    pub fn get_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: time::Duration::from_millis(self.base_delay_milliseconds),
            max_delay: time::Duration::from_millis(self.max_delay_milliseconds),
        }
    }
}

impl CacheSettings {
    pub fn get_ttl(&self) -> time::Duration {
        time::Duration::from_secs(self.ttl_seconds)
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "development" => Ok(Self::Development),
            "production" => Ok(Self::Production),
            unknown_env => Err(format!(
                "{} is not supported environment. Use either 'development' or 'production'.",
                unknown_env
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let root_path = std::env::current_dir().map_err(|err| {
        ConfigError::Message(format!(
            "Failed to determine the current directory: {}",
            err
        ))
    })?;
    let config_directory = root_path.join("config");
    // Uses development environment by default
    let enviroment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "development".into())
        .try_into()
        .map_err(ConfigError::Message)?;
    let config_base_filepath = config_directory.join("base");
    let config_env_filepath = config_directory.join(enviroment.as_str());

    // It merges the base configuration file with the one from the specific environment (development or production)
    let settings = Config::builder()
        .add_source(File::from(config_base_filepath).required(true))
        .add_source(File::from(config_env_filepath).required(true))
        // Merge settings from environment variables with a prefix of APP and "__" separator
        // E.g APP_APPLICATION__PORT would set Settings.application.port
        .add_source(config::Environment::with_prefix("app").separator("__"))
        .build()?;

    tracing::info!("Application environment = {:?}", enviroment);

    // Try to convert the value from the configuration file into a Settings type
    settings.try_deserialize()
}
