use fan_site::config::get_configuration;
use fan_site::startup::{Application, ApplicationError};
use fan_site::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> Result<(), ApplicationError> {
    let subscriber = get_subscriber(
        String::from("fan_site"),
        String::from("info"),
        std::io::stdout,
    );

    init_subscriber(subscriber);

    let config =
        get_configuration().map_err(|err| ApplicationError::Configuration(err.to_string()))?;
    let application = Application::build(config).await?;

    tracing::info!("Server listening on port {}", application.get_port());

    application.run_until_stop().await?;

    Ok(())
}
