use service_core::observability::logging::init_tracing;
use transfer_service::{config::TransferConfig, services::metrics::init_metrics, Application};

#[tokio::main]
async fn main() -> Result<(), service_core::error::AppError> {
    // Fail fast on invalid configuration
    let config = TransferConfig::from_env()?;

    init_tracing(
        &config.service_name,
        &config.log_level,
        config.otlp_endpoint.as_deref(),
    );
    init_metrics();

    let service_span = tracing::info_span!(
        "service",
        service = %config.service_name,
        version = %config.service_version,
        environment = ?config.environment,
    );
    let _guard = service_span.enter();

    tracing::info!(
        ownership = ?config.transfers.ownership,
        session_ttl_hours = config.session.token_ttl_hours,
        "Starting transfer service"
    );

    let application = Application::build(config).await?;
    tracing::info!(port = application.port(), "Listening");
    application.run_until_stopped().await?;

    Ok(())
}
