use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::config::{limit_from_env_value, DEFAULT_REST_ADDR};
use api_rest::{router, AppState, FhirTerminology, ProxyConfig};

/// Main entry point for the cohort builder backend.
///
/// Serves the SNOMED CT terminology routes the cohort builder form depends on, and shuts down
/// cleanly on Ctrl-C.
///
/// # Environment Variables
/// - `COHORT_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `FHIR_API_URL`: Base URL of the FHIR terminology server (required)
/// - `SNOMED_SEARCH_LIMIT`: Maximum concepts returned by the search routes (optional)
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cohort_run=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("COHORT_REST_ADDR").unwrap_or_else(|_| DEFAULT_REST_ADDR.into());
    let fhir_api_url = std::env::var("FHIR_API_URL")
        .map_err(|_| anyhow::anyhow!("FHIR_API_URL must be set"))?;

    let cfg = ProxyConfig::new(
        fhir_api_url,
        limit_from_env_value("SNOMED_SEARCH_LIMIT", std::env::var("SNOMED_SEARCH_LIMIT").ok())?,
    )?;

    tracing::info!("++ Starting cohort REST on {}", rest_addr);
    tracing::info!("++ Terminology server {}", cfg.fhir_api_url());

    let app = router(AppState::new(FhirTerminology::new(Arc::new(cfg))?));

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- Cohort REST stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
