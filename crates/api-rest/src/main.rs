//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the terminology proxy on its own, with OpenAPI/Swagger UI. Handy during development when
//! the cohort builder is pointed straight at this process.

use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::config::{limit_from_env_value, DEFAULT_REST_ADDR};
use api_rest::{router, AppState, FhirTerminology, ProxyConfig};

/// Main entry point for the terminology REST API server.
///
/// # Environment Variables
/// - `COHORT_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `FHIR_API_URL`: Base URL of the FHIR terminology server (required)
/// - `SNOMED_SEARCH_LIMIT`: optional cap on search results
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - required configuration is missing or invalid,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("COHORT_REST_ADDR").unwrap_or_else(|_| DEFAULT_REST_ADDR.into());

    let Ok(fhir_api_url) = std::env::var("FHIR_API_URL") else {
        anyhow::bail!("FHIR_API_URL must be set");
    };
    let cfg = ProxyConfig::new(
        fhir_api_url,
        limit_from_env_value("SNOMED_SEARCH_LIMIT", std::env::var("SNOMED_SEARCH_LIMIT").ok())?,
    )?;

    tracing::info!("-- Starting cohort terminology REST API on {}", addr);
    tracing::info!("-- Proxying to {}", cfg.fhir_api_url());

    let app = router(AppState::new(FhirTerminology::new(Arc::new(cfg))?));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
