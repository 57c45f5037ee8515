//! # API REST
//!
//! SNOMED CT terminology proxy for the cohort builder.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - Forwarding to the FHIR `ValueSet/$expand` operation and re-rendering the expansion
//!
//! The cohort builder only ever sees `{expansion: {total, contains}}`; upstream FHIR detail
//! (`system`, `version`, `parameter`, ...) is dropped.

#![warn(rust_2018_idioms)]

pub mod config;
pub mod upstream;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use snomed::{ConceptId, Ecl, Expansion, CLINICAL_FINDING_ROOT, PROCEDURE_ROOT};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub use config::ProxyConfig;
pub use upstream::FhirTerminology;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    UpstreamStatus(u16),

    #[error(transparent)]
    Snomed(#[from] snomed::SnomedError),
}

pub type ProxyResult<T> = std::result::Result<T, ProxyError>;

/// Application state shared across REST API handlers.
#[derive(Clone)]
pub struct AppState {
    terminology: Arc<FhirTerminology>,
}

impl AppState {
    pub fn new(terminology: FhirTerminology) -> Self {
        Self {
            terminology: Arc::new(terminology),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConceptRes {
    pub code: String,
    pub display: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ExpansionBody {
    pub total: u64,
    pub contains: Vec<ConceptRes>,
}

/// Response of every terminology route.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ExpansionRes {
    pub expansion: ExpansionBody,
}

impl From<Expansion> for ExpansionRes {
    fn from(expansion: Expansion) -> Self {
        Self {
            expansion: ExpansionBody {
                total: expansion.total,
                contains: expansion
                    .contains
                    .into_iter()
                    .map(|c| ConceptRes {
                        code: c.code,
                        display: c.display,
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// ECL expression, e.g. `<<404684003`.
    pub ecl: String,
    /// Free-text filter on concept descriptions.
    #[serde(default)]
    pub term: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TermParams {
    #[serde(default)]
    pub term: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CodeParams {
    /// SNOMED CT concept id.
    pub code: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        search,
        search_findings,
        search_procedures,
        count_descendants_and_self,
    ),
    components(schemas(HealthRes, ConceptRes, ExpansionBody, ExpansionRes))
)]
pub struct ApiDoc;

/// Build the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/snomed/search", get(search))
        .route("/api/snomed/search-findings", get(search_findings))
        .route("/api/snomed/search-procedures", get(search_procedures))
        .route(
            "/api/snomed/count-descendants-and-self",
            get(count_descendants_and_self),
        )
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
async fn health() -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "Cohort terminology API is alive".into(),
    })
}

async fn expand(
    state: &AppState,
    ecl: &Ecl,
    term: Option<&str>,
    count: Option<u32>,
) -> Result<Json<ExpansionRes>, (StatusCode, &'static str)> {
    match state.terminology.expand(ecl, term, count).await {
        Ok(expansion) => Ok(Json(expansion.into())),
        Err(e) => {
            tracing::error!(ecl = %ecl, "terminology expansion error: {e}");
            Err((StatusCode::BAD_GATEWAY, "Terminology server error"))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/snomed/search",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching concepts", body = ExpansionRes),
        (status = 400, description = "Empty ECL expression"),
        (status = 502, description = "Terminology server error")
    )
)]
/// Search concepts matching an arbitrary ECL expression.
async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ExpansionRes>, (StatusCode, &'static str)> {
    let Ok(ecl) = Ecl::parse(&params.ecl) else {
        return Err((StatusCode::BAD_REQUEST, "Invalid ECL expression"));
    };
    let limit = state.terminology.config().search_limit();
    expand(&state, &ecl, params.term.as_deref(), limit).await
}

#[utoipa::path(
    get,
    path = "/api/snomed/search-findings",
    params(TermParams),
    responses(
        (status = 200, description = "Matching clinical findings", body = ExpansionRes),
        (status = 502, description = "Terminology server error")
    )
)]
/// Search strict descendants of Clinical finding.
async fn search_findings(
    State(state): State<AppState>,
    Query(params): Query<TermParams>,
) -> Result<Json<ExpansionRes>, (StatusCode, &'static str)> {
    search_under(&state, CLINICAL_FINDING_ROOT, params.term.as_deref()).await
}

#[utoipa::path(
    get,
    path = "/api/snomed/search-procedures",
    params(TermParams),
    responses(
        (status = 200, description = "Matching procedures", body = ExpansionRes),
        (status = 502, description = "Terminology server error")
    )
)]
/// Search strict descendants of Procedure.
async fn search_procedures(
    State(state): State<AppState>,
    Query(params): Query<TermParams>,
) -> Result<Json<ExpansionRes>, (StatusCode, &'static str)> {
    search_under(&state, PROCEDURE_ROOT, params.term.as_deref()).await
}

async fn search_under(
    state: &AppState,
    root: &str,
    term: Option<&str>,
) -> Result<Json<ExpansionRes>, (StatusCode, &'static str)> {
    let root = ConceptId::parse(root).map_err(|e| {
        tracing::error!("invalid root concept: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    })?;
    let limit = state.terminology.config().search_limit();
    expand(state, &Ecl::descendants(&root), term, limit).await
}

#[utoipa::path(
    get,
    path = "/api/snomed/count-descendants-and-self",
    params(CodeParams),
    responses(
        (status = 200, description = "The concept and its descendants", body = ExpansionRes),
        (status = 400, description = "Invalid SNOMED CT concept id"),
        (status = 502, description = "Terminology server error")
    )
)]
/// Expand a concept to itself plus all of its descendants.
async fn count_descendants_and_self(
    State(state): State<AppState>,
    Query(params): Query<CodeParams>,
) -> Result<Json<ExpansionRes>, (StatusCode, &'static str)> {
    let code = match ConceptId::parse(&params.code) {
        Ok(code) => code,
        Err(e) => {
            tracing::debug!("rejecting expansion request: {e}");
            return Err((StatusCode::BAD_REQUEST, "Invalid SNOMED CT concept id"));
        }
    };
    // Uncapped: a `count` would truncate `contains` while `total` still reports every descendant.
    expand(&state, &Ecl::descendants_or_self(&code), None, None).await
}
