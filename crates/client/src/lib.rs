//! # Cohort Client
//!
//! HTTP implementation of the cohort engine's service traits.
//!
//! Talks to the cohort builder API:
//! - `GET  /api/snomed/search?ecl=<<{root}&term={term}`
//! - `GET  /api/snomed/count-descendants-and-self?code={code}`
//! - `POST /api/cohort/select`
//!
//! Every failure (transport error, non-2xx status, undecodable body) is returned as a
//! [`CohortError`]. Deciding whether it is surfaced or swallowed is the engine's job.

#![warn(rust_2018_idioms)]

use async_trait::async_trait;
use cohort_core::constants::{COHORT_SELECT_PATH, COUNT_DESCENDANTS_PATH, SEARCH_PATH};
use cohort_core::{
    CohortBackend, CohortConfig, CohortDefinition, CohortError, CohortResult, CohortResults,
    TerminologyService,
};
use snomed::{Concept, ConceptId, Ecl, Expansion, ValueSetExpansion};
use std::sync::Arc;
use std::time::Duration;

/// Timeout applied to every request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for the cohort builder API. Cheap to clone.
#[derive(Clone, Debug)]
pub struct HttpCohortClient {
    http: reqwest::Client,
    cfg: Arc<CohortConfig>,
}

impl HttpCohortClient {
    /// # Errors
    ///
    /// Returns [`CohortError::Transport`] if the HTTP client cannot be constructed.
    pub fn new(cfg: Arc<CohortConfig>) -> CohortResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(transport)?;
        Ok(Self { http, cfg })
    }

    pub fn config(&self) -> &CohortConfig {
        &self.cfg
    }

    async fn read_body(response: reqwest::Response) -> CohortResult<String> {
        let status = response.status();
        if !status.is_success() {
            tracing::debug!(%status, url = %response.url(), "unexpected response status");
            return Err(CohortError::UnexpectedStatus(status.as_u16()));
        }
        response.text().await.map_err(transport)
    }

    async fn get_expansion(&self, path: &str, query: &[(&str, &str)]) -> CohortResult<Expansion> {
        let response = self
            .http
            .get(self.cfg.endpoint(path))
            .query(query)
            .send()
            .await
            .map_err(transport)?;
        let body = Self::read_body(response).await?;
        Ok(ValueSetExpansion::parse(&body)?)
    }
}

#[async_trait]
impl TerminologyService for HttpCohortClient {
    async fn search(&self, root: &ConceptId, term: &str) -> CohortResult<Vec<Concept>> {
        let ecl = Ecl::descendants_or_self(root);
        let expansion = self
            .get_expansion(SEARCH_PATH, &[("ecl", ecl.as_str()), ("term", term)])
            .await?;
        Ok(expansion.contains)
    }

    async fn count_descendants_and_self(&self, code: &str) -> CohortResult<Expansion> {
        self.get_expansion(COUNT_DESCENDANTS_PATH, &[("code", code)])
            .await
    }
}

#[async_trait]
impl CohortBackend for HttpCohortClient {
    async fn select(&self, definition: &CohortDefinition) -> CohortResult<CohortResults> {
        let response = self
            .http
            .post(self.cfg.endpoint(COHORT_SELECT_PATH))
            .json(definition)
            .send()
            .await
            .map_err(transport)?;
        let body = Self::read_body(response).await?;
        CohortResults::parse(&body)
    }
}

fn transport(e: reqwest::Error) -> CohortError {
    CohortError::Transport(Box::new(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use cohort_core::{
        CohortDefinitionBuilder, CohortSubmitter, CriterionSet, Demographics, Polarity,
        Selection, SubmitOutcome, TerminologySearch,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn spawn(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });
        format!("http://{addr}")
    }

    fn client(base_url: &str) -> HttpCohortClient {
        let root = ConceptId::parse("404684003").expect("valid sctid");
        let cfg = CohortConfig::new(base_url, root, false).expect("config");
        HttpCohortClient::new(Arc::new(cfg)).expect("client")
    }

    async fn search_handler(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        assert_eq!(params.get("ecl").map(String::as_str), Some("<<404684003"));
        match params.get("term").map(String::as_str) {
            Some("diabetes") => Json(json!({
                "expansion": {"contains": [{"code": "44054006", "display": "Diabetes mellitus"}]}
            })),
            _ => Json(json!({"expansion": {}})),
        }
    }

    async fn count_handler(Query(params): Query<HashMap<String, String>>) -> Json<Value> {
        let code = params.get("code").cloned().unwrap_or_default();
        Json(json!({
            "expansion": {
                "total": 2,
                "contains": [
                    {"code": code, "display": "Diabetes mellitus"},
                    {"code": "73211009", "display": "Diabetes mellitus type 1"}
                ]
            }
        }))
    }

    #[tokio::test]
    async fn search_sends_root_ecl_and_term() {
        let base = spawn(Router::new().route(SEARCH_PATH, get(search_handler))).await;
        let client = client(&base);
        let mut search = TerminologySearch::new(client.config().root_code().clone());

        let candidates = search.search(&client, "diabetes").await;
        assert_eq!(candidates, &[Concept::new("44054006", "Diabetes mellitus")]);

        let candidates = search.search(&client, "nothing").await;
        assert!(candidates.is_empty());
    }

    #[tokio::test]
    async fn count_descendants_reads_total_and_contains() {
        let base = spawn(Router::new().route(COUNT_DESCENDANTS_PATH, get(count_handler))).await;
        let client = client(&base);

        let expansion = client
            .count_descendants_and_self("44054006")
            .await
            .expect("expansion");
        assert_eq!(expansion.total, 2);
        assert_eq!(expansion.contains[0].code, "44054006");
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let app = Router::new().route(
            SEARCH_PATH,
            get(|| async { (StatusCode::BAD_GATEWAY, "upstream down") }),
        );
        let client = client(&spawn(app).await);
        let root = client.config().root_code().clone();

        let err = client.search(&root, "x").await.expect_err("502");
        assert!(matches!(err, CohortError::UnexpectedStatus(502)));
    }

    #[tokio::test]
    async fn connection_failure_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let client = client(&format!("http://{addr}"));
        let err = client
            .count_descendants_and_self("44054006")
            .await
            .expect_err("nothing listening");
        assert!(matches!(err, CohortError::Transport(_)));
    }

    #[tokio::test]
    async fn submit_posts_definition_and_parses_results() {
        let app = Router::new().route(
            COHORT_SELECT_PATH,
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["gender"], json!("ALL"));
                assert_eq!(body["mustHave"][0]["concept"]["code"], json!("44054006"));
                Json(json!({
                    "title": body["title"],
                    "total_patients": 42,
                    "genderCounts": [{"gender": "Female", "count": 42}]
                }))
            }),
        );
        let client = client(&spawn(app).await);

        let mut criteria = CriterionSet::new();
        criteria.add(
            Selection::new(Concept::new("44054006", "Diabetes mellitus"), false),
            Polarity::MustHave,
        );
        let demographics = Demographics {
            title: "T2DM".into(),
            ..Demographics::default()
        };
        let definition = CohortDefinitionBuilder::build(&demographics, &criteria).expect("build");

        let mut submitter = CohortSubmitter::new();
        match submitter.submit(&client, definition).await.expect("submit") {
            SubmitOutcome::Succeeded(results) => {
                assert_eq!(results.title, "T2DM");
                assert_eq!(results.total_patients, 42);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_results_fail_the_submission() {
        let app = Router::new().route(COHORT_SELECT_PATH, post(|| async { "not json" }));
        let client = client(&spawn(app).await);
        let definition = CohortDefinitionBuilder::build(&Demographics::default(), &CriterionSet::new())
            .expect("build");

        let outcome = CohortSubmitter::new()
            .submit(&client, definition)
            .await
            .expect("submit");
        assert!(matches!(
            outcome,
            SubmitOutcome::Failed(CohortError::MalformedResponse(_))
        ));
    }
}
