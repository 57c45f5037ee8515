//! Client for the upstream FHIR terminology server.

use crate::config::ProxyConfig;
use crate::{ProxyError, ProxyResult};
use snomed::{Ecl, Expansion, ValueSetExpansion};
use std::sync::Arc;
use std::time::Duration;

const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs `ValueSet/$expand` against the configured FHIR server.
#[derive(Clone, Debug)]
pub struct FhirTerminology {
    http: reqwest::Client,
    cfg: Arc<ProxyConfig>,
}

impl FhirTerminology {
    /// # Errors
    ///
    /// Returns [`ProxyError::Upstream`] if the HTTP client cannot be constructed.
    pub fn new(cfg: Arc<ProxyConfig>) -> ProxyResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .build()?;
        Ok(Self { http, cfg })
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.cfg
    }

    /// Expand the implicit value set for `ecl`, optionally filtered by `filter`.
    ///
    /// A blank filter is not sent.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError`] on transport failure, a non-2xx status or an unreadable body.
    pub async fn expand(
        &self,
        ecl: &Ecl,
        filter: Option<&str>,
        count: Option<u32>,
    ) -> ProxyResult<Expansion> {
        let mut query = vec![("url", ecl.implicit_value_set_url())];
        if let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) {
            query.push(("filter", filter.to_string()));
        }
        if let Some(count) = count {
            query.push(("count", count.to_string()));
        }

        tracing::debug!(ecl = %ecl, ?filter, ?count, "expanding value set upstream");

        let response = self
            .http
            .get(self.cfg.expand_url())
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::UpstreamStatus(status.as_u16()));
        }

        let body = response.text().await?;
        Ok(ValueSetExpansion::parse(&body)?)
    }
}
