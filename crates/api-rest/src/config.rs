//! Proxy configuration.
//!
//! Resolved once at startup from the environment and passed into [`crate::AppState`].

use crate::{ProxyError, ProxyResult};

/// Default bind address for the REST server.
pub const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyConfig {
    fhir_api_url: String,
    search_limit: Option<u32>,
}

impl ProxyConfig {
    /// Create a new `ProxyConfig`.
    ///
    /// `search_limit` caps the concepts returned by the search routes. `None` leaves the server
    /// default. Descendant expansion is never capped, since its `total` must match `contains`.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::InvalidConfig`] if `fhir_api_url` is empty, not `http(s)://`, or the
    /// limit is zero.
    pub fn new(fhir_api_url: impl Into<String>, search_limit: Option<u32>) -> ProxyResult<Self> {
        let fhir_api_url = fhir_api_url.into().trim().trim_end_matches('/').to_string();

        if fhir_api_url.is_empty() {
            return Err(ProxyError::InvalidConfig(
                "FHIR_API_URL cannot be empty".into(),
            ));
        }
        if !(fhir_api_url.starts_with("http://") || fhir_api_url.starts_with("https://")) {
            return Err(ProxyError::InvalidConfig(format!(
                "FHIR_API_URL must start with http:// or https://, got {fhir_api_url}"
            )));
        }
        if search_limit == Some(0) {
            return Err(ProxyError::InvalidConfig(
                "search limit must be greater than zero".into(),
            ));
        }

        Ok(Self {
            fhir_api_url,
            search_limit,
        })
    }

    pub fn fhir_api_url(&self) -> &str {
        &self.fhir_api_url
    }

    pub fn search_limit(&self) -> Option<u32> {
        self.search_limit
    }

    /// URL of the `ValueSet/$expand` operation on the upstream server.
    pub fn expand_url(&self) -> String {
        format!("{}/ValueSet/$expand", self.fhir_api_url)
    }
}

/// Parse an optional limit from an environment variable value.
///
/// Unset or blank means no limit.
///
/// # Errors
///
/// Returns [`ProxyError::InvalidConfig`] naming `var` if the value is not a positive integer.
pub fn limit_from_env_value(var: &str, value: Option<String>) -> ProxyResult<Option<u32>> {
    let Some(raw) = value else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<u32>() {
        Ok(0) | Err(_) => Err(ProxyError::InvalidConfig(format!(
            "{var} must be a positive integer, got {raw}"
        ))),
        Ok(n) => Ok(Some(n)),
    }
}
