//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into the client and the
//! form. Nothing in this crate reads environment variables during request handling; binaries
//! read them and hand the raw values to the `*_from_env_value` helpers below.

use crate::constants::{DEFAULT_API_URL, DEFAULT_ROOT_CODE};
use crate::{CohortError, CohortResult};
use snomed::ConceptId;

/// Cohort client configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CohortConfig {
    api_url: String,
    root_code: ConceptId,
    include_descendants_by_default: bool,
}

impl CohortConfig {
    /// Create a new `CohortConfig`.
    ///
    /// A trailing `/` on `api_url` is dropped so endpoint paths can be appended directly.
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::InvalidInput`] if `api_url` is empty or not an `http(s)://` URL.
    pub fn new(
        api_url: impl Into<String>,
        root_code: ConceptId,
        include_descendants_by_default: bool,
    ) -> CohortResult<Self> {
        let api_url = api_url.into();
        let api_url = api_url.trim().trim_end_matches('/').to_string();

        if api_url.is_empty() {
            return Err(CohortError::InvalidInput("api_url cannot be empty".into()));
        }
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(CohortError::InvalidInput(format!(
                "api_url must start with http:// or https://, got {api_url}"
            )));
        }

        Ok(Self {
            api_url,
            root_code,
            include_descendants_by_default,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub fn root_code(&self) -> &ConceptId {
        &self.root_code
    }

    pub fn include_descendants_by_default(&self) -> bool {
        self.include_descendants_by_default
    }

    /// Absolute URL for an endpoint path such as `/api/snomed/search`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}

/// Resolve the API base URL from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default local API URL.
pub fn api_url_from_env_value(value: Option<String>) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_API_URL.to_string())
}

/// Parse the search root concept from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the clinical finding root.
pub fn root_code_from_env_value(value: Option<String>) -> CohortResult<ConceptId> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| ConceptId::parse(&v)).transpose()?;

    match parsed {
        Some(code) => Ok(code),
        None => Ok(ConceptId::parse(DEFAULT_ROOT_CODE)?),
    }
}
