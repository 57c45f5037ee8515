//! Expression Constraint Language fragments.
//!
//! Only the two hierarchy operators the cohort builder needs are modelled:
//! `<<` (descendants or self) and `<` (descendants only). Arbitrary expressions from callers are
//! passed through after a non-empty check. See <https://snomed.org/ecl>.

use crate::concept::ConceptId;
use crate::{SnomedError, SnomedResult, SNOMED_SYSTEM};

/// An ECL expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ecl(String);

impl Ecl {
    /// `<<code`: the concept and all of its descendants.
    pub fn descendants_or_self(code: &ConceptId) -> Self {
        Self(format!("<<{code}"))
    }

    /// `<code`: strict descendants of the concept.
    pub fn descendants(code: &ConceptId) -> Self {
        Self(format!("<{code}"))
    }

    /// Wraps a caller-supplied expression.
    ///
    /// # Errors
    ///
    /// Returns [`SnomedError::InvalidInput`] if the expression is empty or whitespace.
    pub fn parse(raw: &str) -> SnomedResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SnomedError::InvalidInput("ECL expression cannot be empty".into()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Implicit value set URL for this expression, as accepted by `ValueSet/$expand?url=`.
    pub fn implicit_value_set_url(&self) -> String {
        format!("{SNOMED_SYSTEM}?fhir_vs=ecl/{}", self.0)
    }
}

impl std::fmt::Display for Ecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
