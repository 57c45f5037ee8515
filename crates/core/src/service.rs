//! Service seams between the engine and its transport.
//!
//! The engine never performs I/O itself. `cohort-client` implements these traits over HTTP;
//! tests use in-memory fakes.

use crate::definition::CohortDefinition;
use crate::results::CohortResults;
use crate::CohortResult;
use async_trait::async_trait;
use snomed::{Concept, ConceptId, Expansion};

/// Vocabulary lookups against the terminology endpoints.
#[async_trait]
pub trait TerminologyService: Send + Sync {
    /// Concepts under `<<root` matching `term`.
    async fn search(&self, root: &ConceptId, term: &str) -> CohortResult<Vec<Concept>>;

    /// Total and full list of `code` plus all of its descendants.
    async fn count_descendants_and_self(&self, code: &str) -> CohortResult<Expansion>;
}

/// Cohort submission endpoint.
#[async_trait]
pub trait CohortBackend: Send + Sync {
    async fn select(&self, definition: &CohortDefinition) -> CohortResult<CohortResults>;
}
