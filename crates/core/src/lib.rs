//! # Cohort Core
//!
//! Terminology-criterion selection and cohort-definition assembly.
//!
//! This crate contains the engine behind the cohort builder form:
//! - [`TerminologySearch`]: vocabulary lookups under a root concept, last-issued-wins
//! - [`DescendantExpander`]: one-shot self-plus-descendant expansion per chosen concept
//! - [`CriterionSet`]: deduplicated must-have / must-not-have criteria
//! - [`CohortDefinitionBuilder`]: folds demographics and criteria into the submission payload
//! - [`CohortSubmitter`]: the submit state machine
//! - [`CohortForm`]: the form state tying the above together
//!
//! **No transport concerns**: HTTP lives in `cohort-client` (outgoing) and `api-rest` (the
//! terminology proxy). The engine talks to them through [`TerminologyService`] and
//! [`CohortBackend`].

pub mod config;
pub mod constants;
pub mod criteria;
pub mod definition;
pub mod error;
pub mod expand;
pub mod form;
pub mod results;
pub mod search;
pub mod selection;
pub mod service;
pub mod submit;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::CohortConfig;
pub use criteria::{CriteriaSummary, Criterion, CriterionId, CriterionSet, Polarity};
pub use definition::{
    AgeRange, CategoryFilter, CohortDefinition, CohortDefinitionBuilder, Demographics,
    FoldedCriterion, TimeRange,
};
pub use error::{CohortError, CohortResult};
pub use expand::{DescendantExpander, DescendantExpansion, ExpansionResponse, ExpansionTicket};
pub use form::{CohortForm, FormSummary};
pub use results::CohortResults;
pub use search::{SearchResponse, SearchTicket, TerminologySearch};
pub use selection::{ExpansionStatus, Selection};
pub use service::{CohortBackend, TerminologyService};
pub use submit::{CohortSubmitter, SubmitOutcome, SubmitResponse, SubmitState, SubmitTicket};

pub use snomed::{Concept, ConceptId};
