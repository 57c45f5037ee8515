//! SNOMED CT wire/boundary support for the cohort builder.
//!
//! This crate provides **wire models** and **format/translation helpers** for the terminology
//! payloads exchanged with a FHIR terminology server and with the cohort builder's own
//! `/api/snomed/*` endpoints:
//! - ValueSet `$expand` responses (`{ expansion: { total, contains } }`)
//! - Expression Constraint Language (ECL) fragments used to build implicit value sets
//! - SNOMED CT concept identifiers (SCTIDs)
//!
//! This crate focuses on:
//! - serialisation/deserialisation
//! - translation between domain primitives and wire structs
//!
//! It performs no I/O. HTTP transport lives in `cohort-client` and `api-rest`.

pub mod concept;
pub mod ecl;
pub mod expansion;

// Re-export facades
pub use expansion::ValueSetExpansion;

// Re-export public domain-level types
pub use concept::{Concept, ConceptId};
pub use ecl::Ecl;
pub use expansion::Expansion;

/// SNOMED CT code system URI.
pub const SNOMED_SYSTEM: &str = "http://snomed.info/sct";

/// Root concept for clinical findings and disorders (`404684003 |Clinical finding|`).
pub const CLINICAL_FINDING_ROOT: &str = "404684003";

/// Root concept for procedures (`71388002 |Procedure|`).
pub const PROCEDURE_ROOT: &str = "71388002";

/// Errors returned by the `snomed` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum SnomedError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("terminology server reported an error: {0}")]
    OperationOutcome(String),

    #[error("invalid SNOMED CT identifier: {0}")]
    InvalidConceptId(String),
}

/// Type alias for Results that can fail with a [`SnomedError`].
pub type SnomedResult<T> = Result<T, SnomedError>;
