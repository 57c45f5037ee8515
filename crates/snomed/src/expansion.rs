//! ValueSet expansion wire models and translation helpers.
//!
//! Both the upstream FHIR terminology server and the cohort builder's `/api/snomed/*` endpoints
//! answer with a ValueSet expansion. Parsing is lenient about *absence* and strict about *shape*:
//! - a missing `total` reads as 0
//! - a missing `contains` reads as an empty list
//! - a missing `display` falls back to the code
//! - unknown keys are ignored (FHIR resources carry many fields we do not use)
//! - wrong types are rejected with the path of the failing field
//!
//! A FHIR `OperationOutcome` in place of a ValueSet is reported as
//! [`SnomedError::OperationOutcome`].

use crate::concept::Concept;
use crate::{SnomedError, SnomedResult};
use serde::{Deserialize, Serialize};

// ============================================================================
// Public domain-level types
// ============================================================================

/// Domain-level carrier for a ValueSet expansion.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Total number of concepts in the expansion, as reported by the server.
    pub total: u64,

    /// Concepts returned in this response, in server order.
    pub contains: Vec<Concept>,
}

// ============================================================================
// Public ValueSetExpansion operations
// ============================================================================

/// ValueSet expansion operations.
///
/// Zero-sized namespace for parse/render, in the same shape as the other wire facades.
pub struct ValueSetExpansion;

impl ValueSetExpansion {
    /// Parse a ValueSet expansion from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`SnomedError`] if:
    /// - the text is not JSON or a field has an unexpected type ([`SnomedError::Translation`]),
    /// - the resource is an `OperationOutcome`,
    /// - the `expansion` element is missing.
    pub fn parse(json_text: &str) -> SnomedResult<Expansion> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);

        let wire = match serde_path_to_error::deserialize::<_, ValueSetWire>(&mut deserializer) {
            Ok(parsed) => parsed,
            Err(err) => {
                let path = err.path().to_string();
                let source = err.into_inner();
                let path = if path.is_empty() || path == "." {
                    "<root>"
                } else {
                    path.as_str()
                };
                return Err(SnomedError::Translation(format!(
                    "ValueSet schema mismatch at {path}: {source}"
                )));
            }
        };

        if wire.resource_type.as_deref() == Some("OperationOutcome") {
            let diagnostics = wire
                .issue
                .iter()
                .filter_map(|issue| issue.diagnostics.as_deref())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(SnomedError::OperationOutcome(if diagnostics.is_empty() {
                "no diagnostics".into()
            } else {
                diagnostics
            }));
        }

        let expansion = wire.expansion.ok_or_else(|| {
            SnomedError::Translation("ValueSet response has no expansion element".into())
        })?;

        Ok(wire_to_domain(expansion))
    }

    /// Render an expansion as `{"expansion": {"total": .., "contains": [..]}}`.
    ///
    /// # Errors
    ///
    /// Returns [`SnomedError::InvalidJson`] if serialisation fails.
    pub fn render(expansion: &Expansion) -> SnomedResult<String> {
        let wire = ValueSetWire {
            resource_type: None,
            expansion: Some(domain_to_wire(expansion)),
            issue: Vec::new(),
        };
        Ok(serde_json::to_string(&wire)?)
    }
}

// ============================================================================
// Wire types (internal)
// ============================================================================

#[derive(Clone, Debug, Deserialize, Serialize)]
struct ValueSetWire {
    #[serde(
        rename = "resourceType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expansion: Option<ExpansionWire>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issue: Vec<IssueWire>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct ExpansionWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<Vec<ContainsWire>>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct ContainsWire {
    pub code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
struct IssueWire {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<String>,
}

// ============================================================================
// Helper functions (internal)
// ============================================================================

fn wire_to_domain(wire: ExpansionWire) -> Expansion {
    let contains = wire
        .contains
        .unwrap_or_default()
        .into_iter()
        .map(|c| {
            let display = c.display.unwrap_or_else(|| c.code.clone());
            Concept {
                code: c.code,
                display,
            }
        })
        .collect();

    Expansion {
        total: wire.total.unwrap_or(0),
        contains,
    }
}

fn domain_to_wire(expansion: &Expansion) -> ExpansionWire {
    ExpansionWire {
        total: Some(expansion.total),
        contains: Some(
            expansion
                .contains
                .iter()
                .map(|c| ContainsWire {
                    code: c.code.clone(),
                    display: Some(c.display.clone()),
                })
                .collect(),
        ),
    }
}
