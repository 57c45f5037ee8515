//! Concepts and SNOMED CT identifiers.
//!
//! A [`Concept`] is the atomic vocabulary entry handed around by the cohort builder. The same
//! `{code, display}` shape is used for SNOMED CT concepts and for the demographic category
//! codes (gender, ethnicity), so `code` is a plain string here. [`ConceptId`] is the strict
//! SCTID form used where a real SNOMED CT concept identifier is required.

use crate::{SnomedError, SnomedResult};
use serde::{Deserialize, Serialize};

const TERM_BROWSER_URL: &str = "https://termbrowser.nhs.uk/?perspective=full&conceptId1=";

/// An atomic vocabulary entry: a code and its human-readable display.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Concept {
    pub code: String,
    pub display: String,
}

impl Concept {
    pub fn new(code: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            display: display.into(),
        }
    }

    /// Link to this concept in the NHS terminology browser.
    pub fn browser_url(&self) -> String {
        format!("{TERM_BROWSER_URL}{}", self.code)
    }
}

impl std::fmt::Display for Concept {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} |{}|", self.code, self.display)
    }
}

/// A validated SNOMED CT concept identifier.
///
/// An SCTID is 6 to 18 decimal digits with no leading zero. The two digits before the final
/// check digit are the partition identifier, which must be `00` (short format) or `10`
/// (long format) for a concept. The final digit is a Verhoeff check digit.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConceptId(String);

impl ConceptId {
    /// Parses and validates an SCTID.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SnomedError::InvalidConceptId`] if the input is not a well-formed concept SCTID.
    pub fn parse(input: &str) -> SnomedResult<Self> {
        let code = input.trim();
        let invalid = |reason: &str| SnomedError::InvalidConceptId(format!("{code:?}: {reason}"));

        if !(6..=18).contains(&code.len()) {
            return Err(invalid("must be 6 to 18 digits"));
        }
        if !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid("must contain only digits"));
        }
        if code.starts_with('0') {
            return Err(invalid("must not start with 0"));
        }

        let partition = &code[code.len() - 3..code.len() - 1];
        if partition != "00" && partition != "10" {
            return Err(invalid("partition identifier is not a concept partition"));
        }
        if !verhoeff_valid(code) {
            return Err(invalid("check digit mismatch"));
        }

        Ok(Self(code.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConceptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConceptId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

const VERHOEFF_D: [[u8; 10]; 10] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 2, 3, 4, 0, 6, 7, 8, 9, 5],
    [2, 3, 4, 0, 1, 7, 8, 9, 5, 6],
    [3, 4, 0, 1, 2, 8, 9, 5, 6, 7],
    [4, 0, 1, 2, 3, 9, 5, 6, 7, 8],
    [5, 9, 8, 7, 6, 0, 4, 3, 2, 1],
    [6, 5, 9, 8, 7, 1, 0, 4, 3, 2],
    [7, 6, 5, 9, 8, 2, 1, 0, 4, 3],
    [8, 7, 6, 5, 9, 3, 2, 1, 0, 4],
    [9, 8, 7, 6, 5, 4, 3, 2, 1, 0],
];

const VERHOEFF_P: [[u8; 10]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9],
    [1, 5, 7, 6, 2, 8, 3, 0, 9, 4],
    [5, 8, 0, 3, 7, 9, 6, 1, 4, 2],
    [8, 9, 1, 6, 0, 4, 3, 5, 2, 7],
    [9, 4, 5, 3, 1, 2, 6, 8, 7, 0],
    [4, 2, 8, 6, 5, 7, 3, 9, 0, 1],
    [2, 7, 9, 3, 8, 0, 6, 4, 1, 5],
    [7, 0, 4, 6, 9, 1, 3, 2, 5, 8],
];

/// Caller guarantees `digits` is ASCII digits only.
fn verhoeff_valid(digits: &str) -> bool {
    let check = digits
        .bytes()
        .rev()
        .enumerate()
        .fold(0u8, |c, (i, b)| {
            let digit = usize::from(b - b'0');
            VERHOEFF_D[usize::from(c)][usize::from(VERHOEFF_P[i % 8][digit])]
        });
    check == 0
}
