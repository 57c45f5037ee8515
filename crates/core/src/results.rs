//! Aggregate results returned by the cohort submission endpoint.
//!
//! Parsing is lenient about absence, matching what the results view tolerates: missing count
//! lists read as empty and a missing `total_patients` reads as 0. `topDiagnoses` has no fixed
//! shape and is kept as raw JSON.

use crate::{CohortError, CohortResult};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenderCount {
    pub gender: String,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeGroupCount {
    pub range: String,
    pub count: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EthnicityCount {
    pub ethnicity: String,
    pub count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CohortResults {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub total_patients: u64,

    #[serde(rename = "genderCounts", default)]
    pub gender_counts: Vec<GenderCount>,

    #[serde(rename = "ageGroups", default)]
    pub age_groups: Vec<AgeGroupCount>,

    #[serde(rename = "ethnicityCounts", default)]
    pub ethnicity_counts: Vec<EthnicityCount>,

    #[serde(
        rename = "uniqueDiagnoses",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub unique_diagnoses: Option<u64>,

    #[serde(rename = "minAge", default, skip_serializing_if = "Option::is_none")]
    pub min_age: Option<u32>,

    #[serde(rename = "maxAge", default, skip_serializing_if = "Option::is_none")]
    pub max_age: Option<u32>,

    #[serde(
        rename = "topDiagnoses",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub top_diagnoses: Option<serde_json::Value>,
}

impl CohortResults {
    /// Parse a results payload.
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::MalformedResponse`] naming the failing field path if the body is
    /// not JSON or a field has the wrong type.
    pub fn parse(json_text: &str) -> CohortResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
            let path = err.path().to_string();
            CohortError::MalformedResponse(format!(
                "cohort results mismatch at {path}: {}",
                err.into_inner()
            ))
        })
    }

    pub fn has_patients(&self) -> bool {
        self.total_patients > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_payload() {
        let input = r#"{
  "title": "T2DM",
  "total_patients": 42,
  "genderCounts": [{"gender": "Female", "count": 20}, {"gender": "Male", "count": 22}],
  "ageGroups": [{"range": "40-49", "count": 12}],
  "ethnicityCounts": [{"ethnicity": "White - British", "count": 30}],
  "uniqueDiagnoses": 7,
  "minAge": 41,
  "maxAge": 79,
  "topDiagnoses": [{"code": "44054006", "count": 42}]
}"#;
        let results = CohortResults::parse(input).expect("parse results");
        assert_eq!(results.total_patients, 42);
        assert_eq!(results.gender_counts.len(), 2);
        assert_eq!(results.age_groups[0].range, "40-49");
        assert_eq!(results.unique_diagnoses, Some(7));
        assert_eq!(results.min_age, Some(41));
        assert!(results.top_diagnoses.is_some());
        assert!(results.has_patients());
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let results = CohortResults::parse(r#"{"title": "empty"}"#).expect("parse");
        assert_eq!(results.total_patients, 0);
        assert!(results.gender_counts.is_empty());
        assert!(results.age_groups.is_empty());
        assert!(results.ethnicity_counts.is_empty());
        assert!(!results.has_patients());
    }

    #[test]
    fn wrong_type_is_malformed() {
        let err = CohortResults::parse(r#"{"total_patients": "many"}"#).expect_err("bad type");
        match err {
            CohortError::MalformedResponse(msg) => assert!(msg.contains("total_patients")),
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }

    #[test]
    fn non_json_is_malformed() {
        assert!(matches!(
            CohortResults::parse("<html>oops</html>"),
            Err(CohortError::MalformedResponse(_))
        ));
    }
}
