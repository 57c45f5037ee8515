//! Cohort definition assembly.
//!
//! [`CohortDefinitionBuilder::build`] folds the form's demographic filters and the criterion set
//! into the payload posted to `/api/cohort/select`. The fold rules are:
//! - an empty gender or ethnicity selection becomes the sentinel `"ALL"`
//! - `timeRange` only carries the bounds that were actually supplied
//! - every criterion is folded with **its own** include-descendants toggle: expanded codes and
//!   the fetched count when on (unset count folds to 1), `[primary]` and 1 when off
//! - the title is passed through verbatim
//!
//! ## Wire format
//!
//! ```text
//! {
//!   "title": "...",
//!   "gender": "ALL" | [{"code", "display"}],
//!   "ageRange": {"min": 18, "max": 80},
//!   "ethnicity": "ALL" | [{"code", "display"}],
//!   "timeRange": {"start"?: "YYYY-MM-DD", "end"?: "YYYY-MM-DD"},
//!   "mustHave": [{"concept", "includeDescendants", "count", "codes"}],
//!   "mustNot": [...]
//! }
//! ```

use crate::constants::{ALL_CATEGORIES, DEFAULT_MAX_AGE, DEFAULT_MIN_AGE};
use crate::criteria::{Criterion, CriterionSet, Polarity};
use crate::validation::validate_age_range;
use crate::{CohortError, CohortResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use snomed::Concept;

// ============================================================================
// Filter types
// ============================================================================

/// Inclusive age range in years.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    /// # Errors
    ///
    /// Returns a `CohortError` if the range is inverted or out of bounds.
    pub fn new(min: u32, max: u32) -> CohortResult<Self> {
        validate_age_range(min, max)?;
        Ok(Self { min, max })
    }
}

impl Default for AgeRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_AGE,
            max: DEFAULT_MAX_AGE,
        }
    }
}

/// Optional date bounds. Unset bounds are omitted from the wire format entirely.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
}

/// A demographic category filter: everything, or an explicit ordered selection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    Only(Vec<Concept>),
}

impl CategoryFilter {
    /// Empty selections fold to [`CategoryFilter::All`].
    pub fn from_selection(selected: &[Concept]) -> Self {
        if selected.is_empty() {
            Self::All
        } else {
            Self::Only(selected.to_vec())
        }
    }
}

impl Serialize for CategoryFilter {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            CategoryFilter::All => serializer.serialize_str(ALL_CATEGORIES),
            CategoryFilter::Only(concepts) => concepts.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for CategoryFilter {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum CategoryFilterWire {
            Sentinel(String),
            Concepts(Vec<Concept>),
        }

        match CategoryFilterWire::deserialize(deserializer)? {
            CategoryFilterWire::Sentinel(s) if s == ALL_CATEGORIES => Ok(CategoryFilter::All),
            CategoryFilterWire::Sentinel(s) => Err(serde::de::Error::custom(format!(
                "expected \"{ALL_CATEGORIES}\" or a list of concepts, got {s:?}"
            ))),
            CategoryFilterWire::Concepts(concepts) => Ok(CategoryFilter::from_selection(&concepts)),
        }
    }
}

/// Demographic half of the cohort form.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Demographics {
    pub title: String,
    pub genders: Vec<Concept>,
    pub age_range: AgeRange,
    pub ethnicities: Vec<Concept>,
    pub time_range: TimeRange,
}

// ============================================================================
// Cohort definition
// ============================================================================

/// One criterion as submitted: its concept, its own toggle and the folded codes/count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoldedCriterion {
    pub concept: Concept,
    pub include_descendants: bool,
    pub count: u64,
    pub codes: Vec<Concept>,
}

impl From<&Criterion> for FoldedCriterion {
    fn from(criterion: &Criterion) -> Self {
        let selection = criterion.selection();
        Self {
            concept: selection.primary().clone(),
            include_descendants: selection.include_descendants(),
            count: selection.folded_count(),
            codes: selection.folded_codes().to_vec(),
        }
    }
}

/// The submission payload. Built fresh per submission and never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortDefinition {
    pub title: String,
    pub gender: CategoryFilter,
    pub age_range: AgeRange,
    pub ethnicity: CategoryFilter,
    pub time_range: TimeRange,
    pub must_have: Vec<FoldedCriterion>,
    pub must_not: Vec<FoldedCriterion>,
}

impl CohortDefinition {
    /// Serialise to the wire JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::Serialization`] if serialisation fails.
    pub fn to_json(&self) -> CohortResult<String> {
        serde_json::to_string(self).map_err(CohortError::Serialization)
    }

    /// Parse the wire JSON, reporting the path of the first mismatching field.
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::MalformedResponse`] if the JSON does not match the wire schema.
    pub fn from_json(json_text: &str) -> CohortResult<Self> {
        let mut deserializer = serde_json::Deserializer::from_str(json_text);
        serde_path_to_error::deserialize(&mut deserializer).map_err(|err| {
            let path = err.path().to_string();
            CohortError::MalformedResponse(format!(
                "cohort definition mismatch at {path}: {}",
                err.into_inner()
            ))
        })
    }
}

// ============================================================================
// Builder
// ============================================================================

pub struct CohortDefinitionBuilder;

impl CohortDefinitionBuilder {
    /// Folds demographics and criteria into a [`CohortDefinition`].
    ///
    /// # Errors
    ///
    /// Returns a `CohortError` if the age range is inverted or out of bounds.
    pub fn build(
        demographics: &Demographics,
        criteria: &CriterionSet,
    ) -> CohortResult<CohortDefinition> {
        let age_range = demographics.age_range;
        validate_age_range(age_range.min, age_range.max)?;

        let fold = |polarity: Polarity| {
            criteria
                .entries(polarity)
                .map(FoldedCriterion::from)
                .collect::<Vec<_>>()
        };

        Ok(CohortDefinition {
            title: demographics.title.clone(),
            gender: CategoryFilter::from_selection(&demographics.genders),
            age_range,
            ethnicity: CategoryFilter::from_selection(&demographics.ethnicities),
            time_range: demographics.time_range,
            must_have: fold(Polarity::MustHave),
            must_not: fold(Polarity::MustNot),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::DescendantExpansion;
    use crate::selection::Selection;
    use crate::test_support::numbered_concepts;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        s.parse().expect("valid date")
    }

    fn expanded(set: &mut CriterionSet, polarity: Polarity, concept: Concept, count: u64) {
        let code = concept.code.clone();
        set.add(Selection::new(concept, true), polarity);
        let ticket = set.begin_expansion(polarity, &code).expect("ticket");
        set.apply_expansion(ticket.respond(Some(DescendantExpansion {
            descendant_count: Some(count),
            expanded_codes: numbered_concepts(count as usize),
        })));
    }

    #[test]
    fn empty_categories_fold_to_all() {
        let definition =
            CohortDefinitionBuilder::build(&Demographics::default(), &CriterionSet::new())
                .expect("build");
        assert_eq!(definition.gender, CategoryFilter::All);
        assert_eq!(definition.ethnicity, CategoryFilter::All);

        let value = serde_json::to_value(&definition).expect("serialise");
        assert_eq!(value["gender"], json!("ALL"));
        assert_eq!(value["ethnicity"], json!("ALL"));
        assert_eq!(value["ageRange"], json!({"min": 18, "max": 80}));
        assert_eq!(value["timeRange"], json!({}));
        assert_eq!(value["mustHave"], json!([]));
        assert_eq!(value["mustNot"], json!([]));
    }

    #[test]
    fn selected_categories_keep_order() {
        let demographics = Demographics {
            genders: vec![Concept::new("2", "Female"), Concept::new("1", "Male")],
            ..Demographics::default()
        };
        let definition =
            CohortDefinitionBuilder::build(&demographics, &CriterionSet::new()).expect("build");
        let value = serde_json::to_value(&definition).expect("serialise");
        assert_eq!(
            value["gender"],
            json!([{"code": "2", "display": "Female"}, {"code": "1", "display": "Male"}])
        );
    }

    #[test]
    fn time_range_emits_only_supplied_bounds() {
        let mut demographics = Demographics::default();
        demographics.time_range.start = Some(date("2020-01-01"));
        let definition =
            CohortDefinitionBuilder::build(&demographics, &CriterionSet::new()).expect("build");
        let value = serde_json::to_value(&definition).expect("serialise");
        assert_eq!(value["timeRange"], json!({"start": "2020-01-01"}));

        let mut demographics = Demographics::default();
        demographics.time_range.end = Some(date("2024-12-31"));
        let definition =
            CohortDefinitionBuilder::build(&demographics, &CriterionSet::new()).expect("build");
        let value = serde_json::to_value(&definition).expect("serialise");
        assert_eq!(value["timeRange"], json!({"end": "2024-12-31"}));
    }

    #[test]
    fn toggles_fold_independently_per_criterion() {
        let mut set = CriterionSet::new();
        expanded(&mut set, Polarity::MustHave, Concept::new("73211009", "Diabetes"), 47);
        expanded(&mut set, Polarity::MustHave, Concept::new("195967001", "Asthma"), 12);
        set.set_include_descendants(Polarity::MustHave, 0, false)
            .expect("toggle");

        let definition =
            CohortDefinitionBuilder::build(&Demographics::default(), &set).expect("build");

        let diabetes = &definition.must_have[0];
        assert!(!diabetes.include_descendants);
        assert_eq!(diabetes.count, 1);
        assert_eq!(diabetes.codes, vec![Concept::new("73211009", "Diabetes")]);

        let asthma = &definition.must_have[1];
        assert!(asthma.include_descendants);
        assert_eq!(asthma.count, 12);
        assert_eq!(asthma.codes.len(), 12);

        // The cache on the toggled-off selection is untouched.
        let selection = set.get(Polarity::MustHave, 0).expect("entry").selection();
        assert_eq!(selection.descendant_count(), Some(47));
        assert_eq!(selection.expanded_codes().len(), 47);
    }

    #[test]
    fn unresolved_expansion_folds_to_one() {
        let mut set = CriterionSet::new();
        set.add(
            Selection::new(Concept::new("73211009", "Diabetes"), true),
            Polarity::MustNot,
        );
        let definition =
            CohortDefinitionBuilder::build(&Demographics::default(), &set).expect("build");
        assert_eq!(definition.must_not[0].count, 1);
        assert_eq!(definition.must_not[0].codes.len(), 1);
    }

    #[test]
    fn title_is_passed_through_verbatim() {
        let demographics = Demographics {
            title: "  T2DM cohort ".into(),
            ..Demographics::default()
        };
        let definition =
            CohortDefinitionBuilder::build(&demographics, &CriterionSet::new()).expect("build");
        assert_eq!(definition.title, "  T2DM cohort ");
    }

    #[test]
    fn inverted_age_range_is_rejected() {
        let demographics = Demographics {
            age_range: AgeRange { min: 70, max: 30 },
            ..Demographics::default()
        };
        let err = CohortDefinitionBuilder::build(&demographics, &CriterionSet::new())
            .expect_err("inverted");
        assert!(matches!(err, CohortError::InvalidAgeRange { min: 70, max: 30 }));
    }

    #[test]
    fn round_trips_wire_json() {
        let mut set = CriterionSet::new();
        expanded(&mut set, Polarity::MustHave, Concept::new("44054006", "T2DM"), 3);
        set.add(
            Selection::new(Concept::new("709044004", "CKD"), false),
            Polarity::MustNot,
        );
        let demographics = Demographics {
            title: "T2DM without CKD".into(),
            genders: vec![Concept::new("2", "Female")],
            age_range: AgeRange::new(40, 75).expect("range"),
            ethnicities: Vec::new(),
            time_range: TimeRange {
                start: Some(date("2019-04-01")),
                end: Some(date("2024-03-31")),
            },
        };

        let definition = CohortDefinitionBuilder::build(&demographics, &set).expect("build");
        let json = definition.to_json().expect("to json");
        let decoded = CohortDefinition::from_json(&json).expect("from json");
        assert_eq!(decoded, definition);
    }

    #[test]
    fn from_json_rejects_unknown_sentinel() {
        let input = r#"{"title":"t","gender":"NONE","ageRange":{"min":1,"max":2},
            "ethnicity":"ALL","timeRange":{},"mustHave":[],"mustNot":[]}"#;
        let err = CohortDefinition::from_json(input).expect_err("bad sentinel");
        match err {
            CohortError::MalformedResponse(msg) => assert!(msg.contains("gender")),
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }
}
