//! Cohort form state owned by the single UI actor.
//!
//! The form ties the engine together: one [`TerminologySearch`] per polarity, the
//! [`CriterionSet`], and the demographic filters. All mutation happens through `&mut self`, and
//! network work is handed out as tickets, so responses can be applied in whatever order they
//! complete.

use crate::config::CohortConfig;
use crate::constants::{ETHNICITY_OPTIONS, GENDER_OPTIONS};
use crate::criteria::{Criterion, CriterionSet, Polarity};
use crate::definition::{AgeRange, CohortDefinition, CohortDefinitionBuilder, Demographics};
use crate::expand::{ExpansionResponse, ExpansionTicket};
use crate::search::TerminologySearch;
use crate::selection::Selection;
use crate::{CohortError, CohortResult};
use chrono::NaiveDate;
use snomed::Concept;

#[derive(Clone, Debug)]
pub struct CohortForm {
    demographics: Demographics,
    criteria: CriterionSet,
    must_have_search: TerminologySearch,
    must_not_search: TerminologySearch,
    include_descendants_by_default: bool,
}

impl CohortForm {
    pub fn new(cfg: &CohortConfig) -> Self {
        Self {
            demographics: Demographics::default(),
            criteria: CriterionSet::new(),
            must_have_search: TerminologySearch::new(cfg.root_code().clone()),
            must_not_search: TerminologySearch::new(cfg.root_code().clone()),
            include_descendants_by_default: cfg.include_descendants_by_default(),
        }
    }

    pub fn demographics(&self) -> &Demographics {
        &self.demographics
    }

    pub fn criteria(&self) -> &CriterionSet {
        &self.criteria
    }

    pub fn search(&self, polarity: Polarity) -> &TerminologySearch {
        match polarity {
            Polarity::MustHave => &self.must_have_search,
            Polarity::MustNot => &self.must_not_search,
        }
    }

    pub fn search_mut(&mut self, polarity: Polarity) -> &mut TerminologySearch {
        match polarity {
            Polarity::MustHave => &mut self.must_have_search,
            Polarity::MustNot => &mut self.must_not_search,
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.demographics.title = title.into();
    }

    /// Selects or deselects a gender option. Returns whether it is now selected.
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::InvalidInput`] if `code` is not a known gender option.
    pub fn toggle_gender(&mut self, code: &str) -> CohortResult<bool> {
        let option = catalogue_entry(GENDER_OPTIONS, code, "gender")?;
        Ok(toggle(&mut self.demographics.genders, option))
    }

    /// Selects or deselects an ethnicity option. Returns whether it is now selected.
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::InvalidInput`] if `code` is not a known ethnicity option.
    pub fn toggle_ethnicity(&mut self, code: &str) -> CohortResult<bool> {
        let option = catalogue_entry(ETHNICITY_OPTIONS, code, "ethnicity")?;
        Ok(toggle(&mut self.demographics.ethnicities, option))
    }

    /// # Errors
    ///
    /// Returns a `CohortError` if the range is inverted or out of bounds; the previous range is
    /// kept.
    pub fn set_age_range(&mut self, min: u32, max: u32) -> CohortResult<()> {
        self.demographics.age_range = AgeRange::new(min, max)?;
        Ok(())
    }

    pub fn set_time_range(&mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) {
        self.demographics.time_range.start = start;
        self.demographics.time_range.end = end;
    }

    /// Adds a chosen candidate under `polarity`.
    ///
    /// Returns the expansion fetch to run, or `None` if the concept was already present (the
    /// existing entry is kept as is).
    pub fn choose(&mut self, polarity: Polarity, concept: Concept) -> Option<ExpansionTicket> {
        let code = concept.code.clone();
        let selection = Selection::new(concept, self.include_descendants_by_default);
        if !self.criteria.add(selection, polarity) {
            return None;
        }
        self.criteria.begin_expansion(polarity, &code)
    }

    pub fn apply_expansion(&mut self, response: ExpansionResponse) -> bool {
        self.criteria.apply_expansion(response)
    }

    pub fn remove(&mut self, polarity: Polarity, index: usize) -> Option<Criterion> {
        self.criteria.remove(polarity, index)
    }

    /// # Errors
    ///
    /// Returns [`CohortError::InvalidInput`] if there is no criterion at `index`.
    pub fn set_include_descendants(
        &mut self,
        polarity: Polarity,
        index: usize,
        include: bool,
    ) -> CohortResult<()> {
        self.criteria
            .set_include_descendants(polarity, index, include)
    }

    /// Synthesises a fresh definition from the current state.
    ///
    /// # Errors
    ///
    /// See [`CohortDefinitionBuilder::build`].
    pub fn build(&self) -> CohortResult<CohortDefinition> {
        CohortDefinitionBuilder::build(&self.demographics, &self.criteria)
    }

    pub fn summary(&self) -> FormSummary {
        let d = &self.demographics;
        let criteria = self.criteria.summarize();

        let time_range = match (d.time_range.start, d.time_range.end) {
            (None, None) => "Any".to_string(),
            (start, end) => format!(
                "{} to {}",
                start.map_or_else(|| "Any".to_string(), |s| s.to_string()),
                end.map_or_else(|| "Any".to_string(), |e| e.to_string()),
            ),
        };

        FormSummary {
            title: if d.title.is_empty() {
                "N/A".to_string()
            } else {
                d.title.clone()
            },
            genders: join_or_all(&d.genders),
            age_range: format!("{} - {}", d.age_range.min, d.age_range.max),
            ethnicities: join_or_all(&d.ethnicities),
            time_range,
            must_have: criteria.must_have,
            must_not: criteria.must_not,
        }
    }
}

/// Human-readable summary of the selected criteria.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormSummary {
    pub title: String,
    pub genders: String,
    pub age_range: String,
    pub ethnicities: String,
    pub time_range: String,
    pub must_have: String,
    pub must_not: String,
}

impl std::fmt::Display for FormSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Title: {}", self.title)?;
        writeln!(f, "Genders: {}", self.genders)?;
        writeln!(f, "Age Range: {}", self.age_range)?;
        writeln!(f, "Ethnicities: {}", self.ethnicities)?;
        writeln!(f, "Time Range: {}", self.time_range)?;
        writeln!(f, "Must Have Findings/Disorders: {}", self.must_have)?;
        write!(f, "Must Not Have Findings/Disorders: {}", self.must_not)
    }
}

fn catalogue_entry(options: &[(&str, &str)], code: &str, kind: &str) -> CohortResult<Concept> {
    options
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(c, label)| Concept::new(*c, *label))
        .ok_or_else(|| CohortError::InvalidInput(format!("unknown {kind} code: {code}")))
}

fn toggle(selected: &mut Vec<Concept>, option: Concept) -> bool {
    if let Some(position) = selected.iter().position(|c| c.code == option.code) {
        selected.remove(position);
        false
    } else {
        selected.push(option);
        true
    }
}

fn join_or_all(concepts: &[Concept]) -> String {
    if concepts.is_empty() {
        return "All".to_string();
    }
    concepts
        .iter()
        .map(|c| c.display.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
