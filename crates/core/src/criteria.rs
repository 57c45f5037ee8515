//! Polarity-tagged terminology criteria.
//!
//! A [`CriterionSet`] holds both must-have and must-not-have criteria, keyed by
//! `(polarity, primary code)`. Adding an existing key is a no-op that keeps the first entry.
//! The two polarities never deduplicate against each other, so one code can be required and
//! excluded at the same time. Display order is insertion order and survives removals.
//!
//! Every added entry also gets a [`CriterionId`] that is never reused. Expansion responses are
//! routed by that id, so removing a concept and choosing it again starts from a clean slate.

use crate::constants::NO_CRITERIA;
use crate::expand::{ExpansionResponse, ExpansionTicket};
use crate::selection::Selection;
use crate::{CohortError, CohortResult};
use serde::{Deserialize, Serialize};

/// Whether a criterion requires presence or absence of a finding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    MustHave,
    MustNot,
}

impl Polarity {
    pub const ALL: [Polarity; 2] = [Polarity::MustHave, Polarity::MustNot];

    pub fn label(self) -> &'static str {
        match self {
            Polarity::MustHave => "Must Have",
            Polarity::MustNot => "Must Not Have",
        }
    }
}

impl std::fmt::Display for Polarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Identity of one added criterion within its [`CriterionSet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CriterionId(pub(crate) u64);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Criterion {
    id: CriterionId,
    selection: Selection,
    polarity: Polarity,
}

impl Criterion {
    fn new(id: CriterionId, selection: Selection, polarity: Polarity) -> Self {
        Self {
            id,
            selection,
            polarity,
        }
    }

    pub fn id(&self) -> CriterionId {
        self.id
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    pub fn code(&self) -> &str {
        self.selection.code()
    }

    /// e.g. "Include 1 code", "Include 47 codes".
    pub fn inclusion_label(&self) -> String {
        let count = self.selection.folded_count();
        let plural = if count == 1 { "" } else { "s" };
        format!("Include {count} code{plural}")
    }

    fn matches(&self, polarity: Polarity, code: &str) -> bool {
        self.polarity == polarity && self.code() == code
    }
}

/// Per-polarity summary text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CriteriaSummary {
    pub must_have: String,
    pub must_not: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CriterionSet {
    entries: Vec<Criterion>,
    next_id: u64,
}

impl CriterionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `selection` under `polarity`.
    ///
    /// Returns `false` and leaves the existing entry untouched if the key is already present.
    pub fn add(&mut self, selection: Selection, polarity: Polarity) -> bool {
        if self.contains(polarity, selection.code()) {
            tracing::debug!(code = selection.code(), %polarity, "criterion already present");
            return false;
        }
        self.next_id += 1;
        let id = CriterionId(self.next_id);
        self.entries.push(Criterion::new(id, selection, polarity));
        true
    }

    /// Removes the entry at display position `index` within `polarity`.
    pub fn remove(&mut self, polarity: Polarity, index: usize) -> Option<Criterion> {
        let position = self.position(polarity, index)?;
        Some(self.entries.remove(position))
    }

    pub fn contains(&self, polarity: Polarity, code: &str) -> bool {
        self.entries.iter().any(|c| c.matches(polarity, code))
    }

    pub fn get(&self, polarity: Polarity, index: usize) -> Option<&Criterion> {
        self.entries(polarity).nth(index)
    }

    /// Entries of one polarity, in display order.
    pub fn entries(&self, polarity: Polarity) -> impl Iterator<Item = &Criterion> + '_ {
        self.entries.iter().filter(move |c| c.polarity == polarity)
    }

    pub fn len(&self, polarity: Polarity) -> usize {
        self.entries(polarity).count()
    }

    pub fn is_empty(&self, polarity: Polarity) -> bool {
        self.entries(polarity).next().is_none()
    }

    /// Flips one criterion's own include-descendants toggle.
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::InvalidInput`] if there is no entry at `index`.
    pub fn set_include_descendants(
        &mut self,
        polarity: Polarity,
        index: usize,
        include: bool,
    ) -> CohortResult<()> {
        let position = self.position(polarity, index).ok_or_else(|| {
            CohortError::InvalidInput(format!("no {polarity} criterion at position {index}"))
        })?;
        self.entries[position]
            .selection
            .set_include_descendants(include);
        Ok(())
    }

    /// Marks the expansion for `(polarity, code)` as in flight.
    ///
    /// Returns `None` if the entry does not exist or already had its fetch issued.
    pub fn begin_expansion(&mut self, polarity: Polarity, code: &str) -> Option<ExpansionTicket> {
        let criterion = self
            .entries
            .iter_mut()
            .find(|c| c.matches(polarity, code))?;
        let id = criterion.id;
        criterion
            .selection
            .begin_expansion()
            .then(|| ExpansionTicket {
                polarity,
                code: code.to_string(),
                criterion: id,
            })
    }

    /// Routes a completed expansion to its criterion.
    ///
    /// Returns `false` if the issuing criterion was removed in the meantime (even if the same
    /// concept has been chosen again since) or was not awaiting a fetch.
    pub fn apply_expansion(&mut self, response: ExpansionResponse) -> bool {
        let Some(criterion) = self.entries.iter_mut().find(|c| {
            c.id == response.criterion && c.matches(response.polarity, &response.code)
        }) else {
            tracing::debug!(
                code = %response.code,
                polarity = %response.polarity,
                "dropping expansion for removed criterion"
            );
            return false;
        };
        criterion.selection.complete_expansion(response.expansion)
    }

    /// `"None"` when empty, otherwise the displays joined with `", "`.
    pub fn summarize_polarity(&self, polarity: Polarity) -> String {
        if self.is_empty(polarity) {
            return NO_CRITERIA.to_string();
        }
        self.entries(polarity)
            .map(|c| c.selection.primary().display.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn summarize(&self) -> CriteriaSummary {
        CriteriaSummary {
            must_have: self.summarize_polarity(Polarity::MustHave),
            must_not: self.summarize_polarity(Polarity::MustNot),
        }
    }

    fn position(&self, polarity: Polarity, index: usize) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, c)| c.polarity == polarity)
            .nth(index)
            .map(|(position, _)| position)
    }
}
