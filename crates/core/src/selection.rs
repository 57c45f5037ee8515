//! A chosen concept and its descendant-expansion state.
//!
//! A [`Selection`] starts collapsed: `expanded_codes` is `[primary]` and `descendant_count` is
//! unset. The expansion fetch fills both exactly once. Flipping `include_descendants` afterwards
//! only changes what [`Selection::folded_codes`] and [`Selection::folded_count`] report; the
//! fetched values stay cached on the selection.

use crate::expand::DescendantExpansion;
use snomed::Concept;

/// Progress of the one-shot expansion fetch for a selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExpansionStatus {
    /// No fetch has been issued.
    NotRequested,
    /// A fetch is outstanding.
    InFlight,
    /// The fetch completed and its values are cached.
    Resolved,
    /// The fetch failed. Reselect the concept to try again.
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    primary: Concept,
    include_descendants: bool,
    descendant_count: Option<u64>,
    expanded_codes: Vec<Concept>,
    status: ExpansionStatus,
}

impl Selection {
    pub fn new(primary: Concept, include_descendants: bool) -> Self {
        Self {
            expanded_codes: vec![primary.clone()],
            primary,
            include_descendants,
            descendant_count: None,
            status: ExpansionStatus::NotRequested,
        }
    }

    pub fn primary(&self) -> &Concept {
        &self.primary
    }

    pub fn code(&self) -> &str {
        &self.primary.code
    }

    pub fn include_descendants(&self) -> bool {
        self.include_descendants
    }

    /// Cached count of the concept plus its descendants, if the fetch has resolved.
    pub fn descendant_count(&self) -> Option<u64> {
        self.descendant_count
    }

    /// Cached self-plus-descendant list, or `[primary]` before the fetch resolves.
    pub fn expanded_codes(&self) -> &[Concept] {
        &self.expanded_codes
    }

    pub fn expansion_status(&self) -> ExpansionStatus {
        self.status
    }

    /// Local flip only. Never triggers a fetch.
    pub fn set_include_descendants(&mut self, include: bool) {
        self.include_descendants = include;
    }

    pub fn toggle_include_descendants(&mut self) -> bool {
        self.include_descendants = !self.include_descendants;
        self.include_descendants
    }

    /// Count contributed to the cohort definition.
    ///
    /// An unset descendant count folds to 1.
    pub fn folded_count(&self) -> u64 {
        if self.include_descendants {
            self.descendant_count.unwrap_or(1)
        } else {
            1
        }
    }

    /// Codes contributed to the cohort definition.
    pub fn folded_codes(&self) -> &[Concept] {
        if self.include_descendants {
            &self.expanded_codes
        } else {
            std::slice::from_ref(&self.primary)
        }
    }

    /// Marks the expansion fetch as in flight.
    ///
    /// Returns `false` if a fetch was already issued for this selection, whatever its outcome.
    pub fn begin_expansion(&mut self) -> bool {
        if self.status != ExpansionStatus::NotRequested {
            return false;
        }
        self.status = ExpansionStatus::InFlight;
        true
    }

    /// Records the outcome of the in-flight fetch. `None` means the fetch failed.
    ///
    /// Returns `false` and leaves the selection untouched if no fetch was in flight.
    pub fn complete_expansion(&mut self, expansion: Option<DescendantExpansion>) -> bool {
        if self.status != ExpansionStatus::InFlight {
            tracing::debug!(
                code = %self.primary.code,
                status = ?self.status,
                "ignoring expansion result for selection with no fetch in flight"
            );
            return false;
        }

        match expansion {
            Some(expansion) => {
                self.descendant_count = expansion.descendant_count;
                if !expansion.expanded_codes.is_empty() {
                    self.expanded_codes = expansion.expanded_codes;
                }
                self.status = ExpansionStatus::Resolved;
            }
            None => {
                self.status = ExpansionStatus::Failed;
            }
        }
        true
    }
}
