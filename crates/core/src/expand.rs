//! Descendant expansion for chosen concepts.
//!
//! Choosing a concept fires one `count-descendants-and-self` fetch for it. The result is cached
//! on the [`Selection`](crate::Selection); include/exclude toggles afterwards never re-fetch.
//! Failures are logged and leave the count unset. There is no retry.

use crate::criteria::{CriterionId, Polarity};
use crate::selection::Selection;
use crate::service::TerminologyService;
use crate::CohortResult;
use snomed::{Concept, Expansion};

/// Result of a successful expansion fetch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DescendantExpansion {
    /// Count of the concept plus its descendants. `None` when the server reported 0 or nothing.
    pub descendant_count: Option<u64>,
    /// The concept and its descendants, in server order.
    pub expanded_codes: Vec<Concept>,
}

impl From<Expansion> for DescendantExpansion {
    fn from(expansion: Expansion) -> Self {
        Self {
            descendant_count: (expansion.total > 0).then_some(expansion.total),
            expanded_codes: expansion.contains,
        }
    }
}

/// Identifies the criterion an expansion fetch belongs to.
///
/// Only [`CriterionSet::begin_expansion`](crate::CriterionSet::begin_expansion) mints tickets. The
/// criterion id ties the eventual response to that exact entry, so a response for an entry that
/// was removed and re-chosen in the meantime is dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpansionTicket {
    pub polarity: Polarity,
    pub code: String,
    pub(crate) criterion: CriterionId,
}

impl ExpansionTicket {
    pub fn criterion(&self) -> CriterionId {
        self.criterion
    }

    /// Pairs the ticket with the outcome of its fetch. `None` means the fetch failed.
    pub fn respond(self, expansion: Option<DescendantExpansion>) -> ExpansionResponse {
        ExpansionResponse {
            polarity: self.polarity,
            code: self.code,
            criterion: self.criterion,
            expansion,
        }
    }
}

/// A completed expansion fetch, routed back to the criterion that issued it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExpansionResponse {
    pub polarity: Polarity,
    pub code: String,
    pub(crate) criterion: CriterionId,
    /// `None` if the fetch failed.
    pub expansion: Option<DescendantExpansion>,
}

impl ExpansionResponse {
    pub fn criterion(&self) -> CriterionId {
        self.criterion
    }
}

/// Runs expansion fetches against a [`TerminologyService`].
pub struct DescendantExpander<'a, S: ?Sized> {
    service: &'a S,
}

impl<'a, S> DescendantExpander<'a, S>
where
    S: TerminologyService + ?Sized,
{
    pub fn new(service: &'a S) -> Self {
        Self { service }
    }

    /// Fetches the self-plus-descendant count and code list for `code`.
    ///
    /// # Errors
    ///
    /// Propagates the service error unchanged.
    pub async fn expand(&self, code: &str) -> CohortResult<DescendantExpansion> {
        let expansion = self.service.count_descendants_and_self(code).await?;
        Ok(expansion.into())
    }

    /// Runs the fetch for a ticket. Never fails: errors are logged and reported as `None`.
    pub async fn run(&self, ticket: ExpansionTicket) -> ExpansionResponse {
        let expansion = self.fetch_logged(&ticket.code).await;
        ticket.respond(expansion)
    }

    /// Expands a standalone selection in place.
    ///
    /// Returns `false` without fetching if the selection already had a fetch issued.
    pub async fn expand_selection(&self, selection: &mut Selection) -> bool {
        if !selection.begin_expansion() {
            return false;
        }
        let expansion = self.fetch_logged(selection.code()).await;
        selection.complete_expansion(expansion)
    }

    async fn fetch_logged(&self, code: &str) -> Option<DescendantExpansion> {
        match self.expand(code).await {
            Ok(expansion) => {
                tracing::debug!(
                    code,
                    count = ?expansion.descendant_count,
                    codes = expansion.expanded_codes.len(),
                    "expanded concept"
                );
                Some(expansion)
            }
            Err(e) => {
                tracing::warn!(code, "descendant expansion failed: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::ExpansionStatus;
    use crate::test_support::{numbered_concepts, FakeTerminology};

    fn diabetes() -> Concept {
        Concept::new("44054006", "Diabetes mellitus")
    }

    #[test]
    fn zero_total_reads_as_unset() {
        let expansion = DescendantExpansion::from(Expansion {
            total: 0,
            contains: Vec::new(),
        });
        assert_eq!(expansion.descendant_count, None);
    }

    #[tokio::test]
    async fn expand_selection_caches_count_and_codes() {
        let service = FakeTerminology::new().with_expansion(
            "44054006",
            Expansion {
                total: 120,
                contains: numbered_concepts(120),
            },
        );
        let expander = DescendantExpander::new(&service);
        let mut selection = Selection::new(diabetes(), true);

        assert!(expander.expand_selection(&mut selection).await);
        assert_eq!(selection.descendant_count(), Some(120));
        assert_eq!(selection.expanded_codes().len(), 120);
        assert_eq!(selection.folded_count(), 120);
    }

    #[tokio::test]
    async fn second_expand_does_not_refetch() {
        let service = FakeTerminology::new().with_expansion(
            "44054006",
            Expansion {
                total: 2,
                contains: numbered_concepts(2),
            },
        );
        let expander = DescendantExpander::new(&service);
        let mut selection = Selection::new(diabetes(), false);

        assert!(expander.expand_selection(&mut selection).await);
        selection.toggle_include_descendants();
        assert!(!expander.expand_selection(&mut selection).await);
        assert_eq!(service.expand_calls(), 1);
    }

    #[tokio::test]
    async fn failed_fetch_is_reported_as_none() {
        let service = FakeTerminology::new();
        let expander = DescendantExpander::new(&service);

        let response = expander
            .run(ExpansionTicket {
                polarity: Polarity::MustNot,
                code: "44054006".into(),
                criterion: CriterionId(7),
            })
            .await;
        assert_eq!(response.polarity, Polarity::MustNot);
        assert_eq!(response.criterion(), CriterionId(7));
        assert_eq!(response.expansion, None);

        let mut selection = Selection::new(diabetes(), true);
        assert!(expander.expand_selection(&mut selection).await);
        assert_eq!(selection.expansion_status(), ExpansionStatus::Failed);
        assert_eq!(selection.folded_count(), 1);
    }
}
