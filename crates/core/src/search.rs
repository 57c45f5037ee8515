//! Terminology search with last-issued-wins sequencing.
//!
//! Searches fire on every keystroke and their responses may complete in any order. Each request
//! is issued as a [`SearchTicket`] carrying a monotonically increasing sequence number. A
//! response only replaces the visible candidates if its number is higher than the last one
//! applied; anything older is dropped.
//!
//! Empty or whitespace-only terms never reach the network. They resolve to an empty candidate
//! list, still sequenced, so clearing the search box supersedes any pending lookup.

use crate::service::TerminologyService;
use snomed::{Concept, ConceptId};

/// Candidate list for one search box, constrained to the subtree of `root`.
#[derive(Clone, Debug)]
pub struct TerminologySearch {
    root: ConceptId,
    issued: u64,
    applied: u64,
    candidates: Vec<Concept>,
}

/// An outgoing search request.
#[derive(Clone, Debug)]
pub struct SearchTicket {
    seq: u64,
    root: ConceptId,
    term: String,
}

/// A completed search, ready to be applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchResponse {
    pub seq: u64,
    pub candidates: Vec<Concept>,
}

impl TerminologySearch {
    pub fn new(root: ConceptId) -> Self {
        Self {
            root,
            issued: 0,
            applied: 0,
            candidates: Vec::new(),
        }
    }

    pub fn root(&self) -> &ConceptId {
        &self.root
    }

    /// Currently visible candidates.
    pub fn candidates(&self) -> &[Concept] {
        &self.candidates
    }

    /// Sequence number of the last applied response, 0 if none.
    pub fn applied_seq(&self) -> u64 {
        self.applied
    }

    /// Tags a new request with the next sequence number.
    pub fn issue(&mut self, term: impl Into<String>) -> SearchTicket {
        self.issued += 1;
        SearchTicket {
            seq: self.issued,
            root: self.root.clone(),
            term: term.into(),
        }
    }

    /// Replaces the candidates with `response` unless a newer response was already applied.
    ///
    /// Returns whether the response was applied.
    pub fn apply(&mut self, response: SearchResponse) -> bool {
        if response.seq <= self.applied {
            tracing::debug!(
                seq = response.seq,
                applied = self.applied,
                "discarding stale search response"
            );
            return false;
        }
        self.applied = response.seq;
        self.candidates = response.candidates;
        true
    }

    /// Issues, runs and applies a search in one step.
    pub async fn search<S>(&mut self, service: &S, term: &str) -> &[Concept]
    where
        S: TerminologyService + ?Sized,
    {
        let ticket = self.issue(term);
        let response = ticket.run(service).await;
        self.apply(response);
        &self.candidates
    }
}

impl SearchTicket {
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Performs the lookup. Never fails: errors are logged and yield no candidates.
    pub async fn run<S>(self, service: &S) -> SearchResponse
    where
        S: TerminologyService + ?Sized,
    {
        if self.term.trim().is_empty() {
            return SearchResponse {
                seq: self.seq,
                candidates: Vec::new(),
            };
        }

        let candidates = match service.search(&self.root, &self.term).await {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(seq = self.seq, term = %self.term, "terminology search failed: {e}");
                Vec::new()
            }
        };

        SearchResponse {
            seq: self.seq,
            candidates,
        }
    }
}
