//! In-memory service fakes shared by the unit tests.

use crate::definition::CohortDefinition;
use crate::results::CohortResults;
use crate::service::{CohortBackend, TerminologyService};
use crate::{CohortError, CohortResult};
use async_trait::async_trait;
use snomed::{Concept, ConceptId, Expansion};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// `n` distinct concepts with codes `"1"..="n"`.
pub(crate) fn numbered_concepts(n: usize) -> Vec<Concept> {
    (1..=n)
        .map(|i| Concept::new(i.to_string(), format!("Concept {i}")))
        .collect()
}

#[derive(Default)]
pub(crate) struct FakeTerminology {
    searches: HashMap<String, Vec<Concept>>,
    failing_searches: HashSet<String>,
    delays: HashMap<String, Duration>,
    expansions: HashMap<String, Expansion>,
    search_calls: AtomicUsize,
    expand_calls: AtomicUsize,
    last_root: Mutex<Option<String>>,
}

impl FakeTerminology {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_search(mut self, term: &str, concepts: Vec<Concept>) -> Self {
        self.searches.insert(term.to_string(), concepts);
        self
    }

    pub(crate) fn failing_search(mut self, term: &str) -> Self {
        self.failing_searches.insert(term.to_string());
        self
    }

    pub(crate) fn with_search_delay(mut self, term: &str, delay: Duration) -> Self {
        self.delays.insert(term.to_string(), delay);
        self
    }

    /// Codes without a registered expansion fail.
    pub(crate) fn with_expansion(mut self, code: &str, expansion: Expansion) -> Self {
        self.expansions.insert(code.to_string(), expansion);
        self
    }

    pub(crate) fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn expand_calls(&self) -> usize {
        self.expand_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn last_root(&self) -> Option<String> {
        self.last_root.lock().ok().and_then(|root| root.clone())
    }
}

#[async_trait]
impl TerminologyService for FakeTerminology {
    async fn search(&self, root: &ConceptId, term: &str) -> CohortResult<Vec<Concept>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_root.lock() {
            *last = Some(root.to_string());
        }
        if let Some(delay) = self.delays.get(term) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing_searches.contains(term) {
            return Err(CohortError::UnexpectedStatus(503));
        }
        Ok(self.searches.get(term).cloned().unwrap_or_default())
    }

    async fn count_descendants_and_self(&self, code: &str) -> CohortResult<Expansion> {
        self.expand_calls.fetch_add(1, Ordering::SeqCst);
        self.expansions
            .get(code)
            .cloned()
            .ok_or(CohortError::UnexpectedStatus(502))
    }
}

/// Backend answering every submission with a fixed outcome.
pub(crate) struct FakeBackend {
    results: Option<CohortResults>,
    received: Mutex<Vec<CohortDefinition>>,
}

impl FakeBackend {
    pub(crate) fn succeeding(results: CohortResults) -> Self {
        Self {
            results: Some(results),
            received: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            results: None,
            received: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn received(&self) -> Vec<CohortDefinition> {
        self.received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl CohortBackend for FakeBackend {
    async fn select(&self, definition: &CohortDefinition) -> CohortResult<CohortResults> {
        if let Ok(mut received) = self.received.lock() {
            received.push(definition.clone());
        }
        self.results
            .clone()
            .ok_or(CohortError::UnexpectedStatus(500))
    }
}
