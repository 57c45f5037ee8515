//! Cohort submission state machine.
//!
//! ```text
//! Idle --begin--> Submitting --finish--> Idle
//!                   |          (outcome: Succeeded | Failed)
//!                   +--abort---> Idle
//! ```
//!
//! `begin` is refused while a submission is outstanding, which rules out double submits. The
//! [`SubmitTicket`] owns the [`CohortDefinition`] for the duration of the request. `finish`
//! always returns the machine to `Idle` and hands the caller a typed [`SubmitOutcome`]; the
//! form and criteria are never touched, so a failed submission can simply be retried.
//!
//! A ticket that is dropped without being finished (a cancelled request, a torn-down view) must be
//! followed by `abort`, otherwise every later `begin` is refused.

use crate::definition::CohortDefinition;
use crate::results::CohortResults;
use crate::service::CohortBackend;
use crate::{CohortError, CohortResult};

/// User-facing text for a failed submission.
pub const SUBMIT_FAILURE_MESSAGE: &str = "There was an error processing your request.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitState {
    Idle,
    Submitting,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Aggregate results, to be handed to the results view.
    Succeeded(CohortResults),
    /// Transport error, non-2xx status or malformed body. Notify the user once.
    Failed(CohortError),
}

impl SubmitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmitOutcome::Succeeded(_))
    }
}

/// An in-flight submission. Owns the definition until it is sent.
#[derive(Debug)]
pub struct SubmitTicket {
    definition: CohortDefinition,
}

/// The raw result of sending a ticket.
#[derive(Debug)]
pub struct SubmitResponse {
    title: String,
    result: CohortResult<CohortResults>,
}

impl SubmitTicket {
    pub fn definition(&self) -> &CohortDefinition {
        &self.definition
    }

    pub async fn send<B>(self, backend: &B) -> SubmitResponse
    where
        B: CohortBackend + ?Sized,
    {
        let result = backend.select(&self.definition).await;
        SubmitResponse {
            title: self.definition.title,
            result,
        }
    }
}

#[derive(Debug)]
pub struct CohortSubmitter {
    state: SubmitState,
}

impl Default for CohortSubmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl CohortSubmitter {
    pub fn new() -> Self {
        Self {
            state: SubmitState::Idle,
        }
    }

    pub fn state(&self) -> SubmitState {
        self.state
    }

    /// Moves to `Submitting` and takes ownership of the definition.
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::AlreadySubmitting`] if a submission is outstanding.
    pub fn begin(&mut self, definition: CohortDefinition) -> CohortResult<SubmitTicket> {
        if self.state == SubmitState::Submitting {
            tracing::debug!(title = %definition.title, "ignoring submit while already submitting");
            return Err(CohortError::AlreadySubmitting);
        }
        tracing::info!(
            title = %definition.title,
            must_have = definition.must_have.len(),
            must_not = definition.must_not.len(),
            "submitting cohort definition"
        );
        self.state = SubmitState::Submitting;
        Ok(SubmitTicket { definition })
    }

    /// Returns to `Idle` with the outcome of the request.
    pub fn finish(&mut self, response: SubmitResponse) -> SubmitOutcome {
        self.state = SubmitState::Idle;
        match response.result {
            Ok(results) => {
                tracing::info!(
                    title = %response.title,
                    total_patients = results.total_patients,
                    "cohort submission succeeded"
                );
                SubmitOutcome::Succeeded(results)
            }
            Err(e) => {
                tracing::error!(title = %response.title, "cohort submission failed: {e}");
                SubmitOutcome::Failed(e)
            }
        }
    }

    /// Returns to `Idle` without an outcome, for a ticket that was dropped unsent or whose
    /// request was cancelled. A later response for that ticket must not be passed to `finish`.
    pub fn abort(&mut self) {
        if self.state == SubmitState::Submitting {
            tracing::debug!("abandoning outstanding cohort submission");
        }
        self.state = SubmitState::Idle;
    }

    /// Begins, sends and finishes a submission in one step.
    ///
    /// # Errors
    ///
    /// Returns [`CohortError::AlreadySubmitting`] if a submission is outstanding. Request
    /// failures are reported through [`SubmitOutcome::Failed`], not as an error.
    pub async fn submit<B>(
        &mut self,
        backend: &B,
        definition: CohortDefinition,
    ) -> CohortResult<SubmitOutcome>
    where
        B: CohortBackend + ?Sized,
    {
        let ticket = self.begin(definition)?;
        let response = ticket.send(backend).await;
        Ok(self.finish(response))
    }
}
