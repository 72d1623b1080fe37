//! Draft controller: the new-record form state machine.
//!
//! The controller owns one [`Draft`] and moves between [`DraftPhase::Editing`]
//! and [`DraftPhase::Submitting`]. A submit validates locally, performs one
//! gateway write and, on success, resets the draft and invalidates the
//! accounts collection. Failures keep the draft so no input is lost.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::collection_cache::{CollectionCache, QueryKey};
use super::draft::{Draft, DraftValidationError};
use super::ports::{CreateAck, GatewayError, LedgerGateway};
use super::{AccountField, UnknownAccountField};

/// Where the controller is in its edit/submit cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftPhase {
    /// Fields may be edited and a submit may start.
    #[default]
    Editing,
    /// A gateway write is in flight; edits are rejected.
    Submitting,
}

/// Errors returned by [`DraftController::submit`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// A submission is already in flight.
    #[error("a submission is already in flight")]
    NotEditing,
    /// The draft failed local validation; nothing was sent.
    #[error("draft is invalid: {0}")]
    Validation(#[from] DraftValidationError),
    /// The ledger write failed.
    #[error("ledger rejected the submission: {0}")]
    Gateway(#[from] GatewayError),
}

/// Errors returned when editing the draft.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    /// The draft is locked while a submission is in flight.
    #[error("draft cannot be edited while a submission is in flight")]
    NotEditing,
    /// The field name is not one of the editable fields.
    #[error(transparent)]
    UnknownField(#[from] UnknownAccountField),
}

/// Snapshot of the controller handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DraftView {
    /// Current form values.
    pub draft: Draft,
    /// Current phase.
    pub phase: DraftPhase,
    /// Failure from the last submit, until the next edit or success.
    pub error: Option<SubmitError>,
}

#[derive(Default)]
struct DraftState {
    draft: Draft,
    phase: DraftPhase,
    error: Option<SubmitError>,
}

fn lock(state: &Mutex<DraftState>) -> MutexGuard<'_, DraftState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds the controller in `Submitting` and returns it to `Editing` when
/// dropped, so an abandoned submit leaves the draft editable and intact.
struct SubmitGuard<'a> {
    state: &'a Mutex<DraftState>,
    armed: bool,
}

impl SubmitGuard<'_> {
    fn settle(mut self, apply: impl FnOnce(&mut DraftState)) {
        let mut state = lock(self.state);
        apply(&mut state);
        state.phase = DraftPhase::Editing;
        self.armed = false;
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            lock(self.state).phase = DraftPhase::Editing;
            debug!("submission abandoned before completion; draft kept");
        }
    }
}

/// Form state machine for creating ledger entries.
pub struct DraftController {
    gateway: Arc<dyn LedgerGateway>,
    cache: CollectionCache,
    accounts_key: QueryKey,
    state: Mutex<DraftState>,
}

impl DraftController {
    /// Create a controller that writes through `gateway` and invalidates
    /// `accounts_key` in `cache` after each successful submit.
    #[must_use]
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        cache: CollectionCache,
        accounts_key: QueryKey,
    ) -> Self {
        Self {
            gateway,
            cache,
            accounts_key,
            state: Mutex::new(DraftState::default()),
        }
    }

    /// Key invalidated after a successful submit.
    #[must_use]
    pub const fn accounts_key(&self) -> &QueryKey {
        &self.accounts_key
    }

    /// Snapshot the draft, phase and last error.
    #[must_use]
    pub fn view(&self) -> DraftView {
        let state = lock(&self.state);
        DraftView {
            draft: state.draft.clone(),
            phase: state.phase,
            error: state.error.clone(),
        }
    }

    /// Replace one draft field. Any text is accepted; a pending error is
    /// cleared.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::NotEditing`] while a submit is in flight.
    pub fn set_field(&self, field: AccountField, value: impl Into<String>) -> Result<(), DraftError> {
        let mut state = lock(&self.state);
        if state.phase == DraftPhase::Submitting {
            return Err(DraftError::NotEditing);
        }
        state.draft.set(field, value);
        state.error = None;
        debug!(field = %field, "draft field updated");
        Ok(())
    }

    /// Replace a field addressed by its wire or camelCase name.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError::UnknownField`] for unrecognised names and
    /// [`DraftError::NotEditing`] while a submit is in flight.
    pub fn set_field_named(&self, name: &str, value: impl Into<String>) -> Result<(), DraftError> {
        let field: AccountField = name.parse()?;
        self.set_field(field, value)
    }

    /// Validate the draft and write it to the ledger.
    ///
    /// On success the draft resets to its defaults and the accounts
    /// collection is invalidated once. On failure the draft is kept and the
    /// error is attached to the view. Dropping the returned future before it
    /// completes returns the controller to editing without invalidating.
    ///
    /// # Errors
    ///
    /// Returns [`SubmitError::NotEditing`] when a submit is already running,
    /// [`SubmitError::Validation`] before any network call when the draft is
    /// incomplete, and [`SubmitError::Gateway`] when the write fails.
    pub async fn submit(&self) -> Result<CreateAck, SubmitError> {
        let (record, guard) = {
            let mut state = lock(&self.state);
            if state.phase == DraftPhase::Submitting {
                return Err(SubmitError::NotEditing);
            }
            match state.draft.to_record() {
                Ok(record) => {
                    state.phase = DraftPhase::Submitting;
                    state.error = None;
                    let guard = SubmitGuard {
                        state: &self.state,
                        armed: true,
                    };
                    (record, guard)
                }
                Err(invalid) => {
                    debug!(error = %invalid, "draft rejected before submission");
                    let failure = SubmitError::Validation(invalid);
                    state.error = Some(failure.clone());
                    return Err(failure);
                }
            }
        };

        match self.gateway.create(&record).await {
            Ok(ack) => {
                guard.settle(|state| {
                    state.draft = Draft::default();
                    state.error = None;
                });
                info!(
                    account_number = %record.account_number,
                    "account submitted"
                );
                self.cache.invalidate(&self.accounts_key);
                Ok(ack)
            }
            Err(error) => {
                warn!(error = %error, "account submission failed; draft kept");
                let failure = SubmitError::Gateway(error);
                guard.settle(|state| state.error = Some(failure.clone()));
                Err(failure)
            }
        }
    }
}

#[cfg(test)]
#[path = "draft_controller_tests.rs"]
mod tests;
