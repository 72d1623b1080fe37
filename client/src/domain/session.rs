//! Presentation boundary tying the draft controller to the collection cache.
//!
//! A renderer reads one [`SessionView`] and feeds user input back as
//! [`UiEvent`]s; it never touches the gateway directly.

use std::sync::Arc;

use thiserror::Error;

use super::collection_cache::{CacheConfig, CacheRuntime, CollectionCache, CollectionState, QueryKey};
use super::draft_controller::{DraftController, DraftError, DraftView, SubmitError};
use super::ports::LedgerGateway;

/// Input forwarded by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// A form field changed.
    FieldChange {
        /// Wire or camelCase field name.
        name: String,
        /// New raw text.
        value: String,
    },
    /// The user asked to submit the draft.
    Submit,
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionView {
    /// Form values, phase and last submit error.
    pub draft: DraftView,
    /// State of the accounts collection.
    pub collection: CollectionState,
}

/// Failures from handling a [`UiEvent`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A field edit was rejected.
    #[error(transparent)]
    Draft(#[from] DraftError),
    /// A submit failed.
    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// One user's view of the ledger: a draft form plus the accounts table.
pub struct LedgerSession {
    cache: CollectionCache,
    controller: DraftController,
}

impl LedgerSession {
    /// Build a session with the default retry policy.
    #[must_use]
    pub fn new(gateway: Arc<dyn LedgerGateway>) -> Self {
        Self::with_cache(gateway, CacheConfig::default(), CacheRuntime::default())
    }

    /// Build a session with an explicit cache policy and runtime helpers.
    #[must_use]
    pub fn with_cache(
        gateway: Arc<dyn LedgerGateway>,
        config: CacheConfig,
        runtime: CacheRuntime,
    ) -> Self {
        let cache = CollectionCache::with_runtime(Arc::clone(&gateway), config, runtime);
        let controller = DraftController::new(gateway, cache.clone(), QueryKey::accounts());
        Self { cache, controller }
    }

    /// Shared collection cache.
    #[must_use]
    pub const fn cache(&self) -> &CollectionCache {
        &self.cache
    }

    /// The draft controller.
    #[must_use]
    pub const fn controller(&self) -> &DraftController {
        &self.controller
    }

    /// Key of the accounts collection shown by this session.
    #[must_use]
    pub const fn accounts_key(&self) -> &QueryKey {
        self.controller.accounts_key()
    }

    /// Snapshot the draft and the accounts collection.
    ///
    /// Reading the collection may start a fetch.
    ///
    /// # Panics
    ///
    /// Panics when a fetch must start outside a Tokio runtime.
    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView {
            draft: self.controller.view(),
            collection: self.cache.read(self.accounts_key()),
        }
    }

    /// Apply one presentation event.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Draft`] for rejected edits and
    /// [`SessionError::Submit`] for failed submits. Either way the failure is
    /// also visible in the next [`LedgerSession::view`] when it concerns the
    /// draft.
    pub async fn handle(&self, event: UiEvent) -> Result<(), SessionError> {
        match event {
            UiEvent::FieldChange { name, value } => {
                self.controller.set_field_named(&name, value)?;
            }
            UiEvent::Submit => {
                self.controller.submit().await?;
            }
        }
        Ok(())
    }
}
