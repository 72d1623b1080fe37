//! Synchronised collection cache.
//!
//! Holds the last normalised collection per [`QueryKey`] and coalesces
//! fetches so that at most one fetch per key is outstanding at any time.
//! A failed refresh keeps the previous collection visible alongside the
//! error (stale-but-shown).
//!
//! Fetches run as spawned Tokio tasks holding only a weak reference to the
//! cache, so a cache dropped mid-fetch simply discards the result.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::domain::ports::{GatewayError, LedgerGateway};
use crate::domain::{AccountRecord, MalformedResponse, normalize};

mod query_key;
mod runtime;

pub use query_key::{QueryKey, QueryKeyValidationError};
pub use runtime::{
    AttemptJitter, BackoffJitter, CacheConfig, CacheRuntime, FetchSleeper, TokioSleeper,
};

/// Shared, immutable view of one fetched collection.
pub type Collection = Arc<[AccountRecord]>;

/// Failures surfaced to readers of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The gateway call failed after any retries.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    /// The response matched no known envelope shape.
    #[error(transparent)]
    Malformed(#[from] MalformedResponse),
    /// The cache was dropped while a caller was waiting on it.
    #[error("collection cache was dropped before the fetch settled")]
    Detached,
}

/// What a reader currently sees for one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionState {
    /// A fetch is in flight; `previous` holds the last good collection.
    Pending {
        /// Last successfully fetched collection, if any.
        previous: Option<Collection>,
    },
    /// The collection is fresh.
    Ready(Collection),
    /// The last fetch failed; `previous` is still shown.
    Error {
        /// Why the fetch failed.
        error: CacheError,
        /// Last successfully fetched collection, if any.
        previous: Option<Collection>,
    },
}

impl CollectionState {
    /// Return whether a fetch is still outstanding.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Records to display, fresh or stale.
    #[must_use]
    pub const fn records(&self) -> Option<&Collection> {
        match self {
            Self::Ready(records) => Some(records),
            Self::Pending { previous } | Self::Error { previous, .. } => previous.as_ref(),
        }
    }

    /// Error to display, if the last fetch failed.
    #[must_use]
    pub const fn error(&self) -> Option<&CacheError> {
        match self {
            Self::Error { error, .. } => Some(error),
            Self::Pending { .. } | Self::Ready(_) => None,
        }
    }
}

struct CacheEntry {
    state: watch::Sender<CollectionState>,
    data: Option<Collection>,
    stale: bool,
    fetching: bool,
    refetch_queued: bool,
    error: Option<CacheError>,
    failed_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn new() -> Self {
        let (state, _) = watch::channel(CollectionState::Pending { previous: None });
        Self {
            state,
            data: None,
            stale: false,
            fetching: false,
            refetch_queued: false,
            error: None,
            failed_at: None,
        }
    }

    fn needs_fetch(&self, config: &CacheConfig, now: DateTime<Utc>) -> bool {
        if self.fetching || (self.data.is_some() && !self.stale) {
            return false;
        }
        self.failed_at
            .is_none_or(|failed_at| config.error_retry_due(failed_at, now))
    }

    fn snapshot(&self) -> CollectionState {
        let previous = self.data.clone();
        if self.fetching {
            return CollectionState::Pending { previous };
        }
        if let Some(error) = &self.error {
            return CollectionState::Error {
                error: error.clone(),
                previous,
            };
        }
        match previous {
            Some(records) if !self.stale => CollectionState::Ready(records),
            stale_or_missing => CollectionState::Pending {
                previous: stale_or_missing,
            },
        }
    }

    fn publish(&self) {
        self.state.send_replace(self.snapshot());
    }

    fn begin_fetch(&mut self) {
        self.fetching = true;
        self.error = None;
        self.publish();
    }
}

struct CacheShared {
    gateway: Arc<dyn LedgerGateway>,
    config: CacheConfig,
    runtime: CacheRuntime,
    entries: Mutex<HashMap<QueryKey, CacheEntry>>,
}

impl CacheShared {
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<QueryKey, CacheEntry>> {
        // Entries are only mutated in short, panic-free sections.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cache of account collections keyed by [`QueryKey`].
///
/// Cloning yields another handle to the same cache; separately constructed
/// caches never share state.
///
/// # Examples
///
/// ```rust,ignore
/// let cache = CollectionCache::new(gateway);
/// let key = QueryKey::accounts();
/// assert!(cache.read(&key).is_pending());
/// let records = cache.settled(&key).await?;
/// ```
#[derive(Clone)]
pub struct CollectionCache {
    shared: Arc<CacheShared>,
}

impl CollectionCache {
    /// Build a cache with the default retry policy and Tokio runtime helpers.
    #[must_use]
    pub fn new(gateway: Arc<dyn LedgerGateway>) -> Self {
        Self::with_runtime(gateway, CacheConfig::default(), CacheRuntime::default())
    }

    /// Build a cache with an explicit retry policy and runtime helpers.
    #[must_use]
    pub fn with_runtime(
        gateway: Arc<dyn LedgerGateway>,
        config: CacheConfig,
        runtime: CacheRuntime,
    ) -> Self {
        Self {
            shared: Arc::new(CacheShared {
                gateway,
                config,
                runtime,
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Return the current state for `key`, starting a fetch when needed.
    ///
    /// Fresh data is returned as [`CollectionState::Ready`]. A missing or
    /// stale entry starts exactly one fetch and reads as
    /// [`CollectionState::Pending`]; readers arriving while it runs share it.
    /// An entry in [`CollectionState::Error`] is fetched again once
    /// [`CacheConfig::error_retry_interval`] has passed since the failure;
    /// before that it is returned unchanged.
    ///
    /// # Panics
    ///
    /// Panics when a fetch must start outside a Tokio runtime.
    #[must_use]
    pub fn read(&self, key: &QueryKey) -> CollectionState {
        let mut entries = self.shared.lock_entries();
        let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);
        if entry.needs_fetch(&self.shared.config, self.shared.runtime.clock.utc()) {
            debug!(key = %key, "collection missing, stale or due for retry; fetching");
            entry.begin_fetch();
            spawn_fetch(&self.shared, key.clone());
        }
        entry.snapshot()
    }

    /// Mark `key` stale and schedule a refetch without waiting for it.
    ///
    /// Keys that were never read are left alone. When a fetch is already in
    /// flight the refetch runs after it settles.
    ///
    /// # Panics
    ///
    /// Panics when a fetch must start outside a Tokio runtime.
    pub fn invalidate(&self, key: &QueryKey) {
        let mut entries = self.shared.lock_entries();
        let Some(entry) = entries.get_mut(key) else {
            debug!(key = %key, "invalidate skipped; collection was never loaded");
            return;
        };
        info!(key = %key, "collection invalidated");
        schedule_refetch(&self.shared, entry, key);
    }

    /// Force a refetch of `key`, creating the entry when needed.
    ///
    /// Unlike [`CollectionCache::read`], this ignores the error retry
    /// interval.
    ///
    /// # Panics
    ///
    /// Panics when a fetch must start outside a Tokio runtime.
    pub fn refetch(&self, key: &QueryKey) {
        let mut entries = self.shared.lock_entries();
        let entry = entries.entry(key.clone()).or_insert_with(CacheEntry::new);
        schedule_refetch(&self.shared, entry, key);
    }

    /// Observe state changes for `key`.
    #[must_use]
    pub fn subscribe(&self, key: &QueryKey) -> watch::Receiver<CollectionState> {
        let mut entries = self.shared.lock_entries();
        entries
            .entry(key.clone())
            .or_insert_with(CacheEntry::new)
            .state
            .subscribe()
    }

    /// Wait until the current or next fetch of `key` settles.
    ///
    /// Starts a fetch under the same rules as [`CollectionCache::read`].
    ///
    /// # Errors
    ///
    /// Returns the fetch failure when the entry settles in the error state.
    ///
    /// # Panics
    ///
    /// Panics when a fetch must start outside a Tokio runtime.
    pub async fn settled(&self, key: &QueryKey) -> Result<Collection, CacheError> {
        let mut receiver = self.subscribe(key);
        let current = self.read(key);
        if !current.is_pending() {
            return settle(current);
        }
        let state = receiver
            .wait_for(|state| !state.is_pending())
            .await
            .map_err(|_| CacheError::Detached)?
            .clone();
        settle(state)
    }
}

fn settle(state: CollectionState) -> Result<Collection, CacheError> {
    match state {
        CollectionState::Ready(records) => Ok(records),
        CollectionState::Error { error, .. } => Err(error),
        CollectionState::Pending { .. } => Err(CacheError::Detached),
    }
}

fn schedule_refetch(shared: &Arc<CacheShared>, entry: &mut CacheEntry, key: &QueryKey) {
    entry.stale = true;
    if entry.fetching {
        debug!(key = %key, "fetch in flight; queueing refetch");
        entry.refetch_queued = true;
        return;
    }
    entry.begin_fetch();
    spawn_fetch(shared, key.clone());
}

fn spawn_fetch(shared: &Arc<CacheShared>, key: QueryKey) {
    let gateway = Arc::clone(&shared.gateway);
    let config = shared.config;
    let runtime = shared.runtime.clone();
    let owner = Arc::downgrade(shared);
    tokio::spawn(async move {
        let outcome = fetch_collection(gateway.as_ref(), config, &runtime, &key).await;
        let Some(cache_state) = owner.upgrade() else {
            debug!(key = %key, "collection cache dropped before fetch settled; discarding result");
            return;
        };
        complete_fetch(&cache_state, &key, outcome);
    });
}

fn complete_fetch(
    shared: &Arc<CacheShared>,
    key: &QueryKey,
    outcome: Result<Vec<AccountRecord>, CacheError>,
) {
    let mut entries = shared.lock_entries();
    let Some(entry) = entries.get_mut(key) else {
        return;
    };
    entry.fetching = false;
    match outcome {
        Ok(records) => {
            debug!(key = %key, count = records.len(), "collection fetched");
            entry.data = Some(records.into());
            entry.stale = false;
            entry.error = None;
            entry.failed_at = None;
        }
        Err(error) => {
            warn!(key = %key, error = %error, "collection fetch failed; keeping previous data");
            entry.error = Some(error);
            entry.failed_at = Some(shared.runtime.clock.utc());
        }
    }

    if std::mem::take(&mut entry.refetch_queued) {
        entry.stale = true;
        entry.begin_fetch();
        spawn_fetch(shared, key.clone());
        return;
    }
    entry.publish();
}

async fn fetch_collection(
    gateway: &dyn LedgerGateway,
    config: CacheConfig,
    runtime: &CacheRuntime,
    key: &QueryKey,
) -> Result<Vec<AccountRecord>, CacheError> {
    let max_attempts = config.max_retries.saturating_add(1);
    let mut attempt = 1;
    loop {
        match gateway.list(&key.params()).await {
            Ok(body) => return normalize(body).map_err(CacheError::from),
            Err(error) if error.is_retryable() && attempt < max_attempts => {
                let delay = runtime.jitter.jittered_delay(
                    config.retry_base_delay(attempt),
                    attempt,
                    runtime.clock.utc(),
                );
                warn!(
                    key = %key,
                    attempt,
                    error = %error,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "collection fetch attempt failed; retrying"
                );
                runtime.sleeper.sleep(delay).await;
                attempt += 1;
            }
            Err(error) => return Err(CacheError::Gateway(error)),
        }
    }
}
