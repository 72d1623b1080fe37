//! Domain model and orchestration for the ledger client.
//!
//! Purpose: keep a local draft, the remote account collection and the cache
//! between them consistent without knowing how the ledger is reached. The
//! only outbound dependency is the [`ports::LedgerGateway`] trait.
//!
//! Public surface:
//! - `AccountRecord`, `AccountType`, `Amount`, `AccountField`: the ledger
//!   entry model and its wire names.
//! - `normalize`: flattens either list envelope into records.
//! - `CollectionCache`: coalescing, stale-but-shown collection cache.
//! - `DraftController`: the new-entry form state machine.
//! - `LedgerSession`: the presentation boundary combining both.

mod account;
mod amount;
pub mod collection_cache;
mod draft;
pub mod draft_controller;
mod envelope;
pub mod ports;
pub mod session;

pub use self::account::{
    AccountField, AccountRecord, AccountType, UnknownAccountField, UnknownAccountType,
};
pub use self::amount::{Amount, AmountError};
pub use self::collection_cache::{
    AttemptJitter, BackoffJitter, CacheConfig, CacheError, CacheRuntime, Collection,
    CollectionCache, CollectionState, FetchSleeper, QueryKey, QueryKeyValidationError,
    TokioSleeper,
};
pub use self::draft::{DEFAULT_DRAFT_AMOUNT, Draft, DraftValidationError};
pub use self::draft_controller::{DraftController, DraftError, DraftPhase, DraftView, SubmitError};
pub use self::envelope::{AccountEnvelope, MalformedResponse, RawEnvelope, Revision, normalize};
pub use self::session::{LedgerSession, SessionError, SessionView, UiEvent};
