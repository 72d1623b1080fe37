//! Test doubles shared by unit and integration tests.
//!
//! Compiled for `cfg(test)` and behind the `test-support` feature so the
//! integration tests under `tests/` can reuse them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;
use serde_json::{Value, json};
use tokio::sync::Notify;

use crate::domain::ports::{CreateAck, GatewayError, LedgerGateway, PageParams};
use crate::domain::{
    AccountRecord, AccountType, Amount, BackoffJitter, CacheRuntime, FetchSleeper, RawEnvelope,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Build a valid record whose text fields derive from `account_number`.
#[must_use]
pub fn sample_record(account_number: &str) -> AccountRecord {
    AccountRecord {
        account_number: account_number.to_owned(),
        account_name: format!("Account {account_number}"),
        iban: format!("DE89{account_number}"),
        address: format!("{account_number} Ledger Street"),
        amount: Amount::zero(),
        account_type: AccountType::Sending,
    }
}

/// Wrap records in the revisioned envelope the ledger service returns.
#[must_use]
pub fn revisions_body(records: &[AccountRecord]) -> RawEnvelope {
    let revisions: Vec<Value> = records
        .iter()
        .map(|record| json!({ "document": record }))
        .collect();
    RawEnvelope::new(json!({ "revisions": revisions }))
}

/// Wrap records in the flat `{"accounts": [...]}` envelope.
#[must_use]
pub fn accounts_body(records: &[AccountRecord]) -> RawEnvelope {
    RawEnvelope::new(json!({ "accounts": records }))
}

/// Gateway replaying scripted list and create outcomes in order.
///
/// An exhausted list script fails with a non-retryable decode error; an
/// exhausted create script acknowledges with an empty body. An optional
/// [`Notify`] gate holds every list call until it is notified.
#[derive(Default)]
pub struct ScriptedLedgerGateway {
    lists: Mutex<VecDeque<Result<RawEnvelope, GatewayError>>>,
    creates: Mutex<VecDeque<Result<CreateAck, GatewayError>>>,
    created: Mutex<Vec<AccountRecord>>,
    list_params: Mutex<Vec<PageParams>>,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    active_lists: AtomicUsize,
    max_active_lists: AtomicUsize,
    list_gate: Option<Arc<Notify>>,
}

impl ScriptedLedgerGateway {
    /// Gateway with the given list outcomes and no create script.
    #[must_use]
    pub fn with_lists(lists: impl IntoIterator<Item = Result<RawEnvelope, GatewayError>>) -> Self {
        Self {
            lists: Mutex::new(lists.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Replace the create script.
    #[must_use]
    pub fn with_creates(
        self,
        creates: impl IntoIterator<Item = Result<CreateAck, GatewayError>>,
    ) -> Self {
        *lock(&self.creates) = creates.into_iter().collect();
        self
    }

    /// Hold list calls until `gate` is notified.
    #[must_use]
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.list_gate = Some(gate);
        self
    }

    /// Append one more list outcome.
    pub fn push_list(&self, outcome: Result<RawEnvelope, GatewayError>) {
        lock(&self.lists).push_back(outcome);
    }

    /// Number of list calls started.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of create calls started.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Highest number of list calls observed running at once.
    #[must_use]
    pub fn max_concurrent_lists(&self) -> usize {
        self.max_active_lists.load(Ordering::SeqCst)
    }

    /// Records passed to `create`, in call order.
    #[must_use]
    pub fn created(&self) -> Vec<AccountRecord> {
        lock(&self.created).clone()
    }

    /// Page parameters passed to `list`, in call order.
    #[must_use]
    pub fn list_params(&self) -> Vec<PageParams> {
        lock(&self.list_params).clone()
    }
}

#[async_trait]
impl LedgerGateway for ScriptedLedgerGateway {
    async fn list(&self, params: &PageParams) -> Result<RawEnvelope, GatewayError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.list_params).push(*params);
        let active = self.active_lists.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_lists.fetch_max(active, Ordering::SeqCst);
        if let Some(gate) = &self.list_gate {
            gate.notified().await;
        }
        let outcome = lock(&self.lists)
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::decode("list script exhausted")));
        self.active_lists.fetch_sub(1, Ordering::SeqCst);
        outcome
    }

    async fn create(&self, record: &AccountRecord) -> Result<CreateAck, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.created).push(record.clone());
        lock(&self.creates)
            .pop_front()
            .unwrap_or_else(|| Ok(CreateAck::default()))
    }
}

/// Gateway backed by an in-memory ledger.
///
/// Created records are listed back in the revisioned envelope, so a create
/// followed by a list observes the new record.
#[derive(Default)]
pub struct InMemoryLedgerGateway {
    records: Mutex<Vec<AccountRecord>>,
    fail_next_create: Mutex<Option<GatewayError>>,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl InMemoryLedgerGateway {
    /// Ledger pre-populated with `records`.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = AccountRecord>) -> Self {
        Self {
            records: Mutex::new(records.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Make the next create fail with `error` without storing the record.
    pub fn fail_next_create(&self, error: GatewayError) {
        *lock(&self.fail_next_create) = Some(error);
    }

    /// Snapshot of the stored records.
    #[must_use]
    pub fn records(&self) -> Vec<AccountRecord> {
        lock(&self.records).clone()
    }

    /// Number of list calls served.
    #[must_use]
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of create calls received.
    #[must_use]
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerGateway for InMemoryLedgerGateway {
    async fn list(&self, params: &PageParams) -> Result<RawEnvelope, GatewayError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let records = lock(&self.records);
        let skip = usize::try_from(
            params
                .page()
                .saturating_sub(1)
                .saturating_mul(params.per_page()),
        )
        .unwrap_or(usize::MAX);
        let take = usize::try_from(params.per_page()).unwrap_or(usize::MAX);
        let page: Vec<AccountRecord> = records.iter().skip(skip).take(take).cloned().collect();
        Ok(revisions_body(&page))
    }

    async fn create(&self, record: &AccountRecord) -> Result<CreateAck, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = lock(&self.fail_next_create).take() {
            return Err(error);
        }
        lock(&self.records).push(record.clone());
        Ok(CreateAck(Some(json!({ "transactionId": "tx-1" }))))
    }
}

/// Sleeper that returns immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateSleeper;

#[async_trait]
impl FetchSleeper for ImmediateSleeper {
    async fn sleep(&self, _duration: Duration) {}
}

/// Sleeper that records requested delays and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Delays requested so far.
    #[must_use]
    pub fn delays(&self) -> Vec<Duration> {
        lock(&self.delays).clone()
    }
}

#[async_trait]
impl FetchSleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        lock(&self.delays).push(duration);
    }
}

/// Jitter strategy returning the base delay unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl BackoffJitter for NoJitter {
    fn jittered_delay(&self, base: Duration, _attempt: u32, _now: DateTime<Utc>) -> Duration {
        base
    }
}

/// Instant the test clocks start at.
#[must_use]
pub fn test_epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Start the clock at `now`.
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let step = TimeDelta::from_std(delta).unwrap_or(TimeDelta::MAX);
        let mut now = lock(&self.0);
        *now = now.checked_add_signed(step).unwrap_or(DateTime::<Utc>::MAX_UTC);
    }
}

impl Default for MutableClock {
    fn default() -> Self {
        Self::new(test_epoch())
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *lock(&self.0)
    }
}

/// Runtime that never sleeps, never jitters and runs on `clock`.
#[must_use]
pub fn immediate_runtime(clock: Arc<MutableClock>) -> CacheRuntime {
    CacheRuntime {
        sleeper: Arc::new(ImmediateSleeper),
        jitter: Arc::new(NoJitter),
        clock,
    }
}
