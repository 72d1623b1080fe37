//! Tests for the draft controller state machine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rstest::rstest;
use serde_json::json;
use tokio::sync::Notify;

use super::*;
use crate::domain::collection_cache::{CacheConfig, CollectionState};
use crate::domain::ports::{MockLedgerGateway, PageParams};
use crate::domain::{AccountRecord, AccountType, Amount, RawEnvelope};
use crate::test_support::{
    MutableClock, ScriptedLedgerGateway, immediate_runtime, revisions_body, sample_record,
};

fn cache_over(gateway: &Arc<ScriptedLedgerGateway>) -> CollectionCache {
    CollectionCache::with_runtime(
        Arc::clone(gateway) as Arc<dyn LedgerGateway>,
        CacheConfig::default(),
        immediate_runtime(Arc::new(MutableClock::default())),
    )
}

fn alice() -> AccountRecord {
    AccountRecord {
        account_number: "AC1".to_owned(),
        account_name: "Alice".to_owned(),
        iban: "DE89370400440532013000".to_owned(),
        address: "1 Main St".to_owned(),
        amount: Amount::parse("100").expect("valid amount"),
        account_type: AccountType::Sending,
    }
}

fn fill_with(controller: &DraftController, record: &AccountRecord) {
    for field in AccountField::ALL {
        controller
            .set_field(field, field.value_of(record))
            .expect("editing");
    }
}

fn fill(controller: &DraftController, account_number: &str) {
    fill_with(controller, &sample_record(account_number));
}

fn make_controller(
    gateway: impl LedgerGateway + 'static,
    cache: CollectionCache,
) -> DraftController {
    DraftController::new(Arc::new(gateway), cache, QueryKey::accounts())
}

/// Gateway whose `create` waits for a [`Notify`] before acknowledging.
struct GatedCreateGateway {
    gate: Arc<Notify>,
}

#[async_trait]
impl LedgerGateway for GatedCreateGateway {
    async fn list(&self, _params: &PageParams) -> Result<RawEnvelope, GatewayError> {
        Ok(revisions_body(&[]))
    }

    async fn create(&self, _record: &AccountRecord) -> Result<CreateAck, GatewayError> {
        self.gate.notified().await;
        Ok(CreateAck::default())
    }
}

async fn wait_until_submitting(controller: &DraftController) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while controller.view().phase != DraftPhase::Submitting {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("controller should enter submitting");
}

#[tokio::test]
async fn successful_submit_resets_draft_and_invalidates_once() {
    let lists = Arc::new(ScriptedLedgerGateway::with_lists([
        Ok(revisions_body(&[])),
        Ok(revisions_body(&[sample_record("AC1")])),
    ]));
    let cache = cache_over(&lists);
    cache
        .settled(&QueryKey::accounts())
        .await
        .expect("initial load");

    let expected = alice();
    let mut gateway = MockLedgerGateway::new();
    gateway
        .expect_create()
        .times(1)
        .withf(move |record| *record == expected)
        .returning(|_| Ok(CreateAck(Some(json!({ "transactionId": "tx-1" })))));
    let controller = make_controller(gateway, cache.clone());
    fill_with(&controller, &alice());

    let ack = controller.submit().await.expect("submit succeeds");

    assert_eq!(ack, CreateAck(Some(json!({ "transactionId": "tx-1" }))));
    assert_eq!(controller.view(), DraftView::default());
    let records = cache
        .settled(&QueryKey::accounts())
        .await
        .expect("refetch after invalidation");
    assert_eq!(records.as_ref(), [sample_record("AC1")].as_slice());
    assert_eq!(lists.list_calls(), 2);
}

#[rstest]
#[case::blank_name(AccountField::AccountName, "  ")]
#[case::bad_amount(AccountField::Amount, "12,5")]
#[case::bad_type(AccountField::Type, "transfer")]
#[tokio::test]
async fn invalid_drafts_never_reach_the_gateway(#[case] field: AccountField, #[case] value: &str) {
    let mut gateway = MockLedgerGateway::new();
    gateway.expect_create().times(0);
    let cache = cache_over(&Arc::new(ScriptedLedgerGateway::default()));
    let controller = make_controller(gateway, cache);
    fill(&controller, "AC1");
    controller.set_field(field, value).expect("editing");

    let error = controller.submit().await.expect_err("validation fails");

    assert!(matches!(error, SubmitError::Validation(_)), "{error:?}");
    let view = controller.view();
    assert_eq!(view.phase, DraftPhase::Editing);
    assert_eq!(view.error, Some(error));
    assert_eq!(view.draft.get(field), value);
}

#[tokio::test]
async fn failed_create_keeps_draft_and_skips_invalidation() {
    let lists = Arc::new(ScriptedLedgerGateway::with_lists([Ok(revisions_body(&[]))]));
    let cache = cache_over(&lists);
    cache
        .settled(&QueryKey::accounts())
        .await
        .expect("initial load");
    let mut gateway = MockLedgerGateway::new();
    gateway
        .expect_create()
        .times(1)
        .returning(|_| Err(GatewayError::status(500_u16, "boom")));
    let controller = make_controller(gateway, cache.clone());
    fill(&controller, "AC1");
    let before = controller.view().draft;

    let error = controller.submit().await.expect_err("create fails");

    assert_eq!(error, SubmitError::Gateway(GatewayError::status(500_u16, "boom")));
    let view = controller.view();
    assert_eq!(view.draft, before);
    assert_eq!(view.phase, DraftPhase::Editing);
    assert_eq!(view.error, Some(error));
    tokio::task::yield_now().await;
    assert!(matches!(
        cache.read(&QueryKey::accounts()),
        CollectionState::Ready(_)
    ));
    assert_eq!(lists.list_calls(), 1);
}

#[tokio::test]
async fn editing_clears_the_attached_error() {
    let mut gateway = MockLedgerGateway::new();
    gateway.expect_create().times(0);
    let cache = cache_over(&Arc::new(ScriptedLedgerGateway::default()));
    let controller = make_controller(gateway, cache);

    controller.submit().await.expect_err("blank draft");
    assert!(controller.view().error.is_some());

    controller
        .set_field(AccountField::Iban, "DE89")
        .expect("editing");
    assert_eq!(controller.view().error, None);
}

#[tokio::test]
async fn edits_and_resubmits_are_rejected_while_submitting() {
    let gate = Arc::new(Notify::new());
    let gateway = GatedCreateGateway {
        gate: Arc::clone(&gate),
    };
    let cache = cache_over(&Arc::new(ScriptedLedgerGateway::default()));
    let controller = make_controller(gateway, cache);
    fill(&controller, "AC1");

    let (first, ()) = tokio::join!(controller.submit(), async {
        wait_until_submitting(&controller).await;
        assert_eq!(
            controller.set_field(AccountField::Iban, "changed"),
            Err(DraftError::NotEditing)
        );
        assert_eq!(controller.submit().await, Err(SubmitError::NotEditing));
        gate.notify_one();
    });

    first.expect("first submit completes");
    assert_eq!(controller.view(), DraftView::default());
}

#[tokio::test]
async fn abandoned_submit_returns_to_editing_with_draft_intact() {
    let gate = Arc::new(Notify::new());
    let gateway = GatedCreateGateway {
        gate: Arc::clone(&gate),
    };
    let lists = Arc::new(ScriptedLedgerGateway::default());
    let cache = cache_over(&lists);
    let controller = make_controller(gateway, cache);
    fill(&controller, "AC1");
    let before = controller.view().draft;

    let outcome = tokio::time::timeout(Duration::from_millis(50), controller.submit()).await;

    assert!(outcome.is_err(), "submit should still be waiting");
    let view = controller.view();
    assert_eq!(view.phase, DraftPhase::Editing);
    assert_eq!(view.draft, before);
    assert_eq!(view.error, None);
    assert_eq!(lists.list_calls(), 0);
}

#[rstest]
#[case("account_number", AccountField::AccountNumber)]
#[case("accountName", AccountField::AccountName)]
#[case("type", AccountField::Type)]
fn named_fields_resolve_wire_and_camel_case(#[case] name: &str, #[case] field: AccountField) {
    let cache = cache_over(&Arc::new(ScriptedLedgerGateway::default()));
    let controller = make_controller(MockLedgerGateway::new(), cache);

    controller.set_field_named(name, "x").expect("known field");

    assert_eq!(controller.view().draft.get(field), "x");
}

#[test]
fn unknown_field_names_are_rejected() {
    let cache = cache_over(&Arc::new(ScriptedLedgerGateway::default()));
    let controller = make_controller(MockLedgerGateway::new(), cache);

    let error = controller
        .set_field_named("balance", "1")
        .expect_err("unknown field");

    assert!(matches!(error, DraftError::UnknownField(_)));
    assert_eq!(controller.view().draft, Draft::default());
}
