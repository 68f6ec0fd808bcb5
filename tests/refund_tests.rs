mod common;

use common::*;
use psp_mirror::entity::{RefundMirror, TransactionMirror};
use psp_mirror::payload::RefundPayloadBuilder;
use psp_mirror::psp::{RefundState, TransactionState};
use psp_mirror::store::{into_patch, Criteria, Repository};
use psp_mirror::RefundReconciler;
use uuid::Uuid;

fn reconciler(harness: &Harness) -> RefundReconciler {
    RefundReconciler::new(
        harness.settings.clone(),
        harness.catalog.transaction_mirrors.clone(),
        harness.catalog.refund_mirrors.clone(),
        RefundPayloadBuilder::new(),
    )
}

async fn track(harness: &Harness, transaction_id: i64) {
    let mirror = TransactionMirror {
        id: Uuid::new_v4(),
        transaction_id,
        space_id: SPACE_ID,
        sales_channel_id: TENANT.to_string(),
        data: serde_json::json!({"id": transaction_id}),
    };
    harness
        .catalog
        .transaction_mirrors
        .upsert(vec![into_patch(&mirror).unwrap()])
        .await
        .unwrap();
}

async fn refund_mirrors(harness: &Harness) -> Vec<RefundMirror> {
    harness.catalog.refund_mirrors.search(&Criteria::new()).await.unwrap()
}

#[tokio::test]
async fn refund_is_submitted_and_mirrored() {
    let harness = Harness::new();
    harness.provider.fix_refund_id(9001);
    track(&harness, 77).await;

    let refund = reconciler(&harness)
        .create(&transaction(77, TransactionState::Fulfill, 100.0), 25.5, &harness.context())
        .await
        .expect("refund should be created");

    assert_eq!(refund.id, 9001);
    let submitted = harness.provider.submitted_refunds();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].transaction, 77);
    assert_eq!(submitted[0].amount, 25.5);
    assert_eq!(submitted[0].space_id, SPACE_ID);

    let rows = refund_mirrors(&harness).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].refund_id, 9001);
    assert_eq!(rows[0].transaction_id, 77);
    assert_eq!(rows[0].space_id, SPACE_ID);
    assert_eq!(rows[0].state, RefundState::Successful);
    assert_eq!(rows[0].data["id"], 9001);
}

#[tokio::test]
async fn repeated_refund_id_updates_the_existing_mirror() {
    let harness = Harness::new();
    harness.provider.fix_refund_id(9001);
    track(&harness, 77).await;
    let reconciler = reconciler(&harness);
    let paid = transaction(77, TransactionState::Fulfill, 100.0);

    reconciler.create(&paid, 10.0, &harness.context()).await.unwrap();
    let first = refund_mirrors(&harness).await;

    reconciler.create(&paid, 15.0, &harness.context()).await.unwrap();
    let second = refund_mirrors(&harness).await;

    assert_eq!(second.len(), 1);
    assert_eq!(second[0].id, first[0].id);
    assert_eq!(second[0].data["amount"], 15.0);
}

#[tokio::test]
async fn declined_refund_makes_no_calls_and_no_writes() {
    let harness = Harness::new();
    track(&harness, 77).await;
    let reconciler = reconciler(&harness);

    let over_refund = reconciler
        .create(&transaction(77, TransactionState::Fulfill, 100.0), 100.01, &harness.context())
        .await;
    let not_fulfilled = reconciler
        .create(&transaction(77, TransactionState::Authorized, 100.0), 5.0, &harness.context())
        .await;

    assert!(over_refund.is_none());
    assert!(not_fulfilled.is_none());
    assert!(harness.provider.submitted_refunds().is_empty());
    assert!(refund_mirrors(&harness).await.is_empty());
}

#[tokio::test]
async fn untracked_transaction_yields_nothing() {
    let harness = Harness::new();

    let refund = reconciler(&harness)
        .create(&transaction(78, TransactionState::Fulfill, 100.0), 5.0, &harness.context())
        .await;

    assert!(refund.is_none());
    assert!(harness.provider.submitted_refunds().is_empty());
}

#[tokio::test]
async fn provider_failure_yields_nothing() {
    let harness = Harness::new();
    track(&harness, 77).await;
    harness.provider.set_unavailable(true);

    let refund = reconciler(&harness)
        .create(&transaction(77, TransactionState::Fulfill, 100.0), 5.0, &harness.context())
        .await;

    assert!(refund.is_none());
    assert!(refund_mirrors(&harness).await.is_empty());
}

#[tokio::test]
async fn distinct_refunds_get_distinct_mirrors() {
    let harness = Harness::new();
    track(&harness, 77).await;
    let reconciler = reconciler(&harness);
    let paid = transaction(77, TransactionState::Fulfill, 100.0);

    harness.provider.fix_refund_id(1);
    reconciler.create(&paid, 10.0, &harness.context()).await.unwrap();
    harness.provider.fix_refund_id(2);
    reconciler.create(&paid, 10.0, &harness.context()).await.unwrap();

    let mut ids: Vec<i64> = refund_mirrors(&harness).await.iter().map(|m| m.refund_id).collect();
    ids.sort();
    assert_eq!(ids, vec![1, 2]);
}
