//! Integration tests for the callback reconciler: idempotency, amount validation, partial settlement, and the
//! order/delivery/ledger transitions that hang off a settled charge.
use samaki_payment_engine::{
    db_types::{
        CatalogAction,
        ChargeStatus,
        DeliveryStatus,
        NewPhoneVerification,
        OrderStatusType,
        PaymentCallback,
    },
    events::EventProducers,
    traits::{OrderManagement, ReconcileOutcome, SettlementDatabase, SettlementError},
    CheckoutApi,
    SettlementApi,
};
use smk_common::{Kes, Kg};

mod support;

use support::*;

const FEE_BPS: u32 = 200;

struct Scenario {
    db: samaki_payment_engine::SqliteDatabase,
    settlement: SettlementApi<samaki_payment_engine::SqliteDatabase>,
    order: samaki_payment_engine::db_types::Order,
    charges: Vec<samaki_payment_engine::db_types::ChargeRequest>,
    item_ids: Vec<i64>,
}

/// Seeds two sellers with one listing each, checks out both, and returns the created order with its two PENDING
/// charges (external ids CRQ1 / CRQ2).
async fn two_seller_order(pickup: bool) -> Scenario {
    let db = setup().await;
    seed_seller(&db, "fisher-1").await;
    seed_seller(&db, "fisher-2").await;
    let tilapia = seed_catalog_item(&db, "fisher-1", "Tilapia", 500, 10).await;
    let octopus = seed_catalog_item(&db, "fisher-2", "Octopus", 800, 5).await;

    let gateway = StubGateway::default();
    gateway.enqueue_ok("CRQ1");
    gateway.enqueue_ok("CRQ2");
    let checkout = CheckoutApi::new(db.clone(), gateway, FEE_BPS);
    let choice = if pickup { pickup_choice() } else { delivery_choice() };
    let outcome = checkout.place_order(&buyer(), &cart(&[(tilapia.id, 200), (octopus.id, 100)]), &choice).await.unwrap();
    assert!(outcome.all_charges_issued());

    let charges = db.fetch_charges_for_order(outcome.order.id).await.unwrap();
    let settlement = SettlementApi::new(db.clone(), EventProducers::default());
    Scenario { db, settlement, order: outcome.order, charges, item_ids: vec![tilapia.id, octopus.id] }
}

#[tokio::test]
async fn full_settlement_reaches_in_progress_and_deducts_stock() {
    let s = two_seller_order(false).await;
    let [c1, c2] = &s.charges[..] else { panic!("expected two charges") };

    // First settlement: partial marker only, no stock or delivery side effects yet.
    let outcome = s.settlement.process_callback(success_callback("CRQ1", c1.amount)).await.unwrap();
    let ReconcileOutcome::Settled(settled) = outcome else { panic!("expected Settled") };
    assert!(!settled.fully_settled);
    assert_eq!(settled.order.status, OrderStatusType::Paid);
    assert!(settled.delivery.is_none());
    let item = s.db.fetch_catalog_item(s.item_ids[0]).await.unwrap().unwrap();
    assert_eq!(item.available_weight, Kg::from_kg(10), "stock must not move before full settlement");

    // Second settlement: the order completes.
    let outcome = s.settlement.process_callback(success_callback("CRQ2", c2.amount)).await.unwrap();
    let ReconcileOutcome::Settled(settled) = outcome else { panic!("expected Settled") };
    assert!(settled.fully_settled);
    assert_eq!(settled.order.status, OrderStatusType::DeliveryInProgress);
    let delivery = settled.delivery.expect("full settlement must seed a delivery record");
    assert_eq!(delivery.status, DeliveryStatus::DeliveryInProgress);

    // Stock was deducted by exactly the line weights.
    let tilapia = s.db.fetch_catalog_item(s.item_ids[0]).await.unwrap().unwrap();
    let octopus = s.db.fetch_catalog_item(s.item_ids[1]).await.unwrap().unwrap();
    assert_eq!(tilapia.available_weight, Kg::from_kg(8));
    assert_eq!(octopus.available_weight, Kg::from_kg(4));

    // Exactly one delivery row exists.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM deliveries WHERE order_id = $1")
        .bind(s.order.id)
        .fetch_one(s.db.pool())
        .await
        .unwrap();
    assert_eq!(count, 1);

    // Both lines are PAID and each produced one notification and one fee entry.
    let lines = s.db.fetch_line_items(s.order.id).await.unwrap();
    assert!(lines.iter().all(|l| l.status == samaki_payment_engine::db_types::LineStatus::Paid));
    let fees = s.db.fetch_fee_entries_for_order(s.order.id).await.unwrap();
    assert_eq!(fees.len(), 2);
    assert_eq!(s.db.fetch_notifications_for_seller("fisher-1").await.unwrap().len(), 1);
    assert_eq!(s.db.fetch_notifications_for_seller("fisher-2").await.unwrap().len(), 1);

    tear_down(s.db).await;
}

#[tokio::test]
async fn pickup_orders_settle_to_ready_for_pickup() {
    let s = two_seller_order(true).await;
    let [c1, c2] = &s.charges[..] else { panic!("expected two charges") };
    s.settlement.process_callback(success_callback("CRQ1", c1.amount)).await.unwrap();
    let outcome = s.settlement.process_callback(success_callback("CRQ2", c2.amount)).await.unwrap();
    let ReconcileOutcome::Settled(settled) = outcome else { panic!("expected Settled") };
    assert_eq!(settled.order.status, OrderStatusType::ReadyForPickup);
    assert_eq!(settled.delivery.unwrap().status, DeliveryStatus::ReadyForPickup);
    tear_down(s.db).await;
}

#[tokio::test]
async fn duplicate_success_callback_is_a_pure_no_op() {
    let s = two_seller_order(false).await;
    let [c1, c2] = &s.charges[..] else { panic!("expected two charges") };
    s.settlement.process_callback(success_callback("CRQ1", c1.amount)).await.unwrap();
    s.settlement.process_callback(success_callback("CRQ2", c2.amount)).await.unwrap();

    let before = s.db.fetch_order_by_number(&s.order.order_number).await.unwrap().unwrap();
    let stock_before = s.db.fetch_catalog_item(s.item_ids[0]).await.unwrap().unwrap().available_weight;

    // Submit the identical callback again.
    let outcome = s.settlement.process_callback(success_callback("CRQ1", c1.amount)).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::DuplicateIgnored { .. }));

    // Exactly one COMPLETED charge for that id, one notification, one fee entry, and untouched state.
    let charges = s.db.fetch_charges_for_order(s.order.id).await.unwrap();
    assert_eq!(charges.iter().filter(|c| c.checkout_request_id == "CRQ1").count(), 1);
    assert_eq!(s.db.fetch_notifications_for_seller("fisher-1").await.unwrap().len(), 1);
    assert_eq!(s.db.fetch_fee_entries_for_order(s.order.id).await.unwrap().len(), 2);
    let after = s.db.fetch_order_by_number(&s.order.order_number).await.unwrap().unwrap();
    assert_eq!(after.status, before.status);
    let stock_after = s.db.fetch_catalog_item(s.item_ids[0]).await.unwrap().unwrap().available_weight;
    assert_eq!(stock_after, stock_before, "duplicate callbacks must not re-run stock deduction");

    tear_down(s.db).await;
}

#[tokio::test]
async fn amount_mismatch_fails_the_charge_only() {
    let s = two_seller_order(false).await;
    let [c1, c2] = &s.charges[..] else { panic!("expected two charges") };

    let wrong = c1.amount + Kes::from_shillings(1);
    let outcome = s.settlement.process_callback(success_callback("CRQ1", wrong)).await.unwrap();
    let ReconcileOutcome::AmountMismatch { charge, expected, actual } = outcome else {
        panic!("expected AmountMismatch")
    };
    assert_eq!(charge.status, ChargeStatus::Failed);
    assert_eq!(expected, c1.amount);
    assert_eq!(actual, wrong);
    assert!(charge.result_desc.contains("Amount mismatch"));

    // The other charge is untouched, and the order status was not advanced by the rejected callback.
    let charges = s.db.fetch_charges_for_order(s.order.id).await.unwrap();
    let other = charges.iter().find(|c| c.checkout_request_id == "CRQ2").unwrap();
    assert_eq!(other.status, ChargeStatus::Pending);
    assert_eq!(other.amount, c2.amount);
    let order = s.db.fetch_order_by_number(&s.order.order_number).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Pending);

    tear_down(s.db).await;
}

#[tokio::test]
async fn failure_callback_fails_order_and_releases_stock() {
    let s = two_seller_order(false).await;

    let outcome = s.settlement.process_callback(failure_callback("CRQ1")).await.unwrap();
    let ReconcileOutcome::ChargeFailed { order, charge } = outcome else { panic!("expected ChargeFailed") };
    assert_eq!(charge.status, ChargeStatus::Failed);
    assert_eq!(charge.result_code, Some(1032));
    assert_eq!(order.status, OrderStatusType::Failed);

    let log = s.db.fetch_catalog_log(s.item_ids[0]).await.unwrap();
    assert!(log.iter().any(|e| e.action == CatalogAction::StockReleased));
    // No stock was ever deducted, so none comes back.
    let item = s.db.fetch_catalog_item(s.item_ids[0]).await.unwrap().unwrap();
    assert_eq!(item.available_weight, Kg::from_kg(10));

    // A later callback for the already-FAILED charge is accepted and overwrites the result fields.
    let mut second = failure_callback("CRQ1");
    second.result_code = 1037;
    second.result_desc = "DS timeout".to_string();
    let outcome = s.settlement.process_callback(second).await.unwrap();
    let ReconcileOutcome::ChargeFailed { charge, .. } = outcome else { panic!("expected ChargeFailed") };
    assert_eq!(charge.result_code, Some(1037));
    assert_eq!(charge.result_desc, "DS timeout");

    tear_down(s.db).await;
}

#[tokio::test]
async fn unknown_result_codes_are_failures() {
    let s = two_seller_order(false).await;
    // The integration layer normalises unparseable codes to -1 with success = false; the engine must treat that
    // as failure, never success.
    let callback = PaymentCallback {
        external_id: "CRQ1".to_string(),
        result_code: -1,
        result_desc: "???".to_string(),
        success: false,
        amount: None,
        receipt: None,
    };
    let outcome = s.settlement.process_callback(callback).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::ChargeFailed { .. }));
    tear_down(s.db).await;
}

#[tokio::test]
async fn unmatched_external_id_is_not_found() {
    let s = two_seller_order(false).await;
    let err = s.settlement.process_callback(success_callback("CRQ-UNKNOWN", Kes::from_shillings(1))).await.unwrap_err();
    assert!(matches!(err, SettlementError::ChargeNotFound(_)));
    tear_down(s.db).await;
}

#[tokio::test]
async fn verification_callbacks_reconcile_the_verification_flow() {
    let db = setup().await;
    seed_seller(&db, "fisher-1").await;
    db.insert_phone_verification(NewPhoneVerification {
        seller_id: "fisher-1".to_string(),
        phone_number: "0700000000".to_string(),
        amount: Kes::from_shillings(1),
        merchant_request_id: "MRQ-V1".to_string(),
        checkout_request_id: "VRFY1".to_string(),
    })
    .await
    .unwrap();
    let settlement = SettlementApi::new(db.clone(), EventProducers::default());

    let outcome = settlement.process_callback(success_callback("VRFY1", Kes::from_shillings(1))).await.unwrap();
    let ReconcileOutcome::VerificationCompleted { verification } = outcome else {
        panic!("expected VerificationCompleted")
    };
    assert_eq!(verification.status, ChargeStatus::Completed);
    assert_eq!(verification.receipt_number, "NLJ7RT61SV");
    let profile = db.fetch_seller_profile("fisher-1").await.unwrap().unwrap();
    assert!(profile.phone_verified);

    // Duplicate verification callbacks are no-ops reported as success.
    let outcome = settlement.process_callback(success_callback("VRFY1", Kes::from_shillings(1))).await.unwrap();
    assert!(matches!(outcome, ReconcileOutcome::VerificationCompleted { .. }));

    // And orders were never involved.
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(db.pool()).await.unwrap();
    assert_eq!(count, 0);

    tear_down(db).await;
}

#[tokio::test]
async fn failed_verification_does_not_verify_the_phone() {
    let db = setup().await;
    seed_seller(&db, "fisher-1").await;
    db.insert_phone_verification(NewPhoneVerification {
        seller_id: "fisher-1".to_string(),
        phone_number: "0700000000".to_string(),
        amount: Kes::from_shillings(1),
        merchant_request_id: String::new(),
        checkout_request_id: "VRFY2".to_string(),
    })
    .await
    .unwrap();
    let settlement = SettlementApi::new(db.clone(), EventProducers::default());
    let outcome = settlement.process_callback(failure_callback("VRFY2")).await.unwrap();
    let ReconcileOutcome::VerificationFailed { verification } = outcome else { panic!("expected VerificationFailed") };
    assert_eq!(verification.status, ChargeStatus::Failed);
    let profile = db.fetch_seller_profile("fisher-1").await.unwrap().unwrap();
    assert!(!profile.phone_verified);
    tear_down(db).await;
}
