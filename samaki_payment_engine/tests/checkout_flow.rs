//! Integration tests for the checkout orchestrator: order creation, financials, and the partial
//! charge-issuance-failure policy.
use samaki_payment_engine::{
    db_types::{ChargeStatus, OrderStatusType, PayoutKind},
    events::EventProducers,
    traits::{GatewayError, OrderManagement, SettlementDatabase},
    CheckoutApi,
    CheckoutError,
    SettlementApi,
};
use smk_common::Kes;

mod support;

use support::*;

const FEE_BPS: u32 = 200;

#[tokio::test]
async fn checkout_creates_pending_charge_per_item() {
    let db = setup().await;
    seed_seller(&db, "fisher-1").await;
    let fish = seed_catalog_item(&db, "fisher-1", "Tilapia Fresh", 500, 10).await;

    let gateway = StubGateway::default();
    gateway.enqueue_ok("CRQ1");
    let api = CheckoutApi::new(db.clone(), gateway.clone(), FEE_BPS);
    let outcome = api.place_order(&buyer(), &cart(&[(fish.id, 200)]), &delivery_choice()).await.unwrap();

    assert!(outcome.all_charges_issued());
    let order = &outcome.order;
    assert_eq!(order.status, OrderStatusType::Pending);
    assert_eq!(order.total_amount, Kes::from_shillings(1000));
    assert_eq!(order.platform_fee, Kes::from_shillings(20));
    assert_eq!(order.sellers_net_amount, Kes::from_shillings(980));

    let charges = db.fetch_charges_for_order(order.id).await.unwrap();
    assert_eq!(charges.len(), 1);
    let tx = &charges[0];
    assert_eq!(tx.status, ChargeStatus::Pending);
    assert_eq!(tx.checkout_request_id, "CRQ1");
    assert_eq!(tx.amount, Kes::from_shillings(1000));
    assert_eq!(tx.platform_fee, Kes::from_shillings(20));
    assert_eq!(tx.net_payout, Kes::from_shillings(980));

    // Charge issuance targeted the buyer's phone and quoted the order number.
    let instructions = gateway.instructions();
    assert_eq!(instructions.len(), 1);
    assert_eq!(instructions[0].payer_phone, "0712345678");
    assert_eq!(instructions[0].order_number, order.order_number);

    tear_down(db).await;
}

#[tokio::test]
async fn one_charge_per_seller_linked_line() {
    let db = setup().await;
    seed_seller(&db, "fisher-1").await;
    seed_seller(&db, "fisher-2").await;
    let tilapia = seed_catalog_item(&db, "fisher-1", "Tilapia", 500, 10).await;
    let octopus = seed_catalog_item(&db, "fisher-2", "Octopus", 800, 5).await;

    let gateway = StubGateway::default();
    let api = CheckoutApi::new(db.clone(), gateway, FEE_BPS);
    let outcome =
        api.place_order(&buyer(), &cart(&[(tilapia.id, 100), (octopus.id, 50)]), &delivery_choice()).await.unwrap();

    assert_eq!(outcome.line_items.len(), 2);
    // gross = 500 + 400; fee and net follow the 2% split
    assert_eq!(outcome.order.total_amount, Kes::from_shillings(900));
    assert_eq!(outcome.order.platform_fee, Kes::from_shillings(18));
    assert_eq!(outcome.order.sellers_net_amount, Kes::from_shillings(882));
    // per-line fees sum to the order fee for these amounts
    let fee_sum: Kes = outcome.line_items.iter().map(|l| l.platform_fee).sum();
    assert_eq!(fee_sum, outcome.order.platform_fee);

    let charges = db.fetch_charges_for_order(outcome.order.id).await.unwrap();
    assert_eq!(charges.len(), 2);
    assert!(charges.iter().all(|c| c.status == ChargeStatus::Pending));
    assert_eq!(charges[0].seller_id, "fisher-1");
    assert_eq!(charges[1].seller_id, "fisher-2");

    tear_down(db).await;
}

#[tokio::test]
async fn validation_failures_create_nothing() {
    let db = setup().await;
    seed_seller(&db, "fisher-1").await;
    let fish = seed_catalog_item(&db, "fisher-1", "Tilapia", 500, 2).await;
    let api = CheckoutApi::new(db.clone(), StubGateway::default(), FEE_BPS);

    // Empty cart
    let err = api.place_order(&buyer(), &cart(&[]), &delivery_choice()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart));

    // Unverified buyer email
    let mut unverified = buyer();
    unverified.email_verified = false;
    let err = api.place_order(&unverified, &cart(&[(fish.id, 100)]), &delivery_choice()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::BuyerEmailNotVerified));

    // More weight than is available
    let err = api.place_order(&buyer(), &cart(&[(fish.id, 500)]), &delivery_choice()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::ItemUnavailable(_)));

    // Delivery without a delivery location
    let mut choice = delivery_choice();
    choice.delivery_location = String::new();
    let err = api.place_order(&buyer(), &cart(&[(fish.id, 100)]), &choice).await.unwrap_err();
    assert!(matches!(err, CheckoutError::MissingFulfillmentTarget(_)));

    // No partial order was created by any of the failed attempts
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(db.pool()).await.unwrap();
    assert_eq!(count, 0);

    tear_down(db).await;
}

#[tokio::test]
async fn unpayable_seller_aborts_the_whole_checkout() {
    let db = setup().await;
    seed_seller(&db, "fisher-1").await;
    // fisher-2 wants paybill settlement but never configured a paybill number
    let profile = db
        .upsert_seller_profile(samaki_payment_engine::db_types::NewSellerProfile {
            seller_id: "fisher-2".to_string(),
            contact_phone: "0700000002".to_string(),
            payout_phone: "0700000002".to_string(),
            payout_kind: PayoutKind::Paybill,
            paybill_number: String::new(),
            till_number: String::new(),
            account_reference: String::new(),
            verified: true,
        })
        .await
        .unwrap();
    assert!(profile.payout_readiness().is_err());

    let tilapia = seed_catalog_item(&db, "fisher-1", "Tilapia", 500, 10).await;
    let octopus = seed_catalog_item(&db, "fisher-2", "Octopus", 800, 5).await;

    let api = CheckoutApi::new(db.clone(), StubGateway::default(), FEE_BPS);
    let err = api.place_order(&buyer(), &cart(&[(tilapia.id, 100), (octopus.id, 50)]), &delivery_choice()).await;
    assert!(matches!(err, Err(CheckoutError::SellerNotPayable { .. })));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders").fetch_one(db.pool()).await.unwrap();
    assert_eq!(count, 0, "a single unpayable seller must abort the entire checkout");

    tear_down(db).await;
}

#[tokio::test]
async fn complete_but_unverified_seller_is_auto_verified() {
    let db = setup().await;
    let profile = db
        .upsert_seller_profile(samaki_payment_engine::db_types::NewSellerProfile {
            seller_id: "fisher-1".to_string(),
            contact_phone: "0700000000".to_string(),
            payout_phone: "0700000000".to_string(),
            payout_kind: PayoutKind::StkPush,
            paybill_number: String::new(),
            till_number: String::new(),
            account_reference: String::new(),
            verified: false,
        })
        .await
        .unwrap();
    assert!(!profile.verified);
    let fish = seed_catalog_item(&db, "fisher-1", "Tilapia", 500, 10).await;

    let api = CheckoutApi::new(db.clone(), StubGateway::default(), FEE_BPS);
    api.place_order(&buyer(), &cart(&[(fish.id, 100)]), &delivery_choice()).await.unwrap();

    let profile = db.fetch_seller_profile("fisher-1").await.unwrap().unwrap();
    assert!(profile.verified);

    tear_down(db).await;
}

#[tokio::test]
async fn partial_issuance_failure_fails_the_order_but_keeps_live_charges() {
    let db = setup().await;
    seed_seller(&db, "fisher-1").await;
    seed_seller(&db, "fisher-2").await;
    let tilapia = seed_catalog_item(&db, "fisher-1", "Tilapia", 500, 10).await;
    let octopus = seed_catalog_item(&db, "fisher-2", "Octopus", 800, 5).await;

    let gateway = StubGateway::default();
    gateway.enqueue_ok("CRQ-OK");
    gateway.enqueue_err(GatewayError::Rejected("insufficient gateway balance".to_string()));
    let api = CheckoutApi::new(db.clone(), gateway, FEE_BPS);
    let outcome =
        api.place_order(&buyer(), &cart(&[(tilapia.id, 100), (octopus.id, 50)]), &delivery_choice()).await.unwrap();

    assert_eq!(outcome.order.status, OrderStatusType::Failed);
    assert_eq!(outcome.charge_failures.len(), 1);
    assert_eq!(outcome.charge_failures[0].item_name, "Octopus");

    let charges = db.fetch_charges_for_order(outcome.order.id).await.unwrap();
    assert_eq!(charges.len(), 2);
    let pending = charges.iter().find(|c| c.status == ChargeStatus::Pending).unwrap();
    let failed = charges.iter().find(|c| c.status == ChargeStatus::Failed).unwrap();
    assert_eq!(pending.checkout_request_id, "CRQ-OK");
    assert!(failed.checkout_request_id.starts_with("FAILED-"));
    assert!(failed.result_desc.contains("insufficient gateway balance"));

    // Money may already be in flight for the issued charge; its callback must still reconcile.
    let settlement = SettlementApi::new(db.clone(), EventProducers::default());
    let outcome2 = settlement.process_callback(success_callback("CRQ-OK", pending.amount)).await.unwrap();
    match outcome2 {
        samaki_payment_engine::traits::ReconcileOutcome::Settled(s) => {
            assert_eq!(s.charge.status, ChargeStatus::Completed);
            // The order stays FAILED: one charge never went out.
            assert!(!s.fully_settled);
            assert_eq!(s.order.status, OrderStatusType::Failed);
        },
        other => panic!("expected Settled, got {other:?}"),
    }

    tear_down(db).await;
}
