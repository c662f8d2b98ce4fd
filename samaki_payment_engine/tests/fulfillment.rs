//! Integration tests for delivery-status transitions, their audit trail, and order cancellation.
use samaki_payment_engine::{
    db_types::{DeliveryStatus, OrderStatusType},
    events::EventProducers,
    traits::{OrderManagement, SettlementError},
    CheckoutApi,
    FulfillmentApi,
    SettlementApi,
};

mod support;

use support::*;

const FEE_BPS: u32 = 200;

/// Checks out one item and settles its charge, leaving the order in DELIVERY_IN_PROGRESS (or READY_FOR_PICKUP)
/// with a seeded delivery record.
async fn settled_order(pickup: bool) -> (samaki_payment_engine::SqliteDatabase, samaki_payment_engine::db_types::Order)
{
    let db = setup().await;
    seed_seller(&db, "fisher-1").await;
    let fish = seed_catalog_item(&db, "fisher-1", "Tilapia", 500, 10).await;
    let gateway = StubGateway::default();
    gateway.enqueue_ok("CRQ1");
    let checkout = CheckoutApi::new(db.clone(), gateway, FEE_BPS);
    let choice = if pickup { pickup_choice() } else { delivery_choice() };
    let outcome = checkout.place_order(&buyer(), &cart(&[(fish.id, 100)]), &choice).await.unwrap();
    let charge = &db.fetch_charges_for_order(outcome.order.id).await.unwrap()[0];
    let settlement = SettlementApi::new(db.clone(), EventProducers::default());
    settlement.process_callback(success_callback("CRQ1", charge.amount)).await.unwrap();
    let order = db.fetch_order_by_number(&outcome.order.order_number).await.unwrap().unwrap();
    (db, order)
}

#[tokio::test]
async fn delivery_runs_through_in_transit_to_delivered_with_audit() {
    let (db, order) = settled_order(false).await;
    let api = FulfillmentApi::new(db.clone());

    let delivery = api
        .update_delivery_status(&order.order_number, DeliveryStatus::InTransit, "rider-7", "Picked up from dock")
        .await
        .unwrap();
    assert_eq!(delivery.status, DeliveryStatus::InTransit);
    assert_eq!(delivery.updated_by, "rider-7");

    let delivery = api
        .update_delivery_status(&order.order_number, DeliveryStatus::Delivered, "rider-7", "Left with customer")
        .await
        .unwrap();
    assert_eq!(delivery.status, DeliveryStatus::Delivered);

    // The order follows physical fulfillment.
    let order = db.fetch_order_by_number(&order.order_number).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Delivered);

    // One audit entry per transition, capturing previous/new status and the acting identity.
    let audit = db.fetch_delivery_audit(order.id).await.unwrap();
    assert_eq!(audit.len(), 2);
    assert_eq!(audit[0].previous_status, DeliveryStatus::DeliveryInProgress);
    assert_eq!(audit[0].new_status, DeliveryStatus::InTransit);
    assert_eq!(audit[1].previous_status, DeliveryStatus::InTransit);
    assert_eq!(audit[1].new_status, DeliveryStatus::Delivered);
    assert!(audit.iter().all(|e| e.actor == "rider-7"));

    tear_down(db).await;
}

#[tokio::test]
async fn pickup_orders_end_as_picked_up() {
    let (db, order) = settled_order(true).await;
    let api = FulfillmentApi::new(db.clone());
    api.update_delivery_status(&order.order_number, DeliveryStatus::Delivered, "point-staff", "Collected").await.unwrap();
    let order = db.fetch_order_by_number(&order.order_number).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::PickedUp);
    tear_down(db).await;
}

#[tokio::test]
async fn terminal_deliveries_reject_further_transitions() {
    let (db, order) = settled_order(false).await;
    let api = FulfillmentApi::new(db.clone());
    api.update_delivery_status(&order.order_number, DeliveryStatus::Delivered, "rider-7", "").await.unwrap();
    let err =
        api.update_delivery_status(&order.order_number, DeliveryStatus::InTransit, "rider-7", "").await.unwrap_err();
    assert!(matches!(err, SettlementError::IllegalDeliveryTransition(_)));
    tear_down(db).await;
}

#[tokio::test]
async fn unpaid_orders_have_no_delivery_to_update() {
    let db = setup().await;
    seed_seller(&db, "fisher-1").await;
    let fish = seed_catalog_item(&db, "fisher-1", "Tilapia", 500, 10).await;
    let checkout = CheckoutApi::new(db.clone(), StubGateway::default(), FEE_BPS);
    let outcome = checkout.place_order(&buyer(), &cart(&[(fish.id, 100)]), &delivery_choice()).await.unwrap();

    let api = FulfillmentApi::new(db.clone());
    let err = api
        .update_delivery_status(&outcome.order.order_number, DeliveryStatus::InTransit, "rider-7", "")
        .await
        .unwrap_err();
    assert!(matches!(err, SettlementError::DeliveryNotFound(_)));
    tear_down(db).await;
}

#[tokio::test]
async fn only_pending_orders_can_be_cancelled() {
    let db = setup().await;
    seed_seller(&db, "fisher-1").await;
    let fish = seed_catalog_item(&db, "fisher-1", "Tilapia", 500, 10).await;
    let gateway = StubGateway::default();
    gateway.enqueue_ok("CRQ1");
    let checkout = CheckoutApi::new(db.clone(), gateway, FEE_BPS);
    let outcome = checkout.place_order(&buyer(), &cart(&[(fish.id, 100)]), &delivery_choice()).await.unwrap();

    let api = FulfillmentApi::new(db.clone());
    let cancelled = api.cancel_order(&outcome.order.order_number, "buyer-1").await.unwrap();
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);

    // Terminal: cancelling again is forbidden.
    let err = api.cancel_order(&outcome.order.order_number, "buyer-1").await.unwrap_err();
    assert!(matches!(err, SettlementError::OrderModificationForbidden(_)));
    tear_down(db).await;
}

#[tokio::test]
async fn order_summary_collects_the_full_picture() {
    let (db, order) = settled_order(false).await;
    let api = FulfillmentApi::new(db.clone());
    let summary = api.order_summary(&order.order_number).await.unwrap().expect("order must exist");
    assert_eq!(summary.order.id, order.id);
    assert_eq!(summary.line_items.len(), 1);
    assert_eq!(summary.charges.len(), 1);
    assert!(summary.delivery.is_some());
    assert!(api.order_summary(&"NOPE1234".parse().unwrap()).await.unwrap().is_none());
    tear_down(db).await;
}
