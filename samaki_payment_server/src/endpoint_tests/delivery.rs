use actix_web::{http::StatusCode, test, web, App};
use samaki_payment_engine::{
    db_types::{DeliveryStatus, Order, OrderStatusType, PaymentCallback},
    events::EventProducers,
    traits::OrderManagement,
    CheckoutApi,
    FulfillmentApi,
    SettlementApi,
    SqliteDatabase,
};
use smk_common::Kes;

use super::{
    helpers::{buyer, cart_for, delivery_choice, seed_catalog_item, seed_seller, test_db},
    mocks::accepting_gateway,
};
use crate::{
    data_objects::{CancelOrderRequest, DeliveryUpdateRequest},
    routes::{CancelOrderRoute, DeliveryUpdateRoute, OrderDetailRoute},
};

/// Checks out one line and settles its charge so a delivery record exists.
async fn settled_order() -> (SqliteDatabase, Order) {
    let db = test_db().await;
    seed_seller(&db, "fisher-1").await;
    let fish = seed_catalog_item(&db, "fisher-1", "Tilapia Fresh").await;
    let checkout = CheckoutApi::new(db.clone(), accepting_gateway("CRQ1"), 200);
    let outcome = checkout.place_order(&buyer(), &cart_for(fish.id, 200), &delivery_choice()).await.unwrap();
    let settlement = SettlementApi::new(db.clone(), EventProducers::default());
    settlement
        .process_callback(PaymentCallback {
            external_id: "CRQ1".to_string(),
            result_code: 0,
            result_desc: "ok".to_string(),
            success: true,
            amount: Some(Kes::from_shillings(1000)),
            receipt: Some("NLJ7RT61SV".to_string()),
        })
        .await
        .unwrap();
    let order = db.fetch_order_by_number(&outcome.order.order_number).await.unwrap().unwrap();
    (db, order)
}

macro_rules! fulfillment_app {
    ($db:expr) => {{
        let api = web::Data::new(FulfillmentApi::new($db));
        test::init_service(
            App::new()
                .app_data(api)
                .service(OrderDetailRoute::<SqliteDatabase>::new())
                .service(DeliveryUpdateRoute::<SqliteDatabase>::new())
                .service(CancelOrderRoute::<SqliteDatabase>::new()),
        )
        .await
    }};
}

#[actix_web::test]
async fn delivery_updates_are_applied_and_audited() {
    let _ = env_logger::try_init();
    let (db, order) = settled_order().await;
    let app = fulfillment_app!(db.clone());

    let body = DeliveryUpdateRequest { status: DeliveryStatus::Delivered, actor: "deliver1".to_string(), note: String::new() };
    let req = test::TestRequest::post()
        .uri(&format!("/orders/{}/delivery", order.order_number.as_str()))
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let order = db.fetch_order_by_number(&order.order_number).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Delivered);
    let audit = db.fetch_delivery_audit(order.id).await.unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].actor, "deliver1");
    assert_eq!(audit[0].new_status, DeliveryStatus::Delivered);
}

#[actix_web::test]
async fn illegal_delivery_transitions_are_rejected() {
    let _ = env_logger::try_init();
    let (db, order) = settled_order().await;
    let app = fulfillment_app!(db);

    // DELIVERY_IN_PROGRESS -> PENDING is not a legal move for a delivery actor.
    let body = DeliveryUpdateRequest { status: DeliveryStatus::Pending, actor: "deliver1".to_string(), note: String::new() };
    let req = test::TestRequest::post()
        .uri(&format!("/orders/{}/delivery", order.order_number.as_str()))
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn unknown_orders_are_not_found() {
    let _ = env_logger::try_init();
    let (db, _order) = settled_order().await;
    let app = fulfillment_app!(db);

    let req = test::TestRequest::get().uri("/orders/NOPE1234").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body = DeliveryUpdateRequest { status: DeliveryStatus::Delivered, actor: "deliver1".to_string(), note: String::new() };
    let req = test::TestRequest::post().uri("/orders/NOPE1234/delivery").set_json(&body).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn order_detail_returns_the_full_summary() {
    let _ = env_logger::try_init();
    let (db, order) = settled_order().await;
    let app = fulfillment_app!(db);

    let req = test::TestRequest::get().uri(&format!("/orders/{}", order.order_number.as_str())).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let summary: samaki_payment_engine::order_objects::OrderResult = test::read_body_json(resp).await;
    assert_eq!(summary.order.order_number, order.order_number);
    assert_eq!(summary.line_items.len(), 1);
    assert_eq!(summary.charges.len(), 1);
    assert!(summary.delivery.is_some());
}

#[actix_web::test]
async fn settled_orders_cannot_be_cancelled() {
    let _ = env_logger::try_init();
    let (db, order) = settled_order().await;
    let app = fulfillment_app!(db);

    let body = CancelOrderRequest { actor: "buyer-1".to_string() };
    let req = test::TestRequest::post()
        .uri(&format!("/orders/{}/cancel", order.order_number.as_str()))
        .set_json(&body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
