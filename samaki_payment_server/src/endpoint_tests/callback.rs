use actix_web::{http::StatusCode, test, web, App};
use samaki_payment_engine::{
    db_types::{ChargeStatus, Order, OrderStatusType},
    events::EventProducers,
    traits::OrderManagement,
    CheckoutApi,
    SettlementApi,
    SqliteDatabase,
};

use super::{
    helpers::{buyer, cart_for, delivery_choice, seed_catalog_item, seed_seller, success_payload, test_db},
    mocks::accepting_gateway,
};
use crate::{data_objects::JsonResponse, routes::MpesaCallbackRoute};

/// Seeds one seller/listing and checks out, leaving a PENDING charge with external id CRQ1. Returns the db and
/// the created order.
async fn order_with_pending_charge() -> (SqliteDatabase, Order) {
    let db = test_db().await;
    seed_seller(&db, "fisher-1").await;
    let fish = seed_catalog_item(&db, "fisher-1", "Tilapia Fresh").await;
    let checkout = CheckoutApi::new(db.clone(), accepting_gateway("CRQ1"), 200);
    let outcome = checkout.place_order(&buyer(), &cart_for(fish.id, 200), &delivery_choice()).await.unwrap();
    (db, outcome.order)
}

macro_rules! callback_app {
    ($db:expr) => {{
        let api = web::Data::new(SettlementApi::new($db, EventProducers::default()));
        test::init_service(App::new().app_data(api).service(MpesaCallbackRoute::<SqliteDatabase>::new())).await
    }};
}

#[actix_web::test]
async fn successful_callback_settles_the_charge() {
    let _ = env_logger::try_init();
    let (db, order) = order_with_pending_charge().await;
    let app = callback_app!(db.clone());

    let req = test::TestRequest::post()
        .uri("/mpesa/callback")
        .set_payload(success_payload("CRQ1", 1000))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: JsonResponse = test::read_body_json(resp).await;
    assert!(body.success);

    let order = db.fetch_order_by_number(&order.order_number).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::DeliveryInProgress);
    let charges = db.fetch_charges_for_order(order.id).await.unwrap();
    assert_eq!(charges[0].status, ChargeStatus::Completed);
    assert_eq!(charges[0].receipt_number, "NLJ7RT61SV");
}

#[actix_web::test]
async fn duplicate_callback_is_acknowledged_without_side_effects() {
    let _ = env_logger::try_init();
    let (db, order) = order_with_pending_charge().await;
    let app = callback_app!(db.clone());

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/mpesa/callback")
            .set_payload(success_payload("CRQ1", 1000))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
    // Exactly one ledger entry despite the duplicate delivery.
    assert_eq!(db.fetch_fee_entries_for_order(order.id).await.unwrap().len(), 1);
    assert_eq!(db.fetch_notifications_for_seller("fisher-1").await.unwrap().len(), 1);
}

#[actix_web::test]
async fn amount_mismatch_is_a_validation_error() {
    let _ = env_logger::try_init();
    let (db, order) = order_with_pending_charge().await;
    let app = callback_app!(db.clone());

    let req = test::TestRequest::post()
        .uri("/mpesa/callback")
        .set_payload(success_payload("CRQ1", 200))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let charges = db.fetch_charges_for_order(order.id).await.unwrap();
    assert_eq!(charges[0].status, ChargeStatus::Failed);
    assert!(charges[0].result_desc.contains("Amount mismatch"));
}

#[actix_web::test]
async fn unknown_external_id_is_not_found() {
    let _ = env_logger::try_init();
    let (db, _order) = order_with_pending_charge().await;
    let app = callback_app!(db);

    let req = test::TestRequest::post()
        .uri("/mpesa/callback")
        .set_payload(success_payload("CRQ-UNKNOWN", 1000))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn unparseable_payloads_are_rejected() {
    let _ = env_logger::try_init();
    let (db, _order) = order_with_pending_charge().await;
    let app = callback_app!(db);

    let req = test::TestRequest::post().uri("/mpesa/callback").set_payload("not json at all").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // A payload with no CheckoutRequestID is equally unusable.
    let req = test::TestRequest::post()
        .uri("/mpesa/callback")
        .set_payload(r#"{"Body": {"stkCallback": {"ResultCode": 0}}}"#)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn failed_charge_callbacks_are_reconciled_with_a_200() {
    let _ = env_logger::try_init();
    let (db, order) = order_with_pending_charge().await;
    let app = callback_app!(db.clone());

    let payload = r#"{
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "MRQ-CRQ1",
                "CheckoutRequestID": "CRQ1",
                "ResultCode": 1032,
                "ResultDesc": "Request cancelled by user"
            }
        }
    }"#;
    let req = test::TestRequest::post().uri("/mpesa/callback").set_payload(payload).to_request();
    let resp = test::call_service(&app, req).await;
    // The reconciliation itself succeeded; the body reports the failed payment.
    assert_eq!(resp.status(), StatusCode::OK);
    let body: JsonResponse = test::read_body_json(resp).await;
    assert!(!body.success);

    let order = db.fetch_order_by_number(&order.order_number).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Failed);
}
