use actix_web::{http::StatusCode, test, web, App};
use samaki_payment_engine::{db_types::OrderStatusType, traits::GatewayError, CheckoutApi, SqliteDatabase};
use smk_common::Kes;

use super::{
    helpers::{buyer, cart_for, delivery_choice, seed_catalog_item, seed_seller, test_db},
    mocks::{accepting_gateway, MockGateway},
};
use crate::{
    config::ServerOptions,
    data_objects::{CheckoutRequest, CheckoutResponse},
    routes::CheckoutRoute,
};

fn checkout_app(
    db: SqliteDatabase,
    gateway: MockGateway,
    callback_url_public: bool,
) -> (web::Data<CheckoutApi<SqliteDatabase, MockGateway>>, web::Data<ServerOptions>) {
    let api = web::Data::new(CheckoutApi::new(db, gateway, 200));
    let options = web::Data::new(ServerOptions { callback_url_public });
    (api, options)
}

#[actix_web::test]
async fn checkout_returns_order_reference_and_financials() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    seed_seller(&db, "fisher-1").await;
    let fish = seed_catalog_item(&db, "fisher-1", "Tilapia Fresh").await;

    let (api, options) = checkout_app(db, accepting_gateway("CRQ1"), true);
    let app = test::init_service(
        App::new().app_data(api).app_data(options).service(CheckoutRoute::<SqliteDatabase, MockGateway>::new()),
    )
    .await;

    let payload = CheckoutRequest { buyer: buyer(), cart: cart_for(fish.id, 200), fulfillment: delivery_choice() };
    let req = test::TestRequest::post().uri("/checkout").set_json(&payload).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: CheckoutResponse = test::read_body_json(resp).await;
    assert_eq!(body.status, OrderStatusType::Pending);
    assert_eq!(body.total_amount, Kes::from_shillings(1000));
    assert_eq!(body.platform_fee, Kes::from_shillings(20));
    assert_eq!(body.sellers_net_amount, Kes::from_shillings(980));
    assert!(body.charge_failures.is_empty());
    assert_eq!(body.order_number.as_str().len(), 8);
}

#[actix_web::test]
async fn checkout_reports_per_line_issuance_failures() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    seed_seller(&db, "fisher-1").await;
    let fish = seed_catalog_item(&db, "fisher-1", "Tilapia Fresh").await;

    let mut gateway = MockGateway::new();
    gateway
        .expect_initiate_charge()
        .returning(|_| Err(GatewayError::Rejected("Invalid PhoneNumber".to_string())));
    let (api, options) = checkout_app(db, gateway, true);
    let app = test::init_service(
        App::new().app_data(api).app_data(options).service(CheckoutRoute::<SqliteDatabase, MockGateway>::new()),
    )
    .await;

    let payload = CheckoutRequest { buyer: buyer(), cart: cart_for(fish.id, 100), fulfillment: delivery_choice() };
    let req = test::TestRequest::post().uri("/checkout").set_json(&payload).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: CheckoutResponse = test::read_body_json(resp).await;
    assert_eq!(body.status, OrderStatusType::Failed);
    assert_eq!(body.charge_failures.len(), 1);
    assert!(body.charge_failures[0].reason.contains("Invalid PhoneNumber"));
}

#[actix_web::test]
async fn checkout_is_refused_when_the_callback_url_is_not_public() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    seed_seller(&db, "fisher-1").await;
    let fish = seed_catalog_item(&db, "fisher-1", "Tilapia Fresh").await;

    let (api, options) = checkout_app(db, MockGateway::new(), false);
    let app = test::init_service(
        App::new().app_data(api).app_data(options).service(CheckoutRoute::<SqliteDatabase, MockGateway>::new()),
    )
    .await;

    let payload = CheckoutRequest { buyer: buyer(), cart: cart_for(fish.id, 100), fulfillment: delivery_choice() };
    let req = test::TestRequest::post().uri("/checkout").set_json(&payload).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn checkout_validation_failures_are_bad_requests() {
    let _ = env_logger::try_init();
    let db = test_db().await;
    let (api, options) = checkout_app(db, MockGateway::new(), true);
    let app = test::init_service(
        App::new().app_data(api).app_data(options).service(CheckoutRoute::<SqliteDatabase, MockGateway>::new()),
    )
    .await;

    // Empty cart
    let payload = CheckoutRequest {
        buyer: buyer(),
        cart: samaki_payment_engine::db_types::CartSnapshot::default(),
        fulfillment: delivery_choice(),
    };
    let req = test::TestRequest::post().uri("/checkout").set_json(&payload).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
