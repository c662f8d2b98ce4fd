use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use daraja_tools::DarajaApi;
use log::*;
use samaki_payment_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    CheckoutApi,
    FulfillmentApi,
    SettlementApi,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    integrations::daraja::DarajaGateway,
    routes::{health, CancelOrderRoute, CheckoutRoute, DeliveryUpdateRoute, MpesaCallbackRoute, OrderDetailRoute},
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(25, notification_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The default notification sink: settlement events are logged. A production deployment can hang SMS/email
/// senders off the same hooks.
fn notification_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks.on_payment_received(|ev| {
        info!("📣️ Seller {}: {}", ev.notification.seller_id, ev.notification.message);
        Box::pin(async {})
    });
    hooks.on_order_settled(|ev| {
        info!("📣️ Order {} is fully settled ({})", ev.order.order_number, ev.order.status);
        Box::pin(async {})
    });
    hooks.on_order_failed(|ev| {
        warn!("📣️ Order {} failed: {}", ev.order.order_number, ev.charge.result_desc);
        Box::pin(async {})
    });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let gateway = DarajaApi::new(config.daraja.clone())
        .map(DarajaGateway::new)
        .map_err(|e| ServerError::InitializeError(format!("Could not initialize the Daraja client: {e}")))?;
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutApi::new(db.clone(), gateway.clone(), config.platform_fee_bps);
        let settlement_api = SettlementApi::new(db.clone(), producers.clone());
        let fulfillment_api = FulfillmentApi::new(db.clone());
        let options = ServerOptions::from_config(&config);
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("smk::access_log"))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(settlement_api))
            .app_data(web::Data::new(fulfillment_api))
            .app_data(web::Data::new(options))
            .service(health)
            .service(CheckoutRoute::<SqliteDatabase, DarajaGateway>::new())
            .service(MpesaCallbackRoute::<SqliteDatabase>::new())
            .service(OrderDetailRoute::<SqliteDatabase>::new())
            .service(DeliveryUpdateRoute::<SqliteDatabase>::new())
            .service(CancelOrderRoute::<SqliteDatabase>::new())
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
