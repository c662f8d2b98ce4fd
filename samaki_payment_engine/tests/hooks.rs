//! Event-hook tests: settlement outcomes are published to subscribers after the reconciliation transaction
//! commits, and duplicates never re-fire.
use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};

use log::*;
use samaki_payment_engine::{
    events::{EventHandlers, EventHooks},
    traits::OrderManagement,
    CheckoutApi,
    SettlementApi,
};

mod support;

use support::*;

const FEE_BPS: u32 = 200;

#[derive(Default, Clone)]
struct HookCalled {
    called: Arc<AtomicI32>,
}

impl HookCalled {
    pub fn called(&self) {
        let _ = self.called.fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> i32 {
        self.called.load(Ordering::Relaxed)
    }
}

#[tokio::test]
async fn settlement_events_fire_once_per_outcome() {
    let db = setup().await;
    seed_seller(&db, "fisher-1").await;
    seed_seller(&db, "fisher-2").await;
    let tilapia = seed_catalog_item(&db, "fisher-1", "Tilapia", 500, 10).await;
    let octopus = seed_catalog_item(&db, "fisher-2", "Octopus", 800, 5).await;

    let payments = HookCalled::default();
    let settled = HookCalled::default();
    let p2 = payments.clone();
    let s2 = settled.clone();
    let mut hooks = EventHooks::default();
    hooks.on_payment_received(move |ev| {
        info!("🪝️ payment received: {}", ev.notification.message);
        p2.called();
        Box::pin(async {})
    });
    hooks.on_order_settled(move |ev| {
        info!("🪝️ order settled: {}", ev.order.order_number);
        s2.called();
        Box::pin(async {})
    });
    let handlers = EventHandlers::new(10, hooks);
    let producers = handlers.producers();
    handlers.start_handlers().await;

    let gateway = StubGateway::default();
    gateway.enqueue_ok("CRQ1");
    gateway.enqueue_ok("CRQ2");
    let checkout = CheckoutApi::new(db.clone(), gateway, FEE_BPS);
    let outcome =
        checkout.place_order(&buyer(), &cart(&[(tilapia.id, 100), (octopus.id, 50)]), &delivery_choice()).await.unwrap();
    let charges = db.fetch_charges_for_order(outcome.order.id).await.unwrap();

    let settlement = SettlementApi::new(db.clone(), producers);
    settlement.process_callback(success_callback("CRQ1", charges[0].amount)).await.unwrap();
    settlement.process_callback(success_callback("CRQ2", charges[1].amount)).await.unwrap();
    // A duplicate delivery must not re-fire anything.
    settlement.process_callback(success_callback("CRQ2", charges[1].amount)).await.unwrap();

    // Give the spawned handler tasks a moment to drain.
    tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
    assert_eq!(payments.count(), 2, "one payment-received event per settled charge");
    assert_eq!(settled.count(), 1, "exactly one order-settled event");

    tear_down(db).await;
}
