//! Shared scaffolding for the engine integration tests: a throwaway SQLite database per test, seed helpers, and a
//! scripted stand-in for the payment gateway.
#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
        Mutex,
    },
};

use log::*;
use samaki_payment_engine::{
    db_types::{
        Buyer,
        CartLine,
        CartSnapshot,
        CatalogItem,
        FulfillmentChoice,
        FulfillmentMethod,
        NewCatalogItem,
        NewSellerProfile,
        PaymentCallback,
        PayoutKind,
        SellerProfile,
    },
    traits::{ChargeHandle, ChargeInstruction, GatewayError, PaymentGateway, SettlementDatabase},
    SqliteDatabase,
};
use smk_common::{Kes, Kg};
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

pub async fn setup() -> SqliteDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    let url = random_db_path();
    if let Err(e) = Sqlite::drop_database(&url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(&url).await.expect("Error creating database");
    let db = SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating connection to database");
    migrate!("./src/sqlite/migrations").run(db.pool()).await.expect("Error running DB migrations");
    db
}

pub async fn tear_down(mut db: SqliteDatabase) {
    let url = db.url().to_string();
    if let Err(e) = db.close().await {
        error!("🚀️ Failed to close database: {e}");
    }
    Sqlite::drop_database(&url).await.unwrap();
}

pub fn random_db_path() -> String {
    let path = std::env::temp_dir().join(format!("samaki_test_store_{}.db", rand::random::<u64>()));
    format!("sqlite://{}", path.display())
}

//--------------------------------------     Seed helpers      -------------------------------------------------------

pub async fn seed_seller(db: &SqliteDatabase, seller_id: &str) -> SellerProfile {
    db.upsert_seller_profile(NewSellerProfile {
        seller_id: seller_id.to_string(),
        contact_phone: "0700000000".to_string(),
        payout_phone: "0700000000".to_string(),
        payout_kind: PayoutKind::StkPush,
        paybill_number: String::new(),
        till_number: String::new(),
        account_reference: String::new(),
        verified: true,
    })
    .await
    .expect("Error seeding seller profile")
}

pub async fn seed_catalog_item(
    db: &SqliteDatabase,
    seller_id: &str,
    name: &str,
    price_shillings: i64,
    available_kg: i64,
) -> CatalogItem {
    db.insert_catalog_item(NewCatalogItem {
        seller_id: seller_id.to_string(),
        name: name.to_string(),
        species: "tilapia".to_string(),
        price_per_kg: Kes::from_shillings(price_shillings),
        available_weight: Kg::from_kg(available_kg),
    })
    .await
    .expect("Error seeding catalogue item")
}

pub fn buyer() -> Buyer {
    Buyer {
        customer_id: "buyer-1".to_string(),
        phone: "0712345678".to_string(),
        email: "buyer@example.com".to_string(),
        email_verified: true,
    }
}

pub fn cart(lines: &[(i64, i64)]) -> CartSnapshot {
    CartSnapshot {
        lines: lines
            .iter()
            .map(|(id, hundredths)| CartLine { catalog_item_id: *id, weight: Kg::from_hundredths(*hundredths) })
            .collect(),
    }
}

pub fn delivery_choice() -> FulfillmentChoice {
    FulfillmentChoice {
        method: FulfillmentMethod::Delivery,
        pickup_point: None,
        delivery_location: "Nairobi CBD".to_string(),
        delivery_address: "Moi Avenue".to_string(),
        delivery_notes: "Call on arrival".to_string(),
    }
}

pub fn pickup_choice() -> FulfillmentChoice {
    FulfillmentChoice {
        method: FulfillmentMethod::Pickup,
        pickup_point: Some("Westlands Hub".to_string()),
        delivery_location: String::new(),
        delivery_address: String::new(),
        delivery_notes: String::new(),
    }
}

pub fn success_callback(external_id: &str, amount: Kes) -> PaymentCallback {
    PaymentCallback {
        external_id: external_id.to_string(),
        result_code: 0,
        result_desc: "The service request is processed successfully.".to_string(),
        success: true,
        amount: Some(amount),
        receipt: Some("NLJ7RT61SV".to_string()),
    }
}

pub fn failure_callback(external_id: &str) -> PaymentCallback {
    PaymentCallback {
        external_id: external_id.to_string(),
        result_code: 1032,
        result_desc: "Request cancelled by user".to_string(),
        success: false,
        amount: None,
        receipt: None,
    }
}

//--------------------------------------     Stub gateway      -------------------------------------------------------

#[derive(Default)]
struct StubInner {
    responses: Mutex<VecDeque<Result<ChargeHandle, GatewayError>>>,
    counter: AtomicU32,
    seen: Mutex<Vec<ChargeInstruction>>,
}

/// A scripted [`PaymentGateway`]: responses are dequeued in order, and every instruction is recorded. With no
/// scripted response, charges succeed with a generated external id.
#[derive(Clone, Default)]
pub struct StubGateway {
    inner: Arc<StubInner>,
}

impl StubGateway {
    pub fn enqueue_ok(&self, checkout_request_id: &str) {
        self.inner.responses.lock().unwrap().push_back(Ok(ChargeHandle {
            checkout_request_id: checkout_request_id.to_string(),
            merchant_request_id: format!("MRQ-{checkout_request_id}"),
        }));
    }

    pub fn enqueue_err(&self, error: GatewayError) {
        self.inner.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn instructions(&self) -> Vec<ChargeInstruction> {
        self.inner.seen.lock().unwrap().clone()
    }
}

impl PaymentGateway for StubGateway {
    async fn initiate_charge(&self, instruction: ChargeInstruction) -> Result<ChargeHandle, GatewayError> {
        self.inner.seen.lock().unwrap().push(instruction);
        if let Some(response) = self.inner.responses.lock().unwrap().pop_front() {
            return response;
        }
        let n = self.inner.counter.fetch_add(1, Ordering::SeqCst);
        Ok(ChargeHandle {
            checkout_request_id: format!("ws_CO_test_{n}"),
            merchant_request_id: format!("MRQ-{n}"),
        })
    }
}
