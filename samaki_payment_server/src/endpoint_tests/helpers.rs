//! Shared scaffolding for the endpoint tests: a throwaway migrated database per test plus seed data matching the
//! checkout preconditions.
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
        PayoutKind,
    },
    test_utils::{prepare_test_env, random_db_path},
    traits::SettlementDatabase,
    SqliteDatabase,
};
use smk_common::{Kes, Kg};

pub async fn test_db() -> SqliteDatabase {
    let url = random_db_path();
    prepare_test_env(&url).await;
    SqliteDatabase::new_with_url(&url, 5).await.expect("Error creating test database")
}

pub async fn seed_seller(db: &SqliteDatabase, seller_id: &str) {
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
    .expect("Error seeding seller");
}

pub async fn seed_catalog_item(db: &SqliteDatabase, seller_id: &str, name: &str) -> CatalogItem {
    db.insert_catalog_item(NewCatalogItem {
        seller_id: seller_id.to_string(),
        name: name.to_string(),
        species: "tilapia".to_string(),
        price_per_kg: Kes::from_shillings(500),
        available_weight: Kg::from_kg(10),
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

pub fn cart_for(item_id: i64, weight_hundredths: i64) -> CartSnapshot {
    CartSnapshot { lines: vec![CartLine { catalog_item_id: item_id, weight: Kg::from_hundredths(weight_hundredths) }] }
}

pub fn delivery_choice() -> FulfillmentChoice {
    FulfillmentChoice {
        method: FulfillmentMethod::Delivery,
        pickup_point: None,
        delivery_location: "Nairobi CBD".to_string(),
        delivery_address: "Moi Avenue".to_string(),
        delivery_notes: String::new(),
    }
}

/// The exact callback shape Daraja posts on success.
pub fn success_payload(checkout_request_id: &str, amount: i64) -> String {
    format!(
        r#"{{
            "Body": {{
                "stkCallback": {{
                    "MerchantRequestID": "MRQ-{checkout_request_id}",
                    "CheckoutRequestID": "{checkout_request_id}",
                    "ResultCode": 0,
                    "ResultDesc": "The service request is processed successfully.",
                    "CallbackMetadata": {{
                        "Item": [
                            {{"Name": "Amount", "Value": {amount}}},
                            {{"Name": "MpesaReceiptNumber", "Value": "NLJ7RT61SV"}},
                            {{"Name": "TransactionDate", "Value": 20260211120000}},
                            {{"Name": "PhoneNumber", "Value": 254712345678}}
                        ]
                    }}
                }}
            }}
        }}"#
    )
}
