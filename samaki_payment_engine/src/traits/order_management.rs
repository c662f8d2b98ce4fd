use thiserror::Error;

use crate::db_types::{
    CatalogLogEntry,
    ChargeRequest,
    Delivery,
    DeliveryAuditEntry,
    Order,
    OrderLineItem,
    OrderNumber,
    PlatformFeeEntry,
    SellerNotification,
};

/// Read-side access to orders and their satellite records. All lookups return explicit `Option`/`Vec` results;
/// there is no lazy loading and a missing row is never an error here.
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderQueryError>;

    async fn fetch_line_items(&self, order_id: i64) -> Result<Vec<OrderLineItem>, OrderQueryError>;

    async fn fetch_charges_for_order(&self, order_id: i64) -> Result<Vec<ChargeRequest>, OrderQueryError>;

    async fn fetch_delivery_for_order(&self, order_id: i64) -> Result<Option<Delivery>, OrderQueryError>;

    async fn fetch_delivery_audit(&self, order_id: i64) -> Result<Vec<DeliveryAuditEntry>, OrderQueryError>;

    async fn fetch_notifications_for_seller(&self, seller_id: &str)
        -> Result<Vec<SellerNotification>, OrderQueryError>;

    async fn fetch_fee_entries_for_order(&self, order_id: i64) -> Result<Vec<PlatformFeeEntry>, OrderQueryError>;

    async fn fetch_catalog_log(&self, catalog_item_id: i64) -> Result<Vec<CatalogLogEntry>, OrderQueryError>;
}

#[derive(Debug, Clone, Error)]
pub enum OrderQueryError {
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for OrderQueryError {
    fn from(e: sqlx::Error) -> Self {
        OrderQueryError::DatabaseError(e.to_string())
    }
}
