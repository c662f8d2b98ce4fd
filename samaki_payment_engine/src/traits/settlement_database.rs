use thiserror::Error;

use crate::{
    db_types::{
        CatalogItem,
        ChargeRequest,
        Delivery,
        DeliveryStatus,
        NewCatalogItem,
        NewChargeRequest,
        NewOrder,
        NewPhoneVerification,
        NewSellerProfile,
        Order,
        OrderLineItem,
        OrderNumber,
        PaymentCallback,
        PhoneVerificationCharge,
        SellerProfile,
    },
    traits::{data_objects::ReconcileOutcome, OrderManagement, OrderQueryError},
};

/// This trait defines the highest level of behaviour for backends supporting the settlement engine.
///
/// This behaviour includes:
/// * Creating orders and their frozen line items atomically at checkout.
/// * Recording one charge request per line as charges are issued against the gateway.
/// * Reconciling asynchronous, possibly duplicated gateway callbacks into consistent order/delivery/ledger state.
/// * Driving the physical-fulfillment state machine with a full audit trail.
#[allow(async_fn_in_trait)]
pub trait SettlementDatabase: Clone + OrderManagement {
    /// The URL of the database
    fn url(&self) -> &str;

    async fn fetch_catalog_item(&self, id: i64) -> Result<Option<CatalogItem>, SettlementError>;

    async fn insert_catalog_item(&self, item: NewCatalogItem) -> Result<CatalogItem, SettlementError>;

    async fn fetch_seller_profile(&self, seller_id: &str) -> Result<Option<SellerProfile>, SettlementError>;

    async fn upsert_seller_profile(&self, profile: NewSellerProfile) -> Result<SellerProfile, SettlementError>;

    /// Flips the `verified` flag on a seller profile. Checkout auto-verifies sellers whose settlement
    /// configuration is complete.
    async fn mark_seller_verified(&self, seller_id: &str) -> Result<(), SettlementError>;

    /// Takes a validated order and, in a single atomic transaction, stores the order row, every line item (with
    /// pricing frozen), and one STOCK_RESERVED catalogue-audit entry per line. Either everything is written or
    /// nothing is.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, Vec<OrderLineItem>), SettlementError>;

    /// Records the outcome of one charge-issuance attempt, PENDING with the gateway's external id on success or
    /// FAILED with a synthetic local id when the gateway refused the request.
    async fn insert_charge_request(&self, charge: NewChargeRequest) -> Result<ChargeRequest, SettlementError>;

    /// Marks the order FAILED after a partial charge-issuance failure. Charges already issued are left untouched:
    /// money may be in flight, and their callbacks must still reconcile.
    async fn mark_order_failed(&self, order_id: i64) -> Result<Order, SettlementError>;

    /// Applies one gateway payment result, effectively exactly once, independent of delivery order or duplication.
    ///
    /// The entire algorithm runs in one transaction whose first statement claims the matched charge row with a
    /// write lock, so racing duplicate deliveries for the same external id serialise here while callbacks for
    /// other charges proceed in parallel. External ids that match no charge request are checked against the
    /// phone-verification namespace before being reported as [`SettlementError::ChargeNotFound`].
    async fn reconcile_callback(&self, callback: &PaymentCallback) -> Result<ReconcileOutcome, SettlementError>;

    /// Cancels an order that has not seen any settlement activity yet. Only PENDING orders may be cancelled.
    async fn cancel_order(&self, order_number: &OrderNumber, actor: &str) -> Result<Order, SettlementError>;

    /// Moves a delivery through its state machine on behalf of a delivery-role actor, writing one audit entry and
    /// synchronising the order status. Illegal transitions are rejected.
    async fn update_delivery_status(
        &self,
        order_number: &OrderNumber,
        new_status: DeliveryStatus,
        actor: &str,
        note: &str,
    ) -> Result<Delivery, SettlementError>;

    /// Registers a phone-verification charge so its callback can later be reconciled.
    async fn insert_phone_verification(
        &self,
        verification: NewPhoneVerification,
    ) -> Result<PhoneVerificationCharge, SettlementError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), SettlementError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum SettlementError {
    #[error("We have an internal database engine error (configuration/uptime etc.): {0}")]
    DatabaseError(String),
    #[error("No charge request matches gateway id {0}")]
    ChargeNotFound(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderNumber),
    #[error("The requested order (internal id {0}) does not exist")]
    OrderIdNotFound(i64),
    #[error("The requested line item (internal id {0}) does not exist")]
    LineItemNotFound(i64),
    #[error("The requested catalogue item (internal id {0}) does not exist")]
    CatalogItemNotFound(i64),
    #[error("No delivery record exists for order {0}")]
    DeliveryNotFound(OrderNumber),
    #[error("Illegal delivery status change: {0}")]
    IllegalDeliveryTransition(String),
    #[error("The requested order change is forbidden: {0}")]
    OrderModificationForbidden(String),
    #[error("{0}")]
    QueryError(#[from] OrderQueryError),
}

impl From<sqlx::Error> for SettlementError {
    fn from(e: sqlx::Error) -> Self {
        SettlementError::DatabaseError(e.to_string())
    }
}
