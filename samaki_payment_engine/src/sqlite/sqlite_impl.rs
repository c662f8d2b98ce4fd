//! `SqliteDatabase` is a concrete implementation of a settlement engine backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module. Multi-step operations (checkout insertion, callback reconciliation, delivery transitions) each run in a
//! single transaction; per-row query logic lives in the [`super::db`] modules.
use std::fmt::Debug;

use log::*;
use sqlx::{SqliteConnection, SqlitePool};

use super::db::{catalog, charges, db_url, deliveries, ledger, new_pool, orders, sellers, verifications};
use crate::{
    db_types::{
        CatalogAction,
        CatalogItem,
        CatalogLogEntry,
        ChargeRequest,
        ChargeStatus,
        Delivery,
        DeliveryAuditEntry,
        DeliveryStatus,
        FulfillmentMethod,
        NewCatalogItem,
        NewChargeRequest,
        NewOrder,
        NewPhoneVerification,
        NewSellerProfile,
        Order,
        OrderLineItem,
        OrderNumber,
        OrderStatusType,
        PaymentCallback,
        PhoneVerificationCharge,
        PlatformFeeEntry,
        SellerNotification,
        SellerProfile,
    },
    traits::{OrderManagement, OrderQueryError, ReconcileOutcome, SettledCharge, SettlementDatabase, SettlementError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SettlementDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn fetch_catalog_item(&self, id: i64) -> Result<Option<CatalogItem>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let item = catalog::fetch_item(id, &mut conn).await?;
        Ok(item)
    }

    async fn insert_catalog_item(&self, item: NewCatalogItem) -> Result<CatalogItem, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let item = catalog::insert_item(item, &mut tx).await?;
        let note = format!("Listed {} of {}", item.available_weight, item.name);
        catalog::log_action(Some(item.id), CatalogAction::Listed, &item.seller_id, None, &note, &mut tx).await?;
        tx.commit().await?;
        Ok(item)
    }

    async fn fetch_seller_profile(&self, seller_id: &str) -> Result<Option<SellerProfile>, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let profile = sellers::fetch_profile(seller_id, &mut conn).await?;
        Ok(profile)
    }

    async fn upsert_seller_profile(&self, profile: NewSellerProfile) -> Result<SellerProfile, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        sellers::upsert_profile(profile, &mut conn).await
    }

    async fn mark_seller_verified(&self, seller_id: &str) -> Result<(), SettlementError> {
        let mut conn = self.pool.acquire().await?;
        sellers::mark_verified(seller_id, &mut conn).await?;
        Ok(())
    }

    /// Stores the order, every line item and one STOCK_RESERVED audit entry per line in a single transaction.
    async fn insert_order(&self, order: NewOrder) -> Result<(Order, Vec<OrderLineItem>), SettlementError> {
        let mut tx = self.pool.begin().await?;
        let row = orders::insert_order(&order, &mut tx).await?;
        let mut lines = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let item = orders::insert_line_item(row.id, line, &mut tx).await?;
            let note = format!("Reserved for Order {}", row.order_number);
            catalog::log_action(
                Some(line.catalog_item_id),
                CatalogAction::Reserved,
                &row.customer_id,
                Some(line.weight),
                &note,
                &mut tx,
            )
            .await?;
            lines.push(item);
        }
        tx.commit().await?;
        debug!("🗃️ Order {} created with {} line items", row.order_number, lines.len());
        Ok((row, lines))
    }

    async fn insert_charge_request(&self, charge: NewChargeRequest) -> Result<ChargeRequest, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        charges::insert(charge, &mut conn).await
    }

    async fn mark_order_failed(&self, order_id: i64) -> Result<Order, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::update_order_status(order_id, OrderStatusType::Failed, &mut conn).await?;
        warn!("🗃️ Order {} marked as FAILED after charge issuance errors", order.order_number);
        Ok(order)
    }

    async fn reconcile_callback(&self, callback: &PaymentCallback) -> Result<ReconcileOutcome, SettlementError> {
        let external_id = callback.external_id.as_str();
        let mut tx = self.pool.begin().await?;
        // Claiming the row acquires the write lock before we branch on status, so racing duplicate deliveries for
        // the same external id serialise here. Callbacks for other charges lock disjoint rows.
        let charge = match charges::claim_by_checkout_request_id(external_id, &mut tx).await? {
            Some(charge) => charge,
            None => {
                // The gateway callback namespace is shared with the phone-verification flow.
                let outcome = match verifications::claim_by_checkout_request_id(external_id, &mut tx).await? {
                    Some(verification) => reconcile_verification(verification, callback, &mut tx).await?,
                    None => {
                        error!("🗃️ Transaction not found for gateway id [{external_id}]");
                        return Err(SettlementError::ChargeNotFound(external_id.to_string()));
                    },
                };
                tx.commit().await?;
                return Ok(outcome);
            },
        };

        // Idempotency guard: a COMPLETED charge is terminal, and none of its side effects may run twice.
        if charge.status == ChargeStatus::Completed {
            tx.commit().await?;
            info!("🗃️ Duplicate callback ignored for [{external_id}]");
            return Ok(ReconcileOutcome::DuplicateIgnored { checkout_request_id: charge.checkout_request_id });
        }

        let order = orders::fetch_order_by_id(charge.order_id, &mut tx)
            .await?
            .ok_or(SettlementError::OrderIdNotFound(charge.order_id))?;

        if callback.success && callback.result_code == 0 {
            let outcome = settle_charge(order, charge, callback, &mut tx).await?;
            tx.commit().await?;
            Ok(outcome)
        } else {
            let outcome = fail_charge(order, charge, callback, &mut tx).await?;
            tx.commit().await?;
            Ok(outcome)
        }
    }

    async fn cancel_order(&self, order_number: &OrderNumber, actor: &str) -> Result<Order, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_number(order_number, &mut tx)
            .await?
            .ok_or_else(|| SettlementError::OrderNotFound(order_number.clone()))?;
        if order.status != OrderStatusType::Pending {
            info!("🗃️ Order {order_number} cannot be cancelled from status {}", order.status);
            return Err(SettlementError::OrderModificationForbidden(format!(
                "only PENDING orders can be cancelled; order {order_number} is {}",
                order.status
            )));
        }
        let order = orders::update_order_status(order.id, OrderStatusType::Cancelled, &mut tx).await?;
        for line in orders::fetch_line_items(order.id, &mut tx).await? {
            let note = format!("Stock released: Order {} cancelled by {actor}", order.order_number);
            catalog::log_action(
                Some(line.catalog_item_id),
                CatalogAction::StockReleased,
                actor,
                Some(line.weight),
                &note,
                &mut tx,
            )
            .await?;
        }
        tx.commit().await?;
        debug!("🗃️ Order {order_number} cancelled by {actor}");
        Ok(order)
    }

    async fn update_delivery_status(
        &self,
        order_number: &OrderNumber,
        new_status: DeliveryStatus,
        actor: &str,
        note: &str,
    ) -> Result<Delivery, SettlementError> {
        let mut tx = self.pool.begin().await?;
        let order = orders::fetch_order_by_number(order_number, &mut tx)
            .await?
            .ok_or_else(|| SettlementError::OrderNotFound(order_number.clone()))?;
        let delivery = deliveries::fetch_for_order(order.id, &mut tx)
            .await?
            .ok_or_else(|| SettlementError::DeliveryNotFound(order_number.clone()))?;
        let previous_status = delivery.status;
        if !previous_status.can_transition_to(new_status) {
            return Err(SettlementError::IllegalDeliveryTransition(format!(
                "delivery for order {order_number} cannot move from {previous_status} to {new_status}"
            )));
        }
        let delivery = deliveries::update_status(delivery.id, new_status, actor, &mut tx).await?;
        deliveries::insert_audit(delivery.id, order.id, previous_status, new_status, actor, note, &mut tx).await?;
        // Keep the order's status in step with physical fulfillment.
        match new_status {
            DeliveryStatus::Delivered => {
                let done = match order.fulfillment_method {
                    FulfillmentMethod::Pickup => OrderStatusType::PickedUp,
                    FulfillmentMethod::Delivery => OrderStatusType::Delivered,
                };
                orders::update_order_status(order.id, done, &mut tx).await?;
            },
            DeliveryStatus::Failed => {
                warn!("🚚️ Delivery for order {order_number} marked as FAILED by {actor}");
            },
            _ => {},
        }
        tx.commit().await?;
        debug!("🚚️ Delivery for order {order_number}: {previous_status} -> {new_status} (by {actor})");
        Ok(delivery)
    }

    async fn insert_phone_verification(
        &self,
        verification: NewPhoneVerification,
    ) -> Result<PhoneVerificationCharge, SettlementError> {
        let mut conn = self.pool.acquire().await?;
        verifications::insert(verification, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), SettlementError> {
        self.pool.close().await;
        Ok(())
    }
}

/// The success branch of callback reconciliation. Runs inside the caller's transaction.
async fn settle_charge(
    order: Order,
    charge: ChargeRequest,
    callback: &PaymentCallback,
    tx: &mut SqliteConnection,
) -> Result<ReconcileOutcome, SettlementError> {
    // A settled amount, when present, must match the recorded charge to the cent. A mismatch means the callback
    // was replayed against the wrong charge or the payload was tampered with.
    if let Some(actual) = callback.amount {
        if actual != charge.amount {
            error!(
                "🗃️ Amount mismatch for [{}]: expected {} got {actual}",
                charge.checkout_request_id, charge.amount
            );
            let charge =
                charges::mark_failed(charge.id, callback.result_code, "Amount mismatch in callback validation", tx)
                    .await?;
            return Ok(ReconcileOutcome::AmountMismatch { expected: charge.amount, actual, charge });
        }
    }
    let receipt = callback.receipt.clone().unwrap_or_default();
    let charge =
        charges::mark_completed(charge.id, callback.result_code, &callback.result_desc, &receipt, tx).await?;
    debug!("🗃️ Charge [{}] is now COMPLETED (receipt '{receipt}')", charge.checkout_request_id);

    // The ledger block runs only on the line item's first transition to PAID.
    let mut notification = None;
    if let Some(line) = orders::mark_line_paid_once(charge.line_item_id, tx).await? {
        let note = format!(
            "Buyer={}, Seller={}, Item={}, Weight={}, Total={}, Fee={}, Net={}, Receipt={}",
            order.customer_id,
            charge.seller_id,
            line.name,
            line.weight,
            charge.amount,
            charge.platform_fee,
            charge.net_payout,
            charge.receipt_number
        );
        catalog::log_action(
            Some(line.catalog_item_id),
            CatalogAction::PaymentReceived,
            &order.customer_id,
            Some(line.weight),
            &note,
            tx,
        )
        .await?;
        notification = Some(ledger::get_or_create_notification(&order, &line, &charge, tx).await?);
        ledger::get_or_create_fee_entry(&order, &charge, tx).await?;
    }

    let (pending, failed) = charges::count_open(charge.order_id, tx).await?;
    let mut order = order;
    let mut delivery = None;
    let fully_settled = pending == 0 && failed == 0;
    if fully_settled {
        if !order.status.is_post_payment() {
            // Full settlement: deduct stock for every line, then advance the order through FULLY_PAID to the
            // method-specific in-progress state.
            for line in orders::fetch_line_items(order.id, tx).await? {
                catalog::reduce_stock(line.catalog_item_id, line.weight, tx).await?;
            }
            let next = match order.fulfillment_method {
                FulfillmentMethod::Pickup => OrderStatusType::ReadyForPickup,
                FulfillmentMethod::Delivery => OrderStatusType::DeliveryInProgress,
            };
            order = orders::update_order_status(order.id, next, tx).await?;
            info!("🗃️ Order {} fully settled; now {}", order.order_number, order.status);
        }
        let seed = match order.fulfillment_method {
            FulfillmentMethod::Pickup => DeliveryStatus::ReadyForPickup,
            FulfillmentMethod::Delivery => DeliveryStatus::DeliveryInProgress,
        };
        delivery = Some(deliveries::upsert_for_order(order.id, &charge.seller_id, seed, &charge.seller_id, tx).await?);
    } else if order.status == OrderStatusType::Pending {
        // Partial-settlement marker: at least one charge settled, others still outstanding.
        order = orders::update_order_status(order.id, OrderStatusType::Paid, tx).await?;
    }
    Ok(ReconcileOutcome::Settled(SettledCharge { order, charge, fully_settled, notification, delivery }))
}

/// The failure branch of callback reconciliation. Runs inside the caller's transaction.
async fn fail_charge(
    order: Order,
    charge: ChargeRequest,
    callback: &PaymentCallback,
    tx: &mut SqliteConnection,
) -> Result<ReconcileOutcome, SettlementError> {
    let charge = charges::mark_failed(charge.id, callback.result_code, &callback.result_desc, tx).await?;
    debug!("🗃️ Charge [{}] is now FAILED: {}", charge.checkout_request_id, charge.result_desc);
    // Any failed charge fails the whole order. Charges that already completed stay completed.
    let order = if order.status == OrderStatusType::Failed {
        order
    } else {
        orders::update_order_status(order.id, OrderStatusType::Failed, tx).await?
    };
    let line = orders::fetch_line_item(charge.line_item_id, tx)
        .await?
        .ok_or(SettlementError::LineItemNotFound(charge.line_item_id))?;
    let note = format!("Stock released due to payment failure for Order {}", order.order_number);
    catalog::log_action(
        Some(line.catalog_item_id),
        CatalogAction::StockReleased,
        &order.customer_id,
        Some(line.weight),
        &note,
        tx,
    )
    .await?;
    Ok(ReconcileOutcome::ChargeFailed { order, charge })
}

/// Reconciles a callback that matched the phone-verification namespace instead of an order charge.
async fn reconcile_verification(
    verification: PhoneVerificationCharge,
    callback: &PaymentCallback,
    tx: &mut SqliteConnection,
) -> Result<ReconcileOutcome, SettlementError> {
    if verification.status == ChargeStatus::Completed {
        info!("🗃️ Duplicate phone-verification callback ignored for [{}]", verification.checkout_request_id);
        return Ok(ReconcileOutcome::VerificationCompleted { verification });
    }
    if callback.success && callback.result_code == 0 {
        let receipt = callback.receipt.clone().unwrap_or_default();
        let verification =
            verifications::mark_completed(verification.id, callback.result_code, &callback.result_desc, &receipt, tx)
                .await?;
        sellers::mark_phone_verified(&verification.seller_id, tx).await?;
        info!(
            "🗃️ Seller {} phone verified via gateway id [{}]",
            verification.seller_id, verification.checkout_request_id
        );
        Ok(ReconcileOutcome::VerificationCompleted { verification })
    } else {
        let verification =
            verifications::mark_failed(verification.id, callback.result_code, &callback.result_desc, tx).await?;
        Ok(ReconcileOutcome::VerificationFailed { verification })
    }
}

impl OrderManagement for SqliteDatabase {
    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let order = orders::fetch_order_by_number(number, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_line_items(&self, order_id: i64) -> Result<Vec<OrderLineItem>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let items = orders::fetch_line_items(order_id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_charges_for_order(&self, order_id: i64) -> Result<Vec<ChargeRequest>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let charges = charges::fetch_for_order(order_id, &mut conn).await?;
        Ok(charges)
    }

    async fn fetch_delivery_for_order(&self, order_id: i64) -> Result<Option<Delivery>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let delivery = deliveries::fetch_for_order(order_id, &mut conn).await?;
        Ok(delivery)
    }

    async fn fetch_delivery_audit(&self, order_id: i64) -> Result<Vec<DeliveryAuditEntry>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let entries = deliveries::fetch_audit(order_id, &mut conn).await?;
        Ok(entries)
    }

    async fn fetch_notifications_for_seller(
        &self,
        seller_id: &str,
    ) -> Result<Vec<SellerNotification>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let notifications = ledger::fetch_notifications_for_seller(seller_id, &mut conn).await?;
        Ok(notifications)
    }

    async fn fetch_fee_entries_for_order(&self, order_id: i64) -> Result<Vec<PlatformFeeEntry>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let entries = ledger::fetch_fee_entries_for_order(order_id, &mut conn).await?;
        Ok(entries)
    }

    async fn fetch_catalog_log(&self, catalog_item_id: i64) -> Result<Vec<CatalogLogEntry>, OrderQueryError> {
        let mut conn = self.pool.acquire().await.map_err(|e| OrderQueryError::DatabaseError(e.to_string()))?;
        let entries = catalog::fetch_log_for_item(catalog_item_id, &mut conn).await?;
        Ok(entries)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
