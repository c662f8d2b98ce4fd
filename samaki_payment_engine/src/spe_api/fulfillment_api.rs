use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{Delivery, DeliveryStatus, Order, OrderNumber},
    spe_api::order_objects::OrderResult,
    traits::{SettlementDatabase, SettlementError},
};

/// `FulfillmentApi` drives the physical-fulfillment side of an order: delivery status transitions (with their
/// audit trail), order cancellation, and the order summaries collaborators read.
pub struct FulfillmentApi<B> {
    db: B,
}

impl<B> Debug for FulfillmentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "FulfillmentApi")
    }
}

impl<B> FulfillmentApi<B> {
    pub fn new(db: B) -> Self {
        Self { db }
    }
}

impl<B> FulfillmentApi<B>
where B: SettlementDatabase
{
    /// Move a delivery to `new_status` on behalf of `actor`, writing one audit entry. The order status follows
    /// (DELIVERED becomes DELIVERED or PICKED_UP depending on the fulfillment method).
    pub async fn update_delivery_status(
        &self,
        order_number: &OrderNumber,
        new_status: DeliveryStatus,
        actor: &str,
        note: &str,
    ) -> Result<Delivery, SettlementError> {
        trace!("🚚️ {actor} requests delivery transition to {new_status} for order {order_number}");
        self.db.update_delivery_status(order_number, new_status, actor, note).await
    }

    /// Cancel a PENDING order on behalf of `actor`.
    pub async fn cancel_order(&self, order_number: &OrderNumber, actor: &str) -> Result<Order, SettlementError> {
        trace!("🚚️ {actor} requests cancellation of order {order_number}");
        self.db.cancel_order(order_number, actor).await
    }

    /// The full picture of one order: the order row, its frozen lines, every charge request, and the delivery
    /// record when one exists.
    pub async fn order_summary(&self, order_number: &OrderNumber) -> Result<Option<OrderResult>, SettlementError> {
        let order = match self.db.fetch_order_by_number(order_number).await? {
            Some(order) => order,
            None => return Ok(None),
        };
        let line_items = self.db.fetch_line_items(order.id).await?;
        let charges = self.db.fetch_charges_for_order(order.id).await?;
        let delivery = self.db.fetch_delivery_for_order(order.id).await?;
        Ok(Some(OrderResult { order, line_items, charges, delivery }))
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
