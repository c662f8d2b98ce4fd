use serde::{Deserialize, Serialize};

use crate::db_types::{ChargeRequest, Delivery, Order, SellerNotification};

/// Emitted once per settled charge, on the owning line item's first transition to PAID. Carries the durable
/// notification record so subscribers (SMS, email, dashboards) don't have to re-query it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceivedEvent {
    pub order: Order,
    pub notification: SellerNotification,
}

impl PaymentReceivedEvent {
    pub fn new(order: Order, notification: SellerNotification) -> Self {
        Self { order, notification }
    }
}

/// Emitted when the last outstanding charge on an order settles and the order reaches its post-payment state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSettledEvent {
    pub order: Order,
    pub delivery: Option<Delivery>,
}

impl OrderSettledEvent {
    pub fn new(order: Order, delivery: Option<Delivery>) -> Self {
        Self { order, delivery }
    }
}

/// Emitted when a gateway failure result fails a charge (and with it, the order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFailedEvent {
    pub order: Order,
    pub charge: ChargeRequest,
}

impl OrderFailedEvent {
    pub fn new(order: Order, charge: ChargeRequest) -> Self {
        Self { order, charge }
    }
}
