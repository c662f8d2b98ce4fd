use std::fmt::Display;

use samaki_payment_engine::{
    db_types::{Buyer, CartSnapshot, DeliveryStatus, FulfillmentChoice, OrderNumber, OrderStatusType},
    traits::{ChargeFailure, CheckoutOutcome},
};
use serde::{Deserialize, Serialize};
use smk_common::Kes;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The checkout trigger payload: the validated cart snapshot plus explicit buyer identity and fulfillment choice,
/// as assembled by the (out-of-scope) web-form handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub buyer: Buyer,
    pub cart: CartSnapshot,
    pub fulfillment: FulfillmentChoice,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order_number: OrderNumber,
    pub status: OrderStatusType,
    pub total_amount: Kes,
    pub platform_fee: Kes,
    pub sellers_net_amount: Kes,
    /// Per-line charge-issuance failures. Non-empty means the order was marked FAILED, though already-issued
    /// charges remain live.
    pub charge_failures: Vec<ChargeFailure>,
}

impl From<CheckoutOutcome> for CheckoutResponse {
    fn from(outcome: CheckoutOutcome) -> Self {
        Self {
            order_number: outcome.order.order_number.clone(),
            status: outcome.order.status,
            total_amount: outcome.order.total_amount,
            platform_fee: outcome.order.platform_fee,
            sellers_net_amount: outcome.order.sellers_net_amount,
            charge_failures: outcome.charge_failures,
        }
    }
}

/// A delivery-role actor moving a delivery through its state machine. The actor travels in the payload; session
/// mechanics are out of scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryUpdateRequest {
    pub status: DeliveryStatus,
    pub actor: String,
    #[serde(default)]
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderRequest {
    pub actor: String,
}
