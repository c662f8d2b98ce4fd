use smk_common::Kes;
use thiserror::Error;

use crate::db_types::{OrderNumber, PayoutKind};

/// Everything the gateway needs to issue one charge for one order line, settled against a specific seller's
/// payout destination.
#[derive(Debug, Clone)]
pub struct ChargeInstruction {
    /// The buyer's phone; the charge prompt lands here.
    pub payer_phone: String,
    pub amount: Kes,
    pub order_number: OrderNumber,
    /// Seller-specific paybill/till, when configured. The gateway falls back to the platform shortcode otherwise.
    pub settlement_shortcode: Option<String>,
    pub account_reference: String,
    pub payout_kind: PayoutKind,
}

/// The gateway's acknowledgement of an issued charge. `checkout_request_id` is the external id later quoted by
/// result callbacks.
#[derive(Debug, Clone)]
pub struct ChargeHandle {
    pub checkout_request_id: String,
    pub merchant_request_id: String,
}

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("The gateway rejected the charge request: {0}")]
    Rejected(String),
    #[error("Could not reach the payment gateway: {0}")]
    Unreachable(String),
    #[error("Gateway authentication failed: {0}")]
    Authentication(String),
}

/// An outbound payment-gateway client. One implementation wraps the real Daraja API; tests substitute scripted
/// stubs.
#[allow(async_fn_in_trait)]
pub trait PaymentGateway {
    /// Issue a single charge. A bounded, synchronous network call; a timeout surfaces as
    /// [`GatewayError::Unreachable`] and counts as an issuance failure for the line being charged.
    async fn initiate_charge(&self, instruction: ChargeInstruction) -> Result<ChargeHandle, GatewayError>;
}
