use thiserror::Error;

use crate::traits::SettlementError;

/// Checkout failures. Every `Validation`-class variant is raised before any row is written, so a failed checkout
/// leaves no partial order behind.
#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Buyer must verify their email address before checking out")]
    BuyerEmailNotVerified,
    #[error("Buyer has no phone number to charge")]
    BuyerPhoneMissing,
    #[error("Invalid weight for {0}")]
    InvalidWeight(String),
    #[error("Invalid price-per-kg for {0}")]
    InvalidPrice(String),
    #[error("{0} is no longer available in the requested weight")]
    ItemUnavailable(String),
    #[error("Seller profile missing for {0}")]
    SellerProfileMissing(String),
    #[error("Seller for {item} is not payment-ready ({reason})")]
    SellerNotPayable { item: String, reason: String },
    #[error("Missing fulfillment target: {0}")]
    MissingFulfillmentTarget(String),
    #[error("The payment callback URL is not publicly reachable; the gateway would not be able to report results")]
    CallbackUrlNotPublic,
    #[error("Backend error during checkout: {0}")]
    Backend(#[from] SettlementError),
}

impl CheckoutError {
    /// Whether this is a pre-commit validation failure (no mutation happened) as opposed to a backend fault.
    pub fn is_validation(&self) -> bool {
        !matches!(self, CheckoutError::Backend(_))
    }
}
