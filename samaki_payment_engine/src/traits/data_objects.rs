use serde::{Deserialize, Serialize};
use smk_common::Kes;

use crate::db_types::{ChargeRequest, Delivery, Order, OrderLineItem, PhoneVerificationCharge, SellerNotification};

/// The aggregate result of a checkout: the created order plus whichever lines could not have their charge issued.
/// An order with a non-empty failure list has been marked FAILED, but its successfully issued charges are still
/// live and will be reconciled if the gateway calls back.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutOutcome {
    pub order: Order,
    pub line_items: Vec<OrderLineItem>,
    pub charge_failures: Vec<ChargeFailure>,
}

impl CheckoutOutcome {
    pub fn all_charges_issued(&self) -> bool {
        self.charge_failures.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargeFailure {
    pub line_item_id: i64,
    pub item_name: String,
    pub reason: String,
}

/// What one reconciled callback did to the system. Every variant is a *successful* reconciliation from the
/// engine's point of view; the HTTP layer maps them onto gateway-facing status codes.
#[derive(Debug, Clone)]
pub enum ReconcileOutcome {
    /// The charge settled (or had already partially settled the order).
    Settled(SettledCharge),
    /// The charge was already COMPLETED; nothing was changed and no side effects were re-run.
    DuplicateIgnored { checkout_request_id: String },
    /// The callback's settled amount did not match the recorded charge amount. The charge is now FAILED.
    AmountMismatch { charge: ChargeRequest, expected: Kes, actual: Kes },
    /// The gateway reported the charge as failed or cancelled.
    ChargeFailed { order: Order, charge: ChargeRequest },
    /// The external id belonged to the phone-verification flow, which is now complete.
    VerificationCompleted { verification: PhoneVerificationCharge },
    /// The external id belonged to the phone-verification flow, which failed.
    VerificationFailed { verification: PhoneVerificationCharge },
}

/// Details of a successfully settled charge, including whichever follow-on transitions it triggered.
#[derive(Debug, Clone)]
pub struct SettledCharge {
    pub order: Order,
    pub charge: ChargeRequest,
    /// True when this settlement completed the order: no PENDING and no FAILED charges remain.
    pub fully_settled: bool,
    /// Present only on the line item's first transition to PAID, alongside the matching ledger entry.
    pub notification: Option<SellerNotification>,
    /// The delivery record seeded/refreshed when the order reached full settlement.
    pub delivery: Option<Delivery>,
}
