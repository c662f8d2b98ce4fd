use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use serde::{Deserialize, Serialize};
use smk_common::{Kes, Kg};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid {0}: {1}")]
pub struct ConversionError(pub &'static str, pub String);

//--------------------------------------     OrderNumber       -------------------------------------------------------
/// The human-readable order reference printed on receipts and quoted in gateway transaction descriptions.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------   OrderStatusType     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    /// Order created; no charge has settled yet.
    Pending,
    /// At least one, but not all, charges have settled.
    Paid,
    /// Every charge has settled. Transient: the order advances to the method-specific in-progress state in the
    /// same reconciliation.
    FullyPaid,
    DeliveryInProgress,
    ReadyForPickup,
    Delivered,
    PickedUp,
    /// A charge was declined, or charge issuance failed for at least one line. Terminal.
    Failed,
    /// Cancelled by the customer or an admin while still pending. Terminal.
    Cancelled,
}

impl OrderStatusType {
    /// States reachable only after every charge on the order has settled. Once here, reconciliation must not
    /// re-run the full-settlement side effects (stock deduction, delivery seeding).
    pub fn is_post_payment(&self) -> bool {
        use OrderStatusType::*;
        matches!(self, FullyPaid | DeliveryInProgress | ReadyForPickup | Delivered | PickedUp)
    }

    pub fn is_terminal(&self) -> bool {
        use OrderStatusType::*;
        matches!(self, Delivered | PickedUp | Failed | Cancelled)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            OrderStatusType::Pending => "PENDING",
            OrderStatusType::Paid => "PAID",
            OrderStatusType::FullyPaid => "FULLY_PAID",
            OrderStatusType::DeliveryInProgress => "DELIVERY_IN_PROGRESS",
            OrderStatusType::ReadyForPickup => "READY_FOR_PICKUP",
            OrderStatusType::Delivered => "DELIVERED",
            OrderStatusType::PickedUp => "PICKED_UP",
            OrderStatusType::Failed => "FAILED",
            OrderStatusType::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "FULLY_PAID" => Ok(Self::FullyPaid),
            "DELIVERY_IN_PROGRESS" => Ok(Self::DeliveryInProgress),
            "READY_FOR_PICKUP" => Ok(Self::ReadyForPickup),
            "DELIVERED" => Ok(Self::Delivered),
            "PICKED_UP" => Ok(Self::PickedUp),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(ConversionError("order status", other.to_string())),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------  FulfillmentMethod    -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FulfillmentMethod {
    Delivery,
    Pickup,
}

impl Display for FulfillmentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FulfillmentMethod::Delivery => write!(f, "delivery"),
            FulfillmentMethod::Pickup => write!(f, "pickup"),
        }
    }
}

//--------------------------------------      LineStatus       -------------------------------------------------------
/// Per-line fulfillment state. PAID is set exactly once, by the reconciler, and gates the per-line ledger entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStatus {
    Pending,
    Paid,
    Ready,
    Delivered,
}

impl Display for LineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LineStatus::Pending => "PENDING",
            LineStatus::Paid => "PAID",
            LineStatus::Ready => "READY",
            LineStatus::Delivered => "DELIVERED",
        };
        write!(f, "{s}")
    }
}

//--------------------------------------     ChargeStatus      -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChargeStatus {
    Pending,
    /// Terminal. A completed charge is never reverted and its ledger entries are never re-emitted.
    Completed,
    /// A failed charge may be overwritten by a later callback for the same gateway id.
    Failed,
    Cancelled,
}

impl Display for ChargeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChargeStatus::Pending => "PENDING",
            ChargeStatus::Completed => "COMPLETED",
            ChargeStatus::Failed => "FAILED",
            ChargeStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

//--------------------------------------    DeliveryStatus     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Pending,
    ReadyForPickup,
    DeliveryInProgress,
    InTransit,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DeliveryStatus::Delivered | DeliveryStatus::Failed)
    }

    /// Whether a delivery actor may move a delivery from `self` to `new`.
    pub fn can_transition_to(&self, new: DeliveryStatus) -> bool {
        use DeliveryStatus::*;
        if self.is_terminal() || *self == new {
            return false;
        }
        match new {
            InTransit => matches!(self, Pending | ReadyForPickup | DeliveryInProgress),
            Delivered => matches!(self, ReadyForPickup | DeliveryInProgress | InTransit),
            Failed => true,
            _ => false,
        }
    }
}

impl Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeliveryStatus::Pending => "PENDING",
            DeliveryStatus::ReadyForPickup => "READY_FOR_PICKUP",
            DeliveryStatus::DeliveryInProgress => "DELIVERY_IN_PROGRESS",
            DeliveryStatus::InTransit => "IN_TRANSIT",
            DeliveryStatus::Delivered => "DELIVERED",
            DeliveryStatus::Failed => "FAILED",
        };
        write!(f, "{s}")
    }
}

impl FromStr for DeliveryStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "READY_FOR_PICKUP" => Ok(Self::ReadyForPickup),
            "DELIVERY_IN_PROGRESS" => Ok(Self::DeliveryInProgress),
            "IN_TRANSIT" => Ok(Self::InTransit),
            "DELIVERED" => Ok(Self::Delivered),
            "FAILED" => Ok(Self::Failed),
            other => Err(ConversionError("delivery status", other.to_string())),
        }
    }
}

//--------------------------------------     CatalogStatus     -------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CatalogStatus {
    Available,
    Reserved,
    Sold,
    Unavailable,
}

//--------------------------------------      PayoutKind       -------------------------------------------------------
/// How a seller's net amount is settled by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PayoutKind {
    StkPush,
    Paybill,
    Till,
}

//--------------------------------------     CatalogAction     -------------------------------------------------------
/// Actions recorded in the append-only catalogue audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CatalogAction {
    Listed,
    Reserved,
    Purchased,
    StockReleased,
    PaymentReceived,
    StockAdjusted,
    StatusChanged,
}

impl Display for CatalogAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CatalogAction::Listed => "LISTED",
            CatalogAction::Reserved => "RESERVED",
            CatalogAction::Purchased => "PURCHASED",
            CatalogAction::StockReleased => "STOCK_RELEASED",
            CatalogAction::PaymentReceived => "PAYMENT_RECEIVED",
            CatalogAction::StockAdjusted => "STOCK_ADJUSTED",
            CatalogAction::StatusChanged => "STATUS_CHANGED",
        };
        write!(f, "{s}")
    }
}

//--------------------------------------        Order          -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_number: OrderNumber,
    pub customer_id: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub status: OrderStatusType,
    pub total_amount: Kes,
    pub platform_fee: Kes,
    pub sellers_net_amount: Kes,
    pub fulfillment_method: FulfillmentMethod,
    pub pickup_point: Option<String>,
    pub delivery_location: String,
    pub delivery_address: String,
    pub delivery_notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------    OrderLineItem      -------------------------------------------------------
/// An immutable snapshot of a catalogue item at order time. Pricing is frozen here; later catalogue edits never
/// change what the buyer owes or what the seller is paid.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: i64,
    pub order_id: i64,
    pub catalog_item_id: i64,
    pub seller_id: String,
    pub name: String,
    pub species: String,
    pub unit_price: Kes,
    pub weight: Kg,
    pub line_total: Kes,
    pub platform_fee: Kes,
    pub seller_net_payout: Kes,
    pub status: LineStatus,
}

//--------------------------------------    ChargeRequest      -------------------------------------------------------
/// One outbound gateway charge for one order line. `checkout_request_id` is the gateway-assigned idempotency key;
/// charges whose issuance failed locally carry a synthetic `FAILED-…` id instead.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ChargeRequest {
    pub id: i64,
    pub order_id: i64,
    pub line_item_id: i64,
    pub seller_id: String,
    pub checkout_request_id: String,
    pub merchant_request_id: String,
    pub amount: Kes,
    pub platform_fee: Kes,
    pub net_payout: Kes,
    pub payer_phone: String,
    pub status: ChargeStatus,
    pub result_code: Option<i64>,
    pub result_desc: String,
    pub receipt_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       Delivery        -------------------------------------------------------
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Delivery {
    pub id: i64,
    pub order_id: i64,
    pub seller_id: String,
    pub status: DeliveryStatus,
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------  DeliveryAuditEntry   -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct DeliveryAuditEntry {
    pub id: i64,
    pub delivery_id: i64,
    pub order_id: i64,
    pub previous_status: DeliveryStatus,
    pub new_status: DeliveryStatus,
    pub actor: String,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------      CatalogItem      -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: i64,
    pub seller_id: String,
    pub name: String,
    pub species: String,
    pub price_per_kg: Kes,
    pub available_weight: Kg,
    pub status: CatalogStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CatalogItem {
    pub fn is_available(&self) -> bool {
        self.status == CatalogStatus::Available && self.available_weight.is_positive()
    }
}

#[derive(Debug, Clone)]
pub struct NewCatalogItem {
    pub seller_id: String,
    pub name: String,
    pub species: String,
    pub price_per_kg: Kes,
    pub available_weight: Kg,
}

//--------------------------------------    CatalogLogEntry    -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CatalogLogEntry {
    pub id: i64,
    pub catalog_item_id: Option<i64>,
    pub action: CatalogAction,
    pub actor: String,
    pub weight_change: Option<Kg>,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     SellerProfile     -------------------------------------------------------
/// A seller's settlement configuration. Charges for a seller's line items are pushed directly against this
/// destination, so checkout refuses to proceed while any seller in the cart is not payment-ready.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SellerProfile {
    pub id: i64,
    pub seller_id: String,
    pub contact_phone: String,
    pub payout_phone: String,
    pub payout_kind: PayoutKind,
    pub paybill_number: String,
    pub till_number: String,
    pub account_reference: String,
    pub verified: bool,
    pub phone_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SellerProfile {
    /// The phone number charges settle against, falling back to the contact phone when no dedicated payout phone
    /// has been configured.
    pub fn settlement_phone(&self) -> &str {
        if self.payout_phone.is_empty() {
            &self.contact_phone
        } else {
            &self.payout_phone
        }
    }

    /// Whether this seller can receive checkout-triggered charges, with the reason when they cannot.
    pub fn payout_readiness(&self) -> Result<(), &'static str> {
        if self.settlement_phone().is_empty() {
            return Err("missing M-Pesa phone number");
        }
        match self.payout_kind {
            PayoutKind::Paybill if self.paybill_number.is_empty() => Err("missing Paybill number"),
            PayoutKind::Till if self.till_number.is_empty() => Err("missing Till number"),
            _ => Ok(()),
        }
    }

    /// The seller-specific shortcode to settle against, when one is configured.
    pub fn settlement_shortcode(&self) -> Option<String> {
        if !self.paybill_number.is_empty() {
            Some(self.paybill_number.clone())
        } else if !self.till_number.is_empty() {
            Some(self.till_number.clone())
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewSellerProfile {
    pub seller_id: String,
    pub contact_phone: String,
    pub payout_phone: String,
    pub payout_kind: PayoutKind,
    pub paybill_number: String,
    pub till_number: String,
    pub account_reference: String,
    pub verified: bool,
}

//--------------------------------------   SellerNotification  -------------------------------------------------------
/// The payout notice emitted for a seller when one of their line items settles. At most one per charge request.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct SellerNotification {
    pub id: i64,
    pub seller_id: String,
    pub buyer_id: String,
    pub order_id: i64,
    pub charge_request_id: i64,
    pub item_name: String,
    pub weight: Kg,
    pub gross_amount: Kes,
    pub net_amount: Kes,
    pub receipt_number: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    PlatformFeeEntry   -------------------------------------------------------
/// Append-only ledger record of the platform's cut of one settled charge. At most one per charge request.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlatformFeeEntry {
    pub id: i64,
    pub order_id: i64,
    pub charge_request_id: i64,
    pub seller_id: String,
    pub gross_amount: Kes,
    pub fee_amount: Kes,
    pub net_amount: Kes,
    pub created_at: DateTime<Utc>,
}

//-------------------------------------- PhoneVerificationCharge -----------------------------------------------------
/// A token charge used to verify that a seller controls their payout phone. Shares the gateway callback namespace
/// with order charges, so the reconciler checks here when no charge request matches an incoming external id.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PhoneVerificationCharge {
    pub id: i64,
    pub seller_id: String,
    pub phone_number: String,
    pub amount: Kes,
    pub merchant_request_id: String,
    pub checkout_request_id: String,
    pub receipt_number: String,
    pub status: ChargeStatus,
    pub result_code: Option<i64>,
    pub result_desc: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPhoneVerification {
    pub seller_id: String,
    pub phone_number: String,
    pub amount: Kes,
    pub merchant_request_id: String,
    pub checkout_request_id: String,
}

//--------------------------------------        Buyer          -------------------------------------------------------
/// The authenticated customer placing an order. Session handling is out of scope; callers pass the identity
/// explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Buyer {
    pub customer_id: String,
    pub phone: String,
    pub email: String,
    pub email_verified: bool,
}

//--------------------------------------     CartSnapshot      -------------------------------------------------------
/// The ephemeral cart contents at checkout time. Discarded by the caller once an order has been created.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CartSnapshot {
    pub lines: Vec<CartLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub catalog_item_id: i64,
    pub weight: Kg,
}

impl CartSnapshot {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

//--------------------------------------  FulfillmentChoice    -------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FulfillmentChoice {
    pub method: FulfillmentMethod,
    #[serde(default)]
    pub pickup_point: Option<String>,
    #[serde(default)]
    pub delivery_location: String,
    #[serde(default)]
    pub delivery_address: String,
    #[serde(default)]
    pub delivery_notes: String,
}

//--------------------------------------       NewOrder        -------------------------------------------------------
/// A fully validated order ready for insertion: financials computed, line pricing frozen.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_number: OrderNumber,
    pub customer_id: String,
    pub customer_phone: String,
    pub customer_email: String,
    pub total_amount: Kes,
    pub platform_fee: Kes,
    pub sellers_net_amount: Kes,
    pub fulfillment_method: FulfillmentMethod,
    pub pickup_point: Option<String>,
    pub delivery_location: String,
    pub delivery_address: String,
    pub delivery_notes: String,
    pub lines: Vec<NewLineItem>,
}

#[derive(Debug, Clone)]
pub struct NewLineItem {
    pub catalog_item_id: i64,
    pub seller_id: String,
    pub name: String,
    pub species: String,
    pub unit_price: Kes,
    pub weight: Kg,
    pub line_total: Kes,
    pub platform_fee: Kes,
    pub seller_net_payout: Kes,
}

//--------------------------------------   NewChargeRequest    -------------------------------------------------------
#[derive(Debug, Clone)]
pub struct NewChargeRequest {
    pub order_id: i64,
    pub line_item_id: i64,
    pub seller_id: String,
    pub checkout_request_id: String,
    pub merchant_request_id: String,
    pub amount: Kes,
    pub platform_fee: Kes,
    pub net_payout: Kes,
    pub payer_phone: String,
    pub status: ChargeStatus,
    pub result_desc: String,
}

//--------------------------------------   PaymentCallback     -------------------------------------------------------
/// A provider-agnostic payment result, as handed to the reconciler. Gateway-specific payload parsing happens in the
/// integration layer; by the time a callback reaches the engine its result code has been normalised and its amount
/// converted to cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCallback {
    /// The gateway-assigned charge identifier. The idempotency key for reconciliation.
    pub external_id: String,
    pub result_code: i64,
    pub result_desc: String,
    /// True iff the gateway reports the charge as settled.
    pub success: bool,
    pub amount: Option<Kes>,
    pub receipt: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn post_payment_states() {
        assert!(OrderStatusType::FullyPaid.is_post_payment());
        assert!(OrderStatusType::ReadyForPickup.is_post_payment());
        assert!(!OrderStatusType::Paid.is_post_payment());
        assert!(!OrderStatusType::Pending.is_post_payment());
        assert!(OrderStatusType::Failed.is_terminal());
        assert!(!OrderStatusType::Failed.is_post_payment());
    }

    #[test]
    fn order_status_round_trip() {
        for s in ["PENDING", "PAID", "FULLY_PAID", "DELIVERY_IN_PROGRESS", "DELIVERED", "FAILED"] {
            let status: OrderStatusType = s.parse().unwrap();
            assert_eq!(status.to_string(), s);
        }
        assert!("paid".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn delivery_transitions() {
        use DeliveryStatus::*;
        assert!(ReadyForPickup.can_transition_to(InTransit));
        assert!(DeliveryInProgress.can_transition_to(InTransit));
        assert!(InTransit.can_transition_to(Delivered));
        assert!(ReadyForPickup.can_transition_to(Delivered));
        assert!(DeliveryInProgress.can_transition_to(Failed));
        assert!(!Delivered.can_transition_to(InTransit));
        assert!(!Failed.can_transition_to(Delivered));
        assert!(!InTransit.can_transition_to(InTransit));
        assert!(!Pending.can_transition_to(Delivered));
    }

    #[test]
    fn seller_payout_readiness() {
        let mut profile = SellerProfile {
            id: 1,
            seller_id: "fisher-1".into(),
            contact_phone: "0700000000".into(),
            payout_phone: String::new(),
            payout_kind: PayoutKind::StkPush,
            paybill_number: String::new(),
            till_number: String::new(),
            account_reference: String::new(),
            verified: true,
            phone_verified: false,
            created_at: Default::default(),
            updated_at: Default::default(),
        };
        // contact phone is an acceptable fallback
        assert!(profile.payout_readiness().is_ok());
        assert_eq!(profile.settlement_phone(), "0700000000");

        profile.payout_kind = PayoutKind::Paybill;
        assert_eq!(profile.payout_readiness(), Err("missing Paybill number"));
        profile.paybill_number = "400200".into();
        assert!(profile.payout_readiness().is_ok());
        assert_eq!(profile.settlement_shortcode().as_deref(), Some("400200"));

        profile.contact_phone = String::new();
        assert_eq!(profile.payout_readiness(), Err("missing M-Pesa phone number"));
    }
}
