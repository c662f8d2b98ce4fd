use std::{collections::HashMap, fmt::Debug};

use log::*;
use smk_common::Kes;

use crate::{
    db_types::{
        Buyer,
        CartSnapshot,
        CatalogItem,
        ChargeStatus,
        FulfillmentChoice,
        FulfillmentMethod,
        NewChargeRequest,
        NewLineItem,
        NewOrder,
        OrderLineItem,
        SellerProfile,
    },
    helpers::new_order_number,
    spe_api::errors::CheckoutError,
    traits::{ChargeFailure, ChargeInstruction, CheckoutOutcome, PaymentGateway, SettlementDatabase},
};

/// `CheckoutApi` turns a validated cart snapshot into exactly one order plus one gateway charge request per line
/// item.
///
/// The contract is two-phase. Validation and order creation are all-or-nothing: any precondition failure aborts
/// with a [`CheckoutError`] before a single row is written, and the order plus its lines and audit entries are
/// inserted in one transaction. Charge issuance is per-line and *partial by design*: a line whose charge the
/// gateway refuses is recorded FAILED with a synthetic id and the whole order is marked FAILED, but charges that
/// were already issued stay live, since money may be in flight and their callbacks must still reconcile.
pub struct CheckoutApi<B, G> {
    db: B,
    gateway: G,
    fee_bps: u32,
}

impl<B, G> Debug for CheckoutApi<B, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi")
    }
}

impl<B, G> CheckoutApi<B, G> {
    pub fn new(db: B, gateway: G, fee_bps: u32) -> Self {
        Self { db, gateway, fee_bps }
    }
}

impl<B, G> CheckoutApi<B, G>
where
    B: SettlementDatabase,
    G: PaymentGateway,
{
    /// Process a checkout and initiate one gateway charge per seller-linked line item.
    pub async fn place_order(
        &self,
        buyer: &Buyer,
        cart: &CartSnapshot,
        fulfillment: &FulfillmentChoice,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        let validated = self.validate(buyer, cart, fulfillment).await?;

        // Auto-verify sellers whose settlement configuration turned out to be complete.
        for profile in validated.profiles.values() {
            if !profile.verified {
                self.db.mark_seller_verified(&profile.seller_id).await?;
            }
        }

        let order_number = new_order_number();
        let mut lines = Vec::with_capacity(validated.items.len());
        for (item, weight) in &validated.items {
            let line_total = item.price_per_kg * *weight;
            let split = line_total.split_fee(self.fee_bps);
            lines.push(NewLineItem {
                catalog_item_id: item.id,
                seller_id: item.seller_id.clone(),
                name: item.name.clone(),
                species: item.species.clone(),
                unit_price: item.price_per_kg,
                weight: *weight,
                line_total,
                platform_fee: split.fee,
                seller_net_payout: split.net,
            });
        }
        let gross: Kes = lines.iter().map(|l| l.line_total).sum();
        let order_split = gross.split_fee(self.fee_bps);
        let new_order = NewOrder {
            order_number,
            customer_id: buyer.customer_id.clone(),
            customer_phone: buyer.phone.clone(),
            customer_email: buyer.email.clone(),
            total_amount: gross,
            platform_fee: order_split.fee,
            sellers_net_amount: order_split.net,
            fulfillment_method: fulfillment.method,
            pickup_point: fulfillment.pickup_point.clone(),
            delivery_location: fulfillment.delivery_location.clone(),
            delivery_address: fulfillment.delivery_address.clone(),
            delivery_notes: fulfillment.delivery_notes.clone(),
            lines,
        };
        let (mut order, line_items) = self.db.insert_order(new_order).await?;
        info!("🛒️ Order {} created for {} ({} lines, {gross})", order.order_number, buyer.customer_id, line_items.len());

        // Charge issuance: sequential per line so failure attribution stays per-line.
        let mut charge_failures = Vec::new();
        for line in &line_items {
            // The profile was validated above; every line's seller is present in the map.
            let profile = match validated.profiles.get(&line.seller_id) {
                Some(p) => p,
                None => {
                    error!(
                        "🛒️ Seller profile for {} disappeared between validation and charge issuance. This is a bug.",
                        line.seller_id
                    );
                    continue;
                },
            };
            let charge = self.issue_charge_for_line(buyer, &order, line, profile).await;
            if let Err(reason) = charge {
                charge_failures.push(ChargeFailure {
                    line_item_id: line.id,
                    item_name: line.name.clone(),
                    reason,
                });
            }
        }

        if !charge_failures.is_empty() {
            order = self.db.mark_order_failed(order.id).await?;
            warn!(
                "🛒️ {} of {} charge requests failed for order {}",
                charge_failures.len(),
                line_items.len(),
                order.order_number
            );
        }
        Ok(CheckoutOutcome { order, line_items, charge_failures })
    }

    /// Issues the gateway charge for one line and records the result. Returns the human-readable reason on
    /// failure.
    async fn issue_charge_for_line(
        &self,
        buyer: &Buyer,
        order: &crate::db_types::Order,
        line: &OrderLineItem,
        profile: &SellerProfile,
    ) -> Result<(), String> {
        let instruction = ChargeInstruction {
            payer_phone: buyer.phone.clone(),
            amount: line.line_total,
            order_number: order.order_number.clone(),
            settlement_shortcode: profile.settlement_shortcode(),
            account_reference: if profile.account_reference.is_empty() {
                format!("{}-{}", order.order_number.as_str(), line.id)
            } else {
                profile.account_reference.clone()
            },
            payout_kind: profile.payout_kind,
        };
        let (charge, failure) = match self.gateway.initiate_charge(instruction).await {
            Ok(handle) => {
                let charge = NewChargeRequest {
                    order_id: order.id,
                    line_item_id: line.id,
                    seller_id: line.seller_id.clone(),
                    checkout_request_id: handle.checkout_request_id,
                    merchant_request_id: handle.merchant_request_id,
                    amount: line.line_total,
                    platform_fee: line.platform_fee,
                    net_payout: line.seller_net_payout,
                    payer_phone: buyer.phone.clone(),
                    status: ChargeStatus::Pending,
                    result_desc: String::new(),
                };
                (charge, None)
            },
            Err(e) => {
                let reason = e.to_string();
                warn!("🛒️ Charge issuance failed for '{}' on order {}: {reason}", line.name, order.order_number);
                let charge = NewChargeRequest {
                    order_id: order.id,
                    line_item_id: line.id,
                    seller_id: line.seller_id.clone(),
                    checkout_request_id: format!("FAILED-{}-{}", order.order_number.as_str(), line.id),
                    merchant_request_id: String::new(),
                    amount: line.line_total,
                    platform_fee: line.platform_fee,
                    net_payout: line.seller_net_payout,
                    payer_phone: buyer.phone.clone(),
                    status: ChargeStatus::Failed,
                    result_desc: reason.clone(),
                };
                (charge, Some(reason))
            },
        };
        self.db.insert_charge_request(charge).await.map_err(|e| e.to_string())?;
        match failure {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    /// Runs every checkout precondition. No mutation happens here (or anywhere) when any check fails.
    async fn validate(
        &self,
        buyer: &Buyer,
        cart: &CartSnapshot,
        fulfillment: &FulfillmentChoice,
    ) -> Result<ValidatedCart, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        if !buyer.email_verified {
            return Err(CheckoutError::BuyerEmailNotVerified);
        }
        if buyer.phone.trim().is_empty() {
            return Err(CheckoutError::BuyerPhoneMissing);
        }
        match fulfillment.method {
            FulfillmentMethod::Delivery if fulfillment.delivery_location.trim().is_empty() => {
                return Err(CheckoutError::MissingFulfillmentTarget("delivery location".to_string()));
            },
            FulfillmentMethod::Pickup if fulfillment.pickup_point.is_none() => {
                return Err(CheckoutError::MissingFulfillmentTarget("pickup point".to_string()));
            },
            _ => {},
        }

        let mut items = Vec::with_capacity(cart.lines.len());
        let mut profiles: HashMap<String, SellerProfile> = HashMap::new();
        for line in &cart.lines {
            let item = self
                .db
                .fetch_catalog_item(line.catalog_item_id)
                .await?
                .ok_or_else(|| CheckoutError::ItemUnavailable(format!("item #{}", line.catalog_item_id)))?;
            if !line.weight.is_positive() {
                return Err(CheckoutError::InvalidWeight(item.name));
            }
            if !item.price_per_kg.is_positive() {
                return Err(CheckoutError::InvalidPrice(item.name));
            }
            if !item.is_available() || line.weight > item.available_weight {
                return Err(CheckoutError::ItemUnavailable(item.name));
            }
            if !profiles.contains_key(&item.seller_id) {
                let profile = self
                    .db
                    .fetch_seller_profile(&item.seller_id)
                    .await?
                    .ok_or_else(|| CheckoutError::SellerProfileMissing(item.name.clone()))?;
                if let Err(reason) = profile.payout_readiness() {
                    return Err(CheckoutError::SellerNotPayable { item: item.name, reason: reason.to_string() });
                }
                profiles.insert(item.seller_id.clone(), profile);
            }
            items.push((item, line.weight));
        }
        Ok(ValidatedCart { items, profiles })
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

struct ValidatedCart {
    items: Vec<(CatalogItem, smk_common::Kg)>,
    profiles: HashMap<String, SellerProfile>,
}
