use std::fmt::Debug;

use log::*;

use crate::{
    db_types::PaymentCallback,
    events::{EventProducers, OrderFailedEvent, OrderSettledEvent, PaymentReceivedEvent},
    traits::{ReconcileOutcome, SettlementDatabase, SettlementError},
};

/// `SettlementApi` is the primary API for reconciling asynchronous gateway payment results against charge
/// requests.
///
/// The whole state machine — idempotency guard, amount validation, order/delivery transitions, ledger emission —
/// lives in the backend's [`SettlementDatabase::reconcile_callback`], which runs it in one transaction per
/// callback. This API wraps that call and publishes hook events for the durable outcomes after the transaction
/// has committed, so subscribers never observe a state that later rolled back.
pub struct SettlementApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for SettlementApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SettlementApi")
    }
}

impl<B> SettlementApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> SettlementApi<B>
where B: SettlementDatabase
{
    /// Apply one gateway payment result, effectively exactly once.
    ///
    /// Duplicate deliveries return [`ReconcileOutcome::DuplicateIgnored`] without re-running side effects, and
    /// never re-publish events. The returned outcome tells the HTTP layer which gateway-facing status to respond
    /// with.
    pub async fn process_callback(&self, callback: PaymentCallback) -> Result<ReconcileOutcome, SettlementError> {
        let external_id = callback.external_id.clone();
        let outcome = self.db.reconcile_callback(&callback).await?;
        match &outcome {
            ReconcileOutcome::Settled(settled) => {
                debug!(
                    "🔄️💰️ Charge [{external_id}] settled. Order {} is {}",
                    settled.order.order_number, settled.order.status
                );
                if let Some(notification) = &settled.notification {
                    for producer in &self.producers.payment_received_producer {
                        let event = PaymentReceivedEvent::new(settled.order.clone(), notification.clone());
                        producer.publish_event(event).await;
                    }
                }
                if settled.fully_settled {
                    debug!("🔄️💰️ Order {} is fully settled. Notifying subscribers", settled.order.order_number);
                    for producer in &self.producers.order_settled_producer {
                        let event = OrderSettledEvent::new(settled.order.clone(), settled.delivery.clone());
                        producer.publish_event(event).await;
                    }
                }
            },
            ReconcileOutcome::ChargeFailed { order, charge } => {
                debug!("🔄️❌️ Charge [{external_id}] failed. Order {} is {}", order.order_number, order.status);
                for producer in &self.producers.order_failed_producer {
                    let event = OrderFailedEvent::new(order.clone(), charge.clone());
                    producer.publish_event(event).await;
                }
            },
            ReconcileOutcome::DuplicateIgnored { .. } => {
                trace!("🔄️ Duplicate callback for [{external_id}] was a no-op");
            },
            ReconcileOutcome::AmountMismatch { expected, actual, .. } => {
                warn!("🔄️ Amount mismatch on [{external_id}]: expected {expected}, callback said {actual}");
            },
            ReconcileOutcome::VerificationCompleted { verification } => {
                debug!("🔄️ Phone verification completed for seller {}", verification.seller_id);
            },
            ReconcileOutcome::VerificationFailed { verification } => {
                debug!("🔄️ Phone verification failed for seller {}", verification.seller_id);
            },
        }
        Ok(outcome)
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
