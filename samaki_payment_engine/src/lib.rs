//! Samaki Payment Engine
//!
//! The settlement core of the Samaki fish marketplace: the state machine that turns a cart snapshot into an
//! order, fans out one mobile-money charge per seller-linked line item, and reconciles asynchronous, possibly
//! duplicated gateway callbacks into consistent order/delivery/ledger state. This library is provider-agnostic.
//!
//! The library is divided into three main sections:
//! 1. Database management and control ([`mod@sqlite`] behind the [`traits`] module). SQLite is the supported
//!    backend. You should never need to access the database directly; use the public API instead. The exception
//!    is the data types used in the database, defined in [`db_types`], which are public.
//! 2. The engine public API ([`mod@spe_api`]): checkout orchestration, callback reconciliation, and fulfillment.
//!    Backends implement the traits in [`traits`] in order to power these APIs.
//! 3. An event hook system ([`events`]). When a charge settles or an order completes, events are emitted through
//!    a simple actor framework so collaborators (notification senders, dashboards) can react without being
//!    entangled in the settlement transaction.
pub mod db_types;
pub mod events;
pub mod helpers;
mod spe_api;
pub mod traits;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use spe_api::{
    checkout_api::CheckoutApi,
    errors::CheckoutError,
    fulfillment_api::FulfillmentApi,
    order_objects,
    settlement_api::SettlementApi,
};
