//! # Settlement engine public API
//!
//! The `spe_api` module exposes the programmatic API for the settlement engine. The API is modular, so that
//! clients can pick and choose the functionality they need; each API object is created by supplying a backend
//! that implements the relevant traits from [`crate::traits`].
//!
//! * [`checkout_api`] turns a validated cart snapshot into an order with one gateway charge per line item.
//! * [`settlement_api`] consumes asynchronous gateway payment results and drives order/delivery/ledger state.
//! * [`fulfillment_api`] moves deliveries through their state machine and answers order queries.
//!
//! # API usage
//!
//! ```rust,ignore
//! use samaki_payment_engine::{SettlementApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/samaki_store.db", 25).await?;
//! // SqliteDatabase implements SettlementDatabase
//! let api = SettlementApi::new(db, EventProducers::default());
//! let outcome = api.process_callback(callback).await?;
//! ```
pub mod checkout_api;
pub mod errors;
pub mod fulfillment_api;
pub mod order_objects;
pub mod settlement_api;
