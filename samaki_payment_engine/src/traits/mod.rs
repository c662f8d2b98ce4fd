//! Backend and collaborator traits for the settlement engine.
//!
//! The engine is provider- and storage-agnostic. A storage backend implements [`SettlementDatabase`] (and its
//! read-side companion [`OrderManagement`]); the payment gateway client implements [`PaymentGateway`]. The
//! concrete SQLite backend lives in [`crate::SqliteDatabase`]; the Daraja gateway adapter lives with the server.
mod data_objects;
mod order_management;
mod payment_gateway;
mod settlement_database;

pub use data_objects::{ChargeFailure, CheckoutOutcome, ReconcileOutcome, SettledCharge};
pub use order_management::{OrderManagement, OrderQueryError};
pub use payment_gateway::{ChargeHandle, ChargeInstruction, GatewayError, PaymentGateway};
pub use settlement_database::{SettlementDatabase, SettlementError};
