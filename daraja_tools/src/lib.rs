//! # Daraja tools
//!
//! A client for the Safaricom Daraja (M-Pesa) API, covering the three interactions the marketplace needs:
//! OAuth token management, STK push initiation, and parsing of the asynchronous payment-result callbacks.
//!
//! The callback JSON shape is dictated by the gateway and preserved bit-for-bit in [`data_objects`]; consumers
//! should only ever work with the parsed [`PaymentCallback`].
mod api;
mod config;
mod error;

pub mod data_objects;
pub mod helpers;

pub use api::{DarajaApi, StkPushArgs};
pub use config::DarajaConfig;
pub use data_objects::{parse_callback, PaymentCallback, TransactionType, INVALID_RESULT_CODE};
pub use error::DarajaApiError;
