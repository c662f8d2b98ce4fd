pub mod helpers;
mod money;

pub mod op;
mod secret;

pub use money::{FeeBreakdown, Kes, Kg, MoneyConversionError, KES_CURRENCY_CODE};
pub use secret::Secret;
