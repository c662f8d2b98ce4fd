use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Mul, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const KES_CURRENCY_CODE: &str = "KES";

//--------------------------------------        Kes         ---------------------------------------------------------
/// An amount of Kenyan Shillings, stored as a fixed-point number of cents.
///
/// All financial arithmetic in the settlement engine happens in cent space, so equality checks against gateway
/// callback amounts are exact and the 2-decimal rounding rules are applied in exactly one place.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Kes(i64);

op!(binary Kes, Add, add);
op!(binary Kes, Sub, sub);
op!(inplace Kes, SubAssign, sub_assign);
op!(unary Kes, Neg, neg);

impl Sum for Kes {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl PartialEq for Kes {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Kes {}

/// The fee/net split of a gross amount, as computed by [`Kes::split_fee`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub fee: Kes,
    pub net: Kes,
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a KES amount: {0}")]
pub struct MoneyConversionError(pub String);

impl From<i64> for Kes {
    fn from(cents: i64) -> Self {
        Self(cents)
    }
}

impl Kes {
    pub const ZERO: Kes = Kes(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub fn from_shillings(shillings: i64) -> Self {
        Self(shillings * 100)
    }

    /// The amount in cents.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Whole-shilling part, truncated towards zero. The Daraja STK API only accepts integral amounts.
    pub fn whole_shillings(&self) -> i64 {
        self.0 / 100
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Splits this amount into a platform fee and a net payout.
    ///
    /// The fee is `amount * rate_bps / 10_000`, rounded half-up (half away from zero for negative amounts) to the
    /// nearest cent. The net is whatever remains, so `fee + net == self` always holds.
    pub fn split_fee(&self, rate_bps: u32) -> FeeBreakdown {
        let numerator = self.0 * i64::from(rate_bps);
        let fee = if numerator >= 0 { (numerator + 5_000) / 10_000 } else { (numerator - 5_000) / 10_000 };
        let fee = Kes(fee);
        FeeBreakdown { fee, net: *self - fee }
    }

    /// Converts a floating-point shilling amount (as received in gateway callback metadata) to cents, rounding to
    /// the nearest cent.
    pub fn try_from_f64(shillings: f64) -> Result<Self, MoneyConversionError> {
        if !shillings.is_finite() {
            return Err(MoneyConversionError(format!("{shillings} is not a finite amount")));
        }
        let cents = (shillings * 100.0).round();
        if cents.abs() > i64::MAX as f64 {
            return Err(MoneyConversionError(format!("{shillings} is out of range")));
        }
        Ok(Self(cents as i64))
    }

    /// The amount as a plain `1234.56`-style decimal string, without a currency marker.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let cents = self.0.abs();
        format!("{sign}{}.{:02}", cents / 100, cents % 100)
    }
}

impl Display for Kes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KES {}", self.to_decimal_string())
    }
}

impl FromStr for Kes {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (sign, digits) = match s.strip_prefix('-') {
            Some(rest) => (-1, rest),
            None => (1, s),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() && frac.is_empty() {
            return Err(MoneyConversionError(format!("'{s}' is not a decimal amount")));
        }
        if frac.len() > 2 {
            return Err(MoneyConversionError(format!("'{s}' has sub-cent precision")));
        }
        let whole: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| MoneyConversionError(format!("'{s}' is not a decimal amount")))?
        };
        let cents: i64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{frac:0<2}");
            padded.parse().map_err(|_| MoneyConversionError(format!("'{s}' is not a decimal amount")))?
        };
        Ok(Self(sign * (whole * 100 + cents)))
    }
}

//--------------------------------------        Kg          ---------------------------------------------------------
/// A weight in kilograms with two decimal places of precision, stored as a fixed-point number of hundredths.
///
/// Catalogue stock and order line weights are tracked at 10g resolution, matching the precision the marketplace
/// quotes prices at.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Kg(i64);

op!(binary Kg, Add, add);
op!(binary Kg, Sub, sub);
op!(inplace Kg, SubAssign, sub_assign);

impl Sum for Kg {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl PartialEq for Kg {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Kg {}

impl From<i64> for Kg {
    fn from(hundredths: i64) -> Self {
        Self(hundredths)
    }
}

impl Kg {
    pub const ZERO: Kg = Kg(0);

    pub fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    pub fn from_kg(kg: i64) -> Self {
        Self(kg * 100)
    }

    /// The weight in hundredths of a kilogram.
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl Display for Kg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let h = self.0.abs();
        write!(f, "{sign}{}.{:02}kg", h / 100, h % 100)
    }
}

impl FromStr for Kg {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kes: Kes = s.trim().trim_end_matches("kg").parse()?;
        Ok(Self(kes.value()))
    }
}

/// A price per kilogram multiplied by a weight yields a line total, rounded half-up to the nearest cent.
impl Mul<Kg> for Kes {
    type Output = Kes;

    fn mul(self, weight: Kg) -> Self::Output {
        let numerator = self.0 * weight.0;
        let cents = if numerator >= 0 { (numerator + 50) / 100 } else { (numerator - 50) / 100 };
        Kes(cents)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fee_split_matches_marketplace_rate() {
        // KES 1000.00 at the 2% platform rate
        let gross = Kes::from_shillings(1000);
        let split = gross.split_fee(200);
        assert_eq!(split.fee, Kes::from_cents(2_000));
        assert_eq!(split.net, Kes::from_cents(98_000));
        assert_eq!(split.fee + split.net, gross);
    }

    #[test]
    fn fee_split_rounds_half_up() {
        // 12.25 * 2% = 0.245 -> 0.25
        let split = Kes::from_cents(1_225).split_fee(200);
        assert_eq!(split.fee, Kes::from_cents(25));
        assert_eq!(split.net, Kes::from_cents(1_200));
        // 12.20 * 2% = 0.244 -> 0.24
        let split = Kes::from_cents(1_220).split_fee(200);
        assert_eq!(split.fee, Kes::from_cents(24));
    }

    #[test]
    fn line_total_from_price_and_weight() {
        let price = Kes::from_shillings(500);
        assert_eq!(price * Kg::from_kg(2), Kes::from_shillings(1000));
        assert_eq!(price * Kg::from_hundredths(150), Kes::from_shillings(750));
        // 333.33 * 0.33kg = 109.9989 -> 110.00
        assert_eq!(Kes::from_cents(33_333) * Kg::from_hundredths(33), Kes::from_cents(11_000));
    }

    #[test]
    fn parse_and_display_round_trip() {
        let amount: Kes = "1234.56".parse().unwrap();
        assert_eq!(amount.value(), 123_456);
        assert_eq!(amount.to_decimal_string(), "1234.56");
        assert_eq!(amount.to_string(), "KES 1234.56");
        let amount: Kes = "500".parse().unwrap();
        assert_eq!(amount.value(), 50_000);
        let amount: Kes = "0.5".parse().unwrap();
        assert_eq!(amount.value(), 50);
        let amount: Kes = "-12.05".parse().unwrap();
        assert_eq!(amount.value(), -1_205);
        assert!("12.345".parse::<Kes>().is_err());
        assert!("abc".parse::<Kes>().is_err());
    }

    #[test]
    fn float_amounts_round_to_cents() {
        assert_eq!(Kes::try_from_f64(500.0).unwrap(), Kes::from_shillings(500));
        assert_eq!(Kes::try_from_f64(12.345).unwrap(), Kes::from_cents(1_235));
        assert!(Kes::try_from_f64(f64::NAN).is_err());
    }

    #[test]
    fn summing_line_values() {
        let lines = [Kes::from_cents(100_000), Kes::from_cents(75_000), Kes::from_cents(12_050)];
        let total: Kes = lines.iter().copied().sum();
        assert_eq!(total, Kes::from_cents(187_050));
    }

    #[test]
    fn weight_display() {
        assert_eq!(Kg::from_hundredths(250).to_string(), "2.50kg");
        assert_eq!("2.50kg".parse::<Kg>().unwrap(), Kg::from_hundredths(250));
    }
}
