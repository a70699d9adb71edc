use std::fmt;

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::Serialize;
use thiserror::Error;

pub const TINYBARS_PER_HBAR: i64 = 100_000_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount must not be negative, got {0}")]
    Negative(Decimal),
    #[error("Amount {amount} has more than {decimals} fractional digits")]
    Precision { amount: Decimal, decimals: u32 },
    #[error("Amount {amount} does not fit into base units with {decimals} decimals")]
    Overflow { amount: Decimal, decimals: u32 },
}

/// Converts a human-facing token quantity into the ledger's integer base units.
///
/// The conversion is exact: digits below the token precision are rejected rather than truncated.
pub fn to_base_units(amount: Decimal, decimals: u32) -> Result<u64, AmountError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(AmountError::Negative(amount));
    }
    let overflow = || AmountError::Overflow { amount, decimals };
    let factor = 10u64.checked_pow(decimals).ok_or_else(overflow)?;
    let scaled = amount
        .checked_mul(Decimal::from(factor))
        .ok_or_else(overflow)?;
    if !scaled.fract().is_zero() {
        return Err(AmountError::Precision { amount, decimals });
    }
    scaled.to_u64().ok_or_else(overflow)
}

/// Inverse of [`to_base_units`].
pub fn from_base_units(units: u64, decimals: u32) -> Result<Decimal, AmountError> {
    Decimal::try_from_i128_with_scale(i128::from(units), decimals)
        .map(|amount| amount.normalize())
        .map_err(|_| AmountError::Overflow {
            amount: Decimal::from(units),
            decimals,
        })
}

/// Native currency amount, stored in tinybars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Hbar(i64);

impl Hbar {
    pub const fn new(hbars: i64) -> Self {
        Self(hbars.saturating_mul(TINYBARS_PER_HBAR))
    }

    pub const fn from_tinybars(tinybars: i64) -> Self {
        Self(tinybars)
    }

    pub const fn to_tinybars(self) -> i64 {
        self.0
    }

    pub fn to_hbars(self) -> Decimal {
        Decimal::new(self.0, 8).normalize()
    }

    pub fn checked_add(self, other: Hbar) -> Option<Hbar> {
        self.0.checked_add(other.0).map(Hbar)
    }

    pub fn checked_sub(self, other: Hbar) -> Option<Hbar> {
        self.0.checked_sub(other.0).map(Hbar)
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for Hbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ℏ", self.to_hbars())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::prelude::FromPrimitive;

    use super::*;

    #[test]
    fn base_units_round_trip() {
        for amount in [0u32, 1, 50, 999, 1_000_000] {
            let human = Decimal::from_u32(amount).unwrap();
            let units = to_base_units(human, 2).unwrap();
            assert_eq!(units, u64::from(amount) * 100);
            assert_eq!(from_base_units(units, 2).unwrap(), human);
        }
        assert_eq!(to_base_units(Decimal::new(125, 2), 2).unwrap(), 125);
        assert_eq!(from_base_units(125, 2).unwrap(), Decimal::new(125, 2));
        assert_eq!(to_base_units(Decimal::from(7), 0).unwrap(), 7);
    }

    #[test]
    fn reject_inexact_amounts() {
        let err = to_base_units(Decimal::new(1234, 3), 2).unwrap_err();
        assert_eq!(
            err,
            AmountError::Precision {
                amount: Decimal::new(1234, 3),
                decimals: 2
            }
        );
        assert!(matches!(
            to_base_units(Decimal::from(-1), 2),
            Err(AmountError::Negative(_))
        ));
        assert!(matches!(
            to_base_units(Decimal::from(u64::MAX), 2),
            Err(AmountError::Overflow { .. })
        ));
        assert!(matches!(
            to_base_units(Decimal::ONE, 20),
            Err(AmountError::Overflow { .. })
        ));
    }

    #[test]
    fn hbar_arithmetic() {
        let ten = Hbar::new(10);
        assert_eq!(ten.to_tinybars(), 1_000_000_000);
        assert_eq!(ten.to_hbars(), Decimal::from(10));
        assert_eq!(Hbar::from_tinybars(150_000_000).to_string(), "1.5 ℏ");
        assert_eq!(
            ten.checked_sub(Hbar::new(11)).map(Hbar::is_negative),
            Some(true)
        );
        assert_eq!(ten.checked_add(Hbar::new(1)), Some(Hbar::new(11)));
    }
}
