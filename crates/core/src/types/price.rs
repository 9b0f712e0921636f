//! Money amounts using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price in yuan, the lab's single currency.
///
/// Displays with the currency sign and two decimals (`¥19.90`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero yuan.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Amount rounded to cents without the currency sign (`19.90`).
    #[must_use]
    pub fn plain(&self) -> String {
        format!("{:.2}", self.0.round_dp(2))
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl From<Option<Decimal>> for Price {
    fn from(amount: Option<Decimal>) -> Self {
        Self(amount.unwrap_or_default())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "¥{}", self.plain())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_pads_to_cents() {
        assert_eq!(Price::new(Decimal::new(199, 1)).to_string(), "¥19.90");
        assert_eq!(Price::new(Decimal::new(9999, 0)).to_string(), "¥9999.00");
    }

    #[test]
    fn test_missing_balance_is_zero() {
        assert_eq!(Price::from(None), Price::ZERO);
        assert_eq!(Price::ZERO.plain(), "0.00");
    }
}
