//! Decimal helpers for money, quota prices and share quantities.
//!
//! Every monetary computation in the crate runs on `rust_decimal` and rounds
//! half-up (away from zero on the midpoint), matching the regulatory convention
//! used by fund administrators. Values are persisted as canonical strings
//! without exponent notation.

pub use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;
use std::str::FromStr;

/// Decimal places for currency amounts (NAV, taxes, provisioning).
pub const MONEY_DP: u32 = 2;

/// Decimal places for quota prices, share counts and returns.
pub const QUOTA_DP: u32 = 6;

/// Rounding and persistence helpers on top of `rust_decimal::Decimal`.
pub trait DecimalExt: Sized {
    /// Round half-up to `dp` decimal places.
    fn round_half_up(&self, dp: u32) -> Self;

    /// Round half-up to [`MONEY_DP`].
    fn round_money(&self) -> Self {
        self.round_half_up(MONEY_DP)
    }

    /// Round half-up to [`QUOTA_DP`].
    fn round_quota(&self) -> Self {
        self.round_half_up(QUOTA_DP)
    }

    /// Format without exponent notation and without trailing zeros.
    fn to_canonical_string(&self) -> String;
}

impl DecimalExt for Decimal {
    fn round_half_up(&self, dp: u32) -> Self {
        self.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
    }

    fn to_canonical_string(&self) -> String {
        format!("{}", self.normalize())
    }
}

/// Parse a decimal stored as TEXT.
///
/// # Errors
/// Returns an error if the string is not a valid decimal number.
pub fn parse_decimal(s: &str) -> Result<Decimal, rust_decimal::Error> {
    Decimal::from_str(s.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_round_half_up_midpoint() {
        assert_eq!(dec!(0.125).round_money(), dec!(0.13));
        assert_eq!(dec!(0.124).round_money(), dec!(0.12));
        assert_eq!(dec!(-0.125).round_money(), dec!(-0.13));
    }

    #[test]
    fn test_round_quota() {
        let shares = dec!(10000) / dec!(1.05);
        assert_eq!(shares.round_quota(), dec!(9523.809524));
    }

    #[test]
    fn test_canonical_string_has_no_exponent_or_trailing_zeros() {
        assert_eq!(dec!(1000000.000000).to_canonical_string(), "1000000");
        assert_eq!(dec!(1.050000).to_canonical_string(), "1.05");
        assert!(!dec!(0.000001).to_canonical_string().contains('e'));
    }

    #[test]
    fn test_parse_decimal_trims() {
        assert_eq!(parse_decimal(" 42.50 ").unwrap(), dec!(42.5));
        assert!(parse_decimal("abc").is_err());
    }
}
