//! 1e18 fixed-point arithmetic on `U256`
//!
//! All engine quantities are integers scaled by `10^decimals` (1e18 for LP
//! tokens, shares and normalized pool balances). Arithmetic is checked and
//! every division floors, so rounding always lands on the side of the ledger
//! rather than the caller.
//!
//! `Decimal` is only used at the edges (configuration, scenario files, logs)
//! and converts exactly: a value with more fractional digits than the token
//! carries is rejected instead of silently truncated.

use crate::common::errors::FixedPointError;
use ethers_core::types::{U256, U512};
use rust_decimal::Decimal;

/// 1e18, the fixed-point unit
pub const WAD: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

/// Basis-point denominator (10000 = 100%)
pub const BPS_DENOMINATOR: u64 = 10_000;

/// `10^exp` as `U256`
pub fn pow10(exp: u32) -> U256 {
    U256::exp10(exp as usize)
}

/// Checked arithmetic returning [`FixedPointError`] instead of `Option`
pub trait U256Ext: Sized {
    fn try_add(self, rhs: U256) -> Result<U256, FixedPointError>;
    fn try_sub(self, rhs: U256) -> Result<U256, FixedPointError>;
    fn try_mul(self, rhs: U256) -> Result<U256, FixedPointError>;
    fn try_div(self, rhs: U256) -> Result<U256, FixedPointError>;

    /// `self * mul / div` with a 512-bit intermediate, floored
    fn mul_div(self, mul: U256, div: U256) -> Result<U256, FixedPointError>;

    /// `|self - rhs|`
    fn abs_diff(self, rhs: U256) -> U256;
}

impl U256Ext for U256 {
    #[inline]
    fn try_add(self, rhs: U256) -> Result<U256, FixedPointError> {
        self.checked_add(rhs)
            .ok_or(FixedPointError::Overflow { op: "add" })
    }

    #[inline]
    fn try_sub(self, rhs: U256) -> Result<U256, FixedPointError> {
        self.checked_sub(rhs)
            .ok_or(FixedPointError::Underflow { op: "sub" })
    }

    #[inline]
    fn try_mul(self, rhs: U256) -> Result<U256, FixedPointError> {
        self.checked_mul(rhs)
            .ok_or(FixedPointError::Overflow { op: "mul" })
    }

    #[inline]
    fn try_div(self, rhs: U256) -> Result<U256, FixedPointError> {
        self.checked_div(rhs).ok_or(FixedPointError::DivisionByZero)
    }

    fn mul_div(self, mul: U256, div: U256) -> Result<U256, FixedPointError> {
        if div.is_zero() {
            return Err(FixedPointError::DivisionByZero);
        }
        let quotient = self.full_mul(mul) / U512::from(div);
        U256::try_from(quotient).map_err(|_| FixedPointError::Overflow { op: "mul_div" })
    }

    #[inline]
    fn abs_diff(self, rhs: U256) -> U256 {
        if self > rhs {
            self - rhs
        } else {
            rhs - self
        }
    }
}

/// Convert a human-readable token amount into its integer representation
///
/// # Examples
/// ```
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
/// use types::{decimal_to_amount, U256};
///
/// let amount = decimal_to_amount(Decimal::from_str("1.5").unwrap(), 18).unwrap();
/// assert_eq!(amount, U256::from(1_500_000_000_000_000_000u128));
/// ```
pub fn decimal_to_amount(value: Decimal, decimals: u32) -> Result<U256, FixedPointError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(FixedPointError::Negative {
            value: value.to_string(),
        });
    }

    let normalized = value.normalize();
    let scale = normalized.scale();
    let mantissa = U256::from(normalized.mantissa().unsigned_abs());

    if scale <= decimals {
        mantissa.try_mul(pow10(decimals - scale))
    } else {
        let divisor = pow10(scale - decimals);
        if !(mantissa % divisor).is_zero() {
            return Err(FixedPointError::PrecisionLoss {
                value: value.to_string(),
                decimals,
            });
        }
        Ok(mantissa / divisor)
    }
}

/// Convert an integer token amount back into a `Decimal` for display
pub fn amount_to_decimal(amount: U256, decimals: u32) -> Result<Decimal, FixedPointError> {
    if amount.bits() > 96 {
        return Err(FixedPointError::Overflow {
            op: "amount_to_decimal",
        });
    }
    Decimal::try_from_i128_with_scale(amount.low_u128() as i128, decimals)
        .map(|d| d.normalize())
        .map_err(|_| FixedPointError::Overflow {
            op: "amount_to_decimal",
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_wad_constant() {
        assert_eq!(WAD, pow10(18));
    }

    #[test]
    fn test_mul_div_floors() {
        let r = U256::from(10).mul_div(U256::from(10), U256::from(3)).unwrap();
        assert_eq!(r, U256::from(33));
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // (2^200 * 2^100) / 2^100 overflows a naive U256 product
        let a = U256::one() << 200;
        let b = U256::one() << 100;
        assert_eq!(a.mul_div(b, b).unwrap(), a);
    }

    #[test]
    fn test_checked_errors() {
        assert_eq!(
            U256::zero().try_sub(U256::one()),
            Err(FixedPointError::Underflow { op: "sub" })
        );
        assert_eq!(
            U256::MAX.try_add(U256::one()),
            Err(FixedPointError::Overflow { op: "add" })
        );
        assert_eq!(
            U256::one().try_div(U256::zero()),
            Err(FixedPointError::DivisionByZero)
        );
        assert_eq!(
            U256::one().mul_div(U256::one(), U256::zero()),
            Err(FixedPointError::DivisionByZero)
        );
    }

    #[test]
    fn test_decimal_to_amount() {
        assert_eq!(decimal_to_amount(dec!(100), 18).unwrap(), pow10(20));
        assert_eq!(
            decimal_to_amount(dec!(0.000001), 6).unwrap(),
            U256::one()
        );
        assert_eq!(decimal_to_amount(dec!(2.500), 1).unwrap(), U256::from(25));
    }

    #[test]
    fn test_decimal_to_amount_rejects_excess_precision() {
        assert!(matches!(
            decimal_to_amount(dec!(0.0000001), 6),
            Err(FixedPointError::PrecisionLoss { decimals: 6, .. })
        ));
        assert!(matches!(
            decimal_to_amount(dec!(-1), 18),
            Err(FixedPointError::Negative { .. })
        ));
    }

    #[test]
    fn test_amount_to_decimal() {
        let amount = U256::from(1_234_500_000_000_000_000u128);
        assert_eq!(amount_to_decimal(amount, 18).unwrap(), dec!(1.2345));
        assert!(amount_to_decimal(U256::MAX, 18).is_err());
    }
}
