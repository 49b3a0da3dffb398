//! Accounting Guard
//!
//! Checked arithmetic for every numeric update routed through storage.
//! Quantities handled here (balances, allowances, supply, fees) are
//! non-negative; results outside `0..=i128::MAX` are rejected, never wrapped
//! or saturated.

use lib_types::{Amount, Bps, MAX_BPS};
use serde::{Deserialize, Serialize};

use crate::errors::{ContractError, ContractResult};

/// Rounding direction for division
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rounding {
    /// Toward zero. Fees use this so the payer never pays a fractional unit.
    Floor,
    /// Away from zero
    Ceil,
}

pub fn require_non_negative(amount: Amount) -> ContractResult<()> {
    if amount < 0 {
        return Err(ContractError::InvalidAmount(format!(
            "negative amount: {}",
            amount
        )));
    }
    Ok(())
}

pub fn require_positive(amount: Amount) -> ContractResult<()> {
    if amount <= 0 {
        return Err(ContractError::InvalidAmount(format!(
            "amount must be positive: {}",
            amount
        )));
    }
    Ok(())
}

/// `current + delta`
pub fn checked_add(current: Amount, delta: Amount) -> ContractResult<Amount> {
    require_non_negative(delta)?;
    current.checked_add(delta).ok_or(ContractError::Overflow)
}

/// `current - delta`, rejecting a negative result
pub fn checked_sub(current: Amount, delta: Amount) -> ContractResult<Amount> {
    require_non_negative(delta)?;
    match current.checked_sub(delta) {
        Some(result) if result >= 0 => Ok(result),
        _ => Err(ContractError::Underflow),
    }
}

/// `value * numerator / denominator` with explicit rounding
pub fn mul_div(
    value: Amount,
    numerator: Amount,
    denominator: Amount,
    rounding: Rounding,
) -> ContractResult<Amount> {
    require_non_negative(value)?;
    require_non_negative(numerator)?;
    if denominator <= 0 {
        return Err(ContractError::InvalidConfiguration(format!(
            "denominator must be positive: {}",
            denominator
        )));
    }

    let product = value.checked_mul(numerator).ok_or(ContractError::Overflow)?;
    let quotient = product / denominator;
    match rounding {
        Rounding::Floor => Ok(quotient),
        Rounding::Ceil if product % denominator != 0 => {
            quotient.checked_add(1).ok_or(ContractError::Overflow)
        }
        Rounding::Ceil => Ok(quotient),
    }
}

/// Fee of `rate_bps` basis points on `amount`
pub fn fee_for(amount: Amount, rate_bps: Bps, rounding: Rounding) -> ContractResult<Amount> {
    validate_bps(rate_bps)?;
    if rate_bps == 0 {
        return Ok(0);
    }
    mul_div(amount, rate_bps as Amount, MAX_BPS as Amount, rounding)
}

pub fn validate_bps(rate_bps: Bps) -> ContractResult<()> {
    if rate_bps > MAX_BPS {
        return Err(ContractError::InvalidConfiguration(format!(
            "rate {} bps exceeds {}",
            rate_bps, MAX_BPS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_checked_add_overflow() {
        assert_eq!(checked_add(i128::MAX, 1), Err(ContractError::Overflow));
        assert_eq!(checked_add(100, 0), Ok(100));
    }

    #[test]
    fn test_checked_sub_below_zero() {
        assert_eq!(checked_sub(10, 11), Err(ContractError::Underflow));
        assert_eq!(checked_sub(10, 10), Ok(0));
    }

    #[test]
    fn test_negative_delta_rejected() {
        assert!(matches!(checked_add(10, -1), Err(ContractError::InvalidAmount(_))));
        assert!(matches!(checked_sub(10, -1), Err(ContractError::InvalidAmount(_))));
        assert!(matches!(require_positive(0), Err(ContractError::InvalidAmount(_))));
    }

    #[test]
    fn test_mul_div_rounding() {
        assert_eq!(mul_div(10, 1, 3, Rounding::Floor), Ok(3));
        assert_eq!(mul_div(10, 1, 3, Rounding::Ceil), Ok(4));
        assert_eq!(mul_div(9, 1, 3, Rounding::Ceil), Ok(3));
    }

    #[test]
    fn test_mul_div_zero_divisor() {
        assert!(matches!(
            mul_div(10, 1, 0, Rounding::Floor),
            Err(ContractError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_fee_for() {
        assert_eq!(fee_for(1_000, 25, Rounding::Floor), Ok(2));
        assert_eq!(fee_for(1_000, 25, Rounding::Ceil), Ok(3));
        assert_eq!(fee_for(1_000, 0, Rounding::Floor), Ok(0));
        assert_eq!(fee_for(1_000, MAX_BPS, Rounding::Floor), Ok(1_000));
        assert!(matches!(
            fee_for(1_000, MAX_BPS + 1, Rounding::Floor),
            Err(ContractError::InvalidConfiguration(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_checked_add_matches_i128(a in 0i128..=i128::MAX, b in 0i128..=i128::MAX) {
            match a.checked_add(b) {
                Some(sum) => prop_assert_eq!(checked_add(a, b), Ok(sum)),
                None => prop_assert_eq!(checked_add(a, b), Err(ContractError::Overflow)),
            }
        }

        #[test]
        fn prop_checked_sub_never_negative(a in 0i128..=i128::MAX, b in 0i128..=i128::MAX) {
            match checked_sub(a, b) {
                Ok(diff) => {
                    prop_assert!(diff >= 0);
                    prop_assert_eq!(diff + b, a);
                }
                Err(e) => {
                    prop_assert_eq!(e, ContractError::Underflow);
                    prop_assert!(b > a);
                }
            }
        }

        #[test]
        fn prop_fee_never_exceeds_amount(
            amount in 0i128..1_000_000_000_000,
            bps in 0u32..=MAX_BPS,
        ) {
            let floor = fee_for(amount, bps, Rounding::Floor).unwrap();
            let ceil = fee_for(amount, bps, Rounding::Ceil).unwrap();
            prop_assert!(floor <= amount);
            prop_assert!(ceil - floor <= 1);
        }
    }
}
