//! Checked 256-bit arithmetic with Solidity 0.8 panic semantics.

use alloy_primitives::U256;

use crate::revert::{CallResult, PanicCode, Revert};

/// `a + b`, panicking with 0x11 on overflow.
///
/// # Errors
///
/// Returns [`Revert::Panic`] on overflow.
pub fn add(a: U256, b: U256) -> CallResult<U256> {
    a.checked_add(b)
        .ok_or(Revert::Panic(PanicCode::ArithmeticOverflow))
}

/// `a - b`, panicking with 0x11 on underflow.
///
/// # Errors
///
/// Returns [`Revert::Panic`] on underflow.
pub fn sub(a: U256, b: U256) -> CallResult<U256> {
    a.checked_sub(b)
        .ok_or(Revert::Panic(PanicCode::ArithmeticOverflow))
}

/// `a * b`, panicking with 0x11 on overflow.
///
/// # Errors
///
/// Returns [`Revert::Panic`] on overflow.
pub fn mul(a: U256, b: U256) -> CallResult<U256> {
    a.checked_mul(b)
        .ok_or(Revert::Panic(PanicCode::ArithmeticOverflow))
}

/// `a / b`, panicking with 0x12 on division by zero.
///
/// # Errors
///
/// Returns [`Revert::Panic`] when `b` is zero.
pub fn div(a: U256, b: U256) -> CallResult<U256> {
    if b.is_zero() {
        return Err(Revert::Panic(PanicCode::DivisionByZero));
    }
    Ok(a / b)
}

/// Babylonian integer square root (floor), as used for initial LP supply.
#[must_use]
pub fn sqrt(y: U256) -> U256 {
    if y > U256::from(3u8) {
        let mut z = y;
        let mut x = y / U256::from(2u8) + U256::from(1u8);
        while x < z {
            z = x;
            x = (y / x + x) / U256::from(2u8);
        }
        z
    } else if y.is_zero() {
        U256::ZERO
    } else {
        U256::from(1u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underflow_is_arithmetic_panic() {
        let err = sub(U256::from(1u8), U256::from(2u8)).unwrap_err();
        assert_eq!(err, Revert::Panic(PanicCode::ArithmeticOverflow));
    }

    #[test]
    fn overflow_is_arithmetic_panic() {
        assert!(add(U256::MAX, U256::from(1u8)).is_err());
        assert!(mul(U256::MAX, U256::from(2u8)).is_err());
    }

    #[test]
    fn division_by_zero_panics() {
        let err = div(U256::from(1u8), U256::ZERO).unwrap_err();
        assert_eq!(err, Revert::Panic(PanicCode::DivisionByZero));
    }

    #[test]
    fn sqrt_floors() {
        assert_eq!(sqrt(U256::ZERO), U256::ZERO);
        assert_eq!(sqrt(U256::from(3u8)), U256::from(1u8));
        assert_eq!(sqrt(U256::from(16u8)), U256::from(4u8));
        assert_eq!(sqrt(U256::from(17u8)), U256::from(4u8));
        // 100e18 * 10e18 = 1e39, sqrt = 31622776601683793319
        let product = U256::from(10u8).pow(U256::from(39u8));
        assert_eq!(sqrt(product), U256::from(31_622_776_601_683_793_319u128));
    }
}
