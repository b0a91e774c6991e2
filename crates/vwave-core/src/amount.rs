//! Fixed-point amount helpers on `U256`.
//!
//! All divisions truncate toward zero, matching Solidity integer math.

use alloy::primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// `n * 10^decimals`.
#[inline]
pub fn expand_decimals(n: u64, decimals: u8) -> U256 {
    U256::from(n) * pow10(decimals)
}

/// `10^decimals`.
#[inline]
pub fn pow10(decimals: u8) -> U256 {
    U256::from(10u64).pow(U256::from(decimals))
}

/// Rescale `amount` from `div_decimals` to `mul_decimals` (multiply first).
#[inline]
pub fn adjust_for_decimals(amount: U256, div_decimals: u8, mul_decimals: u8) -> U256 {
    amount * pow10(mul_decimals) / pow10(div_decimals)
}

/// Shift `amount` by a signed number of decimals.
///
/// Positive `shift` multiplies, negative divides.
#[inline]
pub fn shift_decimals(amount: U256, shift: i32) -> U256 {
    match shift {
        0 => amount,
        s if s > 0 => amount * pow10(s as u8),
        s => amount / pow10(s.unsigned_abs() as u8),
    }
}

/// `amount * bps / 10000`.
#[inline]
pub fn apply_bps(amount: U256, bps: u64) -> U256 {
    amount * U256::from(bps) / U256::from(crate::constants::BASIS_POINTS_DIVISOR)
}

/// Absolute difference of two unsigned values.
#[inline]
pub fn abs_diff(a: U256, b: U256) -> U256 {
    if a > b {
        a - b
    } else {
        b - a
    }
}

/// Lossy conversion for small results such as basis points.
///
/// Saturates at `u64::MAX`.
#[inline]
pub fn to_u64_saturating(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Convert a human-entered decimal into fixed point, truncating extra digits.
pub fn amount_from_decimal(value: Decimal, decimals: u8) -> crate::Result<U256> {
    if value.is_sign_negative() {
        return Err(crate::CoreError::InvalidAmount(format!("negative amount: {value}")));
    }
    crate::format::parse_value(&value.normalize().to_string(), decimals)
        .ok_or_else(|| crate::CoreError::InvalidAmount(value.to_string()))
}

/// Convert basis points to a percentage decimal (`30` -> `0.30`).
pub fn bps_to_percent(bps: u32) -> Decimal {
    Decimal::new(i64::from(bps), 2)
}

/// Convert a percentage decimal to basis points, truncating (`0.305` -> `30`).
pub fn percent_to_bps(percent: Decimal) -> Option<u32> {
    if percent.is_sign_negative() {
        return None;
    }
    (percent * Decimal::from(100)).trunc().to_u32()
}
