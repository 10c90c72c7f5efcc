//! Safe arithmetic helpers - no unwrap, no panics

use num_bigint::BigUint;

use crate::state::WAD;

/// Add u128 with saturation at MAX
pub fn add_u128(a: u128, b: u128) -> u128 {
    a.saturating_add(b)
}

/// Subtract u128 with saturation at 0
pub fn sub_u128(a: u128, b: u128) -> u128 {
    a.saturating_sub(b)
}

/// Add i128 with saturation
pub fn add_i128(a: i128, b: i128) -> i128 {
    a.saturating_add(b)
}

/// Subtract i128 with saturation
pub fn sub_i128(a: i128, b: i128) -> i128 {
    a.saturating_sub(b)
}

/// Clamp positive i128 to u128 (negative becomes 0)
pub fn clamp_pos_i128(x: i128) -> u128 {
    if x > 0 {
        x as u128
    } else {
        0
    }
}

/// Convert u128 to i128 with saturation at i128::MAX
pub fn u128_to_i128(x: u128) -> i128 {
    if x > i128::MAX as u128 {
        i128::MAX
    } else {
        x as i128
    }
}

/// a * b / c with a 256-bit intermediate, rounding down. Returns 0 for
/// a zero divisor, saturates at u128::MAX.
pub fn mul_div(a: u128, b: u128, c: u128) -> u128 {
    if c == 0 {
        return 0;
    }
    let wide = BigUint::from(a) * BigUint::from(b) / BigUint::from(c);
    u128::try_from(wide).unwrap_or(u128::MAX)
}

/// Fixed-point multiply at WAD scale
pub fn mul_wad(a: u128, b: u128) -> u128 {
    mul_div(a, b, WAD)
}

/// Signed fixed-point multiply at WAD scale, factor non-negative
pub fn mul_wad_signed(a: i128, b: u128) -> i128 {
    let magnitude = mul_wad(a.unsigned_abs(), b);
    let signed = u128_to_i128(magnitude);
    if a < 0 {
        -signed
    } else {
        signed
    }
}

/// Minimum of two u128
pub fn min_u128(a: u128, b: u128) -> u128 {
    if a < b { a } else { b }
}

/// Maximum of two u128
pub fn max_u128(a: u128, b: u128) -> u128 {
    if a > b { a } else { b }
}
