//! Integer helpers shared by the decay curve, reward settlement and fees.
//!
//! All results are floor-rounded. Products are formed in a 256-bit
//! [`U256`] so that `a * b / d` is exact whenever the quotient itself fits
//! in `u128`.

use primitive_types::U256;

use crate::constants::BPS_PRECISION;
use crate::types::Amount;

/// `floor(a * b / d)`.
///
/// Returns `None` if `d == 0` or the quotient does not fit in `u128`.
pub fn mul_div_floor(a: u128, b: u128, d: u128) -> Option<u128> {
    if d == 0 {
        return None;
    }
    // Two u128 factors never overflow 256 bits.
    let quotient = U256::from(a).checked_mul(U256::from(b))? / U256::from(d);
    if quotient > U256::from(u128::MAX) {
        return None;
    }
    Some(quotient.as_u128())
}

/// `floor(amount * bps / BPS_PRECISION)`.
pub fn bps_of(amount: Amount, bps: u64) -> Option<Amount> {
    mul_div_floor(amount, bps as u128, BPS_PRECISION as u128)
}
