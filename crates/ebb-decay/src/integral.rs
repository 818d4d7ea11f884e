//! Epoch contribution integrals.
//!
//! A participant's contribution to an epoch is the area under their decay
//! curve over the overlap of the lock window and the epoch window, scaled
//! once by their collateral boost.

use ebb_core::error::DecayError;
use ebb_core::traits::DecayCurve;
use ebb_core::types::{Amount, LockWindow, Timestamp};

use ebb_core::math::bps_of;

/// Overlap `[max(lock_start, epoch_start), min(lock_end, epoch_end)]`.
///
/// Returns `None` when the overlap is empty or the lock is inactive.
pub fn overlap_window(
    window: &LockWindow,
    epoch_start: Timestamp,
    epoch_end: Timestamp,
) -> Option<(Timestamp, Timestamp)> {
    if !window.is_active() {
        return None;
    }
    let start = window.start.max(epoch_start);
    let end = window.end.min(epoch_end);
    (start < end).then_some((start, end))
}

/// `area + area * boost_bps / BPS_PRECISION`.
pub fn apply_boost(area: Amount, boost_bps: u64) -> Result<Amount, DecayError> {
    let bonus = bps_of(area, boost_bps).ok_or(DecayError::ArithmeticOverflow)?;
    area.checked_add(bonus).ok_or(DecayError::ArithmeticOverflow)
}

/// Boosted contribution of `window` to the epoch `[epoch_start, epoch_end]`.
pub fn epoch_contribution(
    curve: &dyn DecayCurve,
    window: &LockWindow,
    epoch_start: Timestamp,
    epoch_end: Timestamp,
    boost_bps: u64,
) -> Result<Amount, DecayError> {
    let Some((start, end)) = overlap_window(window, epoch_start, epoch_end) else {
        return Ok(0);
    };
    apply_boost(curve.area_between(window, start, end)?, boost_bps)
}

/// Boosted part of the epoch contribution that has not yet elapsed at `now`.
///
/// This is the area over `[max(now, overlap_start), overlap_end]`; the part
/// before `now` is treated as already earned.
pub fn remaining_contribution(
    curve: &dyn DecayCurve,
    window: &LockWindow,
    epoch_start: Timestamp,
    epoch_end: Timestamp,
    now: Timestamp,
    boost_bps: u64,
) -> Result<Amount, DecayError> {
    let Some((start, end)) = overlap_window(window, epoch_start, epoch_end) else {
        return Ok(0);
    };
    let from = start.max(now);
    if from >= end {
        return Ok(0);
    }
    apply_boost(curve.area_between(window, from, end)?, boost_bps)
}
