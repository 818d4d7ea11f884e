//! Linear decay curve implementing the [`DecayCurve`] trait.
//!
//! A lock's weight falls in a straight line from its peak at `start` to zero
//! at `end`. Because the curve is linear between those points, the trapezoid
//! rule integrates it exactly; the only rounding is the final floor.

use ebb_core::error::DecayError;
use ebb_core::traits::DecayCurve;
use ebb_core::types::{Amount, LockWindow, Timestamp};

use ebb_core::math::mul_div_floor;

/// The production decay curve.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearDecay;

impl LinearDecay {
    pub fn new() -> Self {
        Self
    }
}

impl DecayCurve for LinearDecay {
    fn weight_at(&self, window: &LockWindow, t: Timestamp) -> Amount {
        if !window.is_active() || t >= window.end {
            return 0;
        }
        if t <= window.start {
            return window.peak_weight;
        }
        let duration = (window.end - window.start) as u128;
        let remaining = (window.end - t) as u128;
        // remaining < duration, so the quotient is below peak and always fits.
        mul_div_floor(window.peak_weight, remaining, duration).unwrap_or(0)
    }

    fn area_between(
        &self,
        window: &LockWindow,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Amount, DecayError> {
        // Outside [start, end] the curve is not linear; clamp to the lock.
        let from = from.max(window.start);
        let to = to.min(window.end);
        if from >= to || !window.is_active() {
            return Ok(0);
        }
        let heights = self
            .weight_at(window, from)
            .checked_add(self.weight_at(window, to))
            .ok_or(DecayError::ArithmeticOverflow)?;
        mul_div_floor(heights, (to - from) as u128, 2).ok_or(DecayError::ArithmeticOverflow)
    }
}
