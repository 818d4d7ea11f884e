//! # ebb-decay: Linear weight decay and epoch contribution math.
//!
//! All calculations use integer arithmetic only, floor-rounded.
//!
//! - **Linear decay**: a lock's weight falls in a straight line from its peak
//!   at lock start to zero at lock end.
//! - **Exact integrals**: the contribution of a lock to an epoch is the
//!   trapezoid area under the curve over the overlap of the two windows.
//! - **Boosts**: collateral boosts scale the contribution once, in basis points.
//! - **Wide mul-div**: re-exported from `ebb_core::math`; `a * b / d` is
//!   formed in 256 bits so reward shares never overflow while the quotient fits.

pub mod engine;
pub mod integral;

pub use engine::LinearDecay;
pub use integral::{apply_boost, epoch_contribution, overlap_window, remaining_contribution};
pub use ebb_core::math::{bps_of, mul_div_floor};
