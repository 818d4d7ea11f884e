//! Protocol constants. Amounts are in base units of the relevant asset,
//! times are Unix seconds.

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Basis-point denominator: 10 000 BPS = 100%.
pub const BPS_PRECISION: u64 = 10_000;

/// One whole token at 18 decimals. Used for default thresholds only; the
/// engine itself is decimal-agnostic.
pub const UNIT: u128 = 1_000_000_000_000_000_000;

/// Default minimum net principal for a new lock.
pub const DEFAULT_MIN_DEPOSIT: u128 = UNIT;

pub const DEFAULT_MIN_LOCK_DURATION: u64 = 7 * SECONDS_PER_DAY;
pub const DEFAULT_MAX_LOCK_DURATION: u64 = 4 * 365 * SECONDS_PER_DAY;

pub const DEFAULT_MIN_EPOCH_DURATION: u64 = SECONDS_PER_DAY;
pub const DEFAULT_MAX_EPOCH_DURATION: u64 = 365 * SECONDS_PER_DAY;

/// Upper bound on the share of an epoch's net rewards carved out for the
/// leaderboard bonus.
pub const MAX_LEADERBOARD_BPS: u64 = 5_000;

/// Upper bound on a single collection's boost (100% = doubles the contribution).
pub const MAX_BOOST_BPS: u64 = 10_000;

/// Upper bound on any deposit fee a tier may allow.
pub const MAX_DEPOSIT_FEE_BPS: u64 = 1_000;

/// Default limit on collateral items attached to one lock.
pub const DEFAULT_MAX_COLLATERAL_PER_LOCK: usize = 32;

/// Acknowledgment a non-fungible receive hook must return to accept an item.
pub const NFT_RECEIVED_SELECTOR: [u8; 4] = [0x15, 0x0b, 0x7a, 0x02];
