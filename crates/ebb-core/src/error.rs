//! Error types for the Ebb vault engine.
//!
//! Every failure is synchronous and leaves no partial state behind. Each
//! variant carries a stable reason code (see [`VaultError::code`]).
use thiserror::Error;

use crate::types::{Address, Amount, AssetId, CollateralItem, EpochId, TierId, Timestamp};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("zero amount")] ZeroAmount,
    #[error("amount {amount} below minimum {min}")] AmountBelowMinimum { amount: Amount, min: Amount },
    #[error("lock duration {duration}s outside [{min}, {max}]")] LockDurationOutOfBounds { duration: u64, min: u64, max: u64 },
    #[error("epoch duration {duration}s outside [{min}, {max}]")] EpochDurationOutOfBounds { duration: u64, min: u64, max: u64 },
    #[error("end time {end} is not after now {now}")] EndTimeNotInFuture { end: Timestamp, now: Timestamp },
    #[error("zero address")] ZeroAddress,
    #[error("invalid address: {0}")] InvalidAddress(String),
    #[error("length mismatch: {left} vs {right}")] LengthMismatch { left: usize, right: usize },
    #[error("boost {bps} bps exceeds cap {max}")] BoostTooHigh { bps: u64, max: u64 },
    #[error("leaderboard share {bps} bps exceeds cap {max}")] LeaderboardShareTooHigh { bps: u64, max: u64 },
    #[error("deposit fee {bps} bps outside tier bounds [{min}, {max}]")] DepositFeeOutOfBounds { bps: u64, min: u64, max: u64 },
    #[error("expansion adds neither principal nor time")] EmptyExpansion,
    #[error("fee {fee} exceeds gross {gross}")] FeeExceedsGross { fee: Amount, gross: Amount },
    #[error("fee split {platform} + {admin} does not equal {fee}")] FeeSplitMismatch { fee: Amount, platform: Amount, admin: Amount },
    #[error("collateral limit of {max} items reached")] CollateralLimit { max: usize },
    #[error("required count must be non-zero")] ZeroRequiredCount,
    #[error("invalid config: {0}")] InvalidConfig(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("lock already active")] LockActive,
    #[error("no active lock")] NoActiveLock,
    #[error("lock ends at {lock_end}, now {now}")] LockNotEnded { lock_end: Timestamp, now: Timestamp },
    #[error("lock expired at {lock_end} and new end {new_end} does not extend it")] LockExpired { lock_end: Timestamp, new_end: Timestamp },
    #[error("epoch {0} not found")] EpochNotFound(EpochId),
    #[error("epoch {0} has not ended")] EpochNotEnded(EpochId),
    #[error("epoch {0} has ended")] EpochEnded(EpochId),
    #[error("previous epoch {0} still open")] PreviousEpochOpen(EpochId),
    #[error("nothing pending for epoch {0}")] NothingToClaim(EpochId),
    #[error("epoch {0} has zero total weight")] ZeroTotalWeight(EpochId),
    #[error("collection {0} is inactive")] CollectionInactive(Address),
    #[error("collateral {0} already locked")] CollateralAlreadyLocked(CollateralItem),
    #[error("collateral {0} not locked by caller")] CollateralNotLocked(CollateralItem),
    #[error("leaderboard bonus for epoch {0} already claimed")] LeaderboardAlreadyClaimed(EpochId),
    #[error("epoch {0} has no leaderboard pool")] NoLeaderboardPool(EpochId),
    #[error("tier {0} not found")] TierNotFound(TierId),
    #[error("tier {requested} requested but factory assigned {assigned}")] TierNotAssigned { requested: TierId, assigned: TierId },
    #[error("tier does not allow deposit fee changes")] DepositFeeFixed,
    #[error("vault is paused")] Paused,
    #[error("vault is not paused")] NotPaused,
    #[error("emergency mode is not active")] EmergencyInactive,
    #[error("emergency mode is active")] EmergencyActive,
    #[error("reentrant call")] Reentrant,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("{0} is not the vault admin")] NotAdmin(Address),
    #[error("{0} is not the factory")] NotFactory(Address),
    #[error("{0} is not the top holder")] NotTopHolder(Address),
    #[error("{0} is not on the allow-list")] NotAllowed(Address),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("{owner} holds {have} of {asset}, needs {need}")] InsufficientBalance { asset: AssetId, owner: Address, have: Amount, need: Amount },
    #[error("{owner} allows {have} of {asset}, needs {need}")] InsufficientAllowance { asset: AssetId, owner: Address, have: Amount, need: Amount },
    #[error("vault holds {have} of {asset}, needs {need}")] InsufficientVaultBalance { asset: AssetId, have: Amount, need: Amount },
    #[error("{item} is not owned by {expected}")] NotItemOwner { item: CollateralItem, expected: Address },
    #[error("vault not approved for {0}")] ItemNotApproved(CollateralItem),
}

/// Failures reported by asset collaborators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AssetError {
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: Amount, need: Amount },
    #[error("insufficient allowance: have {have}, need {need}")] InsufficientAllowance { have: Amount, need: Amount },
    #[error("unknown item {0}")] UnknownItem(CollateralItem),
    #[error("{from} does not own {item}")] NotOwner { item: CollateralItem, from: Address },
    #[error("{operator} not approved for {item}")] NotApproved { item: CollateralItem, operator: Address },
    #[error("receiver {0} rejected the item")] ReceiverRejected(Address),
    #[error("balance overflow")] Overflow,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecayError {
    #[error("arithmetic overflow")] ArithmeticOverflow,
    #[error("invalid window: start {start} >= end {end}")] InvalidWindow { start: Timestamp, end: Timestamp },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error(transparent)] Validation(#[from] ValidationError),
    #[error(transparent)] State(#[from] StateError),
    #[error(transparent)] Auth(#[from] AuthError),
    #[error(transparent)] Resource(#[from] ResourceError),
    #[error(transparent)] Asset(#[from] AssetError),
    #[error(transparent)] Decay(#[from] DecayError),
    #[error("codec: {0}")] Codec(String),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ZeroAmount => "E_ZERO_AMOUNT",
            Self::AmountBelowMinimum { .. } => "E_AMOUNT_BELOW_MIN",
            Self::LockDurationOutOfBounds { .. } => "E_LOCK_DURATION",
            Self::EpochDurationOutOfBounds { .. } => "E_EPOCH_DURATION",
            Self::EndTimeNotInFuture { .. } => "E_END_IN_PAST",
            Self::ZeroAddress => "E_ZERO_ADDRESS",
            Self::InvalidAddress(_) => "E_INVALID_ADDRESS",
            Self::LengthMismatch { .. } => "E_LENGTH_MISMATCH",
            Self::BoostTooHigh { .. } => "E_BOOST_CAP",
            Self::LeaderboardShareTooHigh { .. } => "E_LEADERBOARD_CAP",
            Self::DepositFeeOutOfBounds { .. } => "E_DEPOSIT_FEE_BOUNDS",
            Self::EmptyExpansion => "E_EMPTY_EXPANSION",
            Self::FeeExceedsGross { .. } => "E_FEE_EXCEEDS_GROSS",
            Self::FeeSplitMismatch { .. } => "E_FEE_SPLIT",
            Self::CollateralLimit { .. } => "E_COLLATERAL_LIMIT",
            Self::ZeroRequiredCount => "E_ZERO_REQUIRED_COUNT",
            Self::InvalidConfig(_) => "E_INVALID_CONFIG",
        }
    }
}

impl StateError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::LockActive => "E_LOCK_ACTIVE",
            Self::NoActiveLock => "E_NO_LOCK",
            Self::LockNotEnded { .. } => "E_LOCK_NOT_ENDED",
            Self::LockExpired { .. } => "E_LOCK_EXPIRED",
            Self::EpochNotFound(_) => "E_EPOCH_NOT_FOUND",
            Self::EpochNotEnded(_) => "E_EPOCH_NOT_ENDED",
            Self::EpochEnded(_) => "E_EPOCH_ENDED",
            Self::PreviousEpochOpen(_) => "E_PREVIOUS_EPOCH_OPEN",
            Self::NothingToClaim(_) => "E_NOTHING_TO_CLAIM",
            Self::ZeroTotalWeight(_) => "E_ZERO_TOTAL_WEIGHT",
            Self::CollectionInactive(_) => "E_COLLECTION_INACTIVE",
            Self::CollateralAlreadyLocked(_) => "E_COLLATERAL_LOCKED",
            Self::CollateralNotLocked(_) => "E_COLLATERAL_NOT_LOCKED",
            Self::LeaderboardAlreadyClaimed(_) => "E_LEADERBOARD_CLAIMED",
            Self::NoLeaderboardPool(_) => "E_NO_LEADERBOARD_POOL",
            Self::TierNotFound(_) => "E_TIER_NOT_FOUND",
            Self::TierNotAssigned { .. } => "E_TIER_NOT_ASSIGNED",
            Self::DepositFeeFixed => "E_DEPOSIT_FEE_FIXED",
            Self::Paused => "E_PAUSED",
            Self::NotPaused => "E_NOT_PAUSED",
            Self::EmergencyInactive => "E_EMERGENCY_INACTIVE",
            Self::EmergencyActive => "E_EMERGENCY_ACTIVE",
            Self::Reentrant => "E_REENTRANT",
        }
    }
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAdmin(_) => "E_NOT_ADMIN",
            Self::NotFactory(_) => "E_NOT_FACTORY",
            Self::NotTopHolder(_) => "E_NOT_TOP_HOLDER",
            Self::NotAllowed(_) => "E_NOT_ALLOWED",
        }
    }
}

impl ResourceError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InsufficientBalance { .. } => "E_INSUFFICIENT_BALANCE",
            Self::InsufficientAllowance { .. } => "E_INSUFFICIENT_ALLOWANCE",
            Self::InsufficientVaultBalance { .. } => "E_INSUFFICIENT_VAULT_BALANCE",
            Self::NotItemOwner { .. } => "E_NOT_ITEM_OWNER",
            Self::ItemNotApproved(_) => "E_ITEM_NOT_APPROVED",
        }
    }
}

impl VaultError {
    /// Stable reason code surfaced alongside the rollback.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.code(),
            Self::State(e) => e.code(),
            Self::Auth(e) => e.code(),
            Self::Resource(e) => e.code(),
            Self::Asset(_) => "E_ASSET",
            Self::Decay(DecayError::ArithmeticOverflow) => "E_OVERFLOW",
            Self::Decay(DecayError::InvalidWindow { .. }) => "E_INVALID_WINDOW",
            Self::Codec(_) => "E_CODEC",
        }
    }
}
