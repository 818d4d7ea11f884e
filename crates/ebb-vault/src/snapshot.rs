//! Read-only views returned by the vault facade.

use serde::Serialize;

use ebb_core::types::{Address, Amount, CollateralItem, EpochId, Timestamp};

use crate::epoch::{Epoch, RewardEntry};
use crate::lock::UserLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LockSnapshot {
    pub participant: Address,
    pub amount: Amount,
    pub lock_start: Timestamp,
    pub lock_end: Timestamp,
    pub peak_weight: Amount,
    /// Weight at the time the snapshot was taken.
    pub voting_power: Amount,
    pub pending_epochs: Vec<EpochId>,
    pub locked_collateral: Vec<CollateralItem>,
}

impl LockSnapshot {
    pub(crate) fn new(participant: Address, lock: &UserLock, voting_power: Amount) -> Self {
        Self {
            participant,
            amount: lock.amount,
            lock_start: lock.lock_start,
            lock_end: lock.lock_end,
            peak_weight: lock.peak_weight,
            voting_power,
            pending_epochs: lock.pending_epochs.as_slice().to_vec(),
            locked_collateral: lock.locked_collateral.as_slice().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EpochSnapshot {
    pub id: EpochId,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub total_weight: Amount,
    pub reward_pool: Vec<RewardEntry>,
    pub leaderboard_pool: Vec<RewardEntry>,
    pub leaderboard_bps: u64,
    pub leaderboard_claimed: bool,
    pub ended: bool,
}

impl EpochSnapshot {
    pub(crate) fn new(id: EpochId, epoch: &Epoch, now: Timestamp) -> Self {
        Self {
            id,
            start_time: epoch.start_time,
            end_time: epoch.end_time,
            total_weight: epoch.total_weight,
            reward_pool: epoch.reward_pool.clone(),
            leaderboard_pool: epoch.leaderboard_pool.clone(),
            leaderboard_bps: epoch.leaderboard_bps,
            leaderboard_claimed: epoch.leaderboard_claimed,
            ended: epoch.has_ended(now),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LeaderboardSnapshot {
    pub top_holder: Option<Address>,
    pub top_holder_cumulative_weight: Amount,
}
