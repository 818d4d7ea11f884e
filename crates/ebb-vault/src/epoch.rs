//! Sequential reward epochs.
//!
//! Epochs are append-only and never overlap: a new one may open only once
//! the last has ended. Each carries a reward pool, an optional leaderboard
//! pool and the running total of participant contributions.

use serde::Serialize;

use ebb_core::constants::BPS_PRECISION;
use ebb_core::error::{DecayError, StateError, ValidationError, VaultError};
use ebb_core::types::{Amount, AssetId, EpochId, Timestamp};
use ebb_decay::bps_of;

use crate::config::VaultConfig;

/// One asset's balance within an epoch pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, bincode::Encode, bincode::Decode)]
pub struct RewardEntry {
    pub asset: AssetId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct Epoch {
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    /// Sum of every participant's stored contribution.
    pub total_weight: Amount,
    pub reward_pool: Vec<RewardEntry>,
    pub leaderboard_pool: Vec<RewardEntry>,
    pub leaderboard_bps: u64,
    pub leaderboard_claimed: bool,
}

impl Epoch {
    pub fn has_ended(&self, now: Timestamp) -> bool {
        now >= self.end_time
    }
}

/// Merge `amount` of `asset` into `pool`, appending a new entry if needed.
fn credit(pool: &mut Vec<RewardEntry>, asset: AssetId, amount: Amount) -> Result<(), DecayError> {
    if amount == 0 {
        return Ok(());
    }
    match pool.iter_mut().find(|entry| entry.asset == asset) {
        Some(entry) => {
            entry.amount = entry
                .amount
                .checked_add(amount)
                .ok_or(DecayError::ArithmeticOverflow)?;
        }
        None => pool.push(RewardEntry { asset, amount }),
    }
    Ok(())
}

/// How a gross reward funding is divided.
///
/// `fee + leaderboard + reward == gross` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FundingSplit {
    pub asset: AssetId,
    pub gross: Amount,
    pub fee: Amount,
    pub leaderboard: Amount,
    pub reward: Amount,
}

/// Split `gross` into the platform fee, the leaderboard carve-out taken from
/// what remains, and the reward remainder.
pub fn split_funding(
    asset: AssetId,
    gross: Amount,
    fee: Amount,
    leaderboard_bps: u64,
) -> Result<FundingSplit, VaultError> {
    if fee > gross {
        return Err(ValidationError::FeeExceedsGross { fee, gross }.into());
    }
    let net = gross - fee;
    let leaderboard = if leaderboard_bps == 0 {
        0
    } else {
        bps_of(net, leaderboard_bps.min(BPS_PRECISION)).ok_or(DecayError::ArithmeticOverflow)?
    };
    Ok(FundingSplit {
        asset,
        gross,
        fee,
        leaderboard,
        reward: net - leaderboard,
    })
}

#[derive(Debug, Clone, Default, bincode::Encode, bincode::Decode)]
pub struct EpochLedger {
    epochs: Vec<Epoch>,
}

impl EpochLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.epochs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.epochs.is_empty()
    }

    pub fn get(&self, id: EpochId) -> Result<&Epoch, StateError> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.epochs.get(idx))
            .ok_or(StateError::EpochNotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: EpochId) -> Result<&mut Epoch, StateError> {
        usize::try_from(id)
            .ok()
            .and_then(|idx| self.epochs.get_mut(idx))
            .ok_or(StateError::EpochNotFound(id))
    }

    /// Id of the most recently opened epoch.
    pub fn latest_id(&self) -> Option<EpochId> {
        self.epochs.len().checked_sub(1).map(|idx| idx as EpochId)
    }

    /// The latest epoch if it is still accepting contributions at `now`.
    pub fn open_at(&self, now: Timestamp) -> Option<(EpochId, &Epoch)> {
        let id = self.latest_id()?;
        let epoch = self.epochs.last()?;
        (!epoch.has_ended(now)).then_some((id, epoch))
    }

    pub fn iter(&self) -> impl Iterator<Item = (EpochId, &Epoch)> {
        self.epochs
            .iter()
            .enumerate()
            .map(|(idx, epoch)| (idx as EpochId, epoch))
    }

    /// Append a new epoch running from `now` to `end_time` with empty pools.
    pub fn open_epoch(
        &mut self,
        now: Timestamp,
        end_time: Timestamp,
        leaderboard_bps: u64,
        config: &VaultConfig,
    ) -> Result<EpochId, VaultError> {
        if let Some((id, _)) = self.open_at(now) {
            return Err(StateError::PreviousEpochOpen(id).into());
        }
        if end_time <= now {
            return Err(ValidationError::EndTimeNotInFuture { end: end_time, now }.into());
        }
        let duration = end_time - now;
        if duration < config.min_epoch_duration || duration > config.max_epoch_duration {
            return Err(ValidationError::EpochDurationOutOfBounds {
                duration,
                min: config.min_epoch_duration,
                max: config.max_epoch_duration,
            }
            .into());
        }
        if leaderboard_bps > config.max_leaderboard_bps {
            return Err(ValidationError::LeaderboardShareTooHigh {
                bps: leaderboard_bps,
                max: config.max_leaderboard_bps,
            }
            .into());
        }

        self.epochs.push(Epoch {
            start_time: now,
            end_time,
            total_weight: 0,
            reward_pool: Vec::new(),
            leaderboard_pool: Vec::new(),
            leaderboard_bps,
            leaderboard_claimed: false,
        });
        Ok((self.epochs.len() - 1) as EpochId)
    }

    /// Credit a funding split to epoch `id`'s pools.
    pub fn credit(&mut self, id: EpochId, split: &FundingSplit) -> Result<(), VaultError> {
        let epoch = self.get_mut(id)?;
        credit(&mut epoch.reward_pool, split.asset, split.reward)?;
        credit(&mut epoch.leaderboard_pool, split.asset, split.leaderboard)?;
        Ok(())
    }
}
