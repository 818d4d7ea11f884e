//! Keeps each participant's stored epoch contribution and the epoch's
//! `total_weight` in step with their lock.

use ebb_core::error::{DecayError, VaultError};
use ebb_core::traits::DecayCurve;
use ebb_core::types::{Address, Amount, EpochId, LockWindow, Timestamp};
use ebb_decay::{epoch_contribution, remaining_contribution};

use crate::state::VaultState;

/// Outcome of a contribution update against the open epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContributionUpdate {
    pub epoch: EpochId,
    pub previous: Amount,
    pub contribution: Amount,
    pub total_weight: Amount,
    /// Set when this update moved the top-holder slot.
    pub new_top: Option<(Address, Amount)>,
}

impl VaultState {
    fn window_and_boost(&self, who: &Address) -> (LockWindow, u64) {
        match self.locks.get(who) {
            Some(lock) => (lock.window(), self.boosts.total_boost(&lock.locked_collateral)),
            None => (LockWindow::default(), 0),
        }
    }

    /// Recompute `who`'s contribution to the epoch open at `now` from scratch.
    ///
    /// Replaces the stored value, adjusts `total_weight` by the difference
    /// and folds a first non-zero contribution into the leaderboard. Returns
    /// `None` when no epoch is open.
    pub fn recompute_contribution(
        &mut self,
        curve: &dyn DecayCurve,
        who: Address,
        now: Timestamp,
    ) -> Result<Option<ContributionUpdate>, VaultError> {
        let Some((epoch_id, epoch)) = self.epochs.open_at(now) else {
            return Ok(None);
        };
        let (start, end) = (epoch.start_time, epoch.end_time);
        let (window, boost) = self.window_and_boost(&who);

        let previous = self.contribution(&who, epoch_id);
        let contribution = epoch_contribution(curve, &window, start, end, boost)?;

        let epoch = self.epochs.get_mut(epoch_id)?;
        // total_weight >= previous holds because total is the sum of stored values.
        let total_weight = epoch
            .total_weight
            .saturating_sub(previous)
            .checked_add(contribution)
            .ok_or(DecayError::ArithmeticOverflow)?;
        epoch.total_weight = total_weight;

        self.set_contribution(who, epoch_id, contribution);
        let new_top = self.leaderboard.record(who, epoch_id, contribution);

        Ok(Some(ContributionUpdate {
            epoch: epoch_id,
            previous,
            contribution,
            total_weight,
            new_top,
        }))
    }

    /// Remove the not-yet-elapsed part of `who`'s contribution to the open
    /// epoch ahead of their lock being cleared.
    ///
    /// Whatever accrued before `now` is kept. Must run before the lock and
    /// its collateral are cleared so the boost is still known.
    pub fn reduce_contribution(
        &mut self,
        curve: &dyn DecayCurve,
        who: Address,
        now: Timestamp,
    ) -> Result<Option<ContributionUpdate>, VaultError> {
        let Some((epoch_id, epoch)) = self.epochs.open_at(now) else {
            return Ok(None);
        };
        let (start, end) = (epoch.start_time, epoch.end_time);
        let (window, boost) = self.window_and_boost(&who);

        let previous = self.contribution(&who, epoch_id);
        let unearned = remaining_contribution(curve, &window, start, end, now, boost)?;
        let removed = unearned.min(previous);
        if removed == 0 {
            return Ok(None);
        }
        let contribution = previous - removed;

        let epoch = self.epochs.get_mut(epoch_id)?;
        let total_weight = epoch.total_weight.saturating_sub(removed);
        epoch.total_weight = total_weight;
        self.set_contribution(who, epoch_id, contribution);

        Ok(Some(ContributionUpdate {
            epoch: epoch_id,
            previous,
            contribution,
            total_weight,
            new_top: None,
        }))
    }
}
