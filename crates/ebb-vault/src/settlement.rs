//! Pro-rata reward claims and the leaderboard bonus.

use ebb_core::error::{AuthError, DecayError, StateError, VaultError};
use ebb_core::types::{Address, EpochId, Timestamp};
use ebb_decay::mul_div_floor;

use crate::epoch::RewardEntry;
use crate::state::VaultState;

impl VaultState {
    /// Settle `who`'s share of every reward asset in ended epoch `epoch_id`.
    ///
    /// Each share is `floor(pool * contribution / total_weight)`. Rounding
    /// dust stays in the vault. The epoch leaves `who`'s pending set so a
    /// second claim fails.
    pub fn settle_claim(
        &mut self,
        who: &Address,
        epoch_id: EpochId,
        now: Timestamp,
    ) -> Result<Vec<RewardEntry>, VaultError> {
        let epoch = self.epochs.get(epoch_id)?;
        if !epoch.has_ended(now) {
            return Err(StateError::EpochNotEnded(epoch_id).into());
        }
        let pending = self
            .locks
            .get(who)
            .is_some_and(|lock| lock.pending_epochs.contains(&epoch_id));
        let contribution = self.contribution(who, epoch_id);
        if !pending || contribution == 0 {
            return Err(StateError::NothingToClaim(epoch_id).into());
        }
        if epoch.total_weight == 0 {
            return Err(StateError::ZeroTotalWeight(epoch_id).into());
        }

        let mut payouts = Vec::with_capacity(epoch.reward_pool.len());
        for entry in &epoch.reward_pool {
            let amount = mul_div_floor(entry.amount, contribution, epoch.total_weight)
                .ok_or(DecayError::ArithmeticOverflow)?;
            if amount > 0 {
                payouts.push(RewardEntry {
                    asset: entry.asset,
                    amount,
                });
            }
        }

        if let Some(lock) = self.locks.get_mut(who) {
            lock.pending_epochs.remove(&epoch_id);
        }
        Ok(payouts)
    }

    /// Hand the whole leaderboard pool of ended epoch `epoch_id` to the
    /// current top holder, once.
    pub fn settle_leaderboard_bonus(
        &mut self,
        who: &Address,
        epoch_id: EpochId,
        now: Timestamp,
    ) -> Result<Vec<RewardEntry>, VaultError> {
        let epoch = self.epochs.get(epoch_id)?;
        if self.leaderboard.top_holder() != Some(*who) {
            return Err(AuthError::NotTopHolder(*who).into());
        }
        if !epoch.has_ended(now) {
            return Err(StateError::EpochNotEnded(epoch_id).into());
        }
        if epoch.leaderboard_bps == 0 {
            return Err(StateError::NoLeaderboardPool(epoch_id).into());
        }
        if epoch.leaderboard_claimed {
            return Err(StateError::LeaderboardAlreadyClaimed(epoch_id).into());
        }

        let epoch = self.epochs.get_mut(epoch_id)?;
        epoch.leaderboard_claimed = true;
        Ok(epoch
            .leaderboard_pool
            .iter()
            .filter(|entry| entry.amount > 0)
            .copied()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VaultConfig;
    use crate::epoch::split_funding;
    use ebb_core::types::{Amount, AssetId};
    use ebb_decay::LinearDecay;

    fn config() -> VaultConfig {
        VaultConfig {
            min_deposit: 1,
            min_lock_duration: 1,
            min_epoch_duration: 1,
            ..VaultConfig::for_asset(AssetId::repeat_byte(0xAA))
        }
    }

    fn who(byte: u8) -> Address {
        Address::repeat_byte(byte)
    }

    fn token() -> AssetId {
        AssetId::repeat_byte(0x77)
    }

    /// Epoch [0, 10] funded with 900 reward and 100 leaderboard; locks for
    /// participants 1 and 2 with the given amounts over [0, 10].
    fn funded(amounts: &[(u8, Amount)]) -> VaultState {
        let mut state = VaultState::default();
        state.epochs.open_epoch(0, 10, 1_000, &config()).unwrap();
        state
            .epochs
            .credit(0, &split_funding(token(), 1_000, 0, 1_000).unwrap())
            .unwrap();
        for &(byte, amount) in amounts {
            state.locks.create_lock(who(byte), amount, 10, 0, &config()).unwrap();
            state.recompute_contribution(&LinearDecay, who(byte), 0).unwrap();
        }
        state
    }

    // --- settle_claim ---

    #[test]
    fn shares_are_pro_rata() {
        let mut state = funded(&[(1, 1_000), (2, 2_000)]);
        let a = state.settle_claim(&who(1), 0, 10).unwrap();
        let b = state.settle_claim(&who(2), 0, 10).unwrap();
        assert_eq!(a, vec![RewardEntry { asset: token(), amount: 300 }]);
        assert_eq!(b, vec![RewardEntry { asset: token(), amount: 600 }]);
    }

    #[test]
    fn claim_before_end_fails() {
        let mut state = funded(&[(1, 1_000)]);
        assert_eq!(
            state.settle_claim(&who(1), 0, 9),
            Err(StateError::EpochNotEnded(0).into())
        );
    }

    #[test]
    fn double_claim_fails() {
        let mut state = funded(&[(1, 1_000)]);
        state.settle_claim(&who(1), 0, 10).unwrap();
        assert_eq!(
            state.settle_claim(&who(1), 0, 10),
            Err(StateError::NothingToClaim(0).into())
        );
    }

    #[test]
    fn stranger_has_nothing_to_claim() {
        let mut state = funded(&[(1, 1_000)]);
        assert_eq!(
            state.settle_claim(&who(9), 0, 10),
            Err(StateError::NothingToClaim(0).into())
        );
        assert_eq!(
            state.settle_claim(&who(1), 5, 10),
            Err(StateError::EpochNotFound(5).into())
        );
    }

    #[test]
    fn rounding_dust_stays() {
        let mut state = funded(&[(1, 1_000), (2, 1_000), (3, 1_000)]);
        let paid: Amount = (1..=3)
            .map(|b| state.settle_claim(&who(b), 0, 10).unwrap()[0].amount)
            .sum();
        assert_eq!(paid, 900);

        let mut state = funded(&[(1, 1_000), (2, 1_000), (3, 1_001)]);
        let paid: Amount = (1..=3)
            .map(|b| state.settle_claim(&who(b), 0, 10).unwrap()[0].amount)
            .sum();
        assert!(paid <= 900);
    }

    // --- settle_leaderboard_bonus ---

    #[test]
    fn top_holder_takes_whole_pool_once() {
        let mut state = funded(&[(1, 1_000), (2, 2_000)]);
        assert_eq!(
            state.settle_leaderboard_bonus(&who(1), 0, 10),
            Err(AuthError::NotTopHolder(who(1)).into())
        );
        assert_eq!(
            state.settle_leaderboard_bonus(&who(2), 0, 9),
            Err(StateError::EpochNotEnded(0).into())
        );
        let paid = state.settle_leaderboard_bonus(&who(2), 0, 10).unwrap();
        assert_eq!(paid, vec![RewardEntry { asset: token(), amount: 100 }]);
        assert_eq!(
            state.settle_leaderboard_bonus(&who(2), 0, 10),
            Err(StateError::LeaderboardAlreadyClaimed(0).into())
        );
    }

    #[test]
    fn epoch_without_carve_out_has_no_bonus() {
        let mut state = VaultState::default();
        state.epochs.open_epoch(0, 10, 0, &config()).unwrap();
        state.locks.create_lock(who(1), 1_000, 10, 0, &config()).unwrap();
        state.recompute_contribution(&LinearDecay, who(1), 0).unwrap();
        assert_eq!(
            state.settle_leaderboard_bonus(&who(1), 0, 10),
            Err(StateError::NoLeaderboardPool(0).into())
        );
    }
}
