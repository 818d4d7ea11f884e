//! Complete mutable state of one vault.
//!
//! Operations run against a staged clone of [`VaultState`] and the clone
//! replaces the live state only once every check and transfer succeeds.

use std::collections::HashMap;

use ebb_core::error::StateError;
use ebb_core::types::{Address, Amount, EpochId, TierId};

use crate::boost::BoostRegistry;
use crate::epoch::EpochLedger;
use crate::leaderboard::Leaderboard;
use crate::lock::LockStore;
use crate::roles::{AllowList, RoleTable};

#[derive(Debug, Clone, Default, bincode::Encode, bincode::Decode)]
pub struct VaultState {
    pub(crate) locks: LockStore,
    pub(crate) epochs: EpochLedger,
    /// Stored contribution per `(participant, epoch)`.
    pub(crate) epoch_power: HashMap<(Address, EpochId), Amount>,
    pub(crate) boosts: BoostRegistry,
    pub(crate) leaderboard: Leaderboard,
    pub(crate) roles: RoleTable,
    pub(crate) allow_list: AllowList,
    pub(crate) paused: bool,
    pub(crate) emergency: bool,
    pub(crate) deposit_fee_bps: u64,
    pub(crate) tier: TierId,
}

impl VaultState {
    pub fn new(roles: RoleTable, tier: TierId, deposit_fee_bps: u64) -> Self {
        Self {
            roles,
            tier,
            deposit_fee_bps,
            ..Self::default()
        }
    }

    pub fn locks(&self) -> &LockStore {
        &self.locks
    }

    pub fn epochs(&self) -> &EpochLedger {
        &self.epochs
    }

    pub fn boosts(&self) -> &BoostRegistry {
        &self.boosts
    }

    pub fn leaderboard(&self) -> &Leaderboard {
        &self.leaderboard
    }

    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_emergency(&self) -> bool {
        self.emergency
    }

    pub fn deposit_fee_bps(&self) -> u64 {
        self.deposit_fee_bps
    }

    pub fn tier(&self) -> TierId {
        self.tier
    }

    pub fn contribution(&self, who: &Address, epoch: EpochId) -> Amount {
        self.epoch_power.get(&(*who, epoch)).copied().unwrap_or(0)
    }

    /// Sum of stored contributions for `epoch`. Equals its `total_weight`.
    pub fn contribution_sum(&self, epoch: EpochId) -> Amount {
        self.epoch_power
            .iter()
            .filter(|((_, id), _)| *id == epoch)
            .fold(0, |acc: Amount, (_, amount)| acc.saturating_add(*amount))
    }

    pub(crate) fn ensure_not_paused(&self) -> Result<(), StateError> {
        if self.paused {
            return Err(StateError::Paused);
        }
        Ok(())
    }

    /// Store `who`'s contribution to `epoch` and keep `pending_epochs` in step.
    pub(crate) fn set_contribution(&mut self, who: Address, epoch: EpochId, amount: Amount) {
        if amount == 0 {
            self.epoch_power.remove(&(who, epoch));
            if let Some(lock) = self.locks.get_mut(&who) {
                lock.pending_epochs.remove(&epoch);
            }
        } else {
            self.epoch_power.insert((who, epoch), amount);
            self.locks.entry(who).pending_epochs.insert(epoch);
        }
    }
}
