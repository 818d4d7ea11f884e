//! Per-participant locks and the collateral attached to them.

use std::collections::HashMap;

use ebb_core::error::{DecayError, StateError, ValidationError, VaultError};
use ebb_core::traits::DecayCurve;
use ebb_core::types::{Address, Amount, CollateralItem, EpochId, LockWindow, Timestamp};
use ebb_core::IndexedSet;

use crate::config::VaultConfig;

/// One participant's lock.
///
/// A lock with `amount == 0` is inactive. Clearing a lock keeps
/// `pending_epochs` so that contributions made before withdrawal stay
/// claimable.
#[derive(Debug, Clone, Default, PartialEq, Eq, bincode::Encode, bincode::Decode)]
pub struct UserLock {
    pub amount: Amount,
    pub lock_start: Timestamp,
    pub lock_end: Timestamp,
    pub peak_weight: Amount,
    pub pending_epochs: IndexedSet<EpochId>,
    pub locked_collateral: IndexedSet<CollateralItem>,
}

impl UserLock {
    pub fn is_active(&self) -> bool {
        self.amount > 0
    }

    pub fn window(&self) -> LockWindow {
        LockWindow {
            amount: self.amount,
            peak_weight: self.peak_weight,
            start: self.lock_start,
            end: self.lock_end,
        }
    }
}

/// All locks in a vault plus the global collateral index.
#[derive(Debug, Clone, Default, bincode::Encode, bincode::Decode)]
pub struct LockStore {
    locks: HashMap<Address, UserLock>,
    /// Which participant holds each locked item.
    collateral_owner: HashMap<CollateralItem, Address>,
    total_locked: Amount,
}

impl LockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, who: &Address) -> Option<&UserLock> {
        self.locks.get(who)
    }

    /// The participant's lock if it is active.
    pub fn active(&self, who: &Address) -> Result<&UserLock, StateError> {
        self.locks
            .get(who)
            .filter(|lock| lock.is_active())
            .ok_or(StateError::NoActiveLock)
    }

    pub(crate) fn entry(&mut self, who: Address) -> &mut UserLock {
        self.locks.entry(who).or_default()
    }

    pub(crate) fn get_mut(&mut self, who: &Address) -> Option<&mut UserLock> {
        self.locks.get_mut(who)
    }

    /// Sum of principal across every active lock.
    pub fn total_locked(&self) -> Amount {
        self.total_locked
    }

    pub fn collateral_owner(&self, item: &CollateralItem) -> Option<Address> {
        self.collateral_owner.get(item).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Address, &UserLock)> {
        self.locks.iter()
    }

    /// Open a new lock of `net` principal for `duration` seconds from `now`.
    pub fn create_lock(
        &mut self,
        who: Address,
        net: Amount,
        duration: u64,
        now: Timestamp,
        config: &VaultConfig,
    ) -> Result<&UserLock, VaultError> {
        if net == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        if net < config.min_deposit {
            return Err(ValidationError::AmountBelowMinimum {
                amount: net,
                min: config.min_deposit,
            }
            .into());
        }
        if duration < config.min_lock_duration || duration > config.max_lock_duration {
            return Err(ValidationError::LockDurationOutOfBounds {
                duration,
                min: config.min_lock_duration,
                max: config.max_lock_duration,
            }
            .into());
        }
        if self.locks.get(&who).is_some_and(UserLock::is_active) {
            return Err(StateError::LockActive.into());
        }
        let end = now.checked_add(duration).ok_or(DecayError::ArithmeticOverflow)?;
        let total = self
            .total_locked
            .checked_add(net)
            .ok_or(DecayError::ArithmeticOverflow)?;

        let lock = self.locks.entry(who).or_default();
        lock.amount = net;
        lock.peak_weight = net;
        lock.lock_start = now;
        lock.lock_end = end;
        self.total_locked = total;
        Ok(lock)
    }

    /// Add `extra` principal and/or push the end out to `new_end`.
    ///
    /// The lock is rebased at `now`: its new peak is the weight it still
    /// carries plus `extra`, and it decays from there to the later of the
    /// old and new ends.
    pub fn expand_lock(
        &mut self,
        curve: &dyn DecayCurve,
        who: Address,
        extra: Amount,
        new_end: Timestamp,
        now: Timestamp,
        config: &VaultConfig,
    ) -> Result<&UserLock, VaultError> {
        let lock = self
            .locks
            .get_mut(&who)
            .filter(|lock| lock.is_active())
            .ok_or(StateError::NoActiveLock)?;

        if now >= lock.lock_end && new_end <= now {
            return Err(StateError::LockExpired {
                lock_end: lock.lock_end,
                new_end,
            }
            .into());
        }
        if extra == 0 && new_end <= lock.lock_end {
            return Err(ValidationError::EmptyExpansion.into());
        }
        let end = lock.lock_end.max(new_end);
        let remaining = end.saturating_sub(now);
        if remaining > config.max_lock_duration {
            return Err(ValidationError::LockDurationOutOfBounds {
                duration: remaining,
                min: config.min_lock_duration,
                max: config.max_lock_duration,
            }
            .into());
        }

        let peak = curve
            .weight_at(&lock.window(), now)
            .checked_add(extra)
            .ok_or(DecayError::ArithmeticOverflow)?;
        let amount = lock
            .amount
            .checked_add(extra)
            .ok_or(DecayError::ArithmeticOverflow)?;
        let total = self
            .total_locked
            .checked_add(extra)
            .ok_or(DecayError::ArithmeticOverflow)?;

        lock.amount = amount;
        lock.peak_weight = peak;
        lock.lock_start = now;
        lock.lock_end = end;
        self.total_locked = total;
        Ok(lock)
    }

    /// Zero out an active lock, returning its principal and released items.
    pub fn clear_lock(&mut self, who: &Address) -> Result<(Amount, Vec<CollateralItem>), StateError> {
        let lock = self
            .locks
            .get_mut(who)
            .filter(|lock| lock.is_active())
            .ok_or(StateError::NoActiveLock)?;

        let amount = lock.amount;
        lock.amount = 0;
        lock.peak_weight = 0;
        lock.lock_start = 0;
        lock.lock_end = 0;
        let items = lock.locked_collateral.drain();
        for item in &items {
            self.collateral_owner.remove(item);
        }
        self.total_locked = self.total_locked.saturating_sub(amount);
        Ok((amount, items))
    }

    /// Attach `item` to `who`'s active lock.
    pub fn attach_collateral(
        &mut self,
        who: Address,
        item: CollateralItem,
        max_items: usize,
    ) -> Result<(), VaultError> {
        if self.collateral_owner.contains_key(&item) {
            return Err(StateError::CollateralAlreadyLocked(item).into());
        }
        let lock = self
            .locks
            .get_mut(&who)
            .filter(|lock| lock.is_active())
            .ok_or(StateError::NoActiveLock)?;
        if lock.locked_collateral.len() >= max_items {
            return Err(ValidationError::CollateralLimit { max: max_items }.into());
        }
        lock.locked_collateral.insert(item);
        self.collateral_owner.insert(item, who);
        Ok(())
    }

    /// Detach `item` from `who`'s lock.
    pub fn detach_collateral(&mut self, who: &Address, item: &CollateralItem) -> Result<(), StateError> {
        let removed = self
            .locks
            .get_mut(who)
            .is_some_and(|lock| lock.locked_collateral.remove(item));
        if !removed {
            return Err(StateError::CollateralNotLocked(*item));
        }
        self.collateral_owner.remove(item);
        Ok(())
    }
}
