//! Cumulative contribution tracking and the top-holder slot.
//!
//! Each participant's first non-zero contribution to an epoch is folded into
//! their cumulative weight exactly once. Later recomputes within the same
//! epoch do not fold again. The top holder changes only when someone's
//! cumulative weight strictly exceeds the current top.

use std::collections::{HashMap, HashSet};

use ebb_core::types::{Address, Amount, EpochId};

#[derive(Debug, Clone, Default, bincode::Encode, bincode::Decode)]
pub struct Leaderboard {
    top_holder: Option<Address>,
    top_weight: Amount,
    cumulative: HashMap<Address, Amount>,
    folded: HashSet<(Address, EpochId)>,
}

impl Leaderboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn top_holder(&self) -> Option<Address> {
        self.top_holder
    }

    /// Cumulative weight of the current top holder.
    pub fn top_weight(&self) -> Amount {
        self.top_weight
    }

    pub fn cumulative(&self, who: &Address) -> Amount {
        self.cumulative.get(who).copied().unwrap_or(0)
    }

    pub fn is_folded(&self, who: &Address, epoch: EpochId) -> bool {
        self.folded.contains(&(*who, epoch))
    }

    /// Fold `amount` into `who`'s cumulative weight if this is their first
    /// non-zero contribution to `epoch`.
    ///
    /// Returns the new top holder and their weight when the slot changes hands
    /// or the incumbent's weight grows.
    pub fn record(&mut self, who: Address, epoch: EpochId, amount: Amount) -> Option<(Address, Amount)> {
        if amount == 0 || !self.folded.insert((who, epoch)) {
            return None;
        }
        let total = self.cumulative.entry(who).or_insert(0);
        *total = total.saturating_add(amount);
        let total = *total;

        if total > self.top_weight {
            self.top_holder = Some(who);
            self.top_weight = total;
            return Some((who, total));
        }
        None
    }
}
