//! Transfers and events staged by an operation before commit.

use ebb_core::types::{Address, Amount, AssetId, CollateralItem};

use crate::events::VaultEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Transfer {
    /// Pull `amount` of `asset` from `from` into the vault.
    Pull { asset: AssetId, from: Address, amount: Amount },
    /// Push `amount` of `asset` from the vault to `to`.
    Push { asset: AssetId, to: Address, amount: Amount },
    ItemIn { item: CollateralItem, from: Address },
    ItemOut { item: CollateralItem, to: Address },
}

impl Transfer {
    pub(crate) fn is_inflow(&self) -> bool {
        matches!(self, Self::Pull { .. } | Self::ItemIn { .. })
    }
}

#[derive(Debug, Default)]
pub(crate) struct Outbox {
    transfers: Vec<Transfer>,
    events: Vec<VaultEvent>,
}

impl Outbox {
    pub(crate) fn pull(&mut self, asset: AssetId, from: Address, amount: Amount) {
        if amount > 0 {
            self.transfers.push(Transfer::Pull { asset, from, amount });
        }
    }

    pub(crate) fn push(&mut self, asset: AssetId, to: Address, amount: Amount) {
        if amount > 0 {
            self.transfers.push(Transfer::Push { asset, to, amount });
        }
    }

    pub(crate) fn item_in(&mut self, item: CollateralItem, from: Address) {
        self.transfers.push(Transfer::ItemIn { item, from });
    }

    pub(crate) fn item_out(&mut self, item: CollateralItem, to: Address) {
        self.transfers.push(Transfer::ItemOut { item, to });
    }

    pub(crate) fn emit(&mut self, event: VaultEvent) {
        self.events.push(event);
    }

    pub(crate) fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    pub(crate) fn into_events(self) -> Vec<VaultEvent> {
        self.events
    }
}
