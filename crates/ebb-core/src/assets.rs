//! In-memory asset ledger implementing [`FungibleLedger`] and [`NftLedger`].
//!
//! Suitable for tests and simulation: balances, allowances and item
//! ownership live in `HashMap`s behind a `parking_lot` mutex. The mutex is
//! released before a receive hook runs, so hooks may call back into the
//! ledger (or into whatever invoked the transfer).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::trace;

use crate::constants::NFT_RECEIVED_SELECTOR;
use crate::error::AssetError;
use crate::traits::{FungibleLedger, NftLedger, NftReceiver};
use crate::types::{Address, Amount, AssetId, CollateralItem, CollectionId};

#[derive(Default)]
struct Book {
    balances: HashMap<(AssetId, Address), Amount>,
    allowances: HashMap<(AssetId, Address, Address), Amount>,
    owners: HashMap<CollateralItem, Address>,
    approvals: HashMap<CollateralItem, Address>,
    operators: HashSet<(CollectionId, Address, Address)>,
}

impl Book {
    fn debit(&mut self, asset: &AssetId, owner: &Address, amount: Amount) -> Result<(), AssetError> {
        let have = self.balances.get(&(*asset, *owner)).copied().unwrap_or(0);
        if have < amount {
            return Err(AssetError::InsufficientBalance { have, need: amount });
        }
        self.balances.insert((*asset, *owner), have - amount);
        Ok(())
    }

    fn credit(&mut self, asset: &AssetId, owner: &Address, amount: Amount) -> Result<(), AssetError> {
        let entry = self.balances.entry((*asset, *owner)).or_insert(0);
        *entry = entry.checked_add(amount).ok_or(AssetError::Overflow)?;
        Ok(())
    }

    /// Reassign `item` to `to` if `operator` may move it out of `from`.
    /// Returns the single-item approval that the move cleared.
    fn move_item(
        &mut self,
        operator: &Address,
        from: &Address,
        to: &Address,
        item: &CollateralItem,
    ) -> Result<Option<Address>, AssetError> {
        let owner = self
            .owners
            .get(item)
            .copied()
            .ok_or(AssetError::UnknownItem(*item))?;
        if owner != *from {
            return Err(AssetError::NotOwner {
                item: *item,
                from: *from,
            });
        }
        let authorized = operator == from
            || self.approvals.get(item) == Some(operator)
            || self.operators.contains(&(item.collection, *from, *operator));
        if !authorized {
            return Err(AssetError::NotApproved {
                item: *item,
                operator: *operator,
            });
        }
        self.owners.insert(*item, *to);
        Ok(self.approvals.remove(item))
    }
}

/// In-memory fungible and non-fungible ledger.
#[derive(Default)]
pub struct MemoryAssets {
    book: Mutex<Book>,
    receivers: RwLock<HashMap<Address, Arc<dyn NftReceiver>>>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` of `asset` out of thin air for `to`.
    pub fn mint(&self, asset: &AssetId, to: &Address, amount: Amount) -> Result<(), AssetError> {
        self.book.lock().credit(asset, to, amount)
    }

    /// Set `spender`'s allowance over `owner`'s `asset`.
    pub fn approve(&self, asset: &AssetId, owner: &Address, spender: &Address, amount: Amount) {
        self.book
            .lock()
            .allowances
            .insert((*asset, *owner, *spender), amount);
    }

    /// Create a non-fungible item owned by `to`. Overwrites any previous owner.
    pub fn mint_item(&self, item: CollateralItem, to: &Address) {
        self.book.lock().owners.insert(item, *to);
    }

    /// Approve `spender` for a single item. Only the current owner may approve.
    pub fn approve_item(
        &self,
        owner: &Address,
        item: &CollateralItem,
        spender: &Address,
    ) -> Result<(), AssetError> {
        let mut book = self.book.lock();
        match book.owners.get(item) {
            Some(current) if current == owner => {
                book.approvals.insert(*item, *spender);
                Ok(())
            }
            Some(_) => Err(AssetError::NotOwner {
                item: *item,
                from: *owner,
            }),
            None => Err(AssetError::UnknownItem(*item)),
        }
    }

    pub fn set_approval_for_all(
        &self,
        collection: &CollectionId,
        owner: &Address,
        operator: &Address,
        approved: bool,
    ) {
        let key = (*collection, *owner, *operator);
        let mut book = self.book.lock();
        if approved {
            book.operators.insert(key);
        } else {
            book.operators.remove(&key);
        }
    }

    /// Register a receive hook invoked whenever an item is sent to `account`.
    pub fn register_receiver(&self, account: Address, receiver: Arc<dyn NftReceiver>) {
        self.receivers.write().insert(account, receiver);
    }
}

impl FungibleLedger for MemoryAssets {
    fn balance_of(&self, asset: &AssetId, owner: &Address) -> Amount {
        self.book
            .lock()
            .balances
            .get(&(*asset, *owner))
            .copied()
            .unwrap_or(0)
    }

    fn allowance(&self, asset: &AssetId, owner: &Address, spender: &Address) -> Amount {
        self.book
            .lock()
            .allowances
            .get(&(*asset, *owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(
        &self,
        asset: &AssetId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), AssetError> {
        let mut book = self.book.lock();
        book.debit(asset, from, amount)?;
        book.credit(asset, to, amount)?;
        trace!(%asset, %from, %to, amount, "transfer");
        Ok(())
    }

    fn transfer_from(
        &self,
        asset: &AssetId,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), AssetError> {
        let mut book = self.book.lock();
        let key = (*asset, *from, *spender);
        let allowed = book.allowances.get(&key).copied().unwrap_or(0);
        if allowed < amount {
            return Err(AssetError::InsufficientAllowance {
                have: allowed,
                need: amount,
            });
        }
        book.debit(asset, from, amount)?;
        book.credit(asset, to, amount)?;
        book.allowances.insert(key, allowed - amount);
        trace!(%asset, %spender, %from, %to, amount, "transfer_from");
        Ok(())
    }
}

impl NftLedger for MemoryAssets {
    fn owner_of(&self, item: &CollateralItem) -> Option<Address> {
        self.book.lock().owners.get(item).copied()
    }

    fn get_approved(&self, item: &CollateralItem) -> Option<Address> {
        self.book.lock().approvals.get(item).copied()
    }

    fn is_approved_for_all(
        &self,
        collection: &CollectionId,
        owner: &Address,
        operator: &Address,
    ) -> bool {
        self.book
            .lock()
            .operators
            .contains(&(*collection, *owner, *operator))
    }

    fn transfer_item(
        &self,
        operator: &Address,
        from: &Address,
        to: &Address,
        item: &CollateralItem,
    ) -> Result<(), AssetError> {
        self.book.lock().move_item(operator, from, to, item)?;
        trace!(%item, %from, %to, "transfer_item");
        Ok(())
    }

    fn safe_transfer_from(
        &self,
        operator: &Address,
        from: &Address,
        to: &Address,
        item: &CollateralItem,
    ) -> Result<(), AssetError> {
        let previous_approval = self.book.lock().move_item(operator, from, to, item)?;

        let receiver = self.receivers.read().get(to).cloned();
        if let Some(receiver) = receiver {
            if receiver.on_nft_received(operator, from, item) != NFT_RECEIVED_SELECTOR {
                let mut book = self.book.lock();
                book.owners.insert(*item, *from);
                if let Some(spender) = previous_approval {
                    book.approvals.insert(*item, spender);
                }
                return Err(AssetError::ReceiverRejected(*to));
            }
        }
        trace!(%item, %from, %to, "safe_transfer_from");
        Ok(())
    }
}
