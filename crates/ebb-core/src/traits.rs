//! Trait interfaces at the engine's seams.
//!
//! - [`DecayCurve`]: weight-over-time math (ebb-decay implements)
//! - [`FeeConfig`]: fee and tier collaborator, normally the vault factory
//! - [`FungibleLedger`] / [`NftLedger`]: asset transfer primitives
//! - [`NftReceiver`]: receive hook for non-fungible transfers
//! - [`Clock`]: source of the current timestamp
//!
//! Every collaborator is injected into the vault at construction; none is a
//! global.

use crate::error::{AssetError, DecayError};
use crate::types::{
    Address, Amount, AssetId, CollateralItem, CollectionId, LockWindow, TierConfig, TierId,
    Timestamp, VaultId,
};

/// Pure computation of a lock's weight over time.
pub trait DecayCurve: Send + Sync {
    /// Weight of `window` at instant `t`.
    ///
    /// Must equal `peak_weight` at `start`, be non-increasing in `t`, and be
    /// exactly 0 at and after `end` or when the window is inactive.
    fn weight_at(&self, window: &LockWindow, t: Timestamp) -> Amount;

    /// Exact integral of the weight over `[from, to]`.
    ///
    /// Returns 0 when `from >= to`.
    fn area_between(
        &self,
        window: &LockWindow,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Amount, DecayError>;
}

/// Fee and tier configuration consumed from the factory.
pub trait FeeConfig: Send + Sync {
    /// Account receiving platform fees.
    fn fee_beneficiary(&self) -> Address;

    /// Performance fee taken from a gross reward funding of `vault`.
    fn performance_fee(&self, vault: VaultId, gross: Amount) -> Amount;

    /// Split a collected deposit fee into `(platform_share, admin_share)`.
    fn deposit_fee_sharing(&self, vault: VaultId, fee: Amount) -> (Amount, Amount);

    /// Tier the factory has assigned to `vault`.
    fn assigned_tier(&self, vault: VaultId) -> TierId;

    /// Tier parameters currently assigned to `vault`.
    fn tier_config(&self, vault: VaultId) -> Option<TierConfig>;
}

/// Fungible asset transfer primitives.
///
/// The acting account is explicit: `transfer` moves funds out of `from`'s own
/// balance, `transfer_from` spends `spender`'s allowance on `from`.
pub trait FungibleLedger: Send + Sync {
    fn balance_of(&self, asset: &AssetId, owner: &Address) -> Amount;

    fn allowance(&self, asset: &AssetId, owner: &Address, spender: &Address) -> Amount;

    fn transfer(
        &self,
        asset: &AssetId,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), AssetError>;

    fn transfer_from(
        &self,
        asset: &AssetId,
        spender: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), AssetError>;
}

/// Non-fungible asset transfer primitives.
pub trait NftLedger: Send + Sync {
    fn owner_of(&self, item: &CollateralItem) -> Option<Address>;

    fn get_approved(&self, item: &CollateralItem) -> Option<Address>;

    fn is_approved_for_all(
        &self,
        collection: &CollectionId,
        owner: &Address,
        operator: &Address,
    ) -> bool;

    /// Move `item` from `from` to `to` on behalf of `operator` without
    /// consulting any receive hook. Cannot be refused by `to`.
    fn transfer_item(
        &self,
        operator: &Address,
        from: &Address,
        to: &Address,
        item: &CollateralItem,
    ) -> Result<(), AssetError>;

    /// Move `item` from `from` to `to` on behalf of `operator`.
    ///
    /// When `to` has a registered [`NftReceiver`], its hook must return
    /// [`NFT_RECEIVED_SELECTOR`](crate::constants::NFT_RECEIVED_SELECTOR) or
    /// the transfer is undone.
    fn safe_transfer_from(
        &self,
        operator: &Address,
        from: &Address,
        to: &Address,
        item: &CollateralItem,
    ) -> Result<(), AssetError>;
}

/// Receive hook for non-fungible transfers.
pub trait NftReceiver: Send + Sync {
    fn on_nft_received(&self, operator: &Address, from: &Address, item: &CollateralItem)
        -> [u8; 4];
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
