//! Core value types shared by every Ebb crate.
//!
//! Amounts are `u128` base units, timestamps are `u64` Unix seconds and
//! basis-point quantities are `u64` out of
//! [`BPS_PRECISION`](crate::constants::BPS_PRECISION).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::BPS_PRECISION;
use crate::error::ValidationError;

/// Token quantity in base units.
pub type Amount = u128;
/// Unix timestamp in seconds.
pub type Timestamp = u64;
/// Epoch identifier: the epoch's index in the ledger.
pub type EpochId = u64;
/// Identifier a factory assigns to each vault instance.
pub type VaultId = u64;
/// Tier index inside the factory's tier table.
pub type TierId = u8;
/// Token id of a non-fungible item within its collection.
pub type ItemId = u64;

/// A 20-byte account identity.
///
/// Participants, admins, the vault itself and asset contracts all share this
/// identity space. Serialised as a `0x`-prefixed lowercase hex string.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default, bincode::Encode,
    bincode::Decode,
)]
pub struct Address(pub [u8; 20]);

/// Fungible asset identity (the token contract's address).
pub type AssetId = Address;
/// Non-fungible collection identity (the collection contract's address).
pub type CollectionId = Address;

impl Address {
    /// The zero address. Never a valid participant, admin or asset.
    pub const ZERO: Self = Self([0u8; 20]);

    /// Address with every byte set to `byte`. Handy for fixtures.
    pub fn repeat_byte(byte: u8) -> Self {
        Self([byte; 20])
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Reject the zero address.
    pub fn ensure_nonzero(self) -> Result<Self, ValidationError> {
        if self.is_zero() {
            return Err(ValidationError::ZeroAddress);
        }
        Ok(self)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl FromStr for Address {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|_| ValidationError::InvalidAddress(s.to_string()))?;
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| ValidationError::InvalidAddress(s.to_string()))?;
        Ok(Self(arr))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One non-fungible item: `(collection, item)`.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord,
    bincode::Encode, bincode::Decode,
)]
pub struct CollateralItem {
    pub collection: CollectionId,
    pub item: ItemId,
}

impl CollateralItem {
    pub fn new(collection: CollectionId, item: ItemId) -> Self {
        Self { collection, item }
    }
}

impl fmt::Display for CollateralItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.collection, self.item)
    }
}

/// A gross reward amount an admin funds an epoch with.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewardSpec {
    pub asset: AssetId,
    pub amount: Amount,
}

impl RewardSpec {
    pub fn new(asset: AssetId, amount: Amount) -> Self {
        Self { asset, amount }
    }
}

/// The decay-relevant view of a lock.
///
/// The weight falls linearly from `peak_weight` at `start` to zero at `end`.
/// A window with `amount == 0` is inactive and weighs nothing.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct LockWindow {
    pub amount: Amount,
    pub peak_weight: Amount,
    pub start: Timestamp,
    pub end: Timestamp,
}

impl LockWindow {
    pub fn is_active(&self) -> bool {
        self.amount > 0 && self.end > self.start
    }
}

/// Fee parameters a factory tier grants to its vaults.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct TierConfig {
    /// Lowest deposit fee an admin may set.
    pub min_deposit_fee_bps: u64,
    /// Highest deposit fee an admin may set.
    pub max_deposit_fee_bps: u64,
    /// Whether the admin may change the deposit fee at all.
    pub can_adjust_deposit_fee: bool,
    /// One-off fee charged by the factory at deployment. Informational here.
    pub deployment_fee: Amount,
    /// Share of every funded reward routed to the platform.
    pub performance_fee_bps: u64,
    /// Platform's share of each collected deposit fee; the admin keeps the rest.
    pub platform_fee_share_bps: u64,
}

impl TierConfig {
    /// Whether `bps` lies within this tier's deposit fee bounds.
    pub fn allows_deposit_fee(&self, bps: u64) -> bool {
        bps >= self.min_deposit_fee_bps && bps <= self.max_deposit_fee_bps
    }

    /// Clamp `bps` into this tier's deposit fee bounds.
    pub fn clamp_deposit_fee(&self, bps: u64) -> u64 {
        bps.clamp(self.min_deposit_fee_bps, self.max_deposit_fee_bps)
    }

    /// Basic consistency check on tier parameters.
    pub fn is_consistent(&self) -> bool {
        self.min_deposit_fee_bps <= self.max_deposit_fee_bps
            && self.performance_fee_bps <= BPS_PRECISION
            && self.platform_fee_share_bps <= BPS_PRECISION
    }
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            min_deposit_fee_bps: 0,
            max_deposit_fee_bps: 0,
            can_adjust_deposit_fee: false,
            deployment_fee: 0,
            performance_fee_bps: 0,
            platform_fee_share_bps: 0,
        }
    }
}
