//! In-memory fee and tier registry implementing [`FeeConfig`].
//!
//! Stands in for the vault factory: holds the tier table, the vault → tier
//! assignment and the platform fee beneficiary. Vaults without an explicit
//! assignment fall back to tier 0.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::constants::BPS_PRECISION;
use crate::math::bps_of;
use crate::traits::FeeConfig;
use crate::types::{Address, Amount, TierConfig, TierId, VaultId};

pub struct MemoryFactory {
    beneficiary: RwLock<Address>,
    tiers: RwLock<HashMap<TierId, TierConfig>>,
    assignments: RwLock<HashMap<VaultId, TierId>>,
}

impl MemoryFactory {
    /// Create a registry with `tier0` installed as the default tier.
    pub fn new(beneficiary: Address, tier0: TierConfig) -> Self {
        let mut tiers = HashMap::new();
        tiers.insert(0, tier0);
        Self {
            beneficiary: RwLock::new(beneficiary),
            tiers: RwLock::new(tiers),
            assignments: RwLock::new(HashMap::new()),
        }
    }

    pub fn set_tier(&self, id: TierId, config: TierConfig) {
        self.tiers.write().insert(id, config);
    }

    /// Assign `vault` to `tier`. The factory is expected to follow up with
    /// the vault's own `update_tier` call.
    pub fn assign(&self, vault: VaultId, tier: TierId) {
        self.assignments.write().insert(vault, tier);
    }

    pub fn tier_of(&self, vault: VaultId) -> TierId {
        self.assignments.read().get(&vault).copied().unwrap_or(0)
    }

    pub fn set_beneficiary(&self, beneficiary: Address) {
        *self.beneficiary.write() = beneficiary;
    }
}

/// Basis-point share of `amount`; `bps` is capped at `BPS_PRECISION`, so the
/// result never exceeds `amount`.
fn share(amount: Amount, bps: u64) -> Amount {
    bps_of(amount, bps.min(BPS_PRECISION)).unwrap_or(0)
}

impl FeeConfig for MemoryFactory {
    fn fee_beneficiary(&self) -> Address {
        *self.beneficiary.read()
    }

    fn performance_fee(&self, vault: VaultId, gross: Amount) -> Amount {
        self.tier_config(vault)
            .map(|tier| share(gross, tier.performance_fee_bps))
            .unwrap_or(0)
    }

    fn deposit_fee_sharing(&self, vault: VaultId, fee: Amount) -> (Amount, Amount) {
        let share_bps = self
            .tier_config(vault)
            .map(|tier| tier.platform_fee_share_bps.min(BPS_PRECISION))
            .unwrap_or(BPS_PRECISION);
        let platform = share(fee, share_bps);
        (platform, fee - platform)
    }

    fn assigned_tier(&self, vault: VaultId) -> TierId {
        self.tier_of(vault)
    }

    fn tier_config(&self, vault: VaultId) -> Option<TierConfig> {
        let tier = self.tier_of(vault);
        self.tiers.read().get(&tier).copied()
    }
}
