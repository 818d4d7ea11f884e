//! Shared fixtures for integration tests.

use std::sync::Arc;

use ebb_core::traits::{FungibleLedger, NftLedger};
use ebb_core::types::{Address, Amount, AssetId, CollateralItem, EpochId, RewardSpec, TierConfig};
use ebb_core::{ManualClock, MemoryAssets, MemoryFactory};
use ebb_vault::{Vault, VaultConfig, VaultDeps, VaultParams};

pub const DAY: u64 = 86_400;
/// Clock start for every harness.
pub const T0: u64 = 1_700_000_000;
pub const VAULT_ID: u64 = 7;

/// Deterministic address from a seed byte.
pub fn addr(seed: u8) -> Address {
    Address::repeat_byte(seed)
}

pub fn stake() -> AssetId {
    addr(0x5A)
}

pub fn reward_token() -> AssetId {
    addr(0x7E)
}

pub fn admin() -> Address {
    addr(0xAD)
}

pub fn factory_account() -> Address {
    addr(0xFA)
}

pub fn beneficiary() -> Address {
    addr(0xBE)
}

pub fn vault_account() -> Address {
    addr(0x99)
}

pub fn collection() -> Address {
    addr(0xC0)
}

pub fn item(id: u64) -> CollateralItem {
    CollateralItem::new(collection(), id)
}

/// Config with every lower bound at 1 so short toy scenarios are allowed.
pub fn relaxed_config() -> VaultConfig {
    VaultConfig {
        min_deposit: 1,
        min_lock_duration: 1,
        min_epoch_duration: 1,
        ..VaultConfig::for_asset(stake())
    }
}

/// A vault wired to in-memory collaborators.
pub struct Harness {
    pub vault: Arc<Vault>,
    pub assets: Arc<MemoryAssets>,
    pub factory: Arc<MemoryFactory>,
    pub clock: Arc<ManualClock>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self::with(TierConfig::default(), relaxed_config())
    }

    pub fn with(tier: TierConfig, config: VaultConfig) -> Self {
        let assets = Arc::new(MemoryAssets::new());
        let factory = Arc::new(MemoryFactory::new(beneficiary(), tier));
        let clock = Arc::new(ManualClock::new(T0));
        let vault = Arc::new(
            Vault::new(
                VaultParams {
                    id: VAULT_ID,
                    address: vault_account(),
                    admin: admin(),
                    factory: factory_account(),
                    tier: 0,
                },
                config,
                VaultDeps::new(factory.clone(), assets.clone(), assets.clone(), clock.clone()),
            )
            .expect("valid vault"),
        );
        assets.register_receiver(vault_account(), vault.clone());
        Self {
            vault,
            assets,
            factory,
            clock,
        }
    }

    pub fn deps(&self) -> VaultDeps {
        VaultDeps::new(
            self.factory.clone(),
            self.assets.clone(),
            self.assets.clone(),
            self.clock.clone(),
        )
    }

    pub fn now(&self) -> u64 {
        ebb_core::traits::Clock::now(self.clock.as_ref())
    }

    pub fn advance(&self, secs: u64) -> u64 {
        self.clock.advance(secs)
    }

    /// Mint `amount` of `asset` to `who` and raise their allowance to the vault.
    pub fn fund(&self, who: Address, asset: AssetId, amount: Amount) {
        self.assets.mint(&asset, &who, amount).expect("mint");
        let allowance = self.assets.allowance(&asset, &who, &vault_account());
        self.assets
            .approve(&asset, &who, &vault_account(), allowance + amount);
    }

    pub fn balance(&self, asset: AssetId, who: Address) -> Amount {
        self.assets.balance_of(&asset, &who)
    }

    /// Fund and deposit, panicking on failure.
    pub fn deposit(&self, who: Address, amount: Amount, duration: u64) -> Amount {
        self.fund(who, stake(), amount);
        self.vault.deposit(who, amount, duration).expect("deposit")
    }

    /// Fund the admin and open an epoch of `duration` seconds from now.
    pub fn open_epoch(&self, pool: Amount, duration: u64, leaderboard_bps: u64) -> EpochId {
        let specs = if pool > 0 {
            self.fund(admin(), reward_token(), pool);
            vec![RewardSpec::new(reward_token(), pool)]
        } else {
            Vec::new()
        };
        self.vault
            .open_epoch(admin(), &specs, self.now() + duration, leaderboard_bps)
            .expect("open epoch")
    }

    /// Mint a collateral item to `who` and approve the vault for it.
    pub fn give_item(&self, who: Address, id: u64) -> CollateralItem {
        let item = item(id);
        self.assets.mint_item(item, &who);
        self.assets
            .approve_item(&who, &item, &vault_account())
            .expect("approve item");
        item
    }

    pub fn owner_of(&self, item: &CollateralItem) -> Option<Address> {
        self.assets.owner_of(item)
    }

    /// Total reward paid to `who` from a claim result.
    pub fn claim_amount(&self, who: Address, epoch: EpochId) -> Amount {
        self.vault
            .claim(who, epoch)
            .expect("claim")
            .iter()
            .map(|entry| entry.amount)
            .sum()
    }
}
