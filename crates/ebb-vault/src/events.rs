//! Events published after each committed operation.

use serde::Serialize;

use ebb_core::types::{Address, Amount, AssetId, CollateralItem, CollectionId, EpochId, TierId, Timestamp};

use crate::boost::NftRequirement;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum VaultEvent {
    Deposited {
        participant: Address,
        gross: Amount,
        fee: Amount,
        net: Amount,
        lock_end: Timestamp,
    },
    LockExpanded {
        participant: Address,
        added: Amount,
        amount: Amount,
        peak_weight: Amount,
        lock_end: Timestamp,
    },
    Withdrawn {
        participant: Address,
        amount: Amount,
        emergency: bool,
    },
    CollateralDeposited {
        participant: Address,
        item: CollateralItem,
    },
    CollateralWithdrawn {
        participant: Address,
        item: CollateralItem,
    },
    ContributionUpdated {
        participant: Address,
        epoch: EpochId,
        contribution: Amount,
        total_weight: Amount,
    },
    NewTopHolder {
        participant: Address,
        cumulative_weight: Amount,
    },
    EpochOpened {
        epoch: EpochId,
        start_time: Timestamp,
        end_time: Timestamp,
        leaderboard_bps: u64,
    },
    RewardsAdded {
        epoch: EpochId,
        asset: AssetId,
        gross: Amount,
        fee: Amount,
        leaderboard: Amount,
        reward: Amount,
    },
    Claimed {
        participant: Address,
        epoch: EpochId,
        asset: AssetId,
        amount: Amount,
    },
    LeaderboardBonusClaimed {
        participant: Address,
        epoch: EpochId,
        asset: AssetId,
        amount: Amount,
    },
    AdminTransferred {
        previous: Address,
        admin: Address,
    },
    DepositFeeUpdated {
        deposit_fee_bps: u64,
    },
    TierUpdated {
        tier: TierId,
        deposit_fee_bps: u64,
    },
    PauseChanged {
        paused: bool,
    },
    EmergencyActivated,
    AllowListToggled {
        active: bool,
    },
    AllowListUpdated {
        participant: Address,
        allowed: bool,
    },
    NftRequirementSet {
        collection: CollectionId,
        requirement: NftRequirement,
    },
}

impl VaultEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deposited { .. } => "deposited",
            Self::LockExpanded { .. } => "lock_expanded",
            Self::Withdrawn { .. } => "withdrawn",
            Self::CollateralDeposited { .. } => "collateral_deposited",
            Self::CollateralWithdrawn { .. } => "collateral_withdrawn",
            Self::ContributionUpdated { .. } => "contribution_updated",
            Self::NewTopHolder { .. } => "new_top_holder",
            Self::EpochOpened { .. } => "epoch_opened",
            Self::RewardsAdded { .. } => "rewards_added",
            Self::Claimed { .. } => "claimed",
            Self::LeaderboardBonusClaimed { .. } => "leaderboard_bonus_claimed",
            Self::AdminTransferred { .. } => "admin_transferred",
            Self::DepositFeeUpdated { .. } => "deposit_fee_updated",
            Self::TierUpdated { .. } => "tier_updated",
            Self::PauseChanged { .. } => "pause_changed",
            Self::EmergencyActivated => "emergency_activated",
            Self::AllowListToggled { .. } => "allow_list_toggled",
            Self::AllowListUpdated { .. } => "allow_list_updated",
            Self::NftRequirementSet { .. } => "nft_requirement_set",
        }
    }
}
