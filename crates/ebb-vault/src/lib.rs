//! # ebb-vault
//! The vault engine: participants lock stake for a chosen duration and earn a
//! linearly decaying weight. Weight integrated over each reward epoch, scaled
//! by collateral boosts, decides each participant's pro-rata share of the
//! epoch's reward pool. The largest cumulative contributor may also claim the
//! epoch's leaderboard pool.

pub mod boost;
pub mod config;
pub mod contribution;
pub mod epoch;
pub mod events;
pub mod guard;
pub mod leaderboard;
pub mod lock;
mod outbox;
pub mod roles;
pub mod settlement;
pub mod snapshot;
pub mod state;
pub mod vault;

pub use boost::{BoostRegistry, NftRequirement};
pub use config::VaultConfig;
pub use contribution::ContributionUpdate;
pub use epoch::{Epoch, EpochLedger, FundingSplit, RewardEntry};
pub use events::VaultEvent;
pub use leaderboard::Leaderboard;
pub use lock::{LockStore, UserLock};
pub use roles::{AllowList, Role, RoleTable};
pub use snapshot::{EpochSnapshot, LeaderboardSnapshot, LockSnapshot};
pub use state::VaultState;
pub use vault::{Vault, VaultDeps, VaultParams, STATE_FORMAT_VERSION};
