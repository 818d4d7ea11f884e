//! Vault configuration.
//!
//! Provides [`VaultConfig`] with protocol defaults for lock and epoch bounds.
//! A config can be built programmatically or layered from a file (TOML, JSON,
//! YAML, anything the `config` crate understands) plus `EBB_`-prefixed
//! environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use ebb_core::constants::{
    DEFAULT_MAX_COLLATERAL_PER_LOCK, DEFAULT_MAX_EPOCH_DURATION, DEFAULT_MAX_LOCK_DURATION,
    DEFAULT_MIN_DEPOSIT, DEFAULT_MIN_EPOCH_DURATION, DEFAULT_MIN_LOCK_DURATION, MAX_BOOST_BPS,
    MAX_LEADERBOARD_BPS,
};
use ebb_core::error::{ValidationError, VaultError};
use ebb_core::types::{Amount, AssetId};

/// Default environment variable prefix for [`VaultConfig::load`].
pub const ENV_PREFIX: &str = "EBB";

/// Configuration for a vault instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Asset participants lock. Must be set; the default is the zero address.
    pub stake_asset: AssetId,
    /// Minimum net principal for a new lock.
    pub min_deposit: Amount,
    pub min_lock_duration: u64,
    pub max_lock_duration: u64,
    pub min_epoch_duration: u64,
    pub max_epoch_duration: u64,
    /// Cap on the leaderboard carve-out an epoch may request.
    pub max_leaderboard_bps: u64,
    /// Cap on a single collection's boost.
    pub max_boost_bps: u64,
    /// Cap on collateral items attached to one lock.
    pub max_collateral_per_lock: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            stake_asset: AssetId::ZERO,
            min_deposit: DEFAULT_MIN_DEPOSIT,
            min_lock_duration: DEFAULT_MIN_LOCK_DURATION,
            max_lock_duration: DEFAULT_MAX_LOCK_DURATION,
            min_epoch_duration: DEFAULT_MIN_EPOCH_DURATION,
            max_epoch_duration: DEFAULT_MAX_EPOCH_DURATION,
            max_leaderboard_bps: MAX_LEADERBOARD_BPS,
            max_boost_bps: MAX_BOOST_BPS,
            max_collateral_per_lock: DEFAULT_MAX_COLLATERAL_PER_LOCK,
        }
    }
}

impl VaultConfig {
    /// Default config locking `stake_asset`.
    pub fn for_asset(stake_asset: AssetId) -> Self {
        Self {
            stake_asset,
            ..Self::default()
        }
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.stake_asset.ensure_nonzero()?;
        if self.min_deposit == 0 {
            return Err(ValidationError::InvalidConfig("min_deposit must be non-zero".into()));
        }
        if self.min_lock_duration == 0 || self.min_lock_duration > self.max_lock_duration {
            return Err(ValidationError::InvalidConfig(format!(
                "lock duration bounds [{}, {}] are invalid",
                self.min_lock_duration, self.max_lock_duration
            )));
        }
        if self.min_epoch_duration == 0 || self.min_epoch_duration > self.max_epoch_duration {
            return Err(ValidationError::InvalidConfig(format!(
                "epoch duration bounds [{}, {}] are invalid",
                self.min_epoch_duration, self.max_epoch_duration
            )));
        }
        if self.max_leaderboard_bps > MAX_LEADERBOARD_BPS {
            return Err(ValidationError::LeaderboardShareTooHigh {
                bps: self.max_leaderboard_bps,
                max: MAX_LEADERBOARD_BPS,
            });
        }
        if self.max_boost_bps > MAX_BOOST_BPS {
            return Err(ValidationError::BoostTooHigh {
                bps: self.max_boost_bps,
                max: MAX_BOOST_BPS,
            });
        }
        Ok(())
    }

    /// Load from an optional file layered under `EBB_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, VaultError> {
        Self::load_with_prefix(path, ENV_PREFIX)
    }

    /// Like [`load`](Self::load) with a custom environment prefix.
    pub fn load_with_prefix(path: Option<&Path>, env_prefix: &str) -> Result<Self, VaultError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(config::Environment::with_prefix(env_prefix).try_parsing(true));

        let cfg: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ValidationError::InvalidConfig(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn stake() -> AssetId {
        AssetId::repeat_byte(0x5A)
    }

    #[test]
    fn default_requires_stake_asset() {
        assert_eq!(
            VaultConfig::default().validate(),
            Err(ValidationError::ZeroAddress)
        );
        assert!(VaultConfig::for_asset(stake()).validate().is_ok());
    }

    #[test]
    fn rejects_inverted_lock_bounds() {
        let cfg = VaultConfig {
            min_lock_duration: 10,
            max_lock_duration: 5,
            ..VaultConfig::for_asset(stake())
        };
        assert!(matches!(
            cfg.validate(),
            Err(ValidationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_leaderboard_cap_above_protocol_cap() {
        let cfg = VaultConfig {
            max_leaderboard_bps: MAX_LEADERBOARD_BPS + 1,
            ..VaultConfig::for_asset(stake())
        };
        assert!(matches!(
            cfg.validate(),
            Err(ValidationError::LeaderboardShareTooHigh { .. })
        ));
    }

    #[test]
    fn loads_toml_file_over_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "stake_asset = \"{}\"\nmin_deposit = 5\nmin_lock_duration = 10\nmin_epoch_duration = 10",
            stake()
        )
        .unwrap();

        let cfg = VaultConfig::load_with_prefix(Some(file.path()), "EBBTEST_FILE_ONLY").unwrap();
        assert_eq!(cfg.stake_asset, stake());
        assert_eq!(cfg.min_deposit, 5);
        assert_eq!(cfg.min_lock_duration, 10);
        assert_eq!(cfg.max_lock_duration, DEFAULT_MAX_LOCK_DURATION);
        assert_eq!(cfg.max_collateral_per_lock, DEFAULT_MAX_COLLATERAL_PER_LOCK);
    }

    #[test]
    fn environment_overrides_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "stake_asset = \"{}\"\nmax_collateral_per_lock = 4", stake()).unwrap();

        // SAFETY: the prefix is unique to this test, so no other test reads it.
        unsafe {
            std::env::set_var("EBBTEST_ENV_MAX_COLLATERAL_PER_LOCK", "9");
        }
        let cfg = VaultConfig::load_with_prefix(Some(file.path()), "EBBTEST_ENV").unwrap();
        assert_eq!(cfg.max_collateral_per_lock, 9);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = VaultConfig::load_with_prefix(
            Some(Path::new("/definitely/not/here.toml")),
            "EBBTEST_MISSING",
        )
        .unwrap_err();
        assert_eq!(err.code(), "E_INVALID_CONFIG");
    }

    #[test]
    fn invalid_loaded_config_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "min_deposit = 5").unwrap();
        let err = VaultConfig::load_with_prefix(Some(file.path()), "EBBTEST_INVALID").unwrap_err();
        assert_eq!(err.code(), "E_ZERO_ADDRESS");
    }
}
