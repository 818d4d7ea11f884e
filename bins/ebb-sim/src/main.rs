//! ebb-sim: replays a vault epoch against in-memory ledgers.
//!
//! `run` opens one funded epoch, locks stake for a set of staggered
//! participants, settles every claim and prints the outcome as JSON. The
//! final engine state can be exported and later examined with `inspect`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use ebb_core::constants::{SECONDS_PER_DAY, UNIT};
use ebb_core::traits::{Clock, FungibleLedger};
use ebb_core::types::{Address, Amount, CollateralItem, EpochId, RewardSpec, TierConfig, VaultId};
use ebb_core::{ManualClock, MemoryAssets, MemoryFactory, SystemClock};
use ebb_vault::{
    EpochSnapshot, LeaderboardSnapshot, LockSnapshot, NftRequirement, Vault, VaultConfig,
    VaultDeps, VaultEvent, VaultParams,
};

const VAULT_ID: VaultId = 1;

fn vault_account() -> Address {
    Address::repeat_byte(0x99)
}

fn admin() -> Address {
    Address::repeat_byte(0xAD)
}

fn factory_account() -> Address {
    Address::repeat_byte(0xFA)
}

fn beneficiary() -> Address {
    Address::repeat_byte(0xBE)
}

fn default_stake() -> Address {
    Address::repeat_byte(0x5A)
}

fn reward_token() -> Address {
    Address::repeat_byte(0x7E)
}

fn collection() -> Address {
    Address::repeat_byte(0xC0)
}

fn participant(index: u8) -> Address {
    Address::repeat_byte(0x10 + index)
}

#[derive(Parser, Debug)]
#[command(
    name = "ebb-sim",
    version,
    about = "Simulate a decaying-weight vault on in-memory ledgers"
)]
struct Cli {
    /// Vault config file (TOML). `EBB_*` environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log output format ("text" or "json")
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one epoch with staggered participants and print the outcome
    Run(RunArgs),
    /// Print snapshots from an exported state file
    Inspect(InspectArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Number of participants
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=64))]
    participants: u8,

    /// Whole tokens locked by the first participant; participant n locks n times as much
    #[arg(long, default_value_t = 100)]
    deposit: u64,

    /// Lock duration in days
    #[arg(long, default_value_t = 30)]
    lock_days: u64,

    /// Epoch length in days
    #[arg(long, default_value_t = 14)]
    epoch_days: u64,

    /// Whole reward tokens funded into the epoch
    #[arg(long, default_value_t = 1_000)]
    pool: u64,

    /// Share of net rewards reserved for the top holder, in basis points
    #[arg(long, default_value_t = 1_000)]
    leaderboard_bps: u64,

    /// Platform performance fee, in basis points
    #[arg(long, default_value_t = 0)]
    performance_fee_bps: u64,

    /// Boost granted by one collateral item; each participant locks one item when non-zero
    #[arg(long, default_value_t = 0)]
    boost_bps: u64,

    /// Write the final engine state here
    #[arg(long)]
    export: Option<PathBuf>,

    /// Include the full event log in the output
    #[arg(long)]
    events: bool,
}

#[derive(Args, Debug)]
struct InspectArgs {
    /// State file written by `run --export`
    state: PathBuf,

    /// Number of participant locks to look up
    #[arg(long, default_value_t = 3, value_parser = clap::value_parser!(u8).range(1..=64))]
    participants: u8,
}

#[derive(Serialize)]
struct ParticipantReport {
    participant: Address,
    locked: Amount,
    contribution: Amount,
    cumulative_weight: Amount,
    claimed: Amount,
    bonus: Amount,
    withdrawn: Amount,
}

#[derive(Serialize)]
struct RunReport {
    epoch: EpochSnapshot,
    leaderboard: LeaderboardSnapshot,
    participants: Vec<ParticipantReport>,
    platform_fees: Amount,
    undistributed: Amount,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<Vec<VaultEvent>>,
}

#[derive(Serialize)]
struct Inspection {
    vault: VaultId,
    address: Address,
    admin: Option<Address>,
    total_locked: Amount,
    paused: bool,
    emergency: bool,
    epochs: Vec<EpochSnapshot>,
    leaderboard: LeaderboardSnapshot,
    locks: Vec<LockSnapshot>,
}

/// In-memory collaborators shared by the simulated vault.
struct World {
    assets: Arc<MemoryAssets>,
    factory: Arc<MemoryFactory>,
    clock: Arc<ManualClock>,
}

impl World {
    fn new(tier: TierConfig) -> Self {
        Self {
            assets: Arc::new(MemoryAssets::new()),
            factory: Arc::new(MemoryFactory::new(beneficiary(), tier)),
            clock: Arc::new(ManualClock::new(SystemClock.now())),
        }
    }

    fn deps(&self) -> VaultDeps {
        VaultDeps::new(
            self.factory.clone(),
            self.assets.clone(),
            self.assets.clone(),
            self.clock.clone(),
        )
    }

    fn now(&self) -> u64 {
        self.clock.now()
    }

    /// Mint `amount` to `who` and approve the vault to pull it.
    fn fund(&self, asset: &Address, who: &Address, amount: Amount) -> Result<()> {
        self.assets.mint(asset, who, amount)?;
        let allowance = self.assets.allowance(asset, who, &vault_account());
        self.assets
            .approve(asset, who, &vault_account(), allowance.saturating_add(amount));
        Ok(())
    }
}

fn tokens(whole: u64) -> Amount {
    Amount::from(whole) * UNIT
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, &cli.log_format);

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Run(args) => run(config, args),
        Command::Inspect(args) => inspect(config, args),
    }
}

fn load_config(path: Option<&Path>) -> Result<VaultConfig> {
    match path {
        Some(path) => VaultConfig::load(Some(path))
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(VaultConfig::for_asset(default_stake())),
    }
}

fn run(config: VaultConfig, args: RunArgs) -> Result<()> {
    let stake = config.stake_asset;
    let world = World::new(TierConfig {
        performance_fee_bps: args.performance_fee_bps,
        ..TierConfig::default()
    });
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
            world.deps(),
        )
        .context("creating vault")?,
    );
    world.assets.register_receiver(vault_account(), vault.clone());

    if args.boost_bps > 0 {
        vault.set_nft_requirement(admin(), collection(), NftRequirement::active(1, args.boost_bps))?;
    }

    let pool = tokens(args.pool);
    world.fund(&reward_token(), &admin(), pool)?;
    let epoch_length = args.epoch_days.saturating_mul(SECONDS_PER_DAY);
    let epoch = vault
        .open_epoch(
            admin(),
            &[RewardSpec::new(reward_token(), pool)],
            world.now() + epoch_length,
            args.leaderboard_bps,
        )
        .context("opening epoch")?;
    info!(epoch, pool = %pool, length = epoch_length, "epoch funded");

    // Stagger entries across the epoch so later participants earn less.
    let step = epoch_length / (u64::from(args.participants) + 1);
    let mut locked = Vec::with_capacity(usize::from(args.participants));
    for index in 0..args.participants {
        let who = participant(index);
        let gross = tokens(args.deposit)
            .checked_mul(Amount::from(index) + 1)
            .context("deposit amount overflows")?;
        world.fund(&stake, &who, gross)?;
        let net = vault
            .deposit(who, gross, args.lock_days.saturating_mul(SECONDS_PER_DAY))
            .with_context(|| format!("deposit by {who}"))?;
        if args.boost_bps > 0 {
            let item = CollateralItem::new(collection(), u64::from(index));
            world.assets.mint_item(item, &who);
            world.assets.approve_item(&who, &item, &vault_account())?;
            vault
                .deposit_collateral(who, item)
                .with_context(|| format!("collateral from {who}"))?;
        }
        locked.push(net);
        world.clock.advance(step);
    }

    let end = vault.epoch_snapshot(epoch)?.end_time;
    world.clock.set(end.max(world.now()));
    let mut participants = settle(&vault, epoch, &locked);

    let latest_end = (0..args.participants)
        .filter_map(|index| vault.lock_snapshot(&participant(index)))
        .map(|lock| lock.lock_end)
        .max()
        .unwrap_or(end);
    world.clock.set(latest_end.max(world.now()));
    for report in &mut participants {
        match vault.withdraw(report.participant) {
            Ok(amount) => report.withdrawn = amount,
            Err(e) => warn!(participant = %report.participant, code = e.code(), "withdraw rejected"),
        }
    }

    if let Some(path) = &args.export {
        let bytes = vault.export_state()?;
        fs::write(path, &bytes).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), bytes = bytes.len(), "state exported");
    }

    let report = RunReport {
        epoch: vault.epoch_snapshot(epoch)?,
        leaderboard: vault.leaderboard_snapshot(),
        participants,
        platform_fees: world.assets.balance_of(&reward_token(), &beneficiary()),
        undistributed: world.assets.balance_of(&reward_token(), &vault_account()),
        events: args.events.then(|| vault.events()),
    };
    print_json(&report)
}

/// Claim every participant's share, then the leaderboard bonus.
fn settle(vault: &Vault, epoch: EpochId, locked: &[Amount]) -> Vec<ParticipantReport> {
    let top = vault.leaderboard_snapshot().top_holder;
    locked
        .iter()
        .zip(0u8..)
        .map(|(&amount, index)| {
            let who = participant(index);
            let contribution = vault.epoch_contribution(&who, epoch);
            let claimed = match vault.claim(who, epoch) {
                Ok(paid) => paid.iter().map(|entry| entry.amount).sum(),
                Err(e) => {
                    warn!(participant = %who, code = e.code(), "claim rejected");
                    0
                }
            };
            let bonus = if top == Some(who) {
                match vault.claim_leaderboard_bonus(who, epoch) {
                    Ok(paid) => paid.iter().map(|entry| entry.amount).sum(),
                    Err(e) => {
                        warn!(participant = %who, code = e.code(), "bonus rejected");
                        0
                    }
                }
            } else {
                0
            };
            ParticipantReport {
                participant: who,
                locked: amount,
                contribution,
                cumulative_weight: vault.cumulative_weight(&who),
                claimed,
                bonus,
                withdrawn: 0,
            }
        })
        .collect()
}

fn inspect(config: VaultConfig, args: InspectArgs) -> Result<()> {
    let bytes = fs::read(&args.state).with_context(|| format!("reading {}", args.state.display()))?;
    let world = World::new(TierConfig::default());
    let deps = VaultDeps::new(
        world.factory.clone(),
        world.assets.clone(),
        world.assets.clone(),
        Arc::new(SystemClock),
    );
    let vault = Vault::restore(&bytes, config, deps).context("restoring vault state")?;

    let epochs = (0..vault.epoch_count())
        .map(|id| vault.epoch_snapshot(id))
        .collect::<Result<Vec<_>, _>>()?;
    let locks = (0..args.participants)
        .filter_map(|index| vault.lock_snapshot(&participant(index)))
        .collect();

    print_json(&Inspection {
        vault: vault.id(),
        address: vault.address(),
        admin: vault.admin(),
        total_locked: vault.total_locked(),
        paused: vault.is_paused(),
        emergency: vault.is_emergency(),
        epochs,
        leaderboard: vault.leaderboard_snapshot(),
        locks,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let out = serde_json::to_string_pretty(value).context("encoding report")?;
    println!("{out}");
    Ok(())
}

/// Initialize tracing subscriber with the given log level and output format.
///
/// Logs go to stderr so stdout stays valid JSON.
fn init_logging(level_str: &str, format: &str) {
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_str));

    if format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .init();
    }
}
