//! The vault: entry points, transfer dispatch and the read facade.
//!
//! Every state-changing entry point runs through [`Vault::execute`]:
//!
//! 1. claim the reentrancy guard and read the clock
//! 2. apply the operation to a staged copy of the state, queueing transfers
//!    and events in an outbox
//! 3. precheck every transfer against the ledgers
//! 4. dispatch inflows, then outflows; a failed transfer returns the
//!    inflows already taken
//! 5. commit the staged state and publish the events
//!
//! An error at any step leaves the committed state untouched.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use ebb_core::constants::{MAX_DEPOSIT_FEE_BPS, NFT_RECEIVED_SELECTOR};
use ebb_core::error::{
    AssetError, DecayError, ResourceError, StateError, ValidationError, VaultError,
};
use ebb_core::traits::{Clock, DecayCurve, FeeConfig, FungibleLedger, NftLedger, NftReceiver};
use ebb_core::types::{
    Address, Amount, AssetId, CollateralItem, CollectionId, EpochId, RewardSpec, TierId,
    Timestamp, VaultId,
};
use ebb_decay::{bps_of, LinearDecay};

use crate::boost::NftRequirement;
use crate::config::VaultConfig;
use crate::contribution::ContributionUpdate;
use crate::epoch::{split_funding, RewardEntry};
use crate::events::VaultEvent;
use crate::guard::ReentrancyLock;
use crate::outbox::{Outbox, Transfer};
use crate::roles::{Role, RoleTable};
use crate::snapshot::{EpochSnapshot, LeaderboardSnapshot, LockSnapshot};
use crate::state::VaultState;

/// Format tag prepended to exported state.
pub const STATE_FORMAT_VERSION: u8 = 1;

/// Collaborators injected into a vault.
#[derive(Clone)]
pub struct VaultDeps {
    pub fees: Arc<dyn FeeConfig>,
    pub tokens: Arc<dyn FungibleLedger>,
    pub nfts: Arc<dyn NftLedger>,
    pub clock: Arc<dyn Clock>,
    pub curve: Arc<dyn DecayCurve>,
}

impl VaultDeps {
    /// Collaborators with the linear decay curve.
    pub fn new(
        fees: Arc<dyn FeeConfig>,
        tokens: Arc<dyn FungibleLedger>,
        nfts: Arc<dyn NftLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fees,
            tokens,
            nfts,
            clock,
            curve: Arc::new(LinearDecay::new()),
        }
    }

    pub fn with_curve(mut self, curve: Arc<dyn DecayCurve>) -> Self {
        self.curve = curve;
        self
    }
}

/// Identity of a vault instance as assigned by its factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultParams {
    pub id: VaultId,
    /// The vault's own account on the asset ledgers.
    pub address: Address,
    pub admin: Address,
    pub factory: Address,
    pub tier: TierId,
}

pub struct Vault {
    id: VaultId,
    address: Address,
    config: VaultConfig,
    deps: VaultDeps,
    state: Mutex<VaultState>,
    guard: ReentrancyLock,
    log: Mutex<Vec<VaultEvent>>,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn add_to(slot: &mut Amount, amount: Amount) -> Result<(), DecayError> {
    *slot = slot.checked_add(amount).ok_or(DecayError::ArithmeticOverflow)?;
    Ok(())
}

impl Vault {
    pub fn new(params: VaultParams, config: VaultConfig, deps: VaultDeps) -> Result<Self, VaultError> {
        config.validate()?;
        params.address.ensure_nonzero()?;
        params.admin.ensure_nonzero()?;
        params.factory.ensure_nonzero()?;

        let deposit_fee_bps = deps
            .fees
            .tier_config(params.id)
            .map(|tier| tier.min_deposit_fee_bps.min(MAX_DEPOSIT_FEE_BPS))
            .unwrap_or(0);
        let state = VaultState::new(
            RoleTable::new(params.admin, params.factory),
            params.tier,
            deposit_fee_bps,
        );
        info!(
            vault = params.id,
            address = %params.address,
            admin = %params.admin,
            stake = %config.stake_asset,
            "vault created"
        );
        Ok(Self::from_state(params.id, params.address, config, deps, state))
    }

    fn from_state(
        id: VaultId,
        address: Address,
        config: VaultConfig,
        deps: VaultDeps,
        state: VaultState,
    ) -> Self {
        Self {
            id,
            address,
            config,
            deps,
            state: Mutex::new(state),
            guard: ReentrancyLock::new(),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> VaultId {
        self.id
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    // --- execution ---

    fn execute<R>(
        &self,
        op: &'static str,
        body: impl FnOnce(&mut VaultState, &mut Outbox, Timestamp) -> Result<R, VaultError>,
    ) -> Result<R, VaultError> {
        let _entry = self.guard.enter().map_err(|e| {
            debug!(vault = self.id, op, "rejected reentrant call");
            VaultError::from(e)
        })?;
        let now = self.deps.clock.now();
        // Clone and release: the state lock is never held while collaborators run.
        let mut staged = self.state.lock().clone();
        let mut outbox = Outbox::default();

        let result = body(&mut staged, &mut outbox, now).and_then(|value| {
            self.precheck(outbox.transfers())?;
            self.dispatch(outbox.transfers())?;
            Ok(value)
        });

        match result {
            Ok(value) => {
                *self.state.lock() = staged;
                self.publish(outbox.into_events());
                Ok(value)
            }
            Err(e) => {
                debug!(vault = self.id, op, code = e.code(), error = %e, "operation rejected");
                Err(e)
            }
        }
    }

    fn precheck(&self, transfers: &[Transfer]) -> Result<(), VaultError> {
        let mut pulls: HashMap<(AssetId, Address), Amount> = HashMap::new();
        let mut inflows: HashMap<AssetId, Amount> = HashMap::new();
        let mut pushes: HashMap<AssetId, Amount> = HashMap::new();

        for transfer in transfers {
            match transfer {
                Transfer::Pull { asset, from, amount } => {
                    add_to(pulls.entry((*asset, *from)).or_insert(0), *amount)?;
                    add_to(inflows.entry(*asset).or_insert(0), *amount)?;
                }
                Transfer::Push { asset, amount, .. } => {
                    add_to(pushes.entry(*asset).or_insert(0), *amount)?;
                }
                Transfer::ItemIn { item, from } => {
                    if self.deps.nfts.owner_of(item) != Some(*from) {
                        return Err(ResourceError::NotItemOwner {
                            item: *item,
                            expected: *from,
                        }
                        .into());
                    }
                    let approved = self.deps.nfts.get_approved(item) == Some(self.address)
                        || self
                            .deps
                            .nfts
                            .is_approved_for_all(&item.collection, from, &self.address);
                    if !approved {
                        return Err(ResourceError::ItemNotApproved(*item).into());
                    }
                }
                Transfer::ItemOut { item, .. } => {
                    if self.deps.nfts.owner_of(item) != Some(self.address) {
                        return Err(ResourceError::NotItemOwner {
                            item: *item,
                            expected: self.address,
                        }
                        .into());
                    }
                }
            }
        }

        for ((asset, owner), need) in pulls {
            let have = self.deps.tokens.balance_of(&asset, &owner);
            if have < need {
                return Err(ResourceError::InsufficientBalance { asset, owner, have, need }.into());
            }
            let have = self.deps.tokens.allowance(&asset, &owner, &self.address);
            if have < need {
                return Err(ResourceError::InsufficientAllowance { asset, owner, have, need }.into());
            }
        }
        for (asset, need) in pushes {
            let have = self
                .deps
                .tokens
                .balance_of(&asset, &self.address)
                .saturating_add(inflows.get(&asset).copied().unwrap_or(0));
            if have < need {
                return Err(ResourceError::InsufficientVaultBalance { asset, have, need }.into());
            }
        }
        Ok(())
    }

    /// Run transfers, inflows first. Outflows cannot be refused by their
    /// recipient: collateral goes back without a receive hook. If a transfer
    /// still fails, the inflows already taken are returned, newest first.
    fn dispatch(&self, transfers: &[Transfer]) -> Result<(), VaultError> {
        let mut ordered: Vec<&Transfer> = transfers.iter().collect();
        ordered.sort_by_key(|t| !t.is_inflow());

        let mut taken: Vec<&Transfer> = Vec::new();
        for transfer in ordered {
            if let Err(e) = self.apply(transfer) {
                self.unwind(&taken);
                return Err(e.into());
            }
            if transfer.is_inflow() {
                taken.push(transfer);
            }
        }
        Ok(())
    }

    fn apply(&self, transfer: &Transfer) -> Result<(), AssetError> {
        match transfer {
            Transfer::Pull { asset, from, amount } => {
                self.deps
                    .tokens
                    .transfer_from(asset, &self.address, from, &self.address, *amount)
            }
            Transfer::Push { asset, to, amount } => {
                self.deps.tokens.transfer(asset, &self.address, to, *amount)
            }
            Transfer::ItemIn { item, from } => {
                self.deps
                    .nfts
                    .safe_transfer_from(&self.address, from, &self.address, item)
            }
            Transfer::ItemOut { item, to } => {
                self.deps
                    .nfts
                    .transfer_item(&self.address, &self.address, to, item)
            }
        }
    }

    fn unwind(&self, taken: &[&Transfer]) {
        for &transfer in taken.iter().rev() {
            let result = match transfer {
                Transfer::Pull { asset, from, amount } => {
                    self.deps.tokens.transfer(asset, &self.address, from, *amount)
                }
                Transfer::ItemIn { item, from } => {
                    self.deps
                        .nfts
                        .transfer_item(&self.address, &self.address, from, item)
                }
                Transfer::Push { .. } | Transfer::ItemOut { .. } => Ok(()),
            };
            if let Err(e) = result {
                warn!(vault = self.id, ?transfer, error = %e, "failed to return inflow");
            }
        }
    }

    fn publish(&self, events: Vec<VaultEvent>) {
        for event in &events {
            info!(vault = self.id, event = event.name(), "{event:?}");
        }
        self.log.lock().extend(events);
    }

    /// Recompute `who`'s contribution to the open epoch and queue the events.
    fn sync(
        &self,
        state: &mut VaultState,
        out: &mut Outbox,
        who: Address,
        now: Timestamp,
    ) -> Result<(), VaultError> {
        if let Some(update) = state.recompute_contribution(self.deps.curve.as_ref(), who, now)? {
            debug!(
                vault = self.id,
                participant = %who,
                epoch = update.epoch,
                previous = %update.previous,
                contribution = %update.contribution,
                "contribution recomputed"
            );
            Self::emit_update(out, who, update);
        }
        Ok(())
    }

    fn emit_update(out: &mut Outbox, who: Address, update: ContributionUpdate) {
        out.emit(VaultEvent::ContributionUpdated {
            participant: who,
            epoch: update.epoch,
            contribution: update.contribution,
            total_weight: update.total_weight,
        });
        if let Some((participant, cumulative_weight)) = update.new_top {
            out.emit(VaultEvent::NewTopHolder {
                participant,
                cumulative_weight,
            });
        }
    }

    /// Pull `gross` stake from `who`, route the deposit fee and return
    /// `(net, fee)`.
    fn collect_deposit(
        &self,
        state: &VaultState,
        out: &mut Outbox,
        who: Address,
        gross: Amount,
    ) -> Result<(Amount, Amount), VaultError> {
        let stake = self.config.stake_asset;
        out.pull(stake, who, gross);

        let fee = bps_of(gross, state.deposit_fee_bps).ok_or(DecayError::ArithmeticOverflow)?;
        if fee > 0 {
            let (platform, admin_share) = self.deps.fees.deposit_fee_sharing(self.id, fee);
            if platform.checked_add(admin_share) != Some(fee) {
                return Err(ValidationError::FeeSplitMismatch {
                    fee,
                    platform,
                    admin: admin_share,
                }
                .into());
            }
            if platform > 0 {
                out.push(stake, self.deps.fees.fee_beneficiary().ensure_nonzero()?, platform);
            }
            if let Some(admin) = state.roles.holder(Role::Admin) {
                out.push(stake, admin, admin_share);
            }
        }
        Ok((gross - fee, fee))
    }

    /// Pull `spec` from `funder`, take the performance fee and credit the rest
    /// to `epoch_id`.
    fn fund(
        &self,
        state: &mut VaultState,
        out: &mut Outbox,
        funder: Address,
        epoch_id: EpochId,
        spec: &RewardSpec,
    ) -> Result<(), VaultError> {
        spec.asset.ensure_nonzero()?;
        if spec.amount == 0 {
            return Err(ValidationError::ZeroAmount.into());
        }
        let leaderboard_bps = state.epochs.get(epoch_id)?.leaderboard_bps;
        let fee = self.deps.fees.performance_fee(self.id, spec.amount);
        let split = split_funding(spec.asset, spec.amount, fee, leaderboard_bps)?;

        out.pull(spec.asset, funder, spec.amount);
        if split.fee > 0 {
            out.push(spec.asset, self.deps.fees.fee_beneficiary().ensure_nonzero()?, split.fee);
        }
        state.epochs.credit(epoch_id, &split)?;
        out.emit(VaultEvent::RewardsAdded {
            epoch: epoch_id,
            asset: split.asset,
            gross: split.gross,
            fee: split.fee,
            leaderboard: split.leaderboard,
            reward: split.reward,
        });
        Ok(())
    }

    /// Take back the unearned contribution, clear the lock and queue the
    /// principal and collateral back to `who`.
    fn release(
        &self,
        state: &mut VaultState,
        out: &mut Outbox,
        who: Address,
        now: Timestamp,
        emergency: bool,
    ) -> Result<Amount, VaultError> {
        if let Some(update) = state.reduce_contribution(self.deps.curve.as_ref(), who, now)? {
            Self::emit_update(out, who, update);
        }
        let (amount, items) = state.locks.clear_lock(&who)?;
        for item in items {
            out.item_out(item, who);
            out.emit(VaultEvent::CollateralWithdrawn {
                participant: who,
                item,
            });
        }
        out.push(self.config.stake_asset, who, amount);
        out.emit(VaultEvent::Withdrawn {
            participant: who,
            amount,
            emergency,
        });
        Ok(amount)
    }

    // --- participant operations ---

    /// Lock `gross` stake for `duration` seconds. Returns the net amount locked.
    pub fn deposit(&self, caller: Address, gross: Amount, duration: u64) -> Result<Amount, VaultError> {
        self.execute("deposit", |state, out, now| {
            state.ensure_not_paused()?;
            caller.ensure_nonzero()?;
            state.allow_list.require(&caller)?;
            if gross == 0 {
                return Err(ValidationError::ZeroAmount.into());
            }
            let (net, fee) = self.collect_deposit(state, out, caller, gross)?;
            let lock_end = state
                .locks
                .create_lock(caller, net, duration, now, &self.config)?
                .lock_end;
            out.emit(VaultEvent::Deposited {
                participant: caller,
                gross,
                fee,
                net,
                lock_end,
            });
            self.sync(state, out, caller, now)?;
            Ok(net)
        })
    }

    /// Add `extra_gross` stake and/or extend the lock to `new_end`.
    pub fn expand_lock(
        &self,
        caller: Address,
        extra_gross: Amount,
        new_end: Timestamp,
    ) -> Result<(), VaultError> {
        self.execute("expand_lock", |state, out, now| {
            state.ensure_not_paused()?;
            state.allow_list.require(&caller)?;
            let net = if extra_gross > 0 {
                self.collect_deposit(state, out, caller, extra_gross)?.0
            } else {
                0
            };
            let lock = state.locks.expand_lock(
                self.deps.curve.as_ref(),
                caller,
                net,
                new_end,
                now,
                &self.config,
            )?;
            out.emit(VaultEvent::LockExpanded {
                participant: caller,
                added: net,
                amount: lock.amount,
                peak_weight: lock.peak_weight,
                lock_end: lock.lock_end,
            });
            self.sync(state, out, caller, now)
        })
    }

    /// Withdraw principal and collateral once the lock has ended.
    pub fn withdraw(&self, caller: Address) -> Result<Amount, VaultError> {
        self.execute("withdraw", |state, out, now| {
            let lock_end = state.locks.active(&caller)?.lock_end;
            if now < lock_end {
                return Err(StateError::LockNotEnded { lock_end, now }.into());
            }
            self.release(state, out, caller, now, false)
        })
    }

    /// Withdraw regardless of lock end while the vault is in emergency mode.
    pub fn emergency_withdraw(&self, caller: Address) -> Result<Amount, VaultError> {
        self.execute("emergency_withdraw", |state, out, now| {
            if !state.paused {
                return Err(StateError::NotPaused.into());
            }
            if !state.emergency {
                return Err(StateError::EmergencyInactive.into());
            }
            state.locks.active(&caller)?;
            self.release(state, out, caller, now, true)
        })
    }

    /// Lock `item` as boost collateral against the caller's active lock.
    pub fn deposit_collateral(&self, caller: Address, item: CollateralItem) -> Result<(), VaultError> {
        self.execute("deposit_collateral", |state, out, now| {
            state.ensure_not_paused()?;
            state.boosts.ensure_accepts(&item.collection)?;
            state
                .locks
                .attach_collateral(caller, item, self.config.max_collateral_per_lock)?;
            out.item_in(item, caller);
            out.emit(VaultEvent::CollateralDeposited {
                participant: caller,
                item,
            });
            self.sync(state, out, caller, now)
        })
    }

    /// Return `item` to the caller and drop its boost.
    pub fn withdraw_collateral(&self, caller: Address, item: CollateralItem) -> Result<(), VaultError> {
        self.execute("withdraw_collateral", |state, out, now| {
            state.locks.detach_collateral(&caller, &item)?;
            out.item_out(item, caller);
            out.emit(VaultEvent::CollateralWithdrawn {
                participant: caller,
                item,
            });
            if state.locks.active(&caller).is_ok() {
                self.sync(state, out, caller, now)?;
            }
            Ok(())
        })
    }

    /// Register `participant`'s active lock with the open epoch.
    pub fn sync_contribution(&self, participant: Address) -> Result<(), VaultError> {
        self.execute("sync_contribution", |state, out, now| {
            state.ensure_not_paused()?;
            state.locks.active(&participant)?;
            self.sync(state, out, participant, now)
        })
    }

    /// Claim the caller's share of every reward asset in ended epoch `epoch_id`.
    pub fn claim(&self, caller: Address, epoch_id: EpochId) -> Result<Vec<RewardEntry>, VaultError> {
        self.execute("claim", |state, out, now| {
            let payouts = state.settle_claim(&caller, epoch_id, now)?;
            for entry in &payouts {
                out.push(entry.asset, caller, entry.amount);
                out.emit(VaultEvent::Claimed {
                    participant: caller,
                    epoch: epoch_id,
                    asset: entry.asset,
                    amount: entry.amount,
                });
            }
            Ok(payouts)
        })
    }

    /// Claim the whole leaderboard pool of ended epoch `epoch_id`.
    pub fn claim_leaderboard_bonus(
        &self,
        caller: Address,
        epoch_id: EpochId,
    ) -> Result<Vec<RewardEntry>, VaultError> {
        self.execute("claim_leaderboard_bonus", |state, out, now| {
            let payouts = state.settle_leaderboard_bonus(&caller, epoch_id, now)?;
            for entry in &payouts {
                out.push(entry.asset, caller, entry.amount);
                out.emit(VaultEvent::LeaderboardBonusClaimed {
                    participant: caller,
                    epoch: epoch_id,
                    asset: entry.asset,
                    amount: entry.amount,
                });
            }
            Ok(payouts)
        })
    }

    // --- admin operations ---

    /// Open the next epoch, funding it from the admin's balances.
    pub fn open_epoch(
        &self,
        caller: Address,
        specs: &[RewardSpec],
        end_time: Timestamp,
        leaderboard_bps: u64,
    ) -> Result<EpochId, VaultError> {
        self.execute("open_epoch", |state, out, now| {
            state.roles.require(Role::Admin, &caller)?;
            state.ensure_not_paused()?;
            let id = state
                .epochs
                .open_epoch(now, end_time, leaderboard_bps, &self.config)?;
            out.emit(VaultEvent::EpochOpened {
                epoch: id,
                start_time: now,
                end_time,
                leaderboard_bps,
            });
            for spec in specs {
                self.fund(state, out, caller, id, spec)?;
            }
            Ok(id)
        })
    }

    /// Top up the pools of a still-running epoch.
    pub fn add_rewards(
        &self,
        caller: Address,
        epoch_id: EpochId,
        specs: &[RewardSpec],
    ) -> Result<(), VaultError> {
        self.execute("add_rewards", |state, out, now| {
            state.roles.require(Role::Admin, &caller)?;
            state.ensure_not_paused()?;
            if state.epochs.get(epoch_id)?.has_ended(now) {
                return Err(StateError::EpochEnded(epoch_id).into());
            }
            if specs.is_empty() {
                return Err(ValidationError::ZeroAmount.into());
            }
            for spec in specs {
                self.fund(state, out, caller, epoch_id, spec)?;
            }
            Ok(())
        })
    }

    pub fn transfer_admin(&self, caller: Address, new_admin: Address) -> Result<(), VaultError> {
        self.execute("transfer_admin", |state, out, _| {
            state.roles.require(Role::Admin, &caller)?;
            new_admin.ensure_nonzero()?;
            state.roles.grant(Role::Admin, new_admin);
            out.emit(VaultEvent::AdminTransferred {
                previous: caller,
                admin: new_admin,
            });
            Ok(())
        })
    }

    pub fn set_paused(&self, caller: Address, paused: bool) -> Result<(), VaultError> {
        self.execute("set_paused", |state, out, _| {
            state.roles.require(Role::Admin, &caller)?;
            if !paused && state.emergency {
                return Err(StateError::EmergencyActive.into());
            }
            state.paused = paused;
            out.emit(VaultEvent::PauseChanged { paused });
            Ok(())
        })
    }

    /// Irreversibly enable emergency withdrawals. The vault must be paused.
    pub fn activate_emergency(&self, caller: Address) -> Result<(), VaultError> {
        self.execute("activate_emergency", |state, out, _| {
            state.roles.require(Role::Admin, &caller)?;
            if !state.paused {
                return Err(StateError::NotPaused.into());
            }
            if state.emergency {
                return Err(StateError::EmergencyActive.into());
            }
            state.emergency = true;
            out.emit(VaultEvent::EmergencyActivated);
            Ok(())
        })
    }

    pub fn set_deposit_fee(&self, caller: Address, bps: u64) -> Result<(), VaultError> {
        self.execute("set_deposit_fee", |state, out, _| {
            state.roles.require(Role::Admin, &caller)?;
            let tier = self
                .deps
                .fees
                .tier_config(self.id)
                .ok_or(StateError::TierNotFound(state.tier))?;
            if !tier.can_adjust_deposit_fee {
                return Err(StateError::DepositFeeFixed.into());
            }
            if !tier.allows_deposit_fee(bps) || bps > MAX_DEPOSIT_FEE_BPS {
                return Err(ValidationError::DepositFeeOutOfBounds {
                    bps,
                    min: tier.min_deposit_fee_bps,
                    max: tier.max_deposit_fee_bps.min(MAX_DEPOSIT_FEE_BPS),
                }
                .into());
            }
            state.deposit_fee_bps = bps;
            out.emit(VaultEvent::DepositFeeUpdated { deposit_fee_bps: bps });
            Ok(())
        })
    }

    /// Factory hook: move the vault to `tier` and clamp the deposit fee.
    /// Move the vault to `tier` and clamp its deposit fee to the tier's bounds.
    ///
    /// The factory assigns the tier on its side first; a `tier` that differs
    /// from that assignment is rejected.
    pub fn update_tier(&self, caller: Address, tier: TierId) -> Result<(), VaultError> {
        self.execute("update_tier", |state, out, _| {
            state.roles.require(Role::Factory, &caller)?;
            let assigned = self.deps.fees.assigned_tier(self.id);
            if assigned != tier {
                return Err(StateError::TierNotAssigned { requested: tier, assigned }.into());
            }
            let config = self
                .deps
                .fees
                .tier_config(self.id)
                .ok_or(StateError::TierNotFound(tier))?;
            state.tier = tier;
            state.deposit_fee_bps = config
                .clamp_deposit_fee(state.deposit_fee_bps)
                .min(MAX_DEPOSIT_FEE_BPS);
            out.emit(VaultEvent::TierUpdated {
                tier,
                deposit_fee_bps: state.deposit_fee_bps,
            });
            Ok(())
        })
    }

    pub fn set_allow_list_active(&self, caller: Address, active: bool) -> Result<(), VaultError> {
        self.execute("set_allow_list_active", |state, out, _| {
            state.roles.require(Role::Admin, &caller)?;
            state.allow_list.set_active(active);
            out.emit(VaultEvent::AllowListToggled { active });
            Ok(())
        })
    }

    pub fn set_allowed(
        &self,
        caller: Address,
        participants: &[Address],
        allowed: bool,
    ) -> Result<(), VaultError> {
        self.execute("set_allowed", |state, out, _| {
            state.roles.require(Role::Admin, &caller)?;
            for participant in participants {
                participant.ensure_nonzero()?;
                state.allow_list.set(*participant, allowed);
                out.emit(VaultEvent::AllowListUpdated {
                    participant: *participant,
                    allowed,
                });
            }
            Ok(())
        })
    }

    pub fn set_nft_requirement(
        &self,
        caller: Address,
        collection: CollectionId,
        requirement: NftRequirement,
    ) -> Result<(), VaultError> {
        self.execute("set_nft_requirement", |state, out, _| {
            state.roles.require(Role::Admin, &caller)?;
            state
                .boosts
                .set_requirement(collection, requirement, self.config.max_boost_bps)?;
            out.emit(VaultEvent::NftRequirementSet {
                collection,
                requirement,
            });
            Ok(())
        })
    }

    /// Activate requirements for several collections at once.
    pub fn set_nft_requirements(
        &self,
        caller: Address,
        collections: &[CollectionId],
        required_counts: &[u32],
        boosts_bps: &[u64],
    ) -> Result<(), VaultError> {
        self.execute("set_nft_requirements", |state, out, _| {
            state.roles.require(Role::Admin, &caller)?;
            for other in [required_counts.len(), boosts_bps.len()] {
                if other != collections.len() {
                    return Err(ValidationError::LengthMismatch {
                        left: collections.len(),
                        right: other,
                    }
                    .into());
                }
            }
            for ((collection, count), bps) in collections.iter().zip(required_counts).zip(boosts_bps) {
                let requirement = NftRequirement::active(*count, *bps);
                state
                    .boosts
                    .set_requirement(*collection, requirement, self.config.max_boost_bps)?;
                out.emit(VaultEvent::NftRequirementSet {
                    collection: *collection,
                    requirement,
                });
            }
            Ok(())
        })
    }

    // --- reads ---

    pub fn lock_snapshot(&self, participant: &Address) -> Option<LockSnapshot> {
        let now = self.deps.clock.now();
        let state = self.state.lock();
        let lock = state.locks.get(participant)?;
        let power = self.deps.curve.weight_at(&lock.window(), now);
        Some(LockSnapshot::new(*participant, lock, power))
    }

    pub fn epoch_snapshot(&self, epoch_id: EpochId) -> Result<EpochSnapshot, VaultError> {
        let now = self.deps.clock.now();
        let state = self.state.lock();
        let epoch = state.epochs.get(epoch_id)?;
        Ok(EpochSnapshot::new(epoch_id, epoch, now))
    }

    pub fn leaderboard_snapshot(&self) -> LeaderboardSnapshot {
        let state = self.state.lock();
        LeaderboardSnapshot {
            top_holder: state.leaderboard.top_holder(),
            top_holder_cumulative_weight: state.leaderboard.top_weight(),
        }
    }

    pub fn cumulative_weight(&self, participant: &Address) -> Amount {
        self.state.lock().leaderboard.cumulative(participant)
    }

    /// Current decayed weight of `participant`'s lock.
    pub fn voting_power(&self, participant: &Address) -> Amount {
        let now = self.deps.clock.now();
        let state = self.state.lock();
        state
            .locks
            .get(participant)
            .map(|lock| self.deps.curve.weight_at(&lock.window(), now))
            .unwrap_or(0)
    }

    pub fn epoch_contribution(&self, participant: &Address, epoch_id: EpochId) -> Amount {
        self.state.lock().contribution(participant, epoch_id)
    }

    /// Sum of all stored contributions to `epoch_id`.
    pub fn contribution_sum(&self, epoch_id: EpochId) -> Amount {
        self.state.lock().contribution_sum(epoch_id)
    }

    pub fn qualifies_for_boost(&self, participant: &Address, collection: &CollectionId) -> bool {
        let state = self.state.lock();
        state
            .locks
            .get(participant)
            .is_some_and(|lock| state.boosts.qualifies(&lock.locked_collateral, collection))
    }

    /// Total boost in basis points from `participant`'s collateral.
    pub fn boost_bps(&self, participant: &Address) -> u64 {
        let state = self.state.lock();
        state
            .locks
            .get(participant)
            .map(|lock| state.boosts.total_boost(&lock.locked_collateral))
            .unwrap_or(0)
    }

    /// The epoch accepting contributions right now, if any.
    pub fn current_epoch(&self) -> Option<EpochId> {
        let now = self.deps.clock.now();
        self.state.lock().epochs.open_at(now).map(|(id, _)| id)
    }

    pub fn epoch_count(&self) -> u64 {
        self.state.lock().epochs.len() as u64
    }

    pub fn total_locked(&self) -> Amount {
        self.state.lock().locks.total_locked()
    }

    pub fn admin(&self) -> Option<Address> {
        self.state.lock().roles.holder(Role::Admin)
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().is_paused()
    }

    pub fn is_emergency(&self) -> bool {
        self.state.lock().is_emergency()
    }

    pub fn deposit_fee_bps(&self) -> u64 {
        self.state.lock().deposit_fee_bps()
    }

    pub fn tier(&self) -> TierId {
        self.state.lock().tier()
    }

    pub fn is_allowed(&self, participant: &Address) -> bool {
        self.state.lock().allow_list.permits(participant)
    }

    /// Events published so far, oldest first.
    pub fn events(&self) -> Vec<VaultEvent> {
        self.log.lock().clone()
    }

    pub fn drain_events(&self) -> Vec<VaultEvent> {
        std::mem::take(&mut *self.log.lock())
    }

    /// Copy of the committed state.
    pub fn state(&self) -> VaultState {
        self.state.lock().clone()
    }

    // --- persistence ---

    pub fn export_state(&self) -> Result<Vec<u8>, VaultError> {
        let state = self.state.lock();
        bincode::encode_to_vec(
            (STATE_FORMAT_VERSION, self.id, self.address, &*state),
            bincode::config::standard(),
        )
        .map_err(|e| VaultError::Codec(e.to_string()))
    }

    /// Rebuild a vault from [`export_state`](Self::export_state) bytes.
    pub fn restore(bytes: &[u8], config: VaultConfig, deps: VaultDeps) -> Result<Self, VaultError> {
        config.validate()?;
        let ((version, id, address, state), _): ((u8, VaultId, Address, VaultState), usize) =
            bincode::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| VaultError::Codec(e.to_string()))?;
        if version != STATE_FORMAT_VERSION {
            return Err(VaultError::Codec(format!("unsupported state version {version}")));
        }
        info!(vault = id, address = %address, epochs = state.epochs.len(), "vault restored");
        Ok(Self::from_state(id, address, config, deps, state))
    }
}

impl NftReceiver for Vault {
    /// Accept items only when they arrive through the vault's own collateral
    /// deposit.
    fn on_nft_received(&self, operator: &Address, _from: &Address, _item: &CollateralItem) -> [u8; 4] {
        if *operator == self.address && self.guard.is_entered() {
            NFT_RECEIVED_SELECTOR
        } else {
            [0u8; 4]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ebb_core::types::TierConfig;
    use ebb_core::{ManualClock, MemoryAssets, MemoryFactory};

    const DAY: u64 = 86_400;
    const T0: u64 = 1_000_000;

    struct Fixture {
        vault: Arc<Vault>,
        assets: Arc<MemoryAssets>,
        factory: Arc<MemoryFactory>,
        clock: Arc<ManualClock>,
    }

    fn stake() -> AssetId {
        Address::repeat_byte(0x5A)
    }

    fn reward() -> AssetId {
        Address::repeat_byte(0x7E)
    }

    fn admin() -> Address {
        Address::repeat_byte(0xAD)
    }

    fn factory_addr() -> Address {
        Address::repeat_byte(0xFA)
    }

    fn beneficiary() -> Address {
        Address::repeat_byte(0xBE)
    }

    fn vault_addr() -> Address {
        Address::repeat_byte(0x99)
    }

    fn alice() -> Address {
        Address::repeat_byte(1)
    }

    fn fixture_with_tier(tier: TierConfig) -> Fixture {
        let assets = Arc::new(MemoryAssets::new());
        let factory = Arc::new(MemoryFactory::new(beneficiary(), tier));
        let clock = Arc::new(ManualClock::new(T0));
        let deps = VaultDeps::new(factory.clone(), assets.clone(), assets.clone(), clock.clone());
        let config = VaultConfig {
            min_deposit: 1,
            ..VaultConfig::for_asset(stake())
        };
        let params = VaultParams {
            id: 1,
            address: vault_addr(),
            admin: admin(),
            factory: factory_addr(),
            tier: 0,
        };
        let vault = Arc::new(Vault::new(params, config, deps).unwrap());
        assets.register_receiver(vault_addr(), vault.clone());
        Fixture {
            vault,
            assets,
            factory,
            clock,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_tier(TierConfig::default())
    }

    fn fund(f: &Fixture, who: Address, asset: AssetId, amount: Amount) {
        f.assets.mint(&asset, &who, amount).unwrap();
        f.assets.approve(&asset, &who, &vault_addr(), amount);
    }

    // --- deposit ---

    #[test]
    fn deposit_moves_stake_and_logs() {
        let f = fixture();
        fund(&f, alice(), stake(), 1_000);
        let net = f.vault.deposit(alice(), 1_000, 30 * DAY).unwrap();
        assert_eq!(net, 1_000);
        assert_eq!(f.assets.balance_of(&stake(), &vault_addr()), 1_000);
        assert_eq!(f.vault.total_locked(), 1_000);
        assert_eq!(f.vault.voting_power(&alice()), 1_000);
        assert!(matches!(
            f.vault.events().last(),
            Some(VaultEvent::Deposited { net: 1_000, .. })
        ));
    }

    #[test]
    fn failed_deposit_leaves_no_trace() {
        let f = fixture();
        f.assets.mint(&stake(), &alice(), 1_000).unwrap();
        let err = f.vault.deposit(alice(), 1_000, 30 * DAY).unwrap_err();
        assert_eq!(err.code(), "E_INSUFFICIENT_ALLOWANCE");
        assert!(f.vault.lock_snapshot(&alice()).is_none());
        assert_eq!(f.assets.balance_of(&stake(), &alice()), 1_000);
        assert!(f.vault.events().is_empty());
    }

    #[test]
    fn deposit_fee_is_split() {
        let f = fixture_with_tier(TierConfig {
            min_deposit_fee_bps: 100,
            max_deposit_fee_bps: 500,
            can_adjust_deposit_fee: true,
            platform_fee_share_bps: 5_000,
            ..TierConfig::default()
        });
        assert_eq!(f.vault.deposit_fee_bps(), 100);
        f.vault.set_deposit_fee(admin(), 200).unwrap();
        fund(&f, alice(), stake(), 10_000);

        let net = f.vault.deposit(alice(), 10_000, 30 * DAY).unwrap();
        assert_eq!(net, 9_800);
        assert_eq!(f.assets.balance_of(&stake(), &beneficiary()), 100);
        assert_eq!(f.assets.balance_of(&stake(), &admin()), 100);
        assert_eq!(f.assets.balance_of(&stake(), &vault_addr()), 9_800);
    }

    #[test]
    fn deposit_fee_bounds() {
        let f = fixture();
        assert_eq!(
            f.vault.set_deposit_fee(admin(), 0).unwrap_err(),
            StateError::DepositFeeFixed.into()
        );

        f.factory.set_tier(
            0,
            TierConfig {
                max_deposit_fee_bps: 300,
                can_adjust_deposit_fee: true,
                ..TierConfig::default()
            },
        );
        assert_eq!(f.vault.set_deposit_fee(admin(), 301).unwrap_err().code(), "E_DEPOSIT_FEE_BOUNDS");
        assert_eq!(f.vault.set_deposit_fee(alice(), 10).unwrap_err().code(), "E_NOT_ADMIN");
    }

    #[test]
    fn update_tier_clamps_fee() {
        let f = fixture_with_tier(TierConfig {
            min_deposit_fee_bps: 400,
            max_deposit_fee_bps: 500,
            can_adjust_deposit_fee: true,
            ..TierConfig::default()
        });
        f.factory.set_tier(
            2,
            TierConfig {
                max_deposit_fee_bps: 100,
                ..TierConfig::default()
            },
        );
        f.factory.assign(1, 2);
        assert_eq!(f.vault.update_tier(admin(), 2).unwrap_err().code(), "E_NOT_FACTORY");
        f.vault.update_tier(factory_addr(), 2).unwrap();
        assert_eq!(f.vault.tier(), 2);
        assert_eq!(f.vault.deposit_fee_bps(), 100);
    }

    #[test]
    fn update_tier_must_match_factory_assignment() {
        let f = fixture_with_tier(TierConfig {
            min_deposit_fee_bps: 400,
            max_deposit_fee_bps: 500,
            can_adjust_deposit_fee: true,
            ..TierConfig::default()
        });
        f.factory.set_tier(
            3,
            TierConfig {
                max_deposit_fee_bps: 100,
                ..TierConfig::default()
            },
        );
        let fee = f.vault.deposit_fee_bps();
        let err = f.vault.update_tier(factory_addr(), 3).unwrap_err();
        assert_eq!(err.code(), "E_TIER_NOT_ASSIGNED");
        assert_eq!(f.vault.tier(), 0);
        assert_eq!(f.vault.deposit_fee_bps(), fee);

        f.factory.assign(1, 3);
        f.vault.update_tier(factory_addr(), 3).unwrap();
        assert_eq!(f.vault.deposit_fee_bps(), 100);
    }

    #[test]
    fn update_tier_names_missing_tier() {
        let f = fixture();
        f.factory.assign(1, 9);
        let err = f.vault.update_tier(factory_addr(), 9).unwrap_err();
        assert_eq!(err, VaultError::State(StateError::TierNotFound(9)));
    }

    #[test]
    fn allow_list_gates_deposits() {
        let f = fixture();
        fund(&f, alice(), stake(), 1_000);
        f.vault.set_allow_list_active(admin(), true).unwrap();
        assert_eq!(
            f.vault.deposit(alice(), 1_000, 30 * DAY).unwrap_err().code(),
            "E_NOT_ALLOWED"
        );
        f.vault.set_allowed(admin(), &[alice()], true).unwrap();
        assert!(f.vault.deposit(alice(), 1_000, 30 * DAY).is_ok());
    }

    // --- withdraw ---

    #[test]
    fn withdraw_waits_for_lock_end() {
        let f = fixture();
        fund(&f, alice(), stake(), 1_000);
        f.vault.deposit(alice(), 1_000, 30 * DAY).unwrap();
        assert_eq!(
            f.vault.withdraw(alice()).unwrap_err().code(),
            "E_LOCK_NOT_ENDED"
        );
        f.clock.advance(30 * DAY);
        assert_eq!(f.vault.withdraw(alice()).unwrap(), 1_000);
        assert_eq!(f.assets.balance_of(&stake(), &alice()), 1_000);
        assert_eq!(f.vault.total_locked(), 0);
        assert_eq!(f.vault.withdraw(alice()).unwrap_err().code(), "E_NO_LOCK");
    }

    // --- pause and emergency ---

    #[test]
    fn pause_blocks_entries_but_not_exits() {
        let f = fixture();
        fund(&f, alice(), stake(), 2_000);
        f.vault.deposit(alice(), 1_000, 30 * DAY).unwrap();
        f.vault.set_paused(admin(), true).unwrap();
        assert_eq!(f.vault.deposit(alice(), 1_000, 30 * DAY).unwrap_err().code(), "E_PAUSED");
        assert_eq!(
            f.vault.open_epoch(admin(), &[], T0 + 7 * DAY, 0).unwrap_err().code(),
            "E_PAUSED"
        );
        f.clock.advance(30 * DAY);
        assert!(f.vault.withdraw(alice()).is_ok());
    }

    #[test]
    fn emergency_flow() {
        let f = fixture();
        fund(&f, alice(), stake(), 1_000);
        f.vault.deposit(alice(), 1_000, 30 * DAY).unwrap();

        assert_eq!(f.vault.activate_emergency(admin()).unwrap_err().code(), "E_NOT_PAUSED");
        assert_eq!(f.vault.emergency_withdraw(alice()).unwrap_err().code(), "E_NOT_PAUSED");
        f.vault.set_paused(admin(), true).unwrap();
        assert_eq!(
            f.vault.emergency_withdraw(alice()).unwrap_err().code(),
            "E_EMERGENCY_INACTIVE"
        );
        f.vault.activate_emergency(admin()).unwrap();
        assert_eq!(
            f.vault.set_paused(admin(), false).unwrap_err().code(),
            "E_EMERGENCY_ACTIVE"
        );
        assert_eq!(f.vault.emergency_withdraw(alice()).unwrap(), 1_000);
        assert!(matches!(
            f.vault.events().last(),
            Some(VaultEvent::Withdrawn { emergency: true, .. })
        ));
    }

    // --- admin ---

    #[test]
    fn admin_transfer() {
        let f = fixture();
        assert_eq!(
            f.vault.transfer_admin(admin(), Address::ZERO).unwrap_err().code(),
            "E_ZERO_ADDRESS"
        );
        f.vault.transfer_admin(admin(), alice()).unwrap();
        assert_eq!(f.vault.admin(), Some(alice()));
        assert_eq!(f.vault.set_paused(admin(), true).unwrap_err().code(), "E_NOT_ADMIN");
    }

    #[test]
    fn batch_requirements_check_lengths() {
        let f = fixture();
        let collection = Address::repeat_byte(0xC0);
        assert_eq!(
            f.vault
                .set_nft_requirements(admin(), &[collection], &[1, 2], &[100])
                .unwrap_err()
                .code(),
            "E_LENGTH_MISMATCH"
        );
        f.vault
            .set_nft_requirements(admin(), &[collection], &[1], &[100])
            .unwrap();
    }

    // --- epochs ---

    #[test]
    fn open_epoch_funds_pools_and_fee() {
        let f = fixture_with_tier(TierConfig {
            performance_fee_bps: 1_000,
            ..TierConfig::default()
        });
        fund(&f, admin(), reward(), 10_000);
        let id = f
            .vault
            .open_epoch(admin(), &[RewardSpec::new(reward(), 10_000)], T0 + 7 * DAY, 2_000)
            .unwrap();
        assert_eq!(id, 0);
        let snap = f.vault.epoch_snapshot(0).unwrap();
        assert_eq!(snap.reward_pool, vec![RewardEntry { asset: reward(), amount: 7_200 }]);
        assert_eq!(snap.leaderboard_pool, vec![RewardEntry { asset: reward(), amount: 1_800 }]);
        assert_eq!(f.assets.balance_of(&reward(), &beneficiary()), 1_000);
        assert_eq!(f.assets.balance_of(&reward(), &vault_addr()), 9_000);
        assert_eq!(f.vault.current_epoch(), Some(0));
        assert_eq!(f.vault.epoch_count(), 1);
    }

    #[test]
    fn add_rewards_only_while_running() {
        let f = fixture();
        fund(&f, admin(), reward(), 300);
        f.vault
            .open_epoch(admin(), &[RewardSpec::new(reward(), 100)], T0 + 7 * DAY, 0)
            .unwrap();
        f.vault
            .add_rewards(admin(), 0, &[RewardSpec::new(reward(), 100)])
            .unwrap();
        assert_eq!(f.vault.epoch_snapshot(0).unwrap().reward_pool[0].amount, 200);
        f.clock.advance(7 * DAY);
        assert_eq!(
            f.vault
                .add_rewards(admin(), 0, &[RewardSpec::new(reward(), 100)])
                .unwrap_err()
                .code(),
            "E_EPOCH_ENDED"
        );
    }

    // --- persistence ---

    #[test]
    fn export_restore_round_trip() {
        let f = fixture();
        fund(&f, alice(), stake(), 1_000);
        f.vault.deposit(alice(), 1_000, 30 * DAY).unwrap();
        let bytes = f.vault.export_state().unwrap();

        let deps = VaultDeps::new(f.factory.clone(), f.assets.clone(), f.assets.clone(), f.clock.clone());
        let restored = Vault::restore(&bytes, f.vault.config().clone(), deps).unwrap();
        assert_eq!(restored.id(), 1);
        assert_eq!(restored.address(), vault_addr());
        assert_eq!(restored.lock_snapshot(&alice()), f.vault.lock_snapshot(&alice()));
        assert_eq!(restored.total_locked(), 1_000);
        assert_eq!(restored.admin(), Some(admin()));
    }

    #[test]
    fn restore_rejects_garbage() {
        let f = fixture();
        let deps = VaultDeps::new(f.factory.clone(), f.assets.clone(), f.assets.clone(), f.clock.clone());
        let err = Vault::restore(&[0xFF, 0x00], f.vault.config().clone(), deps).unwrap_err();
        assert_eq!(err.code(), "E_CODEC");
    }

    // --- receive hook ---

    #[test]
    fn stray_items_are_refused() {
        let f = fixture();
        let item = CollateralItem::new(Address::repeat_byte(0xC0), 1);
        assert_eq!(f.vault.on_nft_received(&alice(), &alice(), &item), [0u8; 4]);
    }
}
