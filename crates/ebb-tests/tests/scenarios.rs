//! End-to-end lifecycle scenarios.
//!
//! Each test builds a fresh vault on in-memory collaborators and walks a
//! complete lock → epoch → claim cycle, checking balances as well as the
//! vault's own bookkeeping.

use std::io::Write;

use ebb_core::traits::DecayCurve;
use ebb_core::types::{LockWindow, TierConfig};
use ebb_core::constants::UNIT;
use ebb_decay::LinearDecay;
use ebb_tests::helpers::*;
use ebb_vault::{NftRequirement, Vault, VaultConfig, VaultEvent};

fn alice() -> ebb_core::types::Address {
    addr(1)
}

fn bob() -> ebb_core::types::Address {
    addr(2)
}

// ---------------------------------------------------------------------------
// Basic settlement
// ---------------------------------------------------------------------------

#[test]
fn sole_participant_takes_whole_pool() {
    let h = Harness::new();
    let epoch = h.open_epoch(100, 10, 0);
    h.deposit(alice(), 1_000, 10);

    assert_eq!(h.vault.epoch_contribution(&alice(), epoch), 5_000);
    assert_eq!(h.vault.epoch_snapshot(epoch).unwrap().total_weight, 5_000);

    h.advance(10);
    assert_eq!(h.claim_amount(alice(), epoch), 100);
    assert_eq!(h.balance(reward_token(), alice()), 100);

    let err = h.vault.claim(alice(), epoch).unwrap_err();
    assert_eq!(err.code(), "E_NOTHING_TO_CLAIM");
    assert_eq!(h.balance(reward_token(), alice()), 100);
}

#[test]
fn equal_participants_split_evenly() {
    let h = Harness::new();
    let epoch = h.open_epoch(100, 10, 0);
    h.deposit(alice(), 1_000, 10);
    h.deposit(bob(), 1_000, 10);
    h.advance(10);

    assert_eq!(h.claim_amount(alice(), epoch), 50);
    assert_eq!(h.claim_amount(bob(), epoch), 50);
}

#[test]
fn uneven_pool_leaves_dust_in_vault() {
    let h = Harness::new();
    let epoch = h.open_epoch(100, 10, 0);
    for seed in 1..=3 {
        h.deposit(addr(seed), 1_000, 10);
    }
    h.advance(10);

    let paid: u128 = (1..=3).map(|seed| h.claim_amount(addr(seed), epoch)).sum();
    assert_eq!(paid, 99);
    assert_eq!(h.balance(reward_token(), vault_account()), 1);
}

#[test]
fn withdrawal_before_epoch_yields_nothing() {
    let h = Harness::new();
    h.deposit(alice(), 1_000, 10);
    h.advance(10);
    assert_eq!(h.vault.withdraw(alice()).unwrap(), 1_000);
    assert_eq!(h.balance(stake(), alice()), 1_000);

    let epoch = h.open_epoch(100, 10, 0);
    assert_eq!(
        h.vault.sync_contribution(alice()).unwrap_err().code(),
        "E_NO_LOCK"
    );
    h.advance(10);
    assert_eq!(h.vault.epoch_contribution(&alice(), epoch), 0);
    assert_eq!(
        h.vault.claim(alice(), epoch).unwrap_err().code(),
        "E_NOTHING_TO_CLAIM"
    );
}

#[test]
fn minimum_lock_has_weight_until_end() {
    let h = Harness::with(TierConfig::default(), VaultConfig::for_asset(stake()));
    let config = h.vault.config().clone();
    let epoch = h.open_epoch(UNIT, config.min_lock_duration, 0);
    h.deposit(alice(), config.min_deposit, config.min_lock_duration);

    assert_eq!(h.vault.voting_power(&alice()), config.min_deposit);
    assert!(h.vault.epoch_contribution(&alice(), epoch) > 0);

    h.advance(config.min_lock_duration / 2);
    assert!(h.vault.voting_power(&alice()) > 0);
    h.advance(config.min_lock_duration);
    assert_eq!(h.vault.voting_power(&alice()), 0);
}

// ---------------------------------------------------------------------------
// Lock lifecycle
// ---------------------------------------------------------------------------

#[test]
fn lock_created_before_epoch_registers_on_sync() {
    let h = Harness::new();
    h.deposit(alice(), 1_000, 100);
    h.advance(10);
    let epoch = h.open_epoch(100, 10, 0);
    assert_eq!(h.vault.epoch_contribution(&alice(), epoch), 0);

    h.vault.sync_contribution(alice()).unwrap();
    // Weights 900 → 800 across the epoch.
    assert_eq!(h.vault.epoch_contribution(&alice(), epoch), 8_500);
    let snapshot = h.vault.lock_snapshot(&alice()).unwrap();
    assert_eq!(snapshot.pending_epochs, vec![epoch]);
}

#[test]
fn expand_rebases_weight() {
    let h = Harness::new();
    h.deposit(alice(), 1_000, 10 * DAY);
    h.advance(5 * DAY);

    h.fund(alice(), stake(), 500);
    let new_end = h.now() + 20 * DAY;
    h.vault.expand_lock(alice(), 500, new_end).unwrap();

    let lock = h.vault.lock_snapshot(&alice()).unwrap();
    assert_eq!(lock.amount, 1_500);
    assert_eq!(lock.peak_weight, 1_000);
    assert_eq!(lock.lock_start, h.now());
    assert_eq!(lock.lock_end, new_end);
    assert_eq!(h.vault.voting_power(&alice()), 1_000);
    assert_eq!(h.vault.total_locked(), 1_500);

    let expected = LinearDecay.weight_at(
        &LockWindow {
            amount: 1_500,
            peak_weight: 1_000,
            start: lock.lock_start,
            end: new_end,
        },
        h.advance(10 * DAY),
    );
    assert_eq!(h.vault.voting_power(&alice()), expected);
    assert_eq!(expected, 500);
}

#[test]
fn extension_only_keeps_principal() {
    let h = Harness::new();
    h.deposit(alice(), 1_000, 10 * DAY);
    let new_end = h.now() + 30 * DAY;
    h.vault.expand_lock(alice(), 0, new_end).unwrap();
    let lock = h.vault.lock_snapshot(&alice()).unwrap();
    assert_eq!(lock.amount, 1_000);
    assert_eq!(lock.lock_end, new_end);

    assert_eq!(
        h.vault.expand_lock(alice(), 0, new_end).unwrap_err().code(),
        "E_EMPTY_EXPANSION"
    );
}

#[test]
fn withdrawal_after_lock_end_keeps_contribution() {
    let h = Harness::new();
    let epoch = h.open_epoch(100, 20, 0);
    h.deposit(alice(), 1_000, 10);
    h.advance(10);
    h.vault.withdraw(alice()).unwrap();
    assert_eq!(h.vault.epoch_contribution(&alice(), epoch), 5_000);

    h.advance(10);
    assert_eq!(h.claim_amount(alice(), epoch), 100);
}

#[test]
fn relock_after_withdrawal() {
    let h = Harness::new();
    h.deposit(alice(), 1_000, 10);
    h.advance(10);
    h.vault.withdraw(alice()).unwrap();
    h.deposit(alice(), 400, 10);
    assert_eq!(h.vault.lock_snapshot(&alice()).unwrap().amount, 400);
    assert_eq!(h.vault.total_locked(), 400);
}

// ---------------------------------------------------------------------------
// Boosts and leaderboard
// ---------------------------------------------------------------------------

#[test]
fn collateral_boost_raises_share() {
    let h = Harness::new();
    h.vault
        .set_nft_requirement(admin(), collection(), NftRequirement::active(1, 10_000))
        .unwrap();
    let epoch = h.open_epoch(300, 10, 0);

    h.deposit(alice(), 1_000, 10);
    let nft = h.give_item(alice(), 1);
    h.vault.deposit_collateral(alice(), nft).unwrap();
    h.deposit(bob(), 1_000, 10);

    assert_eq!(h.owner_of(&nft), Some(vault_account()));
    assert!(h.vault.qualifies_for_boost(&alice(), &collection()));
    assert!(!h.vault.qualifies_for_boost(&bob(), &collection()));
    assert_eq!(h.vault.boost_bps(&alice()), 10_000);
    assert_eq!(h.vault.epoch_contribution(&alice(), epoch), 10_000);

    h.advance(10);
    assert_eq!(h.claim_amount(alice(), epoch), 200);
    assert_eq!(h.claim_amount(bob(), epoch), 100);

    h.vault.withdraw(alice()).unwrap();
    assert_eq!(h.owner_of(&nft), Some(alice()));
}

#[test]
fn withdrawing_collateral_drops_boost() {
    let h = Harness::new();
    h.vault
        .set_nft_requirement(admin(), collection(), NftRequirement::active(1, 5_000))
        .unwrap();
    let epoch = h.open_epoch(100, 10, 0);
    h.deposit(alice(), 1_000, 10);
    let nft = h.give_item(alice(), 3);
    h.vault.deposit_collateral(alice(), nft).unwrap();
    assert_eq!(h.vault.epoch_contribution(&alice(), epoch), 7_500);

    h.vault.withdraw_collateral(alice(), nft).unwrap();
    assert_eq!(h.vault.epoch_contribution(&alice(), epoch), 5_000);
    assert_eq!(h.vault.epoch_snapshot(epoch).unwrap().total_weight, 5_000);
    assert_eq!(h.owner_of(&nft), Some(alice()));
}

#[test]
fn top_holder_claims_leaderboard_bonus() {
    let h = Harness::new();
    let epoch = h.open_epoch(1_000, 10, 1_000);
    h.deposit(bob(), 1_000, 10);
    h.deposit(alice(), 2_000, 10);

    let board = h.vault.leaderboard_snapshot();
    assert_eq!(board.top_holder, Some(alice()));
    assert_eq!(board.top_holder_cumulative_weight, 10_000);
    assert!(h.vault.events().iter().any(|e| matches!(
        e,
        VaultEvent::NewTopHolder { participant, .. } if *participant == alice()
    )));

    h.advance(10);
    assert_eq!(
        h.vault.claim_leaderboard_bonus(bob(), epoch).unwrap_err().code(),
        "E_NOT_TOP_HOLDER"
    );
    let bonus = h.vault.claim_leaderboard_bonus(alice(), epoch).unwrap();
    assert_eq!(bonus[0].amount, 100);
    assert_eq!(
        h.vault.claim_leaderboard_bonus(alice(), epoch).unwrap_err().code(),
        "E_LEADERBOARD_CLAIMED"
    );

    assert_eq!(h.claim_amount(alice(), epoch), 600);
    assert_eq!(h.claim_amount(bob(), epoch), 300);
    assert_eq!(h.balance(reward_token(), vault_account()), 0);
}

#[test]
fn leaderboard_accumulates_across_epochs() {
    let h = Harness::new();
    h.open_epoch(0, 10, 0);
    h.deposit(alice(), 1_000, 10);
    h.advance(10);
    h.vault.withdraw(alice()).unwrap();

    h.open_epoch(0, 10, 0);
    h.deposit(bob(), 1_500, 10);
    assert_eq!(h.vault.leaderboard_snapshot().top_holder, Some(bob()));

    h.deposit(alice(), 1_000, 10);
    assert_eq!(h.vault.cumulative_weight(&alice()), 10_000);
    assert_eq!(h.vault.leaderboard_snapshot().top_holder, Some(alice()));
}

// ---------------------------------------------------------------------------
// Fees
// ---------------------------------------------------------------------------

#[test]
fn performance_fee_and_carve_out_conserve_gross() {
    let tier = TierConfig {
        performance_fee_bps: 1_000,
        ..TierConfig::default()
    };
    let h = Harness::with(tier, relaxed_config());
    let epoch = h.open_epoch(10_000, 10, 2_000);

    let snapshot = h.vault.epoch_snapshot(epoch).unwrap();
    let reward = snapshot.reward_pool[0].amount;
    let leaderboard = snapshot.leaderboard_pool[0].amount;
    let fee = h.balance(reward_token(), beneficiary());
    assert_eq!((fee, leaderboard, reward), (1_000, 1_800, 7_200));
    assert_eq!(reward + leaderboard + fee, 10_000);
    assert_eq!(h.balance(reward_token(), vault_account()), reward + leaderboard);
}

#[test]
fn deposit_fee_split_conserves_gross() {
    let tier = TierConfig {
        min_deposit_fee_bps: 100,
        max_deposit_fee_bps: 100,
        platform_fee_share_bps: 2_500,
        ..TierConfig::default()
    };
    let h = Harness::with(tier, relaxed_config());
    let net = h.deposit(alice(), 10_000, 10);

    assert_eq!(net, 9_900);
    assert_eq!(h.balance(stake(), beneficiary()), 25);
    assert_eq!(h.balance(stake(), admin()), 75);
    assert_eq!(h.balance(stake(), vault_account()), 9_900);
    assert_eq!(h.vault.total_locked(), 9_900);
}

// ---------------------------------------------------------------------------
// Emergency
// ---------------------------------------------------------------------------

#[test]
fn emergency_exit_keeps_earned_part() {
    let h = Harness::new();
    let epoch = h.open_epoch(875, 10, 0);
    h.deposit(alice(), 1_000, 10);
    h.deposit(bob(), 1_000, 10);
    h.advance(5);

    h.vault.set_paused(admin(), true).unwrap();
    h.vault.activate_emergency(admin()).unwrap();
    assert_eq!(h.vault.emergency_withdraw(alice()).unwrap(), 1_000);
    assert_eq!(h.vault.epoch_contribution(&alice(), epoch), 3_750);
    assert_eq!(h.vault.epoch_snapshot(epoch).unwrap().total_weight, 8_750);

    h.advance(5);
    assert_eq!(h.claim_amount(alice(), epoch), 375);
    assert_eq!(h.claim_amount(bob(), epoch), 500);
}

// ---------------------------------------------------------------------------
// Configuration and persistence
// ---------------------------------------------------------------------------

#[test]
fn vault_from_toml_config() {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(
        file,
        "stake_asset = \"{}\"\nmin_deposit = 1\nmin_lock_duration = 1\nmin_epoch_duration = 1\nmax_collateral_per_lock = 2",
        stake()
    )
    .unwrap();
    let config = VaultConfig::load_with_prefix(Some(file.path()), "EBBTEST_SCENARIO").unwrap();
    assert_eq!(config.max_collateral_per_lock, 2);

    let h = Harness::with(TierConfig::default(), config);
    let epoch = h.open_epoch(100, 10, 0);
    h.deposit(alice(), 1_000, 10);
    for id in 1..=2 {
        let nft = h.give_item(alice(), id);
        h.vault.deposit_collateral(alice(), nft).unwrap();
    }
    let nft = h.give_item(alice(), 3);
    assert_eq!(
        h.vault.deposit_collateral(alice(), nft).unwrap_err().code(),
        "E_COLLATERAL_LIMIT"
    );
    h.advance(10);
    assert_eq!(h.claim_amount(alice(), epoch), 100);
}

#[test]
fn restored_vault_continues_settlement() {
    let h = Harness::new();
    let epoch = h.open_epoch(100, 10, 0);
    h.deposit(alice(), 1_000, 10);
    h.deposit(bob(), 1_000, 10);
    let bytes = h.vault.export_state().unwrap();

    let restored = Vault::restore(&bytes, relaxed_config(), h.deps()).unwrap();
    assert_eq!(restored.epoch_count(), 1);
    assert_eq!(
        restored.epoch_snapshot(epoch).unwrap(),
        h.vault.epoch_snapshot(epoch).unwrap()
    );
    assert_eq!(restored.leaderboard_snapshot(), h.vault.leaderboard_snapshot());

    h.advance(10);
    let paid: u128 = restored
        .claim(alice(), epoch)
        .unwrap()
        .iter()
        .map(|e| e.amount)
        .sum();
    assert_eq!(paid, 50);
    assert_eq!(
        restored.claim(alice(), epoch).unwrap_err().code(),
        "E_NOTHING_TO_CLAIM"
    );
}

#[test]
fn event_log_serializes_to_json() {
    let h = Harness::new();
    h.open_epoch(100, 10, 0);
    h.deposit(alice(), 1_000, 10);

    let events = h.vault.events();
    let names: Vec<_> = events.iter().map(VaultEvent::name).collect();
    assert_eq!(
        names,
        vec![
            "epoch_opened",
            "rewards_added",
            "deposited",
            "contribution_updated",
            "new_top_holder"
        ]
    );
    let json = serde_json::to_string(&events).unwrap();
    assert!(json.contains("\"event\":\"deposited\""));
}
