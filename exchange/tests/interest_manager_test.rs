//! Integration tests for the interest manager against an in-process
//! vault: owner gating, invest/redeem conversions, liquidity checks, and
//! reward harvesting.

use std::sync::Arc;

use parking_lot::RwLock;

use tidepool_core::asset::{FungibleAsset, SharedAsset};
use tidepool_core::math::RATE_SCALE;
use tidepool_core::vault::{CompoundStyleVault, SharedVault};
use tidepool_exchange::{InterestError, InterestManager};

const OWNER: &str = "exchange";
const MANAGER: &str = "interest-manager";
const VAULT: &str = "vault";
const RECEIVER: &str = "receiver";
const TREASURY: &str = "reward-treasury";
const STRANGER: &str = "stranger";

struct Harness {
    dai: SharedAsset,
    comp: SharedAsset,
    vault: Arc<RwLock<CompoundStyleVault>>,
    manager: InterestManager,
}

fn setup() -> Harness {
    let dai = FungibleAsset::new("Dai Stablecoin", "DAI", 8).into_shared();
    let comp = FungibleAsset::new("Compound", "COMP", 8).into_shared();

    let vault = Arc::new(RwLock::new(CompoundStyleVault::new(
        VAULT,
        dai.clone(),
        comp.clone(),
        RATE_SCALE,
    )));
    let shared_vault: SharedVault = vault.clone();

    let manager = InterestManager::new(
        MANAGER,
        OWNER,
        dai.clone(),
        comp.clone(),
        shared_vault,
        TREASURY,
    );

    Harness {
        dai,
        comp,
        vault,
        manager,
    }
}

impl Harness {
    /// Puts `amount` of underlying at the manager's address, as a deposit
    /// pull would.
    fn fund_manager(&self, amount: u128) {
        self.dai.write().mint(MANAGER, amount).unwrap();
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

#[test]
fn wiring_is_fixed_at_construction() {
    let h = setup();
    assert_eq!(h.manager.address(), MANAGER);
    assert_eq!(h.manager.owner(), OWNER);
    assert_eq!(h.manager.reward_recipient(), TREASURY);
}

// ---------------------------------------------------------------------------
// Owner Gating
// ---------------------------------------------------------------------------

#[test]
fn invest_rejects_non_owner() {
    let h = setup();
    h.fund_manager(100);

    let result = h.manager.invest(STRANGER, 100);
    assert!(matches!(result, Err(InterestError::OnlyOwner { .. })));
    assert_eq!(h.manager.invested_shares(), 0);
}

#[test]
fn redeem_rejects_non_owner() {
    let h = setup();
    let result = h.manager.redeem(STRANGER, 100, RECEIVER);
    assert!(matches!(result, Err(InterestError::OnlyOwner { .. })));
}

#[test]
fn harvest_rejects_non_owner() {
    let h = setup();
    let result = h.manager.harvest_rewards(STRANGER);
    assert!(matches!(result, Err(InterestError::OnlyOwner { .. })));
}

// ---------------------------------------------------------------------------
// Invest / Redeem
// ---------------------------------------------------------------------------

#[test]
fn invest_deploys_funds_into_vault() {
    let h = setup();
    h.fund_manager(100);

    let shares = h.manager.invest(OWNER, 100).unwrap();
    assert_eq!(shares, 100);
    assert_eq!(h.manager.invested_shares(), 100);
    assert_eq!(h.dai.read().balance_of(MANAGER), 0);
    assert_eq!(h.dai.read().balance_of(VAULT), 100);
}

#[test]
fn redeem_forwards_underlying_to_recipient() {
    let h = setup();
    h.fund_manager(100);
    h.manager.invest(OWNER, 100).unwrap();

    let redemption = h.manager.redeem(OWNER, 60, RECEIVER).unwrap();
    assert_eq!(redemption.shares_burned, 60);
    assert_eq!(redemption.amount_received, 60);

    assert_eq!(h.dai.read().balance_of(RECEIVER), 60);
    // Nothing lingers at the manager's address.
    assert_eq!(h.dai.read().balance_of(MANAGER), 0);
    assert_eq!(h.manager.invested_shares(), 40);
}

#[test]
fn redeem_at_doubled_rate_burns_half_the_shares() {
    let h = setup();
    h.fund_manager(100);
    h.manager.invest(OWNER, 100).unwrap();

    h.vault.write().set_exchange_rate(2 * RATE_SCALE);
    // The appreciated payout needs funding on the vault side.
    h.dai.write().mint(VAULT, 100).unwrap();

    let redemption = h.manager.redeem(OWNER, 100, RECEIVER).unwrap();
    assert_eq!(redemption.shares_burned, 50);
    assert_eq!(redemption.amount_received, 100);
    assert_eq!(h.manager.invested_shares(), 50);
}

#[test]
fn redeem_beyond_position_reports_liquidity_shortfall() {
    let h = setup();
    h.fund_manager(50);
    h.manager.invest(OWNER, 50).unwrap();

    let result = h.manager.redeem(OWNER, 100, RECEIVER);
    assert!(matches!(
        result,
        Err(InterestError::InsufficientVaultLiquidity {
            requested_shares: 100,
            available_shares: 50,
        })
    ));

    // The rejected redemption touches nothing.
    assert_eq!(h.manager.invested_shares(), 50);
    assert_eq!(h.dai.read().balance_of(RECEIVER), 0);
}

#[test]
fn exchange_rate_tracks_the_vault() {
    let h = setup();
    assert_eq!(h.manager.exchange_rate(), RATE_SCALE);
    h.vault.write().set_exchange_rate(3 * RATE_SCALE / 2);
    assert_eq!(h.manager.exchange_rate(), 3 * RATE_SCALE / 2);
}

// ---------------------------------------------------------------------------
// Reward Harvesting
// ---------------------------------------------------------------------------

#[test]
fn harvest_forwards_everything_to_the_fixed_recipient() {
    let h = setup();
    h.vault.write().accrue_rewards(MANAGER, 42).unwrap();

    let claimed = h.manager.harvest_rewards(OWNER).unwrap();
    assert_eq!(claimed, 42);
    assert_eq!(h.comp.read().balance_of(TREASURY), 42);
    // The manager keeps none of it.
    assert_eq!(h.comp.read().balance_of(MANAGER), 0);
}

#[test]
fn harvest_with_nothing_accrued_is_noop() {
    let h = setup();
    let claimed = h.manager.harvest_rewards(OWNER).unwrap();
    assert_eq!(claimed, 0);
    assert_eq!(h.comp.read().balance_of(TREASURY), 0);
}

#[test]
fn repeated_harvest_only_pays_new_accrual() {
    let h = setup();
    h.vault.write().accrue_rewards(MANAGER, 30).unwrap();
    assert_eq!(h.manager.harvest_rewards(OWNER).unwrap(), 30);

    h.vault.write().accrue_rewards(MANAGER, 12).unwrap();
    assert_eq!(h.manager.harvest_rewards(OWNER).unwrap(), 12);
    assert_eq!(h.comp.read().balance_of(TREASURY), 42);
}
