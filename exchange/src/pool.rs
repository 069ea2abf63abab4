//! # Pool Exchange (Wallet Ledger)
//!
//! The accounting core: per-wallet principal and share balances against a
//! fluctuating external exchange rate, interest-first withdrawal ordering,
//! and deposit/withdraw policy.
//!
//! ## Accounting Model
//!
//! Each beneficiary wallet owns one [`WalletPool`]:
//!
//! - `principal` -- cumulative net deposits, in smallest asset units.
//! - `shares` -- claim on the vault, accumulated as
//!   `sum(deposit_i * RATE_SCALE / rate_at_deposit_i)`, floored per deposit.
//!
//! Redeemable value is always `floor(shares * current_rate / RATE_SCALE)`;
//! interest payable is the excess of that value over principal, clamped at
//! zero because the rate is an external oracle that can fall as well as
//! rise.
//!
//! ## Effect Ordering
//!
//! Every mutating operation updates the wallet's pool before invoking the
//! asset ledger or the vault, so an external call can never observe stale
//! pool state. If the external step fails, the saved pool is restored --
//! operations commit in full or not at all.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use tidepool_core::asset::{AssetError, SharedAsset};
use tidepool_core::math::{shares_to_value, value_to_shares};

use crate::config::{ConfigError, ExchangeConfig};
use crate::interest::{InterestError, InterestManager};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during pool exchange operations.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// A mutating or administrative call arrived before `initialize`.
    #[error("exchange is not initialized")]
    NotInitialized,

    /// `initialize` was called a second time.
    #[error("exchange is already initialized")]
    AlreadyInitialized,

    /// A withdrawal was attempted by someone other than the wallet itself.
    #[error("not-authorized: {caller} cannot withdraw from wallet {wallet}")]
    NotAuthorized {
        /// The rejected caller.
        caller: String,
        /// The wallet whose pool was targeted.
        wallet: String,
    },

    /// An administrative call was attempted by someone other than the owner.
    #[error("only-owner: {caller} is not the exchange owner")]
    OnlyOwner {
        /// The rejected caller.
        caller: String,
    },

    /// Pool arithmetic overflowed.
    #[error("amount overflow in pool accounting")]
    AmountOverflow,

    /// Configuration validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An asset-layer failure, propagated verbatim (insufficient
    /// allowance or balance on deposit, for instance).
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),

    /// An interest manager (vault adapter) failure.
    #[error("interest manager error: {0}")]
    Interest(#[from] InterestError),
}

// ---------------------------------------------------------------------------
// WalletPool
// ---------------------------------------------------------------------------

/// Per-beneficiary accounting record.
///
/// Created implicitly on first deposit and never destroyed -- a fully
/// withdrawn pool persists at zero, indistinguishable from an untouched
/// one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletPool {
    /// Cumulative net-deposited amount in smallest asset units.
    pub principal: u128,

    /// Accumulated claim on the vault, floored per deposit.
    pub shares: u128,
}

impl WalletPool {
    /// Returns `true` if this pool holds nothing.
    pub fn is_empty(&self) -> bool {
        self.principal == 0 && self.shares == 0
    }
}

// ---------------------------------------------------------------------------
// Withdrawal planning
// ---------------------------------------------------------------------------

/// The fully computed effect of a withdrawal request, before any state
/// is touched. Pure arithmetic so the interest-first law is testable in
/// isolation.
#[derive(Clone, Debug, PartialEq, Eq)]
struct WithdrawalPlan {
    /// Portion paid out of accrued interest.
    interest_portion: u128,
    /// Portion paid out of principal.
    principal_portion: u128,
    /// Total value leaving the pool (`interest + principal` portions).
    total: u128,
    /// Shares burned, recomputed at the *current* rate and clamped to
    /// the pool's share balance.
    shares_burned: u128,
}

/// Plans a withdrawal of up to `requested` from `pool` at `rate`.
///
/// Requesting more than the redeemable value is not an error: the plan
/// clamps to whatever is available, interest first. Returns `None` only
/// on conversion overflow.
fn plan_withdrawal(pool: &WalletPool, rate: u128, requested: u128) -> Option<WithdrawalPlan> {
    let value_with_interest = shares_to_value(pool.shares, rate)?;
    let interest_payable = value_with_interest.saturating_sub(pool.principal);

    let withdrawable = requested.min(value_with_interest);
    let interest_portion = withdrawable.min(interest_payable);
    let principal_portion = (withdrawable - interest_portion).min(pool.principal);
    let total = interest_portion + principal_portion;

    let shares_burned = value_to_shares(total, rate)?.min(pool.shares);

    Some(WithdrawalPlan {
        interest_portion,
        principal_portion,
        total,
        shares_burned,
    })
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

/// Receipt returned by a successful deposit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DepositReceipt {
    /// Unique identifier for this deposit.
    pub deposit_id: String,
    /// Who funded the pool (any third party may).
    pub depositor: String,
    /// The beneficiary wallet credited.
    pub wallet: String,
    /// Amount deposited, in smallest asset units.
    pub amount: u128,
    /// Vault shares credited to the wallet's pool.
    pub shares_minted: u128,
    /// The exchange rate observed at deposit time.
    pub exchange_rate: u128,
    /// When the deposit was executed (UTC).
    pub timestamp: DateTime<Utc>,
}

/// Receipt returned by a withdrawal (including clamped and no-op ones).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WithdrawReceipt {
    /// Unique identifier for this withdrawal.
    pub withdrawal_id: String,
    /// The wallet that withdrew (always the caller).
    pub wallet: String,
    /// The amount originally requested.
    pub requested: u128,
    /// Portion paid from accrued interest.
    pub interest_portion: u128,
    /// Portion paid from principal.
    pub principal_portion: u128,
    /// Total transferred to the wallet; `min(requested, redeemable value)`.
    pub total: u128,
    /// Shares burned against the pool at the current rate.
    pub shares_burned: u128,
    /// The exchange rate observed at withdrawal time.
    pub exchange_rate: u128,
    /// When the withdrawal was executed (UTC).
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// PoolExchange
// ---------------------------------------------------------------------------

/// Everything behind the one-time initialization gate.
struct ExchangeState {
    config: ExchangeConfig,
    interest_manager: InterestManager,
    asset: SharedAsset,
    pools: HashMap<String, WalletPool>,
}

/// The custodial pooling ledger.
///
/// Third parties deposit the underlying asset into any wallet's pool; the
/// funds are deployed into the external vault through the interest
/// manager, and the wallet accrues whatever yield the vault's exchange
/// rate reports. Only a wallet can drain its own pool, and interest comes
/// out before principal.
///
/// Mutating operations take `&mut self`; the embedding application
/// serializes calls, so no two operations ever interleave.
pub struct PoolExchange {
    /// The exchange's own address: the allowance target for deposits and
    /// the owner of the interest manager in a deployed wiring.
    address: String,

    /// `None` until [`initialize`](Self::initialize) runs.
    state: Option<ExchangeState>,
}

impl PoolExchange {
    /// Creates an uninitialized exchange with the given ledger address.
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            state: None,
        }
    }

    /// Returns the exchange's own ledger address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// One-time setup: establishes the owner, vault adapter, underlying
    /// asset, and initial trading fee for the deployment's lifetime.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::AlreadyInitialized`] on a second call and
    /// [`ConfigError::FeeRateOutOfRange`] for a fee above 100%.
    pub fn initialize(
        &mut self,
        owner: &str,
        interest_manager: InterestManager,
        asset: SharedAsset,
        trading_fee_bps: u32,
    ) -> Result<(), ExchangeError> {
        if self.state.is_some() {
            return Err(ExchangeError::AlreadyInitialized);
        }

        let config = ExchangeConfig::new(owner, trading_fee_bps)?;
        self.state = Some(ExchangeState {
            config,
            interest_manager,
            asset,
            pools: HashMap::new(),
        });

        info!(owner = %owner, trading_fee_bps, "pool exchange initialized");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Returns the administrative owner.
    pub fn owner(&self) -> Result<&str, ExchangeError> {
        self.state
            .as_ref()
            .map(|s| s.config.owner.as_str())
            .ok_or(ExchangeError::NotInitialized)
    }

    /// Returns the stored trading fee in basis points (zero before
    /// initialization).
    pub fn trading_fee_bps(&self) -> u32 {
        self.state
            .as_ref()
            .map(|s| s.config.trading_fee_bps)
            .unwrap_or(0)
    }

    /// Cumulative principal deposited into a wallet's pool. Zero for
    /// untouched wallets; never fails.
    pub fn get_amount_invested(&self, wallet: &str) -> u128 {
        self.with_pool(wallet, |pool, _rate| pool.principal)
    }

    /// Current redeemable value of a wallet's pool at the vault's present
    /// exchange rate. Zero for untouched wallets; never fails.
    pub fn get_amount_invested_with_interest(&self, wallet: &str) -> u128 {
        self.with_pool(wallet, |pool, rate| {
            // Overflow here requires a share balance beyond any supply
            // this ledger can mint.
            shares_to_value(pool.shares, rate).unwrap_or(0)
        })
    }

    /// The non-negative excess of redeemable value over principal. Zero
    /// for untouched wallets and whenever the rate has fallen below the
    /// blended deposit rate; never fails.
    pub fn get_interest_payable(&self, wallet: &str) -> u128 {
        self.with_pool(wallet, |pool, rate| {
            shares_to_value(pool.shares, rate)
                .unwrap_or(0)
                .saturating_sub(pool.principal)
        })
    }

    /// Returns a copy of a wallet's raw pool record (zeroed for untouched
    /// wallets).
    pub fn get_wallet_pool(&self, wallet: &str) -> WalletPool {
        self.state
            .as_ref()
            .and_then(|s| s.pools.get(wallet).cloned())
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Deposits
    // -----------------------------------------------------------------------

    /// Deposits `amount` of the underlying asset into `wallet`'s pool.
    ///
    /// Permissionless: any caller may fund any wallet. The caller must
    /// have approved at least `amount` to the exchange's address and hold
    /// at least `amount`; both failures come straight from the asset
    /// layer. The funds are pulled to the interest manager and invested
    /// at the rate observed now.
    ///
    /// # Errors
    ///
    /// [`AssetError::InsufficientAllowance`] / [`AssetError::InsufficientBalance`]
    /// propagate verbatim. Any failure leaves all state unchanged.
    pub fn deposit_to_wallet_pool(
        &mut self,
        caller: &str,
        wallet: &str,
        amount: u128,
    ) -> Result<DepositReceipt, ExchangeError> {
        let exchange_address = self.address.clone();
        let state = self.state.as_mut().ok_or(ExchangeError::NotInitialized)?;

        let rate = state.interest_manager.exchange_rate();
        let shares = value_to_shares(amount, rate).ok_or(ExchangeError::AmountOverflow)?;

        // Effects before interactions: credit the pool first, so a
        // reentrant observer can never see pre-deposit state. Both new
        // values are computed up front so a failed check mutates nothing.
        let pool = state.pools.entry(wallet.to_string()).or_default();
        let prior = pool.clone();
        let new_principal = pool
            .principal
            .checked_add(amount)
            .ok_or(ExchangeError::AmountOverflow)?;
        let new_shares = pool
            .shares
            .checked_add(shares)
            .ok_or(ExchangeError::AmountOverflow)?;
        pool.principal = new_principal;
        pool.shares = new_shares;

        // Pull the funds from the depositor to the interest manager.
        let manager_address = state.interest_manager.address().to_string();
        if let Err(err) = state.asset.write().transfer_from(
            &exchange_address,
            caller,
            &manager_address,
            amount,
        ) {
            state.pools.insert(wallet.to_string(), prior);
            return Err(err.into());
        }

        // Deploy them into the vault.
        if let Err(err) = state.interest_manager.invest(&exchange_address, amount) {
            state.pools.insert(wallet.to_string(), prior);
            // The manager still holds the pulled funds; return them and
            // re-grant the allowance the pull consumed, so the failed
            // deposit leaves no trace on the asset ledger.
            let mut asset = state.asset.write();
            let _ = asset.transfer(&manager_address, caller, amount);
            let restored = asset
                .allowance(caller, &exchange_address)
                .saturating_add(amount);
            asset.approve(caller, &exchange_address, restored);
            return Err(err.into());
        }

        info!(
            depositor = %caller,
            wallet = %wallet,
            amount,
            shares,
            rate,
            "deposited to wallet pool"
        );

        Ok(DepositReceipt {
            deposit_id: Uuid::new_v4().to_string(),
            depositor: caller.to_string(),
            wallet: wallet.to_string(),
            amount,
            shares_minted: shares,
            exchange_rate: rate,
            timestamp: Utc::now(),
        })
    }

    // -----------------------------------------------------------------------
    // Withdrawals
    // -----------------------------------------------------------------------

    /// Withdraws exactly the wallet's accrued interest, leaving principal
    /// untouched. Equivalent to `withdraw_amount(wallet, interest_payable)`.
    ///
    /// # Errors
    ///
    /// Same authorization rule as [`withdraw_amount`](Self::withdraw_amount).
    pub fn withdraw_wallet_interest(
        &mut self,
        caller: &str,
        wallet: &str,
    ) -> Result<WithdrawReceipt, ExchangeError> {
        let interest = self.get_interest_payable(wallet);
        self.withdraw_amount(caller, wallet, interest)
    }

    /// Withdraws up to `amount` from the caller's own pool, interest
    /// first.
    ///
    /// The amount actually withdrawn is `min(amount, redeemable value)`;
    /// requesting more than is available is **not** an error, and a zero
    /// total is a legal no-op that performs no external calls. Shares are
    /// burned at the rate observed now, not the deposit-time rate.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::NotAuthorized`] unless `caller == wallet`.
    /// Adapter failures roll the pool back and propagate.
    pub fn withdraw_amount(
        &mut self,
        caller: &str,
        wallet: &str,
        amount: u128,
    ) -> Result<WithdrawReceipt, ExchangeError> {
        let exchange_address = self.address.clone();
        let state = self.state.as_mut().ok_or(ExchangeError::NotInitialized)?;

        // Self-custody: a wallet pool can only be drained by its own
        // wallet. No delegation, no owner override.
        if caller != wallet {
            return Err(ExchangeError::NotAuthorized {
                caller: caller.to_string(),
                wallet: wallet.to_string(),
            });
        }

        let rate = state.interest_manager.exchange_rate();
        let pool = state.pools.entry(wallet.to_string()).or_default();
        let plan =
            plan_withdrawal(pool, rate, amount).ok_or(ExchangeError::AmountOverflow)?;

        if plan.total == 0 {
            // Nothing to move: empty pool, zero request, or zero value at
            // the current rate. Legal no-op.
            return Ok(WithdrawReceipt {
                withdrawal_id: Uuid::new_v4().to_string(),
                wallet: wallet.to_string(),
                requested: amount,
                interest_portion: 0,
                principal_portion: 0,
                total: 0,
                shares_burned: 0,
                exchange_rate: rate,
                timestamp: Utc::now(),
            });
        }

        // Effects before interactions: debit the pool, then redeem.
        let prior = pool.clone();
        pool.principal -= plan.principal_portion;
        pool.shares -= plan.shares_burned;

        if let Err(err) = state
            .interest_manager
            .redeem(&exchange_address, plan.total, wallet)
        {
            state.pools.insert(wallet.to_string(), prior);
            return Err(err.into());
        }

        info!(
            wallet = %wallet,
            requested = amount,
            interest = plan.interest_portion,
            principal = plan.principal_portion,
            shares = plan.shares_burned,
            rate,
            "withdrew from wallet pool"
        );

        Ok(WithdrawReceipt {
            withdrawal_id: Uuid::new_v4().to_string(),
            wallet: wallet.to_string(),
            requested: amount,
            interest_portion: plan.interest_portion,
            principal_portion: plan.principal_portion,
            total: plan.total,
            shares_burned: plan.shares_burned,
            exchange_rate: rate,
            timestamp: Utc::now(),
        })
    }

    // -----------------------------------------------------------------------
    // Administration
    // -----------------------------------------------------------------------

    /// Replaces the trading fee rate. Owner-only.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError::OnlyOwner`] for any caller but the owner
    /// and [`ConfigError::FeeRateOutOfRange`] for a fee above 100%.
    pub fn set_trading_fee_rate(
        &mut self,
        caller: &str,
        rate_bps: u32,
    ) -> Result<(), ExchangeError> {
        let state = self.state.as_mut().ok_or(ExchangeError::NotInitialized)?;

        if caller != state.config.owner {
            return Err(ExchangeError::OnlyOwner {
                caller: caller.to_string(),
            });
        }

        state.config.set_trading_fee_bps(rate_bps)?;
        info!(rate_bps, "trading fee rate updated");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internal Helpers
    // -----------------------------------------------------------------------

    /// Runs a read-only closure over a wallet's pool and the current rate,
    /// defaulting to an empty pool. Returns the closure's zero-equivalent
    /// for an uninitialized exchange so queries are total.
    fn with_pool<F>(&self, wallet: &str, f: F) -> u128
    where
        F: FnOnce(&WalletPool, u128) -> u128,
    {
        match &self.state {
            Some(state) => {
                let empty = WalletPool::default();
                let pool = state.pools.get(wallet).unwrap_or(&empty);
                let rate = state.interest_manager.exchange_rate();
                f(pool, rate)
            }
            None => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
