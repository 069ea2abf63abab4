//! # External Yield Vault
//!
//! The vault is the external yield source the pooling ledger deploys funds
//! into. The ledger side only ever sees the [`YieldVault`] capability
//! trait: a readable exchange rate, mint/redeem primitives, and a
//! secondary reward-accrual mechanism. The rate is an opaque, possibly
//! third-party-controlled oracle -- nothing here assumes it only goes up.
//!
//! [`CompoundStyleVault`] is the in-process implementation used by tests
//! and simulations: a money-market style vault whose share price is set
//! explicitly and whose reward accrual is driven by an external hook,
//! mirroring how cToken test doubles behave.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::debug;

use crate::asset::{AssetError, SharedAsset};
use crate::math::{shares_to_value, value_to_shares};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// An underlying or reward asset transfer failed. Propagated verbatim.
    #[error("asset transfer failed: {0}")]
    Asset(#[from] AssetError),

    /// The holder does not own enough shares for the requested redemption.
    #[error("insufficient shares: {holder} holds {available}, requested {requested}")]
    InsufficientShares {
        /// The share holder being debited.
        holder: String,
        /// Shares currently held.
        available: u128,
        /// Shares requested for redemption.
        requested: u128,
    },

    /// A rate conversion overflowed, or the exchange rate is zero.
    #[error("amount overflow converting between shares and value")]
    AmountOverflow,
}

// ---------------------------------------------------------------------------
// YieldVault capability trait
// ---------------------------------------------------------------------------

/// The capability surface an external yield vault exposes to the ledger.
///
/// Keeping the ledger's arithmetic behind this seam means it can be tested
/// against an in-process vault with a scriptable exchange rate instead of
/// a live external system.
pub trait YieldVault: Send + Sync {
    /// The current share price, scaled by [`crate::math::RATE_SCALE`].
    ///
    /// May move in either direction between calls.
    fn exchange_rate(&self) -> u128;

    /// Deposits `amount` of the underlying asset from `caller` and credits
    /// the minted shares to `caller`. Returns the shares minted,
    /// `floor(amount * RATE_SCALE / rate)`.
    fn mint(&mut self, caller: &str, amount: u128) -> Result<u128, VaultError>;

    /// Burns `shares` held by `caller` and pays out the underlying value,
    /// `floor(shares * rate / RATE_SCALE)`, to `caller`. Returns the
    /// amount paid.
    fn redeem(&mut self, caller: &str, shares: u128) -> Result<u128, VaultError>;

    /// Shares currently held by `holder` (zero for unknown holders).
    fn share_balance(&self, holder: &str) -> u128;

    /// Reward tokens accrued to `holder` and not yet claimed.
    fn accrued_rewards(&self, holder: &str) -> u128;

    /// Pays out all reward tokens accrued to `caller` on the reward-token
    /// ledger. Returns the amount claimed; zero accrual is a no-op.
    fn claim_rewards(&mut self, caller: &str) -> Result<u128, VaultError>;
}

/// A yield vault handle shared between components.
pub type SharedVault = Arc<RwLock<dyn YieldVault>>;

// ---------------------------------------------------------------------------
// CompoundStyleVault
// ---------------------------------------------------------------------------

/// In-process money-market vault with an explicitly set exchange rate.
///
/// Holds the underlying asset it is minted against plus a second,
/// independent reward token whose accrual is driven by
/// [`accrue_rewards`](Self::accrue_rewards). The exchange rate is set via
/// [`set_exchange_rate`](Self::set_exchange_rate) and may be lowered --
/// callers that assume monotonic rates are wrong and tests exercise that.
pub struct CompoundStyleVault {
    /// The vault's own ledger address -- where deposited underlying sits.
    address: String,

    /// The asset this vault is denominated in.
    underlying: SharedAsset,

    /// The secondary reward token distributed to share holders.
    reward: SharedAsset,

    /// Current share price, scaled by `RATE_SCALE`.
    exchange_rate: u128,

    /// Outstanding shares per holder.
    shares: HashMap<String, u128>,

    /// Accrued, unclaimed reward amounts per holder.
    rewards: HashMap<String, u128>,

    /// Sum of all outstanding shares.
    total_shares: u128,
}

impl CompoundStyleVault {
    /// Creates a vault with the given initial exchange rate.
    pub fn new(
        address: &str,
        underlying: SharedAsset,
        reward: SharedAsset,
        initial_rate: u128,
    ) -> Self {
        Self {
            address: address.to_string(),
            underlying,
            reward,
            exchange_rate: initial_rate,
            shares: HashMap::new(),
            rewards: HashMap::new(),
            total_shares: 0,
        }
    }

    /// Wraps this vault for sharing between components.
    pub fn into_shared(self) -> SharedVault {
        Arc::new(RwLock::new(self))
    }

    /// Returns the vault's own ledger address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the sum of all outstanding shares.
    pub fn total_shares(&self) -> u128 {
        self.total_shares
    }

    /// Sets the share price. The yield oracle hook: raising the rate is
    /// how interest accrues, and lowering it models an external loss.
    pub fn set_exchange_rate(&mut self, rate: u128) {
        debug!(old = self.exchange_rate, new = rate, "vault exchange rate updated");
        self.exchange_rate = rate;
    }

    /// Accrues reward tokens to a share holder.
    ///
    /// Mints the reward amount to the vault's own reward-token account so
    /// a later [`claim_rewards`](YieldVault::claim_rewards) can pay it out.
    pub fn accrue_rewards(&mut self, holder: &str, amount: u128) -> Result<(), VaultError> {
        self.reward.write().mint(&self.address, amount)?;
        let accrued = self.rewards.entry(holder.to_string()).or_insert(0);
        *accrued = accrued
            .checked_add(amount)
            .ok_or(VaultError::AmountOverflow)?;
        Ok(())
    }
}

impl YieldVault for CompoundStyleVault {
    fn exchange_rate(&self) -> u128 {
        self.exchange_rate
    }

    fn mint(&mut self, caller: &str, amount: u128) -> Result<u128, VaultError> {
        let minted =
            value_to_shares(amount, self.exchange_rate).ok_or(VaultError::AmountOverflow)?;

        // Verify the share credit cannot overflow before moving any funds,
        // so a failure leaves both ledgers untouched.
        let held = self.shares.get(caller).copied().unwrap_or(0);
        let new_held = held.checked_add(minted).ok_or(VaultError::AmountOverflow)?;
        let new_total = self
            .total_shares
            .checked_add(minted)
            .ok_or(VaultError::AmountOverflow)?;

        self.underlying
            .write()
            .transfer(caller, &self.address, amount)?;

        self.shares.insert(caller.to_string(), new_held);
        self.total_shares = new_total;

        debug!(caller = %caller, amount, shares = minted, "vault mint");
        Ok(minted)
    }

    fn redeem(&mut self, caller: &str, shares: u128) -> Result<u128, VaultError> {
        let held = self.shares.get(caller).copied().unwrap_or(0);
        if held < shares {
            return Err(VaultError::InsufficientShares {
                holder: caller.to_string(),
                available: held,
                requested: shares,
            });
        }

        let amount =
            shares_to_value(shares, self.exchange_rate).ok_or(VaultError::AmountOverflow)?;

        // Pay out first: a failed transfer (vault itself short of funds)
        // must not burn the caller's shares.
        self.underlying
            .write()
            .transfer(&self.address, caller, amount)?;

        self.shares.insert(caller.to_string(), held - shares);
        self.total_shares -= shares;

        debug!(caller = %caller, shares, amount, "vault redeem");
        Ok(amount)
    }

    fn share_balance(&self, holder: &str) -> u128 {
        self.shares.get(holder).copied().unwrap_or(0)
    }

    fn accrued_rewards(&self, holder: &str) -> u128 {
        self.rewards.get(holder).copied().unwrap_or(0)
    }

    fn claim_rewards(&mut self, caller: &str) -> Result<u128, VaultError> {
        let accrued = self.rewards.get(caller).copied().unwrap_or(0);
        if accrued == 0 {
            return Ok(0);
        }

        self.reward.write().transfer(&self.address, caller, accrued)?;
        self.rewards.insert(caller.to_string(), 0);

        debug!(caller = %caller, amount = accrued, "vault rewards claimed");
        Ok(accrued)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
