//! # Fungible Asset Ledger
//!
//! An in-process ledger for a single fungible asset: balances, allowances,
//! and the standard transfer surface (`approve` / `transfer` /
//! `transfer_from`). This is the collaborator the pooling exchange pulls
//! deposits from and pays withdrawals into; a second instance serves as the
//! vault's reward token.
//!
//! There is no ambient caller identity -- every operation names the acting
//! parties explicitly, and authorization is enforced by the components that
//! hold the ledger handle. What the ledger itself guarantees is atomicity:
//! an operation either applies in full or fails with no state change.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during asset ledger operations.
#[derive(Debug, Error)]
pub enum AssetError {
    /// The debited account holds less than the requested amount.
    #[error("insufficient balance: {address} holds {available}, requested {requested}")]
    InsufficientBalance {
        /// The account being debited.
        address: String,
        /// The account's current balance.
        available: u128,
        /// The amount that was requested.
        requested: u128,
    },

    /// The spender's approved allowance does not cover the requested amount.
    #[error(
        "insufficient allowance: {owner} approved {available} to {spender}, requested {requested}"
    )]
    InsufficientAllowance {
        /// The account whose funds would be spent.
        owner: String,
        /// The account attempting to spend them.
        spender: String,
        /// The currently approved allowance.
        available: u128,
        /// The amount that was requested.
        requested: u128,
    },

    /// Arithmetic overflow during a credit or supply update.
    #[error("amount overflow crediting {address}: balance {current}, credit {credit}")]
    Overflow {
        /// The account being credited.
        address: String,
        /// The balance before the failed credit.
        current: u128,
        /// The amount that caused the overflow.
        credit: u128,
    },
}

// ---------------------------------------------------------------------------
// FungibleAsset
// ---------------------------------------------------------------------------

/// A single fungible asset's complete ledger state.
///
/// Balances and allowances are keyed by address string. The `decimals`
/// field is display-only -- the ledger never divides; all arithmetic is in
/// smallest units.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FungibleAsset {
    /// Human-readable asset name (e.g., "Dai Stablecoin").
    name: String,

    /// Ticker symbol (e.g., "DAI").
    symbol: String,

    /// Display decimal places. A balance of `12345` with `decimals = 2`
    /// renders as `123.45`.
    decimals: u8,

    /// Total minted supply in smallest units.
    total_supply: u128,

    /// Account balances in smallest units.
    balances: HashMap<String, u128>,

    /// `allowances[owner][spender]` = amount the spender may pull from
    /// the owner via [`transfer_from`](Self::transfer_from).
    allowances: HashMap<String, HashMap<String, u128>>,
}

/// A fungible asset ledger shared between components.
///
/// Execution is serialized by the embedding application; the lock only
/// coordinates the handle, it is not a concurrency design.
pub type SharedAsset = Arc<RwLock<FungibleAsset>>;

impl FungibleAsset {
    /// Creates an empty ledger for a new asset.
    pub fn new(name: &str, symbol: &str, decimals: u8) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            decimals,
            total_supply: 0,
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    /// Wraps this ledger for sharing between components.
    pub fn into_shared(self) -> SharedAsset {
        Arc::new(RwLock::new(self))
    }

    /// Returns the asset name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the ticker symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Returns the display decimal places.
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Returns the total minted supply.
    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    /// Returns an account's balance (zero for unknown accounts).
    pub fn balance_of(&self, address: &str) -> u128 {
        self.balances.get(address).copied().unwrap_or(0)
    }

    /// Returns the amount `spender` may currently pull from `owner`.
    pub fn allowance(&self, owner: &str, spender: &str) -> u128 {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Mints new units to an account, growing total supply.
    ///
    /// Issuer gating is the responsibility of whoever holds the ledger
    /// handle; tests and faucet-style tooling call this directly.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::Overflow`] if the credit would exceed `u128::MAX`.
    pub fn mint(&mut self, to: &str, amount: u128) -> Result<u128, AssetError> {
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or_else(|| AssetError::Overflow {
                address: to.to_string(),
                current: self.total_supply,
                credit: amount,
            })?;

        let new_balance = self.credit(to, amount)?;
        self.total_supply = new_supply;
        Ok(new_balance)
    }

    /// Sets (not adds to) the amount `spender` may pull from `owner`.
    pub fn approve(&mut self, owner: &str, spender: &str, amount: u128) {
        self.allowances
            .entry(owner.to_string())
            .or_default()
            .insert(spender.to_string(), amount);
    }

    /// Moves `amount` from one account to another.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::InsufficientBalance`] if `from` holds less
    /// than `amount`. No state changes on failure.
    pub fn transfer(&mut self, from: &str, to: &str, amount: u128) -> Result<(), AssetError> {
        self.check_balance(from, amount)?;
        // A self-transfer would double-count through debit+credit; it is
        // a no-op once the balance check has passed.
        if from == to {
            return Ok(());
        }
        self.debit(from, amount);
        self.credit(to, amount)?;
        Ok(())
    }

    /// Moves `amount` from `owner` to `recipient` on behalf of `spender`,
    /// consuming the spender's allowance.
    ///
    /// The allowance is checked before the balance -- a caller who was
    /// never approved learns nothing about the owner's funds.
    ///
    /// # Errors
    ///
    /// Returns [`AssetError::InsufficientAllowance`] if the approved
    /// allowance does not cover `amount`, then
    /// [`AssetError::InsufficientBalance`] if the owner's funds do not.
    pub fn transfer_from(
        &mut self,
        spender: &str,
        owner: &str,
        recipient: &str,
        amount: u128,
    ) -> Result<(), AssetError> {
        let approved = self.allowance(owner, spender);
        if approved < amount {
            return Err(AssetError::InsufficientAllowance {
                owner: owner.to_string(),
                spender: spender.to_string(),
                available: approved,
                requested: amount,
            });
        }

        self.transfer(owner, recipient, amount)?;

        // Only burn the allowance once the transfer has succeeded.
        self.allowances
            .entry(owner.to_string())
            .or_default()
            .insert(spender.to_string(), approved - amount);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Internal Helpers
    // -----------------------------------------------------------------------

    fn check_balance(&self, address: &str, amount: u128) -> Result<(), AssetError> {
        let available = self.balance_of(address);
        if available < amount {
            return Err(AssetError::InsufficientBalance {
                address: address.to_string(),
                available,
                requested: amount,
            });
        }
        Ok(())
    }

    /// Debits an account. Caller must have verified the balance.
    fn debit(&mut self, address: &str, amount: u128) {
        if let Some(balance) = self.balances.get_mut(address) {
            *balance -= amount;
        }
    }

    fn credit(&mut self, address: &str, amount: u128) -> Result<u128, AssetError> {
        let balance = self.balances.entry(address.to_string()).or_insert(0);
        let new_balance = balance
            .checked_add(amount)
            .ok_or_else(|| AssetError::Overflow {
                address: address.to_string(),
                current: *balance,
                credit: amount,
            })?;
        *balance = new_balance;
        Ok(new_balance)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
