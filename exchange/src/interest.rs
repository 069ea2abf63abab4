//! # Interest Manager (Vault Adapter)
//!
//! Sole owner of the relationship with the external yield vault. The
//! exchange never talks to the vault directly: it hands the interest
//! manager asset-denominated amounts, and the manager converts them
//! to and from vault shares at the vault's current exchange rate.
//!
//! The manager also forwards the vault's secondary reward accrual (the
//! COMP-style incentive token) to a recipient fixed at construction and
//! never changed afterwards.
//!
//! All operations here are owner-gated: in a deployed wiring the owner is
//! the exchange's own address, so only the exchange can move pooled funds.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use tidepool_core::asset::{AssetError, SharedAsset};
use tidepool_core::math::value_to_shares;
use tidepool_core::vault::{SharedVault, VaultError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during interest manager operations.
#[derive(Debug, Error)]
pub enum InterestError {
    /// The caller is not the manager's owner.
    #[error("only-owner: {caller} is not the interest manager owner")]
    OnlyOwner {
        /// The rejected caller.
        caller: String,
    },

    /// The manager's vault position cannot cover the requested redemption.
    ///
    /// Surfaced before touching the vault so a shortfall can never corrupt
    /// share accounting mid-redemption.
    #[error(
        "insufficient vault liquidity: redemption needs {requested_shares} shares, \
         position holds {available_shares}"
    )]
    InsufficientVaultLiquidity {
        /// Shares the redemption would burn.
        requested_shares: u128,
        /// Shares the manager currently holds.
        available_shares: u128,
    },

    /// A rate conversion overflowed, or the exchange rate is zero.
    #[error("amount overflow converting between shares and value")]
    AmountOverflow,

    /// An asset transfer failed. Propagated verbatim.
    #[error("asset transfer failed: {0}")]
    Asset(#[from] AssetError),

    /// A vault operation failed.
    #[error("vault error: {0}")]
    Vault(#[from] VaultError),
}

// ---------------------------------------------------------------------------
// Redemption
// ---------------------------------------------------------------------------

/// Outcome of a redemption: what was burned and what came back.
///
/// `amount_received <= value_requested` always -- both the share
/// computation and the vault payout floor, so dust stays in the vault.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Redemption {
    /// Vault shares burned.
    pub shares_burned: u128,
    /// Underlying asset received and forwarded to the recipient.
    pub amount_received: u128,
}

// ---------------------------------------------------------------------------
// InterestManager
// ---------------------------------------------------------------------------

/// Adapter between asset-denominated exchange accounting and the
/// share-denominated external vault.
pub struct InterestManager {
    /// The manager's own ledger address. Deposited funds pass through
    /// here on the way into the vault, and redemptions on the way out.
    address: String,

    /// The only principal allowed to move funds: the exchange's address.
    owner: String,

    /// The underlying asset ledger.
    asset: SharedAsset,

    /// The vault's secondary reward token ledger.
    reward_asset: SharedAsset,

    /// The external yield vault.
    vault: SharedVault,

    /// Where harvested reward tokens go. Fixed for the deployment's
    /// lifetime.
    reward_recipient: String,
}

impl InterestManager {
    /// Creates a manager bound to one vault and one reward recipient.
    pub fn new(
        address: &str,
        owner: &str,
        asset: SharedAsset,
        reward_asset: SharedAsset,
        vault: SharedVault,
        reward_recipient: &str,
    ) -> Self {
        Self {
            address: address.to_string(),
            owner: owner.to_string(),
            asset,
            reward_asset,
            vault,
            reward_recipient: reward_recipient.to_string(),
        }
    }

    /// Returns the manager's own ledger address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Returns the owner (the exchange's address in a deployed wiring).
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Returns the fixed reward recipient.
    pub fn reward_recipient(&self) -> &str {
        &self.reward_recipient
    }

    /// Reads the vault's current exchange rate. The rate is an opaque
    /// external oracle and may move in either direction between calls.
    pub fn exchange_rate(&self) -> u128 {
        self.vault.read().exchange_rate()
    }

    /// Shares the manager currently holds in the vault.
    pub fn invested_shares(&self) -> u128 {
        self.vault.read().share_balance(&self.address)
    }

    /// Deploys `amount` of the underlying (already sitting at the
    /// manager's address) into the vault. Returns the shares minted.
    ///
    /// # Errors
    ///
    /// Returns [`InterestError::OnlyOwner`] for any caller but the owner.
    /// Asset-layer failures propagate verbatim.
    pub fn invest(&self, caller: &str, amount: u128) -> Result<u128, InterestError> {
        self.check_owner(caller)?;

        let shares = self.vault.write().mint(&self.address, amount)?;
        debug!(amount, shares, "invested into vault");
        Ok(shares)
    }

    /// Redeems `value` worth of the vault position and forwards the
    /// underlying received to `recipient`.
    ///
    /// Burns `floor(value * RATE_SCALE / rate)` shares at the current
    /// rate; the amount received is floored again by the vault, so the
    /// recipient can never extract more than `value`.
    ///
    /// # Errors
    ///
    /// Returns [`InterestError::OnlyOwner`] for any caller but the owner,
    /// and [`InterestError::InsufficientVaultLiquidity`] if the manager's
    /// share position cannot cover the redemption.
    pub fn redeem(
        &self,
        caller: &str,
        value: u128,
        recipient: &str,
    ) -> Result<Redemption, InterestError> {
        self.check_owner(caller)?;

        let received = {
            let mut vault = self.vault.write();
            let rate = vault.exchange_rate();
            let shares = value_to_shares(value, rate).ok_or(InterestError::AmountOverflow)?;

            let available = vault.share_balance(&self.address);
            if shares > available {
                return Err(InterestError::InsufficientVaultLiquidity {
                    requested_shares: shares,
                    available_shares: available,
                });
            }

            let received = vault.redeem(&self.address, shares)?;
            drop(vault);

            self.asset
                .write()
                .transfer(&self.address, recipient, received)?;

            Redemption {
                shares_burned: shares,
                amount_received: received,
            }
        };

        debug!(
            value,
            shares = received.shares_burned,
            amount = received.amount_received,
            recipient = %recipient,
            "redeemed from vault"
        );
        Ok(received)
    }

    /// Claims the vault's reward accrual and forwards all of it to the
    /// fixed reward recipient. Not time-gated; zero accrual is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`InterestError::OnlyOwner`] for any caller but the owner.
    pub fn harvest_rewards(&self, caller: &str) -> Result<u128, InterestError> {
        self.check_owner(caller)?;

        let claimed = self.vault.write().claim_rewards(&self.address)?;
        if claimed == 0 {
            return Ok(0);
        }

        // The claim credits the manager on the reward-token ledger;
        // forward in full. The manager never retains any of the harvest.
        self.reward_asset
            .write()
            .transfer(&self.address, &self.reward_recipient, claimed)?;

        info!(
            amount = claimed,
            recipient = %self.reward_recipient,
            "harvested vault rewards"
        );
        Ok(claimed)
    }

    fn check_owner(&self, caller: &str) -> Result<(), InterestError> {
        if caller != self.owner {
            return Err(InterestError::OnlyOwner {
                caller: caller.to_string(),
            });
        }
        Ok(())
    }
}
