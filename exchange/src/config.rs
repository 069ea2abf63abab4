//! # Exchange Configuration
//!
//! The global, owner-gated configuration for a pooling exchange deployment.
//! Set exactly once at initialization; the only field that moves afterwards
//! is the trading fee rate, and only by explicit owner action. Owner
//! transfer itself happens through an external governance path and is not
//! part of this surface.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Basis-point scale: 10,000 bps = 100%.
pub const BPS_SCALE: u32 = 10_000;

/// Errors that can occur validating exchange configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A trading fee rate above 100% is never meaningful.
    #[error("trading fee rate out of range: {rate_bps} bps exceeds {max_bps}")]
    FeeRateOutOfRange {
        /// The rejected rate.
        rate_bps: u32,
        /// The maximum accepted rate ([`BPS_SCALE`]).
        max_bps: u32,
    },
}

/// Global configuration for one exchange deployment.
///
/// One underlying asset, one vault, one owner. The owner is the single
/// administrative principal; every admin operation checks the caller
/// against this field explicitly rather than relying on ambient state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// The administrative principal's address.
    pub owner: String,

    /// Trading fee in basis points. Stored and owner-gated; no operation
    /// in this crate applies it yet (see DESIGN.md).
    pub trading_fee_bps: u32,
}

impl ExchangeConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::FeeRateOutOfRange`] if the fee exceeds
    /// [`BPS_SCALE`].
    pub fn new(owner: &str, trading_fee_bps: u32) -> Result<Self, ConfigError> {
        Self::validate_fee(trading_fee_bps)?;
        Ok(Self {
            owner: owner.to_string(),
            trading_fee_bps,
        })
    }

    /// Replaces the trading fee rate after validation.
    ///
    /// Authorization is the caller's job -- this type only knows about
    /// ranges, not principals.
    pub fn set_trading_fee_bps(&mut self, rate_bps: u32) -> Result<(), ConfigError> {
        Self::validate_fee(rate_bps)?;
        self.trading_fee_bps = rate_bps;
        Ok(())
    }

    fn validate_fee(rate_bps: u32) -> Result<(), ConfigError> {
        if rate_bps > BPS_SCALE {
            return Err(ConfigError::FeeRateOutOfRange {
                rate_bps,
                max_bps: BPS_SCALE,
            });
        }
        Ok(())
    }
}
