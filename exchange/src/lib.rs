// Copyright (c) 2026 Tidepool Labs. MIT License.
// See LICENSE for details.

//! # Tidepool Exchange
//!
//! A custodial pooling ledger: third parties deposit a fungible asset into
//! a named beneficiary's wallet pool, the pooled funds are deployed into
//! an external yield vault, and the beneficiary accrues whatever interest
//! the vault's exchange rate reports. Withdrawals pay accrued interest
//! before touching principal.
//!
//! ## Architecture
//!
//! - **config** — Global owner/fee configuration, set once at initialize.
//! - **interest** — The vault adapter: asset-to-share conversion, owner
//!   gating, reward harvesting.
//! - **pool** — The wallet ledger: per-wallet principal/share accounting,
//!   deposit/withdraw policy, interest-first ordering.
//!
//! ## Design Principles
//!
//! 1. All monetary operations use checked arithmetic and floor rounding;
//!    rounding dust accumulates in the vault, never in a caller's pocket.
//! 2. Authorization is explicit: every mutating operation names its
//!    caller, and each check compares against a concrete principal.
//! 3. Pool state is updated before any external asset or vault call, and
//!    restored on failure -- operations commit in full or not at all.
//! 4. The vault is an opaque oracle. Its rate can fall; nothing here
//!    breaks when it does.

pub mod config;
pub mod interest;
pub mod pool;

pub use config::{ConfigError, ExchangeConfig, BPS_SCALE};
pub use interest::{InterestError, InterestManager, Redemption};
pub use pool::{
    DepositReceipt, ExchangeError, PoolExchange, WalletPool, WithdrawReceipt,
};
