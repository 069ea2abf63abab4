// Copyright (c) 2026 Tidepool Labs. MIT License.
// See LICENSE for details.

//! # Tidepool Core
//!
//! The collaborator layer under the Tidepool pooling exchange: the fungible
//! asset ledger deposits are denominated in, the fixed-point conversion
//! math, and the external yield vault abstraction the pooled funds are
//! deployed into.
//!
//! ## Architecture
//!
//! - **math** — Scaled-integer conversion helpers. Floor everything.
//! - **asset** — Fungible asset ledger: balances, allowances, transfers.
//! - **vault** — The [`vault::YieldVault`] capability trait and the
//!   Compound-style in-process vault used by tests and simulations.
//!
//! ## Design Principles
//!
//! 1. All amounts are `u128` in smallest-unit denomination. No floating
//!    point, no decimals in arithmetic -- `decimals` is display only.
//! 2. All monetary operations use checked arithmetic; wrapping arithmetic
//!    and money do not mix.
//! 3. Operations are atomic: they apply in full or fail with no state
//!    change.
//! 4. Every public state type is serializable (serde) for persistence
//!    and snapshotting.

pub mod asset;
pub mod math;
pub mod vault;

pub use asset::{AssetError, FungibleAsset, SharedAsset};
pub use vault::{CompoundStyleVault, SharedVault, VaultError, YieldVault};
