//! # Fixed-Point Conversion Math
//!
//! Every monetary quantity in Tidepool is a `u128` in smallest-unit
//! denomination, and the vault exchange rate is a scaled integer where
//! [`RATE_SCALE`] represents exactly 1.0. No floating point, anywhere --
//! floats and money do not mix.
//!
//! All conversions floor. This is a deliberate anti-leakage bias: rounding
//! dust stays inside the vault rather than being extractable by a caller
//! who picks adversarial amounts. Ceiling or nearest-rounding a
//! multiply-then-divide is how value leaks out of pooled ledgers one base
//! unit at a time.

/// Scale factor for exchange rates. A rate of `RATE_SCALE` means one vault
/// share redeems for exactly one unit of the underlying asset.
pub const RATE_SCALE: u128 = 1_000_000_000_000_000_000; // 1e18

/// Computes `floor(a * b / denom)` with checked multiplication.
///
/// Returns `None` if the intermediate product overflows `u128` or if
/// `denom` is zero. Callers map `None` to their own overflow error --
/// a `None` here means the operation must abort, never saturate.
pub fn mul_div_floor(a: u128, b: u128, denom: u128) -> Option<u128> {
    if denom == 0 {
        return None;
    }
    a.checked_mul(b).map(|product| product / denom)
}

/// Converts an asset amount to vault shares at the given exchange rate:
/// `floor(amount * RATE_SCALE / rate)`.
pub fn value_to_shares(amount: u128, rate: u128) -> Option<u128> {
    mul_div_floor(amount, RATE_SCALE, rate)
}

/// Converts vault shares to their redeemable asset value at the given
/// exchange rate: `floor(shares * rate / RATE_SCALE)`.
pub fn shares_to_value(shares: u128, rate: u128) -> Option<u128> {
    mul_div_floor(shares, rate, RATE_SCALE)
}
