// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Peg Collapse Simulation Suite - Constant-Product AMM
//
// A single stable/volatile pool. Swaps are bounded per call so one tick can
// never drain a side, and degenerate inputs are absorbed as no-ops.

use serde::{Deserialize, Serialize};

/// Reserves are never allowed to drop below this after drain or swap.
pub const MIN_RESERVE: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Swap
// ---------------------------------------------------------------------------

/// Outcome of a single-sided swap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SwapResult {
    /// Gross input the pool took, fee included. Below `amount_in` when the
    /// trade cap binds.
    pub amount_accepted: f64,
    pub amount_out: f64,
    pub reserve_in: f64,
    pub reserve_out: f64,
    /// Output per unit of effective (post-fee, post-cap) input.
    pub effective_price: f64,
    /// `1 - effective_price / marginal_price`, never negative.
    pub slippage: f64,
}

impl SwapResult {
    fn noop(reserve_in: f64, reserve_out: f64) -> Self {
        Self {
            amount_accepted: 0.0,
            amount_out: 0.0,
            reserve_in,
            reserve_out,
            effective_price: 0.0,
            slippage: 0.0,
        }
    }

    pub fn is_noop(&self) -> bool {
        self.amount_out == 0.0
    }
}

/// Constant-product exchange of `amount_in` against the pool.
///
/// The fee is taken from the input first, then the effective input is capped
/// at `max_trade_fraction * reserve_in`. The fee portion is not deposited.
pub fn swap(
    reserve_in: f64,
    reserve_out: f64,
    amount_in: f64,
    fee: f64,
    max_trade_fraction: f64,
) -> SwapResult {
    let valid = amount_in.is_finite()
        && amount_in > 0.0
        && reserve_in.is_finite()
        && reserve_in > 0.0
        && reserve_out.is_finite()
        && reserve_out > 0.0;
    if !valid {
        return SwapResult::noop(reserve_in, reserve_out);
    }

    let after_fee = amount_in * (1.0 - fee);
    let cap = max_trade_fraction * reserve_in;
    let (effective_in, amount_accepted) = if after_fee > cap {
        (cap, cap / (1.0 - fee))
    } else {
        (after_fee, amount_in)
    };
    if !(effective_in > 0.0) {
        return SwapResult::noop(reserve_in, reserve_out);
    }

    let marginal_price = reserve_out / reserve_in;
    let amount_out = reserve_out * effective_in / (reserve_in + effective_in);
    let new_in = reserve_in + effective_in;
    let new_out = (reserve_out - amount_out).max(MIN_RESERVE);

    let effective_price = amount_out / effective_in;
    let slippage = (1.0 - effective_price / marginal_price).max(0.0);

    SwapResult {
        amount_accepted,
        amount_out,
        reserve_in: new_in,
        reserve_out: new_out,
        effective_price,
        slippage,
    }
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// Pooled reserves plus the product recorded when the run started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmmPool {
    pub stable: f64,
    pub volatile: f64,
    /// Reserve product at the run's first use; fixed for the run.
    pub k0: f64,
}

impl AmmPool {
    pub fn new(stable: f64, volatile: f64) -> Self {
        Self {
            stable,
            volatile,
            k0: stable * volatile,
        }
    }

    /// Sell volatile into the pool for stable.
    pub fn swap_volatile_for_stable(&mut self, amount: f64, fee: f64, max_frac: f64) -> SwapResult {
        let result = swap(self.volatile, self.stable, amount, fee, max_frac);
        self.volatile = result.reserve_in;
        self.stable = result.reserve_out;
        result
    }

    /// Sell stable into the pool for volatile.
    pub fn swap_stable_for_volatile(&mut self, amount: f64, fee: f64, max_frac: f64) -> SwapResult {
        let result = swap(self.stable, self.volatile, amount, fee, max_frac);
        self.stable = result.reserve_in;
        self.volatile = result.reserve_out;
        result
    }

    /// Shrink both reserves by `fraction` (LPs exiting).
    pub fn drain(&mut self, fraction: f64) {
        let keep = 1.0 - fraction.clamp(0.0, 1.0);
        self.stable = (self.stable * keep).max(MIN_RESERVE);
        self.volatile = (self.volatile * keep).max(MIN_RESERVE);
    }

    pub fn k(&self) -> f64 {
        self.stable * self.volatile
    }

    /// Current product relative to the run's starting product.
    pub fn k_relative(&self) -> f64 {
        if self.k0 > 0.0 {
            self.k() / self.k0
        } else {
            0.0
        }
    }

    /// Volatile price quoted in stable units.
    pub fn volatile_price_in_stable(&self) -> f64 {
        self.stable / self.volatile
    }

    /// Share of pool value held on the stable side, both sides marked in USD.
    pub fn stable_value_share(&self, stable_price: f64, volatile_price: f64) -> f64 {
        let stable_value = self.stable * stable_price;
        let total = stable_value + self.volatile * volatile_price;
        if total > 0.0 {
            stable_value / total
        } else {
            0.0
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn swap_preserves_product_on_effective_amounts() {
        let r = swap(1e7, 8e8, 1e5, 0.003, 0.5);
        let effective_in = 1e5 * 0.997;
        assert_relative_eq!(r.reserve_in, 1e7 + effective_in);
        assert_eq!(r.amount_accepted, 1e5);
        assert_relative_eq!(r.reserve_in * r.reserve_out, 1e7 * 8e8, max_relative = 1e-12);
        assert!(r.amount_out > 0.0);
        assert!(r.slippage > 0.0 && r.slippage < 1.0);
    }

    #[test]
    fn non_positive_amount_is_noop() {
        for amount in [0.0, -5.0, f64::NAN] {
            let r = swap(100.0, 200.0, amount, 0.003, 0.5);
            assert_eq!(r.amount_out, 0.0);
            assert_eq!(r.reserve_in, 100.0);
            assert_eq!(r.reserve_out, 200.0);
            assert!(r.is_noop());
        }
    }

    #[test]
    fn degenerate_reserves_are_noop() {
        let r = swap(0.0, 200.0, 10.0, 0.003, 0.5);
        assert!(r.is_noop());
        assert_eq!(r.reserve_in, 0.0);
        let r = swap(100.0, -1.0, 10.0, 0.003, 0.5);
        assert!(r.is_noop());
    }

    #[test]
    fn input_is_capped_by_trade_fraction() {
        let r = swap(100.0, 100.0, 1e9, 0.0, 0.25);
        assert_relative_eq!(r.reserve_in, 125.0);
        assert_relative_eq!(r.amount_out, 20.0);
        assert_relative_eq!(r.amount_accepted, 25.0);

        let r = swap(100.0, 100.0, 1e9, 0.2, 0.25);
        assert_relative_eq!(r.amount_accepted * 0.8, 25.0, max_relative = 1e-12);
        assert!(r.reserve_out > 0.0);
    }

    #[test]
    fn large_trades_keep_reserves_positive_with_nonnegative_slippage() {
        for amount in [1e-6, 1.0, 1e6, 1e12, 1e300] {
            let r = swap(1e7, 8e8, amount, 0.003, 1.0);
            assert!(r.reserve_in > 0.0 && r.reserve_out > 0.0);
            assert!(r.slippage >= 0.0);
        }
    }

    #[test]
    fn pool_swaps_update_both_sides() {
        let mut pool = AmmPool::new(8e8, 1e7);
        let r = pool.swap_volatile_for_stable(1e5, 0.003, 0.5);
        assert_eq!(pool.volatile, r.reserve_in);
        assert_eq!(pool.stable, r.reserve_out);
        assert!(pool.volatile_price_in_stable() < 80.0);

        let r = pool.swap_stable_for_volatile(1e6, 0.003, 0.5);
        assert_eq!(pool.stable, r.reserve_in);
        assert_eq!(pool.volatile, r.reserve_out);
    }

    #[test]
    fn drain_scales_both_reserves_and_k_relative() {
        let mut pool = AmmPool::new(8e8, 1e7);
        pool.drain(0.1);
        assert_relative_eq!(pool.stable, 7.2e8);
        assert_relative_eq!(pool.volatile, 9e6);
        assert_relative_eq!(pool.k_relative(), 0.81, max_relative = 1e-12);
        assert_eq!(pool.k0, 8e8 * 1e7);
    }

    #[test]
    fn value_share_is_half_at_fair_marks() {
        let pool = AmmPool::new(8e8, 1e7);
        assert_relative_eq!(pool.stable_value_share(1.0, 80.0), 0.5);
    }
}
