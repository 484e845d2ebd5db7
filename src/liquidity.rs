// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Peg Collapse Simulation Suite - Liquidity Depth & LP Drain
//
// Off-exchange depth thins with time and with distrust; pool LPs leave as the
// stable asset trades further under peg.

use serde::{Deserialize, Serialize};

use crate::params::Params;

/// Depth multiplier floor reached at very large depeg.
const DEPEG_DEPTH_FLOOR: f64 = 0.7;
/// Depeg scale of the distrust decay.
const DEPEG_DEPTH_SCALE: f64 = 0.15;
/// Largest fraction of pool reserves that may leave in one tick.
const MAX_DRAIN_PER_TICK: f64 = 0.25;

/// Usable off-exchange depth for this tick, per asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Depth {
    pub stable_usd: f64,
    pub volatile_usd: f64,
}

impl Depth {
    pub fn compute(params: &Params, tick: u64, stable_price: f64) -> Self {
        let factor = time_decay(tick, params.depth_halflife_ticks) * depeg_decay(depeg(stable_price));
        Self {
            stable_usd: (params.depth_stable_usd * factor).max(params.min_depth_usd),
            volatile_usd: (params.depth_volatile_usd * factor).max(params.min_depth_usd),
        }
    }
}

/// `0.5^(tick / halflife)`.
pub fn time_decay(tick: u64, halflife: f64) -> f64 {
    if halflife <= 0.0 {
        return 1.0;
    }
    0.5f64.powf(tick as f64 / halflife)
}

/// `0.7 + 0.3 * exp(-depeg / 0.15)`: 1.0 at peg, approaching 0.7.
pub fn depeg_decay(depeg: f64) -> f64 {
    DEPEG_DEPTH_FLOOR + (1.0 - DEPEG_DEPTH_FLOOR) * (-depeg.abs() / DEPEG_DEPTH_SCALE).exp()
}

/// Absolute distance from the 1.0 peg.
pub fn depeg(stable_price: f64) -> f64 {
    (1.0 - stable_price).abs()
}

/// Per-tick LP withdrawal fraction. Zero at or above peg.
pub fn drain_fraction(params: &Params, stable_price: f64) -> f64 {
    if stable_price >= 1.0 {
        return 0.0;
    }
    let below = 1.0 - stable_price;
    (params.drain_base + params.drain_slope * below).clamp(0.0, MAX_DRAIN_PER_TICK)
}

// ===========================================================================
// Tests
// ===========================================================================
