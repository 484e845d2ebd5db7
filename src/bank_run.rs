// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Peg Collapse Simulation Suite - Bank-Run Pressure
//
// Redemption panic builds along a logistic curve in time and is converted
// into sell flow proportional to how far the stable asset is under peg.

use crate::impact::ImpactCurve;
use crate::params::Params;

/// Logistic intensity between `bank_run_low` and `bank_run_high`.
pub fn intensity(params: &Params, tick: u64) -> f64 {
    let z = (tick as f64 - params.bank_run_midpoint) / params.bank_run_timescale;
    let logistic = 1.0 / (1.0 + (-z).exp());
    params.bank_run_low + (params.bank_run_high - params.bank_run_low) * logistic
}

/// Outgoing USD sell pressure for this tick. Zero at or above peg.
pub fn sell_pressure(params: &Params, tick: u64, stable_price: f64, stable_supply: f64) -> f64 {
    if stable_price >= 1.0 {
        return 0.0;
    }
    let depeg = 1.0 - stable_price;
    let raw = intensity(params, tick) * depeg * stable_supply;
    raw.clamp(0.0, params.max_bank_run_fraction * stable_supply.max(0.0))
}

/// Apply this tick's bank-run sell flow to the stable price.
pub fn apply(
    params: &Params,
    curve: &ImpactCurve,
    tick: u64,
    stable_price: f64,
    stable_supply: f64,
    depth_usd: f64,
) -> (f64, f64) {
    let pressure = sell_pressure(params, tick, stable_price, stable_supply);
    if pressure <= 0.0 {
        return (stable_price, 0.0);
    }
    (curve.apply(stable_price, -pressure, depth_usd), pressure)
}

// ===========================================================================
// Tests
// ===========================================================================
