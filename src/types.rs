// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Peg Collapse Simulation Suite - Type Definitions

use serde::{Deserialize, Serialize};

use crate::amm::AmmPool;
use crate::events::ScheduledEvent;
use crate::oracle::{PriceHistory, HISTORY_CAPACITY};
use crate::params::Params;

// ─── State ──────────────────────────────────────────────────────────────────

/// Full snapshot of the two-asset system between ticks.
///
/// Built once by [`crate::scenarios::PresetBuilder`]; each tick produces a new
/// value and never mutates the one it was given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// Completed ticks. The next call to `step` processes `tick + 1`.
    pub tick: u64,

    pub stable_price: f64,
    pub volatile_price: f64,
    pub stable_supply: f64,
    pub volatile_supply: f64,

    pub pool: AmmPool,

    pub reserve_usd: f64,
    pub reserve_usd_initial: f64,

    pub price_history: PriceHistory,
    pub pending_volatile_queue: f64,
    pub scheduled_events: Vec<ScheduledEvent>,

    /// Carried so a run is self-describing; the engine never writes it.
    pub params: Params,
}

impl State {
    /// `Ok` when every post-tick invariant holds; otherwise names the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let p = &self.params;
        if !(p.stable_min..=p.stable_max).contains(&self.stable_price) {
            return Err(format!("stable price {} outside bounds", self.stable_price));
        }
        if !(p.volatile_min..=p.volatile_max).contains(&self.volatile_price) {
            return Err(format!("volatile price {} outside bounds", self.volatile_price));
        }
        if !(self.stable_supply >= 0.0) || !(self.volatile_supply >= 0.0) {
            return Err("negative supply".to_string());
        }
        if !(self.pool.stable > 0.0) || !(self.pool.volatile > 0.0) {
            return Err("pool reserve not positive".to_string());
        }
        if !(self.reserve_usd >= 0.0) {
            return Err(format!("reserve balance {} negative", self.reserve_usd));
        }
        if self.price_history.len() > HISTORY_CAPACITY {
            return Err("price history over capacity".to_string());
        }
        if !(self.pending_volatile_queue >= 0.0) {
            return Err("pending queue negative".to_string());
        }
        Ok(())
    }

    /// Metrics for a state that has not been stepped yet (tick-0 row).
    pub fn snapshot(&self) -> TickMetrics {
        TickMetrics::derive(self, &TickActivity::default())
    }
}

// ─── Per-tick activity (orchestrator scratch) ──────────────────────────────

/// Flows recorded while the orchestrator runs a tick, before metric derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickActivity {
    pub depth_stable_usd: f64,
    pub depth_volatile_usd: f64,
    pub bank_run_intensity: f64,
    pub bank_run_sell_usd: f64,
    pub stable_minted: f64,
    pub stable_burned: f64,
    pub volatile_minted: f64,
    pub volatile_burned: f64,
    pub slippage: f64,
    pub reserve_spent: f64,
    pub queue_released: f64,
    pub events_fired: usize,
    pub pool_drain_fraction: f64,
}

// ─── TickMetrics ────────────────────────────────────────────────────────────

/// The named metric bundle emitted each tick.
///
/// This is the whole surface offered to charting and reporting consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickMetrics {
    pub tick: u64,

    pub stable_price: f64,
    pub volatile_price: f64,
    pub stable_supply: f64,
    pub volatile_supply: f64,
    pub stable_minted: f64,
    pub stable_burned: f64,
    pub volatile_minted: f64,
    pub volatile_burned: f64,

    pub pool_stable: f64,
    pub pool_volatile: f64,
    /// Volatile price implied by the pool, in stable units.
    pub amm_volatile_price_stable: f64,
    /// Volatile price implied by the pool, marked in USD.
    pub amm_volatile_price_usd: f64,
    /// Stable price minus peg.
    pub spread_stable: f64,
    /// Off-exchange volatile price minus the AMM-implied USD price.
    pub spread_volatile: f64,
    pub pool_k: f64,
    pub pool_k_relative: f64,
    pub pool_stable_share: f64,
    pub pool_drain_fraction: f64,
    pub slippage: f64,

    pub reserve_usd: f64,
    pub reserve_spent: f64,

    pub pending_volatile_queue: f64,
    pub queue_released: f64,
    pub depth_stable_usd: f64,
    pub depth_volatile_usd: f64,
    pub bank_run_intensity: f64,
    pub bank_run_sell_usd: f64,
    pub events_fired: usize,
}

impl TickMetrics {
    pub fn derive(state: &State, activity: &TickActivity) -> Self {
        let pool = &state.pool;
        let amm_stable = pool.volatile_price_in_stable();
        let amm_usd = amm_stable * state.stable_price;
        Self {
            tick: state.tick,
            stable_price: state.stable_price,
            volatile_price: state.volatile_price,
            stable_supply: state.stable_supply,
            volatile_supply: state.volatile_supply,
            stable_minted: activity.stable_minted,
            stable_burned: activity.stable_burned,
            volatile_minted: activity.volatile_minted,
            volatile_burned: activity.volatile_burned,
            pool_stable: pool.stable,
            pool_volatile: pool.volatile,
            amm_volatile_price_stable: amm_stable,
            amm_volatile_price_usd: amm_usd,
            spread_stable: state.stable_price - 1.0,
            spread_volatile: state.volatile_price - amm_usd,
            pool_k: pool.k(),
            pool_k_relative: pool.k_relative(),
            pool_stable_share: pool.stable_value_share(state.stable_price, state.volatile_price),
            pool_drain_fraction: activity.pool_drain_fraction,
            slippage: activity.slippage,
            reserve_usd: state.reserve_usd,
            reserve_spent: activity.reserve_spent,
            pending_volatile_queue: state.pending_volatile_queue,
            queue_released: activity.queue_released,
            depth_stable_usd: activity.depth_stable_usd,
            depth_volatile_usd: activity.depth_volatile_usd,
            bank_run_intensity: activity.bank_run_intensity,
            bank_run_sell_usd: activity.bank_run_sell_usd,
            events_fired: activity.events_fired,
        }
    }
}

// ─── TickResult ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct TickResult {
    pub state: State,
    pub metrics: TickMetrics,
}
