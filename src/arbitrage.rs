// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Peg Collapse Simulation Suite - Mint/Burn Arbitrage
//
// Below peg, stable is redeemed for freshly minted volatile priced at the
// stale oracle; part of the mint hits the AMM at once, the rest waits in the
// delayed sell queue. Above peg, volatile is burned to mint stable under
// tighter caps. The two branches are mutually exclusive and neither fires at
// exactly 1.0.

use serde::{Deserialize, Serialize};

use crate::params::Params;
use crate::types::State;

/// Largest share of the pool's input-side reserve a single arbitrage swap may use.
pub const POOL_SWAP_CAP: f64 = 0.95;

/// Supply changes and routing produced by one tick of arbitrage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageOutcome {
    pub stable_minted: f64,
    pub stable_burned: f64,
    pub volatile_minted: f64,
    pub volatile_burned: f64,
    /// Amount the AMM actually took (volatile below peg, stable above).
    pub swapped_into_pool: f64,
    /// Volatile pushed onto the delayed sell queue.
    pub queued: f64,
    /// Slippage of this tick's swap, if one executed.
    pub slippage: Option<f64>,
}

/// Run whichever branch the stable price selects, mutating `state` in place.
///
/// `oracle_price` is the delayed volatile price used to value mint and burn.
pub fn apply(params: &Params, oracle_price: f64, state: &mut State) -> ArbitrageOutcome {
    if state.stable_price < 1.0 {
        contract(params, oracle_price, state)
    } else if state.stable_price > 1.0 {
        expand(params, oracle_price, state)
    } else {
        ArbitrageOutcome::default()
    }
}

/// Below peg: burn stable, mint volatile.
fn contract(params: &Params, oracle_price: f64, state: &mut State) -> ArbitrageOutcome {
    let mut outcome = ArbitrageOutcome::default();
    let depeg = 1.0 - state.stable_price;
    let supply = state.stable_supply;
    let redeem = (params.redeem_alpha * depeg * supply).clamp(0.0, params.max_redeem_fraction * supply);
    if !(redeem > 0.0) || !(oracle_price > 0.0) {
        return outcome;
    }

    let minted = (redeem / oracle_price).min(params.max_mint_fraction * state.volatile_supply);
    state.stable_supply = (state.stable_supply - redeem).max(0.0);
    state.volatile_supply += minted;
    outcome.stable_burned = redeem;
    outcome.volatile_minted = minted;

    let to_pool = (minted * (1.0 - params.queue_split)).min(POOL_SWAP_CAP * state.pool.volatile);
    let to_queue = (minted - to_pool).max(0.0);

    let swap = state
        .pool
        .swap_volatile_for_stable(to_pool, params.amm_fee, params.max_trade_fraction);
    if !swap.is_noop() {
        outcome.swapped_into_pool = swap.amount_accepted;
        outcome.slippage = Some(swap.slippage);
    }

    state.pending_volatile_queue += to_queue;
    outcome.queued = to_queue;
    outcome
}

/// Above peg: burn volatile, mint stable.
fn expand(params: &Params, oracle_price: f64, state: &mut State) -> ArbitrageOutcome {
    let mut outcome = ArbitrageOutcome::default();
    let premium = state.stable_price - 1.0;
    let supply = state.stable_supply;
    let budget_cap = params.expansion_scale * params.max_redeem_fraction * supply;
    let budget = (params.redeem_alpha * premium * supply).clamp(0.0, budget_cap);
    if !(budget > 0.0) || !(oracle_price > 0.0) {
        return outcome;
    }

    let burn_cap = params.expansion_scale * params.max_mint_fraction * state.volatile_supply;
    let burned = (budget / oracle_price).min(burn_cap);
    let minted = burned * oracle_price;
    state.volatile_supply = (state.volatile_supply - burned).max(0.0);
    state.stable_supply += minted;
    outcome.volatile_burned = burned;
    outcome.stable_minted = minted;

    let to_pool = minted.min(POOL_SWAP_CAP * state.pool.stable);
    let swap = state
        .pool
        .swap_stable_for_volatile(to_pool, params.amm_fee, params.max_trade_fraction);
    if !swap.is_noop() {
        outcome.swapped_into_pool = swap.amount_accepted;
        outcome.slippage = Some(swap.slippage);
    }
    outcome
}

// ===========================================================================
// Tests
// ===========================================================================
