// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Peg Collapse Simulation Suite - Simulation Core

use std::ops::ControlFlow;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wasm_bindgen::prelude::*;

use crate::arbitrage;
use crate::bank_run;
use crate::events::{self, validate_events};
use crate::liquidity::{self, Depth};
use crate::params::{ConfigError, Params};
use crate::queue;
use crate::reserve;
use crate::scenarios::ScenarioPreset;
use crate::types::{State, TickActivity, TickMetrics, TickResult};

// ─── Pure transition ─────────────────────────────────────────────────────────

/// Advance one tick. `prev` is never modified.
///
/// Stage order is fixed: noise, depth, bank run, arbitrage, reserve, queue,
/// events, drain, clamp. The only randomness is the noise stage, and it draws
/// nothing for a zero noise width.
pub fn step<R: Rng + ?Sized>(prev: &State, rng: &mut R) -> TickResult {
    let params = &prev.params;
    let tick = prev.tick + 1;
    let mut next = prev.clone();
    let mut activity = TickActivity::default();
    let stable_curve = params.stable_curve();
    let volatile_curve = params.volatile_curve();

    // 1. Noise
    next.stable_price *= 1.0 + noise(rng, params.noise_stable);
    next.volatile_price *= 1.0 + noise(rng, params.noise_volatile);

    // 2. Depth, frozen for the rest of the tick
    let depth = Depth::compute(params, tick, next.stable_price);
    activity.depth_stable_usd = depth.stable_usd;
    activity.depth_volatile_usd = depth.volatile_usd;

    // 3. Bank run
    activity.bank_run_intensity = bank_run::intensity(params, tick);
    let (stable_price, sold) = bank_run::apply(
        params,
        &stable_curve,
        tick,
        next.stable_price,
        next.stable_supply,
        depth.stable_usd,
    );
    next.stable_price = stable_price;
    activity.bank_run_sell_usd = sold;

    // 4. Mint/burn arbitrage against the delayed oracle
    let oracle_price = prev
        .price_history
        .delayed(params.oracle_delay, next.volatile_price);
    let arb = arbitrage::apply(params, oracle_price, &mut next);
    activity.stable_minted = arb.stable_minted;
    activity.stable_burned = arb.stable_burned;
    activity.volatile_minted = arb.volatile_minted;
    activity.volatile_burned = arb.volatile_burned;
    activity.slippage = arb.slippage.unwrap_or(0.0);

    // 5. Defense reserve
    let defense = reserve::defend(
        params,
        &stable_curve,
        next.stable_price,
        next.reserve_usd,
        next.reserve_usd_initial,
        depth.stable_usd,
    );
    next.stable_price = defense.stable_price;
    next.reserve_usd = defense.reserve_after;
    activity.reserve_spent = defense.spent;

    // 6. Delayed sell queue
    let released = queue::release(
        &volatile_curve,
        next.pending_volatile_queue,
        params.queue_release_rate,
        next.volatile_price,
        depth.volatile_usd,
    );
    next.pending_volatile_queue = released.pending_after;
    next.volatile_price = released.volatile_price;
    activity.queue_released = released.released;

    // 7. Scheduled events, netted per asset
    let flows = events::net_flows(&next.scheduled_events, tick);
    if flows.stable_usd != 0.0 {
        next.stable_price = stable_curve.apply(next.stable_price, flows.stable_usd, depth.stable_usd);
    }
    if flows.volatile_usd != 0.0 {
        next.volatile_price =
            volatile_curve.apply(next.volatile_price, flows.volatile_usd, depth.volatile_usd);
    }
    activity.events_fired = flows.fired;

    // 8. LP drain
    let drain = liquidity::drain_fraction(params, next.stable_price);
    if drain > 0.0 {
        next.pool.drain(drain);
    }
    activity.pool_drain_fraction = drain;

    // 9. Clamp and record
    next.stable_price = params.clamp_stable(next.stable_price);
    next.volatile_price = params.clamp_volatile(next.volatile_price);
    next.stable_supply = next.stable_supply.max(0.0);
    next.volatile_supply = next.volatile_supply.max(0.0);
    next.price_history.push(next.volatile_price);
    next.tick = tick;

    let metrics = TickMetrics::derive(&next, &activity);
    tracing::debug!(
        tick,
        stable_price = next.stable_price,
        volatile_price = next.volatile_price,
        reserve_usd = next.reserve_usd,
        pending = next.pending_volatile_queue,
        "tick complete"
    );

    TickResult {
        state: next,
        metrics,
    }
}

fn noise<R: Rng + ?Sized>(rng: &mut R, width: f64) -> f64 {
    if width > 0.0 {
        rng.gen_range(-width..=width)
    } else {
        0.0
    }
}

// ─── Session ─────────────────────────────────────────────────────────────────

/// A run in progress: the current state plus the generator feeding its noise.
///
/// Sessions share nothing, so independent runs can proceed on separate threads.
#[derive(Debug, Clone)]
pub struct Session {
    state: State,
    rng: ChaCha8Rng,
    seed: u64,
}

impl Session {
    pub fn new(preset: &ScenarioPreset, params: Params, seed: u64) -> Result<Self, ConfigError> {
        let state = preset.build(params)?;
        tracing::info!(preset = %preset.name, seed, events = preset.events.len(), "session started");
        Ok(Self::seeded(state, seed))
    }

    /// Resume from a state built or edited by hand. The state's parameters,
    /// events and invariants are checked the same way a preset's are.
    pub fn from_state(state: State, seed: u64) -> Result<Self, ConfigError> {
        state.params.validate()?;
        validate_events(&state.scheduled_events)?;
        state
            .check_invariants()
            .map_err(ConfigError::InvalidInitialState)?;
        Ok(Self::seeded(state, seed))
    }

    fn seeded(state: State, seed: u64) -> Self {
        Self {
            state,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn step(&mut self) -> TickMetrics {
        let TickResult { state, metrics } = step(&self.state, &mut self.rng);
        self.state = state;
        metrics
    }

    /// Step up to `max_ticks` times, handing each tick's metrics to `on_tick`.
    ///
    /// Returning `ControlFlow::Break` stops the run after the current tick; the
    /// state stays consistent and the session can be resumed.
    pub fn run<F>(&mut self, max_ticks: u64, mut on_tick: F) -> Vec<TickMetrics>
    where
        F: FnMut(&TickMetrics) -> ControlFlow<()>,
    {
        let mut trajectory = Vec::new();
        for _ in 0..max_ticks {
            let metrics = self.step();
            let flow = on_tick(&metrics);
            trajectory.push(metrics);
            if flow.is_break() {
                tracing::info!(tick = self.state.tick, "run stopped early");
                break;
            }
        }
        trajectory
    }
}

// ─── Simulation struct (JS surface) ──────────────────────────────────────────

#[wasm_bindgen]
pub struct Simulation {
    pub(crate) session: Session,
    pub(crate) preset: ScenarioPreset,
    pub(crate) params: Params,
    /// Metrics of the latest tick, or the tick-0 snapshot before the first step.
    pub(crate) last_metrics: TickMetrics,
}

// ─── Internal Logic (Testable, pure Rust) ────────────────────────────────────

impl Simulation {
    pub fn try_new(preset: ScenarioPreset, params: Params, seed: u64) -> Result<Self, ConfigError> {
        let session = Session::new(&preset, params.clone(), seed)?;
        let last_metrics = session.state().snapshot();
        Ok(Self {
            session,
            preset,
            params,
            last_metrics,
        })
    }

    pub fn tick_core(&mut self) -> TickMetrics {
        let metrics = self.session.step();
        self.last_metrics = metrics.clone();
        metrics
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn last_metrics(&self) -> &TickMetrics {
        &self.last_metrics
    }

    /// Rebuild from the original preset and seed.
    pub fn reset_core(&mut self) -> Result<(), ConfigError> {
        self.session = Session::new(&self.preset, self.params.clone(), self.session.seed())?;
        self.last_metrics = self.session.state().snapshot();
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventKind, ScheduledEvent};
    use crate::scenarios::{self, PresetBuilder};

    fn quiet_state() -> State {
        PresetBuilder::new()
            .pool(800_000_000.0, 10_000_000.0)
            .build(Params::without_noise())
            .expect("test: preset builds")
    }

    #[test]
    fn step_does_not_modify_input() {
        let state = scenarios::terra_may_2022()
            .build(Params::default())
            .expect("test: preset builds");
        let before = state.clone();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let result = step(&state, &mut rng);
        assert_eq!(state, before);
        assert_eq!(result.state.tick, 1);
        assert_eq!(result.metrics.tick, 1);
    }

    #[test]
    fn peg_without_noise_is_a_fixed_point() {
        let state = quiet_state();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let next = step(&state, &mut rng).state;
        assert_eq!(next.stable_price, state.stable_price);
        assert_eq!(next.volatile_price, state.volatile_price);
        assert_eq!(next.stable_supply, state.stable_supply);
        assert_eq!(next.volatile_supply, state.volatile_supply);
        assert_eq!(next.pool, state.pool);
        assert_eq!(next.reserve_usd, state.reserve_usd);
        assert_eq!(next.pending_volatile_queue, 0.0);
        assert_eq!(next.price_history.len(), state.price_history.len() + 1);
    }

    #[test]
    fn zero_noise_draws_nothing_from_rng() {
        let state = quiet_state();
        let mut used = ChaCha8Rng::seed_from_u64(9);
        step(&state, &mut used);
        let mut fresh = ChaCha8Rng::seed_from_u64(9);
        assert_eq!(used.gen::<u64>(), fresh.gen::<u64>());
    }

    #[test]
    fn stable_shock_triggers_arbitrage_and_reserve() {
        let state = PresetBuilder::new()
            .pool(800_000_000.0, 10_000_000.0)
            .event(ScheduledEvent::new(1, EventKind::SellStable, 2.5e8))
            .build(Params::without_noise())
            .expect("test: preset builds");
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let first = step(&state, &mut rng);
        assert_eq!(first.metrics.events_fired, 1);
        assert!(first.state.stable_price < 1.0);
        assert!(first.metrics.pool_drain_fraction > 0.0);

        let second = step(&first.state, &mut rng);
        assert!(second.metrics.stable_burned > 0.0);
        assert!(second.metrics.volatile_minted > 0.0);
        assert!(second.state.pending_volatile_queue > 0.0);
        assert!(second.metrics.reserve_spent > 0.0);
        assert!(second.state.reserve_usd < first.state.reserve_usd);
    }

    #[test]
    fn from_state_rejects_what_a_preset_would() {
        let mut state = quiet_state();
        state.params.oracle_delay = usize::MAX;
        assert!(matches!(
            Session::from_state(state, 0),
            Err(ConfigError::OracleDelayTooLong { .. })
        ));

        let mut state = quiet_state();
        state.scheduled_events.push(ScheduledEvent::new(1, EventKind::SellStable, f64::NAN));
        assert!(matches!(
            Session::from_state(state, 0),
            Err(ConfigError::InvalidEvent { index: 0, .. })
        ));

        let mut state = quiet_state();
        state.reserve_usd = -1.0;
        assert!(matches!(
            Session::from_state(state, 0),
            Err(ConfigError::InvalidInitialState(_))
        ));

        assert!(Session::from_state(quiet_state(), 0).is_ok());
    }

    #[test]
    fn run_stops_when_observer_breaks() {
        let mut session = Session::new(&scenarios::calm_peg(), Params::default(), 3)
            .expect("test: session builds");
        let trajectory = session.run(100, |m| {
            if m.tick == 5 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(trajectory.len(), 5);
        assert_eq!(trajectory.last().map(|m| m.tick), Some(5));
        assert_eq!(session.state().tick, 5);
        assert!(session.state().check_invariants().is_ok());
    }

    #[test]
    fn reset_replays_identically() {
        let mut sim = Simulation::try_new(scenarios::terra_may_2022(), Params::default(), 11)
            .expect("test: simulation builds");
        let first: Vec<_> = (0..30).map(|_| sim.tick_core()).collect();
        sim.reset_core().expect("test: reset");
        assert_eq!(sim.session().state().tick, 0);
        let second: Vec<_> = (0..30).map(|_| sim.tick_core()).collect();
        assert_eq!(first, second);
    }
}
