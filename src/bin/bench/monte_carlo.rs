// Monte Carlo Infrastructure: N runs per preset with statistical aggregation
// Each preset runs N times with seeds base..base+N, computing mean ± 95% CI

use std::time::Instant;

use depeg_engine::ledger::{InMemoryLedger, MirrorMode, PriceMirror};
use depeg_engine::{Params, ScenarioPreset, Session};

use crate::metrics::{CollapseTracker, InvariantAudit};
use crate::report::*;
use crate::time_series::TimeSeriesRecorder;

/// Options shared by every run of the suite.
pub struct RunOptions<'a> {
    pub params: &'a Params,
    pub ticks: u64,
    pub mirror: bool,
    pub time_series_dir: Option<&'a std::path::Path>,
}

/// Run a single preset iteration with a specific seed.
pub fn run_single(preset: &ScenarioPreset, seed: u64, opts: &RunOptions) -> Result<BenchResult, String> {
    let start = Instant::now();
    let mut session = Session::new(preset, opts.params.clone(), seed).map_err(|e| e.to_string())?;
    let initial_volatile_supply = session.state().volatile_supply;

    let mut collapse = CollapseTracker::new();
    let mut audit = InvariantAudit::new();
    audit.record_tick(session.state());
    let mut time_series = opts.time_series_dir.map(|_| TimeSeriesRecorder::new());
    let mut mirror = opts
        .mirror
        .then(|| PriceMirror::new(InMemoryLedger::new(), MirrorMode::AwaitConfirmation));

    for _ in 0..opts.ticks {
        let metrics = session.step();
        collapse.record_tick(&metrics);
        audit.record_tick(session.state());
        if let Some(ts) = time_series.as_mut() {
            ts.record(&metrics);
        }
        if let Some(m) = mirror.as_mut() {
            m.publish(&metrics);
        }
    }

    // Write time series if enabled
    if let (Some(ts), Some(dir)) = (&time_series, opts.time_series_dir) {
        let path = dir.join(format!("seed-{}.jsonl", seed));
        if let Err(e) = ts.write_jsonl(&path) {
            eprintln!("  Warning: failed to write time series: {}", e);
        }
    }

    let elapsed = start.elapsed();
    let elapsed_secs = elapsed.as_secs_f64().max(0.001);
    let state = session.state();

    Ok(BenchResult {
        preset: preset.name.clone(),
        seed,
        pass: audit.violations == 0,
        ticks: state.tick,
        invariant_violations: audit.violations,
        first_violation: audit.first,
        terminal_stable_price: state.stable_price,
        terminal_volatile_price: state.volatile_price,
        min_stable_price: collapse.min_stable_price.min(state.stable_price),
        first_tick_below_090: collapse.first_tick_below,
        reserve_exhausted_tick: collapse.reserve_exhausted_tick,
        terminal_volatile_supply: state.volatile_supply,
        volatile_supply_multiple: if initial_volatile_supply > 0.0 {
            state.volatile_supply / initial_volatile_supply
        } else {
            0.0
        },
        terminal_reserve_usd: state.reserve_usd,
        terminal_pool_k_relative: state.pool.k_relative(),
        peak_pending_queue: collapse.peak_pending_queue,
        mirror_published: mirror.as_ref().map_or(0, |m| m.published()),
        mirror_failures: mirror.as_ref().map_or(0, |m| m.failures()),
        elapsed_ms: elapsed.as_millis(),
        throughput_per_sec: state.tick as f64 / elapsed_secs,
    })
}

/// Run Monte Carlo: N runs of a preset, aggregate stats.
pub fn run_monte_carlo(
    preset: &ScenarioPreset,
    n_runs: usize,
    base_seed: u64,
    opts: &RunOptions,
) -> Result<MonteCarloReport, String> {
    let ts_dir = opts.time_series_dir.map(|base| base.join(preset.name.to_lowercase()));
    let run_opts = RunOptions {
        params: opts.params,
        ticks: opts.ticks,
        mirror: opts.mirror,
        time_series_dir: ts_dir.as_deref(),
    };

    let mut results = Vec::with_capacity(n_runs);
    for i in 0..n_runs {
        let seed = base_seed + i as u64;
        results.push(run_single(preset, seed, &run_opts)?);
    }

    Ok(aggregate(preset, results))
}

/// Aggregate individual runs into a MonteCarloReport.
fn aggregate(preset: &ScenarioPreset, results: Vec<BenchResult>) -> MonteCarloReport {
    let n = results.len();
    let passed = results.iter().filter(|r| r.pass).count();
    let pass_rate = if n > 0 { passed as f64 / n as f64 } else { 0.0 };

    let stats = |f: fn(&BenchResult) -> f64| {
        Stats::from_samples(&results.iter().map(f).collect::<Vec<_>>())
    };
    let below: Vec<Option<u64>> = results.iter().map(|r| r.first_tick_below_090).collect();
    let exhausted: Vec<Option<u64>> = results.iter().map(|r| r.reserve_exhausted_tick).collect();

    MonteCarloReport {
        preset: preset.name.clone(),
        n_runs: n,
        pass_rate,
        terminal_stable_price: stats(|r| r.terminal_stable_price),
        min_stable_price: stats(|r| r.min_stable_price),
        first_tick_below_090: Stats::from_optional(&below),
        runs_below_090: below.iter().flatten().count(),
        reserve_exhausted_tick: Stats::from_optional(&exhausted),
        runs_reserve_exhausted: exhausted.iter().flatten().count(),
        terminal_volatile_supply: stats(|r| r.terminal_volatile_supply),
        volatile_supply_multiple: stats(|r| r.volatile_supply_multiple),
        terminal_pool_k_relative: stats(|r| r.terminal_pool_k_relative),
        elapsed_ms: stats(|r| r.elapsed_ms as f64),
        throughput_per_sec: stats(|r| r.throughput_per_sec),
        individual_runs: results,
    }
}
