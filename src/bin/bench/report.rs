// Benchmark Report Types
// Structured output for independent analysis of collapse trajectories

use serde::Serialize;

// ─── Statistics (per-metric Monte Carlo aggregation) ────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct Stats {
    pub mean: f64,
    pub std_dev: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
    pub min: f64,
    pub max: f64,
    pub n: usize,
}

impl Stats {
    pub fn from_samples(samples: &[f64]) -> Self {
        let n = samples.len();
        if n == 0 {
            return Self { mean: 0.0, std_dev: 0.0, ci_lower: 0.0, ci_upper: 0.0, min: 0.0, max: 0.0, n: 0 };
        }
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = if n > 1 {
            samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
        } else {
            0.0
        };
        let std_dev = variance.sqrt();
        let stderr = std_dev / (n as f64).sqrt();
        let z = 1.96; // 95% CI
        Self {
            mean,
            std_dev,
            ci_lower: mean - z * stderr,
            ci_upper: mean + z * stderr,
            min: samples.iter().cloned().fold(f64::INFINITY, f64::min),
            max: samples.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            n,
        }
    }

    /// Stats over the runs where an event happened at all.
    pub fn from_optional(samples: &[Option<u64>]) -> Self {
        let hits: Vec<f64> = samples.iter().flatten().map(|&t| t as f64).collect();
        Self::from_samples(&hits)
    }
}

// ─── Single-Run Result ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct BenchResult {
    pub preset: String,
    pub seed: u64,
    pub pass: bool,
    pub ticks: u64,
    pub invariant_violations: u32,
    pub first_violation: Option<String>,
    pub terminal_stable_price: f64,
    pub terminal_volatile_price: f64,
    pub min_stable_price: f64,
    pub first_tick_below_090: Option<u64>,
    pub reserve_exhausted_tick: Option<u64>,
    pub terminal_volatile_supply: f64,
    pub volatile_supply_multiple: f64,
    pub terminal_reserve_usd: f64,
    pub terminal_pool_k_relative: f64,
    pub peak_pending_queue: f64,
    pub mirror_published: u64,
    pub mirror_failures: u64,
    pub elapsed_ms: u128,
    pub throughput_per_sec: f64,
}

// ─── Monte Carlo Report (per-preset aggregation) ────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct MonteCarloReport {
    pub preset: String,
    pub n_runs: usize,
    pub pass_rate: f64,
    pub terminal_stable_price: Stats,
    pub min_stable_price: Stats,
    /// Over runs that crossed below 0.90.
    pub first_tick_below_090: Stats,
    pub runs_below_090: usize,
    /// Over runs that emptied the reserve.
    pub reserve_exhausted_tick: Stats,
    pub runs_reserve_exhausted: usize,
    pub terminal_volatile_supply: Stats,
    pub volatile_supply_multiple: Stats,
    pub terminal_pool_k_relative: Stats,
    pub elapsed_ms: Stats,
    pub throughput_per_sec: Stats,
    pub individual_runs: Vec<BenchResult>,
}

// ─── Top-Level Report ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct BenchReport {
    pub timestamp: String,
    pub version: &'static str,
    pub prng: &'static str,
    pub n_runs_per_preset: usize,
    pub ticks_per_run: u64,
    pub params: depeg_engine::Params,
    pub summary: Summary,
    pub presets: Vec<MonteCarloReport>,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub pass_rate: f64,
}
