// Peg Collapse Benchmark Runner v1.0.0
// Monte Carlo over the built-in presets, seedable PRNG, per-tick audit trail
//
// Usage:
//   cargo run --release --bin bench                        # All presets (30 runs each)
//   cargo run --release --bin bench -- --runs 5            # Quick mode (5 runs each)
//   cargo run --release --bin bench -- terra               # Filter by name
//   cargo run --release --bin bench -- --ticks 400         # Longer horizon
//   cargo run --release --bin bench -- --params p.json     # Parameter overrides
//   cargo run --release --bin bench -- --time-series       # Enable JSONL output
//   cargo run --release --bin bench -- --mirror            # Mirror prices to an in-memory ledger
//   cargo run --release --bin bench -- --seed 42           # Custom base seed

mod metrics;
mod monte_carlo;
mod report;
mod time_series;

use depeg_engine::{scenarios, Params, ScenarioPreset};
use monte_carlo::RunOptions;
use report::*;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

// ─── CLI Parsing ────────────────────────────────────────────────────────────

struct CliArgs {
    runs: usize,
    seed: u64,
    ticks: u64,
    params_path: Option<String>,
    time_series: bool,
    mirror: bool,
    filter: Option<String>,
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let mut cli = CliArgs {
        runs: 30,
        seed: 0,
        ticks: 200,
        params_path: None,
        time_series: false,
        mirror: false,
        filter: None,
    };

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--runs" => {
                i += 1;
                if i < args.len() {
                    cli.runs = args[i].parse().unwrap_or(30);
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    cli.seed = args[i].parse().unwrap_or(0);
                }
            }
            "--ticks" => {
                i += 1;
                if i < args.len() {
                    cli.ticks = args[i].parse().unwrap_or(200);
                }
            }
            "--params" => {
                i += 1;
                if i < args.len() {
                    cli.params_path = Some(args[i].clone());
                }
            }
            "--time-series" => {
                cli.time_series = true;
            }
            "--mirror" => {
                cli.mirror = true;
            }
            arg if !arg.starts_with('-') => {
                cli.filter = Some(arg.to_string());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
            }
        }
        i += 1;
    }

    cli
}

fn load_params(path: Option<&str>) -> Result<Params, String> {
    match path {
        None => Ok(Params::default()),
        Some(p) => {
            let json = std::fs::read_to_string(p).map_err(|e| format!("{}: {}", p, e))?;
            Params::from_json_overrides(&json).map_err(|e| format!("{}: {}", p, e))
        }
    }
}

fn fmt_tick(stats: &Stats) -> String {
    if stats.n == 0 {
        "-".to_string()
    } else {
        format!("{:.0}", stats.mean)
    }
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    let cli = parse_args();

    let params = match load_params(cli.params_path.as_deref()) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Invalid parameters: {}", e);
            std::process::exit(2);
        }
    };

    let all_presets = scenarios::all();
    let to_run: Vec<&ScenarioPreset> = match &cli.filter {
        Some(f) => {
            let f_lower = f.to_lowercase();
            all_presets.iter()
                .filter(|p| p.name.to_lowercase().contains(&f_lower))
                .collect()
        }
        None => all_presets.iter().collect(),
    };

    if to_run.is_empty() {
        eprintln!("No presets match filter: {:?}", cli.filter);
        std::process::exit(1);
    }

    let ts_dir = if cli.time_series {
        Some(std::path::Path::new("benchmark-results/time-series").to_path_buf())
    } else {
        None
    };
    let opts = RunOptions {
        params: &params,
        ticks: cli.ticks,
        mirror: cli.mirror,
        time_series_dir: ts_dir.as_deref(),
    };

    println!("\n  Peg Collapse Benchmark Runner v1.0.0");
    println!("  PRNG: ChaCha8Rng | Runs/preset: {} | Ticks: {} | Base seed: {}",
        cli.runs, cli.ticks, cli.seed);
    println!("  Running {} preset(s)...\n", to_run.len());
    println!("  {:<18} {:>5} {:>14} {:>9} {:>8} {:>9} {:>9} {:>7}",
        "Preset", "Pass%", "Final UST", "Min UST", "<0.90@", "Reserve0@", "LUNA x", "Time");
    println!("  {}", "-".repeat(88));

    let suite_start = Instant::now();
    let mut mc_reports = Vec::new();

    for preset in &to_run {
        let report = match monte_carlo::run_monte_carlo(preset, cli.runs, cli.seed, &opts) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("  {}: setup failed: {}", preset.name, e);
                std::process::exit(2);
            }
        };

        let pass_pct = report.pass_rate * 100.0;
        let final_ci = (report.terminal_stable_price.ci_upper - report.terminal_stable_price.ci_lower) / 2.0;
        let status = if report.pass_rate >= 1.0 { "PASS" } else { "FAIL" };

        println!("  {:<18} {:>4}% {:>7.4}±{:<6.4} {:>9.4} {:>8} {:>9} {:>8.1}x {:>5.0}ms  {}",
            report.preset,
            pass_pct as u32,
            report.terminal_stable_price.mean, final_ci,
            report.min_stable_price.mean,
            fmt_tick(&report.first_tick_below_090),
            fmt_tick(&report.reserve_exhausted_tick),
            report.volatile_supply_multiple.mean,
            report.elapsed_ms.mean,
            status,
        );

        mc_reports.push(report);
    }

    let suite_elapsed = suite_start.elapsed();

    // ─── Summary ────────────────────────────────────────────────────────

    let total = mc_reports.len();
    let passed = mc_reports.iter().filter(|r| r.pass_rate >= 1.0).count();
    let failed = total - passed;

    println!("  {}", "-".repeat(88));
    println!("  Total: {}  Passed: {}  Failed: {}  Suite time: {:.1}s\n",
        total, passed, failed, suite_elapsed.as_secs_f64());

    for r in mc_reports.iter().flat_map(|r| r.individual_runs.iter()) {
        if let Some(msg) = &r.first_violation {
            println!("  Invariant breach [{} seed {}]: {}", r.preset, r.seed, msg);
        }
    }

    // ─── Write JSON Report ──────────────────────────────────────────────

    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let timestamp = format!("{}", ts);

    let report = BenchReport {
        timestamp: timestamp.clone(),
        version: "1.0.0",
        prng: "ChaCha8Rng",
        n_runs_per_preset: cli.runs,
        ticks_per_run: cli.ticks,
        params,
        summary: Summary {
            total,
            passed,
            failed,
            pass_rate: passed as f64 / total as f64,
        },
        presets: mc_reports,
    };

    let dir = std::path::Path::new("benchmark-results");
    if !dir.exists() {
        std::fs::create_dir_all(dir).expect("Failed to create benchmark-results/");
    }
    let path = dir.join(format!("bench-{}.json", timestamp));
    let json = serde_json::to_string_pretty(&report).expect("Failed to serialize");
    std::fs::write(&path, &json).expect("Failed to write benchmark file");
    println!("  Results saved to: {}\n", path.display());

    if failed > 0 {
        std::process::exit(1);
    }
}
