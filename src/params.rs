// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Peg Collapse Simulation Suite - Parameter Set
//
// One immutable, validated configuration per run. Defaults are calibrated to
// the May 2022 collapse preset; callers override any subset through JSON.

use serde::{Deserialize, Serialize};

use crate::impact::ImpactCurve;
use crate::oracle::HISTORY_CAPACITY;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Setup-time configuration errors. Nothing in the per-tick path raises these.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("parameter `{name}` is not finite")]
    NotFinite { name: &'static str },
    #[error("parameter `{name}` = {value} is outside [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("parameter `{name}` = {value} must be strictly positive")]
    NotPositive { name: &'static str, value: f64 },
    #[error("{asset} price bounds invalid: min {min} must be > 0 and < max {max}")]
    InvalidBounds {
        asset: &'static str,
        min: f64,
        max: f64,
    },
    #[error("oracle delay {delay} must be below the history capacity {capacity}")]
    OracleDelayTooLong { delay: usize, capacity: usize },
    #[error("bank run low intensity {low} exceeds high intensity {high}")]
    BankRunRange { low: f64, high: f64 },
    #[error("scheduled event #{index}: {reason}")]
    InvalidEvent { index: usize, reason: String },
    #[error("initial state: {0}")]
    InvalidInitialState(String),
    #[error("unknown scenario preset `{0}`")]
    UnknownPreset(String),
    #[error("malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Params
// ---------------------------------------------------------------------------

/// Full parameter set. Missing JSON fields fall back to [`Params::default`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Params {
    // AMM
    /// Swap fee taken from the input amount.
    pub amm_fee: f64,
    /// Largest effective input per swap, as a fraction of the input reserve.
    pub max_trade_fraction: f64,

    // Mint / burn arbitrage
    /// Redemption intensity per unit of depeg.
    pub redeem_alpha: f64,
    /// Per-tick redemption cap as a fraction of stable supply.
    pub max_redeem_fraction: f64,
    /// Per-tick volatile mint cap as a fraction of volatile supply.
    pub max_mint_fraction: f64,
    /// Scale applied to both caps in the above-peg expansion branch.
    pub expansion_scale: f64,
    /// Share of newly minted volatile routed to the delayed queue (rest to AMM).
    pub queue_split: f64,

    // Bank run
    pub bank_run_low: f64,
    pub bank_run_high: f64,
    /// Tick at which intensity is halfway between low and high.
    pub bank_run_midpoint: f64,
    /// Logistic time-scale in ticks.
    pub bank_run_timescale: f64,
    /// Sell pressure cap as a fraction of stable supply.
    pub max_bank_run_fraction: f64,

    // Delayed queue
    /// Fraction of the pending queue released each tick.
    pub queue_release_rate: f64,

    // Off-exchange depth and impact
    pub depth_stable_usd: f64,
    pub depth_volatile_usd: f64,
    pub depth_halflife_ticks: f64,
    pub min_depth_usd: f64,
    pub impact_coeff: f64,
    pub stable_max_log_up: f64,
    pub stable_max_log_down: f64,
    pub volatile_max_log_up: f64,
    pub volatile_max_log_down: f64,

    // Oracle
    /// Staleness of the price used to value minted volatile supply, in ticks.
    pub oracle_delay: usize,

    // Defense reserve
    /// Reserve intervenes only while the stable price is below this level.
    pub reserve_trigger: f64,
    pub reserve_spend_per_tick: f64,
    pub reserve_effectiveness: f64,
    pub reserve_decay_exponent: f64,
    /// Reserve stops intervening once depeg reaches this magnitude.
    pub reserve_cutoff_depeg: f64,

    // LP withdrawal
    pub drain_base: f64,
    pub drain_slope: f64,

    // Hard bounds
    pub stable_min: f64,
    pub stable_max: f64,
    pub volatile_min: f64,
    pub volatile_max: f64,

    // Noise
    /// Half-width of the uniform multiplicative shock on the stable price.
    pub noise_stable: f64,
    /// Half-width of the uniform multiplicative shock on the volatile price.
    pub noise_volatile: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            amm_fee: 0.003,
            max_trade_fraction: 0.5,

            redeem_alpha: 0.04,
            max_redeem_fraction: 0.03,
            max_mint_fraction: 0.30,
            expansion_scale: 0.5,
            queue_split: 0.80,

            bank_run_low: 0.0,
            bank_run_high: 0.06,
            bank_run_midpoint: 150.0,
            bank_run_timescale: 45.0,
            max_bank_run_fraction: 0.04,

            queue_release_rate: 0.25,

            depth_stable_usd: 80_000_000.0,
            depth_volatile_usd: 80_000_000.0,
            depth_halflife_ticks: 800.0,
            min_depth_usd: 1_000_000.0,
            impact_coeff: 0.8,
            stable_max_log_up: 0.12,
            stable_max_log_down: 0.18,
            volatile_max_log_up: 0.22,
            volatile_max_log_down: 0.40,

            oracle_delay: 10,

            reserve_trigger: 0.997,
            reserve_spend_per_tick: 400_000_000.0,
            reserve_effectiveness: 0.35,
            reserve_decay_exponent: 0.6,
            reserve_cutoff_depeg: 0.45,

            drain_base: 0.002,
            drain_slope: 0.020,

            stable_min: 1e-3,
            stable_max: 1.02,
            volatile_min: 1e-8,
            volatile_max: 5e4,

            noise_stable: 0.001,
            noise_volatile: 0.01,
        }
    }
}

impl Params {
    /// Defaults with both noise widths set to zero.
    pub fn without_noise() -> Self {
        Self {
            noise_stable: 0.0,
            noise_volatile: 0.0,
            ..Self::default()
        }
    }

    /// Merge a (possibly partial) JSON object onto the defaults and validate.
    pub fn from_json_overrides(json: &str) -> Result<Self, ConfigError> {
        let params: Params = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Check every field once, before the run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in self.named_fields() {
            if !value.is_finite() {
                return Err(ConfigError::NotFinite { name });
            }
        }

        let unit = [
            ("max_trade_fraction", self.max_trade_fraction),
            ("max_redeem_fraction", self.max_redeem_fraction),
            ("max_mint_fraction", self.max_mint_fraction),
            ("expansion_scale", self.expansion_scale),
            ("queue_split", self.queue_split),
            ("max_bank_run_fraction", self.max_bank_run_fraction),
            ("queue_release_rate", self.queue_release_rate),
            ("reserve_cutoff_depeg", self.reserve_cutoff_depeg),
            ("noise_stable", self.noise_stable),
            ("noise_volatile", self.noise_volatile),
        ];
        for (name, value) in unit {
            check_range(name, value, 0.0, 1.0)?;
        }
        // Half-open: a 100% fee leaves nothing to trade.
        if !(0.0..1.0).contains(&self.amm_fee) {
            return Err(ConfigError::OutOfRange {
                name: "amm_fee",
                value: self.amm_fee,
                min: 0.0,
                max: 1.0,
            });
        }

        let non_negative = [
            ("redeem_alpha", self.redeem_alpha),
            ("bank_run_low", self.bank_run_low),
            ("bank_run_high", self.bank_run_high),
            ("impact_coeff", self.impact_coeff),
            ("stable_max_log_up", self.stable_max_log_up),
            ("stable_max_log_down", self.stable_max_log_down),
            ("volatile_max_log_up", self.volatile_max_log_up),
            ("volatile_max_log_down", self.volatile_max_log_down),
            ("reserve_trigger", self.reserve_trigger),
            ("reserve_spend_per_tick", self.reserve_spend_per_tick),
            ("reserve_effectiveness", self.reserve_effectiveness),
            ("reserve_decay_exponent", self.reserve_decay_exponent),
            ("drain_base", self.drain_base),
            ("drain_slope", self.drain_slope),
            ("bank_run_midpoint", self.bank_run_midpoint),
        ];
        for (name, value) in non_negative {
            check_range(name, value, 0.0, f64::MAX)?;
        }

        let positive = [
            ("depth_stable_usd", self.depth_stable_usd),
            ("depth_volatile_usd", self.depth_volatile_usd),
            ("depth_halflife_ticks", self.depth_halflife_ticks),
            ("min_depth_usd", self.min_depth_usd),
            ("bank_run_timescale", self.bank_run_timescale),
        ];
        for (name, value) in positive {
            if value <= 0.0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }

        check_bounds("stable", self.stable_min, self.stable_max)?;
        check_bounds("volatile", self.volatile_min, self.volatile_max)?;

        if self.bank_run_low > self.bank_run_high {
            return Err(ConfigError::BankRunRange {
                low: self.bank_run_low,
                high: self.bank_run_high,
            });
        }
        if self.oracle_delay >= HISTORY_CAPACITY {
            return Err(ConfigError::OracleDelayTooLong {
                delay: self.oracle_delay,
                capacity: HISTORY_CAPACITY,
            });
        }
        Ok(())
    }

    /// Hard clamp applied to the stable price at the end of every tick.
    pub fn clamp_stable(&self, price: f64) -> f64 {
        clamp_price(price, self.stable_min, self.stable_max)
    }

    /// Hard clamp applied to the volatile price at the end of every tick.
    pub fn clamp_volatile(&self, price: f64) -> f64 {
        clamp_price(price, self.volatile_min, self.volatile_max)
    }

    pub fn stable_curve(&self) -> ImpactCurve {
        ImpactCurve {
            coeff: self.impact_coeff,
            max_up: self.stable_max_log_up,
            max_down: self.stable_max_log_down,
        }
    }

    pub fn volatile_curve(&self) -> ImpactCurve {
        ImpactCurve {
            coeff: self.impact_coeff,
            max_up: self.volatile_max_log_up,
            max_down: self.volatile_max_log_down,
        }
    }

    fn named_fields(&self) -> [(&'static str, f64); 35] {
        [
            ("amm_fee", self.amm_fee),
            ("max_trade_fraction", self.max_trade_fraction),
            ("redeem_alpha", self.redeem_alpha),
            ("max_redeem_fraction", self.max_redeem_fraction),
            ("max_mint_fraction", self.max_mint_fraction),
            ("expansion_scale", self.expansion_scale),
            ("queue_split", self.queue_split),
            ("bank_run_low", self.bank_run_low),
            ("bank_run_high", self.bank_run_high),
            ("bank_run_midpoint", self.bank_run_midpoint),
            ("bank_run_timescale", self.bank_run_timescale),
            ("max_bank_run_fraction", self.max_bank_run_fraction),
            ("queue_release_rate", self.queue_release_rate),
            ("depth_stable_usd", self.depth_stable_usd),
            ("depth_volatile_usd", self.depth_volatile_usd),
            ("depth_halflife_ticks", self.depth_halflife_ticks),
            ("min_depth_usd", self.min_depth_usd),
            ("impact_coeff", self.impact_coeff),
            ("stable_max_log_up", self.stable_max_log_up),
            ("stable_max_log_down", self.stable_max_log_down),
            ("volatile_max_log_up", self.volatile_max_log_up),
            ("volatile_max_log_down", self.volatile_max_log_down),
            ("reserve_trigger", self.reserve_trigger),
            ("reserve_spend_per_tick", self.reserve_spend_per_tick),
            ("reserve_effectiveness", self.reserve_effectiveness),
            ("reserve_decay_exponent", self.reserve_decay_exponent),
            ("reserve_cutoff_depeg", self.reserve_cutoff_depeg),
            ("drain_base", self.drain_base),
            ("drain_slope", self.drain_slope),
            ("stable_min", self.stable_min),
            ("stable_max", self.stable_max),
            ("volatile_min", self.volatile_min),
            ("volatile_max", self.volatile_max),
            ("noise_stable", self.noise_stable),
            ("noise_volatile", self.noise_volatile),
        ]
    }
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

fn check_bounds(asset: &'static str, min: f64, max: f64) -> Result<(), ConfigError> {
    if min <= 0.0 || min >= max {
        return Err(ConfigError::InvalidBounds { asset, min, max });
    }
    Ok(())
}

/// NaN collapses to the lower bound so a degenerate tick cannot poison the run.
fn clamp_price(price: f64, min: f64, max: f64) -> f64 {
    if price.is_nan() {
        return min;
    }
    price.clamp(min, max)
}

// ===========================================================================
// Tests
// ===========================================================================
