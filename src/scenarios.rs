// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Peg Collapse Simulation Suite - Scenario Presets
//
// Presets are the only way to seed a run. Any value derived on "first use"
// (pool volatile reserve from price, starting reserve product, reserve
// baseline, seeded oracle history) is filled in here, never inside a tick.

use serde::{Deserialize, Serialize};

use crate::amm::AmmPool;
use crate::events::{validate_events, EventKind, ScheduledEvent};
use crate::oracle::PriceHistory;
use crate::params::{ConfigError, Params};
use crate::types::State;

// ─── Preset definition ──────────────────────────────────────────────────────

/// Initial values plus a shock schedule. Loadable from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioPreset {
    pub name: String,
    pub stable_supply: f64,
    pub volatile_supply: f64,
    pub stable_price: f64,
    pub volatile_price: f64,
    pub pool_stable: f64,
    /// When absent the pool opens at the off-exchange volatile price.
    #[serde(default)]
    pub pool_volatile: Option<f64>,
    pub reserve_usd: f64,
    #[serde(default)]
    pub events: Vec<ScheduledEvent>,
}

impl ScenarioPreset {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate parameters, events and initial values, then assemble a State.
    pub fn build(&self, params: Params) -> Result<State, ConfigError> {
        params.validate()?;
        validate_events(&self.events)?;

        let positive = [
            ("stable_price", self.stable_price),
            ("volatile_price", self.volatile_price),
            ("pool_stable", self.pool_stable),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidInitialState(format!(
                    "{name} must be finite and positive, got {value}"
                )));
            }
        }
        let non_negative = [
            ("stable_supply", self.stable_supply),
            ("volatile_supply", self.volatile_supply),
            ("reserve_usd", self.reserve_usd),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidInitialState(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if self.stable_price < params.stable_min || self.stable_price > params.stable_max {
            return Err(ConfigError::InvalidInitialState(format!(
                "stable_price {} outside [{}, {}]",
                self.stable_price, params.stable_min, params.stable_max
            )));
        }
        if self.volatile_price < params.volatile_min || self.volatile_price > params.volatile_max {
            return Err(ConfigError::InvalidInitialState(format!(
                "volatile_price {} outside [{}, {}]",
                self.volatile_price, params.volatile_min, params.volatile_max
            )));
        }

        let pool_volatile = self
            .pool_volatile
            .unwrap_or(self.pool_stable / self.volatile_price);
        if !pool_volatile.is_finite() || pool_volatile <= 0.0 {
            return Err(ConfigError::InvalidInitialState(format!(
                "pool_volatile must be finite and positive, got {pool_volatile}"
            )));
        }

        Ok(State {
            tick: 0,
            stable_price: self.stable_price,
            volatile_price: self.volatile_price,
            stable_supply: self.stable_supply,
            volatile_supply: self.volatile_supply,
            pool: AmmPool::new(self.pool_stable, pool_volatile),
            reserve_usd: self.reserve_usd,
            reserve_usd_initial: self.reserve_usd,
            price_history: PriceHistory::seeded(self.volatile_price),
            pending_volatile_queue: 0.0,
            scheduled_events: self.events.clone(),
            params,
        })
    }
}

// ─── Builder ────────────────────────────────────────────────────────────────

/// Fluent construction of a preset, starting from the May 2022 opening book.
#[derive(Debug, Clone)]
pub struct PresetBuilder {
    preset: ScenarioPreset,
}

impl PresetBuilder {
    pub fn new() -> Self {
        Self {
            preset: ScenarioPreset {
                name: "custom".to_string(),
                stable_supply: 18_000_000_000.0,
                volatile_supply: 350_000_000.0,
                stable_price: 1.0,
                volatile_price: 80.0,
                pool_stable: 800_000_000.0,
                pool_volatile: None,
                reserve_usd: 2_000_000_000.0,
                events: Vec::new(),
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.preset.name = name.to_string();
        self
    }

    pub fn supplies(mut self, stable: f64, volatile: f64) -> Self {
        self.preset.stable_supply = stable;
        self.preset.volatile_supply = volatile;
        self
    }

    pub fn stable_price(mut self, price: f64) -> Self {
        self.preset.stable_price = price;
        self
    }

    pub fn volatile_price(mut self, price: f64) -> Self {
        self.preset.volatile_price = price;
        self
    }

    pub fn pool(mut self, stable: f64, volatile: f64) -> Self {
        self.preset.pool_stable = stable;
        self.preset.pool_volatile = Some(volatile);
        self
    }

    pub fn reserve(mut self, usd: f64) -> Self {
        self.preset.reserve_usd = usd;
        self
    }

    pub fn event(mut self, event: ScheduledEvent) -> Self {
        self.preset.events.push(event);
        self
    }

    pub fn preset(self) -> ScenarioPreset {
        self.preset
    }

    pub fn build(self, params: Params) -> Result<State, ConfigError> {
        self.preset.build(params)
    }
}

impl Default for PresetBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Built-in presets ───────────────────────────────────────────────────────

/// Historical-style collapse: seven escalating sell shocks on both assets.
pub fn terra_may_2022() -> ScenarioPreset {
    use EventKind::*;
    let shocks = [
        (20, SellStable, 250_000_000.0),
        (28, SellStable, 300_000_000.0),
        (36, SellVolatile, 200_000_000.0),
        (48, SellStable, 600_000_000.0),
        (60, SellStable, 900_000_000.0),
        (80, SellVolatile, 300_000_000.0),
        (110, SellStable, 1_500_000_000.0),
    ];
    shocks
        .into_iter()
        .fold(PresetBuilder::new().name("terra_may_2022"), |b, (tick, kind, usd)| {
            b.event(ScheduledEvent::new(tick, kind, usd))
        })
        .pool(800_000_000.0, 10_000_000.0)
        .preset()
}

/// Same opening book with a single 250M stable sell at tick 20.
pub fn single_shock() -> ScenarioPreset {
    PresetBuilder::new()
        .name("single_shock")
        .pool(800_000_000.0, 10_000_000.0)
        .event(ScheduledEvent::new(20, EventKind::SellStable, 250_000_000.0))
        .preset()
}

/// Same opening book and no shocks.
pub fn calm_peg() -> ScenarioPreset {
    PresetBuilder::new()
        .name("calm_peg")
        .pool(800_000_000.0, 10_000_000.0)
        .preset()
}

pub fn all() -> Vec<ScenarioPreset> {
    vec![terra_may_2022(), single_shock(), calm_peg()]
}

pub fn by_name(name: &str) -> Result<ScenarioPreset, ConfigError> {
    all()
        .into_iter()
        .find(|p| p.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| ConfigError::UnknownPreset(name.to_string()))
}

// ===========================================================================
// Tests
// ===========================================================================
