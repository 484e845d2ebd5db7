// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Peg Collapse Simulation Suite

pub mod amm;
pub mod arbitrage;
pub mod bank_run;
pub mod events;
pub mod impact;
pub mod ledger;
pub mod liquidity;
pub mod oracle;
pub mod params;
pub mod queue;
pub mod reserve;
pub mod scenarios;
pub mod simulation;
pub mod types;

pub use params::{ConfigError, Params};
pub use scenarios::{PresetBuilder, ScenarioPreset};
pub use simulation::{step, Session, Simulation};
pub use types::*;

use wasm_bindgen::prelude::*;

fn to_js_error(e: ConfigError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

// ─── WASM Interface ──────────────────────────────────────────────────────────

#[wasm_bindgen]
impl Simulation {
    /// Start the May 2022 preset with default parameters.
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u32) -> Result<Simulation, JsValue> {
        Self::with_preset("terra_may_2022", seed)
    }

    pub fn with_preset(preset: &str, seed: u32) -> Result<Simulation, JsValue> {
        #[cfg(target_arch = "wasm32")]
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        let preset = scenarios::by_name(preset).map_err(to_js_error)?;
        Simulation::try_new(preset, Params::default(), seed as u64).map_err(to_js_error)
    }

    /// Start the May 2022 preset with a JSON object of parameter overrides.
    pub fn with_overrides(seed: u32, overrides: &str) -> Result<Simulation, JsValue> {
        #[cfg(target_arch = "wasm32")]
        std::panic::set_hook(Box::new(console_error_panic_hook::hook));

        let params = Params::from_json_overrides(overrides).map_err(to_js_error)?;
        Simulation::try_new(scenarios::terra_may_2022(), params, seed as u64).map_err(to_js_error)
    }

    pub fn tick(&mut self) -> JsValue {
        let metrics = self.tick_core();
        serde_wasm_bindgen::to_value(&metrics).unwrap_or(JsValue::NULL)
    }

    /// Run N ticks without returning results (fast batch mode for benchmarking)
    pub fn run_batch(&mut self, ticks: u32) {
        for _ in 0..ticks {
            self.tick_core();
        }
    }

    pub fn get_state(&self) -> JsValue {
        serde_wasm_bindgen::to_value(self.session.state()).unwrap_or(JsValue::NULL)
    }

    /// Metrics of the latest tick, including its flows.
    pub fn get_metrics(&self) -> JsValue {
        serde_wasm_bindgen::to_value(&self.last_metrics).unwrap_or(JsValue::NULL)
    }

    pub fn current_tick(&self) -> f64 {
        self.session.state().tick as f64
    }

    /// Reset simulation to initial state
    pub fn reset(&mut self) -> Result<(), JsValue> {
        self.reset_core().map_err(to_js_error)
    }
}
