// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Peg Collapse Simulation Suite - Defense Reserve Controller
//
// An exogenous reserve buys the stable asset while it trades between the
// trigger and the cutoff depeg. Spending front-loads with severity; each
// dollar buys less as the reserve empties.

use serde::{Deserialize, Serialize};

use crate::impact::ImpactCurve;
use crate::params::Params;

/// Depeg at which the front-loading multiplier reaches its knee.
const FRONT_LOAD_SCALE: f64 = 0.25;
const FRONT_LOAD_EXPONENT: f64 = 1.2;
const FRONT_LOAD_MAX: f64 = 4.0;

/// One tick of reserve intervention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Defense {
    /// Raw USD taken out of the reserve.
    pub spent: f64,
    /// Price-moving flow after effectiveness decay.
    pub effective_flow: f64,
    pub stable_price: f64,
    pub reserve_after: f64,
}

/// `clamp(1 + 3 * (depeg / 0.25)^1.2, 1, 4)`.
pub fn front_multiplier(depeg: f64) -> f64 {
    let depeg = depeg.max(0.0);
    (1.0 + 3.0 * (depeg / FRONT_LOAD_SCALE).powf(FRONT_LOAD_EXPONENT)).clamp(1.0, FRONT_LOAD_MAX)
}

/// `base * (reserve / initial)^decay`; zero once the baseline is empty.
pub fn effectiveness(params: &Params, reserve: f64, reserve_initial: f64) -> f64 {
    if reserve_initial <= 0.0 || reserve <= 0.0 {
        return 0.0;
    }
    let remaining = (reserve / reserve_initial).clamp(0.0, 1.0);
    params.reserve_effectiveness * remaining.powf(params.reserve_decay_exponent)
}

/// Whether the reserve should act at this stable price and balance.
pub fn is_active(params: &Params, stable_price: f64, reserve: f64) -> bool {
    let depeg = 1.0 - stable_price;
    stable_price < params.reserve_trigger && depeg < params.reserve_cutoff_depeg && reserve > 0.0
}

/// Spend from the reserve and push the stable price toward peg.
///
/// Inactive ticks return the inputs unchanged with `spent == 0`.
pub fn defend(
    params: &Params,
    curve: &ImpactCurve,
    stable_price: f64,
    reserve: f64,
    reserve_initial: f64,
    depth_usd: f64,
) -> Defense {
    if !is_active(params, stable_price, reserve) {
        return Defense {
            spent: 0.0,
            effective_flow: 0.0,
            stable_price,
            reserve_after: reserve,
        };
    }

    let depeg = 1.0 - stable_price;
    let spent = (params.reserve_spend_per_tick * front_multiplier(depeg)).min(reserve);
    let effective_flow = effectiveness(params, reserve, reserve_initial) * spent;
    let reserve_after = (reserve - spent).max(0.0);
    if reserve_after == 0.0 {
        tracing::info!(spent, "defense reserve exhausted");
    }

    Defense {
        spent,
        effective_flow,
        stable_price: curve.apply(stable_price, effective_flow, depth_usd),
        reserve_after,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn curve(params: &Params) -> ImpactCurve {
        ImpactCurve {
            coeff: params.impact_coeff,
            max_up: params.stable_max_log_up,
            max_down: params.stable_max_log_down,
        }
    }

    #[test]
    fn front_multiplier_grows_with_depeg_and_saturates() {
        assert_eq!(front_multiplier(0.0), 1.0);
        assert_relative_eq!(front_multiplier(0.25), 4.0);
        assert!(front_multiplier(0.1) > 1.0 && front_multiplier(0.1) < 4.0);
        assert_eq!(front_multiplier(0.9), 4.0);
    }

    #[test]
    fn effectiveness_decays_as_reserve_depletes() {
        let params = Params::default();
        assert_relative_eq!(effectiveness(&params, 2e9, 2e9), 0.35);
        let half = effectiveness(&params, 1e9, 2e9);
        assert_relative_eq!(half, 0.35 * 0.5f64.powf(0.6), max_relative = 1e-12);
        assert_eq!(effectiveness(&params, 0.0, 2e9), 0.0);
        assert_eq!(effectiveness(&params, 1e9, 0.0), 0.0);
    }

    #[test]
    fn inactive_above_trigger_beyond_cutoff_or_when_empty() {
        let params = Params::default();
        assert!(!is_active(&params, 1.0, 2e9));
        assert!(!is_active(&params, 0.998, 2e9));
        assert!(!is_active(&params, 0.5, 2e9));
        assert!(!is_active(&params, 0.9, 0.0));
        assert!(is_active(&params, 0.9, 2e9));
    }

    #[test]
    fn defense_spends_and_lifts_price() {
        let params = Params::default();
        let d = defend(&params, &curve(&params), 0.95, 2e9, 2e9, 8e7);
        let expected = 4e8 * front_multiplier(0.05);
        assert_relative_eq!(d.spent, expected, max_relative = 1e-12);
        assert_relative_eq!(d.reserve_after, 2e9 - expected, max_relative = 1e-12);
        assert_relative_eq!(d.effective_flow, 0.35 * expected, max_relative = 1e-12);
        assert!(d.stable_price > 0.95);
    }

    #[test]
    fn spend_never_exceeds_remaining_reserve() {
        let params = Params::default();
        let d = defend(&params, &curve(&params), 0.9, 1e6, 2e9, 8e7);
        assert_eq!(d.spent, 1e6);
        assert_eq!(d.reserve_after, 0.0);
    }

    #[test]
    fn inactive_tick_is_identity() {
        let params = Params::default();
        let d = defend(&params, &curve(&params), 1.0, 2e9, 2e9, 8e7);
        assert_eq!(d.spent, 0.0);
        assert_eq!(d.stable_price, 1.0);
        assert_eq!(d.reserve_after, 2e9);
    }
}
