// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Peg Collapse Simulation Suite - Bounded Asymmetric Price Impact
//
// Off-exchange venues are modelled as a depth figure and a pair of per-tick
// log-move caps. Sells are allowed to move price further than buys.

use serde::{Deserialize, Serialize};

/// Smallest price the impact function will ever return.
pub const PRICE_FLOOR: f64 = 1e-12;

/// Shape of the impact curve for one asset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactCurve {
    pub coeff: f64,
    /// Largest upward log move per call.
    pub max_up: f64,
    /// Largest downward log move per call.
    pub max_down: f64,
}

impl ImpactCurve {
    pub fn apply(&self, price: f64, net_flow_usd: f64, depth_usd: f64) -> f64 {
        impact(price, net_flow_usd, depth_usd, self.coeff, self.max_up, self.max_down)
    }
}

/// Move `price` by a signed USD flow against `depth_usd` of liquidity.
///
/// `x = coeff * flow / depth`; the log move is `max_up * tanh(x)` for buys and
/// `-max_dn * tanh(-x)` for sells. Non-positive price or depth returns
/// [`PRICE_FLOOR`]; the result is always positive and finite.
pub fn impact(
    price: f64,
    net_flow_usd: f64,
    depth_usd: f64,
    coeff: f64,
    max_up: f64,
    max_dn: f64,
) -> f64 {
    if !(price > 0.0) || !(depth_usd > 0.0) || !price.is_finite() {
        return PRICE_FLOOR;
    }
    let x = coeff * net_flow_usd / depth_usd;
    if x.is_nan() {
        return price.max(PRICE_FLOOR);
    }
    let log_move = if x >= 0.0 {
        max_up * x.tanh()
    } else {
        -max_dn * (-x).tanh()
    };
    let moved = price * log_move.exp();
    if moved.is_finite() {
        moved.max(PRICE_FLOOR)
    } else {
        f64::MAX
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn zero_flow_leaves_price_unchanged() {
        assert_eq!(impact(1.0, 0.0, 8e7, 0.8, 0.12, 0.18), 1.0);
        assert_eq!(impact(80.0, 0.0, 1.0, 0.8, 0.22, 0.40), 80.0);
    }

    #[test]
    fn sells_lower_and_buys_raise_price() {
        let down = impact(1.0, -2.5e8, 8e7, 0.8, 0.12, 0.18);
        let up = impact(1.0, 2.5e8, 8e7, 0.8, 0.12, 0.18);
        assert!(down < 1.0);
        assert!(up > 1.0);
    }

    #[test]
    fn moves_are_bounded_by_their_caps() {
        let crushed = impact(1.0, -1e30, 1.0, 0.8, 0.12, 0.18);
        assert_relative_eq!(crushed, (-0.18f64).exp(), max_relative = 1e-12);

        let pumped = impact(1.0, 1e30, 1.0, 0.8, 0.12, 0.18);
        assert_relative_eq!(pumped, 0.12f64.exp(), max_relative = 1e-12);
    }

    #[test]
    fn downside_is_faster_than_upside_for_symmetric_flow() {
        let down = impact(1.0, -1e8, 8e7, 0.8, 0.12, 0.18);
        let up = impact(1.0, 1e8, 8e7, 0.8, 0.12, 0.18);
        assert!((1.0 - down) > 0.0);
        assert!(-down.ln() > up.ln());
    }

    #[test]
    fn degenerate_inputs_return_floor() {
        assert_eq!(impact(0.0, -1e6, 8e7, 0.8, 0.12, 0.18), PRICE_FLOOR);
        assert_eq!(impact(-3.0, 1e6, 8e7, 0.8, 0.12, 0.18), PRICE_FLOOR);
        assert_eq!(impact(1.0, 1e6, 0.0, 0.8, 0.12, 0.18), PRICE_FLOOR);
        assert_eq!(impact(1.0, 1e6, -5.0, 0.8, 0.12, 0.18), PRICE_FLOOR);
        assert_eq!(impact(f64::NAN, 1e6, 8e7, 0.8, 0.12, 0.18), PRICE_FLOOR);
    }

    #[test]
    fn tiny_depth_stays_positive_and_finite() {
        for flow in [-1e12, -1.0, 1.0, 1e12] {
            let p = impact(1e-9, flow, f64::MIN_POSITIVE, 0.8, 0.22, 0.40);
            assert!(p > 0.0 && p.is_finite(), "flow {flow} gave {p}");
        }
    }

    #[test]
    fn curve_wrapper_matches_free_function() {
        let curve = ImpactCurve { coeff: 0.8, max_up: 0.22, max_down: 0.40 };
        assert_eq!(
            curve.apply(80.0, -3e8, 8e7),
            impact(80.0, -3e8, 8e7, 0.8, 0.22, 0.40)
        );
    }
}
