// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Peg Collapse Simulation Suite - Delayed Sell Queue

use crate::impact::ImpactCurve;

/// Pending quantities below this are treated as fully released.
pub const QUEUE_DUST: f64 = 1e-6;

/// Result of releasing part of the queue onto the off-exchange venue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Release {
    pub released: f64,
    pub pending_after: f64,
    pub volatile_price: f64,
}

/// Sell `release_rate` of the pending volatile against the off-exchange price.
pub fn release(
    curve: &ImpactCurve,
    pending: f64,
    release_rate: f64,
    volatile_price: f64,
    depth_usd: f64,
) -> Release {
    if !(pending > 0.0) {
        return Release {
            released: 0.0,
            pending_after: 0.0,
            volatile_price,
        };
    }

    let released = pending * release_rate;
    let mut pending_after = (pending - released).max(0.0);
    if pending_after < QUEUE_DUST {
        pending_after = 0.0;
    }
    let flow_usd = released * volatile_price;
    let volatile_price = if flow_usd > 0.0 {
        curve.apply(volatile_price, -flow_usd, depth_usd)
    } else {
        volatile_price
    };

    Release {
        released,
        pending_after,
        volatile_price,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
