// Per-Tick Metric Trackers: collapse milestones and invariant audit

use depeg_engine::{State, TickMetrics};

// ─── Collapse Tracker ───────────────────────────────────────────────────────

/// Tracks the milestones of a depeg: deepest price, first tick under the
/// alert threshold, and the tick the defense reserve ran dry.
pub struct CollapseTracker {
    pub threshold: f64, // default 0.90
    pub min_stable_price: f64,
    pub first_tick_below: Option<u64>,
    pub reserve_exhausted_tick: Option<u64>,
    pub peak_pending_queue: f64,
}

impl CollapseTracker {
    pub fn new() -> Self {
        Self {
            threshold: 0.90,
            min_stable_price: f64::INFINITY,
            first_tick_below: None,
            reserve_exhausted_tick: None,
            peak_pending_queue: 0.0,
        }
    }

    pub fn record_tick(&mut self, m: &TickMetrics) {
        self.min_stable_price = self.min_stable_price.min(m.stable_price);
        self.peak_pending_queue = self.peak_pending_queue.max(m.pending_volatile_queue);
        if self.first_tick_below.is_none() && m.stable_price < self.threshold {
            self.first_tick_below = Some(m.tick);
        }
        // Only count exhaustion caused by spending, not an empty starting reserve.
        if self.reserve_exhausted_tick.is_none() && m.reserve_spent > 0.0 && m.reserve_usd <= 0.0 {
            self.reserve_exhausted_tick = Some(m.tick);
        }
    }
}

// ─── Invariant Audit ────────────────────────────────────────────────────────

/// Counts ticks whose post-state breaks an invariant; keeps the first message.
pub struct InvariantAudit {
    pub violations: u32,
    pub first: Option<String>,
    last_reserve: Option<f64>,
}

impl InvariantAudit {
    pub fn new() -> Self {
        Self { violations: 0, first: None, last_reserve: None }
    }

    pub fn record_tick(&mut self, state: &State) {
        let mut result = state.check_invariants();
        if let Some(prev) = self.last_reserve {
            if result.is_ok() && state.reserve_usd > prev {
                result = Err(format!("reserve grew from {} to {}", prev, state.reserve_usd));
            }
        }
        self.last_reserve = Some(state.reserve_usd);

        if let Err(msg) = result {
            self.violations += 1;
            if self.first.is_none() {
                self.first = Some(format!("tick {}: {}", state.tick, msg));
            }
        }
    }
}
