// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Peg Collapse Simulation Suite - External Event Injector

use serde::{Deserialize, Serialize};

use crate::params::ConfigError;

/// Direction and asset of an exogenous shock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SellStable,
    BuyStable,
    SellVolatile,
    BuyVolatile,
}

impl EventKind {
    /// `+1` for buys, `-1` for sells.
    pub fn sign(&self) -> f64 {
        match self {
            Self::BuyStable | Self::BuyVolatile => 1.0,
            Self::SellStable | Self::SellVolatile => -1.0,
        }
    }

    pub fn is_stable(&self) -> bool {
        matches!(self, Self::SellStable | Self::BuyStable)
    }
}

/// A scheduled USD flow that fires once, on tick `tick + latency`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduledEvent {
    pub tick: u64,
    pub kind: EventKind,
    pub amount_usd: f64,
    #[serde(default)]
    pub latency: u64,
}

impl ScheduledEvent {
    pub fn new(tick: u64, kind: EventKind, amount_usd: f64) -> Self {
        Self {
            tick,
            kind,
            amount_usd,
            latency: 0,
        }
    }

    pub fn with_latency(self, latency: u64) -> Self {
        Self { latency, ..self }
    }

    /// Tick on which the event fires. Overflow is rejected by [`validate_events`].
    pub fn fire_tick(&self) -> u64 {
        self.tick.saturating_add(self.latency)
    }
}

/// Reject events that could never fire or carry a meaningless amount.
pub fn validate_events(events: &[ScheduledEvent]) -> Result<(), ConfigError> {
    for (index, event) in events.iter().enumerate() {
        if !event.amount_usd.is_finite() || event.amount_usd < 0.0 {
            return Err(ConfigError::InvalidEvent {
                index,
                reason: format!("amount_usd {} must be finite and non-negative", event.amount_usd),
            });
        }
        if event.tick.checked_add(event.latency).is_none() {
            return Err(ConfigError::InvalidEvent {
                index,
                reason: "tick + latency overflows".to_string(),
            });
        }
    }
    Ok(())
}

/// Net signed USD flow per asset for every event firing on `tick`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetFlows {
    pub stable_usd: f64,
    pub volatile_usd: f64,
    pub fired: usize,
}

/// Sum all events whose fire tick is `tick`, netted per asset.
pub fn net_flows(events: &[ScheduledEvent], tick: u64) -> NetFlows {
    events
        .iter()
        .filter(|e| e.fire_tick() == tick)
        .fold(NetFlows::default(), |mut acc, e| {
            let signed = e.kind.sign() * e.amount_usd;
            if e.kind.is_stable() {
                acc.stable_usd += signed;
            } else {
                acc.volatile_usd += signed;
            }
            acc.fired += 1;
            acc
        })
}

// ===========================================================================
// Tests
// ===========================================================================
