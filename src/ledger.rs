// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Peg Collapse Simulation Suite - Ledger Price Mirror
//
// Optionally publishes each tick's stable price to an external ledger as an
// 18-decimal fixed-point integer. The engine never depends on the outcome:
// a failed submission is logged and counted, and the run continues.

use num_traits::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::TickMetrics;

/// `10^18`: the on-ledger oracle stores prices with 18 decimals.
pub const FIXED_POINT_SCALE: Decimal = dec!(1000000000000000000);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LedgerError {
    #[error("price {0} cannot be represented as fixed point")]
    Unrepresentable(f64),
    #[error("ledger rejected submission: {0}")]
    Rejected(String),
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
    #[error("unknown transaction {0}")]
    UnknownTransaction(u64),
}

/// Convert a price to an integer scaled by [`FIXED_POINT_SCALE`], truncating.
///
/// Returns `None` for negative, non-finite or out-of-range prices.
pub fn to_fixed_point(price: f64) -> Option<u128> {
    if !price.is_finite() || price < 0.0 {
        return None;
    }
    Decimal::from_f64(price)?
        .checked_mul(FIXED_POINT_SCALE)?
        .trunc()
        .to_u128()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    pub tx_id: u64,
    pub tick: u64,
    pub value: u128,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub tx_id: u64,
    pub block: u64,
}

/// Anything that can accept a price submission.
pub trait PriceLedger {
    fn submit(&mut self, tick: u64, value: u128) -> Result<TxReceipt, LedgerError>;
    fn confirm(&mut self, receipt: &TxReceipt) -> Result<Confirmation, LedgerError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MirrorMode {
    /// Block on confirmation before returning.
    AwaitConfirmation,
    FireAndForget,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MirrorOutcome {
    Confirmed(Confirmation),
    Submitted(TxReceipt),
    Failed(LedgerError),
}

/// Publishes tick prices to a [`PriceLedger`], absorbing every failure.
#[derive(Debug)]
pub struct PriceMirror<L: PriceLedger> {
    ledger: L,
    mode: MirrorMode,
    published: u64,
    failures: u64,
}

impl<L: PriceLedger> PriceMirror<L> {
    pub fn new(ledger: L, mode: MirrorMode) -> Self {
        Self {
            ledger,
            mode,
            published: 0,
            failures: 0,
        }
    }

    pub fn publish(&mut self, metrics: &TickMetrics) -> MirrorOutcome {
        let outcome = self.try_publish(metrics);
        match &outcome {
            Ok(_) => self.published += 1,
            Err(e) => {
                self.failures += 1;
                tracing::warn!(tick = metrics.tick, error = %e, "price mirror failed");
            }
        }
        match outcome {
            Ok(o) => o,
            Err(e) => MirrorOutcome::Failed(e),
        }
    }

    fn try_publish(&mut self, metrics: &TickMetrics) -> Result<MirrorOutcome, LedgerError> {
        let value = to_fixed_point(metrics.stable_price)
            .ok_or(LedgerError::Unrepresentable(metrics.stable_price))?;
        let receipt = self.ledger.submit(metrics.tick, value)?;
        match self.mode {
            MirrorMode::FireAndForget => Ok(MirrorOutcome::Submitted(receipt)),
            MirrorMode::AwaitConfirmation => {
                Ok(MirrorOutcome::Confirmed(self.ledger.confirm(&receipt)?))
            }
        }
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn failures(&self) -> u64 {
        self.failures
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }
}

// ─── In-memory ledger ───────────────────────────────────────────────────────

/// Local ledger that records submissions; one block per confirmation.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    submissions: Vec<TxReceipt>,
    attempts: u64,
    block: u64,
    /// Reject every n-th submission (1-based). Zero disables.
    pub reject_every: u64,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submissions(&self) -> &[TxReceipt] {
        &self.submissions
    }

    /// Latest mirrored value, if any.
    pub fn latest(&self) -> Option<u128> {
        self.submissions.last().map(|r| r.value)
    }
}

impl PriceLedger for InMemoryLedger {
    fn submit(&mut self, tick: u64, value: u128) -> Result<TxReceipt, LedgerError> {
        self.attempts += 1;
        let attempt = self.attempts;
        if self.reject_every > 0 && attempt % self.reject_every == 0 {
            return Err(LedgerError::Rejected(format!("submission {attempt} refused")));
        }
        let receipt = TxReceipt {
            tx_id: attempt,
            tick,
            value,
        };
        self.submissions.push(receipt);
        Ok(receipt)
    }

    fn confirm(&mut self, receipt: &TxReceipt) -> Result<Confirmation, LedgerError> {
        if !self.submissions.iter().any(|r| r.tx_id == receipt.tx_id) {
            return Err(LedgerError::UnknownTransaction(receipt.tx_id));
        }
        self.block += 1;
        Ok(Confirmation {
            tx_id: receipt.tx_id,
            block: self.block,
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
