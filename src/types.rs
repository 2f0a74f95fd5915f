//! Core types and data structures for the reconciliation engine

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::traits::DriverError;

/// A single captured transaction, normalized at the capture boundary.
///
/// Records are immutable once created. Two records are duplicates iff all
/// four fields are equal, which is why the type derives `Eq` and `Hash`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// When the transaction happened, second precision
    pub timestamp: NaiveDateTime,
    /// Gross amount in canonical form ("1.234,50")
    pub amount: String,
    /// Which capture source produced the record ("GoodCard", "ValeCard", ...)
    pub origin: String,
    /// Source-side identifier, when the source provides one
    pub external_id: Option<String>,
}

impl CaptureRecord {
    /// Create a new capture record
    pub fn new(
        timestamp: NaiveDateTime,
        amount: String,
        origin: String,
        external_id: Option<String>,
    ) -> Self {
        Self {
            timestamp,
            amount,
            origin,
            external_id,
        }
    }
}

/// Counted collection of canonical amounts still awaiting a match.
///
/// Built once from the unified capture list; afterwards only the marking
/// engine mutates it, one decrement per accepted row. Counts never go
/// negative and exhausted entries are retained so missing-value reporting
/// can see them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetMultiset {
    counts: HashMap<String, u32>,
    total: usize,
}

impl TargetMultiset {
    /// Build the multiset by counting the `amount` field of each record.
    ///
    /// Deduplication is the caller's job; every record counts here.
    pub fn from_records(records: &[CaptureRecord]) -> Self {
        Self::from_amounts(records.iter().map(|r| r.amount.as_str()))
    }

    /// Build the multiset from raw canonical amount strings
    pub fn from_amounts<'a>(amounts: impl IntoIterator<Item = &'a str>) -> Self {
        let mut counts: HashMap<String, u32> = HashMap::new();
        let mut total = 0;
        for amount in amounts {
            *counts.entry(amount.to_string()).or_insert(0) += 1;
            total += 1;
        }
        Self { counts, total }
    }

    /// Total number of amounts originally counted, including duplicates
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of distinct amount values
    pub fn distinct(&self) -> usize {
        self.counts.len()
    }

    /// Remaining count for one canonical amount
    pub fn remaining(&self, amount: &str) -> u32 {
        self.counts.get(amount).copied().unwrap_or(0)
    }

    /// Sum of all remaining counts
    pub fn remaining_total(&self) -> usize {
        self.counts.values().map(|&c| c as usize).sum()
    }

    /// Consume one occurrence of `amount`.
    ///
    /// Returns `true` when a remaining occurrence existed and was
    /// decremented; a zero or unknown entry is left untouched.
    pub fn consume(&mut self, amount: &str) -> bool {
        match self.counts.get_mut(amount) {
            Some(count) if *count > 0 => {
                *count -= 1;
                true
            }
            _ => false,
        }
    }

    /// Every amount with remaining count > 0, repeated per unmet count.
    ///
    /// Iteration order follows the internal map and is not stable; treat
    /// the result as a multiset.
    pub fn missing(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.remaining_total());
        for (amount, &count) in &self.counts {
            for _ in 0..count {
                out.push(amount.clone());
            }
        }
        out
    }
}

/// Why a marking run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every target amount was matched
    Exhausted,
    /// The same row (or the same row label) repeated past the stall limit,
    /// meaning the scan cycled past the end of the populated grid
    Stalled,
    /// `max_steps` iterations ran without reaching another terminal state
    StepLimit,
    /// The cooperative cancellation flag was observed
    Cancelled,
    /// The driver reported the operator's emergency-stop gesture
    OperatorInterrupt,
}

/// Final result of a marking run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Matched amounts in the order they were accepted
    pub matched: Vec<String>,
    /// Amounts never matched, one entry per unmet count (multiset order)
    pub missing: Vec<String>,
    /// Size of the original target multiset
    pub total_target: usize,
}

/// A finished (non-fatal) marking run: what was matched, and why it stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkingRun {
    pub outcome: RunOutcome,
    pub reason: StopReason,
}

/// Errors that can occur in the reconciliation system
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("calibration file not found: {0} (run the calibration step first)")]
    CalibrationMissing(PathBuf),
    #[error("calibration file {path} is unreadable: {message}")]
    CalibrationInvalid { path: PathBuf, message: String },
    #[error("grid driver failure: {0}")]
    Driver(#[from] DriverError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("a marking run is already active")]
    RunInProgress,
    #[error("marking task failed: {0}")]
    TaskFailed(String),
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiset_counts_duplicates() {
        let targets = TargetMultiset::from_amounts(["100,00", "100,00", "200,00"]);
        assert_eq!(targets.total(), 3);
        assert_eq!(targets.distinct(), 2);
        assert_eq!(targets.remaining("100,00"), 2);
        assert_eq!(targets.remaining("200,00"), 1);
        assert_eq!(targets.remaining("300,00"), 0);
    }

    #[test]
    fn multiset_consume_never_goes_negative() {
        let mut targets = TargetMultiset::from_amounts(["50,00"]);
        assert!(targets.consume("50,00"));
        assert!(!targets.consume("50,00"));
        assert!(!targets.consume("999,99"));
        assert_eq!(targets.remaining("50,00"), 0);
        // exhausted entry is retained, total keeps the original count
        assert_eq!(targets.distinct(), 1);
        assert_eq!(targets.total(), 1);
    }

    #[test]
    fn multiset_missing_repeats_per_unmet_count() {
        let mut targets = TargetMultiset::from_amounts(["10,00", "10,00", "20,00"]);
        targets.consume("10,00");
        let mut missing = targets.missing();
        missing.sort();
        assert_eq!(missing, vec!["10,00".to_string(), "20,00".to_string()]);
        assert_eq!(targets.remaining_total(), 2);
    }
}
