//! Grid driver abstraction
//!
//! The marking engine never touches the mouse, keyboard, or clipboard
//! directly. Everything it needs from the external application is behind
//! [`GridDriver`], so any backend (OS input injection, an accessibility
//! API, or a scripted test double) can satisfy the same contract.

use async_trait::async_trait;

use crate::calibration::GridPoint;

/// Failures a grid driver can report
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// The operator triggered the emergency-stop gesture (e.g. moved the
    /// cursor into the reserved screen corner). The engine must abort the
    /// scan without issuing further driver calls.
    #[error("interrupted by operator emergency stop")]
    Interrupted,
    /// A single read or action failed. The engine logs it and lets the
    /// next iteration retry; it is not a match attempt.
    #[error("driver I/O failure: {0}")]
    Io(String),
}

/// Driver for the external application's data grid.
///
/// All operations block on real-world latency (input injection, clipboard
/// round-trips), so implementations are called from the engine's worker
/// task only, one logical scan position at a time.
#[async_trait]
pub trait GridDriver: Send {
    /// Click the calibrated anchor point to give the grid keyboard focus.
    ///
    /// Best effort: a silently misplaced click is indistinguishable from a
    /// successful one. Callers must treat the absence of expected state
    /// change (via [`read_selected_row_text`](Self::read_selected_row_text))
    /// as the source of truth, not this call's success.
    async fn click_anchor(&mut self, point: GridPoint) -> Result<(), DriverError>;

    /// Read the currently highlighted row's displayed text.
    ///
    /// May be multi-line and tab-delimited. There is no changed-state
    /// guarantee: consecutive calls can legitimately return identical
    /// text, which is exactly what the engine's stall detection relies on.
    async fn read_selected_row_text(&mut self) -> Result<String, DriverError>;

    /// Move the grid selection to the next row
    async fn advance_row(&mut self) -> Result<(), DriverError>;

    /// Confirm the current row as a match.
    ///
    /// This is the one operation with an observable side effect on the
    /// external application. The grid is expected to auto-advance after
    /// it, so the engine does not call [`advance_row`](Self::advance_row)
    /// for accepted rows.
    async fn accept_row(&mut self) -> Result<(), DriverError>;
}
