//! # Reconcile Core
//!
//! Core engine for reconciling captured card transactions against the
//! data grid of an external billing application, and for driving that
//! application's UI to mark the matching rows.
//!
//! ## Features
//!
//! - **Amount normalization**: canonical "thousands-dot, decimal-comma"
//!   money strings and `DD/MM/YYYY HH:MM:SS` timestamps as comparison keys
//! - **Grid matching engine**: a stateful scan that reads rows through an
//!   abstract driver, consumes amounts against a counted target multiset,
//!   and detects end-of-data by stall heuristics
//! - **Progress stream**: ordered events over a channel, never blocking
//!   the scan on the consumer
//! - **Result artifacts**: matched/missing/summary files written on every
//!   non-fatal termination
//! - **Capture store**: unified, deduplicated persistence for the capture
//!   sources feeding the engine
//! - **Driver abstraction**: OS input injection, accessibility APIs, and
//!   test doubles all sit behind the same [`GridDriver`] contract
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use reconcile_core::{MarkingController, CaptureStore, ResultWriter, CALIBRATION_FILE};
//! use reconcile_core::utils::ScriptedGridDriver;
//! use std::path::Path;
//!
//! # async fn run() -> reconcile_core::ReconcileResult<()> {
//! let records = CaptureStore::new("capturas_portal").read_all()?;
//! let driver = ScriptedGridDriver::new(["..."]); // or a real input-injection driver
//!
//! let mut controller = MarkingController::new();
//! let mut events = controller.start(
//!     driver,
//!     Path::new(CALIBRATION_FILE),
//!     &records,
//!     ResultWriter::new("."),
//! )?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! let run = controller.join().await?;
//! println!("stopped: {:?}", run.reason);
//! # Ok(())
//! # }
//! ```

pub mod amount;
pub mod calibration;
pub mod capture;
pub mod expenses;
pub mod marking;
pub mod progress;
pub mod report;
pub mod runner;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use calibration::{CalibrationRecord, GridPoint, CALIBRATION_FILE};
pub use capture::{CaptureStore, CaptureSummary, CAPTURES_DIR};
pub use expenses::{ExpenseSummary, EXPENSE_FILE};
pub use marking::{ColumnPolicy, GridRowSample, MarkingEngine};
pub use progress::{ProgressEvent, ProgressSender};
pub use report::{ResultWriter, MATCHED_FILE, MISSING_FILE, SUMMARY_FILE};
pub use runner::MarkingController;
pub use traits::{DriverError, GridDriver};
pub use types::*;

// The cancellation primitive is part of the public engine API
pub use tokio_util::sync::CancellationToken;
