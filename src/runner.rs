//! Marking run controller
//!
//! Owns the worker task a marking run executes on. The presentation side
//! stays responsive: it gets the event receiver back from [`start`],
//! drains it on its own schedule, and talks back to the run only through
//! the cooperative stop signal.
//!
//! [`start`]: MarkingController::start

use log::info;
use std::path::Path;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::calibration::CalibrationRecord;
use crate::marking::MarkingEngine;
use crate::progress::{ProgressEvent, ProgressSender};
use crate::report::ResultWriter;
use crate::traits::GridDriver;
use crate::types::{
    CaptureRecord, MarkingRun, ReconcileError, ReconcileResult, TargetMultiset,
};

/// Runs at most one marking engine at a time on a background task.
///
/// Starting a second run while one is active (or finished but not yet
/// joined) is refused with [`ReconcileError::RunInProgress`]; this is
/// where the "one run at a time" caller contract of the engine is
/// enforced.
#[derive(Debug, Default)]
pub struct MarkingController {
    handle: Option<JoinHandle<ReconcileResult<MarkingRun>>>,
    cancel: Option<CancellationToken>,
}

impl MarkingController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run is active or awaiting [`join`](Self::join)
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Load the calibration, build the target multiset from the unified
    /// records, and spawn the marking run.
    ///
    /// Configuration problems (missing or unreadable calibration file)
    /// are returned here, before anything is spawned, so the run never
    /// starts half-configured. On success the caller receives the
    /// progress event stream. Custom column policies go through
    /// [`MarkingEngine`] directly.
    pub fn start<D>(
        &mut self,
        driver: D,
        calibration_path: &Path,
        records: &[CaptureRecord],
        writer: ResultWriter,
    ) -> ReconcileResult<UnboundedReceiver<ProgressEvent>>
    where
        D: GridDriver + Send + 'static,
    {
        if self.handle.is_some() {
            return Err(ReconcileError::RunInProgress);
        }

        let calibration = CalibrationRecord::load(calibration_path)?;
        let targets = TargetMultiset::from_records(records);
        let (progress, rx) = ProgressSender::channel();
        let cancel = CancellationToken::new();

        info!(
            "spawning marking run: {} targets, artifacts in {}",
            targets.total(),
            writer.dir().display()
        );
        let engine = MarkingEngine::new(driver, calibration, writer, progress, cancel.clone());
        let handle = tokio::spawn(engine.run(targets));

        self.handle = Some(handle);
        self.cancel = Some(cancel);
        Ok(rx)
    }

    /// Request a cooperative stop.
    ///
    /// The flag is polled at the top of each scan iteration; the iteration
    /// in flight runs to completion first.
    pub fn request_stop(&self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
            info!("stop requested for marking run");
        }
    }

    /// Wait for the run to finish and return its result.
    ///
    /// A panicked worker task surfaces as [`ReconcileError::TaskFailed`].
    pub async fn join(&mut self) -> ReconcileResult<MarkingRun> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| ReconcileError::TaskFailed("no marking run to join".to_string()))?;
        self.cancel = None;
        handle
            .await
            .map_err(|e| ReconcileError::TaskFailed(e.to_string()))?
    }
}
