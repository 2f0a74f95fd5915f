//! The grid marking state machine
//!
//! Walks the external grid row by row, consuming each row's amount against
//! the target multiset: accept when the amount still has a remaining
//! count, advance otherwise, and stop on exhaustion, stall, the step cap,
//! cancellation, or an operator interrupt.

use log::{info, warn};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::amount::{number_to_amount, sum_amounts};
use crate::calibration::CalibrationRecord;
use crate::marking::row::{ColumnPolicy, GridRowSample};
use crate::progress::ProgressSender;
use crate::report::ResultWriter;
use crate::traits::{DriverError, GridDriver};
use crate::types::{MarkingRun, ReconcileError, ReconcileResult, RunOutcome, StopReason, TargetMultiset};

/// Settle time after the initial focus click
const CLICK_SETTLE: Duration = Duration::from_millis(200);
/// Settle time after accepting a row, before the next read
const ACCEPT_SETTLE: Duration = Duration::from_millis(80);

/// One-shot marking engine.
///
/// Caller contract: at most one run may be active at a time (the engine
/// does not enforce mutual exclusion; [`MarkingController`] does), and the
/// target multiset is owned exclusively by the engine for the run's
/// duration.
///
/// [`MarkingController`]: crate::runner::MarkingController
pub struct MarkingEngine<D> {
    driver: D,
    calibration: CalibrationRecord,
    policy: ColumnPolicy,
    writer: ResultWriter,
    progress: ProgressSender,
    cancel: CancellationToken,
}

impl<D: GridDriver> MarkingEngine<D> {
    /// Create an engine with the default column policy
    pub fn new(
        driver: D,
        calibration: CalibrationRecord,
        writer: ResultWriter,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            driver,
            calibration,
            policy: ColumnPolicy::default(),
            writer,
            progress,
            cancel,
        }
    }

    /// Override the amount-column extraction policy
    pub fn with_policy(mut self, policy: ColumnPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run the marking scan to completion.
    ///
    /// Every termination except a fatal one (initial click failure,
    /// artifact write failure) persists the three output artifacts and
    /// emits a `finished` event, so partial progress is never lost. A
    /// fatal failure emits an `error` event and returns `Err`.
    pub async fn run(mut self, mut targets: TargetMultiset) -> ReconcileResult<MarkingRun> {
        let total_target = targets.total();
        self.progress.started(total_target, targets.distinct());
        info!(
            "marking run started: {} targets, {} distinct values",
            total_target,
            targets.distinct()
        );

        if let Err(e) = self.driver.click_anchor(self.calibration.grid_cell).await {
            self.progress
                .error(format!("Erro ao clicar no grid: {e}"));
            return Err(ReconcileError::Driver(e));
        }
        sleep(CLICK_SETTLE).await;

        let mut matched: Vec<String> = Vec::new();
        let mut last_row_text: Option<String> = None;
        let mut same_row_count: u32 = 0;
        let mut last_label: Option<String> = None;
        let mut same_label_count: u32 = 0;
        let stall_limit = self.calibration.same_row_limit;

        let mut reason = StopReason::StepLimit;

        for _ in 0..self.calibration.max_steps {
            if self.cancel.is_cancelled() {
                self.progress
                    .info("Marcação interrompida pelo usuário (parada solicitada).");
                reason = StopReason::Cancelled;
                break;
            }

            if matched.len() >= total_target {
                self.progress
                    .info("Todas as transações do portal foram marcadas no grid. Encerrando.");
                reason = StopReason::Exhausted;
                break;
            }

            let raw = match self.driver.read_selected_row_text().await {
                Ok(text) => text,
                Err(DriverError::Interrupted) => {
                    self.progress
                        .info("Automação interrompida pelo gesto de emergência do operador.");
                    reason = StopReason::OperatorInterrupt;
                    break;
                }
                Err(e) => {
                    warn!("row read failed, retrying on next step: {e}");
                    continue;
                }
            };
            sleep(self.calibration.post_copy_delay()).await;

            let row_norm = raw.trim().to_string();
            match &last_row_text {
                Some(prev) if *prev == row_norm => same_row_count += 1,
                _ => {
                    same_row_count = 0;
                    last_row_text = Some(row_norm);
                }
            }

            let sample = GridRowSample::parse(&raw, &self.policy);
            if !sample.label.is_empty() && last_label.as_deref() == Some(sample.label.as_str()) {
                same_label_count += 1;
            } else {
                same_label_count = 0;
                if !sample.label.is_empty() {
                    last_label = Some(sample.label.clone());
                }
            }

            if same_row_count >= stall_limit || same_label_count >= stall_limit {
                self.progress
                    .info("Cheguei ao final do grid. Encerrando.");
                reason = StopReason::Stalled;
                break;
            }

            if !sample.amount.is_empty() && targets.remaining(&sample.amount) > 0 {
                match self.driver.accept_row().await {
                    Ok(()) => {}
                    Err(DriverError::Interrupted) => {
                        self.progress
                            .info("Automação interrompida pelo gesto de emergência do operador.");
                        reason = StopReason::OperatorInterrupt;
                        break;
                    }
                    Err(e) => {
                        warn!("accept failed, retrying on next step: {e}");
                        continue;
                    }
                }
                sleep(ACCEPT_SETTLE).await;

                targets.consume(&sample.amount);
                matched.push(sample.amount.clone());
                debug_assert_eq!(matched.len() + targets.remaining_total(), total_target);
                self.progress
                    .matched(matched.len(), total_target, &sample.amount);
                // accepting auto-advances the grid, so no advance_row here
                continue;
            }

            match self.driver.advance_row().await {
                Ok(()) => {}
                Err(DriverError::Interrupted) => {
                    self.progress
                        .info("Automação interrompida pelo gesto de emergência do operador.");
                    reason = StopReason::OperatorInterrupt;
                    break;
                }
                Err(e) => {
                    warn!("row advance failed, retrying on next step: {e}");
                    continue;
                }
            }
            sleep(self.calibration.row_advance_delay()).await;
        }

        let outcome = RunOutcome {
            matched,
            missing: targets.missing(),
            total_target,
        };

        if let Err(e) = self.writer.write(&outcome) {
            self.progress
                .error(format!("Erro ao gravar os arquivos de resultado: {e}"));
            return Err(e);
        }

        let matched_sum = sum_amounts(outcome.matched.iter().map(String::as_str));
        let missing_sum = sum_amounts(outcome.missing.iter().map(String::as_str));
        info!(
            "marking run stopped ({reason:?}): {}/{} matched",
            outcome.matched.len(),
            total_target
        );
        self.progress.finished(
            total_target,
            outcome.matched.len(),
            outcome.missing.len(),
            number_to_amount(&matched_sum),
            number_to_amount(&missing_sum),
        );

        Ok(MarkingRun { outcome, reason })
    }
}
