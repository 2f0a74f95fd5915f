//! Scripted grid driver for testing
//!
//! Simulates the external application's grid: a fixed list of row texts
//! with a selection cursor that pins at the last row, the way a real grid
//! stops moving when "down" is pressed past the end. That pinned-repeat
//! behavior is what the engine's stall detection keys on.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::calibration::GridPoint;
use crate::traits::{DriverError, GridDriver};

#[derive(Debug, Default)]
struct ScriptState {
    rows: Vec<String>,
    cursor: usize,
    clicks: usize,
    reads: usize,
    advances: usize,
    accepts: usize,
    accepted_rows: Vec<usize>,
    interrupt_on_read: Option<usize>,
    io_error_on_read: Option<usize>,
    fail_clicks: bool,
}

/// Scripted driver test double.
///
/// Clones share state, so a test can keep one handle for assertions while
/// the engine consumes the other.
#[derive(Debug, Clone, Default)]
pub struct ScriptedGridDriver {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedGridDriver {
    /// Create a driver over the given row texts
    pub fn new<I, S>(rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            state: Arc::new(Mutex::new(ScriptState {
                rows: rows.into_iter().map(Into::into).collect(),
                ..Default::default()
            })),
        }
    }

    /// Raise [`DriverError::Interrupted`] on the n-th read (1-based)
    pub fn interrupt_on_read(self, nth: usize) -> Self {
        self.state.lock().unwrap().interrupt_on_read = Some(nth);
        self
    }

    /// Fail the n-th read (1-based) with a transient I/O error
    pub fn fail_read(self, nth: usize) -> Self {
        self.state.lock().unwrap().io_error_on_read = Some(nth);
        self
    }

    /// Make every anchor click fail
    pub fn failing_clicks(self) -> Self {
        self.state.lock().unwrap().fail_clicks = true;
        self
    }

    /// Number of `read_selected_row_text` calls so far
    pub fn reads(&self) -> usize {
        self.state.lock().unwrap().reads
    }

    /// Number of `advance_row` calls so far
    pub fn advances(&self) -> usize {
        self.state.lock().unwrap().advances
    }

    /// Number of `accept_row` calls so far
    pub fn accepts(&self) -> usize {
        self.state.lock().unwrap().accepts
    }

    /// Number of `click_anchor` calls so far
    pub fn clicks(&self) -> usize {
        self.state.lock().unwrap().clicks
    }

    /// Cursor positions that were accepted, in order
    pub fn accepted_rows(&self) -> Vec<usize> {
        self.state.lock().unwrap().accepted_rows.clone()
    }
}

impl ScriptState {
    fn current_row(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        let index = self.cursor.min(self.rows.len() - 1);
        self.rows[index].clone()
    }

    fn move_down(&mut self) {
        // selection pins at the last populated row
        self.cursor = (self.cursor + 1).min(self.rows.len().saturating_sub(1));
    }
}

#[async_trait]
impl GridDriver for ScriptedGridDriver {
    async fn click_anchor(&mut self, _point: GridPoint) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.clicks += 1;
        if state.fail_clicks {
            return Err(DriverError::Io("click target unreachable".to_string()));
        }
        Ok(())
    }

    async fn read_selected_row_text(&mut self) -> Result<String, DriverError> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        if state.interrupt_on_read == Some(state.reads) {
            return Err(DriverError::Interrupted);
        }
        if state.io_error_on_read == Some(state.reads) {
            return Err(DriverError::Io("clipboard read failed".to_string()));
        }
        Ok(state.current_row())
    }

    async fn advance_row(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.advances += 1;
        state.move_down();
        Ok(())
    }

    async fn accept_row(&mut self) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.accepts += 1;
        let cursor = state.cursor;
        state.accepted_rows.push(cursor);
        // the real grid auto-advances after a confirm
        state.move_down();
        Ok(())
    }
}
