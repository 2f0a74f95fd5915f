//! Calibration record for the grid marking run
//!
//! One screen coordinate plus the tunable limits and delays the engine
//! needs. Captured once by the operator, loaded at the start of every run,
//! never mutated mid-run. The on-disk field names are fixed by the file
//! format the calibration tooling has always written.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::types::{ReconcileError, ReconcileResult};

/// Default name of the calibration file
pub const CALIBRATION_FILE: &str = "config_emsys_grid.json";

const DEFAULT_MAX_STEPS: u32 = 25_000;
const DEFAULT_SAME_ROW_LIMIT: u32 = 25;
const DEFAULT_POST_COPY_DELAY_SECS: f64 = 0.15;
const DEFAULT_ROW_ADVANCE_DELAY_SECS: f64 = 0.06;

/// A screen coordinate inside the external application's grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

/// Calibration parameters for a marking run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRecord {
    /// The calibrated cell the engine clicks to focus the grid
    pub grid_cell: GridPoint,
    /// Hard cap on scan iterations
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    /// Consecutive identical reads (row text or label) taken as end of data
    #[serde(default = "default_same_row_limit")]
    pub same_row_limit: u32,
    /// Seconds to let the application settle after a row copy
    #[serde(default = "default_post_copy_delay", rename = "delay_apos_copiar")]
    pub post_copy_delay_secs: f64,
    /// Seconds between row advances
    #[serde(default = "default_row_advance_delay", rename = "delay_entre_linhas")]
    pub row_advance_delay_secs: f64,
}

fn default_max_steps() -> u32 {
    DEFAULT_MAX_STEPS
}

fn default_same_row_limit() -> u32 {
    DEFAULT_SAME_ROW_LIMIT
}

fn default_post_copy_delay() -> f64 {
    DEFAULT_POST_COPY_DELAY_SECS
}

fn default_row_advance_delay() -> f64 {
    DEFAULT_ROW_ADVANCE_DELAY_SECS
}

impl CalibrationRecord {
    /// Build a record for a freshly captured anchor point, with default
    /// limits and delays. This is what the one-time calibration action
    /// persists.
    pub fn at_point(x: i32, y: i32) -> Self {
        Self {
            grid_cell: GridPoint { x, y },
            max_steps: DEFAULT_MAX_STEPS,
            same_row_limit: DEFAULT_SAME_ROW_LIMIT,
            post_copy_delay_secs: DEFAULT_POST_COPY_DELAY_SECS,
            row_advance_delay_secs: DEFAULT_ROW_ADVANCE_DELAY_SECS,
        }
    }

    /// Load the calibration file.
    ///
    /// An absent file is [`ReconcileError::CalibrationMissing`]; a present
    /// but unparsable one is [`ReconcileError::CalibrationInvalid`]. Both
    /// mean the run must not start.
    pub fn load(path: &Path) -> ReconcileResult<Self> {
        if !path.exists() {
            return Err(ReconcileError::CalibrationMissing(path.to_path_buf()));
        }
        let contents = fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| ReconcileError::CalibrationInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Persist the record as pretty-printed JSON
    pub fn save(&self, path: &Path) -> ReconcileResult<()> {
        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| ReconcileError::CalibrationInvalid {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Settle time after copying a row
    pub fn post_copy_delay(&self) -> Duration {
        Duration::from_secs_f64(self.post_copy_delay_secs.max(0.0))
    }

    /// Pause between row advances
    pub fn row_advance_delay(&self) -> Duration {
        Duration::from_secs_f64(self.row_advance_delay_secs.max(0.0))
    }
}
