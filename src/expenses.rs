//! Statement expense sidecar
//!
//! The Vale Card statement parser aggregates the statement's negative
//! values (expenses, split into administrative fee and everything else)
//! into a small JSON sidecar. The run summary appends this block when the
//! file exists; the matching engine itself never looks at it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::types::ReconcileResult;

/// Default name of the expense sidecar file
pub const EXPENSE_FILE: &str = "valecard_despesas.json";

/// Aggregated statement expenses, stored as absolute values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpenseSummary {
    /// Total of all negative statement values
    #[serde(default)]
    pub total_despesas_abs: f64,
    /// Portion identified as administrative fee lines
    #[serde(default)]
    pub taxa_adm_abs: f64,
    /// Remaining expenses
    #[serde(default)]
    pub outras_abs: f64,
    /// Source statement the numbers came from
    #[serde(default)]
    pub arquivo: String,
    /// When the sidecar was last written ("DD/MM/YYYY HH:MM:SS")
    #[serde(default)]
    pub atualizado_em: String,
}

impl ExpenseSummary {
    /// Load the sidecar, if present and readable.
    ///
    /// Lenient on purpose: an absent or corrupt file just means "no
    /// expense block in the summary". Amounts are coerced to absolute
    /// values on the way in.
    pub fn load(path: &Path) -> Option<Self> {
        let contents = fs::read_to_string(path).ok()?;
        let mut summary: ExpenseSummary = serde_json::from_str(&contents).ok()?;
        summary.total_despesas_abs = summary.total_despesas_abs.abs();
        summary.taxa_adm_abs = summary.taxa_adm_abs.abs();
        summary.outras_abs = summary.outras_abs.abs();
        Some(summary)
    }

    /// Persist the sidecar as pretty-printed JSON
    pub fn save(&self, path: &Path) -> ReconcileResult<()> {
        let contents = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        fs::write(path, contents)?;
        Ok(())
    }
}
