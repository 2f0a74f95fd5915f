//! Run artifact writer
//!
//! Every non-fatal termination persists three plain-text artifacts: the
//! matched amounts, the missing amounts, and a human-readable summary.
//! Formats are fixed; the operator's downstream spreadsheet tooling reads
//! them as-is.

use bigdecimal::{BigDecimal, Zero};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::amount::{number_to_amount, sum_amounts};
use crate::expenses::{ExpenseSummary, EXPENSE_FILE};
use crate::types::{ReconcileResult, RunOutcome};

/// Matched amounts, one per line, insertion order
pub const MATCHED_FILE: &str = "encontrados.txt";
/// Missing amounts, one per line, multiset order
pub const MISSING_FILE: &str = "nao_encontrados.txt";
/// Human-readable run summary
pub const SUMMARY_FILE: &str = "resumo.txt";

/// Persists the artifacts of a marking run into one output directory
#[derive(Debug, Clone)]
pub struct ResultWriter {
    dir: PathBuf,
    expense_file: PathBuf,
    captures_dir_note: Option<String>,
}

impl ResultWriter {
    /// Write artifacts into `dir`; the expense sidecar is looked up there
    /// too under its default name
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let expense_file = dir.join(EXPENSE_FILE);
        Self {
            dir,
            expense_file,
            captures_dir_note: None,
        }
    }

    /// Look for the expense sidecar at a specific path instead
    pub fn with_expense_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.expense_file = path.into();
        self
    }

    /// Mention the capture folder in the summary footer
    pub fn with_captures_dir(mut self, dir: impl Into<String>) -> Self {
        self.captures_dir_note = Some(dir.into());
        self
    }

    /// Directory the artifacts land in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist all three artifacts for a finished run
    pub fn write(&self, outcome: &RunOutcome) -> ReconcileResult<()> {
        fs::create_dir_all(&self.dir)?;

        fs::write(self.dir.join(MATCHED_FILE), lines(&outcome.matched))?;
        fs::write(self.dir.join(MISSING_FILE), lines(&outcome.missing))?;
        fs::write(self.dir.join(SUMMARY_FILE), self.summary_text(outcome))?;
        Ok(())
    }

    fn summary_text(&self, outcome: &RunOutcome) -> String {
        let matched_sum = sum_amounts(outcome.matched.iter().map(String::as_str));
        let missing_sum = sum_amounts(outcome.missing.iter().map(String::as_str));

        let mut text = String::new();
        text.push_str("Resumo Portal x Grid\n");
        text.push_str("--------------------\n");
        let _ = writeln!(text, "Total portal (unificado): {}", outcome.total_target);
        let _ = writeln!(text, "Marcados: {}", outcome.matched.len());
        let _ = writeln!(text, "Não encontrados: {}", outcome.missing.len());
        text.push('\n');
        let _ = writeln!(text, "Soma marcados: R$ {}", number_to_amount(&matched_sum));
        let _ = writeln!(
            text,
            "Soma não encontrados: R$ {}",
            number_to_amount(&missing_sum)
        );

        if let Some(captures) = &self.captures_dir_note {
            text.push('\n');
            let _ = writeln!(text, "Pasta de capturas: {captures}");
        }

        if let Some(expenses) = ExpenseSummary::load(&self.expense_file) {
            text.push('\n');
            text.push_str("Vale Card - Despesas (do último PDF lido)\n");
            let _ = writeln!(
                text,
                "Total despesas: R$ {}",
                format_f64(expenses.total_despesas_abs)
            );
            let _ = writeln!(
                text,
                "Taxa administrativa: R$ {}",
                format_f64(expenses.taxa_adm_abs)
            );
            let _ = writeln!(text, "Outras despesas: R$ {}", format_f64(expenses.outras_abs));
        }

        text
    }
}

fn lines(values: &[String]) -> String {
    let mut out = String::new();
    for v in values {
        out.push_str(v);
        out.push('\n');
    }
    out
}

fn format_f64(value: f64) -> String {
    let decimal = BigDecimal::try_from(value).unwrap_or_else(|_| BigDecimal::zero());
    number_to_amount(&decimal)
}
