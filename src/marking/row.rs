//! Decomposition of one copied grid row
//!
//! The external application copies the selected row as tab-delimited text,
//! sometimes prefixed by header lines. Only the last non-blank line is the
//! row itself.

use regex::Regex;
use std::sync::OnceLock;

use crate::amount::normalize_amount;

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b\d+/\d+\b").expect("invalid label regex"))
}

/// Where to look for the amount inside a copied row.
///
/// The default mirrors the copy format observed in the target application:
/// when the row splits into at least eight tab-separated fields, the
/// seventh field is the gross amount column. This is a heuristic tied to
/// one application's grid, so it is a policy value rather than a constant;
/// rows with fewer fields fall back to the first monetary pattern anywhere
/// in the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnPolicy {
    /// Minimum tab-separated field count for the fixed column to apply
    pub min_fields: usize,
    /// Zero-based index of the amount field
    pub amount_field: usize,
}

impl Default for ColumnPolicy {
    fn default() -> Self {
        Self {
            min_fields: 8,
            amount_field: 6,
        }
    }
}

/// One row read, decomposed for matching and stall detection.
///
/// Transient: lives for a single scan iteration and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRowSample {
    /// Last non-blank line of the copied text
    pub row_line: String,
    /// Canonical amount extracted from the row, or empty
    pub amount: String,
    /// Low-cardinality token (invoice-like "n/m" identifier) used only for
    /// stall detection, or empty
    pub label: String,
}

impl GridRowSample {
    /// Decompose raw copied row text under the given column policy
    pub fn parse(raw: &str, policy: &ColumnPolicy) -> Self {
        let row_line = last_non_blank_line(raw);
        let amount = extract_amount(&row_line, policy);
        let label = label_re()
            .find(&row_line)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        Self {
            row_line,
            amount,
            label,
        }
    }
}

fn last_non_blank_line(raw: &str) -> String {
    let cleaned = raw.replace('\r', "");
    if cleaned.contains('\n') {
        cleaned
            .split('\n')
            .filter(|l| !l.trim().is_empty())
            .next_back()
            .unwrap_or("")
            .to_string()
    } else {
        cleaned
    }
}

fn extract_amount(row_line: &str, policy: &ColumnPolicy) -> String {
    let fields: Vec<&str> = row_line.split('\t').collect();
    if fields.len() >= policy.min_fields {
        // Fixed column wins outright; a blank cell there means no amount,
        // the fallback is only for rows that don't match the grid layout.
        return normalize_amount(fields[policy.amount_field]);
    }
    normalize_amount(row_line)
}
