//! Unified capture store
//!
//! Capture sources (portal scraper, statement parsers) each drop their
//! normalized rows here as `captura_NNN.txt` files. Reading the store
//! unifies every file, re-normalizes the fields, and removes duplicates by
//! the full record identity so the same sale captured twice counts once.

use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::amount::{format_timestamp, normalize_amount, parse_timestamp, sum_amounts};
use crate::types::{CaptureRecord, ReconcileResult};

/// Default name of the capture directory
pub const CAPTURES_DIR: &str = "capturas_portal";

const CAPTURE_PREFIX: &str = "captura_";
const CAPTURE_SUFFIX: &str = ".txt";
const CAPTURE_HEADER: &str = "data_hora;valor_bruto;origem;id_opcional";

/// Totals over the unified capture list
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSummary {
    /// Record count after deduplication
    pub total: usize,
    /// Sum of the gross amounts
    pub gross_sum: BigDecimal,
    /// Oldest timestamp, when any record exists
    pub earliest: Option<NaiveDateTime>,
    /// Newest timestamp, when any record exists
    pub latest: Option<NaiveDateTime>,
}

/// File-backed store of capture batches
#[derive(Debug, Clone)]
pub struct CaptureStore {
    dir: PathBuf,
}

impl CaptureStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the batches live in
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save one capture batch as the next numbered file.
    ///
    /// Records are written in canonical textual form; the batch keeps the
    /// caller's ordering. Returns the path of the new file.
    pub fn save(&self, records: &[CaptureRecord]) -> ReconcileResult<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.next_capture_path()?;

        let mut contents = String::from(CAPTURE_HEADER);
        contents.push('\n');
        for record in records {
            contents.push_str(&format_timestamp(&record.timestamp));
            contents.push(';');
            contents.push_str(&record.amount);
            contents.push(';');
            contents.push_str(&record.origin);
            contents.push(';');
            contents.push_str(record.external_id.as_deref().unwrap_or(""));
            contents.push('\n');
        }
        fs::write(&path, contents)?;
        Ok(path)
    }

    /// Read and unify every capture file, oldest file first.
    ///
    /// Header, blank, and malformed lines are skipped; fields are run
    /// through the normalizers again so hand-edited files stay usable.
    /// Duplicates (full 4-tuple identity) are removed, first occurrence
    /// wins. Downstream callers hand this list to the engine, which does
    /// not deduplicate on its own.
    pub fn read_all(&self) -> ReconcileResult<Vec<CaptureRecord>> {
        let mut records = Vec::new();
        for path in self.capture_files()? {
            let contents = fs::read_to_string(&path)?;
            for line in contents.lines() {
                let line = line.trim();
                if line.is_empty() || line.to_lowercase().starts_with("data_hora") {
                    continue;
                }
                if let Some(record) = parse_capture_line(line) {
                    records.push(record);
                }
            }
        }

        let mut seen = HashSet::new();
        records.retain(|r| seen.insert(r.clone()));
        Ok(records)
    }

    /// Remove every capture file, returning how many were deleted
    pub fn clear(&self) -> ReconcileResult<usize> {
        let files = self.capture_files()?;
        let mut removed = 0;
        for path in files {
            fs::remove_file(path)?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Export the unified list as a semicolon-separated CSV.
    ///
    /// Returns the number of exported records.
    pub fn export_csv(&self, path: &Path) -> ReconcileResult<usize> {
        let records = self.read_all()?;
        let mut contents = String::from(CAPTURE_HEADER);
        contents.push('\n');
        for record in &records {
            contents.push_str(&format!(
                "{};{};{};{}\n",
                format_timestamp(&record.timestamp),
                record.amount,
                record.origin,
                record.external_id.as_deref().unwrap_or("")
            ));
        }
        fs::write(path, contents)?;
        Ok(records.len())
    }

    /// Count, gross sum, and date range of the unified list
    pub fn summarize(&self) -> ReconcileResult<CaptureSummary> {
        let records = self.read_all()?;
        let gross_sum = sum_amounts(records.iter().map(|r| r.amount.as_str()));
        let earliest = records.iter().map(|r| r.timestamp).min();
        let latest = records.iter().map(|r| r.timestamp).max();
        Ok(CaptureSummary {
            total: records.len(),
            gross_sum,
            earliest,
            latest,
        })
    }

    fn capture_files(&self) -> ReconcileResult<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut files: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with(CAPTURE_PREFIX) && n.ends_with(CAPTURE_SUFFIX))
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn next_capture_path(&self) -> ReconcileResult<PathBuf> {
        let highest = self
            .capture_files()?
            .iter()
            .filter_map(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .and_then(|n| {
                        n.strip_prefix(CAPTURE_PREFIX)
                            .and_then(|rest| rest.strip_suffix(CAPTURE_SUFFIX))
                    })
                    .and_then(|num| num.parse::<u32>().ok())
            })
            .max()
            .unwrap_or(0);
        Ok(self
            .dir
            .join(format!("{CAPTURE_PREFIX}{:03}{CAPTURE_SUFFIX}", highest + 1)))
    }
}

fn parse_capture_line(line: &str) -> Option<CaptureRecord> {
    let parts: Vec<&str> = line.split(';').collect();
    if parts.len() < 3 {
        return None;
    }
    let timestamp = parse_timestamp(parts[0])?;
    let amount = normalize_amount(parts[1]);
    if amount.is_empty() {
        return None;
    }
    let origin = parts[2].trim().to_string();
    let external_id = parts
        .get(3)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from);
    Some(CaptureRecord::new(timestamp, amount, origin, external_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ts: &str, amount: &str, origin: &str, id: Option<&str>) -> CaptureRecord {
        CaptureRecord::new(
            parse_timestamp(ts).unwrap(),
            amount.to_string(),
            origin.to_string(),
            id.map(String::from),
        )
    }

    #[test]
    fn save_numbers_files_sequentially() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(dir.path());
        let batch = vec![record("01/02/2024 10:00:00", "100,00", "GoodCard", None)];

        let first = store.save(&batch).unwrap();
        let second = store.save(&batch).unwrap();
        assert!(first.ends_with("captura_001.txt"));
        assert!(second.ends_with("captura_002.txt"));
    }

    #[test]
    fn read_all_unifies_and_deduplicates() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(dir.path());
        let sale = record("01/02/2024 10:00:00", "100,00", "GoodCard", None);
        let other = record("01/02/2024 11:00:00", "200,00", "ValeCard", Some("555"));

        store.save(&[sale.clone(), other.clone()]).unwrap();
        // the same sale captured again in a later batch
        store.save(&[sale.clone()]).unwrap();

        let records = store.read_all().unwrap();
        assert_eq!(records, vec![sale, other]);
    }

    #[test]
    fn read_all_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(
            dir.path().join("captura_001.txt"),
            "data_hora;valor_bruto;origem;id_opcional\n\
             01/02/2024 10:00:00;100,00;GoodCard;\n\
             linha quebrada\n\
             99/99/9999;1,00;X;\n\
             01/02/2024 11:00:00;sem valor;X;\n",
        )
        .unwrap();

        let store = CaptureStore::new(dir.path());
        let records = store.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount, "100,00");
        assert_eq!(records[0].external_id, None);
    }

    #[test]
    fn summarize_reports_totals_and_date_range() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(dir.path());
        store
            .save(&[
                record("02/02/2024 09:00:00", "100,00", "GoodCard", None),
                record("01/02/2024 10:00:00", "1.234,50", "RedeFrota", Some("1")),
            ])
            .unwrap();

        let summary = store.summarize().unwrap();
        assert_eq!(summary.total, 2);
        assert_eq!(summary.gross_sum, crate::amount::amount_to_number("1.334,50"));
        assert_eq!(
            summary.earliest,
            Some(parse_timestamp("01/02/2024 10:00:00").unwrap())
        );
        assert_eq!(
            summary.latest,
            Some(parse_timestamp("02/02/2024 09:00:00").unwrap())
        );
    }

    #[test]
    fn clear_removes_only_capture_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(dir.path());
        store
            .save(&[record("01/02/2024 10:00:00", "1,00", "X", None)])
            .unwrap();
        fs::write(dir.path().join("notas.txt"), "keep me").unwrap();

        assert_eq!(store.clear().unwrap(), 1);
        assert!(store.read_all().unwrap().is_empty());
        assert!(dir.path().join("notas.txt").exists());
    }

    #[test]
    fn export_csv_writes_the_unified_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(dir.path().join(CAPTURES_DIR));
        store
            .save(&[record("01/02/2024 10:00:00", "9,90", "GoodCard", Some("id1"))])
            .unwrap();

        let csv_path = dir.path().join("export.csv");
        let exported = store.export_csv(&csv_path).unwrap();
        assert_eq!(exported, 1);
        let csv = fs::read_to_string(&csv_path).unwrap();
        assert!(csv.starts_with("data_hora;valor_bruto;origem;id_opcional\n"));
        assert!(csv.contains("01/02/2024 10:00:00;9,90;GoodCard;id1"));
    }

    #[test]
    fn empty_store_summarizes_to_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = CaptureStore::new(dir.path().join("nao_existe"));
        let summary = store.summarize().unwrap();
        assert_eq!(summary.total, 0);
        assert_eq!(summary.earliest, None);
    }
}
