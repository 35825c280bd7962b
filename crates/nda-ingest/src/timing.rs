//! Per-subject and per-session `*_scans.tsv` tables.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use nda_model::{Scan, ScanTimingRow, ScanTimingTable};
use tracing::debug;

use crate::error::Result;
use crate::tsv::read_tsv_table;

/// Identifies the timing table a scan belongs to.
pub type TimingKey = (String, Option<String>);

/// Location of the timing table covering `scan`.
pub fn scan_timing_path(bids_root: &Path, scan: &Scan) -> PathBuf {
    let subject_dir = bids_root.join(format!("sub-{}", scan.subject));
    match &scan.session {
        Some(session) => subject_dir
            .join(format!("ses-{session}"))
            .join(format!("sub-{}_ses-{session}_scans.tsv", scan.subject)),
        None => subject_dir.join(format!("sub-{}_scans.tsv", scan.subject)),
    }
}

/// Loads one timing table, requiring `filename` and `acq_time`.
pub fn load_scan_timing(path: &Path) -> Result<ScanTimingTable> {
    let table = read_tsv_table(path)?;
    let filename_index = table.require_column("filename")?;
    let acq_time_index = table.require_column("acq_time")?;
    let rows = table
        .rows
        .iter()
        .map(|row| ScanTimingRow {
            filename: table.cell(row, filename_index).to_string(),
            acq_time: table.cell(row, acq_time_index).to_string(),
        })
        .collect();
    Ok(ScanTimingTable {
        source: path.to_path_buf(),
        rows,
    })
}

/// Timing tables for a set of scans, each loaded once.
#[derive(Debug, Clone, Default)]
pub struct TimingIndex {
    tables: BTreeMap<TimingKey, ScanTimingTable>,
}

impl TimingIndex {
    /// Loads every table the given scans need. A missing table is an error:
    /// the interview date cannot be derived without it.
    pub fn load_for_scans(bids_root: &Path, scans: &[Scan]) -> Result<Self> {
        let mut tables = BTreeMap::new();
        for scan in scans {
            let key = timing_key(scan);
            if tables.contains_key(&key) {
                continue;
            }
            let path = scan_timing_path(bids_root, scan);
            let table = load_scan_timing(&path)?;
            debug!(path = %path.display(), rows = table.rows.len(), "loaded scan timing table");
            tables.insert(key, table);
        }
        Ok(Self { tables })
    }

    pub fn insert(&mut self, subject: &str, session: Option<&str>, table: ScanTimingTable) {
        self.tables
            .insert((subject.to_string(), session.map(str::to_string)), table);
    }

    pub fn table_for(&self, scan: &Scan) -> Option<&ScanTimingTable> {
        self.tables.get(&timing_key(scan))
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn timing_key(scan: &Scan) -> TimingKey {
    (scan.subject.clone(), scan.session.clone())
}
