use std::path::PathBuf;

/// Records and archives produced for one scan suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTypeSummary {
    pub suffix: String,
    pub scan_type: String,
    pub records: usize,
    pub archives: usize,
}

/// A scan left out of the table, with the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedScanSummary {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ConversionReport {
    pub output_dir: PathBuf,
    pub table_path: PathBuf,
    /// Scans found under the dataset root.
    pub discovered: usize,
    /// Scans dropped because their subject has no GUID.
    pub unmapped: usize,
    pub records: usize,
    pub archives: usize,
    /// Per-suffix counts, ordered by suffix.
    pub scan_types: Vec<ScanTypeSummary>,
    pub skipped: Vec<SkippedScanSummary>,
}

impl ConversionReport {
    pub fn has_skipped(&self) -> bool {
        !self.skipped.is_empty()
    }
}
