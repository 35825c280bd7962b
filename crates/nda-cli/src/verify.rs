//! The `verify-guid` command: check a GUID mapping file before a conversion.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nda_ingest::{ParsedGuidMapping, load_guid_mapping};

use crate::logging::redact_value;

/// Entries listed in the report.
const SAMPLE_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuidReport {
    pub path: PathBuf,
    /// Non-empty lines in the file.
    pub line_count: usize,
    /// Distinct subjects after normalization.
    pub entry_count: usize,
    pub duplicates: Vec<String>,
    /// First entries in subject order.
    pub sample: Vec<(String, String)>,
}

impl GuidReport {
    fn from_parsed(path: &Path, parsed: &ParsedGuidMapping) -> Self {
        Self {
            path: path.to_path_buf(),
            line_count: parsed.line_count,
            entry_count: parsed.mapping.len(),
            duplicates: parsed.duplicates.clone(),
            sample: parsed
                .mapping
                .iter()
                .take(SAMPLE_SIZE)
                .map(|(subject, guid)| (subject.to_string(), guid.to_string()))
                .collect(),
        }
    }

    /// Human-readable report. GUIDs are redacted unless `--log-data` is set.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "GUID mapping: {}", self.path.display());
        let _ = writeln!(out, "Lines: {}", self.line_count);
        let _ = writeln!(out, "Entries: {}", self.entry_count);
        if self.duplicates.is_empty() {
            let _ = writeln!(out, "Duplicates: none");
        } else {
            let labels: Vec<String> = self
                .duplicates
                .iter()
                .map(|subject| format!("sub-{subject}"))
                .collect();
            let _ = writeln!(out, "Duplicates: {}", labels.join(", "));
        }
        if !self.sample.is_empty() {
            let _ = writeln!(out, "First entries:");
            for (subject, guid) in &self.sample {
                let _ = writeln!(out, "  sub-{subject} - {}", redact_value(guid));
            }
        }
        out
    }
}

/// Parses a GUID mapping file and summarizes it.
pub fn verify_guid_file(path: &Path) -> Result<GuidReport> {
    let parsed = load_guid_mapping(path)
        .with_context(|| format!("verify GUID mapping {}", path.display()))?;
    Ok(GuidReport::from_parsed(path, &parsed))
}
