//! Per-subject lookups consulted while building records.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::scan::normalize_subject_id;

/// Subject label to NDA GUID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuidMapping {
    entries: BTreeMap<String, String>,
}

impl GuidMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts an entry, normalizing the key. Returns the previous GUID when
    /// the subject was already mapped.
    pub fn insert(&mut self, subject: &str, guid: impl Into<String>) -> Option<String> {
        self.entries
            .insert(normalize_subject_id(subject).to_string(), guid.into())
    }

    pub fn guid_for(&self, subject: &str) -> Option<&str> {
        self.entries
            .get(normalize_subject_id(subject))
            .map(String::as_str)
    }

    pub fn contains(&self, subject: &str) -> bool {
        self.entries.contains_key(normalize_subject_id(subject))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(subject, guid)| (subject.as_str(), guid.as_str()))
    }
}

/// One row of `participants.tsv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Subject label without the `sub-` prefix.
    pub subject: String,
    pub age_years: f64,
    pub sex: String,
}

impl Participant {
    /// Age in whole months, rounded half to even.
    pub fn age_in_months(&self) -> i64 {
        (self.age_years * 12.0).round_ties_even() as i64
    }
}

/// Participants keyed by subject label, in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantTable {
    pub source: PathBuf,
    participants: Vec<Participant>,
}

impl ParticipantTable {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            participants: Vec::new(),
        }
    }

    pub fn push(&mut self, participant: Participant) {
        self.participants.push(participant);
    }

    /// First row for `subject`.
    pub fn get(&self, subject: &str) -> Option<&Participant> {
        let subject = normalize_subject_id(subject);
        self.participants
            .iter()
            .find(|participant| participant.subject == subject)
    }

    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.participants
            .iter()
            .map(|participant| participant.subject.as_str())
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

/// One row of a `*_scans.tsv` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTimingRow {
    /// Scan path relative to the subject or session directory.
    pub filename: String,
    /// ISO 8601 acquisition timestamp.
    pub acq_time: String,
}

/// Acquisition times for one subject or session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTimingTable {
    pub source: PathBuf,
    pub rows: Vec<ScanTimingRow>,
}

impl ScanTimingTable {
    /// Acquisition time of the first row whose `filename` names the trailing
    /// components of `scan_path`.
    pub fn acquisition_time_for(&self, scan_path: &Path) -> Option<&str> {
        self.rows
            .iter()
            .find(|row| {
                let relative: PathBuf = row.filename.split('/').collect();
                !row.filename.is_empty() && scan_path.ends_with(relative)
            })
            .map(|row| row.acq_time.as_str())
    }
}
