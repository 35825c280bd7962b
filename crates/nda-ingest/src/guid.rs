//! GUID mapping files and the subject presence policy.

use std::collections::BTreeSet;
use std::path::Path;

use nda_model::{GuidMapping, ParticipantTable, SubjectStrictness};
use tracing::warn;

use crate::error::{IngestError, Result};

const SEPARATOR: &str = " - ";

/// A parsed GUID mapping plus what was noticed while parsing it.
#[derive(Debug, Clone, Default)]
pub struct ParsedGuidMapping {
    pub mapping: GuidMapping,
    /// Number of non-empty lines in the file.
    pub line_count: usize,
    /// Normalized subject labels that appeared more than once.
    pub duplicates: Vec<String>,
}

/// Parses `<participant_id> - <GUID>` lines. Blank lines are ignored and a
/// later duplicate replaces the earlier entry.
pub fn parse_guid_mapping(contents: &str, source: &Path) -> Result<ParsedGuidMapping> {
    let mut parsed = ParsedGuidMapping::default();
    for (index, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        parsed.line_count += 1;

        let parts: Vec<&str> = line.split(SEPARATOR).collect();
        let [subject, guid] = parts.as_slice() else {
            return Err(IngestError::GuidLine {
                path: source.to_path_buf(),
                line: index + 1,
                content: line.to_string(),
            });
        };
        let (subject, guid) = (subject.trim(), guid.trim());
        if subject.is_empty() || guid.is_empty() {
            return Err(IngestError::GuidLine {
                path: source.to_path_buf(),
                line: index + 1,
                content: line.to_string(),
            });
        }
        if parsed.mapping.insert(subject, guid).is_some() {
            parsed
                .duplicates
                .push(nda_model::normalize_subject_id(subject).to_string());
        }
    }
    Ok(parsed)
}

/// Reads and parses a GUID mapping file.
pub fn load_guid_mapping(path: &Path) -> Result<ParsedGuidMapping> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let parsed = parse_guid_mapping(&contents, path)?;
    if !parsed.duplicates.is_empty() {
        warn!(
            path = %path.display(),
            duplicate_count = parsed.duplicates.len(),
            "GUID mapping has duplicate subjects; the last entry wins"
        );
    }
    Ok(parsed)
}

/// Applies the subject presence policy: returns the participants that have a
/// GUID, or fails under [`SubjectStrictness::Strict`] when any do not.
pub fn select_mapped_subjects(
    participants: &ParticipantTable,
    mapping: &GuidMapping,
    strictness: SubjectStrictness,
) -> Result<BTreeSet<String>> {
    let mut mapped = BTreeSet::new();
    let mut missing = Vec::new();
    for subject in participants.subjects() {
        if mapping.contains(subject) {
            mapped.insert(subject.to_string());
        } else {
            missing.push(format!("sub-{subject}"));
        }
    }

    if !missing.is_empty() {
        match strictness {
            SubjectStrictness::Strict => {
                return Err(IngestError::UnmappedSubjects { subjects: missing });
            }
            SubjectStrictness::Warn => {
                warn!(
                    missing_count = missing.len(),
                    subjects = %missing.join(", "),
                    "subjects missing from GUID mapping; continuing with available subjects"
                );
            }
            SubjectStrictness::Ignore => {}
        }
    }
    Ok(mapped)
}
