//! Sidecar inheritance: merges the JSON sidecars that apply to a scan.
//!
//! The scan's sidecar name is split on `_` and each token is routed into
//! the candidate names of the levels it belongs to. Session tokens only
//! appear in session-level names, subject tokens in subject and session
//! names, run tokens in none of the inherited names, and every other token
//! in all of them.

use std::path::{Path, PathBuf};

use nda_model::{MergedMetadata, Scan, SidecarLevel};
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{CoreError, Result};

const RUN_TOKEN: &str = "run";
const SESSION_TOKEN: &str = "ses";
const SUBJECT_TOKEN: &str = "sub";

/// A sidecar that contributed to a scan's merged metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SidecarSource {
    pub level: SidecarLevel,
    pub path: PathBuf,
}

/// Merged metadata plus the sidecars that were found, least specific first.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSidecars {
    pub metadata: MergedMetadata,
    pub sources: Vec<SidecarSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenClass {
    Run,
    Session,
    Subject,
    Entity,
}

impl TokenClass {
    fn of(token: &str) -> Self {
        if is_run_token(token) {
            Self::Run
        } else if is_session_token(token) {
            Self::Session
        } else if is_subject_token(token) {
            Self::Subject
        } else {
            Self::Entity
        }
    }

    /// Inherited levels whose file names keep a token of this class.
    fn levels(self) -> &'static [SidecarLevel] {
        match self {
            Self::Run => &[],
            Self::Session => &[SidecarLevel::Session],
            Self::Subject => &[SidecarLevel::Subject, SidecarLevel::Session],
            Self::Entity => &[
                SidecarLevel::Dataset,
                SidecarLevel::Subject,
                SidecarLevel::Session,
            ],
        }
    }
}

fn is_run_token(token: &str) -> bool {
    token.starts_with(RUN_TOKEN)
}

fn is_session_token(token: &str) -> bool {
    token.starts_with(SESSION_TOKEN)
}

fn is_subject_token(token: &str) -> bool {
    token.starts_with(SUBJECT_TOKEN)
}

#[derive(Debug, Default)]
struct CandidateNames<'a> {
    dataset: Vec<&'a str>,
    subject: Vec<&'a str>,
    session: Vec<&'a str>,
    subject_dir: Option<&'a str>,
    session_dir: Option<&'a str>,
}

impl<'a> CandidateNames<'a> {
    fn partition(sidecar_name: &'a str) -> Self {
        let mut names = Self::default();
        for token in sidecar_name.split('_') {
            let class = TokenClass::of(token);
            match class {
                TokenClass::Session => names.session_dir = Some(token),
                TokenClass::Subject => names.subject_dir = Some(token),
                TokenClass::Run | TokenClass::Entity => {}
            }
            for level in class.levels() {
                names.tokens_mut(*level).push(token);
            }
        }
        names
    }

    fn tokens_mut(&mut self, level: SidecarLevel) -> &mut Vec<&'a str> {
        match level {
            SidecarLevel::Dataset => &mut self.dataset,
            SidecarLevel::Subject => &mut self.subject,
            SidecarLevel::Session | SidecarLevel::Scan => &mut self.session,
        }
    }
}

/// Candidate sidecar paths for `scan`, least specific first.
///
/// The subject level is only produced when the name carries a subject token
/// and the session level only when it carries a session token. The last
/// entry is always the scan's own sidecar.
pub fn candidate_sidecars(bids_root: &Path, scan: &Scan) -> Vec<SidecarSource> {
    let sidecar_name = format!("{}.json", scan.stem());
    let names = CandidateNames::partition(&sidecar_name);

    let mut candidates = vec![SidecarSource {
        level: SidecarLevel::Dataset,
        path: bids_root.join(names.dataset.join("_")),
    }];
    if let Some(subject_dir) = names.subject_dir {
        let subject_root = bids_root.join(subject_dir);
        candidates.push(SidecarSource {
            level: SidecarLevel::Subject,
            path: subject_root.join(names.subject.join("_")),
        });
        if let Some(session_dir) = names.session_dir {
            candidates.push(SidecarSource {
                level: SidecarLevel::Session,
                path: subject_root.join(session_dir).join(names.session.join("_")),
            });
        }
    }
    candidates.push(SidecarSource {
        level: SidecarLevel::Scan,
        path: scan.sidecar_path(),
    });
    candidates
}

/// Reads and merges every candidate sidecar that exists. Missing files are
/// skipped; a file that exists but does not hold a JSON object is an error.
pub fn resolve_sidecars(bids_root: &Path, scan: &Scan) -> Result<ResolvedSidecars> {
    let mut resolved = ResolvedSidecars::default();
    for candidate in candidate_sidecars(bids_root, scan) {
        if !candidate.path.is_file() {
            trace!(path = %candidate.path.display(), "no sidecar");
            continue;
        }
        let sidecar = read_sidecar(&candidate.path)?;
        debug!(
            level = candidate.level.as_str(),
            path = %candidate.path.display(),
            keys = sidecar.len(),
            "applying sidecar"
        );
        resolved.metadata.overlay(sidecar);
        resolved.sources.push(candidate);
    }
    Ok(resolved)
}

fn read_sidecar(path: &Path) -> Result<serde_json::Map<String, Value>> {
    let contents = std::fs::read_to_string(path).map_err(|e| CoreError::io(path, e))?;
    let value: Value = serde_json::from_str(&contents).map_err(|e| CoreError::SidecarParse {
        path: path.to_path_buf(),
        source: e,
    })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(CoreError::SidecarNotObject {
            path: path.to_path_buf(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;

    fn paths(candidates: &[SidecarSource]) -> Vec<PathBuf> {
        candidates.iter().map(|c| c.path.clone()).collect()
    }

    #[test]
    fn session_scan_produces_four_levels() {
        let root = Path::new("/bids");
        let scan = Scan::from_path(
            "/bids/sub-01/ses-pre/func/sub-01_ses-pre_task-rest_run-2_bold.nii.gz",
        )
        .unwrap();
        assert_eq!(
            paths(&candidate_sidecars(root, &scan)),
            vec![
                PathBuf::from("/bids/task-rest_bold.json"),
                PathBuf::from("/bids/sub-01/sub-01_task-rest_bold.json"),
                PathBuf::from("/bids/sub-01/ses-pre/sub-01_ses-pre_task-rest_bold.json"),
                PathBuf::from("/bids/sub-01/ses-pre/func/sub-01_ses-pre_task-rest_run-2_bold.json"),
            ]
        );
    }

    #[test]
    fn sessionless_scan_has_no_session_level() {
        let scan = Scan::from_path("/bids/sub-01/anat/sub-01_T1w.nii").unwrap();
        let candidates = candidate_sidecars(Path::new("/bids"), &scan);
        let levels: Vec<SidecarLevel> = candidates.iter().map(|c| c.level).collect();
        assert_eq!(
            levels,
            vec![SidecarLevel::Dataset, SidecarLevel::Subject, SidecarLevel::Scan]
        );
        assert_eq!(candidates[0].path, PathBuf::from("/bids/T1w.json"));
    }

    #[test]
    fn most_specific_sidecar_wins() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let anat = root.join("sub-01/anat");
        std::fs::create_dir_all(&anat).unwrap();
        std::fs::write(
            root.join("T1w.json"),
            json!({"Manufacturer": "Acme", "EchoTime": 0.003}).to_string(),
        )
        .unwrap();
        std::fs::write(
            anat.join("sub-01_T1w.json"),
            json!({"EchoTime": 0.004}).to_string(),
        )
        .unwrap();
        let scan = Scan::from_path(anat.join("sub-01_T1w.nii.gz")).unwrap();

        let resolved = resolve_sidecars(root, &scan).unwrap();
        assert_eq!(resolved.sources.len(), 2);
        assert_eq!(resolved.metadata.get_str("Manufacturer"), Some("Acme"));
        assert_eq!(resolved.metadata.get("EchoTime"), Some(&json!(0.004)));
    }

    #[test]
    fn four_level_inheritance_keeps_unique_keys() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        let func = root.join("sub-01/ses-a/func");
        std::fs::create_dir_all(&func).unwrap();
        let levels = [
            (root.join("task-rest_bold.json"), json!({"K": "dataset", "D": 1})),
            (
                root.join("sub-01/sub-01_task-rest_bold.json"),
                json!({"K": "subject", "S": 2}),
            ),
            (
                root.join("sub-01/ses-a/sub-01_ses-a_task-rest_bold.json"),
                json!({"K": "session", "E": 3}),
            ),
            (
                func.join("sub-01_ses-a_task-rest_bold.json"),
                json!({"K": "scan"}),
            ),
        ];
        for (path, value) in &levels {
            std::fs::write(path, value.to_string()).unwrap();
        }
        let scan = Scan::from_path(func.join("sub-01_ses-a_task-rest_bold.nii.gz")).unwrap();

        let resolved = resolve_sidecars(root, &scan).unwrap();
        assert_eq!(resolved.sources.len(), 4);
        assert_eq!(
            resolved.metadata.as_map(),
            json!({"D": 1, "E": 3, "K": "scan", "S": 2}).as_object().unwrap()
        );
    }

    #[test]
    fn missing_sidecars_yield_empty_metadata() {
        let dir = TempDir::new().unwrap();
        let scan = Scan::from_path(dir.path().join("sub-01/anat/sub-01_T1w.nii.gz")).unwrap();
        let resolved = resolve_sidecars(dir.path(), &scan).unwrap();
        assert!(resolved.metadata.is_empty());
        assert!(resolved.sources.is_empty());
    }

    #[test]
    fn non_object_sidecar_is_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("T1w.json"), "[1, 2]").unwrap();
        let scan = Scan::from_path(dir.path().join("sub-01/anat/sub-01_T1w.nii.gz")).unwrap();
        let err = resolve_sidecars(dir.path(), &scan).unwrap_err();
        assert!(matches!(err, CoreError::SidecarNotObject { .. }));
    }
}
