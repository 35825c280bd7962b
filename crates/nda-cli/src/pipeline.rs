//! Conversion driver for the `convert` command.
//!
//! Stages run in order: ingest (scan discovery, GUID mapping, participants,
//! scan timing), per-scan processing, and the final table write. The table
//! is only written once every scan has been processed.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use nda_core::{ConversionContext, ConversionRun, process_scans, retain_mapped_scans, scan_type_for};
use nda_ingest::{
    IngestError, TimingIndex, discover_scans, load_guid_mapping, load_participants,
    select_mapped_subjects,
};
use nda_model::{ConversionOptions, GuidMapping, ParticipantTable, Scan, SubjectStrictness};
use nda_output::write_image03;
use tracing::{info, info_span, warn};

use crate::types::{ConversionReport, ScanTypeSummary, SkippedScanSummary};

/// Inputs of one `convert` invocation.
#[derive(Debug, Clone)]
pub struct ConvertRequest {
    pub bids_dir: PathBuf,
    pub guid_mapping: PathBuf,
    pub output_dir: PathBuf,
    pub options: ConversionOptions,
}

struct IngestedDataset {
    scans: Vec<Scan>,
    discovered: usize,
    unmapped: usize,
    guids: GuidMapping,
    participants: ParticipantTable,
    timing: TimingIndex,
}

pub fn run_conversion(request: &ConvertRequest) -> Result<ConversionReport> {
    let dataset = ingest_stage(request)?;

    let run = {
        let span = info_span!("process_scans", scans = dataset.scans.len());
        let _guard = span.enter();
        let ctx = ConversionContext::new(&request.bids_dir, &request.output_dir)
            .with_guids(dataset.guids)
            .with_participants(dataset.participants)
            .with_timing(dataset.timing)
            .with_options(request.options.clone());
        process_scans(&ctx, &dataset.scans).context("convert scans")?
    };

    let table_path = {
        let span = info_span!("output");
        let _guard = span.enter();
        let start = Instant::now();
        let path = write_image03(&request.output_dir, run.records())
            .with_context(|| format!("write table in {}", request.output_dir.display()))?;
        info!(
            path = %path.display(),
            records = run.outcomes.len(),
            duration_ms = start.elapsed().as_millis(),
            "output complete"
        );
        path
    };

    Ok(ConversionReport {
        output_dir: request.output_dir.clone(),
        table_path,
        discovered: dataset.discovered,
        unmapped: dataset.unmapped,
        records: run.outcomes.len(),
        archives: run.archive_count(),
        scan_types: summarize_scan_types(&run),
        skipped: run
            .skipped
            .iter()
            .map(|skipped| SkippedScanSummary {
                path: skipped.scan.path.clone(),
                reason: skipped.reason.clone(),
            })
            .collect(),
    })
}

fn ingest_stage(request: &ConvertRequest) -> Result<IngestedDataset> {
    let span = info_span!("ingest", bids_dir = %request.bids_dir.display());
    let _guard = span.enter();
    let start = Instant::now();

    let mut scans = discover_scans(&request.bids_dir)
        .with_context(|| format!("discover scans in {}", request.bids_dir.display()))?;
    let discovered = scans.len();
    let parsed = load_guid_mapping(&request.guid_mapping).context("load GUID mapping")?;
    let participants = load_participants(&request.bids_dir).context("load participants")?;
    let selected = select_mapped_subjects(
        &participants,
        &parsed.mapping,
        request.options.strictness,
    )
    .context("apply subject presence policy")?;

    let subjects = effective_subjects(
        selected,
        &scans,
        &participants,
        &parsed.mapping,
        request.options.strictness,
    )
    .context("apply subject presence policy")?;
    let unmapped = retain_mapped_scans(&mut scans, &subjects);
    let timing = TimingIndex::load_for_scans(&request.bids_dir, &scans)
        .context("load scan timing tables")?;

    info!(
        discovered,
        scans = scans.len(),
        unmapped,
        participants = participants.len(),
        guids = parsed.mapping.len(),
        timing_tables = timing.len(),
        duration_ms = start.elapsed().as_millis(),
        "ingest complete"
    );
    Ok(IngestedDataset {
        scans,
        discovered,
        unmapped,
        guids: parsed.mapping,
        participants,
        timing,
    })
}

/// Participants with a GUID, plus GUID-mapped subjects that have scans but
/// no participants row. The latter fail in the record builder with an error
/// naming the missing row.
///
/// Scan subjects with neither a participants row nor a GUID fall under the
/// subject presence policy like unmapped participants do.
fn effective_subjects(
    mut selected: BTreeSet<String>,
    scans: &[Scan],
    participants: &ParticipantTable,
    mapping: &GuidMapping,
    strictness: SubjectStrictness,
) -> Result<BTreeSet<String>, IngestError> {
    let mut missing = BTreeSet::new();
    for scan in scans
        .iter()
        .filter(|scan| participants.get(&scan.subject).is_none())
    {
        if mapping.contains(&scan.subject) {
            selected.insert(scan.subject.clone());
        } else {
            missing.insert(format!("sub-{}", scan.subject));
        }
    }

    if !missing.is_empty() {
        match strictness {
            SubjectStrictness::Strict => {
                return Err(IngestError::UnmappedSubjects {
                    subjects: missing.into_iter().collect(),
                });
            }
            SubjectStrictness::Warn => {
                warn!(
                    missing_count = missing.len(),
                    subjects = %missing.iter().cloned().collect::<Vec<_>>().join(", "),
                    "scanned subjects missing from participants and GUID mapping; skipping them"
                );
            }
            SubjectStrictness::Ignore => {}
        }
    }
    Ok(selected)
}

fn summarize_scan_types(run: &ConversionRun) -> Vec<ScanTypeSummary> {
    let mut by_suffix: BTreeMap<&str, ScanTypeSummary> = BTreeMap::new();
    for outcome in &run.outcomes {
        let suffix = outcome.scan.suffix.as_str();
        let entry = by_suffix.entry(suffix).or_insert_with(|| ScanTypeSummary {
            suffix: suffix.to_string(),
            scan_type: scan_type_for(suffix).unwrap_or_default().to_string(),
            records: 0,
            archives: 0,
        });
        entry.records += 1;
        if outcome.archive.is_some() {
            entry.archives += 1;
        }
    }
    by_suffix.into_values().collect()
}

