//! Per-scan conversion and the dataset-level driver.
//!
//! [`process_scan`] runs the full chain for one scan: sidecar resolution,
//! header extraction, orientation deduction, record synthesis and archive
//! packaging. It only reads shared state, so scans can be processed in any
//! order or in parallel; [`process_scans`] always returns outcomes in input
//! order.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Instant;

use nda_ingest::{TimingIndex, participants_path};
use nda_model::{
    ConversionOptions, GuidMapping, NdaRecord, ParticipantTable, Scan, ScanFailurePolicy,
};
use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};

use crate::builder::{RecordInputs, SubjectLookups, build_record};
use crate::companions::Companions;
use crate::error::{CoreError, Result};
use crate::header::extract_geometry;
use crate::orientation::deduce_orientation;
use crate::packager::{ArchiveOutcome, package_artifacts, record_archive};
use crate::sidecar::{SidecarSource, resolve_sidecars};

/// Read-only dataset state shared by every scan in a run.
#[derive(Debug, Clone)]
pub struct ConversionContext {
    pub bids_root: PathBuf,
    pub output_dir: PathBuf,
    pub guids: GuidMapping,
    pub participants: ParticipantTable,
    pub timing: TimingIndex,
    pub options: ConversionOptions,
}

impl ConversionContext {
    pub fn new(bids_root: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let bids_root = bids_root.into();
        Self {
            participants: ParticipantTable::new(participants_path(&bids_root)),
            bids_root,
            output_dir: output_dir.into(),
            guids: GuidMapping::new(),
            timing: TimingIndex::default(),
            options: ConversionOptions::default(),
        }
    }

    pub fn with_guids(mut self, guids: GuidMapping) -> Self {
        self.guids = guids;
        self
    }

    pub fn with_participants(mut self, participants: ParticipantTable) -> Self {
        self.participants = participants;
        self
    }

    pub fn with_timing(mut self, timing: TimingIndex) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_options(mut self, options: ConversionOptions) -> Self {
        self.options = options;
        self
    }
}

/// Result of converting one scan.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub scan: Scan,
    pub record: NdaRecord,
    pub archive: Option<ArchiveOutcome>,
    /// Sidecars that contributed metadata, least specific first.
    pub sidecars: Vec<SidecarSource>,
}

/// A scan left out of the output under [`ScanFailurePolicy::Skip`].
#[derive(Debug, Clone)]
pub struct SkippedScan {
    pub scan: Scan,
    pub reason: String,
}

/// Outcomes of a dataset run, in scan order.
#[derive(Debug, Clone, Default)]
pub struct ConversionRun {
    pub outcomes: Vec<ScanOutcome>,
    pub skipped: Vec<SkippedScan>,
}

impl ConversionRun {
    pub fn records(&self) -> impl Iterator<Item = &NdaRecord> {
        self.outcomes.iter().map(|outcome| &outcome.record)
    }

    pub fn archive_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.archive.is_some())
            .count()
    }
}

/// Converts one scan into its record, writing its archive if needed.
pub fn process_scan(ctx: &ConversionContext, scan: &Scan) -> Result<ScanOutcome> {
    let span = info_span!("scan", file = %scan.file_name());
    let _guard = span.enter();
    let start = Instant::now();

    let resolved = resolve_sidecars(&ctx.bids_root, scan)?;
    let geometry = extract_geometry(&scan.path)?;
    let orientation = deduce_orientation(&resolved.metadata)?;
    let companions = Companions::locate(&ctx.bids_root, scan);
    let mut record = build_record(&RecordInputs {
        scan,
        metadata: &resolved.metadata,
        geometry: &geometry,
        orientation,
        companions: &companions,
        lookups: SubjectLookups {
            guids: &ctx.guids,
            participants: &ctx.participants,
            timing: ctx.timing.table_for(scan),
        },
    })?;
    let archive = package_artifacts(&ctx.output_dir, scan, &resolved.metadata, &companions)?;
    record_archive(&mut record, archive.as_ref());

    debug!(
        sidecars = resolved.sources.len(),
        metadata_keys = resolved.metadata.len(),
        dimensions = geometry.num_dimensions(),
        archive = archive.is_some(),
        duration_ms = start.elapsed().as_millis(),
        "scan converted"
    );
    Ok(ScanOutcome {
        scan: scan.clone(),
        record,
        archive,
        sidecars: resolved.sources,
    })
}

/// Converts every scan, applying the configured failure policy.
///
/// Under [`ScanFailurePolicy::Abort`] the first failure ends the run. Under
/// [`ScanFailurePolicy::Skip`] failing scans are logged and reported in
/// [`ConversionRun::skipped`], except dataset-level failures (unmapped
/// suffix, unknown unit) which always end the run.
pub fn process_scans(ctx: &ConversionContext, scans: &[Scan]) -> Result<ConversionRun> {
    let start = Instant::now();
    let mut run = ConversionRun::default();

    if ctx.options.parallel {
        let results: Vec<Result<ScanOutcome>> =
            scans.par_iter().map(|scan| process_scan(ctx, scan)).collect();
        for (scan, result) in scans.iter().zip(results) {
            accept(ctx, &mut run, scan, result)?;
        }
    } else {
        for scan in scans {
            accept(ctx, &mut run, scan, process_scan(ctx, scan))?;
        }
    }

    info!(
        scans = scans.len(),
        records = run.outcomes.len(),
        archives = run.archive_count(),
        skipped = run.skipped.len(),
        parallel = ctx.options.parallel,
        duration_ms = start.elapsed().as_millis(),
        "conversion complete"
    );
    Ok(run)
}

fn accept(
    ctx: &ConversionContext,
    run: &mut ConversionRun,
    scan: &Scan,
    result: Result<ScanOutcome>,
) -> Result<()> {
    match result {
        Ok(outcome) => {
            run.outcomes.push(outcome);
            Ok(())
        }
        Err(error)
            if ctx.options.failure_policy == ScanFailurePolicy::Skip
                && !error.is_dataset_level() =>
        {
            warn!(scan = %scan.path.display(), %error, "skipping scan");
            run.skipped.push(SkippedScan {
                scan: scan.clone(),
                reason: error.to_string(),
            });
            Ok(())
        }
        Err(error) => Err(CoreError::Scan {
            path: scan.path.clone(),
            source: Box::new(error),
        }),
    }
}

/// Keeps scans whose subject is in `subjects`, returning how many were
/// dropped.
pub fn retain_mapped_scans(scans: &mut Vec<Scan>, subjects: &BTreeSet<String>) -> usize {
    let before = scans.len();
    scans.retain(|scan| subjects.contains(&scan.subject));
    let dropped = before - scans.len();
    if dropped > 0 {
        debug!(dropped, "dropped scans of subjects without a GUID");
    }
    dropped
}
