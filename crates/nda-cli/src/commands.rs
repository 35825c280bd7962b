use anyhow::Result;
use comfy_table::Table;
use tracing::info_span;

use nda_cli::pipeline::{ConvertRequest, run_conversion};
use nda_cli::types::ConversionReport;
use nda_cli::verify::{GuidReport, verify_guid_file};
use nda_core::SCAN_TYPES;
use nda_model::{ConversionOptions, ScanFailurePolicy};

use crate::cli::{ConvertArgs, VerifyGuidArgs};
use crate::summary::apply_table_style;

pub fn run_scan_types() {
    let mut table = Table::new();
    table.set_header(vec!["Suffix", "Scan type"]);
    apply_table_style(&mut table);
    for (suffix, scan_type) in SCAN_TYPES {
        table.add_row(vec![*suffix, *scan_type]);
    }
    println!("{table}");
}

pub fn run_convert(args: &ConvertArgs) -> Result<ConversionReport> {
    let span = info_span!("convert", bids_dir = %args.bids_dir.display());
    let _guard = span.enter();
    let failure_policy = if args.skip_failed_scans {
        ScanFailurePolicy::Skip
    } else {
        ScanFailurePolicy::Abort
    };
    let request = ConvertRequest {
        bids_dir: args.bids_dir.clone(),
        guid_mapping: args.guid_mapping.clone(),
        output_dir: args.output_dir.clone(),
        options: ConversionOptions::new()
            .with_strictness(args.strictness.into())
            .with_failure_policy(failure_policy)
            .with_parallel(args.parallel),
    };
    run_conversion(&request)
}

pub fn run_verify_guid(args: &VerifyGuidArgs) -> Result<GuidReport> {
    verify_guid_file(&args.path)
}
