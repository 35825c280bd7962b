//! End-to-end conversion over small synthetic datasets.

use std::collections::BTreeSet;
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use nda_core::{ConversionContext, CoreError, process_scan, process_scans, retain_mapped_scans};
use nda_ingest::{TimingIndex, discover_scans, load_participants, parse_guid_mapping};
use nda_model::{ConversionOptions, Image03Field, ScanFailurePolicy};
use tempfile::TempDir;

const MM: u8 = 0x02;
const MM_MSEC: u8 = 0x12;

fn write_nifti(path: &Path, dims: &[i16], pixdims: &[f32], xyzt_units: u8) {
    let mut buf = vec![0u8; 352];
    LittleEndian::write_i32(&mut buf[0..4], 348);
    LittleEndian::write_i16(&mut buf[40..42], dims.len() as i16);
    for (axis, extent) in dims.iter().enumerate() {
        let offset = 42 + axis * 2;
        LittleEndian::write_i16(&mut buf[offset..offset + 2], *extent);
    }
    for (axis, size) in pixdims.iter().enumerate() {
        let offset = 80 + axis * 4;
        LittleEndian::write_f32(&mut buf[offset..offset + 4], *size);
    }
    buf[123] = xyzt_units;
    buf[344..348].copy_from_slice(b"n+1\0");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, buf).unwrap();
}

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// One subject with a T1w and a bold run.
fn build_dataset(root: &Path) {
    write(
        &root.join("participants.tsv"),
        "participant_id\tage\tsex\nsub-01\t25.0\tM\n",
    );
    write(&root.join("T1w.json"), r#"{"Manufacturer": "Acme"}"#);
    write(
        &root.join("task-rest_bold.json"),
        r#"{"TaskName": "rest", "RepetitionTime": 2.0}"#,
    );
    write(&root.join("task-rest_events.tsv"), "onset\tduration\n0\t30\n");
    write(
        &root.join("sub-01/sub-01_scans.tsv"),
        "filename\tacq_time\n\
         anat/sub-01_T1w.nii.gz\t2020-05-01T10:00:00\n\
         func/sub-01_task-rest_bold.nii.gz\t2020-05-01T10:30:00\n",
    );
    write_nifti(
        &root.join("sub-01/anat/sub-01_T1w.nii.gz"),
        &[176, 256, 256],
        &[1.0, 1.0, 1.0],
        MM,
    );
    write_nifti(
        &root.join("sub-01/func/sub-01_task-rest_bold.nii.gz"),
        &[64, 64, 30, 100],
        &[3.0, 3.0, 3.0, 2000.0],
        MM_MSEC,
    );
}

fn context(root: &Path, output: &Path, options: ConversionOptions) -> ConversionContext {
    let scans = discover_scans(root).unwrap();
    let guids = parse_guid_mapping("sub-01 - NDAR_INV0001", Path::new("guids.txt")).unwrap();
    ConversionContext::new(root, output)
        .with_guids(guids.mapping)
        .with_participants(load_participants(root).unwrap())
        .with_timing(TimingIndex::load_for_scans(root, &scans).unwrap())
        .with_options(options)
}

#[test]
fn structural_scan_end_to_end() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("bids");
    let output = dir.path().join("out");
    build_dataset(&root);
    let ctx = context(&root, &output, ConversionOptions::default());
    let scans = discover_scans(&root).unwrap();
    let t1w = scans.iter().find(|scan| scan.suffix == "T1w").unwrap();

    let outcome = process_scan(&ctx, t1w).unwrap();
    let record = &outcome.record;
    assert_eq!(record.text(Image03Field::SubjectKey), "NDAR_INV0001");
    assert_eq!(record.text(Image03Field::ScannerManufacturer), "Acme");
    assert_eq!(record.text(Image03Field::InterviewAge), "300");
    assert_eq!(record.text(Image03Field::Gender), "M");
    assert_eq!(record.text(Image03Field::InterviewDate), "05/01/2020");
    assert_eq!(record.text(Image03Field::ScanType), "MR structural (T1)");
    assert_eq!(record.text(Image03Field::AcquisitionMatrix), "176 x 256");
    assert_eq!(record.text(Image03Field::FieldOfView), "1 x 1 Millimeters");

    let archive = outcome.archive.as_ref().unwrap();
    assert_eq!(archive.path, output.join("sub-01_T1w.metadata.zip"));
    assert_eq!(
        record.text(Image03Field::DataFile2),
        archive.path.display().to_string()
    );
    assert_eq!(outcome.sidecars.len(), 1);
}

#[test]
fn functional_run_uses_header_timing_and_packs_events() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("bids");
    let output = dir.path().join("out");
    build_dataset(&root);
    let ctx = context(&root, &output, ConversionOptions::default());
    let scans = discover_scans(&root).unwrap();

    let run = process_scans(&ctx, &scans).unwrap();
    assert_eq!(run.outcomes.len(), 2);
    assert_eq!(run.archive_count(), 2);
    let bold = run
        .outcomes
        .iter()
        .find(|outcome| outcome.scan.suffix == "bold")
        .unwrap();
    assert_eq!(bold.record.text(Image03Field::ImageDescription), "bold rest");
    assert_eq!(bold.record.text(Image03Field::RepetitionTime), "2.0");
    assert_eq!(bold.record.text(Image03Field::ImageUnit4), "Milliseconds");
    assert_eq!(
        bold.archive.as_ref().unwrap().members,
        vec![
            "sub-01_task-rest_bold.json".to_string(),
            "sub-01_task-rest_events.tsv".to_string(),
        ]
    );
}

#[test]
fn parallel_run_preserves_scan_order() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("bids");
    build_dataset(&root);
    let scans = discover_scans(&root).unwrap();

    let sequential = process_scans(
        &context(&root, &dir.path().join("seq"), ConversionOptions::default()),
        &scans,
    )
    .unwrap();
    let parallel = process_scans(
        &context(
            &root,
            &dir.path().join("par"),
            ConversionOptions::default().with_parallel(true),
        ),
        &scans,
    )
    .unwrap();
    let files = |run: &nda_core::ConversionRun| -> Vec<String> {
        run.records()
            .map(|record| record.text(Image03Field::ImageFile))
            .collect()
    };
    assert_eq!(files(&sequential), files(&parallel));
}

#[test]
fn failure_policy_controls_missing_timing_rows() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("bids");
    build_dataset(&root);
    write_nifti(
        &root.join("sub-01/anat/sub-01_T2w.nii.gz"),
        &[10, 10, 10],
        &[1.0, 1.0, 1.0],
        MM,
    );
    let scans = discover_scans(&root).unwrap();

    let aborting = context(&root, &dir.path().join("a"), ConversionOptions::default());
    let err = process_scans(&aborting, &scans).unwrap_err();
    match err {
        CoreError::Scan { path, source } => {
            assert!(path.ends_with("sub-01_T2w.nii.gz"));
            assert!(matches!(*source, CoreError::MissingAcquisitionTime { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }

    let skipping = context(
        &root,
        &dir.path().join("s"),
        ConversionOptions::default().with_failure_policy(ScanFailurePolicy::Skip),
    );
    let run = process_scans(&skipping, &scans).unwrap();
    assert_eq!(run.outcomes.len(), 2);
    assert_eq!(run.skipped.len(), 1);
    assert_eq!(run.skipped[0].scan.suffix, "T2w");
}

#[test]
fn unmapped_suffix_aborts_even_when_skipping() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("bids");
    build_dataset(&root);
    write_nifti(
        &root.join("sub-01/anat/sub-01_angio.nii.gz"),
        &[10, 10, 10],
        &[1.0, 1.0, 1.0],
        MM,
    );
    let scans = discover_scans(&root).unwrap();
    let ctx = context(
        &root,
        &dir.path().join("out"),
        ConversionOptions::default().with_failure_policy(ScanFailurePolicy::Skip),
    );
    let err = process_scans(&ctx, &scans).unwrap_err();
    assert!(err.is_dataset_level());
}

#[test]
fn scans_of_unmapped_subjects_are_dropped() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("bids");
    build_dataset(&root);
    write_nifti(
        &root.join("sub-02/anat/sub-02_T1w.nii.gz"),
        &[10, 10, 10],
        &[1.0, 1.0, 1.0],
        MM,
    );
    let mut scans = discover_scans(&root).unwrap();
    let subjects: BTreeSet<String> = ["01".to_string()].into_iter().collect();
    assert_eq!(retain_mapped_scans(&mut scans, &subjects), 1);
    assert!(scans.iter().all(|scan| scan.subject == "01"));
}
