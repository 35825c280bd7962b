//! `run_conversion` over small on-disk datasets.

use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};
use nda_cli::pipeline::{ConvertRequest, run_conversion};
use nda_model::{ConversionOptions, ScanFailurePolicy, SubjectStrictness};
use tempfile::TempDir;

const MM: u8 = 0x02;

fn write_nifti(path: &Path, dims: &[i16]) {
    let mut buf = vec![0u8; 352];
    LittleEndian::write_i32(&mut buf[0..4], 348);
    LittleEndian::write_i16(&mut buf[40..42], dims.len() as i16);
    for (axis, extent) in dims.iter().enumerate() {
        let offset = 42 + axis * 2;
        LittleEndian::write_i16(&mut buf[offset..offset + 2], *extent);
        let offset = 80 + axis * 4;
        LittleEndian::write_f32(&mut buf[offset..offset + 4], 1.0);
    }
    buf[123] = MM;
    buf[344..348].copy_from_slice(b"n+1\0");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, buf).unwrap();
}

fn write(path: &Path, contents: &str) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Two participants with one T1w each. Only sub-01 has a GUID.
fn build_dataset(root: &Path) {
    write(
        &root.join("participants.tsv"),
        "participant_id\tage\tsex\nsub-01\t20\tF\nsub-02\t30\tM\n",
    );
    for subject in ["01", "02"] {
        write(
            &root.join(format!("sub-{subject}/sub-{subject}_scans.tsv")),
            &format!("filename\tacq_time\nanat/sub-{subject}_T1w.nii.gz\t2021-03-04T09:00:00\n"),
        );
        write_nifti(
            &root.join(format!("sub-{subject}/anat/sub-{subject}_T1w.nii.gz")),
            &[10, 20, 30],
        );
    }
}

fn request(dir: &TempDir, options: ConversionOptions) -> ConvertRequest {
    request_with_guids(dir, "sub-01 - NDAR_INV0001\n", options)
}

fn request_with_guids(
    dir: &TempDir,
    guid_lines: &str,
    options: ConversionOptions,
) -> ConvertRequest {
    let guids = dir.path().join("guids.txt");
    write(&guids, guid_lines);
    ConvertRequest {
        bids_dir: dir.path().join("bids"),
        guid_mapping: guids,
        output_dir: dir.path().join("out"),
        options,
    }
}

#[test]
fn warn_strictness_converts_mapped_subjects_only() {
    let dir = TempDir::new().unwrap();
    build_dataset(&dir.path().join("bids"));
    let request = request(
        &dir,
        ConversionOptions::default().with_strictness(SubjectStrictness::Warn),
    );

    let report = run_conversion(&request).unwrap();
    assert_eq!(report.discovered, 2);
    assert_eq!(report.unmapped, 1);
    assert_eq!(report.records, 1);
    assert_eq!(report.archives, 0);
    assert_eq!(report.scan_types.len(), 1);
    assert_eq!(report.scan_types[0].suffix, "T1w");
    assert_eq!(report.scan_types[0].scan_type, "MR structural (T1)");

    let table = std::fs::read_to_string(&report.table_path).unwrap();
    let lines: Vec<&str> = table.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "\"image\"\t\"3\"");
    assert!(lines[1].starts_with("\"subjectkey\"\t\"src_subject_id\""));
    assert!(lines[2].starts_with("\"NDAR_INV0001\"\t\"sub-01\"\t\"03/04/2021\"\t\"240\"\t\"F\""));
}

#[test]
fn strict_policy_rejects_unmapped_participants() {
    let dir = TempDir::new().unwrap();
    build_dataset(&dir.path().join("bids"));
    let request = request(&dir, ConversionOptions::default());

    let err = run_conversion(&request).unwrap_err();
    assert!(format!("{err:#}").contains("sub-02"));
    assert!(!request.output_dir.join("image03.txt").exists());
}

#[test]
fn skipped_scans_are_reported_and_left_out() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("bids");
    build_dataset(&root);
    write_nifti(&root.join("sub-01/anat/sub-01_T2w.nii.gz"), &[10, 20, 30]);
    let request = request(
        &dir,
        ConversionOptions::default()
            .with_strictness(SubjectStrictness::Ignore)
            .with_failure_policy(ScanFailurePolicy::Skip),
    );

    let report = run_conversion(&request).unwrap();
    assert_eq!(report.records, 1);
    assert!(report.has_skipped());
    assert!(report.skipped[0].path.ends_with("sub-01_T2w.nii.gz"));
    assert!(report.skipped[0].reason.contains("acq_time"));
}

/// sub-03 has a scan and a scans table but no participants row.
fn add_unlisted_subject(root: &Path) {
    write(
        &root.join("sub-03/sub-03_scans.tsv"),
        "filename\tacq_time\nanat/sub-03_T1w.nii.gz\t2021-03-04T09:00:00\n",
    );
    write_nifti(&root.join("sub-03/anat/sub-03_T1w.nii.gz"), &[10, 20, 30]);
}

#[test]
fn unlisted_subject_without_guid_is_dropped_when_ignoring() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("bids");
    build_dataset(&root);
    add_unlisted_subject(&root);
    let request = request(
        &dir,
        ConversionOptions::default().with_strictness(SubjectStrictness::Ignore),
    );

    let report = run_conversion(&request).unwrap();
    assert_eq!(report.discovered, 3);
    assert_eq!(report.unmapped, 2);
    assert_eq!(report.records, 1);
    assert!(!report.has_skipped());
}

#[test]
fn unlisted_subject_without_guid_fails_strict_policy() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("bids");
    build_dataset(&root);
    add_unlisted_subject(&root);
    let request = request_with_guids(
        &dir,
        "sub-01 - NDAR_INV0001\nsub-02 - NDAR_INV0002\n",
        ConversionOptions::default(),
    );

    let err = format!("{:#}", run_conversion(&request).unwrap_err());
    assert!(err.contains("missing from the GUID mapping: sub-03"), "{err}");
}

#[test]
fn unlisted_subject_with_guid_reports_missing_participant() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("bids");
    build_dataset(&root);
    add_unlisted_subject(&root);
    let request = request_with_guids(
        &dir,
        "sub-01 - NDAR_INV0001\nsub-03 - NDAR_INV0003\n",
        ConversionOptions::default().with_strictness(SubjectStrictness::Ignore),
    );

    let err = format!("{:#}", run_conversion(&request).unwrap_err());
    assert!(err.contains("no participants.tsv row for participant_id 'sub-03'"), "{err}");
}
