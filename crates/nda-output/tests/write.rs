//! Writing the table to disk.

use nda_model::{Image03Field, NdaRecord};
use nda_output::{IMAGE03_FILE, write_image03};
use tempfile::TempDir;

#[test]
fn writes_table_into_new_directory_and_replaces_previous() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("nested").join("out");

    let mut first = NdaRecord::new();
    first.set(Image03Field::SubjectKey, "NDAR_A");
    let path = write_image03(&output, [&first]).unwrap();
    assert_eq!(path, output.join(IMAGE03_FILE));
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 3);

    let mut second = NdaRecord::new();
    second.set(Image03Field::SubjectKey, "NDAR_B");
    write_image03(&output, [&first, &second]).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().count(), 4);
    assert!(text.lines().nth(3).unwrap().starts_with("\"NDAR_B\""));

    let leftovers: Vec<_> = std::fs::read_dir(&output)
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from(IMAGE03_FILE)]);
}
