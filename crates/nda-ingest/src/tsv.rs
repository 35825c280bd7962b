//! Tab-separated table reading shared by the side-table loaders.

use std::path::{Path, PathBuf};

use csv::ReaderBuilder;

use crate::error::{IngestError, Result};

/// A small in-memory TSV table with normalized headers and cells.
#[derive(Debug, Clone)]
pub struct TsvTable {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TsvTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    /// Index of a column that must be present.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| IngestError::MissingColumn {
                column: name.to_string(),
                path: self.path.clone(),
            })
    }

    /// Cell value, treating short rows as empty.
    pub fn cell<'a>(&self, row: &'a [String], index: usize) -> &'a str {
        row.get(index).map(String::as_str).unwrap_or_default()
    }
}

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

/// Reads a headed, tab-separated file.
pub fn read_tsv_table(path: &Path) -> Result<TsvTable> {
    if !path.is_file() {
        return Err(IngestError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let parse_error = |source| IngestError::TsvParse {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(parse_error)?;

    let headers = reader
        .headers()
        .map_err(parse_error)?
        .iter()
        .map(normalize_header)
        .collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(parse_error)?;
        let row: Vec<String> = record.iter().map(normalize_cell).collect();
        if row.iter().all(String::is_empty) {
            continue;
        }
        rows.push(row);
    }

    Ok(TsvTable {
        path: path.to_path_buf(),
        headers,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn reads_headers_and_skips_blank_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("participants.tsv");
        std::fs::write(
            &path,
            "\u{feff}participant_id\tage\tsex\nsub-01\t25\tM\n\t\t\nsub-02\t31.5\n",
        )
        .unwrap();

        let table = read_tsv_table(&path).unwrap();
        assert_eq!(table.headers, vec!["participant_id", "age", "sex"]);
        assert_eq!(table.rows.len(), 2);
        let sex = table.require_column("sex").unwrap();
        assert_eq!(table.cell(&table.rows[0], sex), "M");
        assert_eq!(table.cell(&table.rows[1], sex), "");
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = read_tsv_table(&dir.path().join("absent.tsv")).unwrap_err();
        assert!(matches!(err, IngestError::FileNotFound { .. }));
    }
}
