//! `participants.tsv` loading.

use std::path::{Path, PathBuf};

use nda_model::{Participant, ParticipantTable, normalize_subject_id};

use crate::error::{IngestError, Result};
use crate::tsv::read_tsv_table;

pub const PARTICIPANTS_FILE: &str = "participants.tsv";

/// Location of the participant table for a dataset.
pub fn participants_path(bids_root: &Path) -> PathBuf {
    bids_root.join(PARTICIPANTS_FILE)
}

/// Loads `participants.tsv`, requiring `participant_id`, `age` and `sex`.
pub fn load_participants(bids_root: &Path) -> Result<ParticipantTable> {
    let path = participants_path(bids_root);
    let table = read_tsv_table(&path)?;
    let id_index = table.require_column("participant_id")?;
    let age_index = table.require_column("age")?;
    let sex_index = table.require_column("sex")?;

    let mut participants = ParticipantTable::new(&path);
    for row in &table.rows {
        let participant_id = table.cell(row, id_index);
        let raw_age = table.cell(row, age_index);
        let age_years = raw_age
            .parse::<f64>()
            .ok()
            .filter(|age| age.is_finite())
            .ok_or_else(|| IngestError::InvalidValue {
                field: "age".to_string(),
                value: raw_age.to_string(),
                path: path.clone(),
            })?;
        participants.push(Participant {
            subject: normalize_subject_id(participant_id).to_string(),
            age_years,
            sex: table.cell(row, sex_index).to_string(),
        });
    }
    Ok(participants)
}
