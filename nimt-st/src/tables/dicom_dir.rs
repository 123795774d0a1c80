//! Participant DICOM directory resolution
//!
//! The curation flow needs to know where each (participant, session) pair's
//! raw DICOM files sit under the pre-reorg root. By default the directory
//! follows a naming convention; datasets that predate the convention supply
//! an explicit mapping table instead.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{Error, FieldIssue, Result};
use crate::ids;
use crate::tables::{collect, COL_PARTICIPANT_DICOM_DIR, COL_PARTICIPANT_ID, COL_SESSION_ID};
use crate::tabular::{ColumnSpec, Record, RowSchema, Table, TableRow};

static DICOM_DIR_MAP_COLUMNS: [ColumnSpec; 3] = [
    ColumnSpec::text(COL_PARTICIPANT_ID).with_check(ids::check_participant_id),
    ColumnSpec::text(COL_SESSION_ID).with_check(ids::check_session_id),
    ColumnSpec::text(COL_PARTICIPANT_DICOM_DIR),
];

pub static DICOM_DIR_MAP_SCHEMA: RowSchema = RowSchema::new(
    "dicom_dir_map",
    &DICOM_DIR_MAP_COLUMNS,
    &[COL_PARTICIPANT_ID, COL_SESSION_ID],
);

#[derive(Debug, Clone, PartialEq)]
pub struct DicomDirMapRow {
    pub participant_id: String,
    pub session_id: String,
    pub participant_dicom_dir: String,
}

impl TableRow for DicomDirMapRow {
    fn schema() -> &'static RowSchema {
        &DICOM_DIR_MAP_SCHEMA
    }

    fn from_record(record: &Record) -> std::result::Result<Self, Vec<FieldIssue>> {
        let mut issues = Vec::new();
        let participant_id = collect(record.text(COL_PARTICIPANT_ID), &mut issues);
        let session_id = collect(record.text(COL_SESSION_ID), &mut issues);
        let participant_dicom_dir = collect(record.text(COL_PARTICIPANT_DICOM_DIR), &mut issues);
        if !issues.is_empty() {
            return Err(issues);
        }
        Ok(Self {
            participant_id,
            session_id,
            participant_dicom_dir,
        })
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.set(COL_PARTICIPANT_ID, &self.participant_id);
        record.set(COL_SESSION_ID, &self.session_id);
        record.set(COL_PARTICIPANT_DICOM_DIR, &self.participant_dicom_dir);
        record
    }
}

pub type DicomDirMapTable = Table<DicomDirMapRow>;

/// How participant-level DICOM directories are derived.
#[derive(Debug, Clone)]
pub enum DicomDirMap {
    /// `<participant>/<session>` directory convention.
    ParticipantFirst,
    /// `<session>/<participant>` directory convention.
    SessionFirst,
    /// Explicit per-pair directories from a mapping table.
    Explicit(HashMap<(String, String), String>),
}

impl Default for DicomDirMap {
    fn default() -> Self {
        DicomDirMap::ParticipantFirst
    }
}

impl DicomDirMap {
    pub fn from_table(table: &DicomDirMapTable) -> Self {
        let map = table
            .iter()
            .map(|row| {
                (
                    (row.participant_id.clone(), row.session_id.clone()),
                    row.participant_dicom_dir.clone(),
                )
            })
            .collect();
        DicomDirMap::Explicit(map)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Ok(Self::from_table(&DicomDirMapTable::load(path)?))
    }

    /// Directory for one pair, relative to the pre-reorg root.
    ///
    /// With an explicit map, a pair that has no entry is an error; the
    /// conventions can resolve any pair.
    pub fn resolve(&self, participant_id: &str, session_id: &str) -> Result<String> {
        match self {
            DicomDirMap::ParticipantFirst => Ok(format!("{participant_id}/{session_id}")),
            DicomDirMap::SessionFirst => Ok(format!("{session_id}/{participant_id}")),
            DicomDirMap::Explicit(map) => map
                .get(&(participant_id.to_owned(), session_id.to_owned()))
                .cloned()
                .ok_or_else(|| Error::RecordNotFound {
                    table: DICOM_DIR_MAP_SCHEMA.name.to_owned(),
                    key: format!("({participant_id}, {session_id})"),
                }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(participant: &str, session: &str, dir: &str) -> Record {
        [
            (COL_PARTICIPANT_ID, participant),
            (COL_SESSION_ID, session),
            (COL_PARTICIPANT_DICOM_DIR, dir),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn conventions_resolve_any_pair() {
        assert_eq!(
            DicomDirMap::ParticipantFirst.resolve("01", "BL").unwrap(),
            "01/BL"
        );
        assert_eq!(
            DicomDirMap::SessionFirst.resolve("01", "BL").unwrap(),
            "BL/01"
        );
    }

    #[test]
    fn explicit_map_requires_an_entry_per_pair() {
        let table =
            DicomDirMapTable::from_records(vec![record("01", "BL", "scans/alpha-01")]).unwrap();
        let map = DicomDirMap::from_table(&table);

        assert_eq!(map.resolve("01", "BL").unwrap(), "scans/alpha-01");
        let err = map.resolve("02", "BL").unwrap_err();
        assert!(matches!(err, Error::RecordNotFound { .. }));
    }

    #[test]
    fn mapping_table_rejects_duplicates_and_extras() {
        let err = DicomDirMapTable::from_records(vec![
            record("01", "BL", "a"),
            record("01", "BL", "b"),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateRecords { .. }));

        let mut raw = record("01", "BL", "a");
        raw.set("comment", "x");
        let err = DicomDirMapTable::from_records(vec![raw]).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
