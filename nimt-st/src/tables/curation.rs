//! Curation status table
//!
//! One record per imaging (participant, session) pair, with a flag for each
//! stage of the raw-imaging flow. Generated from the manifest and filesystem
//! state rather than authored by hand, so unknown columns are rejected.

use std::fmt;

use crate::error::{Error, FieldIssue, Result};
use crate::ids;
use crate::tables::{
    collect, COL_DATATYPE, COL_PARTICIPANT_DICOM_DIR, COL_PARTICIPANT_ID, COL_SESSION_ID,
    COL_VISIT_ID,
};
use crate::tabular::{ColumnSpec, Record, RowSchema, Table, TableRow};

pub const COL_IN_PRE_REORG: &str = "in_pre_reorg";
pub const COL_IN_POST_REORG: &str = "in_post_reorg";
pub const COL_IN_BIDS: &str = "in_bids";

/// One stage of the raw-imaging curation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurationStage {
    /// Raw data as first dropped into the dataset.
    PreReorg,
    /// Data reorganized into participant/session directories.
    PostReorg,
    /// Data converted to BIDS.
    Bids,
}

impl CurationStage {
    pub const ALL: [CurationStage; 3] = [
        CurationStage::PreReorg,
        CurationStage::PostReorg,
        CurationStage::Bids,
    ];

    /// Status column recording presence at this stage.
    pub fn column(self) -> &'static str {
        match self {
            CurationStage::PreReorg => COL_IN_PRE_REORG,
            CurationStage::PostReorg => COL_IN_POST_REORG,
            CurationStage::Bids => COL_IN_BIDS,
        }
    }
}

impl fmt::Display for CurationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CurationStage::PreReorg => "pre_reorg",
            CurationStage::PostReorg => "post_reorg",
            CurationStage::Bids => "bids",
        };
        f.write_str(name)
    }
}

static CURATION_STATUS_COLUMNS: [ColumnSpec; 8] = [
    ColumnSpec::text(COL_PARTICIPANT_ID).with_check(ids::check_participant_id),
    ColumnSpec::text(COL_VISIT_ID),
    ColumnSpec::text(COL_SESSION_ID).with_check(ids::check_session_id),
    ColumnSpec::text_list(COL_DATATYPE),
    ColumnSpec::text(COL_PARTICIPANT_DICOM_DIR),
    ColumnSpec::flag(COL_IN_PRE_REORG),
    ColumnSpec::flag(COL_IN_POST_REORG),
    ColumnSpec::flag(COL_IN_BIDS),
];

pub static CURATION_STATUS_SCHEMA: RowSchema = RowSchema::new(
    "curation_status",
    &CURATION_STATUS_COLUMNS,
    &[COL_PARTICIPANT_ID, COL_SESSION_ID],
);

/// Stage flags for one imaging (participant, session) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CurationStatusRow {
    pub participant_id: String,
    pub visit_id: String,
    pub session_id: String,
    pub datatype: Vec<String>,
    /// Participant-level raw DICOM directory, relative to the pre-reorg root.
    pub participant_dicom_dir: String,
    pub in_pre_reorg: bool,
    pub in_post_reorg: bool,
    pub in_bids: bool,
}

impl CurationStatusRow {
    pub fn status(&self, stage: CurationStage) -> bool {
        match stage {
            CurationStage::PreReorg => self.in_pre_reorg,
            CurationStage::PostReorg => self.in_post_reorg,
            CurationStage::Bids => self.in_bids,
        }
    }

    pub fn set_status(&mut self, stage: CurationStage, value: bool) {
        match stage {
            CurationStage::PreReorg => self.in_pre_reorg = value,
            CurationStage::PostReorg => self.in_post_reorg = value,
            CurationStage::Bids => self.in_bids = value,
        }
    }
}

impl TableRow for CurationStatusRow {
    fn schema() -> &'static RowSchema {
        &CURATION_STATUS_SCHEMA
    }

    fn from_record(record: &Record) -> std::result::Result<Self, Vec<FieldIssue>> {
        let mut issues = Vec::new();
        let participant_id = collect(record.text(COL_PARTICIPANT_ID), &mut issues);
        let visit_id = collect(record.text(COL_VISIT_ID), &mut issues);
        let session_id = collect(record.text(COL_SESSION_ID), &mut issues);
        let datatype = collect(record.text_list(COL_DATATYPE), &mut issues);
        let participant_dicom_dir = collect(record.text(COL_PARTICIPANT_DICOM_DIR), &mut issues);
        let in_pre_reorg = collect(record.flag(COL_IN_PRE_REORG), &mut issues);
        let in_post_reorg = collect(record.flag(COL_IN_POST_REORG), &mut issues);
        let in_bids = collect(record.flag(COL_IN_BIDS), &mut issues);
        if !issues.is_empty() {
            return Err(issues);
        }
        Ok(Self {
            participant_id,
            visit_id,
            session_id,
            datatype,
            participant_dicom_dir,
            in_pre_reorg,
            in_post_reorg,
            in_bids,
        })
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.set(COL_PARTICIPANT_ID, &self.participant_id);
        record.set(COL_VISIT_ID, &self.visit_id);
        record.set(COL_SESSION_ID, &self.session_id);
        record.set_list(COL_DATATYPE, &self.datatype);
        record.set(COL_PARTICIPANT_DICOM_DIR, &self.participant_dicom_dir);
        record.set_flag(COL_IN_PRE_REORG, self.in_pre_reorg);
        record.set_flag(COL_IN_POST_REORG, self.in_post_reorg);
        record.set_flag(COL_IN_BIDS, self.in_bids);
        record
    }
}

pub type CurationStatusTable = Table<CurationStatusRow>;

impl Table<CurationStatusRow> {
    pub fn find(&self, participant_id: &str, session_id: &str) -> Option<&CurationStatusRow> {
        self.iter()
            .find(|row| row.participant_id == participant_id && row.session_id == session_id)
    }

    /// Stage flag for one pair, or `None` when the pair has no record.
    pub fn get_status(
        &self,
        participant_id: &str,
        session_id: &str,
        stage: CurationStage,
    ) -> Option<bool> {
        self.find(participant_id, session_id)
            .map(|row| row.status(stage))
    }

    /// Sets one stage flag; the pair must already have a record.
    pub fn set_status(
        &mut self,
        participant_id: &str,
        session_id: &str,
        stage: CurationStage,
        value: bool,
    ) -> Result<()> {
        let row = self
            .rows_mut()
            .iter_mut()
            .find(|row| row.participant_id == participant_id && row.session_id == session_id)
            .ok_or_else(|| Error::RecordNotFound {
                table: CURATION_STATUS_SCHEMA.name.to_owned(),
                key: format!("({participant_id}, {session_id})"),
            })?;
        row.set_status(stage, value);
        Ok(())
    }

    /// (participant, session) pairs flagged present at `stage`, optionally
    /// filtered on either identifier.
    pub fn participants_sessions_in_stage<'a>(
        &'a self,
        stage: CurationStage,
        participant_id: Option<&'a str>,
        session_id: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.iter().filter_map(move |row| {
            if !row.status(stage) {
                return None;
            }
            if participant_id.is_some_and(|p| p != row.participant_id) {
                return None;
            }
            if session_id.is_some_and(|s| s != row.session_id) {
                return None;
            }
            Some((row.participant_id.as_str(), row.session_id.as_str()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(participant: &str, session: &str, flags: (bool, bool, bool)) -> CurationStatusRow {
        CurationStatusRow {
            participant_id: participant.to_owned(),
            visit_id: session.to_owned(),
            session_id: session.to_owned(),
            datatype: vec!["anat".to_owned()],
            participant_dicom_dir: format!("{participant}/{session}"),
            in_pre_reorg: flags.0,
            in_post_reorg: flags.1,
            in_bids: flags.2,
        }
    }

    fn table() -> CurationStatusTable {
        Table::from_rows(vec![
            row("01", "BL", (true, true, false)),
            row("01", "M12", (true, false, false)),
            row("02", "BL", (false, false, false)),
        ])
    }

    #[test]
    fn status_lookup_by_pair_and_stage() {
        let t = table();
        assert_eq!(t.get_status("01", "BL", CurationStage::PostReorg), Some(true));
        assert_eq!(t.get_status("01", "BL", CurationStage::Bids), Some(false));
        assert_eq!(t.get_status("03", "BL", CurationStage::PreReorg), None);
    }

    #[test]
    fn set_status_requires_an_existing_record() {
        let mut t = table();
        t.set_status("02", "BL", CurationStage::PreReorg, true).unwrap();
        assert_eq!(t.get_status("02", "BL", CurationStage::PreReorg), Some(true));

        let err = t
            .set_status("03", "BL", CurationStage::PreReorg, true)
            .unwrap_err();
        assert!(matches!(err, Error::RecordNotFound { .. }));
    }

    #[test]
    fn stage_membership_queries() {
        let t = table();
        let pre: Vec<(&str, &str)> = t
            .participants_sessions_in_stage(CurationStage::PreReorg, None, None)
            .collect();
        assert_eq!(pre, vec![("01", "BL"), ("01", "M12")]);

        let pre_bl: Vec<(&str, &str)> = t
            .participants_sessions_in_stage(CurationStage::PreReorg, None, Some("BL"))
            .collect();
        assert_eq!(pre_bl, vec![("01", "BL")]);

        let bids: Vec<(&str, &str)> = t
            .participants_sessions_in_stage(CurationStage::Bids, None, None)
            .collect();
        assert!(bids.is_empty());
    }

    #[test]
    fn flag_cells_canonicalize_and_round_trip() {
        let record = table().records().remove(0);
        assert_eq!(record.get(COL_IN_PRE_REORG), Some("True"));
        assert_eq!(record.get(COL_IN_BIDS), Some("False"));

        let parsed = CurationStatusRow::from_record(&record).unwrap();
        assert_eq!(parsed, table().rows()[0]);
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let mut record = table().records().remove(0);
        record.set("notes", "hello");
        let err = CurationStatusTable::from_records(vec![record]).unwrap_err();
        match err {
            Error::Validation(report) => {
                assert_eq!(report.issues[0].issue.column, "notes");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
