//! Manifest table
//!
//! The manifest is the ground truth for which participants and visits exist
//! in a dataset. It is authored by the user, one record per participant and
//! visit; visits with imaging data additionally carry a session identifier
//! and the expected datatypes. Unknown columns are tolerated and preserved.

use std::collections::{BTreeMap, HashSet};

use crate::error::FieldIssue;
use crate::ids;
use crate::tables::{
    collect, extra_columns, render_extras, COL_DATATYPE, COL_PARTICIPANT_ID, COL_SESSION_ID,
    COL_VISIT_ID,
};
use crate::tabular::{ColumnSpec, Record, RowSchema, Table, TableRow};

static MANIFEST_COLUMNS: [ColumnSpec; 4] = [
    ColumnSpec::text(COL_PARTICIPANT_ID).with_check(ids::check_participant_id),
    ColumnSpec::text(COL_VISIT_ID),
    ColumnSpec::optional_text(COL_SESSION_ID).with_check(ids::check_session_id),
    ColumnSpec::text_list(COL_DATATYPE),
];

pub static MANIFEST_SCHEMA: RowSchema = RowSchema::new(
    "manifest",
    &MANIFEST_COLUMNS,
    &[COL_PARTICIPANT_ID, COL_VISIT_ID],
)
.with_extra_columns();

/// One participant-visit record of the manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestRow {
    pub participant_id: String,
    pub visit_id: String,
    /// `None` for visits that acquired no imaging data.
    pub session_id: Option<String>,
    /// Expected imaging datatypes, e.g. `anat`, `dwi`.
    pub datatype: Vec<String>,
    /// Columns outside the schema, preserved across loads and saves.
    pub extras: BTreeMap<String, String>,
}

impl ManifestRow {
    pub fn new(participant_id: impl Into<String>, visit_id: impl Into<String>) -> Self {
        Self {
            participant_id: participant_id.into(),
            visit_id: visit_id.into(),
            session_id: None,
            datatype: Vec::new(),
            extras: BTreeMap::new(),
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_datatype(mut self, datatype: Vec<String>) -> Self {
        self.datatype = datatype;
        self
    }

    /// True when the visit acquired imaging data.
    pub fn is_imaging(&self) -> bool {
        self.session_id.is_some()
    }
}

impl TableRow for ManifestRow {
    fn schema() -> &'static RowSchema {
        &MANIFEST_SCHEMA
    }

    fn from_record(record: &Record) -> Result<Self, Vec<FieldIssue>> {
        let mut issues = Vec::new();
        let participant_id = collect(record.text(COL_PARTICIPANT_ID), &mut issues);
        let visit_id = collect(record.text(COL_VISIT_ID), &mut issues);
        let session_id = record.optional_text(COL_SESSION_ID);
        let datatype = collect(record.text_list(COL_DATATYPE), &mut issues);
        if !issues.is_empty() {
            return Err(issues);
        }
        Ok(Self {
            participant_id,
            visit_id,
            session_id,
            datatype,
            extras: extra_columns(record, &MANIFEST_SCHEMA),
        })
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.set(COL_PARTICIPANT_ID, &self.participant_id);
        record.set(COL_VISIT_ID, &self.visit_id);
        record.set(COL_SESSION_ID, self.session_id.as_deref().unwrap_or(""));
        record.set_list(COL_DATATYPE, &self.datatype);
        render_extras(&mut record, &self.extras, &MANIFEST_SCHEMA);
        record
    }
}

pub type Manifest = Table<ManifestRow>;

impl Table<ManifestRow> {
    /// Records with imaging data, optionally restricted to one session.
    pub fn get_imaging_subset(&self, session_id: Option<&str>) -> Manifest {
        let rows = self
            .iter()
            .filter(|row| match (row.session_id.as_deref(), session_id) {
                (Some(session), Some(wanted)) => session == wanted,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .cloned()
            .collect();
        Table::from_rows(rows)
    }

    /// Distinct (participant, session) pairs with imaging data, in
    /// first-appearance order, optionally filtered on either identifier.
    pub fn get_participants_sessions<'a>(
        &'a self,
        participant_id: Option<&'a str>,
        session_id: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        self.iter().filter_map(move |row| {
            let session = row.session_id.as_deref()?;
            if participant_id.is_some_and(|p| p != row.participant_id) {
                return None;
            }
            if session_id.is_some_and(|s| s != session) {
                return None;
            }
            let pair = (row.participant_id.as_str(), session);
            seen.insert(pair).then_some(pair)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(participant: &str, visit: &str, session: &str, datatype: &str) -> Record {
        [
            (COL_PARTICIPANT_ID, participant),
            (COL_VISIT_ID, visit),
            (COL_SESSION_ID, session),
            (COL_DATATYPE, datatype),
        ]
        .into_iter()
        .collect()
    }

    fn manifest() -> Manifest {
        Manifest::from_records(vec![
            record("01", "BL", "BL", r#"["anat","dwi"]"#),
            record("01", "NEUROPSYCH", "", "[]"),
            record("01", "M12", "M12", r#"["anat"]"#),
            record("02", "BL", "BL", r#"["anat"]"#),
        ])
        .unwrap()
    }

    #[test]
    fn imaging_subset_drops_sessionless_visits() {
        let subset = manifest().get_imaging_subset(None);
        assert_eq!(subset.len(), 3);
        assert!(subset.iter().all(ManifestRow::is_imaging));

        let baseline = manifest().get_imaging_subset(Some("BL"));
        assert_eq!(baseline.len(), 2);
    }

    #[test]
    fn participants_sessions_are_distinct_and_filterable() {
        let m = manifest();
        let all: Vec<(&str, &str)> = m.get_participants_sessions(None, None).collect();
        assert_eq!(all, vec![("01", "BL"), ("01", "M12"), ("02", "BL")]);

        let p01: Vec<(&str, &str)> = m.get_participants_sessions(Some("01"), None).collect();
        assert_eq!(p01, vec![("01", "BL"), ("01", "M12")]);

        let bl: Vec<(&str, &str)> = m.get_participants_sessions(None, Some("BL")).collect();
        assert_eq!(bl, vec![("01", "BL"), ("02", "BL")]);
    }

    #[test]
    fn prefixed_identifiers_are_rejected() {
        let err = Manifest::from_records(vec![record("sub-01", "BL", "ses-BL", "[]")]).unwrap_err();
        match err {
            crate::error::Error::Validation(report) => {
                assert_eq!(report.issues.len(), 2);
                assert_eq!(report.issues[0].issue.column, COL_PARTICIPANT_ID);
                assert_eq!(report.issues[1].issue.column, COL_SESSION_ID);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unknown_columns_are_preserved_through_round_trips() {
        let mut raw = record("01", "BL", "BL", "[]");
        raw.set("site", "MNI");
        let m = Manifest::from_records(vec![raw]).unwrap();
        assert_eq!(m.rows()[0].extras.get("site").map(String::as_str), Some("MNI"));
        assert_eq!(m.records()[0].get("site"), Some("MNI"));
    }

    #[test]
    fn duplicate_participant_visit_pairs_are_rejected() {
        let err = Manifest::from_records(vec![
            record("01", "BL", "BL", "[]"),
            record("01", "BL", "", "[]"),
        ])
        .unwrap_err();
        assert!(matches!(err, crate::error::Error::DuplicateRecords { .. }));
    }
}
