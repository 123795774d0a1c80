//! Processing status table
//!
//! One record per participant, session, and pipeline step, recording the
//! outcome of the latest run. The BIDS-prefixed identifier columns are
//! derived from the bare identifiers at validation time; values already in
//! a file are ignored and rewritten, so they can never drift out of sync.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::FieldIssue;
use crate::ids;
use crate::tables::{collect, extra_columns, render_extras, COL_PARTICIPANT_ID, COL_SESSION_ID};
use crate::tabular::{ColumnSpec, Record, RowSchema, Table, TableRow};

pub const COL_BIDS_PARTICIPANT_ID: &str = "bids_participant_id";
pub const COL_BIDS_SESSION_ID: &str = "bids_session_id";
pub const COL_PIPELINE_NAME: &str = "pipeline_name";
pub const COL_PIPELINE_VERSION: &str = "pipeline_version";
pub const COL_PIPELINE_STEP: &str = "pipeline_step";
pub const COL_STATUS: &str = "status";

/// Outcome of one pipeline run. The vocabulary is closed; anything else in
/// a status cell is a validation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunStatus {
    Success,
    Fail,
    Incomplete,
    Unavailable,
}

impl RunStatus {
    pub const ALL: [RunStatus; 4] = [
        RunStatus::Success,
        RunStatus::Fail,
        RunStatus::Incomplete,
        RunStatus::Unavailable,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Success => "SUCCESS",
            RunStatus::Fail => "FAIL",
            RunStatus::Incomplete => "INCOMPLETE",
            RunStatus::Unavailable => "UNAVAILABLE",
        }
    }

    /// Column check usable in a schema declaration.
    fn check_label(value: &str) -> Result<(), String> {
        match value.parse::<RunStatus>() {
            Ok(_) => Ok(()),
            Err(message) => Err(message),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        RunStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| {
                let labels: Vec<&str> = RunStatus::ALL.iter().map(|s| s.as_str()).collect();
                format!("must be one of {}", labels.join(", "))
            })
    }
}

/// Identifies one pipeline step: name, version, and step label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineRef {
    pub name: String,
    pub version: String,
    pub step: String,
}

impl PipelineRef {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        step: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            step: step.into(),
        }
    }
}

impl fmt::Display for PipelineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.name, self.version, self.step)
    }
}

static PROCESSING_STATUS_COLUMNS: [ColumnSpec; 8] = [
    ColumnSpec::text(COL_PARTICIPANT_ID).with_check(ids::check_participant_id),
    ColumnSpec::optional_text(COL_BIDS_PARTICIPANT_ID),
    ColumnSpec::text(COL_SESSION_ID).with_check(ids::check_session_id),
    ColumnSpec::optional_text(COL_BIDS_SESSION_ID),
    ColumnSpec::text(COL_PIPELINE_NAME),
    ColumnSpec::text(COL_PIPELINE_VERSION),
    ColumnSpec::text(COL_PIPELINE_STEP),
    ColumnSpec::text(COL_STATUS).with_check(RunStatus::check_label),
];

pub static PROCESSING_STATUS_SCHEMA: RowSchema = RowSchema::new(
    "processing_status",
    &PROCESSING_STATUS_COLUMNS,
    &[
        COL_PARTICIPANT_ID,
        COL_SESSION_ID,
        COL_PIPELINE_NAME,
        COL_PIPELINE_VERSION,
        COL_PIPELINE_STEP,
    ],
)
.with_extra_columns();

/// Latest run outcome for one participant, session, and pipeline step.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingStatusRow {
    pub participant_id: String,
    /// Derived from `participant_id`; never read from input.
    pub bids_participant_id: String,
    pub session_id: String,
    /// Derived from `session_id`; never read from input.
    pub bids_session_id: String,
    pub pipeline_name: String,
    pub pipeline_version: String,
    pub pipeline_step: String,
    pub status: RunStatus,
    /// Columns outside the schema, preserved across loads and saves.
    pub extras: BTreeMap<String, String>,
}

impl ProcessingStatusRow {
    pub fn new(
        participant_id: impl Into<String>,
        session_id: impl Into<String>,
        pipeline: &PipelineRef,
        status: RunStatus,
    ) -> Self {
        let participant_id = participant_id.into();
        let session_id = session_id.into();
        Self {
            bids_participant_id: ids::bids_participant_id(&participant_id),
            bids_session_id: ids::bids_session_id(&session_id),
            participant_id,
            session_id,
            pipeline_name: pipeline.name.clone(),
            pipeline_version: pipeline.version.clone(),
            pipeline_step: pipeline.step.clone(),
            status,
            extras: BTreeMap::new(),
        }
    }

    pub fn matches_pipeline(&self, pipeline: &PipelineRef) -> bool {
        self.pipeline_name == pipeline.name
            && self.pipeline_version == pipeline.version
            && self.pipeline_step == pipeline.step
    }
}

impl TableRow for ProcessingStatusRow {
    fn schema() -> &'static RowSchema {
        &PROCESSING_STATUS_SCHEMA
    }

    fn from_record(record: &Record) -> Result<Self, Vec<FieldIssue>> {
        let mut issues = Vec::new();
        let participant_id = collect(record.text(COL_PARTICIPANT_ID), &mut issues);
        let session_id = collect(record.text(COL_SESSION_ID), &mut issues);
        let pipeline_name = collect(record.text(COL_PIPELINE_NAME), &mut issues);
        let pipeline_version = collect(record.text(COL_PIPELINE_VERSION), &mut issues);
        let pipeline_step = collect(record.text(COL_PIPELINE_STEP), &mut issues);
        let status_label = collect(record.text(COL_STATUS), &mut issues);
        let status = status_label.parse::<RunStatus>().unwrap_or_else(|message| {
            issues.push(FieldIssue::new(COL_STATUS, Some(status_label.as_str()), message));
            // Placeholder only; the issue recorded above forces an Err below.
            RunStatus::Incomplete
        });
        if !issues.is_empty() {
            return Err(issues);
        }
        Ok(Self {
            bids_participant_id: ids::bids_participant_id(&participant_id),
            bids_session_id: ids::bids_session_id(&session_id),
            participant_id,
            session_id,
            pipeline_name,
            pipeline_version,
            pipeline_step,
            status,
            extras: extra_columns(record, &PROCESSING_STATUS_SCHEMA),
        })
    }

    fn to_record(&self) -> Record {
        let mut record = Record::new();
        record.set(COL_PARTICIPANT_ID, &self.participant_id);
        record.set(COL_BIDS_PARTICIPANT_ID, &self.bids_participant_id);
        record.set(COL_SESSION_ID, &self.session_id);
        record.set(COL_BIDS_SESSION_ID, &self.bids_session_id);
        record.set(COL_PIPELINE_NAME, &self.pipeline_name);
        record.set(COL_PIPELINE_VERSION, &self.pipeline_version);
        record.set(COL_PIPELINE_STEP, &self.pipeline_step);
        record.set(COL_STATUS, self.status.as_str());
        render_extras(&mut record, &self.extras, &PROCESSING_STATUS_SCHEMA);
        record
    }
}

pub type ProcessingStatusTable = Table<ProcessingStatusRow>;

impl Table<ProcessingStatusRow> {
    /// (participant, session) pairs whose latest run of `pipeline` was
    /// successful, optionally filtered on either identifier.
    pub fn get_completed_participants_sessions<'a>(
        &'a self,
        pipeline: &PipelineRef,
        participant_id: Option<&'a str>,
        session_id: Option<&'a str>,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        let pipeline = pipeline.clone();
        self.iter().filter_map(move |row| {
            if row.status != RunStatus::Success || !row.matches_pipeline(&pipeline) {
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

    fn pipeline() -> PipelineRef {
        PipelineRef::new("fmriprep", "23.1.3", "default")
    }

    fn record(participant: &str, session: &str, status: &str) -> Record {
        [
            (COL_PARTICIPANT_ID, participant),
            (COL_SESSION_ID, session),
            (COL_PIPELINE_NAME, "fmriprep"),
            (COL_PIPELINE_VERSION, "23.1.3"),
            (COL_PIPELINE_STEP, "default"),
            (COL_STATUS, status),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn status_vocabulary_is_closed() {
        assert_eq!("SUCCESS".parse::<RunStatus>(), Ok(RunStatus::Success));
        assert_eq!("UNAVAILABLE".parse::<RunStatus>(), Ok(RunStatus::Unavailable));
        assert!("success".parse::<RunStatus>().is_err());
        assert!("DONE".parse::<RunStatus>().is_err());

        let err = ProcessingStatusTable::from_records(vec![record("01", "BL", "DONE")])
            .unwrap_err();
        match err {
            crate::error::Error::Validation(report) => {
                assert_eq!(report.issues[0].issue.column, COL_STATUS);
                assert!(report.issues[0].issue.message.contains("SUCCESS"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn bids_identifiers_are_derived_not_read() {
        let mut raw = record("01", "BL", "SUCCESS");
        raw.set(COL_BIDS_PARTICIPANT_ID, "sub-STALE");
        raw.set(COL_BIDS_SESSION_ID, "ses-STALE");
        let table = ProcessingStatusTable::from_records(vec![raw]).unwrap();

        let row = &table.rows()[0];
        assert_eq!(row.bids_participant_id, "sub-01");
        assert_eq!(row.bids_session_id, "ses-BL");
        assert_eq!(
            table.records()[0].get(COL_BIDS_PARTICIPANT_ID),
            Some("sub-01")
        );
    }

    #[test]
    fn one_record_per_participant_session_and_pipeline_step() {
        let err = ProcessingStatusTable::from_records(vec![
            record("01", "BL", "SUCCESS"),
            record("01", "BL", "FAIL"),
        ])
        .unwrap_err();
        assert!(matches!(err, crate::error::Error::DuplicateRecords { .. }));

        // Same pair under a different step is a distinct record.
        let mut other_step = record("01", "BL", "FAIL");
        other_step.set(COL_PIPELINE_STEP, "step2");
        let table = ProcessingStatusTable::from_records(vec![
            record("01", "BL", "SUCCESS"),
            other_step,
        ])
        .unwrap();
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn completed_query_filters_on_status_and_pipeline() {
        let mut other_pipeline = record("03", "BL", "SUCCESS");
        other_pipeline.set(COL_PIPELINE_NAME, "mriqc");
        let table = ProcessingStatusTable::from_records(vec![
            record("01", "BL", "SUCCESS"),
            record("01", "M12", "FAIL"),
            record("02", "BL", "SUCCESS"),
            other_pipeline,
        ])
        .unwrap();

        let done: Vec<(&str, &str)> = table
            .get_completed_participants_sessions(&pipeline(), None, None)
            .collect();
        assert_eq!(done, vec![("01", "BL"), ("02", "BL")]);

        let p02: Vec<(&str, &str)> = table
            .get_completed_participants_sessions(&pipeline(), Some("02"), None)
            .collect();
        assert_eq!(p02, vec![("02", "BL")]);
    }

    #[test]
    fn completed_query_outlives_the_pipeline_argument() {
        let table = ProcessingStatusTable::from_records(vec![record("01", "BL", "SUCCESS")])
            .unwrap();
        // The pipeline reference is a temporary that dies with this statement;
        // the iterator must stay usable afterwards.
        let done = table.get_completed_participants_sessions(
            &PipelineRef::new("fmriprep", "23.1.3", "default"),
            None,
            None,
        );
        assert_eq!(done.collect::<Vec<_>>(), vec![("01", "BL")]);
    }
}
