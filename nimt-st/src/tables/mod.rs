//! Concrete table kinds
//!
//! Each submodule declares one table: its static [`RowSchema`], its typed
//! row, and the queries specific to it. Column names shared across tables
//! are defined once here.

use std::collections::BTreeMap;

use crate::error::FieldIssue;
use crate::tabular::{Record, RowSchema};

pub mod curation;
pub mod dicom_dir;
pub mod manifest;
pub mod processing;

pub use curation::{CurationStage, CurationStatusRow, CurationStatusTable, CURATION_STATUS_SCHEMA};
pub use dicom_dir::{DicomDirMap, DicomDirMapRow, DicomDirMapTable, DICOM_DIR_MAP_SCHEMA};
pub use manifest::{Manifest, ManifestRow, MANIFEST_SCHEMA};
pub use processing::{
    PipelineRef, ProcessingStatusRow, ProcessingStatusTable, RunStatus, PROCESSING_STATUS_SCHEMA,
};

pub const COL_PARTICIPANT_ID: &str = "participant_id";
pub const COL_VISIT_ID: &str = "visit_id";
pub const COL_SESSION_ID: &str = "session_id";
pub const COL_DATATYPE: &str = "datatype";
pub const COL_PARTICIPANT_DICOM_DIR: &str = "participant_dicom_dir";

/// Unwraps a cell result, deferring the issue instead of failing fast.
pub(crate) fn collect<T: Default>(
    result: Result<T, FieldIssue>,
    issues: &mut Vec<FieldIssue>,
) -> T {
    match result {
        Ok(value) => value,
        Err(issue) => {
            issues.push(issue);
            T::default()
        }
    }
}

/// Cells of `record` outside `schema`, for row types that preserve extras.
pub(crate) fn extra_columns(record: &Record, schema: &RowSchema) -> BTreeMap<String, String> {
    record
        .iter()
        .filter(|(column, _)| !schema.has_column(column))
        .map(|(column, value)| (column.to_owned(), value.to_owned()))
        .collect()
}

/// Writes preserved extras back into a record, never shadowing schema columns.
pub(crate) fn render_extras(
    record: &mut Record,
    extras: &BTreeMap<String, String>,
    schema: &RowSchema,
) {
    for (column, value) in extras {
        if !schema.has_column(column) {
            record.set(column, value);
        }
    }
}
