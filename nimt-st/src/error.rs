//! Error types for status table operations
//!
//! Validation failures are aggregated: every invalid record in a table is
//! reported in a single [`Error::Validation`], not just the first one found.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// One problem found in one field of a record.
///
/// Carries no record position; [`RowIssue`] adds it once the record's place
/// in the table is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldIssue {
    /// Column the offending value came from.
    pub column: String,
    /// The raw value, when one was present.
    pub value: Option<String>,
    /// What was wrong with it.
    pub message: String,
}

impl FieldIssue {
    pub fn new(column: impl Into<String>, value: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            value: value.map(str::to_owned),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => {
                write!(f, "column '{}': {} (got '{}')", self.column, self.message, value)
            }
            None => write!(f, "column '{}': {}", self.column, self.message),
        }
    }
}

/// A [`FieldIssue`] anchored to a record position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    /// 1-based record position within the table, header excluded.
    pub row: usize,
    pub issue: FieldIssue,
}

impl RowIssue {
    pub fn new(row: usize, issue: FieldIssue) -> Self {
        Self { row, issue }
    }
}

impl fmt::Display for RowIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {}, {}", self.row, self.issue)
    }
}

/// Every issue found while validating one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Table name, e.g. `manifest`.
    pub table: String,
    pub issues: Vec<RowIssue>,
}

impl ValidationReport {
    pub fn new(table: impl Into<String>, issues: Vec<RowIssue>) -> Self {
        Self {
            table: table.into(),
            issues,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Cap on issues printed in full; the rest are summarized by count.
const MAX_DISPLAYED_ISSUES: usize = 10;

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} invalid record(s) in '{}' table",
            self.issues.len(),
            self.table
        )?;
        for issue in self.issues.iter().take(MAX_DISPLAYED_ISSUES) {
            write!(f, "\n  {issue}")?;
        }
        if self.issues.len() > MAX_DISPLAYED_ISSUES {
            write!(f, "\n  ... and {} more", self.issues.len() - MAX_DISPLAYED_ISSUES)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// One or more records failed schema validation.
    #[error("{0}")]
    Validation(ValidationReport),

    /// Two or more records share the same index-column values.
    #[error("duplicate records in '{table}' table on ({}): {}", .index_columns.join(", "), .keys.join(", "))]
    DuplicateRecords {
        table: String,
        index_columns: Vec<String>,
        keys: Vec<String>,
    },

    /// Table file does not exist at the expected path.
    #[error("table file not found: {}", .path.display())]
    MissingFile { path: PathBuf },

    /// A column required by the operation is absent from the table.
    #[error("table '{table}' has no column '{column}'")]
    MissingColumn { table: String, column: String },

    /// Columns outside the schema in a table that rejects them.
    #[error("unexpected column(s) in '{table}' table: {}", .columns.join(", "))]
    UnexpectedColumns { table: String, columns: Vec<String> },

    /// Structurally broken table file (bad header, jagged rows).
    #[error("malformed table file {}: {message}", .path.display())]
    Malformed { path: PathBuf, message: String },

    /// A value that cannot be written to the delimited format losslessly.
    #[error("illegal value in column '{column}': {message}")]
    IllegalValue { column: String, message: String },

    /// Lookup of a record that is not in the table.
    #[error("no record in '{table}' table for {key}")]
    RecordNotFound { table: String, key: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] nimt_common::Error),
}

impl Error {
    /// Builds a validation error, ordering issues by record position.
    pub fn validation(table: impl Into<String>, mut issues: Vec<RowIssue>) -> Self {
        issues.sort_by(|a, b| (a.row, &a.issue.column).cmp(&(b.row, &b.issue.column)));
        Error::Validation(ValidationReport::new(table, issues))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_report_lists_each_issue() {
        let prefix_issue =
            FieldIssue::new("participant_id", Some("sub-01"), "must not carry the 'sub-' prefix");
        let report = ValidationReport::new(
            "manifest",
            vec![
                RowIssue::new(2, prefix_issue),
                RowIssue::new(5, FieldIssue::new("visit_id", None, "missing required value")),
            ],
        );
        let text = report.to_string();
        assert!(text.starts_with("2 invalid record(s) in 'manifest' table"));
        assert!(text.contains("record 2, column 'participant_id'"));
        assert!(text.contains("got 'sub-01'"));
        assert!(text.contains("record 5, column 'visit_id': missing required value"));
    }

    #[test]
    fn validation_report_truncates_long_issue_lists() {
        let issues = (1..=25)
            .map(|i| RowIssue::new(i, FieldIssue::new("status", Some("BAD"), "unknown status")))
            .collect();
        let text = ValidationReport::new("processing_status", issues).to_string();
        assert!(text.contains("25 invalid record(s)"));
        assert!(text.contains("... and 15 more"));
    }

    #[test]
    fn validation_constructor_sorts_issues_by_row() {
        let err = Error::validation(
            "manifest",
            vec![
                RowIssue::new(7, FieldIssue::new("a", None, "x")),
                RowIssue::new(2, FieldIssue::new("b", None, "y")),
            ],
        );
        match err {
            Error::Validation(report) => {
                assert_eq!(report.issues[0].row, 2);
                assert_eq!(report.issues[1].row, 7);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn duplicate_records_display_names_index_columns() {
        let err = Error::DuplicateRecords {
            table: "manifest".into(),
            index_columns: vec!["participant_id".into(), "visit_id".into()],
            keys: vec!["(01, BL)".into()],
        };
        let text = err.to_string();
        assert!(text.contains("'manifest'"));
        assert!(text.contains("(participant_id, visit_id)"));
        assert!(text.contains("(01, BL)"));
    }
}
