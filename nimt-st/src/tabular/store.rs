//! Delimited file store with backup-on-write
//!
//! Tables persist as tab-separated files with a header line. Reading is
//! strict: a jagged row, a duplicate header column, or a missing header is
//! reported with its line number instead of being silently repaired. Writing
//! compares content first; the old file is only replaced after being moved
//! into the backups directory, and a save that would produce identical
//! content touches nothing.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use nimt_common::fsutil;

use crate::error::{Error, Result};
use crate::tabular::record::Record;
use crate::tabular::table::{Table, TableRow};

pub const DELIMITER: char = '\t';

/// What a [`Table::save_with_backup`] call did on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The file already held identical content; nothing was written.
    Unchanged,
    /// The file did not exist and was created.
    Created,
    /// The old file was moved into the backups directory and replaced.
    Updated { backup: PathBuf },
}

/// Header and records of a delimited file, with no schema applied.
///
/// This is the form nonconforming files are inspected in: everything is kept
/// as raw strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    columns: Vec<String>,
    records: Vec<Record>,
}

impl RawTable {
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::MissingFile {
                path: path.to_path_buf(),
            });
        }
        let bytes = fs::read(path)?;
        let contents = String::from_utf8(bytes).map_err(|e| Error::Malformed {
            path: path.to_path_buf(),
            message: format!(
                "not valid UTF-8 (first invalid byte at offset {})",
                e.utf8_error().valid_up_to()
            ),
        })?;
        Self::parse(path, &contents)
    }

    fn parse(path: &Path, contents: &str) -> Result<Self> {
        let malformed = |message: String| Error::Malformed {
            path: path.to_path_buf(),
            message,
        };

        let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
        let mut lines = contents.lines();
        let header = lines
            .next()
            .ok_or_else(|| malformed("empty file (missing header line)".into()))?;

        let columns: Vec<String> = header.split(DELIMITER).map(str::to_owned).collect();
        let mut seen = BTreeSet::new();
        for column in &columns {
            if column.is_empty() {
                return Err(malformed("empty column name in header".into()));
            }
            if !seen.insert(column.as_str()) {
                return Err(malformed(format!("duplicate column '{column}' in header")));
            }
        }

        let mut records = Vec::new();
        for (i, line) in lines.enumerate() {
            if line.is_empty() {
                continue;
            }
            let line_number = i + 2;
            let fields: Vec<&str> = line.split(DELIMITER).collect();
            if fields.len() != columns.len() {
                return Err(malformed(format!(
                    "line {line_number}: expected {} fields, found {}",
                    columns.len(),
                    fields.len()
                )));
            }
            let record = columns
                .iter()
                .map(String::as_str)
                .zip(fields)
                .collect::<Record>();
            records.push(record);
        }

        Ok(Self { columns, records })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn to_delimited_string(&self) -> String {
        let mut out = String::new();
        push_line(&mut out, self.columns.iter().map(String::as_str));
        for record in &self.records {
            push_line(
                &mut out,
                self.columns.iter().map(|c| record.get(c).unwrap_or("")),
            );
        }
        out
    }

    /// Equality insensitive to column order and row order.
    fn content_equals(&self, other: &Self) -> bool {
        let mut ours: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        let mut theirs: Vec<&str> = other.columns.iter().map(String::as_str).collect();
        ours.sort_unstable();
        theirs.sort_unstable();
        if ours != theirs {
            return false;
        }
        let mut our_records = self.records.clone();
        let mut their_records = other.records.clone();
        our_records.sort();
        their_records.sort();
        our_records == their_records
    }
}

fn push_line<'a>(out: &mut String, fields: impl Iterator<Item = &'a str>) {
    for (i, field) in fields.enumerate() {
        if i > 0 {
            out.push(DELIMITER);
        }
        out.push_str(field);
    }
    out.push('\n');
}

impl<R: TableRow> Table<R> {
    /// Loads and validates a table file.
    ///
    /// The header must carry every schema column; columns outside the schema
    /// are rejected unless the schema tolerates extras.
    pub fn load(path: &Path) -> Result<Self> {
        let schema = R::schema();
        let raw = RawTable::read(path)?;

        for column in schema.column_names() {
            if !raw.columns.iter().any(|c| c == column) {
                return Err(Error::MissingColumn {
                    table: schema.name.to_owned(),
                    column: column.to_owned(),
                });
            }
        }
        if !schema.allow_extra {
            let unknown: Vec<String> = raw
                .columns
                .iter()
                .filter(|c| !schema.has_column(c))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                return Err(Error::UnexpectedColumns {
                    table: schema.name.to_owned(),
                    columns: unknown,
                });
            }
        }

        let table = Self::from_records(raw.into_records())?;
        info!(
            table = schema.name,
            path = %path.display(),
            records = table.len(),
            "Loaded table"
        );
        Ok(table)
    }

    /// Loads the file without applying the schema.
    pub fn load_unvalidated(path: &Path) -> Result<RawTable> {
        RawTable::read(path)
    }

    /// Writes the table, preserving any differing old content as a backup.
    ///
    /// Content comparison ignores column order and row order, so reordering
    /// alone never triggers a rewrite. An unparseable old file counts as
    /// differing content and is preserved in the backups directory.
    pub fn save_with_backup(&self, path: &Path) -> Result<SaveOutcome> {
        let schema = R::schema();
        let raw = self.to_raw()?;
        let rendered = raw.to_delimited_string();

        if path.exists() {
            match RawTable::read(path) {
                Ok(old) if old.content_equals(&raw) => {
                    debug!(
                        table = schema.name,
                        path = %path.display(),
                        "Table file already up to date"
                    );
                    return Ok(SaveOutcome::Unchanged);
                }
                Ok(_) | Err(Error::Malformed { .. }) => {}
                Err(e) => return Err(e),
            }
            let backup = fsutil::move_to_backup(path)?;
            fsutil::atomic_replace(path, &rendered)?;
            info!(
                table = schema.name,
                path = %path.display(),
                backup = %backup.display(),
                records = self.len(),
                "Updated table file"
            );
            Ok(SaveOutcome::Updated { backup })
        } else {
            fsutil::ensure_parent(path)?;
            fsutil::atomic_replace(path, &rendered)?;
            info!(
                table = schema.name,
                path = %path.display(),
                records = self.len(),
                "Created table file"
            );
            Ok(SaveOutcome::Created)
        }
    }

    /// Renders the table into its on-disk form.
    ///
    /// Columns are the schema columns in declaration order followed by any
    /// extra columns in sorted order. Cells containing the delimiter or a
    /// line break cannot be written losslessly and are rejected.
    fn to_raw(&self) -> Result<RawTable> {
        let schema = R::schema();
        let records = self.records();

        let mut columns: Vec<String> = schema.column_names().map(str::to_owned).collect();
        let mut extras = BTreeSet::new();
        for record in &records {
            for (column, _) in record.iter() {
                if !schema.has_column(column) {
                    extras.insert(column.to_owned());
                }
            }
        }
        columns.extend(extras);

        for column in &columns {
            check_writable(column, column)?;
        }
        for record in &records {
            for (column, value) in record.iter() {
                check_writable(column, value)?;
            }
        }

        Ok(RawTable { columns, records })
    }
}

fn check_writable(column: &str, value: &str) -> Result<()> {
    for (ch, name) in [
        (DELIMITER, "delimiter"),
        ('\n', "newline"),
        ('\r', "carriage return"),
    ] {
        if value.contains(ch) {
            return Err(Error::IllegalValue {
                column: column.to_owned(),
                message: format!("value contains a {name} character"),
            });
        }
    }
    Ok(())
}
