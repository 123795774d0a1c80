//! Generic validated table
//!
//! [`Table`] owns a vector of typed rows and enforces two invariants on every
//! validating operation: each record satisfies its [`RowSchema`], and no two
//! records share the same index-column values. Operations never mutate in
//! place; they return a new validated table and leave the receiver untouched.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::error::{Error, FieldIssue, Result, RowIssue};
use crate::tabular::record::Record;
use crate::tabular::schema::RowSchema;

/// A typed row bound to a static schema.
///
/// `from_record` receives the canonical record produced by
/// [`RowSchema::validate_record`]; `to_record` must render the row back to
/// that same canonical form, recomputing any derived columns.
pub trait TableRow: Clone + PartialEq + std::fmt::Debug {
    fn schema() -> &'static RowSchema;

    fn from_record(record: &Record) -> std::result::Result<Self, Vec<FieldIssue>>;

    fn to_record(&self) -> Record;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table<R: TableRow> {
    rows: Vec<R>,
}

impl<R: TableRow> Default for Table<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: TableRow> Table<R> {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    /// Wraps typed rows without validating them.
    ///
    /// Index uniqueness is not checked here; call [`Table::validate`] before
    /// treating the result as a validated table.
    pub fn from_rows(rows: Vec<R>) -> Self {
        Self { rows }
    }

    /// Builds a validated table from raw records.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Result<Self> {
        let table = Self {
            rows: Self::build_rows(records)?,
        };
        table.check_unique()?;
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }

    /// Mutable row access for entity-specific setters. Callers must not
    /// change index-column values through this.
    pub(crate) fn rows_mut(&mut self) -> &mut [R] {
        &mut self.rows
    }

    /// The canonical record form of every row, in table order.
    pub fn records(&self) -> Vec<Record> {
        self.rows.iter().map(R::to_record).collect()
    }

    /// Revalidates every record and rechecks index uniqueness.
    ///
    /// On an already-valid table this is an identity operation.
    pub fn validate(&self) -> Result<Self> {
        let table = Self {
            rows: Self::build_rows(self.records())?,
        };
        table.check_unique()?;
        Ok(table)
    }

    /// Upserts raw records by index key.
    ///
    /// Records whose key is already present overwrite the existing row in
    /// place; the rest are appended in input order. Within the input batch
    /// the last record for a key wins. Returns a new validated table.
    pub fn add_or_update_records(&self, records: impl IntoIterator<Item = Record>) -> Result<Self> {
        let incoming = Self::build_rows(records)?;
        self.add_or_update(incoming)
    }

    /// Upserts typed rows by index key. See [`Table::add_or_update_records`].
    pub fn add_or_update_rows(&self, incoming: &[R]) -> Result<Self> {
        self.add_or_update_records(incoming.iter().map(R::to_record))
    }

    fn add_or_update(&self, incoming: Vec<R>) -> Result<Self> {
        let index = R::schema().index;
        let mut rows = self.rows.clone();
        let mut positions: HashMap<Vec<String>, usize> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (key_of(&row.to_record(), index), i))
            .collect();
        for row in incoming {
            let key = key_of(&row.to_record(), index);
            match positions.get(&key) {
                Some(&i) => rows[i] = row,
                None => {
                    positions.insert(key, rows.len());
                    rows.push(row);
                }
            }
        }
        let table = Self { rows };
        table.check_unique()?;
        Ok(table)
    }

    /// Records of `self` whose index-column values match no record of
    /// `other`. See [`Table::get_diff_on`].
    pub fn get_diff<O: TableRow>(&self, other: &Table<O>) -> Result<Self> {
        self.get_diff_on(other, R::schema().index)
    }

    /// Records of `self` whose values in `columns` match no record of `other`.
    ///
    /// The comparison is one-directional: records only in `other` do not
    /// appear in the result. Every compared column must exist in both
    /// schemas; `other` may be a table of a different kind.
    pub fn get_diff_on<O: TableRow>(&self, other: &Table<O>, columns: &[&str]) -> Result<Self> {
        for column in columns {
            for schema in [R::schema(), O::schema()] {
                if !schema.has_column(column) {
                    return Err(Error::MissingColumn {
                        table: schema.name.to_owned(),
                        column: (*column).to_owned(),
                    });
                }
            }
        }
        let known: HashSet<Vec<String>> = other
            .rows
            .iter()
            .map(|row| key_of(&row.to_record(), columns))
            .collect();
        let rows = self
            .rows
            .iter()
            .filter(|row| !known.contains(&key_of(&row.to_record(), columns)))
            .cloned()
            .collect();
        Ok(Self { rows })
    }

    /// Appends `other`'s rows and revalidates the result.
    ///
    /// Fails if the combined table violates index uniqueness.
    pub fn concatenate(&self, other: &Self) -> Result<Self> {
        self.concatenate_unvalidated(other).validate()
    }

    /// Appends `other`'s rows without validating the result.
    pub fn concatenate_unvalidated(&self, other: &Self) -> Self {
        let mut rows = self.rows.clone();
        rows.extend(other.rows.iter().cloned());
        Self { rows }
    }

    /// Content equality, insensitive to row order and column order.
    pub fn equals(&self, other: &Self) -> bool {
        let mut ours = self.records();
        let mut theirs = other.records();
        ours.sort();
        theirs.sort();
        ours == theirs
    }

    fn build_rows(records: impl IntoIterator<Item = Record>) -> Result<Vec<R>> {
        let schema = R::schema();
        let mut rows = Vec::new();
        let mut issues = Vec::new();
        for (position, raw) in records.into_iter().enumerate() {
            let number = position + 1;
            match schema.validate_record(&raw) {
                Ok(canonical) => match R::from_record(&canonical) {
                    Ok(row) => rows.push(row),
                    Err(field_issues) => {
                        issues.extend(field_issues.into_iter().map(|i| RowIssue::new(number, i)));
                    }
                },
                Err(field_issues) => {
                    issues.extend(field_issues.into_iter().map(|i| RowIssue::new(number, i)));
                }
            }
        }
        if issues.is_empty() {
            Ok(rows)
        } else {
            Err(Error::validation(schema.name, issues))
        }
    }

    fn check_unique(&self) -> Result<()> {
        let schema = R::schema();
        let mut seen: HashSet<Vec<String>> = HashSet::new();
        let mut duplicates: BTreeSet<Vec<String>> = BTreeSet::new();
        for row in &self.rows {
            let key = key_of(&row.to_record(), schema.index);
            if !seen.insert(key.clone()) {
                duplicates.insert(key);
            }
        }
        if duplicates.is_empty() {
            Ok(())
        } else {
            Err(Error::DuplicateRecords {
                table: schema.name.to_owned(),
                index_columns: schema.index.iter().map(|c| (*c).to_owned()).collect(),
                keys: duplicates.iter().map(|key| render_key(key)).collect(),
            })
        }
    }
}

impl<'a, R: TableRow> IntoIterator for &'a Table<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

fn key_of(record: &Record, columns: &[&str]) -> Vec<String> {
    columns
        .iter()
        .map(|column| record.get(column).unwrap_or("").to_owned())
        .collect()
}

fn render_key(key: &[String]) -> String {
    format!("({})", key.join(", "))
}
