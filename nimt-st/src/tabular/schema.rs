//! Declarative row schemas
//!
//! Each table kind declares its columns, index, and extra-column policy once,
//! as a static [`RowSchema`]. Everything else derives from that declaration:
//! record validation, header checks on load, canonical column order on save,
//! and uniqueness enforcement over the index columns.

use crate::error::FieldIssue;
use crate::tabular::record::{self, Record};

/// Semantic type of one column's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Required free-form text; the empty cell is invalid.
    Text,
    /// Text that may be empty.
    OptionalText,
    /// Boolean literal, canonically `True` or `False`.
    Flag,
    /// List of labels rendered as a JSON array; the empty cell reads as `[]`.
    TextList,
}

/// Declarative definition of one column.
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Extra validator applied to each non-empty cell after kind parsing.
    /// For [`ColumnKind::TextList`] it runs on each list element.
    pub check: Option<fn(&str) -> Result<(), String>>,
}

impl ColumnSpec {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Text,
            check: None,
        }
    }

    pub const fn optional_text(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::OptionalText,
            check: None,
        }
    }

    pub const fn flag(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::Flag,
            check: None,
        }
    }

    pub const fn text_list(name: &'static str) -> Self {
        Self {
            name,
            kind: ColumnKind::TextList,
            check: None,
        }
    }

    pub const fn with_check(mut self, check: fn(&str) -> Result<(), String>) -> Self {
        self.check = Some(check);
        self
    }
}

/// Declarative definition of one table kind.
#[derive(Debug, Clone, Copy)]
pub struct RowSchema {
    /// Table name used in error messages and logs, e.g. `manifest`.
    pub name: &'static str,
    pub columns: &'static [ColumnSpec],
    /// Columns whose combined values must be unique across records.
    pub index: &'static [&'static str],
    /// Whether columns outside the schema are tolerated and preserved.
    pub allow_extra: bool,
}

impl RowSchema {
    pub const fn new(
        name: &'static str,
        columns: &'static [ColumnSpec],
        index: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            columns,
            index,
            allow_extra: false,
        }
    }

    /// Tolerate and preserve columns outside the schema.
    pub const fn with_extra_columns(mut self) -> Self {
        self.allow_extra = true;
        self
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// Validates one raw record and returns its canonical form.
    ///
    /// Canonicalization rewrites flag cells as `True`/`False` and list cells
    /// as JSON arrays, and fills empty cells for absent optional columns.
    /// All problems are collected; nothing fails fast.
    pub fn validate_record(&self, raw: &Record) -> Result<Record, Vec<FieldIssue>> {
        let mut issues = Vec::new();
        let mut canonical = Record::new();

        for spec in self.columns {
            let cell = raw.get(spec.name).unwrap_or("");
            match self.canonicalize_cell(spec, cell) {
                Ok(value) => {
                    canonical.set(spec.name, value);
                }
                Err(message) => {
                    issues.push(FieldIssue::new(spec.name, Some(cell), message));
                }
            }
        }

        for (name, value) in raw.iter() {
            if self.has_column(name) {
                continue;
            }
            if self.allow_extra {
                canonical.set(name, value);
            } else {
                issues.push(FieldIssue::new(
                    name,
                    Some(value),
                    "column is not part of the schema",
                ));
            }
        }

        if issues.is_empty() {
            Ok(canonical)
        } else {
            Err(issues)
        }
    }

    fn canonicalize_cell(&self, spec: &ColumnSpec, cell: &str) -> Result<String, String> {
        match spec.kind {
            ColumnKind::Text => {
                if cell.is_empty() {
                    return Err("missing required value".into());
                }
                self.run_check(spec, cell)?;
                Ok(cell.to_owned())
            }
            ColumnKind::OptionalText => {
                if !cell.is_empty() {
                    self.run_check(spec, cell)?;
                }
                Ok(cell.to_owned())
            }
            ColumnKind::Flag => {
                let value = record::parse_flag(cell)?;
                Ok(record::render_flag(value).to_owned())
            }
            ColumnKind::TextList => {
                let items = record::parse_text_list(cell)?;
                for item in &items {
                    self.run_check(spec, item)?;
                }
                Ok(record::render_text_list(&items))
            }
        }
    }

    fn run_check(&self, spec: &ColumnSpec, value: &str) -> Result<(), String> {
        match spec.check {
            Some(check) => check(value),
            None => Ok(()),
        }
    }
}
