//! Raw table records and cell value handling
//!
//! A [`Record`] is one row as read from or written to a delimited file:
//! column names mapped to raw string cells, with no schema applied yet.
//! Cell codecs for the non-text column kinds live here as free functions.

use std::collections::BTreeMap;

use crate::error::FieldIssue;

/// Canonical rendering of flag cells.
const FLAG_TRUE: &str = "True";
const FLAG_FALSE: &str = "False";

/// One unvalidated row: column name to raw cell value.
///
/// Columns are kept sorted, so iteration order is deterministic regardless
/// of the order cells were inserted or read in.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Record {
    cells: BTreeMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn set_flag(&mut self, column: impl Into<String>, value: bool) {
        self.set(column, render_flag(value));
    }

    pub fn set_list(&mut self, column: impl Into<String>, items: &[String]) {
        self.set(column, render_text_list(items));
    }

    pub fn remove(&mut self, column: &str) -> Option<String> {
        self.cells.remove(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.cells.contains_key(column)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Required text cell; the empty cell counts as missing.
    pub fn text(&self, column: &str) -> Result<String, FieldIssue> {
        match self.get(column) {
            Some(value) if !value.is_empty() => Ok(value.to_owned()),
            other => Err(FieldIssue::new(column, other, "missing required value")),
        }
    }

    /// Optional text cell; the empty cell reads as `None`.
    pub fn optional_text(&self, column: &str) -> Option<String> {
        match self.get(column) {
            Some("") | None => None,
            Some(value) => Some(value.to_owned()),
        }
    }

    pub fn flag(&self, column: &str) -> Result<bool, FieldIssue> {
        let cell = self.get(column).unwrap_or("");
        parse_flag(cell).map_err(|message| FieldIssue::new(column, Some(cell), message))
    }

    pub fn text_list(&self, column: &str) -> Result<Vec<String>, FieldIssue> {
        let cell = self.get(column).unwrap_or("");
        parse_text_list(cell).map_err(|message| FieldIssue::new(column, Some(cell), message))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Record {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut record = Record::new();
        for (column, value) in iter {
            record.set(column, value);
        }
        record
    }
}

/// Parses a flag cell. Accepts any casing of `true`/`false`.
pub fn parse_flag(cell: &str) -> Result<bool, String> {
    if cell.eq_ignore_ascii_case(FLAG_TRUE) {
        Ok(true)
    } else if cell.eq_ignore_ascii_case(FLAG_FALSE) {
        Ok(false)
    } else {
        Err(format!("must be '{FLAG_TRUE}' or '{FLAG_FALSE}'"))
    }
}

pub fn render_flag(value: bool) -> &'static str {
    if value {
        FLAG_TRUE
    } else {
        FLAG_FALSE
    }
}

/// Parses a list cell into its elements.
///
/// The canonical form is a JSON array of strings. Two legacy forms are also
/// read: single-quoted literals like `['anat', 'dwi']`, and a bare label,
/// which reads as a one-element list. The empty cell reads as the empty list.
pub fn parse_text_list(cell: &str) -> Result<Vec<String>, String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if !trimmed.starts_with('[') {
        return Ok(vec![trimmed.to_owned()]);
    }
    if let Ok(items) = serde_json::from_str::<Vec<String>>(trimmed) {
        return Ok(items);
    }
    // Single-quoted literals only work for elements without embedded quotes,
    // which holds for the plain labels these cells carry.
    let swapped = trimmed.replace('\'', "\"");
    serde_json::from_str::<Vec<String>>(&swapped)
        .map_err(|_| "must be a JSON array of strings".to_owned())
}

/// Renders list elements in the canonical JSON-array form.
pub fn render_text_list(items: &[String]) -> String {
    serde_json::Value::from(items.to_vec()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_parsing_is_case_insensitive() {
        assert_eq!(parse_flag("True"), Ok(true));
        assert_eq!(parse_flag("FALSE"), Ok(false));
        assert_eq!(parse_flag("true"), Ok(true));
        assert!(parse_flag("").is_err());
        assert!(parse_flag("yes").is_err());
    }

    #[test]
    fn list_parsing_accepts_canonical_and_legacy_forms() {
        assert_eq!(parse_text_list(""), Ok(vec![]));
        assert_eq!(parse_text_list("[]"), Ok(vec![]));
        assert_eq!(
            parse_text_list(r#"["anat","dwi"]"#),
            Ok(vec!["anat".to_owned(), "dwi".to_owned()])
        );
        assert_eq!(
            parse_text_list("['anat', 'dwi']"),
            Ok(vec!["anat".to_owned(), "dwi".to_owned()])
        );
        assert_eq!(parse_text_list("anat"), Ok(vec!["anat".to_owned()]));
        assert!(parse_text_list("[broken").is_err());
        assert!(parse_text_list("[1, 2]").is_err());
    }

    #[test]
    fn list_rendering_is_canonical_json() {
        assert_eq!(render_text_list(&[]), "[]");
        assert_eq!(
            render_text_list(&["anat".to_owned(), "dwi".to_owned()]),
            r#"["anat","dwi"]"#
        );
        // Round-trip through the parser lands back on the same elements.
        let items = vec!["func".to_owned()];
        assert_eq!(parse_text_list(&render_text_list(&items)), Ok(items));
    }

    #[test]
    fn typed_getters_report_field_issues() {
        let record: Record = [("a", ""), ("b", "True"), ("c", "[oops")].into_iter().collect();

        let issue = record.text("a").unwrap_err();
        assert_eq!(issue.column, "a");
        assert!(issue.message.contains("missing"));

        assert_eq!(record.flag("b"), Ok(true));
        assert!(record.text_list("c").is_err());
        assert_eq!(record.optional_text("a"), None);
        assert_eq!(record.optional_text("missing"), None);
    }

    #[test]
    fn records_iterate_in_sorted_column_order() {
        let record: Record = [("z", "1"), ("a", "2"), ("m", "3")].into_iter().collect();
        let columns: Vec<&str> = record.columns().collect();
        assert_eq!(columns, vec!["a", "m", "z"]);
    }
}
