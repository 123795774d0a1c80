//! Validated tabular core
//!
//! Schema declaration, raw records, the generic [`Table`] engine, and the
//! delimited file store. Concrete table kinds are declared in
//! [`crate::tables`] on top of this machinery.

pub mod record;
pub mod schema;
pub mod store;
pub mod table;

pub use record::Record;
pub use schema::{ColumnKind, ColumnSpec, RowSchema};
pub use store::{RawTable, SaveOutcome, DELIMITER};
pub use table::{Table, TableRow};
