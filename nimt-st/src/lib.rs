//! NIMT Status Tables
//!
//! Validated tabular state tracking for neuroimaging datasets. The manifest
//! lists which participants and visits exist; the curation status table
//! records how far each imaging session has moved through the raw-data flow;
//! the processing status table records pipeline run outcomes. All tables
//! persist as tab-separated files with schema validation on load and
//! backup-preserving writes.
//!
//! # Architecture
//!
//! - [`tabular`]: schema declarations, raw records, the generic validated
//!   [`Table`](tabular::Table), and the delimited file store
//! - [`tables`]: the concrete table kinds and their queries
//! - [`tracker`]: services that derive status tables from the manifest and
//!   the dataset on disk
//! - [`ids`]: participant and session identifier rules
//! - [`error`]: the error taxonomy, with aggregated validation reports

pub mod error;
pub mod ids;
pub mod tables;
pub mod tabular;
pub mod tracker;

pub use error::{Error, Result};
pub use tables::{
    CurationStage, CurationStatusRow, CurationStatusTable, DicomDirMap, DicomDirMapRow,
    DicomDirMapTable, Manifest, ManifestRow, PipelineRef, ProcessingStatusRow,
    ProcessingStatusTable, RunStatus,
};
pub use tabular::{RawTable, Record, SaveOutcome, Table, TableRow};
pub use tracker::{
    record_outcomes, CurationTracker, DatasetStageProbe, PipelineOutcome, ProbePolicy, StageProbe,
};
