//! Status trackers
//!
//! Services that keep the status tables in step with the manifest and the
//! dataset on disk: curation tracking probes stage directories, processing
//! tracking folds pipeline run outcomes into the processing status table.

pub mod curation;
pub mod processing;

pub use curation::{CurationTracker, DatasetStageProbe, ProbePolicy, StageProbe};
pub use processing::{record_outcomes, PipelineOutcome};
