//! Curation status tracking
//!
//! [`CurationTracker`] derives the curation status table from the manifest
//! and the state of the stage directories. `generate` builds the table from
//! scratch; `update` probes only the manifest records an existing table does
//! not cover yet, so manual status edits survive and stale pairs are never
//! removed.

use tracing::{debug, info};

use nimt_common::{fsutil, DatasetLayout};

use crate::error::Result;
use crate::ids;
use crate::tables::curation::{CurationStatusRow, CurationStatusTable, CURATION_STATUS_SCHEMA};
use crate::tables::dicom_dir::DicomDirMap;
use crate::tables::manifest::{Manifest, ManifestRow};

/// Filesystem checks for the three curation stages.
pub trait StageProbe {
    /// Raw data present for the pair's DICOM directory.
    fn in_pre_reorg(&self, participant_dicom_dir: &str) -> bool;

    /// Reorganized data present for the pair.
    fn in_post_reorg(&self, participant_id: &str, session_id: &str) -> bool;

    /// BIDS data present for the pair.
    fn in_bids(&self, participant_id: &str, session_id: &str) -> bool;
}

/// Probes the standard dataset layout.
///
/// A stage counts as present when its directory exists and contains at
/// least one entry; an unreadable directory counts as absent.
#[derive(Debug, Clone)]
pub struct DatasetStageProbe {
    layout: DatasetLayout,
}

impl DatasetStageProbe {
    pub fn new(layout: DatasetLayout) -> Self {
        Self { layout }
    }
}

impl StageProbe for DatasetStageProbe {
    fn in_pre_reorg(&self, participant_dicom_dir: &str) -> bool {
        fsutil::dir_has_content(&self.layout.incoming().join(participant_dicom_dir))
    }

    fn in_post_reorg(&self, participant_id: &str, session_id: &str) -> bool {
        let dir = self.layout.organized().join(participant_id).join(session_id);
        fsutil::dir_has_content(&dir)
    }

    fn in_bids(&self, participant_id: &str, session_id: &str) -> bool {
        let participant_dir = self
            .layout
            .bids()
            .join(ids::bids_participant_id(participant_id));
        // Sessionless datasets have no session level under the participant.
        if ids::is_sessionless(session_id) {
            fsutil::dir_has_content(&participant_dir)
        } else {
            fsutil::dir_has_content(&participant_dir.join(ids::bids_session_id(session_id)))
        }
    }
}

/// Whether stage probes actually touch the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbePolicy {
    /// Check the stage directories.
    #[default]
    Probe,
    /// Record every stage as absent without touching the filesystem.
    AssumeAbsent,
}

pub struct CurationTracker<P = DatasetStageProbe> {
    probe: P,
    dicom_dir_map: DicomDirMap,
    policy: ProbePolicy,
}

impl CurationTracker<DatasetStageProbe> {
    /// Tracker over the standard layout with the default directory
    /// convention.
    pub fn for_layout(layout: DatasetLayout) -> Self {
        Self::new(DatasetStageProbe::new(layout), DicomDirMap::default())
    }
}

impl<P: StageProbe> CurationTracker<P> {
    pub fn new(probe: P, dicom_dir_map: DicomDirMap) -> Self {
        Self {
            probe,
            dicom_dir_map,
            policy: ProbePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ProbePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Builds the curation status table for every imaging record of the
    /// manifest.
    pub fn generate(&self, manifest: &Manifest) -> Result<CurationStatusTable> {
        let imaging = manifest.get_imaging_subset(None);
        let mut rows = Vec::with_capacity(imaging.len());
        for manifest_row in &imaging {
            let Some(session_id) = manifest_row.session_id.as_deref() else {
                continue;
            };
            let participant_dicom_dir = self
                .dicom_dir_map
                .resolve(&manifest_row.participant_id, session_id)?;
            rows.push(self.probe_row(manifest_row, session_id, participant_dicom_dir));
        }
        let table = CurationStatusTable::from_rows(rows).validate()?;
        info!(records = table.len(), "Generated curation status table");
        Ok(table)
    }

    /// Adds records for manifest entries the table does not cover yet.
    ///
    /// Existing records are not re-probed, so statuses set by hand survive.
    /// Pairs that have left the manifest stay in the table.
    pub fn update(
        &self,
        table: &CurationStatusTable,
        manifest: &Manifest,
    ) -> Result<CurationStatusTable> {
        let delta = manifest.get_diff_on(table, CURATION_STATUS_SCHEMA.index)?;
        if delta.is_empty() {
            debug!("Curation status table already covers the manifest");
            return table.validate();
        }
        let additions = self.generate(&delta)?;
        let updated = table.concatenate(&additions)?;
        info!(
            added = additions.len(),
            records = updated.len(),
            "Updated curation status table"
        );
        Ok(updated)
    }

    fn probe_row(
        &self,
        manifest_row: &ManifestRow,
        session_id: &str,
        participant_dicom_dir: String,
    ) -> CurationStatusRow {
        let participant_id = &manifest_row.participant_id;
        let (in_pre_reorg, in_post_reorg, in_bids) = match self.policy {
            ProbePolicy::AssumeAbsent => (false, false, false),
            ProbePolicy::Probe => (
                self.probe.in_pre_reorg(&participant_dicom_dir),
                self.probe.in_post_reorg(participant_id, session_id),
                self.probe.in_bids(participant_id, session_id),
            ),
        };
        debug!(
            participant_id = %participant_id,
            session_id = %session_id,
            in_pre_reorg,
            in_post_reorg,
            in_bids,
            "Probed curation stages"
        );
        CurationStatusRow {
            participant_id: participant_id.clone(),
            visit_id: manifest_row.visit_id.clone(),
            session_id: session_id.to_owned(),
            datatype: manifest_row.datatype.clone(),
            participant_dicom_dir,
            in_pre_reorg,
            in_post_reorg,
            in_bids,
        }
    }
}
