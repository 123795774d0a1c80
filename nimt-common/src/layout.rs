//! Dataset directory layout
//!
//! Single source of truth for where stage directories and table files live
//! under a dataset root:
//!
//! ```text
//! <root>/
//!   incoming/                              raw intake (pre-reorganization)
//!   organized/                             reorganized data (post-reorganization)
//!   bids/                                  BIDS conversion output
//!   tabular/
//!     manifest.tsv
//!     dicom_dir_map.tsv                    optional, user-supplied
//!     status/
//!       curation_status.tsv
//!       processing_status.tsv
//! ```
//!
//! Directory names are overridable via the `[layout]` section of `nimt.toml`.

use crate::config::LayoutOverrides;
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// Manifest file name
pub const MANIFEST_FILE_NAME: &str = "manifest.tsv";
/// DICOM directory map file name
pub const DICOM_DIR_MAP_FILE_NAME: &str = "dicom_dir_map.tsv";
/// Curation status table file name
pub const CURATION_STATUS_FILE_NAME: &str = "curation_status.tsv";
/// Processing status table file name
pub const PROCESSING_STATUS_FILE_NAME: &str = "processing_status.tsv";

const DEFAULT_INCOMING_DIR: &str = "incoming";
const DEFAULT_ORGANIZED_DIR: &str = "organized";
const DEFAULT_BIDS_DIR: &str = "bids";
const DEFAULT_TABULAR_DIR: &str = "tabular";
const STATUS_SUBDIR: &str = "status";

/// Resolved directory layout for one dataset
#[derive(Debug, Clone)]
pub struct DatasetLayout {
    root: PathBuf,
    incoming_name: String,
    organized_name: String,
    bids_name: String,
    tabular_name: String,
}

impl DatasetLayout {
    /// Layout with the standard directory names
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_overrides(root, &LayoutOverrides::default())
    }

    /// Layout with user-overridden directory names
    pub fn with_overrides(root: impl Into<PathBuf>, overrides: &LayoutOverrides) -> Self {
        let name = |o: &Option<String>, default: &str| {
            o.clone().unwrap_or_else(|| default.to_string())
        };
        Self {
            root: root.into(),
            incoming_name: name(&overrides.incoming_dir, DEFAULT_INCOMING_DIR),
            organized_name: name(&overrides.organized_dir, DEFAULT_ORGANIZED_DIR),
            bids_name: name(&overrides.bids_dir, DEFAULT_BIDS_DIR),
            tabular_name: name(&overrides.tabular_dir, DEFAULT_TABULAR_DIR),
        }
    }

    /// Dataset root folder
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Raw intake directory (pre-reorganization stage root)
    pub fn incoming(&self) -> PathBuf {
        self.root.join(&self.incoming_name)
    }

    /// Reorganized data directory (post-reorganization stage root)
    pub fn organized(&self) -> PathBuf {
        self.root.join(&self.organized_name)
    }

    /// BIDS output directory (BIDS stage root)
    pub fn bids(&self) -> PathBuf {
        self.root.join(&self.bids_name)
    }

    /// Table directory
    pub fn tabular(&self) -> PathBuf {
        self.root.join(&self.tabular_name)
    }

    /// Status table directory
    pub fn status_dir(&self) -> PathBuf {
        self.tabular().join(STATUS_SUBDIR)
    }

    /// Manifest file path
    pub fn manifest_file(&self) -> PathBuf {
        self.tabular().join(MANIFEST_FILE_NAME)
    }

    /// DICOM directory map file path
    pub fn dicom_dir_map_file(&self) -> PathBuf {
        self.tabular().join(DICOM_DIR_MAP_FILE_NAME)
    }

    /// Curation status table file path
    pub fn curation_status_file(&self) -> PathBuf {
        self.status_dir().join(CURATION_STATUS_FILE_NAME)
    }

    /// Processing status table file path
    pub fn processing_status_file(&self) -> PathBuf {
        self.status_dir().join(PROCESSING_STATUS_FILE_NAME)
    }

    /// Create every layout directory that is missing
    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [
            self.incoming(),
            self.organized(),
            self.bids(),
            self.tabular(),
            self.status_dir(),
        ] {
            if !dir.is_dir() {
                std::fs::create_dir_all(&dir)?;
                info!("Created directory {}", dir.display());
            }
        }
        Ok(())
    }
}
