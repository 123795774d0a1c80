//! # NIMT Common Library
//!
//! Shared code for the NIMT dataset tools including:
//! - Common error types
//! - Configuration loading and dataset root resolution
//! - Dataset directory layout
//! - Filesystem utilities (content probes, atomic replace, backups)

pub mod config;
pub mod error;
pub mod fsutil;
pub mod layout;

pub use error::{Error, Result};
pub use layout::DatasetLayout;
