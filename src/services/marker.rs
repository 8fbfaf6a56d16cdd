//! Self-consuming marker file.
//!
//! The manufacturing line drops a sentinel file before first boot. Its mere
//! existence is the signal; it is deleted the first time it is seen, so the
//! signal fires at most once per device lifetime. The only persisted state is
//! the file's existence.

use anyhow::{Context, Result};
use log::{error, info};
use std::{fs, io::ErrorKind, path::PathBuf};

/// What a detection pass learned about the marker
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum MarkerState {
    /// Detection short-circuited before the marker was looked at
    #[default]
    NotYetChecked,
    /// The marker existed and this pass consumed it
    ConsumedTrue,
    /// No marker on disk
    NeverPresent,
}

impl MarkerState {
    pub fn fired(self) -> bool {
        self == MarkerState::ConsumedTrue
    }
}

/// A one-shot marker file.
#[derive(Clone, Debug)]
pub struct MarkerFile {
    path: PathBuf,
    label: &'static str,
}

impl MarkerFile {
    pub fn new(path: impl Into<PathBuf>, label: &'static str) -> Self {
        Self {
            path: path.into(),
            label,
        }
    }

    #[cfg(test)]
    pub(crate) fn path(&self) -> &std::path::Path {
        &self.path
    }

    pub fn exists(&self) -> Result<bool> {
        self.path
            .try_exists()
            .with_context(|| format!("failed to check {} marker at {:?}", self.label, self.path))
    }

    #[cfg(test)]
    pub(crate) fn set(&self) -> std::io::Result<()> {
        info!("Setting {} marker at: {:?}", self.label, self.path);
        fs::write(&self.path, "")
    }

    /// Check for the marker and delete it if present.
    ///
    /// A marker that exists but cannot be deleted still counts as observed;
    /// the delete failure is logged. A marker removed by someone else between
    /// the check and the delete counts as absent.
    pub fn consume(&self) -> Result<MarkerState> {
        if !self.exists()? {
            return Ok(MarkerState::NeverPresent);
        }

        match fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Consumed {} marker at {:?}", self.label, self.path);
                Ok(MarkerState::ConsumedTrue)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(MarkerState::NeverPresent),
            Err(e) => {
                error!("Failed to remove {} marker: {e}", self.label);
                Ok(MarkerState::ConsumedTrue)
            }
        }
    }
}
