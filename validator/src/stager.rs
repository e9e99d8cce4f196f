//! Output directory handling for extracted plugin binaries.
//!
//! Each run writes extracted DLLs to `<output_root>/<bitness>/`. The
//! directory is prepared once before any plugin is processed; failure to
//! prepare it is fatal because every later extraction depends on it.

use crate::error::{Result, ValidatorError};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use std::fs;

/// Errors arising from persisting one extracted binary.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The entry name would escape the output directory.
    #[error("refusing to write {name}: path leaves the output directory")]
    PathTraversal {
        /// The offending entry name.
        name: String,
    },

    /// Writing the file failed.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Destination path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Writes extracted binaries into the run's output directory.
#[derive(Debug, Clone)]
pub struct Stager {
    output_dir: Utf8PathBuf,
}

impl Stager {
    /// Create a stager writing into `output_dir`.
    #[must_use]
    pub const fn new(output_dir: Utf8PathBuf) -> Self {
        Self { output_dir }
    }

    /// Ensure the output directory exists and is writable.
    ///
    /// An existing directory is reused.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::OutputDirectory`] if the directory cannot be
    /// created or written to.
    pub fn prepare(&self) -> Result<()> {
        let unusable = |e: std::io::Error| ValidatorError::OutputDirectory {
            path: self.output_dir.clone(),
            reason: e.to_string(),
        };

        fs::create_dir_all(&self.output_dir).map_err(unusable)?;

        // Verify writability by attempting to create a temp file
        let marker = self.output_dir.join(".plugin-list-validator-write-check");
        fs::write(&marker, b"ok").map_err(unusable)?;
        if let Err(e) = fs::remove_file(&marker) {
            log::debug!("could not remove write check {marker}: {e}");
        }
        Ok(())
    }

    /// Write `content` to `<output_dir>/<entry_name>` and return the path.
    ///
    /// # Errors
    ///
    /// Returns [`StageError::PathTraversal`] for names with directory
    /// components that leave the output directory, and
    /// [`StageError::Write`] when the write fails.
    pub fn stage(
        &self,
        entry_name: &str,
        content: &[u8],
    ) -> std::result::Result<Utf8PathBuf, StageError> {
        validate_entry_name(entry_name)?;
        let path = self.output_dir.join(entry_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StageError::Write {
                path: path.clone(),
                source,
            })?;
        }
        fs::write(&path, content).map_err(|source| StageError::Write {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

/// Reject absolute names and `..` components.
fn validate_entry_name(name: &str) -> std::result::Result<(), StageError> {
    let path = Utf8Path::new(name);
    let escapes = path.is_absolute()
        || path.components().any(|component| {
            matches!(
                component,
                Utf8Component::ParentDir | Utf8Component::RootDir | Utf8Component::Prefix(_)
            )
        });
    if escapes {
        return Err(StageError::PathTraversal {
            name: name.to_owned(),
        });
    }
    Ok(())
}
