//! Fatal error types for the plugin list validator.
//!
//! Almost every failure the validator sees is accumulated as a
//! [`ValidationError`](crate::report::ValidationError) and the run carries on.
//! The variants here are the exceptions: conditions under which no plugin can
//! be processed at all, so the run stops immediately.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that abort a validation run.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// The bitness argument was not one of the supported targets.
    #[error("unsupported bitness \"{value}\"; expected one of: x64, x86")]
    UnsupportedBitness {
        /// The rejected argument.
        value: String,
    },

    /// The layout configuration file could not be read.
    #[error("failed to read configuration {path}: {source}")]
    ConfigUnreadable {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The layout configuration file is not valid TOML or has unknown keys.
    #[error("invalid configuration {path}: {reason}")]
    InvalidConfig {
        /// Path of the configuration file.
        path: Utf8PathBuf,
        /// Description of the parse error.
        reason: String,
    },

    /// The output directory could not be created or is not writable.
    #[error("output directory {path} is not usable: {reason}")]
    OutputDirectory {
        /// Path to the output directory.
        path: Utf8PathBuf,
        /// Description of the underlying I/O error.
        reason: String,
    },
}

/// Result type alias using [`ValidatorError`].
pub type Result<T> = std::result::Result<T, ValidatorError>;
