//! Error types for rxforest-pipeline.

use std::path::PathBuf;

use rxforest_io::IoError;
use rxforest_prep::PrepError;
use rxforest_rf::RfError;

/// Errors from fitting, evaluating, persisting, and running the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Wraps a preprocessing error.
    #[error("preprocessing error: {0}")]
    Prep(#[from] PrepError),

    /// Wraps a random forest error.
    #[error("random forest error: {0}")]
    Rf(#[from] RfError),

    /// Wraps a file I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Returned when a required output directory does not exist.
    #[error("output directory {path} does not exist")]
    OutputDirMissing {
        /// The missing directory.
        path: PathBuf,
    },

    /// Returned when the artifact file cannot be read.
    #[error("cannot read pipeline artifact {path}")]
    ReadArtifact {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the artifact file cannot be written.
    #[error("cannot write pipeline artifact {path}")]
    WriteArtifact {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when bincode encoding fails.
    #[error("cannot encode pipeline")]
    SerializeArtifact {
        /// Underlying bincode error.
        source: bincode::Error,
    },

    /// Returned when the file does not carry the artifact tag.
    #[error("{path} is not a pipeline artifact written by this tool; refusing to load")]
    UntrustedArtifact {
        /// Path to the rejected file.
        path: PathBuf,
    },

    /// Returned when bincode decoding fails.
    #[error("cannot decode pipeline artifact {path}")]
    DeserializeArtifact {
        /// Path to the artifact.
        path: PathBuf,
        /// Underlying bincode error.
        source: bincode::Error,
    },

    /// Returned when the artifact's format version is not the supported one.
    #[error("pipeline artifact {path} has format version {found}, expected {expected}")]
    IncompatibleArtifactVersion {
        /// Path to the artifact.
        path: PathBuf,
        /// Supported version.
        expected: u32,
        /// Version found in the file.
        found: u32,
    },

    /// Returned when a decoded pipeline fails its integrity check.
    #[error("pipeline artifact {path} is corrupt: {reason}")]
    CorruptArtifact {
        /// Path to the artifact.
        path: PathBuf,
        /// The broken invariant.
        reason: String,
    },

    /// Returned when a reloaded pipeline predicts differently from the one saved.
    #[error("reloaded pipeline disagrees on {n_mismatched} of {n_rows} rows (first at row {first_row})")]
    RoundTripMismatch {
        /// Rows compared.
        n_rows: usize,
        /// Rows whose predictions differ.
        n_mismatched: usize,
        /// First differing row.
        first_row: usize,
    },
}
