//! I/O error types for rxforest-io.

use std::path::PathBuf;

use rxforest_prep::PrepError;

/// Errors from CSV loading, report writing, and image rendering.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Returned when the input file does not exist or is unreadable.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the CSV parser encounters a malformed record.
    #[error("CSV parse error in {path} at byte offset {offset}")]
    CsvParse {
        /// Path to the CSV file.
        path: PathBuf,
        /// Byte offset where the error occurred.
        offset: u64,
        /// Underlying CSV error.
        source: csv::Error,
    },

    /// Returned when the header has no columns.
    #[error("no columns in header of {path}")]
    NoColumns {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when the CSV file contains a header but zero data rows.
    #[error("empty dataset (no data rows) in {path}")]
    EmptyDataset {
        /// Path to the CSV file.
        path: PathBuf,
    },

    /// Returned when a data row has a different number of columns than the header.
    #[error("inconsistent row length in {path}: row {row_index} has {got} columns, expected {expected}")]
    InconsistentRowLength {
        /// Path to the CSV file.
        path: PathBuf,
        /// Zero-based row index (excluding header).
        row_index: usize,
        /// Expected number of columns (from header).
        expected: usize,
        /// Actual number of columns in this row.
        got: usize,
    },

    /// Returned when the loaded rows cannot form a frame.
    #[error("cannot build a frame from {path}")]
    Frame {
        /// Path to the CSV file.
        path: PathBuf,
        /// Underlying frame error.
        source: PrepError,
    },

    /// Returned when an output file's parent directory does not exist.
    #[error("output directory {path} does not exist")]
    OutputDirMissing {
        /// The missing directory.
        path: PathBuf,
    },

    /// Returned when a result file cannot be written.
    #[error("cannot write file {path}")]
    WriteFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when the plotting backend fails.
    #[error("cannot render {path}: {message}")]
    Render {
        /// Target image path.
        path: PathBuf,
        /// Backend error message.
        message: String,
    },

    /// Returned when asked to plot a matrix with no classes.
    #[error("confusion matrix is empty")]
    EmptyMatrix,

    /// Returned when the class names do not match the matrix shape.
    #[error("{n_labels} class labels for a {n_rows}x{n_columns} matrix")]
    LabelCountMismatch {
        /// Number of matrix rows.
        n_rows: usize,
        /// Length of the shortest or longest row, whichever differs.
        n_columns: usize,
        /// Number of class labels.
        n_labels: usize,
    },
}
