/// Errors from frame handling, splitting, and preprocessing transformers.
#[derive(Debug, thiserror::Error)]
pub enum PrepError {
    /// Returned when a named column is not in the frame.
    #[error("column \"{name}\" not found")]
    MissingColumn {
        /// The requested column name.
        name: String,
    },

    /// Returned when a row has no value in the label column.
    #[error("row {row} has no label")]
    MissingLabel {
        /// Zero-based row index.
        row: usize,
    },

    /// Returned when there are no rows to operate on.
    #[error("no rows to process")]
    EmptyInput,

    /// Returned when the test fraction is not strictly between 0 and 1.
    #[error("test fraction must be in (0, 1), got {fraction}")]
    InvalidTestFraction {
        /// The invalid fraction.
        fraction: f64,
    },

    /// Returned when a split would leave the train or the test side empty.
    #[error("splitting {n_rows} rows gives {n_train} train / {n_test} test rows; both must be non-empty")]
    SplitTooSmall {
        /// Total number of rows.
        n_rows: usize,
        /// Resulting train rows.
        n_train: usize,
        /// Resulting test rows.
        n_test: usize,
    },

    /// Returned when a column selection points past the row width.
    #[error("column index {column} is out of range for {n_columns} columns")]
    ColumnOutOfRange {
        /// The offending column index.
        column: usize,
        /// Number of input columns.
        n_columns: usize,
    },

    /// Returned when a row has a different width than the data the transformer was fit on.
    #[error("row {row} has {got} columns, expected {expected}")]
    RowWidthMismatch {
        /// Zero-based row index.
        row: usize,
        /// Expected number of columns.
        expected: usize,
        /// Actual number of columns.
        got: usize,
    },

    /// Returned when a numeric column holds text.
    #[error("column \"{column}\" row {row}: expected a number, got \"{value}\"")]
    ExpectedNumber {
        /// Column name.
        column: String,
        /// Zero-based row index.
        row: usize,
        /// The offending text.
        value: String,
    },

    /// Returned when a categorical column has a missing cell.
    #[error("column \"{column}\" row {row}: missing category")]
    MissingCategory {
        /// Column name.
        column: String,
        /// Zero-based row index.
        row: usize,
    },

    /// Returned when a category was not seen during fit and the policy is to fail.
    #[error("column \"{column}\": unknown category \"{value}\"")]
    UnknownCategory {
        /// Column name.
        column: String,
        /// The unseen category.
        value: String,
    },

    /// Returned when a numeric column has no observed training values.
    #[error("column \"{column}\" has no non-missing training values")]
    AllMissing {
        /// Column name.
        column: String,
    },

    /// Returned when a label was not seen during fit.
    #[error("unknown label \"{label}\"")]
    UnknownLabel {
        /// The unseen label.
        label: String,
    },
}
