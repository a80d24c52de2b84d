//! Plain-text metrics report.

use std::fs;
use std::path::Path;

use tracing::{info, instrument};

use crate::IoError;

/// Writes the accuracy / macro-F1 report.
///
/// The file holds a leading newline followed by
/// `Accuracy = <a>, F1 Score = <f>.`, each score rounded to two decimals.
/// Existing content is replaced.
pub struct MetricsWriter;

impl MetricsWriter {
    /// Write the report to `path`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::OutputDirMissing`] | The parent directory of `path` does not exist |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn write(path: &Path, accuracy: f64, f1: f64) -> Result<(), IoError> {
        ensure_parent_exists(path)?;
        let report = Self::render(accuracy, f1);
        fs::write(path, &report).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        info!(accuracy, f1, "metrics written");
        Ok(())
    }

    /// The exact report text for the given scores.
    #[must_use]
    pub fn render(accuracy: f64, f1: f64) -> String {
        format!(
            "\nAccuracy = {}, F1 Score = {}.",
            format_score(accuracy),
            format_score(f1)
        )
    }
}

/// Round to two decimals, ties to even, and print in shortest form with at
/// least one fractional digit (`1.0`, `0.9`, `0.98`).
#[must_use]
pub fn format_score(value: f64) -> String {
    let rounded = (value * 100.0).round_ties_even() / 100.0;
    let text = rounded.to_string();
    if text.contains('.') || !rounded.is_finite() {
        text
    } else {
        format!("{text}.0")
    }
}

/// Fail with [`IoError::OutputDirMissing`] unless the parent of `path` is an existing directory.
pub(crate) fn ensure_parent_exists(path: &Path) -> Result<(), IoError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return Ok(()),
    };
    if parent.is_dir() {
        Ok(())
    } else {
        Err(IoError::OutputDirMissing {
            path: parent.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn score_formatting() {
        assert_eq!(format_score(0.983_333), "0.98");
        assert_eq!(format_score(1.0), "1.0");
        assert_eq!(format_score(0.9), "0.9");
        assert_eq!(format_score(0.0), "0.0");
        assert_eq!(format_score(0.8999), "0.9");
        // Exact tie rounds to the even neighbour.
        assert_eq!(format_score(0.125), "0.12");
    }

    #[test]
    fn report_text_matches_format() {
        assert_eq!(
            MetricsWriter::render(0.9833, 0.9712),
            "\nAccuracy = 0.98, F1 Score = 0.97."
        );
    }

    #[test]
    fn write_overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("metrics.txt");
        fs::write(&path, "old content that is longer than the report").unwrap();
        MetricsWriter::write(&path, 1.0, 0.5).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "\nAccuracy = 1.0, F1 Score = 0.5."
        );
    }

    #[test]
    fn missing_directory_is_not_created() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Results").join("metrics.txt");
        let err = MetricsWriter::write(&path, 0.5, 0.5).unwrap_err();
        assert!(matches!(err, IoError::OutputDirMissing { .. }));
        assert!(!dir.path().join("Results").exists());
    }
}
