//! Headered CSV loader producing a typed [`Frame`].

use std::path::{Path, PathBuf};

use rxforest_prep::{ColumnKind, Frame};
use tracing::{debug, info, instrument};

use crate::IoError;

/// Reads a tabular dataset from a CSV file.
///
/// Expected CSV format:
/// - Header row required, one name per column
/// - One record per row, all rows with the header's column count
/// - Fields are taken verbatim, without trimming, as pandas' `read_csv` does
/// - Empty fields and pandas' default NA tokens (`NA`, `N/A`, `n/a`, `#N/A`,
///   `NULL`, `null`, `None`, `NaN`, `nan`, `-NaN`, `<NA>` and a few more) are
///   missing values
///
/// Column kinds are inferred: numeric when every non-missing field parses
/// as a finite float, text otherwise.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoColumns`] | Header has no fields |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
pub struct CsvLoader {
    path: PathBuf,
}

impl CsvLoader {
    /// Create a new loader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`Frame`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Frame, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        // flexible(true) lets our own InconsistentRowLength check fire
        // instead of a low-level CsvParse error.
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.parse_error(e))?;
        let columns: Vec<String> = header.iter().map(str::to_string).collect();
        if columns.is_empty() || columns.iter().all(String::is_empty) {
            return Err(IoError::NoColumns {
                path: self.path.clone(),
            });
        }
        let expected = columns.len();
        debug!(expected, "read CSV header");

        let mut raw_rows = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.parse_error(e))?;
            if record.len() != expected {
                return Err(IoError::InconsistentRowLength {
                    path: self.path.clone(),
                    row_index,
                    expected,
                    got: record.len(),
                });
            }
            raw_rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        if raw_rows.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let frame = Frame::from_fields(columns, raw_rows).map_err(|e| IoError::Frame {
            path: self.path.clone(),
            source: e,
        })?;

        let n_numeric = (0..frame.n_columns())
            .filter(|&c| frame.column_kind(c) == Some(ColumnKind::Numeric))
            .count();
        info!(
            n_rows = frame.n_rows(),
            n_columns = frame.n_columns(),
            n_numeric,
            "dataset loaded"
        );

        Ok(frame)
    }

    fn parse_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rxforest_prep::Cell;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_drug_records() {
        let csv = "Age,Sex,BP,Cholesterol,Na_to_K,Drug\n23,F,HIGH,HIGH,25.355,DrugY\n47,M,LOW,HIGH,13.093,drugC\n";
        let f = write_csv(csv);
        let frame = CsvLoader::new(f.path()).read().unwrap();
        assert_eq!(frame.n_rows(), 2);
        assert_eq!(frame.columns()[5], "Drug");
        assert_eq!(frame.column_kind(0), Some(ColumnKind::Numeric));
        assert_eq!(frame.column_kind(2), Some(ColumnKind::Text));
        assert_eq!(frame.rows()[1][4], Cell::Number(13.093));
    }

    #[test]
    fn missing_tokens_become_missing_cells() {
        let csv = "Age,Sex\nNA,F\n,M\n31,null\n";
        let f = write_csv(csv);
        let frame = CsvLoader::new(f.path()).read().unwrap();
        assert_eq!(frame.rows()[0][0], Cell::Missing);
        assert_eq!(frame.rows()[1][0], Cell::Missing);
        assert_eq!(frame.rows()[2][1], Cell::Missing);
        assert_eq!(frame.column_kind(0), Some(ColumnKind::Numeric));
    }

    #[test]
    fn fields_are_not_trimmed() {
        let csv = "Age,Sex,BP\n 23 ,F , HIGH\n41,None,#N/A\n";
        let f = write_csv(csv);
        let frame = CsvLoader::new(f.path()).read().unwrap();
        assert_eq!(frame.rows()[0][0], Cell::Number(23.0));
        assert_eq!(frame.rows()[0][1], Cell::Text("F ".to_string()));
        assert_eq!(frame.rows()[0][2], Cell::Text(" HIGH".to_string()));
        assert_eq!(frame.rows()[1][1], Cell::Missing);
        assert_eq!(frame.rows()[1][2], Cell::Missing);
    }

    #[test]
    fn insertion_order_preserved() {
        let csv = "id\nZZZ\nAAA\nMMM\n";
        let f = write_csv(csv);
        let frame = CsvLoader::new(f.path()).read().unwrap();
        let ids: Vec<String> = frame.rows().iter().map(|r| r[0].to_string()).collect();
        assert_eq!(ids, vec!["ZZZ", "AAA", "MMM"]);
    }

    #[test]
    fn error_file_not_found() {
        let result = CsvLoader::new(Path::new("/nonexistent/drug200.csv")).read();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn error_empty_dataset() {
        let f = write_csv("Age,Sex,Drug\n");
        let result = CsvLoader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::EmptyDataset { .. })));
    }

    #[test]
    fn error_no_columns() {
        let f = write_csv("");
        let result = CsvLoader::new(f.path()).read();
        assert!(matches!(result, Err(IoError::NoColumns { .. })));
    }

    #[test]
    fn error_inconsistent_row_length() {
        let f = write_csv("Age,Sex,Drug\n23,F,DrugY\n47,M\n");
        let result = CsvLoader::new(f.path()).read();
        assert!(matches!(
            result,
            Err(IoError::InconsistentRowLength { row_index: 1, expected: 3, got: 2, .. })
        ));
    }
}
