//! In-memory table of typed cells.

use std::fmt;

use crate::PrepError;

/// Tokens read as a missing value, alongside the empty string.
/// Fields read as missing, compared verbatim. Same set as pandas' default
/// `na_values`.
const MISSING_TOKENS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// One table cell.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Whether a raw field denotes a missing value.
    ///
    /// Fields are not trimmed first: `" NA"` is text, and so is `" "`.
    #[must_use]
    pub fn is_missing_token(raw: &str) -> bool {
        MISSING_TOKENS.contains(&raw)
    }

    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Numeric value of the cell, `None` when missing.
    pub(crate) fn as_number(&self, column: &str, row: usize) -> Result<Option<f64>, PrepError> {
        match self {
            Cell::Number(v) => Ok(Some(*v)),
            Cell::Missing => Ok(None),
            Cell::Text(s) => Err(PrepError::ExpectedNumber {
                column: column.to_string(),
                row,
                value: s.clone(),
            }),
        }
    }

    /// Key used for categorical encoding: text as-is, numbers in shortest form.
    pub(crate) fn category_key(&self) -> Option<String> {
        match self {
            Cell::Text(s) => Some(s.clone()),
            Cell::Number(v) => Some(v.to_string()),
            Cell::Missing => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Missing => f.write_str("NaN"),
        }
    }
}

/// Inferred type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Every non-missing cell parses as a finite float.
    Numeric,
    /// At least one non-missing cell is not a number.
    Text,
}

/// A header plus row-major cells; every row has one cell per column.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Frame {
    /// Build a frame from raw string fields, inferring each column's kind.
    ///
    /// A column is numeric when all of its non-missing fields parse as
    /// finite `f64`; otherwise every non-missing field stays text.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::RowWidthMismatch`] when a row's width differs from the header.
    pub fn from_fields(columns: Vec<String>, raw_rows: Vec<Vec<String>>) -> Result<Self, PrepError> {
        let n_columns = columns.len();
        for (row, fields) in raw_rows.iter().enumerate() {
            if fields.len() != n_columns {
                return Err(PrepError::RowWidthMismatch {
                    row,
                    expected: n_columns,
                    got: fields.len(),
                });
            }
        }

        let numeric: Vec<bool> = (0..n_columns)
            .map(|c| {
                raw_rows.iter().all(|fields| {
                    let raw = &fields[c];
                    // Numbers may carry surrounding spaces; text keeps them.
                    Cell::is_missing_token(raw)
                        || raw.trim().parse::<f64>().is_ok_and(f64::is_finite)
                })
            })
            .collect();

        let rows = raw_rows
            .into_iter()
            .map(|fields| {
                fields
                    .into_iter()
                    .zip(&numeric)
                    .map(|(raw, &is_numeric)| {
                        if Cell::is_missing_token(&raw) {
                            Cell::Missing
                        } else if is_numeric {
                            // Checked above: every non-missing field in this column parses.
                            raw.trim().parse().map_or(Cell::Missing, Cell::Number)
                        } else {
                            Cell::Text(raw)
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(Self { columns, rows })
    }

    /// Build a frame from already-typed rows.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::RowWidthMismatch`] when a row's width differs from the header.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, PrepError> {
        if let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() != columns.len()) {
            return Err(PrepError::RowWidthMismatch {
                row,
                expected: columns.len(),
                got: cells.len(),
            });
        }
        Ok(Self { columns, rows })
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<Cell>> {
        self.rows
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Position of the column called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::MissingColumn`] if there is no such column.
    pub fn column_index(&self, name: &str) -> Result<usize, PrepError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| PrepError::MissingColumn {
                name: name.to_string(),
            })
    }

    /// Inferred kind of column `index`; `None` when out of range.
    #[must_use]
    pub fn column_kind(&self, index: usize) -> Option<ColumnKind> {
        if index >= self.columns.len() {
            return None;
        }
        let is_text = self.rows.iter().any(|r| matches!(r[index], Cell::Text(_)));
        Some(if is_text { ColumnKind::Text } else { ColumnKind::Numeric })
    }

    /// Remove the column `name` and return it as string labels.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`PrepError::MissingColumn`] | No column called `name` |
    /// | [`PrepError::MissingLabel`] | A row has a missing label cell |
    pub fn split_off_label(mut self, name: &str) -> Result<(Frame, Vec<String>), PrepError> {
        let index = self.column_index(name)?;
        self.columns.remove(index);
        let mut labels = Vec::with_capacity(self.rows.len());
        for (row, cells) in self.rows.iter_mut().enumerate() {
            match cells.remove(index) {
                Cell::Missing => return Err(PrepError::MissingLabel { row }),
                cell => labels.push(cell.to_string()),
            }
        }
        Ok((self, labels))
    }

    /// Drop the column `name` if present; a no-op otherwise.
    #[must_use]
    pub fn without_column(mut self, name: &str) -> Frame {
        if let Ok(index) = self.column_index(name) {
            self.columns.remove(index);
            for cells in &mut self.rows {
                cells.remove(index);
            }
        }
        self
    }

    /// Rows restricted to the named columns, in the order given.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::MissingColumn`] for the first name not in the frame.
    pub fn select_columns(&self, names: &[String]) -> Result<Vec<Vec<Cell>>, PrepError> {
        let indices = names
            .iter()
            .map(|n| self.column_index(n))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self
            .rows
            .iter()
            .map(|cells| indices.iter().map(|&i| cells[i].clone()).collect())
            .collect())
    }

    /// Reorder rows so that row `i` of the result is row `order[i]` of `self`.
    pub(crate) fn reorder(&mut self, order: &[usize]) {
        let mut taken: Vec<Option<Vec<Cell>>> = std::mem::take(&mut self.rows).into_iter().map(Some).collect();
        self.rows = order.iter().filter_map(|&i| taken[i].take()).collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn drug_frame() -> Frame {
        Frame::from_fields(
            strings(&["Age", "Sex", "BP", "Na_to_K", "Drug"]),
            vec![
                strings(&["23", "F", "HIGH", "25.355", "DrugY"]),
                strings(&["47", "M", "LOW", "", "drugC"]),
                strings(&["NA", "M", "LOW", "10.114", "drugC"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn infers_numeric_and_text_columns() {
        let frame = drug_frame();
        assert_eq!(frame.column_kind(0), Some(ColumnKind::Numeric));
        assert_eq!(frame.column_kind(1), Some(ColumnKind::Text));
        assert_eq!(frame.column_kind(9), None);
        assert_eq!(frame.rows()[0][0], Cell::Number(23.0));
        assert_eq!(frame.rows()[1][3], Cell::Missing);
        assert_eq!(frame.rows()[2][0], Cell::Missing);
    }

    #[test]
    fn mixed_column_stays_text() {
        let frame = Frame::from_fields(
            strings(&["code"]),
            vec![strings(&["12"]), strings(&["A7"])],
        )
        .unwrap();
        assert_eq!(frame.rows()[0][0], Cell::Text("12".to_string()));
    }

    #[test]
    fn split_off_label_removes_column() {
        let (features, labels) = drug_frame().split_off_label("Drug").unwrap();
        assert_eq!(features.columns(), &["Age", "Sex", "BP", "Na_to_K"]);
        assert_eq!(labels, vec!["DrugY", "drugC", "drugC"]);
        assert!(features.rows().iter().all(|r| r.len() == 4));
    }

    #[test]
    fn missing_label_column_or_cell_rejected() {
        assert!(matches!(
            drug_frame().split_off_label("Outcome"),
            Err(PrepError::MissingColumn { .. })
        ));
        let frame = Frame::from_fields(strings(&["x", "y"]), vec![strings(&["1", ""])]).unwrap();
        assert!(matches!(
            frame.split_off_label("y"),
            Err(PrepError::MissingLabel { row: 0 })
        ));
    }

    #[test]
    fn ragged_rows_rejected() {
        let err = Frame::from_fields(strings(&["a", "b"]), vec![strings(&["1"])]).unwrap_err();
        assert!(matches!(err, PrepError::RowWidthMismatch { row: 0, expected: 2, got: 1 }));
    }

    #[test]
    fn select_columns_by_name() {
        let rows = drug_frame()
            .select_columns(&strings(&["Drug", "Age"]))
            .unwrap();
        assert_eq!(rows[0], vec![Cell::Text("DrugY".to_string()), Cell::Number(23.0)]);
        assert!(matches!(
            drug_frame().select_columns(&strings(&["Weight"])),
            Err(PrepError::MissingColumn { .. })
        ));
    }

    #[test]
    fn reorder_permutes_rows() {
        let mut frame = drug_frame();
        frame.reorder(&[2, 0, 1]);
        assert_eq!(frame.rows()[0][4], Cell::Text("drugC".to_string()));
        assert_eq!(frame.rows()[1][4], Cell::Text("DrugY".to_string()));
    }

    #[test]
    fn missing_tokens_match_verbatim() {
        for token in ["", "#N/A", "NULL", "None", "n/a", "<NA>", "-NaN", "1.#QNAN", "nan"] {
            assert!(Cell::is_missing_token(token), "{token:?}");
        }
        for field in [" ", " NA", "NA ", "none", "Null", "missing"] {
            assert!(!Cell::is_missing_token(field), "{field:?}");
        }
    }

    #[test]
    fn padded_fields_keep_spaces_unless_numeric() {
        let frame = Frame::from_fields(
            strings(&["Age", "Sex"]),
            vec![strings(&[" 23", "F "]), strings(&["#N/A", " NA"])],
        )
        .unwrap();
        assert_eq!(frame.column_kind(0), Some(ColumnKind::Numeric));
        assert_eq!(frame.rows()[0][0], Cell::Number(23.0));
        assert_eq!(frame.rows()[1][0], Cell::Missing);
        assert_eq!(frame.rows()[0][1], Cell::Text("F ".to_string()));
        assert_eq!(frame.rows()[1][1], Cell::Text(" NA".to_string()));
    }
}
