//! Median imputation of numeric columns.

use serde::{Deserialize, Serialize};

use crate::PrepError;
use crate::frame::Cell;

/// Replaces missing numeric cells with the training median of their column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianImputer {
    columns: Vec<usize>,
    names: Vec<String>,
    medians: Vec<f64>,
}

impl MedianImputer {
    /// Learn the median of the non-missing training values of each column.
    ///
    /// An even count averages the two middle values.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`PrepError::ExpectedNumber`] | A selected cell holds text |
    /// | [`PrepError::AllMissing`] | A column has no training values |
    pub fn fit(rows: &[Vec<Cell>], columns: &[usize], names: &[String]) -> Result<Self, PrepError> {
        let mut medians = Vec::with_capacity(columns.len());
        for (&col, name) in columns.iter().zip(names) {
            let mut values = observed_values(rows, col, name)?;
            if values.is_empty() {
                return Err(PrepError::AllMissing {
                    column: name.clone(),
                });
            }
            values.sort_by(f64::total_cmp);
            medians.push(median_of_sorted(&values));
        }
        Ok(Self {
            columns: columns.to_vec(),
            names: names.to_vec(),
            medians,
        })
    }

    /// Impute one row's selected columns.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::ExpectedNumber`] when a selected cell holds text.
    pub fn transform_row(&self, cells: &[Cell], row: usize) -> Result<Vec<f64>, PrepError> {
        self.columns
            .iter()
            .zip(&self.names)
            .zip(&self.medians)
            .map(|((&col, name), &median)| {
                Ok(cells[col].as_number(name, row)?.unwrap_or(median))
            })
            .collect()
    }

    #[must_use]
    pub fn medians(&self) -> &[f64] {
        &self.medians
    }

    #[must_use]
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Non-missing values of column `col`.
pub(crate) fn observed_values(
    rows: &[Vec<Cell>],
    col: usize,
    name: &str,
) -> Result<Vec<f64>, PrepError> {
    let mut values = Vec::with_capacity(rows.len());
    for (row, cells) in rows.iter().enumerate() {
        if let Some(v) = cells[col].as_number(name, row)? {
            values.push(v);
        }
    }
    Ok(values)
}

fn median_of_sorted(values: &[f64]) -> f64 {
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
