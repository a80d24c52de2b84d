//! Standard scaling of numeric columns.

use serde::{Deserialize, Serialize};

use crate::PrepError;
use crate::frame::Cell;
use crate::impute::observed_values;

/// Scales below this are treated as zero and replaced by 1.
const ZERO_SCALE: f64 = 10.0 * f64::EPSILON;

/// Centers each column on its training mean and divides by its training
/// population standard deviation.
///
/// Fit ignores missing cells; missing cells transform to `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    columns: Vec<usize>,
    names: Vec<String>,
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    /// Learn per-column mean and standard deviation (`ddof = 0`).
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`PrepError::ExpectedNumber`] | A selected cell holds text |
    /// | [`PrepError::AllMissing`] | A column has no training values |
    pub fn fit(rows: &[Vec<Cell>], columns: &[usize], names: &[String]) -> Result<Self, PrepError> {
        let mut means = Vec::with_capacity(columns.len());
        let mut scales = Vec::with_capacity(columns.len());
        for (&col, name) in columns.iter().zip(names) {
            let values = observed_values(rows, col, name)?;
            if values.is_empty() {
                return Err(PrepError::AllMissing {
                    column: name.clone(),
                });
            }
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();
            means.push(mean);
            scales.push(if std < ZERO_SCALE { 1.0 } else { std });
        }
        Ok(Self {
            columns: columns.to_vec(),
            names: names.to_vec(),
            means,
            scales,
        })
    }

    /// Scale one row's selected columns.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::ExpectedNumber`] when a selected cell holds text.
    pub fn transform_row(&self, cells: &[Cell], row: usize) -> Result<Vec<f64>, PrepError> {
        self.columns
            .iter()
            .zip(&self.names)
            .zip(self.means.iter().zip(&self.scales))
            .map(|((&col, name), (&mean, &scale))| {
                Ok(cells[col]
                    .as_number(name, row)?
                    .map_or(f64::NAN, |v| (v - mean) / scale))
            })
            .collect()
    }

    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    #[must_use]
    pub fn scales(&self) -> &[f64] {
        &self.scales
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

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[Option<f64>]) -> Vec<Vec<Cell>> {
        values
            .iter()
            .map(|v| vec![v.map_or(Cell::Missing, Cell::Number)])
            .collect()
    }

    fn names() -> Vec<String> {
        vec!["Na_to_K".to_string()]
    }

    #[test]
    fn population_std_is_used() {
        let scaler = StandardScaler::fit(&column(&[Some(2.0), Some(4.0), Some(6.0), Some(8.0)]), &[0], &names()).unwrap();
        assert!((scaler.means()[0] - 5.0).abs() < 1e-12);
        assert!((scaler.scales()[0] - 5.0f64.sqrt()).abs() < 1e-12);
        let out = scaler.transform_row(&[Cell::Number(5.0)], 0).unwrap();
        assert!(out[0].abs() < 1e-12);
    }

    #[test]
    fn constant_column_scales_by_one() {
        let scaler = StandardScaler::fit(&column(&[Some(3.0), Some(3.0)]), &[0], &names()).unwrap();
        assert_eq!(scaler.scales(), &[1.0]);
        assert_eq!(scaler.transform_row(&[Cell::Number(4.0)], 0).unwrap(), vec![1.0]);
    }

    #[test]
    fn missing_values_ignored_in_fit_and_pass_through_as_nan() {
        let scaler = StandardScaler::fit(&column(&[Some(1.0), None, Some(3.0)]), &[0], &names()).unwrap();
        assert!((scaler.means()[0] - 2.0).abs() < 1e-12);
        assert!(scaler.transform_row(&[Cell::Missing], 0).unwrap()[0].is_nan());
    }
}
