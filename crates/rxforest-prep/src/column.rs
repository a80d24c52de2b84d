//! Column-wise composition of the encoder, imputer and scaler.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::PrepError;
use crate::encoder::{OrdinalEncoder, UnknownCategoryPolicy};
use crate::frame::Cell;
use crate::impute::MedianImputer;
use crate::scale::StandardScaler;

const ENCODER_STEP: &str = "encoder";
const IMPUTER_STEP: &str = "num_imputer";
const SCALER_STEP: &str = "num_scaler";

/// Which raw columns feed which step.
///
/// # Defaults
///
/// | Parameter        | Default  |
/// |------------------|----------|
/// | `unknown_policy` | `Error`  |
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTransformerConfig {
    categorical: Vec<usize>,
    numeric: Vec<usize>,
    unknown_policy: UnknownCategoryPolicy,
}

impl ColumnTransformerConfig {
    /// `categorical` columns are ordinal-encoded; `numeric` columns are
    /// both median-imputed and standard-scaled.
    #[must_use]
    pub fn new(categorical: Vec<usize>, numeric: Vec<usize>) -> Self {
        Self {
            categorical,
            numeric,
            unknown_policy: UnknownCategoryPolicy::Error,
        }
    }

    #[must_use]
    pub fn with_unknown_policy(mut self, policy: UnknownCategoryPolicy) -> Self {
        self.unknown_policy = policy;
        self
    }

    #[must_use]
    pub fn categorical(&self) -> &[usize] {
        &self.categorical
    }

    #[must_use]
    pub fn numeric(&self) -> &[usize] {
        &self.numeric
    }

    /// Fit all three steps on the training rows.
    ///
    /// `column_names` names the raw input columns in order.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`PrepError::EmptyInput`] | `rows` is empty |
    /// | [`PrepError::ColumnOutOfRange`] | A selected column index `>= column_names.len()` |
    /// | [`PrepError::RowWidthMismatch`] | A row's width differs from `column_names.len()` |
    /// | others | Propagated from the encoder, imputer and scaler fits |
    #[instrument(skip_all, fields(n_rows = rows.len(), n_columns = column_names.len()))]
    pub fn fit(
        &self,
        rows: &[Vec<Cell>],
        column_names: &[String],
    ) -> Result<ColumnTransformer, PrepError> {
        if rows.is_empty() {
            return Err(PrepError::EmptyInput);
        }
        let n_inputs = column_names.len();
        if let Some(&column) = self
            .categorical
            .iter()
            .chain(&self.numeric)
            .find(|&&c| c >= n_inputs)
        {
            return Err(PrepError::ColumnOutOfRange {
                column,
                n_columns: n_inputs,
            });
        }
        check_widths(rows, n_inputs)?;

        let pick = |cols: &[usize]| -> Vec<String> {
            cols.iter().map(|&c| column_names[c].clone()).collect()
        };
        let categorical_names = pick(&self.categorical);
        let numeric_names = pick(&self.numeric);

        let encoder =
            OrdinalEncoder::fit(rows, &self.categorical, &categorical_names, self.unknown_policy)?;
        let imputer = MedianImputer::fit(rows, &self.numeric, &numeric_names)?;
        let scaler = StandardScaler::fit(rows, &self.numeric, &numeric_names)?;

        debug!(
            categories = ?encoder.categories(),
            medians = ?imputer.medians(),
            means = ?scaler.means(),
            "fitted column transformer"
        );

        Ok(ColumnTransformer {
            input_names: column_names.to_vec(),
            encoder,
            imputer,
            scaler,
        })
    }
}

/// A fitted encoder, imputer and scaler applied side by side.
///
/// Each step reads the raw input columns it was configured with; outputs
/// are concatenated as encoder, then imputer, then scaler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTransformer {
    input_names: Vec<String>,
    encoder: OrdinalEncoder,
    imputer: MedianImputer,
    scaler: StandardScaler,
}

impl ColumnTransformer {
    /// Transform raw rows into numeric feature rows.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`PrepError::RowWidthMismatch`] | A row's width differs from the fitted input width |
    /// | [`PrepError::UnknownCategory`] | Unseen category under the `Error` policy |
    /// | [`PrepError::MissingCategory`] | A categorical cell is missing |
    /// | [`PrepError::ExpectedNumber`] | A numeric cell holds text |
    pub fn transform(&self, rows: &[Vec<Cell>]) -> Result<Vec<Vec<f64>>, PrepError> {
        check_widths(rows, self.n_inputs())?;
        rows.iter()
            .enumerate()
            .map(|(row, cells)| {
                let mut out = Vec::with_capacity(self.n_outputs());
                out.extend(self.encoder.transform_row(cells, row)?);
                out.extend(self.imputer.transform_row(cells, row)?);
                out.extend(self.scaler.transform_row(cells, row)?);
                Ok(out)
            })
            .collect()
    }

    /// Output feature names, `step__column`.
    #[must_use]
    pub fn output_names(&self) -> Vec<String> {
        let prefixed = |step: &str, names: &[String]| {
            names
                .iter()
                .map(|n| format!("{step}__{n}"))
                .collect::<Vec<_>>()
        };
        let mut names = prefixed(ENCODER_STEP, self.encoder.names());
        names.extend(prefixed(IMPUTER_STEP, self.imputer.names()));
        names.extend(prefixed(SCALER_STEP, self.scaler.names()));
        names
    }

    #[must_use]
    pub fn n_outputs(&self) -> usize {
        self.encoder.columns().len() + self.imputer.columns().len() + self.scaler.columns().len()
    }

    #[must_use]
    pub fn n_inputs(&self) -> usize {
        self.input_names.len()
    }

    /// Names of the raw input columns, in the order rows must present them.
    #[must_use]
    pub fn input_names(&self) -> &[String] {
        &self.input_names
    }

    #[must_use]
    pub fn encoder(&self) -> &OrdinalEncoder {
        &self.encoder
    }

    #[must_use]
    pub fn imputer(&self) -> &MedianImputer {
        &self.imputer
    }

    #[must_use]
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Check that a transformer obtained from outside (e.g. deserialized)
    /// is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns a description of the first broken invariant.
    pub fn check_integrity(&self) -> Result<(), String> {
        let steps: [(&str, &[usize], &[String], usize); 3] = [
            (
                ENCODER_STEP,
                self.encoder.columns(),
                self.encoder.names(),
                self.encoder.categories().len(),
            ),
            (
                IMPUTER_STEP,
                self.imputer.columns(),
                self.imputer.names(),
                self.imputer.medians().len(),
            ),
            (
                SCALER_STEP,
                self.scaler.columns(),
                self.scaler.names(),
                self.scaler.means().len().min(self.scaler.scales().len()),
            ),
        ];
        for (step, columns, names, n_params) in steps {
            if names.len() != columns.len() || n_params != columns.len() {
                return Err(format!(
                    "{step}: {} columns, {} names, {n_params} fitted parameters",
                    columns.len(),
                    names.len()
                ));
            }
            if let Some(&c) = columns.iter().find(|&&c| c >= self.n_inputs()) {
                return Err(format!("{step}: column {c} out of range for {} inputs", self.n_inputs()));
            }
            if columns.iter().zip(names).any(|(&c, name)| &self.input_names[c] != name) {
                return Err(format!("{step}: column names disagree with the input header"));
            }
        }
        if self.encoder.categories().iter().any(|cats| {
            cats.is_empty() || cats.windows(2).any(|w| w[0] >= w[1])
        }) {
            return Err("encoder: categories must be non-empty, sorted and unique".to_string());
        }
        if self.scaler.scales().iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err("scaler: scales must be finite and positive".to_string());
        }
        Ok(())
    }
}

fn check_widths(rows: &[Vec<Cell>], expected: usize) -> Result<(), PrepError> {
    match rows.iter().enumerate().find(|(_, r)| r.len() != expected) {
        Some((row, cells)) => Err(PrepError::RowWidthMismatch {
            row,
            expected,
            got: cells.len(),
        }),
        None => Ok(()),
    }
}
