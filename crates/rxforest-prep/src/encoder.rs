//! Ordinal encoding of categorical columns.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::PrepError;
use crate::frame::Cell;

/// What to do with a category that was not seen during fit.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum UnknownCategoryPolicy {
    /// Fail with [`PrepError::UnknownCategory`].
    #[default]
    Error,
    /// Emit the given code instead.
    UseEncodedValue(f64),
}

/// Maps each category of a column to its position among the sorted
/// training categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrdinalEncoder {
    columns: Vec<usize>,
    names: Vec<String>,
    categories: Vec<Vec<String>>,
    policy: UnknownCategoryPolicy,
}

impl OrdinalEncoder {
    /// Learn the sorted category list of every selected column.
    ///
    /// `names[i]` labels `columns[i]` in error messages and output names.
    ///
    /// # Errors
    ///
    /// Returns [`PrepError::MissingCategory`] for a missing training cell.
    pub fn fit(
        rows: &[Vec<Cell>],
        columns: &[usize],
        names: &[String],
        policy: UnknownCategoryPolicy,
    ) -> Result<Self, PrepError> {
        let mut categories = Vec::with_capacity(columns.len());
        for (&col, name) in columns.iter().zip(names) {
            let mut seen = BTreeSet::new();
            for (row, cells) in rows.iter().enumerate() {
                let key = cells[col]
                    .category_key()
                    .ok_or_else(|| PrepError::MissingCategory {
                        column: name.clone(),
                        row,
                    })?;
                seen.insert(key);
            }
            categories.push(seen.into_iter().collect());
        }
        Ok(Self {
            columns: columns.to_vec(),
            names: names.to_vec(),
            categories,
            policy,
        })
    }

    /// Encode one row's selected columns; `row` is used in error messages.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`PrepError::MissingCategory`] | A selected cell is missing |
    /// | [`PrepError::UnknownCategory`] | Unseen category under [`UnknownCategoryPolicy::Error`] |
    pub fn transform_row(&self, cells: &[Cell], row: usize) -> Result<Vec<f64>, PrepError> {
        self.columns
            .iter()
            .zip(&self.names)
            .zip(&self.categories)
            .map(|((&col, name), known)| {
                let key = cells[col]
                    .category_key()
                    .ok_or_else(|| PrepError::MissingCategory {
                        column: name.clone(),
                        row,
                    })?;
                match (known.binary_search(&key), self.policy) {
                    (Ok(code), _) => Ok(code as f64),
                    (Err(_), UnknownCategoryPolicy::UseEncodedValue(code)) => Ok(code),
                    (Err(_), UnknownCategoryPolicy::Error) => Err(PrepError::UnknownCategory {
                        column: name.clone(),
                        value: key,
                    }),
                }
            })
            .collect()
    }

    /// Sorted categories per selected column.
    #[must_use]
    pub fn categories(&self) -> &[Vec<String>] {
        &self.categories
    }

    #[must_use]
    pub fn columns(&self) -> &[usize] {
        &self.columns
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    #[must_use]
    pub fn policy(&self) -> UnknownCategoryPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    fn bp_rows() -> Vec<Vec<Cell>> {
        vec![vec![text("LOW")], vec![text("HIGH")], vec![text("NORMAL")], vec![text("HIGH")]]
    }

    fn names() -> Vec<String> {
        vec!["BP".to_string()]
    }

    #[test]
    fn categories_are_sorted() {
        let enc = OrdinalEncoder::fit(&bp_rows(), &[0], &names(), UnknownCategoryPolicy::Error).unwrap();
        assert_eq!(enc.categories()[0], vec!["HIGH", "LOW", "NORMAL"]);
        assert_eq!(enc.transform_row(&[text("LOW")], 0).unwrap(), vec![1.0]);
        assert_eq!(enc.transform_row(&[text("NORMAL")], 0).unwrap(), vec![2.0]);
    }

    #[test]
    fn unknown_category_errors_by_default() {
        let enc = OrdinalEncoder::fit(&bp_rows(), &[0], &names(), UnknownCategoryPolicy::default()).unwrap();
        let err = enc.transform_row(&[text("VERY HIGH")], 3).unwrap_err();
        assert!(matches!(
            err,
            PrepError::UnknownCategory { ref column, ref value } if column == "BP" && value == "VERY HIGH"
        ));
    }

    #[test]
    fn unknown_category_can_map_to_code() {
        let enc = OrdinalEncoder::fit(
            &bp_rows(),
            &[0],
            &names(),
            UnknownCategoryPolicy::UseEncodedValue(-1.0),
        )
        .unwrap();
        assert_eq!(enc.transform_row(&[text("VERY HIGH")], 0).unwrap(), vec![-1.0]);
    }

    #[test]
    fn missing_category_rejected() {
        let mut rows = bp_rows();
        rows.push(vec![Cell::Missing]);
        assert!(matches!(
            OrdinalEncoder::fit(&rows, &[0], &names(), UnknownCategoryPolicy::Error),
            Err(PrepError::MissingCategory { row: 4, .. })
        ));
    }
}
