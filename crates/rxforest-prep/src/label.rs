//! String class labels to dense indices and back.

use serde::{Deserialize, Serialize};

use crate::PrepError;

/// Sorted unique training labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    /// # Errors
    ///
    /// Returns [`PrepError::EmptyInput`] when `labels` is empty.
    pub fn fit(labels: &[String]) -> Result<Self, PrepError> {
        if labels.is_empty() {
            return Err(PrepError::EmptyInput);
        }
        let mut classes = labels.to_vec();
        classes.sort();
        classes.dedup();
        Ok(Self { classes })
    }

    /// # Errors
    ///
    /// Returns [`PrepError::UnknownLabel`] for a label not seen during fit.
    pub fn encode(&self, label: &str) -> Result<usize, PrepError> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .map_err(|_| PrepError::UnknownLabel {
                label: label.to_string(),
            })
    }

    /// # Errors
    ///
    /// Returns [`PrepError::UnknownLabel`] for the first unseen label.
    pub fn encode_all(&self, labels: &[String]) -> Result<Vec<usize>, PrepError> {
        labels.iter().map(|l| self.encode(l)).collect()
    }

    /// Class name for an index; `None` when out of range.
    #[must_use]
    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    #[must_use]
    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Whether the class list is non-empty, sorted and unique.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        !self.classes.is_empty() && self.classes.windows(2).all(|w| w[0] < w[1])
    }
}
