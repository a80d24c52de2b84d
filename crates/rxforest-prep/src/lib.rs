//! Tabular preprocessing for the rxforest pipeline.
//!
//! Holds the in-memory [`Frame`], row shuffling and the seeded train/test
//! split, and the fit-on-train / apply-anywhere transformers: ordinal
//! encoding, median imputation, standard scaling, their column-wise
//! composition, and label encoding.

mod column;
mod encoder;
mod error;
mod frame;
mod impute;
mod label;
mod scale;
mod split;

pub use column::{ColumnTransformer, ColumnTransformerConfig};
pub use encoder::{OrdinalEncoder, UnknownCategoryPolicy};
pub use error::PrepError;
pub use frame::{Cell, ColumnKind, Frame};
pub use impute::MedianImputer;
pub use label::LabelEncoder;
pub use scale::StandardScaler;
pub use split::{SplitIndices, shuffle_rows, train_test_split};
