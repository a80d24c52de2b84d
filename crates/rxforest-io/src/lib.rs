//! File I/O for the rxforest pipeline: CSV loading, the metrics report,
//! and the confusion-matrix image.

mod error;
mod plot;
mod reader;
mod writer;

pub use error::IoError;
pub use plot::ConfusionPlot;
pub use reader::CsvLoader;
pub use writer::{MetricsWriter, format_score};
