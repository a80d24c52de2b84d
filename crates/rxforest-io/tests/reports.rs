//! Integration tests: CSV -> frame -> metrics report and confusion-matrix PNG.

use std::fs;
use std::path::{Path, PathBuf};

use rxforest_io::{ConfusionPlot, CsvLoader, IoError, MetricsWriter};
use rxforest_prep::{Cell, ColumnKind};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn fixture_loads_with_inferred_kinds() {
    let frame = CsvLoader::new(&fixture_path("drug_sample.csv"))
        .read()
        .expect("fixture should parse");

    assert_eq!(frame.n_rows(), 20);
    assert_eq!(
        frame.columns(),
        &["Age", "Sex", "BP", "Cholesterol", "Na_to_K", "Drug"]
    );
    let kinds: Vec<ColumnKind> = (0..6).filter_map(|c| frame.column_kind(c)).collect();
    assert_eq!(
        kinds,
        vec![
            ColumnKind::Numeric,
            ColumnKind::Text,
            ColumnKind::Text,
            ColumnKind::Text,
            ColumnKind::Numeric,
            ColumnKind::Text,
        ]
    );

    let (features, labels) = frame.split_off_label("Drug").unwrap();
    assert_eq!(features.n_columns(), 5);
    assert_eq!(labels[17], "drugA");
    assert_eq!(features.rows()[0][4], Cell::Number(25.355));
}

#[test]
fn reports_written_side_by_side() {
    let dir = TempDir::new().unwrap();
    let results = dir.path().join("Results");
    fs::create_dir(&results).unwrap();

    // 1. Metrics report
    let metrics = results.join("metrics.txt");
    MetricsWriter::write(&metrics, 0.9833, 0.9761).unwrap();
    assert_eq!(
        fs::read_to_string(&metrics).unwrap(),
        "\nAccuracy = 0.98, F1 Score = 0.98."
    );

    // 2. Confusion-matrix image
    let image = results.join("model_results.png");
    let rows = vec![
        vec![27, 0, 0, 0, 0],
        vec![0, 7, 0, 0, 0],
        vec![0, 0, 5, 0, 0],
        vec![0, 0, 0, 5, 0],
        vec![1, 0, 0, 0, 15],
    ];
    let labels: Vec<String> = ["DrugY", "drugA", "drugB", "drugC", "drugX"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    ConfusionPlot::new(&rows, &labels)
        .with_dpi(120)
        .save(&image)
        .unwrap();
    let bytes = fs::read(&image).unwrap();
    assert!(bytes.len() > 1_000, "PNG only {} bytes", bytes.len());
    assert_eq!(&bytes[1..4], b"PNG");
}

#[test]
fn missing_input_reported_with_path() {
    let path = fixture_path("does_not_exist.csv");
    match CsvLoader::new(&path).read() {
        Err(IoError::FileNotFound { path: reported, .. }) => assert_eq!(reported, path),
        other => panic!("expected FileNotFound, got {other:?}"),
    }
}
