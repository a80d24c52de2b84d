use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use rxforest_pipeline::{ScoredPrediction, TrainConfig, run_scored_prediction, run_training};
use rxforest_prep::UnknownCategoryPolicy;
use rxforest_rf::{MaxFeatures, SplitCriterion};

#[derive(Parser)]
#[command(name = "rxforest")]
#[command(about = "Train and evaluate a drug-recommendation random forest from patient records")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Fit the pipeline, score it on a held-out split, and save it
    Train {
        /// Path to the patient CSV file
        #[arg(long, default_value = "Data/drug200.csv")]
        data: PathBuf,

        /// Existing directory for metrics.txt and model_results.png
        #[arg(long, default_value = "Results")]
        results_dir: PathBuf,

        /// Where to save the fitted pipeline (its directory must exist).
        /// Replaces `Model/drug_pipeline.skops`: the file is an rxforest
        /// artifact, not a skops archive.
        #[arg(long, default_value = "Model/drug_pipeline.rxf")]
        model: PathBuf,

        /// Name of the label column
        #[arg(long, default_value = "Drug")]
        label: String,

        /// Fraction of rows held out for testing
        #[arg(long, default_value_t = 0.3)]
        test_fraction: f64,

        /// Seed for the train/test split
        #[arg(long, default_value_t = 125)]
        split_seed: u64,

        /// Seed for the initial row shuffle (OS entropy if not set)
        #[arg(long)]
        shuffle_seed: Option<u64>,

        /// Number of trees in the Random Forest
        #[arg(long, default_value_t = 100)]
        n_trees: usize,

        /// Seed for forest training
        #[arg(long, default_value_t = 125)]
        forest_seed: u64,

        /// Split criterion: gini or entropy
        #[arg(long, default_value = "gini")]
        criterion: String,

        /// Features tried per split: sqrt, log2, all, a count, or a fraction in (0, 1]
        #[arg(long, default_value = "sqrt")]
        max_features: String,

        /// Resolution of the confusion-matrix image
        #[arg(long, default_value_t = 120)]
        dpi: u32,

        /// Encode unseen categories as this value instead of failing
        #[arg(long)]
        unknown_value: Option<f64>,
    },

    /// Predict drugs for a CSV of patient records with a saved pipeline
    Predict {
        /// Path to the saved pipeline (an `.rxf` artifact written by `train`)
        #[arg(long, default_value = "Model/drug_pipeline.rxf")]
        model: PathBuf,

        /// Path to the patient CSV file
        #[arg(long)]
        data: PathBuf,

        /// Label column to ignore if present
        #[arg(long)]
        label: Option<String>,
    },
}

#[derive(Serialize)]
struct PredictOutput {
    n_rows: usize,
    predictions: Vec<ScoredPrediction>,
}

fn parse_criterion(s: &str) -> Result<SplitCriterion> {
    match s {
        "gini" => Ok(SplitCriterion::Gini),
        "entropy" => Ok(SplitCriterion::Entropy),
        other => anyhow::bail!("unknown criterion: {other} (expected gini or entropy)"),
    }
}

fn parse_max_features(s: &str) -> Result<MaxFeatures> {
    match s {
        "sqrt" => Ok(MaxFeatures::Sqrt),
        "log2" => Ok(MaxFeatures::Log2),
        "all" => Ok(MaxFeatures::All),
        other if other.contains('.') => {
            let fraction: f64 = other
                .parse()
                .with_context(|| format!("invalid max-features fraction: {other}"))?;
            if !(fraction > 0.0 && fraction <= 1.0) {
                anyhow::bail!("max-features fraction must be in (0, 1], got {fraction}");
            }
            Ok(MaxFeatures::Fraction(fraction))
        }
        other => other.parse().map(MaxFeatures::Fixed).with_context(|| {
            format!("unknown max-features: {other} (expected sqrt, log2, all, a count or a fraction)")
        }),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Train {
            data,
            results_dir,
            model,
            label,
            test_fraction,
            split_seed,
            shuffle_seed,
            n_trees,
            forest_seed,
            criterion,
            max_features,
            dpi,
            unknown_value,
        } => {
            let policy = unknown_value.map_or(
                UnknownCategoryPolicy::Error,
                UnknownCategoryPolicy::UseEncodedValue,
            );
            let config = TrainConfig::new()
                .with_data_path(data)
                .with_results_dir(results_dir)
                .with_model_path(model)
                .with_label_column(label)
                .with_test_fraction(test_fraction)
                .with_split_seed(split_seed)
                .with_shuffle_seed(shuffle_seed)
                .with_n_trees(n_trees)
                .with_forest_seed(forest_seed)
                .with_criterion(parse_criterion(&criterion)?)
                .with_max_features(parse_max_features(&max_features)?)
                .with_dpi(dpi)
                .with_unknown_policy(policy);

            let report = run_training(&config).context("training run failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        Command::Predict { model, data, label } => {
            let predictions = run_scored_prediction(&model, &data, label.as_deref())
                .context("prediction failed")?;
            let output = PredictOutput {
                n_rows: predictions.len(),
                predictions,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
