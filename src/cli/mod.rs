//! Command-line parsing for the locum pay-rate pipeline.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! cleaning/modeling code: every `*Args` struct is converted into a plain config
//! struct before the pipeline sees it.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::ModelKind;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "locum", version, about = "Locum tenens pay-rate cleaning, reporting and modeling")]
pub struct Cli {
    /// Log filter used when `RUST_LOG` is unset (e.g. `info`, `debug`, `locum_rates=trace`).
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Clean raw postings into a dataset and write the report tables.
    Clean(CleanArgs),
    /// Print the market overview for a cleaned dataset.
    Report(ReportArgs),
    /// Train a rate model on a cleaned dataset.
    Train(TrainArgs),
    /// Estimate an hourly rate with a trained model.
    Predict(PredictArgs),
    /// Clean, report and train in one pass.
    Run(RunArgs),
    /// Write a synthetic raw postings file.
    Sample(SampleArgs),
}

/// Where raw postings come from and how they are cleaned.
#[derive(Debug, Args, Clone)]
pub struct RawInputArgs {
    /// Raw JSONL file, or a directory of `YYYY-MM-DD/jobs.jsonl` snapshots.
    #[arg(long, env = "LOCUM_RAW_PATH", value_name = "PATH")]
    pub raw: PathBuf,

    /// Keyword file (`{"flag": ["phrase", ...]}`) replacing the built-in flags.
    #[arg(long, value_name = "JSON")]
    pub keywords: Option<PathBuf>,

    /// Keep duplicate postings instead of keeping the latest scrape of each.
    #[arg(long)]
    pub no_dedup: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ReportOptions {
    /// Groups with fewer rated postings are marked low-confidence.
    #[arg(long, default_value_t = 5)]
    pub min_group_size: usize,

    /// Groups shown per table in the overview.
    #[arg(long, default_value_t = 15)]
    pub top: usize,
}

#[derive(Debug, Args, Clone)]
pub struct CleanArgs {
    #[command(flatten)]
    pub input: RawInputArgs,

    /// Output directory for `cleaned.csv` and the report tables.
    #[arg(long, env = "LOCUM_DATA_DIR", value_name = "DIR")]
    pub out_dir: PathBuf,

    #[command(flatten)]
    pub report: ReportOptions,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    /// Cleaned dataset CSV produced by `locum clean`.
    #[arg(long, value_name = "CSV")]
    pub dataset: PathBuf,

    #[command(flatten)]
    pub report: ReportOptions,

    /// Also write the report tables to this directory.
    #[arg(long, value_name = "DIR")]
    pub export_dir: Option<PathBuf>,
}

/// Model hyper-parameters shared by `train` and `run`.
#[derive(Debug, Args, Clone)]
pub struct ModelOptions {
    /// Model family.
    #[arg(long, value_enum, default_value_t = ModelKind::Forest)]
    pub model: ModelKind,

    /// Seed for the split and the forest.
    #[arg(long, env = "LOCUM_SEED", default_value_t = 42)]
    pub seed: u64,

    /// Share of rated postings held out for evaluation.
    #[arg(long, default_value_t = 0.2)]
    pub test_fraction: f64,

    /// Number of trees in the forest.
    #[arg(long, default_value_t = 100)]
    pub trees: usize,

    /// Maximum tree depth.
    #[arg(long, default_value_t = 12)]
    pub max_depth: usize,

    /// Minimum postings per leaf.
    #[arg(long, default_value_t = 1)]
    pub min_leaf: usize,

    /// Features considered per split (default: all).
    #[arg(long)]
    pub max_features: Option<usize>,

    /// Abort training below this many training rows.
    #[arg(long, default_value_t = 10)]
    pub min_train: usize,

    /// Feature importances to print.
    #[arg(long, default_value_t = 15)]
    pub top_features: usize,
}

#[derive(Debug, Args, Clone)]
pub struct TrainArgs {
    /// Cleaned dataset CSV produced by `locum clean`.
    #[arg(long, value_name = "CSV")]
    pub dataset: PathBuf,

    /// Where to write the model artifact.
    #[arg(long, env = "LOCUM_MODEL_PATH", value_name = "JSON")]
    pub model_out: PathBuf,

    #[command(flatten)]
    pub options: ModelOptions,
}

#[derive(Debug, Args, Clone)]
pub struct PredictArgs {
    /// Model artifact produced by `locum train`.
    #[arg(long, env = "LOCUM_MODEL_PATH", value_name = "JSON")]
    pub model: PathBuf,

    #[arg(long)]
    pub specialty: String,

    #[arg(long)]
    pub state: String,

    /// City of the assignment; omitted or unseen cities use the unknown slot.
    #[arg(long)]
    pub city: Option<String>,

    /// Flags that apply to the job (repeatable), e.g. `--flag trauma_center`.
    #[arg(long = "flag", value_name = "NAME")]
    pub flags: Vec<String>,

    /// Assignment length in days.
    #[arg(long)]
    pub duration_days: Option<i64>,
}

#[derive(Debug, Args, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: RawInputArgs,

    /// Output directory for the dataset, report tables and `model.json`.
    #[arg(long, env = "LOCUM_DATA_DIR", value_name = "DIR")]
    pub out_dir: PathBuf,

    #[command(flatten)]
    pub report: ReportOptions,

    #[command(flatten)]
    pub options: ModelOptions,
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Output JSONL file.
    #[arg(long, value_name = "JSONL")]
    pub out: PathBuf,

    /// Number of distinct postings to generate.
    #[arg(long, default_value_t = 500)]
    pub count: usize,

    #[arg(long, env = "LOCUM_SEED", default_value_t = 42)]
    pub seed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn predict_collects_repeated_flags() {
        let cli = Cli::try_parse_from([
            "locum",
            "predict",
            "--model",
            "m.json",
            "--specialty",
            "Hospitalist",
            "--state",
            "Ohio",
            "--flag",
            "trauma_center",
            "--flag",
            "acls_required",
        ])
        .unwrap();
        let Command::Predict(args) = cli.command else {
            panic!("expected predict");
        };
        assert_eq!(args.flags, vec!["trauma_center", "acls_required"]);
        assert_eq!(args.duration_days, None);
        assert_eq!(args.city, None);
    }

    #[test]
    fn train_defaults_match_the_documented_protocol() {
        let cli = Cli::try_parse_from([
            "locum",
            "train",
            "--dataset",
            "cleaned.csv",
            "--model-out",
            "model.json",
        ])
        .unwrap();
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(args.options.model, ModelKind::Forest);
        assert_eq!(args.options.trees, 100);
        assert!((args.options.test_fraction - 0.2).abs() < 1e-12);
    }
}
