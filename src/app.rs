//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initializes logging
//! - parses CLI arguments into stage configs
//! - runs the pipeline stage(s)
//! - prints summaries to stdout (logs go to stderr)

use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{
    CleanArgs, Cli, Command, ModelOptions, PredictArgs, RawInputArgs, ReportArgs, ReportOptions,
    RunArgs, SampleArgs, TrainArgs,
};
use crate::data::{SampleConfig, generate_postings};
use crate::domain::{CleanConfig, FeatureFlags, ReportConfig, TrainConfig};
use crate::error::AppError;
use crate::model::FeatureQuery;
use crate::report::{
    format_clean_summary, format_market_overview, format_prediction, format_training_summary,
};

pub mod pipeline;

use pipeline::CleanJob;

/// Entry point for the `locum` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Command::Clean(args) => handle_clean(args),
        Command::Report(args) => handle_report(args),
        Command::Train(args) => handle_train(args),
        Command::Predict(args) => handle_predict(args),
        Command::Run(args) => handle_run(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    // A second init (e.g. from an embedding process) is not an error for the CLI.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn handle_clean(args: CleanArgs) -> Result<(), AppError> {
    let job = clean_job_from_args(&args.input, &args.out_dir, &args.report);
    let run = pipeline::run_clean(&job)?;

    println!(
        "{}",
        format_clean_summary(run.rows_read, run.unreadable, &run.output)
    );
    println!("{}", format_market_overview(&run.reports, args.report.top));
    println!("Dataset: {}", run.dataset_path.display());
    Ok(())
}

fn handle_report(args: ReportArgs) -> Result<(), AppError> {
    let config = report_config_from_args(&args.report);
    let (reports, written) = pipeline::run_report(&args.dataset, &config, args.export_dir.as_deref())?;

    println!("{}", format_market_overview(&reports, args.report.top));
    for path in written {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn handle_train(args: TrainArgs) -> Result<(), AppError> {
    let config = train_config_from_args(&args.options);
    let outcome = pipeline::run_train(&args.dataset, &config, &args.model_out)?;

    println!("{}", format_training_summary(&outcome, args.options.top_features));
    println!("Model: {}", args.model_out.display());
    Ok(())
}

fn handle_predict(args: PredictArgs) -> Result<(), AppError> {
    let query = query_from_args(&args)?;
    let (estimate, version) = pipeline::run_predict(&args.model, &query)?;
    print!("{}", format_prediction(&query, estimate, &version));
    Ok(())
}

fn handle_run(args: RunArgs) -> Result<(), AppError> {
    let job = clean_job_from_args(&args.input, &args.out_dir, &args.report);
    let config = train_config_from_args(&args.options);
    let full = pipeline::run_all(&job, &config)?;

    println!(
        "{}",
        format_clean_summary(full.clean.rows_read, full.clean.unreadable, &full.clean.output)
    );
    println!("{}", format_market_overview(&full.clean.reports, args.report.top));
    println!("{}", format_training_summary(&full.train, args.options.top_features));
    println!("Model: {}", full.model_path.display());
    Ok(())
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        count: args.count,
        seed: args.seed,
    };
    let postings = generate_postings(&config)?;
    crate::io::write_raw_postings(&args.out, &postings)?;
    info!(path = %args.out.display(), "sample written");
    println!("Wrote {} postings to {}", postings.len(), args.out.display());
    Ok(())
}

pub fn clean_job_from_args(
    input: &RawInputArgs,
    out_dir: &std::path::Path,
    report: &ReportOptions,
) -> CleanJob {
    CleanJob {
        raw: input.raw.clone(),
        keywords: input.keywords.clone(),
        out_dir: out_dir.to_path_buf(),
        clean: CleanConfig { dedup: !input.no_dedup },
        report: report_config_from_args(report),
    }
}

pub fn report_config_from_args(args: &ReportOptions) -> ReportConfig {
    ReportConfig {
        min_group_size: args.min_group_size,
    }
}

pub fn train_config_from_args(args: &ModelOptions) -> TrainConfig {
    TrainConfig {
        model_kind: args.model,
        seed: args.seed,
        test_fraction: args.test_fraction,
        min_train_samples: args.min_train,
        n_trees: args.trees,
        max_depth: args.max_depth,
        min_samples_leaf: args.min_leaf,
        max_features: args.max_features,
    }
}

/// Build a prediction query. Flags not named on the command line are off.
fn query_from_args(args: &PredictArgs) -> Result<FeatureQuery, AppError> {
    let mut flags = FeatureFlags::new();
    for name in &args.flags {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::new(2, "Empty `--flag` value."));
        }
        flags.insert(name.to_string(), true);
    }
    if args.duration_days.is_some_and(|d| d < 0) {
        return Err(AppError::new(2, "`--duration-days` must be >= 0."));
    }
    Ok(FeatureQuery {
        specialty: args.specialty.trim().to_string(),
        state: args.state.trim().to_string(),
        city: args
            .city
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string),
        flags,
        duration_days: args.duration_days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predict_args_become_a_query() {
        let args = PredictArgs {
            model: "m.json".into(),
            specialty: " Hospitalist ".to_string(),
            state: "Ohio".to_string(),
            city: Some(" Dayton ".to_string()),
            flags: vec!["trauma_center".to_string()],
            duration_days: Some(30),
        };
        let query = query_from_args(&args).unwrap();
        assert_eq!(query.specialty, "Hospitalist");
        assert_eq!(query.city.as_deref(), Some("Dayton"));
        assert_eq!(query.flags.get("trauma_center"), Some(&true));

        let bad = PredictArgs {
            duration_days: Some(-1),
            ..args
        };
        assert_eq!(query_from_args(&bad).unwrap_err().exit_code(), 2);
    }

    #[test]
    fn model_options_map_onto_train_config() {
        let cli = Cli::try_parse_from([
            "locum", "train", "--dataset", "d.csv", "--model-out", "m.json", "--model", "linear",
            "--trees", "7", "--max-features", "3",
        ])
        .unwrap();
        let Command::Train(args) = cli.command else {
            panic!("expected train");
        };
        let config = train_config_from_args(&args.options);
        assert_eq!(config.model_kind, crate::domain::ModelKind::Linear);
        assert_eq!(config.n_trees, 7);
        assert_eq!(config.max_features, Some(3));
    }
}
