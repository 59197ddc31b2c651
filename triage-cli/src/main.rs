use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use log::LevelFilter;
use serde::Serialize;

use triage_core::Value;
use triage_ml::{FeatureRecord, Pipeline};

use crate::bootstrap::{Bootstrap, ModelSource};
use crate::config::{load_config, RunConfig};

mod bootstrap;
mod config;

#[derive(Parser, Debug)]
#[command(author, version, about = "triage: symptom-to-condition classifier")]
struct Cli {
    /// TOML configuration file (defaults to config/triage.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Increase output verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode the dataset, train a classifier and save the artifact
    Train {
        /// CSV dataset; the last column is the label
        #[arg(long, value_name = "CSV")]
        data: Option<PathBuf>,
        /// Where to write the model artifact
        #[arg(long, value_name = "PATH")]
        model: Option<PathBuf>,
    },
    /// Predict a condition for one record
    Predict {
        /// Feature value as name=value; repeat for every feature column
        #[arg(short, long = "feature", value_name = "NAME=VALUE", value_parser = parse_feature, required = true)]
        features: Vec<(String, String)>,
        #[arg(long, value_name = "PATH")]
        model: Option<PathBuf>,
    },
    /// List the accepted values of every categorical feature
    Options {
        #[arg(long, value_name = "PATH")]
        model: Option<PathBuf>,
    },
    /// Report whether a saved model is available and how it scored
    Status {
        #[arg(long, value_name = "PATH")]
        model: Option<PathBuf>,
    },
}

#[derive(Serialize)]
struct StatusReport<'a> {
    model_path: String,
    #[serde(flatten)]
    status: &'a triage_ml::PipelineStatus,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = load_config(cli.config.as_deref())?;
    let pipeline = Pipeline::new(config.training.to_trainer());

    match cli.command {
        Command::Train { data, model } => {
            let bootstrap = bootstrap_for(&config, model, data);
            bootstrap
                .retrain(&pipeline)
                .context("training failed")?;
            let model = pipeline
                .model()
                .ok_or_else(|| anyhow!("training finished without a model"))?;
            println!("Model trained successfully with {:.1}% accuracy.", model.accuracy());
            println!("Most important feature: {}", model.most_important_feature());
            println!("Model saved to {}", bootstrap.model_path.display());
        }
        Command::Predict { features, model } => {
            let bootstrap = bootstrap_for(&config, model, None);
            announce(bootstrap.run(&pipeline).context("no model available")?);
            let record: FeatureRecord = features
                .into_iter()
                .map(|(name, raw)| (name, Value::from(raw)))
                .collect();
            let prediction = pipeline.predict(&record).context("prediction failed")?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
        Command::Options { model } => {
            let bootstrap = bootstrap_for(&config, model, None);
            announce(bootstrap.run(&pipeline).context("no model available")?);
            let options = pipeline.feature_options()?;
            println!("{}", serde_json::to_string_pretty(&options)?);
        }
        Command::Status { model } => {
            let model_path = model.unwrap_or_else(|| config.output.model_path.clone());
            pipeline
                .load(&model_path)
                .with_context(|| format!("failed to load {}", model_path.display()))?;
            let status = pipeline.status();
            let report = StatusReport {
                model_path: model_path.display().to_string(),
                status: &status,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn bootstrap_for(config: &RunConfig, model: Option<PathBuf>, data: Option<PathBuf>) -> Bootstrap {
    Bootstrap::new(
        model.unwrap_or_else(|| config.output.model_path.clone()),
        data.unwrap_or_else(|| config.dataset.path.clone()),
    )
}

fn announce(source: ModelSource) {
    match source {
        ModelSource::Artifact => log::info!("model loaded from artifact"),
        ModelSource::Trained => log::info!("model trained from dataset and saved"),
    }
}

fn parse_feature(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got `{raw}`"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("feature name is empty in `{raw}`"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn init_logging(verbosity: u8) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if verbosity > 0 {
        let level = match verbosity {
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };
        builder.filter_level(level);
    }
    builder.try_init().map_err(|err| err.into())
}
