use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use log::{debug, info};
use serde::Deserialize;
use triage_ml::{SplitSettings, Trainer, TrainingSettings};

pub const DEFAULT_CONFIG_PATH: &str = "config/triage.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub dataset: DatasetSection,
    #[serde(default)]
    pub training: TrainingSection,
    #[serde(default)]
    pub output: OutputSection,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatasetSection {
    #[serde(default = "default_dataset_path")]
    pub path: PathBuf,
}

impl Default for DatasetSection {
    fn default() -> Self {
        Self {
            path: default_dataset_path(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TrainingSection {
    #[serde(default = "default_epochs")]
    pub epochs: usize,
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_l2")]
    pub l2_regularization: f64,
    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for TrainingSection {
    fn default() -> Self {
        Self {
            epochs: default_epochs(),
            learning_rate: default_learning_rate(),
            l2_regularization: default_l2(),
            test_ratio: default_test_ratio(),
            seed: default_seed(),
        }
    }
}

impl TrainingSection {
    pub fn to_trainer(&self) -> Trainer {
        Trainer::new(
            TrainingSettings {
                epochs: self.epochs,
                learning_rate: self.learning_rate,
                l2: self.l2_regularization,
            },
            SplitSettings {
                test_ratio: self.test_ratio,
                seed: self.seed,
            },
        )
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(self.epochs >= 1, "epochs must be at least 1");
        ensure!(
            self.learning_rate.is_finite() && self.learning_rate > 0.0,
            "learning_rate must be positive"
        );
        ensure!(
            self.l2_regularization.is_finite() && self.l2_regularization >= 0.0,
            "l2_regularization must be non-negative"
        );
        ensure!(
            (0.0..1.0).contains(&self.test_ratio),
            "test_ratio must be between 0 (inclusive) and 1 (exclusive)"
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputSection {
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
        }
    }
}

/// Reads the run configuration. A missing file at the default location falls
/// back to built-in defaults; an explicitly requested file must exist.
pub fn load_config(path: Option<&Path>) -> Result<RunConfig> {
    let (path, explicit) = match path {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };

    if !explicit && !path.exists() {
        debug!("no config at {}; using defaults", path.display());
        return Ok(RunConfig::default());
    }

    let content =
        fs::read_to_string(&path).with_context(|| format!("read config at {}", path.display()))?;
    let config = parse_config(&content)
        .with_context(|| format!("parse TOML configuration {}", path.display()))?;
    info!("using configuration {}", path.display());
    Ok(config)
}

pub fn parse_config(content: &str) -> Result<RunConfig> {
    let config: RunConfig = toml::from_str(content)?;
    config.training.validate()?;
    Ok(config)
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/symptoms.csv")
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/triage.bin")
}

fn default_epochs() -> usize {
    TrainingSettings::default().epochs
}

fn default_learning_rate() -> f64 {
    TrainingSettings::default().learning_rate
}

fn default_l2() -> f64 {
    TrainingSettings::default().l2
}

fn default_test_ratio() -> f64 {
    SplitSettings::default().test_ratio
}

fn default_seed() -> u64 {
    SplitSettings::default().seed
}
