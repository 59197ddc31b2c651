use std::path::PathBuf;

use log::{info, warn};
use thiserror::Error;
use triage_ml::{Pipeline, PipelineError};

/// Where the installed model came from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ModelSource {
    Artifact,
    Trained,
}

/// Errors that can occur while bringing a model online.
#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("pipeline error: {0}")]
    Pipeline(PipelineError),
    #[error("no model artifact at {} and no dataset at {}", artifact.display(), dataset.display())]
    NothingToLoad { artifact: PathBuf, dataset: PathBuf },
}

pub type BootstrapResult<T> = Result<T, BootstrapError>;

impl From<PipelineError> for BootstrapError {
    fn from(value: PipelineError) -> Self {
        BootstrapError::Pipeline(value)
    }
}

/// Startup sequence: reuse the saved artifact when there is one, otherwise
/// train from the dataset and persist the result.
#[derive(Clone, Debug)]
pub struct Bootstrap {
    pub model_path: PathBuf,
    pub dataset_path: PathBuf,
}

impl Bootstrap {
    pub fn new(model_path: PathBuf, dataset_path: PathBuf) -> Self {
        Self {
            model_path,
            dataset_path,
        }
    }

    pub fn run(&self, pipeline: &Pipeline) -> BootstrapResult<ModelSource> {
        if pipeline.load(&self.model_path)? {
            info!(
                target: "triage_cli::bootstrap",
                "using pre-trained model {}",
                self.model_path.display()
            );
            return Ok(ModelSource::Artifact);
        }

        if !self.dataset_path.exists() {
            return Err(BootstrapError::NothingToLoad {
                artifact: self.model_path.clone(),
                dataset: self.dataset_path.clone(),
            });
        }

        self.retrain(pipeline)?;
        Ok(ModelSource::Trained)
    }

    /// Trains from the dataset and saves, ignoring any existing artifact.
    pub fn retrain(&self, pipeline: &Pipeline) -> BootstrapResult<()> {
        info!(
            target: "triage_cli::bootstrap",
            "training new model from {}",
            self.dataset_path.display()
        );
        pipeline.fit_csv(&self.dataset_path)?;
        if let Err(err) = pipeline.save(&self.model_path) {
            warn!(
                target: "triage_cli::bootstrap",
                "model trained but could not be saved: {}",
                err
            );
            return Err(err.into());
        }
        Ok(())
    }
}
