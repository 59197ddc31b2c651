use std::path::PathBuf;

use thiserror::Error;
use triage_core::DatasetError;

/// Errors surfaced by training, prediction and artifact persistence.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("training failed: {0}")]
    Training(String),
    #[error("missing feature: {column}")]
    MissingFeature { column: String },
    #[error("invalid value for {column}: {value}")]
    InvalidCategory { column: String, value: String },
    #[error("value `{value}` for numeric feature {column} is not a number")]
    InvalidNumeric { column: String, value: String },
    #[error("model artifact {} is corrupt: {reason}", path.display())]
    CorruptArtifact { path: PathBuf, reason: String },
    #[error("model not trained")]
    UntrainedModel,
    #[error("fitted model is inconsistent: {0}")]
    InconsistentModel(String),
    #[error("failed to serialize model artifact: {0}")]
    Serialize(String),
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dataset error: {0}")]
    Dataset(DatasetError),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

impl From<DatasetError> for PipelineError {
    fn from(value: DatasetError) -> Self {
        PipelineError::Dataset(value)
    }
}

impl PipelineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        PipelineError::CorruptArtifact {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
