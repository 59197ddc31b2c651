pub mod artifact;
pub mod dataset;
pub mod error;
pub mod logistic;
pub mod model;
pub mod pipeline;
pub mod predictor;
pub mod trainer;

pub use dataset::{shuffle_split, Sample};
pub use error::{PipelineError, PipelineResult};
pub use logistic::{SoftmaxModel, TrainingSettings};
pub use model::{FittedModel, ModelMetadata};
pub use pipeline::{Pipeline, PipelineStatus};
pub use predictor::{FeatureOptions, FeatureRecord, Prediction, Predictor};
pub use trainer::{SplitSettings, Trainer};
