use std::path::Path;
use std::sync::Arc;

use log::info;
use parking_lot::RwLock;
use serde::Serialize;
use triage_core::{ColumnEncoder, RawDataset};

use crate::artifact;
use crate::error::{PipelineError, PipelineResult};
use crate::model::FittedModel;
use crate::predictor::{FeatureOptions, FeatureRecord, Prediction, Predictor};
use crate::trainer::Trainer;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PipelineStatus {
    pub model_loaded: bool,
    pub accuracy: Option<f64>,
    pub most_important_feature: Option<String>,
}

/// Shared entry point: holds the current model and swaps it wholesale on
/// retrain or reload. Predictions clone the current handle and run without
/// holding the lock.
#[derive(Debug, Default)]
pub struct Pipeline {
    trainer: Trainer,
    current: RwLock<Option<Predictor>>,
}

impl Pipeline {
    pub fn new(trainer: Trainer) -> Self {
        Self {
            trainer,
            current: RwLock::new(None),
        }
    }

    pub fn trainer(&self) -> &Trainer {
        &self.trainer
    }

    /// Encodes and trains on a CSV file, then installs the result.
    pub fn fit_csv(&self, path: &Path) -> PipelineResult<Arc<FittedModel>> {
        info!(
            target: "triage_ml::pipeline",
            "training new model from {}",
            path.display()
        );
        let raw = RawDataset::from_csv_path(path)?;
        self.fit(&raw)
    }

    pub fn fit(&self, raw: &RawDataset) -> PipelineResult<Arc<FittedModel>> {
        let encoded = ColumnEncoder::new().encode(raw)?;
        let model = self.trainer.train(&encoded)?;
        Ok(self.install(model))
    }

    /// Replaces the current model.
    pub fn install(&self, model: FittedModel) -> Arc<FittedModel> {
        let predictor = Predictor::new(model);
        let shared = predictor.shared_model();
        *self.current.write() = Some(predictor);
        shared
    }

    /// Loads an artifact and installs it. Returns `false` when nothing is
    /// stored at `path`; the current model is left untouched in that case.
    pub fn load(&self, path: &Path) -> PipelineResult<bool> {
        match Predictor::from_artifact(path)? {
            Some(predictor) => {
                *self.current.write() = Some(predictor);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Persists the current model. Fails without writing when untrained.
    pub fn save(&self, path: &Path) -> PipelineResult<()> {
        let predictor = self.predictor()?;
        artifact::save(predictor.model(), path)
    }

    pub fn predict(&self, record: &FeatureRecord) -> PipelineResult<Prediction> {
        self.predictor()?.predict(record)
    }

    pub fn feature_options(&self) -> PipelineResult<Vec<FeatureOptions>> {
        Ok(self.predictor()?.feature_options())
    }

    /// Snapshot of the current model, if any.
    pub fn model(&self) -> Option<Arc<FittedModel>> {
        self.current.read().as_ref().map(Predictor::shared_model)
    }

    pub fn status(&self) -> PipelineStatus {
        match self.model() {
            Some(model) => PipelineStatus {
                model_loaded: true,
                accuracy: Some(model.accuracy()),
                most_important_feature: Some(model.most_important_feature().to_string()),
            },
            None => PipelineStatus {
                model_loaded: false,
                accuracy: None,
                most_important_feature: None,
            },
        }
    }

    fn predictor(&self) -> PipelineResult<Predictor> {
        self.current
            .read()
            .clone()
            .ok_or(PipelineError::UntrainedModel)
    }
}
