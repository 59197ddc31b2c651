use std::collections::HashSet;

use log::{debug, info};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use triage_core::Encoded;

use crate::dataset::{shuffle_split, Sample};
use crate::error::{PipelineError, PipelineResult};
use crate::logistic::{self, argmax, SoftmaxModel, TrainingSettings};
use crate::model::{FittedModel, ModelMetadata, FORMAT_VERSION};

/// How rows are partitioned into training and held-out sets.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplitSettings {
    pub test_ratio: f64,
    pub seed: u64,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            test_ratio: 0.25,
            seed: 42,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Trainer {
    training: TrainingSettings,
    split: SplitSettings,
}

impl Trainer {
    pub fn new(training: TrainingSettings, split: SplitSettings) -> Self {
        Self { training, split }
    }

    pub fn training(&self) -> TrainingSettings {
        self.training
    }

    pub fn split(&self) -> SplitSettings {
        self.split
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.training.epochs == 0 {
            return Err(training_error("epochs must be at least 1"));
        }
        if !(self.training.learning_rate.is_finite() && self.training.learning_rate > 0.0) {
            return Err(training_error("learning_rate must be positive"));
        }
        if !(self.training.l2.is_finite() && self.training.l2 >= 0.0) {
            return Err(training_error("l2 must be non-negative"));
        }
        if !(0.0..1.0).contains(&self.split.test_ratio) {
            return Err(training_error("test_ratio must lie in [0, 1)"));
        }
        Ok(())
    }

    /// Fits a classifier on an encoded dataset and bundles it with the
    /// encoder's tables into a [`FittedModel`].
    pub fn train(&self, encoded: &Encoded) -> PipelineResult<FittedModel> {
        self.validate()?;

        let data = &encoded.dataset;
        let columns = data.columns();
        let target_index = data
            .column_index(&encoded.target_column)
            .ok_or_else(|| {
                training_error(format!(
                    "target column `{}` is not part of the dataset",
                    encoded.target_column
                ))
            })?;
        if columns.len() < 2 {
            return Err(training_error("dataset has no feature columns"));
        }
        if let Some((row, values)) = data
            .rows()
            .iter()
            .enumerate()
            .find(|(_, values)| values.len() != columns.len())
        {
            return Err(training_error(format!(
                "row {} has {} values but {} columns are declared",
                row,
                values.len(),
                columns.len()
            )));
        }
        if data.len() < 2 {
            return Err(training_error(format!(
                "at least 2 rows are required, found {}",
                data.len()
            )));
        }

        let decoder = encoded.tables.target().ok_or_else(|| {
            training_error(format!(
                "target column `{}` must be categorical",
                encoded.target_column
            ))
        })?;

        let feature_order: Vec<String> = columns
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != target_index)
            .map(|(_, name)| name.clone())
            .collect();

        let mut samples = Vec::with_capacity(data.len());
        for (row, values) in data.rows().iter().enumerate() {
            let label = class_code(values[target_index], decoder.len()).ok_or_else(|| {
                training_error(format!(
                    "row {} has target code {} outside the {} known classes",
                    row,
                    values[target_index],
                    decoder.len()
                ))
            })?;
            let features = values
                .iter()
                .enumerate()
                .filter(|(index, _)| *index != target_index)
                .map(|(_, value)| *value)
                .collect();
            samples.push(Sample { features, label });
        }

        let distinct: HashSet<usize> = samples.iter().map(|sample| sample.label).collect();
        if distinct.len() < 2 {
            return Err(training_error(format!(
                "at least 2 distinct target classes are required, found {}",
                distinct.len()
            )));
        }

        let (train_set, test_set) = shuffle_split(samples, self.split.test_ratio, self.split.seed);
        info!(
            target: "triage_ml::trainer",
            "training with {} samples, testing on {} samples ({} features, {} classes)",
            train_set.len(),
            test_set.len(),
            feature_order.len(),
            decoder.len()
        );

        let classifier = logistic::train(&train_set, decoder.len(), self.training);
        if !classifier.is_well_formed() {
            return Err(training_error(format!(
                "gradient descent diverged with learning_rate {}; parameters are not finite",
                self.training.learning_rate
            )));
        }

        let evaluation = if test_set.is_empty() {
            debug!(
                target: "triage_ml::trainer",
                "held-out partition is empty; measuring accuracy on the training partition"
            );
            &train_set
        } else {
            &test_set
        };
        let accuracy = accuracy_percent(&classifier, evaluation);
        let most_important_feature = most_important_feature(&classifier, &feature_order)
            .ok_or_else(|| training_error("classifier produced no coefficients"))?;
        info!(
            target: "triage_ml::trainer",
            "held-out accuracy {:.1}%, most important feature `{}`",
            accuracy,
            most_important_feature
        );

        let training_date = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|err| training_error(format!("format training timestamp: {err}")))?;
        let metadata = ModelMetadata {
            format_version: FORMAT_VERSION,
            crate_version: env!("CARGO_PKG_VERSION").to_string(),
            training_date,
            train_rows: train_set.len(),
            held_out_rows: test_set.len(),
        };

        Ok(FittedModel::new(
            classifier,
            encoded.tables.clone(),
            encoded.target_column.clone(),
            feature_order,
            accuracy,
            most_important_feature,
            metadata,
        ))
    }
}

/// Percentage of correctly classified samples, rounded to one decimal.
pub fn accuracy_percent(model: &SoftmaxModel, data: &[Sample]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let correct = data
        .iter()
        .filter(|sample| model.predict(&sample.features) == sample.label)
        .count();
    round_to(100.0 * correct as f64 / data.len() as f64, 1)
}

/// Feature whose reference-class (code 0) coefficient has the largest
/// magnitude. Ties resolve to the earliest column.
pub fn most_important_feature(model: &SoftmaxModel, feature_order: &[String]) -> Option<String> {
    let coefficients = model.coefficients(0)?;
    if coefficients.is_empty() {
        return None;
    }
    let magnitudes: Vec<f64> = coefficients.iter().map(|value| value.abs()).collect();
    let (index, _) = argmax(&magnitudes);
    feature_order.get(index).cloned()
}

pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn class_code(value: f64, class_count: usize) -> Option<usize> {
    if value.fract() != 0.0 || value < 0.0 || value >= class_count as f64 {
        return None;
    }
    Some(value as usize)
}

fn training_error(message: impl Into<String>) -> PipelineError {
    PipelineError::Training(message.into())
}
