use log::{log_enabled, trace, Level};
use serde::{Deserialize, Serialize};

use crate::dataset::Sample;

/// Gradient-descent settings for [`train`].
///
/// The effective step is `learning_rate / (1 + mean squared feature norm)`,
/// which keeps full-batch descent stable on unscaled label codes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrainingSettings {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for TrainingSettings {
    fn default() -> Self {
        Self {
            epochs: 1000,
            learning_rate: 1.0,
            l2: 1e-4,
        }
    }
}

/// Multinomial logistic regression. One weight row and one bias per class.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxModel {
    weights: Vec<Vec<f64>>,
    bias: Vec<f64>,
}

impl SoftmaxModel {
    pub fn new(weights: Vec<Vec<f64>>, bias: Vec<f64>) -> Self {
        Self { weights, bias }
    }

    pub fn class_count(&self) -> usize {
        self.bias.len()
    }

    pub fn feature_count(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    /// Coefficient row of one class, in feature order.
    pub fn coefficients(&self, class: usize) -> Option<&[f64]> {
        self.weights.get(class).map(Vec::as_slice)
    }

    /// Checks that every class row has the same width and that the bias
    /// vector matches the class count.
    pub fn is_well_formed(&self) -> bool {
        let width = self.feature_count();
        self.weights.len() == self.bias.len()
            && self.weights.iter().all(|row| row.len() == width)
            && self
                .weights
                .iter()
                .flatten()
                .chain(self.bias.iter())
                .all(|value| value.is_finite())
    }

    pub fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        debug_assert_eq!(features.len(), self.feature_count());
        let mut scores: Vec<f64> = self
            .weights
            .iter()
            .zip(self.bias.iter())
            .map(|(row, bias)| dot(row, features) + bias)
            .collect();
        softmax(&mut scores);
        scores
    }

    /// Most probable class; ties resolve to the lowest class code.
    pub fn predict(&self, features: &[f64]) -> usize {
        argmax(&self.predict_proba(features)).0
    }
}

pub fn train(samples: &[Sample], class_count: usize, settings: TrainingSettings) -> SoftmaxModel {
    let feature_len = samples.first().map_or(0, |sample| sample.features.len());
    let mut weights = vec![vec![0.0; feature_len]; class_count];
    let mut bias = vec![0.0; class_count];
    if samples.is_empty() || class_count == 0 {
        return SoftmaxModel { weights, bias };
    }

    let m = samples.len() as f64;
    let mean_sq_norm = samples
        .iter()
        .map(|sample| dot(&sample.features, &sample.features))
        .sum::<f64>()
        / m;
    let lr = settings.learning_rate / (1.0 + mean_sq_norm);
    let l2 = settings.l2;

    let mut grad_w = vec![vec![0.0; feature_len]; class_count];
    let mut grad_b = vec![0.0; class_count];
    let mut probabilities = vec![0.0; class_count];

    for epoch in 0..settings.epochs {
        grad_w.iter_mut().for_each(|row| row.fill(0.0));
        grad_b.fill(0.0);
        let mut loss = 0.0;

        for sample in samples {
            debug_assert_eq!(sample.features.len(), feature_len);
            for (class, probability) in probabilities.iter_mut().enumerate() {
                *probability = dot(&weights[class], &sample.features) + bias[class];
            }
            softmax(&mut probabilities);
            loss -= probabilities[sample.label].max(f64::MIN_POSITIVE).ln();

            for (class, probability) in probabilities.iter().enumerate() {
                let target = if class == sample.label { 1.0 } else { 0.0 };
                let error = probability - target;
                for (i, value) in sample.features.iter().enumerate() {
                    grad_w[class][i] += error * value;
                }
                grad_b[class] += error;
            }
        }

        for (class, row) in weights.iter_mut().enumerate() {
            for (i, weight) in row.iter_mut().enumerate() {
                let grad = grad_w[class][i] / m + l2 * *weight;
                *weight -= lr * grad;
            }
            bias[class] -= lr * grad_b[class] / m;
        }

        if epoch % 100 == 0 && log_enabled!(target: "triage_ml::logistic", Level::Trace) {
            trace!(
                target: "triage_ml::logistic",
                "epoch {} mean cross-entropy {:.6}",
                epoch,
                loss / m
            );
        }
    }

    SoftmaxModel { weights, bias }
}

/// In-place softmax with max-subtraction for numerical stability.
pub fn softmax(scores: &mut [f64]) {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut total = 0.0;
    for score in scores.iter_mut() {
        *score = (*score - max).exp();
        total += *score;
    }
    for score in scores.iter_mut() {
        *score /= total;
    }
}

/// Index and value of the largest entry; the first one wins ties.
pub(crate) fn argmax(values: &[f64]) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (index, &value) in values.iter().enumerate() {
        if value > best.1 {
            best = (index, value);
        }
    }
    best
}

fn dot(weights: &[f64], features: &[f64]) -> f64 {
    weights
        .iter()
        .zip(features.iter())
        .map(|(w, f)| w * f)
        .sum()
}
