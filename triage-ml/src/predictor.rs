use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::{debug, trace};
use serde::Serialize;
use triage_core::Value;

use crate::artifact;
use crate::error::{PipelineError, PipelineResult};
use crate::logistic::argmax;
use crate::model::FittedModel;
use crate::trainer::round_to;

/// One raw input record: feature column name to raw value.
pub type FeatureRecord = HashMap<String, Value>;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    pub condition: String,
    pub confidence: f64,
    pub accuracy: f64,
    pub most_important_feature: String,
}

/// Known input values of one feature column, in code order. Numeric columns
/// have no fixed value set.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FeatureOptions {
    pub column: String,
    pub categorical: bool,
    pub values: Vec<String>,
}

/// Cheap, clonable handle that serves predictions from a shared
/// [`FittedModel`].
#[derive(Clone, Debug)]
pub struct Predictor {
    model: Arc<FittedModel>,
}

impl Predictor {
    pub fn new(model: FittedModel) -> Self {
        Self::from_shared(Arc::new(model))
    }

    pub fn from_shared(model: Arc<FittedModel>) -> Self {
        Self { model }
    }

    /// Restores a predictor from a saved artifact; `Ok(None)` when nothing is
    /// stored at `path`.
    pub fn from_artifact(path: &Path) -> PipelineResult<Option<Self>> {
        Ok(artifact::load(path)?.map(Self::new))
    }

    pub fn model(&self) -> &FittedModel {
        &self.model
    }

    pub fn shared_model(&self) -> Arc<FittedModel> {
        Arc::clone(&self.model)
    }

    pub fn predict(&self, record: &FeatureRecord) -> PipelineResult<Prediction> {
        predict(&self.model, record)
    }

    pub fn feature_options(&self) -> Vec<FeatureOptions> {
        feature_options(&self.model)
    }
}

/// Encodes `record` with the model's tables and returns the most probable
/// condition. Columns are read in the model's own feature order; extra keys
/// are ignored.
pub fn predict(model: &FittedModel, record: &FeatureRecord) -> PipelineResult<Prediction> {
    let features = encode_record(model, record)?;
    let probabilities = model.classifier().predict_proba(&features);
    if probabilities.iter().any(|probability| !probability.is_finite()) {
        return Err(PipelineError::InconsistentModel(
            "class probabilities are not finite for this record".to_string(),
        ));
    }
    let (class, probability) = argmax(&probabilities);

    let condition = model
        .decoder()
        .and_then(|decoder| decoder.decode(class))
        .ok_or_else(|| {
            PipelineError::InconsistentModel(format!("class {class} has no decoded label"))
        })?
        .to_string();
    let confidence = round_to(probability.clamp(0.0, 1.0), 2);

    debug!(
        target: "triage_ml::predictor",
        "Predicted `{}` with confidence {:.2}",
        condition,
        confidence
    );

    Ok(Prediction {
        condition,
        confidence,
        accuracy: model.accuracy(),
        most_important_feature: model.most_important_feature().to_string(),
    })
}

/// Builds the single-row feature vector for `record`.
pub fn encode_record(model: &FittedModel, record: &FeatureRecord) -> PipelineResult<Vec<f64>> {
    let mut features = Vec::with_capacity(model.feature_order().len());
    for column in model.feature_order() {
        let value = record
            .get(column)
            .ok_or_else(|| PipelineError::MissingFeature {
                column: column.clone(),
            })?;

        let encoded = match model.tables().feature(column) {
            Some(table) => {
                let symbol = value.symbol();
                table.code(&symbol).ok_or_else(|| PipelineError::InvalidCategory {
                    column: column.clone(),
                    value: symbol.into_owned(),
                })? as f64
            }
            None => value
                .as_number()
                .ok_or_else(|| PipelineError::InvalidNumeric {
                    column: column.clone(),
                    value: value.to_string(),
                })?,
        };
        trace!(
            target: "triage_ml::predictor",
            "Feature `{}` = {} -> {}",
            column,
            value,
            encoded
        );
        features.push(encoded);
    }
    Ok(features)
}

pub fn feature_options(model: &FittedModel) -> Vec<FeatureOptions> {
    model
        .feature_order()
        .iter()
        .map(|column| match model.tables().feature(column) {
            Some(table) => FeatureOptions {
                column: column.clone(),
                categorical: true,
                values: table.symbols().to_vec(),
            },
            None => FeatureOptions {
                column: column.clone(),
                categorical: false,
                values: Vec::new(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logistic::SoftmaxModel;
    use crate::model::{ModelMetadata, FORMAT_VERSION};
    use crate::trainer::Trainer;
    use triage_core::{encode, RawDataset, SymbolTable, SymbolTables};

    fn fitted() -> FittedModel {
        let symptoms = [("fever", "Influenza"), ("headache", "Migraine"), ("cough", "Cold")];
        let severities = ["mild", "moderate", "severe"];
        let rows = (0..48)
            .map(|i| {
                let (symptom, condition) = symptoms[i % 3];
                vec![
                    Value::from(symptom),
                    Value::from(severities[(i / 3) % 3]),
                    Value::Number((i % 5) as f64),
                    Value::from(condition),
                ]
            })
            .collect();
        let raw = RawDataset::new(
            vec![
                "symptom".into(),
                "severity".into(),
                "days".into(),
                "condition".into(),
            ],
            rows,
        )
        .expect("rectangular");
        Trainer::default()
            .train(&encode(&raw).expect("encodes"))
            .expect("trains")
    }

    fn record(pairs: &[(&str, Value)]) -> FeatureRecord {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn predicts_a_known_label() {
        let model = fitted();
        let prediction = predict(
            &model,
            &record(&[
                ("days", Value::from("2")),
                ("symptom", Value::from("fever")),
                ("severity", Value::from("moderate")),
            ]),
        )
        .expect("predicts");

        let labels = model.tables().target().expect("decoder").labels();
        assert!(labels.contains(&prediction.condition));
        assert!((0.0..=1.0).contains(&prediction.confidence));
        assert_eq!(prediction.accuracy, model.accuracy());
        assert_eq!(prediction.most_important_feature, model.most_important_feature());
    }

    #[test]
    fn unknown_category_is_rejected() {
        let model = fitted();
        let err = predict(
            &model,
            &record(&[
                ("symptom", Value::from("rash")),
                ("severity", Value::from("mild")),
                ("days", Value::Number(1.0)),
            ]),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::InvalidCategory { ref column, ref value }
                if column == "symptom" && value == "rash"
        ));
    }

    #[test]
    fn missing_feature_is_rejected() {
        let model = fitted();
        let err = predict(
            &model,
            &record(&[("symptom", Value::from("fever")), ("days", Value::Number(1.0))]),
        )
        .unwrap_err();

        assert!(matches!(err, PipelineError::MissingFeature { ref column } if column == "severity"));
    }

    #[test]
    fn non_numeric_value_for_numeric_column_is_rejected() {
        let model = fitted();
        let err = predict(
            &model,
            &record(&[
                ("symptom", Value::from("fever")),
                ("severity", Value::from("mild")),
                ("days", Value::from("several")),
            ]),
        )
        .unwrap_err();

        assert!(matches!(err, PipelineError::InvalidNumeric { ref column, .. } if column == "days"));
    }

    #[test]
    fn non_finite_number_for_numeric_column_is_rejected() {
        let model = fitted();
        for days in [f64::NAN, f64::INFINITY] {
            let err = predict(
                &model,
                &record(&[
                    ("symptom", Value::from("fever")),
                    ("severity", Value::from("mild")),
                    ("days", Value::Number(days)),
                ]),
            )
            .unwrap_err();

            assert!(matches!(err, PipelineError::InvalidNumeric { ref column, .. } if column == "days"));
        }
    }

    #[test]
    fn overflowing_scores_are_not_reported_as_a_prediction() {
        let mut labels = SymbolTable::new();
        labels.intern("Influenza");
        labels.intern("Cold");
        let mut tables = SymbolTables::new();
        tables.set_target(labels.invert());
        let model = FittedModel::new(
            SoftmaxModel::new(vec![vec![10.0], vec![-10.0]], vec![0.0, 0.0]),
            tables,
            "condition".into(),
            vec!["days".into()],
            50.0,
            "days".into(),
            ModelMetadata {
                format_version: FORMAT_VERSION,
                crate_version: "test".into(),
                training_date: "2024-01-01T00:00:00Z".into(),
                train_rows: 3,
                held_out_rows: 1,
            },
        );

        let err = predict(&model, &record(&[("days", Value::Number(1e308))])).unwrap_err();

        assert!(matches!(err, PipelineError::InconsistentModel(_)));
    }

    #[test]
    fn extra_keys_are_ignored() {
        let model = fitted();
        let base = record(&[
            ("symptom", Value::from("cough")),
            ("severity", Value::from("severe")),
            ("days", Value::Number(3.0)),
        ]);
        let mut extended = base.clone();
        extended.insert("notes".into(), Value::from("n/a"));

        assert_eq!(
            predict(&model, &base).expect("base"),
            predict(&model, &extended).expect("extended")
        );
    }

    #[test]
    fn options_follow_feature_order() {
        let options = feature_options(&fitted());
        let columns: Vec<_> = options.iter().map(|o| o.column.as_str()).collect();
        assert_eq!(columns, ["symptom", "severity", "days"]);
        assert_eq!(options[0].values, ["fever", "headache", "cough"]);
        assert!(!options[2].categorical);
        assert!(options[2].values.is_empty());
    }

    #[test]
    fn predictor_handle_shares_the_model() {
        let predictor = Predictor::new(fitted());
        let clone = predictor.clone();
        assert!(Arc::ptr_eq(&predictor.shared_model(), &clone.shared_model()));
        assert_eq!(predictor.feature_options(), clone.feature_options());
    }
}
