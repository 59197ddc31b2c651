use serde::{Deserialize, Serialize};
use triage_core::{SymbolTables, TargetDecoder};

use crate::logistic::SoftmaxModel;

/// Bumped whenever the persisted layout of [`FittedModel`] changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub format_version: u32,
    pub crate_version: String,
    pub training_date: String,
    pub train_rows: usize,
    pub held_out_rows: usize,
}

/// Everything needed to serve predictions: the classifier, the symbol tables
/// and the derived training figures. Immutable once built; a retrain or a load
/// produces a new value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    classifier: SoftmaxModel,
    tables: SymbolTables,
    target_column: String,
    feature_order: Vec<String>,
    accuracy: f64,
    most_important_feature: String,
    metadata: ModelMetadata,
}

impl FittedModel {
    pub(crate) fn new(
        classifier: SoftmaxModel,
        tables: SymbolTables,
        target_column: String,
        feature_order: Vec<String>,
        accuracy: f64,
        most_important_feature: String,
        metadata: ModelMetadata,
    ) -> Self {
        Self {
            classifier,
            tables,
            target_column,
            feature_order,
            accuracy,
            most_important_feature,
            metadata,
        }
    }

    pub fn classifier(&self) -> &SoftmaxModel {
        &self.classifier
    }

    pub fn tables(&self) -> &SymbolTables {
        &self.tables
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Feature columns in the order the classifier expects them.
    pub fn feature_order(&self) -> &[String] {
        &self.feature_order
    }

    /// Held-out accuracy as a percentage with one decimal.
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    pub fn most_important_feature(&self) -> &str {
        &self.most_important_feature
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub(crate) fn decoder(&self) -> Option<&TargetDecoder> {
        self.tables.target()
    }

    /// Cross-checks the bundle's parts against each other.
    pub fn validate(&self) -> Result<(), String> {
        if self.metadata.format_version != FORMAT_VERSION {
            return Err(format!(
                "format version {} is not supported (expected {})",
                self.metadata.format_version, FORMAT_VERSION
            ));
        }
        if !self.classifier.is_well_formed() {
            return Err("classifier parameters are malformed".to_string());
        }
        if self.classifier.feature_count() != self.feature_order.len() {
            return Err(format!(
                "classifier expects {} features but {} are listed",
                self.classifier.feature_count(),
                self.feature_order.len()
            ));
        }
        if let Some((column, _)) = self
            .tables
            .features()
            .find(|(_, table)| !table.is_consistent())
        {
            return Err(format!("symbol table for `{column}` repeats a symbol"));
        }
        if !self.decoder().map_or(true, TargetDecoder::is_consistent) {
            return Err("target decoder repeats a label".to_string());
        }
        let classes = self.decoder().map_or(0, TargetDecoder::len);
        if classes != self.classifier.class_count() {
            return Err(format!(
                "classifier has {} classes but the target decoder has {}",
                self.classifier.class_count(),
                classes
            ));
        }
        if self.feature_order.iter().any(|name| *name == self.target_column) {
            return Err(format!(
                "target column `{}` is listed as a feature",
                self.target_column
            ));
        }
        if let Some((column, _)) = self
            .tables
            .features()
            .find(|(column, _)| !self.feature_order.iter().any(|name| name == column))
        {
            return Err(format!("symbol table for unknown column `{column}`"));
        }
        if !self.feature_order.contains(&self.most_important_feature) {
            return Err(format!(
                "most important feature `{}` is not a feature column",
                self.most_important_feature
            ));
        }
        if !(0.0..=100.0).contains(&self.accuracy) {
            return Err(format!("accuracy {} is out of range", self.accuracy));
        }
        Ok(())
    }
}
