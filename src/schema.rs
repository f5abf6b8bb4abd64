use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::PipelineError;

/// A feature vector whose column order has been fixed by a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    columns: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| self.values[i])
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Persisted ordered column list defining a model's expected input shape.
///
/// The same schema is used to fit the scaler at training time and to align
/// inference inputs; the aligner itself is stateless.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Deserialize from the persisted JSON artifact (a plain array of names).
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, PipelineError> {
        let schema: FeatureSchema = serde_json::from_slice(bytes)
            .map_err(|e| PipelineError::artifact(format!("invalid schema artifact: {e}")))?;
        if schema.columns.is_empty() {
            return Err(PipelineError::artifact("schema artifact has no columns"));
        }
        Ok(schema)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Reindex a raw name/value mapping against this schema.
    ///
    /// Missing columns fill with 0.0, extras drop, and the output order is
    /// exactly the schema order. Never fails: every mismatch has a defined
    /// resolution here so the models downstream never see one.
    pub fn align(&self, raw: &HashMap<String, f64>) -> FeatureVector {
        let values = self
            .columns
            .iter()
            .map(|col| raw.get(col).copied().unwrap_or(0.0))
            .collect();
        FeatureVector {
            columns: self.columns.clone(),
            values,
        }
    }

    /// Align a dense vector whose positions are described by `names`.
    ///
    /// Used on the email path when an email column-list artifact is present.
    pub fn align_named(&self, names: &[String], values: &[f64]) -> FeatureVector {
        let raw: HashMap<String, f64> = names
            .iter()
            .cloned()
            .zip(values.iter().copied())
            .collect();
        self.align(&raw)
    }
}
