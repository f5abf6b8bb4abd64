use serde::Deserialize;

use crate::error::PipelineError;

/// Persisted per-column standardization: `(x - mean) / std`.
///
/// Applied to URL feature vectors after schema alignment and before model
/// scoring. Email vectors are never scaled; the TF-IDF weighting already
/// bounds them.
#[derive(Debug, Clone, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    std: Vec<f64>,
}

impl StandardScaler {
    pub fn new(mean: Vec<f64>, std: Vec<f64>) -> Result<Self, PipelineError> {
        if mean.len() != std.len() {
            return Err(PipelineError::artifact(format!(
                "scaler has {} means but {} std-devs",
                mean.len(),
                std.len()
            )));
        }
        // A zero-variance column divides by 1.0, leaving the centered value.
        let std = std
            .into_iter()
            .map(|s| if s == 0.0 { 1.0 } else { s })
            .collect();
        Ok(Self { mean, std })
    }

    /// Deserialize from the persisted JSON artifact:
    /// `{"mean": [...], "std": [...]}`.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, PipelineError> {
        let raw: StandardScaler = serde_json::from_slice(bytes)
            .map_err(|e| PipelineError::artifact(format!("invalid scaler artifact: {e}")))?;
        Self::new(raw.mean, raw.std)
    }

    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Standardize an aligned vector. The input width must match the
    /// persisted column count; a mismatch means schema drift upstream.
    pub fn transform(&self, values: &[f64]) -> Result<Vec<f64>, PipelineError> {
        if values.len() != self.mean.len() {
            return Err(PipelineError::Extraction(format!(
                "scaler expects {} columns, got {}",
                self.mean.len(),
                values.len()
            )));
        }
        Ok(values
            .iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(v, (m, s))| (v - m) / s)
            .collect())
    }
}
