use serde::{Deserialize, Serialize};
use std::fs;

use crate::artifacts::{ArtifactStore, LocalStore, RemoteStore};
use crate::error::PipelineError;

/// Top-level pipeline configuration, loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub artifacts: ArtifactSourceConfig,
    #[serde(default)]
    pub artifact_names: ArtifactNames,
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

/// Where persisted artifacts come from, selected at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ArtifactSourceConfig {
    /// Read from a local directory.
    Local { dir: String },
    /// Fetch from a remote model repository over HTTP.
    Remote { base_url: String },
}

impl Default for ArtifactSourceConfig {
    fn default() -> Self {
        ArtifactSourceConfig::Local {
            dir: "models".to_string(),
        }
    }
}

/// File names of the persisted artifacts, overridable per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactNames {
    pub tfidf_vectorizer: String,
    pub url_feature_columns: String,
    pub url_scaler: String,
    pub email_ensemble_model: String,
    pub email_linear_model: String,
    pub url_ensemble_model: String,
    pub url_linear_model: String,
    /// Optional; when present in the store, email vectors are additionally
    /// aligned against it.
    pub email_feature_columns: String,
}

impl Default for ArtifactNames {
    fn default() -> Self {
        Self {
            tfidf_vectorizer: "tfidf_vectorizer.json".to_string(),
            url_feature_columns: "url_feature_columns.json".to_string(),
            url_scaler: "url_scaler.json".to_string(),
            email_ensemble_model: "email_rf_model.json".to_string(),
            email_linear_model: "email_lr_model.json".to_string(),
            url_ensemble_model: "url_rf_model.json".to_string(),
            url_linear_model: "url_lr_model.json".to_string(),
            email_feature_columns: "email_feature_columns.json".to_string(),
        }
    }
}

/// Per-domain phishing-probability thresholds. URLs carry the higher bar to
/// avoid false-positive blocking of legitimate sites.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdConfig {
    pub email: f64,
    pub url: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            email: 0.70,
            url: 0.75,
        }
    }
}

impl PipelineConfig {
    pub fn from_file(path: &str) -> Result<Self, PipelineError> {
        let content = fs::read_to_string(path)
            .map_err(|e| PipelineError::artifact(format!("failed to read config {path}: {e}")))?;
        serde_yaml::from_str(&content)
            .map_err(|e| PipelineError::artifact(format!("invalid config {path}: {e}")))
    }

    /// YAML text for a default configuration file.
    pub fn default_yaml() -> String {
        serde_yaml::to_string(&PipelineConfig::default()).unwrap()
    }

    /// Build the artifact store this configuration selects.
    pub fn open_store(&self) -> Result<Box<dyn ArtifactStore>, PipelineError> {
        match &self.artifacts {
            ArtifactSourceConfig::Local { dir } => Ok(Box::new(LocalStore::new(dir))),
            ArtifactSourceConfig::Remote { base_url } => {
                Ok(Box::new(RemoteStore::new(base_url.clone())?))
            }
        }
    }
}
