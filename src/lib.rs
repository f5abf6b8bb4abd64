pub mod artifacts;
pub mod config;
pub mod error;
pub mod models;
pub mod normalization;
pub mod pipeline;
pub mod scaler;
pub mod schema;
pub mod url_features;
pub mod vectorizer;

pub use artifacts::{ArtifactStore, LocalStore, MemoryStore, RemoteStore};
pub use config::{ArtifactSourceConfig, PipelineConfig, ThresholdConfig};
pub use error::PipelineError;
pub use models::{Classifier, ModelFamily};
pub use pipeline::{arbitrate, InputType, Label, PipelineContext, PredictionResult};
