use thiserror::Error;

/// Error taxonomy for the classification pipeline.
///
/// Library code propagates these by value; the public predict functions
/// collapse them into the `Error`-label sentinel result so callers always
/// receive a uniform response shape.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A persisted artifact is missing, unreadable, or structurally invalid.
    #[error("artifact error: {0}")]
    Artifact(String),

    /// The caller passed an unknown input type, model family, or empty input.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Feature extraction produced something the downstream stages cannot use.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// A model rejected its input or produced a malformed output.
    #[error("model error: {0}")]
    Model(String),
}

impl PipelineError {
    pub fn artifact(msg: impl Into<String>) -> Self {
        PipelineError::Artifact(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        PipelineError::InvalidArgument(msg.into())
    }

    pub fn model(msg: impl Into<String>) -> Self {
        PipelineError::Model(msg.into())
    }
}
