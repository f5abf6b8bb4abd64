use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use log::debug;

use crate::error::PipelineError;

/// Retrieval capability the pipeline needs from persisted artifacts.
///
/// A missing required artifact is an error, never a silent default; optional
/// artifacts (the email column list) go through `load_optional`.
pub trait ArtifactStore: Send + Sync {
    /// Fetch an artifact by name, or `None` if the store has no such entry.
    /// Transport and permission failures are errors, not `None`.
    fn load_optional(&self, name: &str) -> Result<Option<Vec<u8>>, PipelineError>;

    fn load_bytes(&self, name: &str) -> Result<Vec<u8>, PipelineError> {
        self.load_optional(name)?
            .ok_or_else(|| PipelineError::artifact(format!("artifact not found: {name}")))
    }
}

/// Artifacts read from a local directory.
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ArtifactStore for LocalStore {
    fn load_optional(&self, name: &str) -> Result<Option<Vec<u8>>, PipelineError> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(None);
        }
        debug!("loading artifact from {}", path.display());
        std::fs::read(&path)
            .map(Some)
            .map_err(|e| PipelineError::artifact(format!("failed to read {}: {e}", path.display())))
    }
}

/// Artifacts fetched from a remote model repository via HTTP GET
/// `{base_url}/{name}`. The pipeline is synchronous, so this uses the
/// blocking client; fetches happen only during context construction.
pub struct RemoteStore {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl RemoteStore {
    pub fn new(base_url: impl Into<String>) -> Result<Self, PipelineError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| PipelineError::artifact(format!("failed to build http client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

impl ArtifactStore for RemoteStore {
    fn load_optional(&self, name: &str) -> Result<Option<Vec<u8>>, PipelineError> {
        let url = format!("{}/{}", self.base_url, name);
        debug!("fetching artifact from {url}");
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| PipelineError::artifact(format!("fetch failed for {url}: {e}")))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(PipelineError::artifact(format!(
                "fetch failed for {url}: http {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .map_err(|e| PipelineError::artifact(format!("fetch failed for {url}: {e}")))?;
        Ok(Some(bytes.to_vec()))
    }
}

/// In-memory store, used by tests to build a pipeline from stub artifacts.
#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        self.entries.insert(name.into(), bytes.into());
    }
}

impl ArtifactStore for MemoryStore {
    fn load_optional(&self, name: &str) -> Result<Option<Vec<u8>>, PipelineError> {
        Ok(self.entries.get(name).cloned())
    }
}
