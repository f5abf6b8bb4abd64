use serde::Deserialize;
use std::collections::HashMap;

use crate::error::PipelineError;

/// Pre-fit TF-IDF transform over a persisted vocabulary.
///
/// Transform semantics match the fitted vectorizer the models were trained
/// against: raw term counts scaled by per-term IDF weights, then the whole
/// vector L2-normalized. Terms outside the vocabulary contribute nothing.
#[derive(Debug, Clone, Deserialize)]
pub struct TfidfVectorizer {
    /// term -> column index
    vocabulary: HashMap<String, usize>,
    /// per-column inverse-document-frequency weight
    idf: Vec<f64>,
    #[serde(skip)]
    feature_names: Vec<String>,
}

impl TfidfVectorizer {
    pub fn new(vocabulary: HashMap<String, usize>, idf: Vec<f64>) -> Result<Self, PipelineError> {
        if idf.len() != vocabulary.len() {
            return Err(PipelineError::artifact(format!(
                "vectorizer vocabulary has {} terms but {} idf weights",
                vocabulary.len(),
                idf.len()
            )));
        }
        for (term, &idx) in &vocabulary {
            if idx >= idf.len() {
                return Err(PipelineError::artifact(format!(
                    "vectorizer term '{term}' maps to out-of-range index {idx}"
                )));
            }
        }

        let mut feature_names = vec![String::new(); vocabulary.len()];
        for (term, &idx) in &vocabulary {
            feature_names[idx] = term.clone();
        }

        Ok(Self {
            vocabulary,
            idf,
            feature_names,
        })
    }

    /// Deserialize from the persisted JSON artifact:
    /// `{"vocabulary": {"term": idx, ...}, "idf": [w0, w1, ...]}`.
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, PipelineError> {
        let raw: TfidfVectorizer = serde_json::from_slice(bytes)
            .map_err(|e| PipelineError::artifact(format!("invalid vectorizer artifact: {e}")))?;
        Self::new(raw.vocabulary, raw.idf)
    }

    /// Transform normalized text into a dense TF-IDF vector.
    pub fn transform(&self, text: &str) -> Vec<f64> {
        let mut tf = vec![0.0; self.idf.len()];

        for token in tokenize(text) {
            if let Some(&idx) = self.vocabulary.get(token) {
                tf[idx] += 1.0;
            }
        }

        for (value, weight) in tf.iter_mut().zip(self.idf.iter()) {
            *value *= weight;
        }

        let norm = tf.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in &mut tf {
                *value /= norm;
            }
        }

        tf
    }

    /// Column names in index order, for optional schema alignment.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

/// Word tokens of length >= 2, split on non-alphanumeric characters.
///
/// Matches the training-side tokenization; input is already normalized so
/// punctuation and digit runs are gone before this runs.
fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
}
