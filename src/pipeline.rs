use log::{debug, info};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::artifacts::ArtifactStore;
use crate::config::{PipelineConfig, ThresholdConfig};
use crate::error::PipelineError;
use crate::models::{
    Classifier, LogisticRegressionClassifier, ModelFamily, RandomForestClassifier,
};
use crate::normalization::TextNormalizer;
use crate::scaler::StandardScaler;
use crate::schema::FeatureSchema;
use crate::url_features::UrlFeatureExtractor;
use crate::vectorizer::TfidfVectorizer;

/// Classification outcome labels, serialized with the wire strings callers
/// already match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Label {
    #[serde(rename = "Safe")]
    Safe,
    #[serde(rename = "Phishing/Malicious")]
    Phishing,
    #[serde(rename = "Error")]
    Error,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Label::Safe => write!(f, "Safe"),
            Label::Phishing => write!(f, "Phishing/Malicious"),
            Label::Error => write!(f, "Error"),
        }
    }
}

/// Result of one prediction call. Ephemeral, produced fresh per call.
///
/// Per-call failures surface as `label == Error` with `confidence` 0.0 and a
/// message in `error`; callers check the label, not an exception channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub label: Label,
    /// Certainty of the chosen label, in [0, 100]; >= 50 for real labels.
    pub confidence: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResult {
    pub fn error(err: &PipelineError) -> Self {
        Self {
            label: Label::Error,
            confidence: 0.0,
            error: Some(err.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.label == Label::Error
    }
}

/// Input domains the pipeline classifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputType {
    Email,
    Url,
}

impl FromStr for InputType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "email" => Ok(InputType::Email),
            "url" => Ok(InputType::Url),
            other => Err(PipelineError::invalid_argument(format!(
                "input_type must be 'email' or 'url', got '{other}'"
            ))),
        }
    }
}

/// Pick the result with the higher confidence; ties keep the first, so
/// callers pass the ensemble result first for a deterministic tie-break.
pub fn arbitrate(first: PredictionResult, second: PredictionResult) -> PredictionResult {
    if first.confidence >= second.confidence {
        first
    } else {
        second
    }
}

/// Immutable inference state: every artifact loaded once, shared read-only
/// across all prediction calls. Construction fails on any missing or
/// inconsistent artifact rather than leaving a partially loaded pipeline.
#[derive(Debug)]
pub struct PipelineContext {
    normalizer: TextNormalizer,
    url_extractor: UrlFeatureExtractor,
    vectorizer: TfidfVectorizer,
    email_schema: Option<FeatureSchema>,
    url_schema: FeatureSchema,
    url_scaler: StandardScaler,
    email_ensemble: RandomForestClassifier,
    email_linear: LogisticRegressionClassifier,
    url_ensemble: RandomForestClassifier,
    url_linear: LogisticRegressionClassifier,
    thresholds: ThresholdConfig,
}

impl PipelineContext {
    /// Load every artifact the configuration names from `store`.
    pub fn load(
        store: &dyn ArtifactStore,
        config: &PipelineConfig,
    ) -> Result<Self, PipelineError> {
        let names = &config.artifact_names;

        let vectorizer =
            TfidfVectorizer::from_json_bytes(&store.load_bytes(&names.tfidf_vectorizer)?)?;
        let email_schema = match store.load_optional(&names.email_feature_columns)? {
            Some(bytes) => Some(FeatureSchema::from_json_bytes(&bytes)?),
            None => None,
        };
        let url_schema =
            FeatureSchema::from_json_bytes(&store.load_bytes(&names.url_feature_columns)?)?;
        let url_scaler = StandardScaler::from_json_bytes(&store.load_bytes(&names.url_scaler)?)?;

        let email_ensemble = RandomForestClassifier::from_json_bytes(
            &store.load_bytes(&names.email_ensemble_model)?,
        )?;
        let email_linear = LogisticRegressionClassifier::from_json_bytes(
            &store.load_bytes(&names.email_linear_model)?,
        )?;
        let url_ensemble =
            RandomForestClassifier::from_json_bytes(&store.load_bytes(&names.url_ensemble_model)?)?;
        let url_linear = LogisticRegressionClassifier::from_json_bytes(
            &store.load_bytes(&names.url_linear_model)?,
        )?;

        let context = Self {
            normalizer: TextNormalizer::new(),
            url_extractor: UrlFeatureExtractor::new(),
            vectorizer,
            email_schema,
            url_schema,
            url_scaler,
            email_ensemble,
            email_linear,
            url_ensemble,
            url_linear,
            thresholds: config.thresholds,
        };
        context.check_widths()?;

        info!(
            "pipeline ready: {} vocabulary terms, {} url columns, email alignment {}",
            context.vectorizer.vocabulary_size(),
            context.url_schema.len(),
            if context.email_schema.is_some() {
                "on"
            } else {
                "off"
            }
        );
        Ok(context)
    }

    /// Cross-artifact width consistency. Catching drift here keeps a corrupt
    /// artifact set from serving scrambled predictions later.
    fn check_widths(&self) -> Result<(), PipelineError> {
        let url_width = self.url_schema.len();
        if self.url_scaler.len() != url_width {
            return Err(PipelineError::artifact(format!(
                "url scaler covers {} columns but schema has {url_width}",
                self.url_scaler.len()
            )));
        }
        if self.url_ensemble.n_features != url_width {
            return Err(PipelineError::artifact(format!(
                "url ensemble model expects {} features but schema has {url_width}",
                self.url_ensemble.n_features
            )));
        }
        if self.url_linear.coefficients.len() != url_width {
            return Err(PipelineError::artifact(format!(
                "url linear model expects {} features but schema has {url_width}",
                self.url_linear.coefficients.len()
            )));
        }

        let email_width = self
            .email_schema
            .as_ref()
            .map(|s| s.len())
            .unwrap_or_else(|| self.vectorizer.vocabulary_size());
        if self.email_ensemble.n_features != email_width {
            return Err(PipelineError::artifact(format!(
                "email ensemble model expects {} features but input width is {email_width}",
                self.email_ensemble.n_features
            )));
        }
        if self.email_linear.coefficients.len() != email_width {
            return Err(PipelineError::artifact(format!(
                "email linear model expects {} features but input width is {email_width}",
                self.email_linear.coefficients.len()
            )));
        }
        Ok(())
    }

    /// Classify raw email text with one model family.
    pub fn predict_email(&self, text: &str, family: ModelFamily) -> PredictionResult {
        match self.score_email(text, family) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("email prediction failed: {e}");
                PredictionResult::error(&e)
            }
        }
    }

    /// Classify a raw URL string with one model family.
    pub fn predict_url(&self, url: &str, family: ModelFamily) -> PredictionResult {
        match self.score_url(url, family) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("url prediction failed: {e}");
                PredictionResult::error(&e)
            }
        }
    }

    /// Run both model families on one input and return the arbitrated result.
    ///
    /// Rejects empty input and unknown input types up front; those are
    /// caller mistakes, not pipeline faults, so they come back as `Err`
    /// rather than the sentinel.
    pub fn predict(&self, input: &str, input_type: &str) -> Result<PredictionResult, PipelineError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PipelineError::invalid_argument("input must not be empty"));
        }
        let input_type: InputType = input_type.parse()?;
        Ok(self.predict_arbitrated(input, input_type))
    }

    /// Dual-model scoring for an already-validated input.
    pub fn predict_arbitrated(&self, input: &str, input_type: InputType) -> PredictionResult {
        let (ensemble, linear) = match input_type {
            InputType::Email => (
                self.predict_email(input, ModelFamily::Ensemble),
                self.predict_email(input, ModelFamily::Linear),
            ),
            InputType::Url => (
                self.predict_url(input, ModelFamily::Ensemble),
                self.predict_url(input, ModelFamily::Linear),
            ),
        };
        debug!(
            "arbitration: ensemble {:.2} ({}) vs linear {:.2} ({})",
            ensemble.confidence, ensemble.label, linear.confidence, linear.label
        );
        arbitrate(ensemble, linear)
    }

    fn score_email(
        &self,
        text: &str,
        family: ModelFamily,
    ) -> Result<PredictionResult, PipelineError> {
        let normalized = self.normalizer.normalize(text);
        let dense = self.vectorizer.transform(&normalized);

        let features = match &self.email_schema {
            Some(schema) => schema
                .align_named(self.vectorizer.feature_names(), &dense)
                .values()
                .to_vec(),
            None => dense,
        };

        let [_, p_phishing] = self.email_model(family).predict_probability(&features)?;
        debug!("email {family} model: p_phishing={p_phishing:.4}");
        Ok(self.decision(p_phishing, self.thresholds.email))
    }

    fn score_url(&self, url: &str, family: ModelFamily) -> Result<PredictionResult, PipelineError> {
        let raw = self.url_extractor.extract(url);
        let aligned = self.url_schema.align(&raw);
        let scaled = self.url_scaler.transform(aligned.values())?;

        let [_, p_phishing] = self.url_model(family).predict_probability(&scaled)?;
        debug!("url {family} model: p_phishing={p_phishing:.4}");
        Ok(self.decision(p_phishing, self.thresholds.url))
    }

    fn email_model(&self, family: ModelFamily) -> &dyn Classifier {
        match family {
            ModelFamily::Ensemble => &self.email_ensemble,
            ModelFamily::Linear => &self.email_linear,
        }
    }

    fn url_model(&self, family: ModelFamily) -> &dyn Classifier {
        match family {
            ModelFamily::Ensemble => &self.url_ensemble,
            ModelFamily::Linear => &self.url_linear,
        }
    }

    /// Threshold the phishing probability and report label certainty.
    ///
    /// The boundary is inclusive: a probability exactly at the threshold
    /// classifies as phishing.
    fn decision(&self, p_phishing: f64, threshold: f64) -> PredictionResult {
        let label = if p_phishing >= threshold {
            Label::Phishing
        } else {
            Label::Safe
        };
        let confidence = round2(p_phishing.max(1.0 - p_phishing) * 100.0);
        PredictionResult {
            label,
            confidence,
            error: None,
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::MemoryStore;

    const URL_COLUMNS: &str = r#"["NoHttps", "NumSensitiveWords", "EmbeddedBrandName", "NumDash"]"#;
    const IDENTITY_SCALER: &str = r#"{"mean": [0.0, 0.0, 0.0, 0.0], "std": [1.0, 1.0, 1.0, 1.0]}"#;

    /// Split on NoHttps: https URLs land in a mostly-safe leaf, plain http in
    /// a mostly-phishing leaf.
    const URL_FOREST: &str = r#"{
        "n_features": 4,
        "trees": [{
            "feature": [0, -1, -1],
            "threshold": [0.5, 0.0, 0.0],
            "left": [1, -1, -1],
            "right": [2, -1, -1],
            "value": [[0.0, 0.0], [9.0, 1.0], [1.0, 9.0]]
        }]
    }"#;
    const URL_LINEAR: &str =
        r#"{"coefficients": [2.0, 1.0, 0.5, 0.0], "intercept": -3.0}"#;

    const EMAIL_VECTORIZER: &str = r#"{
        "vocabulary": {"verify": 0, "account": 1, "blocked": 2},
        "idf": [1.0, 1.0, 1.0]
    }"#;
    const EMAIL_FOREST: &str = r#"{
        "n_features": 3,
        "trees": [{
            "feature": [0, -1, -1],
            "threshold": [0.1, 0.0, 0.0],
            "left": [1, -1, -1],
            "right": [2, -1, -1],
            "value": [[0.0, 0.0], [8.0, 2.0], [1.0, 9.0]]
        }]
    }"#;
    const EMAIL_LINEAR: &str = r#"{"coefficients": [3.0, 3.0, 3.0], "intercept": -2.0}"#;

    fn stub_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert("tfidf_vectorizer.json", EMAIL_VECTORIZER);
        store.insert("url_feature_columns.json", URL_COLUMNS);
        store.insert("url_scaler.json", IDENTITY_SCALER);
        store.insert("email_rf_model.json", EMAIL_FOREST);
        store.insert("email_lr_model.json", EMAIL_LINEAR);
        store.insert("url_rf_model.json", URL_FOREST);
        store.insert("url_lr_model.json", URL_LINEAR);
        store
    }

    fn context() -> PipelineContext {
        PipelineContext::load(&stub_store(), &PipelineConfig::default()).unwrap()
    }

    #[test]
    fn test_load_fails_on_missing_artifact() {
        let mut store = MemoryStore::new();
        store.insert("tfidf_vectorizer.json", EMAIL_VECTORIZER);
        let err = PipelineContext::load(&store, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Artifact(_)));
    }

    #[test]
    fn test_load_fails_on_width_drift() {
        let mut store = stub_store();
        // scaler narrower than the url schema
        store.insert("url_scaler.json", r#"{"mean": [0.0], "std": [1.0]}"#);
        let err = PipelineContext::load(&store, &PipelineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("scaler"));
    }

    #[test]
    fn test_safe_url_end_to_end() {
        let ctx = context();
        let result = ctx.predict_url("https://www.google.com/", ModelFamily::Ensemble);
        assert_eq!(result.label, Label::Safe);
        assert!(result.confidence >= 50.0 && result.confidence <= 100.0);
        assert!(result.error.is_none());
    }

    #[test]
    fn test_phishing_url_end_to_end() {
        let ctx = context();
        let url = "http://login-paypal-security.com/account/verify";

        let ensemble = ctx.predict_url(url, ModelFamily::Ensemble);
        assert_eq!(ensemble.label, Label::Phishing);

        let linear = ctx.predict_url(url, ModelFamily::Linear);
        // NoHttps=1, four sensitive words, one brand: well past the bar
        assert_eq!(linear.label, Label::Phishing);
        assert!(linear.confidence > 90.0);
    }

    #[test]
    fn test_phishing_email_end_to_end() {
        let ctx = context();
        let text = "Verify your bank account immediately or it will be blocked.";

        let result = ctx.predict_email(text, ModelFamily::Linear);
        assert_eq!(result.label, Label::Phishing);
        assert!(result.confidence > 90.0);

        let result = ctx.predict_email(text, ModelFamily::Ensemble);
        assert_eq!(result.label, Label::Phishing);
    }

    #[test]
    fn test_benign_email() {
        let ctx = context();
        let result = ctx.predict_email("see you at lunch tomorrow", ModelFamily::Linear);
        // no vocabulary hits: z = intercept only
        assert_eq!(result.label, Label::Safe);
    }

    #[test]
    fn test_predict_arbitrates_by_confidence() {
        let ctx = context();
        let text = "Verify your bank account immediately or it will be blocked.";

        let ensemble = ctx.predict_email(text, ModelFamily::Ensemble);
        let linear = ctx.predict_email(text, ModelFamily::Linear);
        let arbitrated = ctx.predict(text, "email").unwrap();

        let expected = if ensemble.confidence >= linear.confidence {
            ensemble
        } else {
            linear
        };
        assert_eq!(arbitrated, expected);
    }

    #[test]
    fn test_predict_repeated_calls_deterministic() {
        let ctx = context();
        let first = ctx.predict("https://www.google.com/", "url").unwrap();
        for _ in 0..5 {
            assert_eq!(ctx.predict("https://www.google.com/", "url").unwrap(), first);
        }
    }

    #[test]
    fn test_predict_rejects_bogus_input_type() {
        let ctx = context();
        let err = ctx.predict("anything", "bogus").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidArgument(_)));
    }

    #[test]
    fn test_predict_rejects_empty_input() {
        let ctx = context();
        assert!(ctx.predict("", "email").is_err());
        assert!(ctx.predict("   ", "url").is_err());
    }

    #[test]
    fn test_threshold_boundary_inclusive() {
        let ctx = context();
        // email threshold is 0.70
        assert_eq!(ctx.decision(0.70, 0.70).label, Label::Phishing);
        assert_eq!(ctx.decision(0.6999, 0.70).label, Label::Safe);
        // url threshold is 0.75
        assert_eq!(ctx.decision(0.75, 0.75).label, Label::Phishing);
        assert_eq!(ctx.decision(0.7499, 0.75).label, Label::Safe);
    }

    #[test]
    fn test_confidence_formula() {
        let ctx = context();
        let result = ctx.decision(0.6999, 0.70);
        assert_eq!(result.confidence, 69.99);

        let result = ctx.decision(0.123456, 0.70);
        assert_eq!(result.confidence, 87.65);

        let result = ctx.decision(0.5, 0.70);
        assert_eq!(result.confidence, 50.0);
    }

    #[test]
    fn test_arbitrate_tie_keeps_first() {
        let a = PredictionResult {
            label: Label::Safe,
            confidence: 80.0,
            error: None,
        };
        let b = PredictionResult {
            label: Label::Phishing,
            confidence: 80.0,
            error: None,
        };
        assert_eq!(arbitrate(a.clone(), b.clone()), a);
        assert_eq!(arbitrate(b.clone(), a), b);
    }

    #[test]
    fn test_error_sentinel_on_corrupt_model() {
        let mut store = stub_store();
        // tree splits on a feature index the email vector does not have
        store.insert(
            "email_rf_model.json",
            r#"{
                "n_features": 3,
                "trees": [{
                    "feature": [7, -1, -1],
                    "threshold": [0.5, 0.0, 0.0],
                    "left": [1, -1, -1],
                    "right": [2, -1, -1],
                    "value": [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]
                }]
            }"#,
        );
        let ctx = PipelineContext::load(&store, &PipelineConfig::default()).unwrap();

        let result = ctx.predict_email("verify account", ModelFamily::Ensemble);
        assert_eq!(result.label, Label::Error);
        assert_eq!(result.confidence, 0.0);
        assert!(result.error.is_some());
        assert!(result.is_error());
    }

    #[test]
    fn test_optional_email_schema_alignment() {
        let mut store = stub_store();
        store.insert("email_feature_columns.json", r#"["verify"]"#);
        // aligned width is 1, so the email models shrink to match
        store.insert(
            "email_rf_model.json",
            r#"{
                "n_features": 1,
                "trees": [{
                    "feature": [0, -1, -1],
                    "threshold": [0.5, 0.0, 0.0],
                    "left": [1, -1, -1],
                    "right": [2, -1, -1],
                    "value": [[0.0, 0.0], [9.0, 1.0], [1.0, 9.0]]
                }]
            }"#,
        );
        store.insert(
            "email_lr_model.json",
            r#"{"coefficients": [10.0], "intercept": -5.0}"#,
        );
        let ctx = PipelineContext::load(&store, &PipelineConfig::default()).unwrap();

        let result = ctx.predict_email("verify", ModelFamily::Linear);
        assert_eq!(result.label, Label::Phishing);

        let result = ctx.predict_email("blocked account", ModelFamily::Linear);
        assert_eq!(result.label, Label::Safe);
    }

    #[test]
    fn test_url_features_align_exactly_to_schema() {
        let extractor = UrlFeatureExtractor::new();
        let raw = extractor.extract("https://www.google.com/");

        let mut columns: Vec<String> = raw.keys().cloned().collect();
        columns.sort();
        columns.push("ExtraTrainingColumn".to_string());

        let schema = FeatureSchema::new(columns.clone());
        let aligned = schema.align(&raw);
        assert_eq!(aligned.columns(), columns.as_slice());
        assert_eq!(aligned.get("ExtraTrainingColumn"), Some(0.0));
    }

    #[test]
    fn test_label_serialization() {
        let result = PredictionResult {
            label: Label::Phishing,
            confidence: 96.07,
            error: None,
        };
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains(r#""label":"Phishing/Malicious""#));
        assert!(!json.contains("error"));

        let sentinel = PredictionResult::error(&PipelineError::model("boom"));
        let json = serde_json::to_string(&sentinel).unwrap();
        assert!(json.contains(r#""label":"Error""#));
        assert!(json.contains("boom"));
    }

    #[test]
    fn test_input_type_parsing() {
        assert_eq!("email".parse::<InputType>().unwrap(), InputType::Email);
        assert_eq!("URL".parse::<InputType>().unwrap(), InputType::Url);
        assert!("dns".parse::<InputType>().is_err());
    }
}
