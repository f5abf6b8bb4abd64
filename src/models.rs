use serde::Deserialize;
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// The two independently trained classifier families scored per input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    /// Random-forest-style ensemble.
    Ensemble,
    /// Linear logistic-style classifier.
    Linear,
}

impl FromStr for ModelFamily {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ensemble" | "rf" => Ok(ModelFamily::Ensemble),
            "linear" | "lr" => Ok(ModelFamily::Linear),
            other => Err(PipelineError::invalid_argument(format!(
                "model_family must be 'ensemble' or 'linear', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ModelFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelFamily::Ensemble => write!(f, "ensemble"),
            ModelFamily::Linear => write!(f, "linear"),
        }
    }
}

/// Minimal capability surface any loaded model must satisfy.
///
/// Implementations are stateless after load and safe for concurrent
/// read-only use, so one loaded model serves every inference call.
pub trait Classifier: Send + Sync {
    /// Probability mass per class as `[p_safe, p_phishing]`, summing to 1.0.
    fn predict_probability(&self, features: &[f64]) -> Result<[f64; 2], PipelineError>;

    /// Argmax class: 0 = safe, 1 = phishing.
    fn predict_class(&self, features: &[f64]) -> Result<u8, PipelineError> {
        let [_, p_phishing] = self.predict_probability(features)?;
        Ok(u8::from(p_phishing >= 0.5))
    }
}

/// One fitted decision tree in flat-array form.
///
/// `feature[i] < 0` marks node `i` as a leaf; `value[i]` holds the class
/// counts (or proportions) observed at that node during training.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub left: Vec<i64>,
    pub right: Vec<i64>,
    pub value: Vec<[f64; 2]>,
}

impl DecisionTree {
    fn validate(&self) -> Result<(), PipelineError> {
        let n = self.feature.len();
        if n == 0 {
            return Err(PipelineError::artifact("decision tree has no nodes"));
        }
        if [
            self.threshold.len(),
            self.left.len(),
            self.right.len(),
            self.value.len(),
        ]
        .iter()
        .any(|len| *len != n)
        {
            return Err(PipelineError::artifact(
                "decision tree node arrays have inconsistent lengths",
            ));
        }
        Ok(())
    }

    /// Walk from the root to a leaf and return its class distribution.
    fn leaf_distribution(&self, features: &[f64]) -> Result<[f64; 2], PipelineError> {
        let n = self.feature.len();
        let mut node = 0usize;

        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..n {
            let feature_idx = self.feature[node];
            if feature_idx < 0 {
                let [safe, phishing] = self.value[node];
                let total = safe + phishing;
                if total > 0.0 {
                    return Ok([safe / total, phishing / total]);
                }
                return Ok([0.5, 0.5]);
            }

            let feature_idx = feature_idx as usize;
            let value = features.get(feature_idx).copied().ok_or_else(|| {
                PipelineError::model(format!(
                    "tree split on feature {feature_idx} but input has {} columns",
                    features.len()
                ))
            })?;

            let child = if value <= self.threshold[node] {
                self.left[node]
            } else {
                self.right[node]
            };
            if child < 0 || child as usize >= n {
                return Err(PipelineError::model(format!(
                    "tree child index {child} out of range"
                )));
            }
            node = child as usize;
        }

        Err(PipelineError::model("tree traversal did not reach a leaf"))
    }
}

/// Random-forest classifier: mean of the per-tree leaf distributions.
#[derive(Debug, Clone, Deserialize)]
pub struct RandomForestClassifier {
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForestClassifier {
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, PipelineError> {
        let forest: RandomForestClassifier = serde_json::from_slice(bytes)
            .map_err(|e| PipelineError::artifact(format!("invalid forest artifact: {e}")))?;
        if forest.trees.is_empty() {
            return Err(PipelineError::artifact("forest artifact has no trees"));
        }
        for tree in &forest.trees {
            tree.validate()?;
        }
        Ok(forest)
    }
}

impl Classifier for RandomForestClassifier {
    fn predict_probability(&self, features: &[f64]) -> Result<[f64; 2], PipelineError> {
        if features.len() != self.n_features {
            return Err(PipelineError::model(format!(
                "forest expects {} features, got {}",
                self.n_features,
                features.len()
            )));
        }

        let mut sum = [0.0, 0.0];
        for tree in &self.trees {
            let [safe, phishing] = tree.leaf_distribution(features)?;
            sum[0] += safe;
            sum[1] += phishing;
        }
        let count = self.trees.len() as f64;
        Ok([sum[0] / count, sum[1] / count])
    }
}

/// Logistic-regression classifier over the same feature representation.
#[derive(Debug, Clone, Deserialize)]
pub struct LogisticRegressionClassifier {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LogisticRegressionClassifier {
    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self, PipelineError> {
        let model: LogisticRegressionClassifier = serde_json::from_slice(bytes).map_err(|e| {
            PipelineError::artifact(format!("invalid logistic-regression artifact: {e}"))
        })?;
        if model.coefficients.is_empty() {
            return Err(PipelineError::artifact(
                "logistic-regression artifact has no coefficients",
            ));
        }
        Ok(model)
    }
}

impl Classifier for LogisticRegressionClassifier {
    fn predict_probability(&self, features: &[f64]) -> Result<[f64; 2], PipelineError> {
        if features.len() != self.coefficients.len() {
            return Err(PipelineError::model(format!(
                "logistic regression expects {} features, got {}",
                self.coefficients.len(),
                features.len()
            )));
        }

        let z: f64 = self
            .coefficients
            .iter()
            .zip(features.iter())
            .map(|(c, x)| c * x)
            .sum::<f64>()
            + self.intercept;
        let p_phishing = 1.0 / (1.0 + (-z).exp());
        Ok([1.0 - p_phishing, p_phishing])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Single split on feature 0 at 0.5; left leaf mostly safe, right leaf
    /// mostly phishing.
    fn stub_tree() -> DecisionTree {
        DecisionTree {
            feature: vec![0, -1, -1],
            threshold: vec![0.5, 0.0, 0.0],
            left: vec![1, -1, -1],
            right: vec![2, -1, -1],
            value: vec![[0.0, 0.0], [9.0, 1.0], [2.0, 8.0]],
        }
    }

    #[test]
    fn test_model_family_parsing() {
        assert_eq!("ensemble".parse::<ModelFamily>().unwrap(), ModelFamily::Ensemble);
        assert_eq!("rf".parse::<ModelFamily>().unwrap(), ModelFamily::Ensemble);
        assert_eq!("Linear".parse::<ModelFamily>().unwrap(), ModelFamily::Linear);
        assert_eq!("lr".parse::<ModelFamily>().unwrap(), ModelFamily::Linear);
        assert!("bogus".parse::<ModelFamily>().is_err());
    }

    #[test]
    fn test_tree_traversal() {
        let tree = stub_tree();
        assert_eq!(tree.leaf_distribution(&[0.0, 0.0]).unwrap(), [0.9, 0.1]);
        assert_eq!(tree.leaf_distribution(&[1.0, 0.0]).unwrap(), [0.2, 0.8]);
    }

    #[test]
    fn test_forest_averages_trees() {
        let forest = RandomForestClassifier {
            n_features: 2,
            trees: vec![
                stub_tree(),
                DecisionTree {
                    feature: vec![-1],
                    threshold: vec![0.0],
                    left: vec![-1],
                    right: vec![-1],
                    value: vec![[1.0, 1.0]],
                },
            ],
        };
        let [safe, phishing] = forest.predict_probability(&[1.0, 0.0]).unwrap();
        // (0.2 + 0.5) / 2 and (0.8 + 0.5) / 2
        assert!((safe - 0.35).abs() < 1e-12);
        assert!((phishing - 0.65).abs() < 1e-12);
        assert!((safe + phishing - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_forest_feature_width_check() {
        let forest = RandomForestClassifier {
            n_features: 2,
            trees: vec![stub_tree()],
        };
        assert!(forest.predict_probability(&[1.0]).is_err());
    }

    #[test]
    fn test_logistic_regression_sigmoid() {
        let model = LogisticRegressionClassifier {
            coefficients: vec![1.0, -1.0],
            intercept: 0.0,
        };
        let [safe, phishing] = model.predict_probability(&[0.0, 0.0]).unwrap();
        assert!((phishing - 0.5).abs() < 1e-12);
        assert!((safe + phishing - 1.0).abs() < 1e-12);

        let [_, phishing] = model.predict_probability(&[10.0, 0.0]).unwrap();
        assert!(phishing > 0.99);

        let [_, phishing] = model.predict_probability(&[0.0, 10.0]).unwrap();
        assert!(phishing < 0.01);
    }

    #[test]
    fn test_predict_class_argmax() {
        let model = LogisticRegressionClassifier {
            coefficients: vec![1.0],
            intercept: 0.0,
        };
        assert_eq!(model.predict_class(&[5.0]).unwrap(), 1);
        assert_eq!(model.predict_class(&[-5.0]).unwrap(), 0);
    }

    #[test]
    fn test_forest_artifact_parsing() {
        let json = br#"{
            "n_features": 2,
            "trees": [{
                "feature": [0, -1, -1],
                "threshold": [0.5, 0.0, 0.0],
                "left": [1, -1, -1],
                "right": [2, -1, -1],
                "value": [[0.0, 0.0], [9.0, 1.0], [2.0, 8.0]]
            }]
        }"#;
        let forest = RandomForestClassifier::from_json_bytes(json).unwrap();
        assert_eq!(forest.trees.len(), 1);

        assert!(RandomForestClassifier::from_json_bytes(
            br#"{"n_features": 2, "trees": []}"#
        )
        .is_err());
    }

    #[test]
    fn test_tree_validation_rejects_ragged_arrays() {
        let tree = DecisionTree {
            feature: vec![-1, -1],
            threshold: vec![0.0],
            left: vec![-1, -1],
            right: vec![-1, -1],
            value: vec![[1.0, 0.0], [1.0, 0.0]],
        };
        assert!(tree.validate().is_err());
    }
}
