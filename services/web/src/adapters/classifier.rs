//! services/web/src/adapters/classifier.rs
//!
//! This module contains the classifier adapter, which is the concrete implementation
//! of the `ClassifierLoader` and `SentenceClassifier` ports. It reads a TF-IDF
//! vectorizer and a logistic regression model exported to JSON and applies them.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use show_tell_core::ports::{ClassifierLoader, PortError, PortResult, SentenceClassifier};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info};

const DEFAULT_TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

//=========================================================================================
// Artifact Formats
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Norm {
    L1,
    L2,
}

/// The exported vectorizer parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorizerArtifact {
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f64>,
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub sublinear_tf: bool,
    #[serde(default = "default_norm")]
    pub norm: Option<Norm>,
    #[serde(default = "default_token_pattern")]
    pub token_pattern: String,
}

/// The exported binary logistic regression parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelArtifact {
    pub coef: Vec<f64>,
    pub intercept: f64,
    #[serde(default = "default_classes")]
    pub classes: [u8; 2],
}

fn default_true() -> bool {
    true
}
fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}
fn default_norm() -> Option<Norm> {
    Some(Norm::L2)
}
fn default_token_pattern() -> String {
    DEFAULT_TOKEN_PATTERN.to_string()
}
fn default_classes() -> [u8; 2] {
    [0, 1]
}

//=========================================================================================
// Vectorizer
//=========================================================================================

/// A fitted TF-IDF vectorizer.
#[derive(Debug)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    lowercase: bool,
    ngram_range: (usize, usize),
    sublinear_tf: bool,
    norm: Option<Norm>,
    token_pattern: Regex,
}

impl TfidfVectorizer {
    pub fn from_artifact(artifact: VectorizerArtifact) -> PortResult<Self> {
        let (min_n, max_n) = artifact.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(invalid(format!("bad ngram_range ({}, {})", min_n, max_n)));
        }
        if artifact.idf.len() != artifact.vocabulary.len() {
            return Err(invalid(format!(
                "idf has {} entries but the vocabulary has {}",
                artifact.idf.len(),
                artifact.vocabulary.len()
            )));
        }
        if let Some((term, column)) = artifact
            .vocabulary
            .iter()
            .find(|(_, column)| **column >= artifact.idf.len())
        {
            return Err(invalid(format!("term '{}' maps to column {} out of range", term, column)));
        }
        let token_pattern = Regex::new(&artifact.token_pattern)
            .map_err(|e| invalid(format!("bad token_pattern: {}", e)))?;

        Ok(Self {
            vocabulary: artifact.vocabulary,
            idf: artifact.idf,
            lowercase: artifact.lowercase,
            ngram_range: artifact.ngram_range,
            sublinear_tf: artifact.sublinear_tf,
            norm: artifact.norm,
            token_pattern,
        })
    }

    pub fn features(&self) -> usize {
        self.idf.len()
    }

    /// Tokens and n-grams of one document, unigrams first.
    fn analyze(&self, text: &str) -> Vec<String> {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        let tokens: Vec<&str> = self.token_pattern.find_iter(&text).map(|m| m.as_str()).collect();

        let (min_n, max_n) = self.ngram_range;
        let mut grams = Vec::new();
        for n in min_n..=max_n.min(tokens.len()) {
            grams.extend(tokens.windows(n).map(|w| w.join(" ")));
        }
        grams
    }

    /// Sparse TF-IDF row for one document, keyed by column.
    pub fn transform(&self, text: &str) -> BTreeMap<usize, f64> {
        let mut row: BTreeMap<usize, f64> = BTreeMap::new();
        for gram in self.analyze(text) {
            if let Some(&column) = self.vocabulary.get(&gram) {
                *row.entry(column).or_insert(0.0) += 1.0;
            }
        }

        for (column, value) in row.iter_mut() {
            let tf = if self.sublinear_tf { 1.0 + value.ln() } else { *value };
            *value = tf * self.idf[*column];
        }

        let norm = match self.norm {
            Some(Norm::L2) => row.values().map(|v| v * v).sum::<f64>().sqrt(),
            Some(Norm::L1) => row.values().map(|v| v.abs()).sum::<f64>(),
            None => 0.0,
        };
        if norm > 0.0 {
            row.values_mut().for_each(|v| *v /= norm);
        }
        row
    }
}

//=========================================================================================
// Model
//=========================================================================================

/// The vectorizer and a linear decision function over its features.
#[derive(Debug)]
pub struct LogisticClassifier {
    vectorizer: TfidfVectorizer,
    coef: Vec<f64>,
    intercept: f64,
    classes: [u8; 2],
}

impl LogisticClassifier {
    pub fn new(vectorizer: TfidfVectorizer, model: ModelArtifact) -> PortResult<Self> {
        if model.coef.len() != vectorizer.features() {
            return Err(invalid(format!(
                "model has {} coefficients but the vectorizer has {} features",
                model.coef.len(),
                vectorizer.features()
            )));
        }
        let mut classes = model.classes;
        classes.sort_unstable();
        if classes != [0, 1] {
            return Err(invalid(format!("classes must be 0 and 1, got {:?}", model.classes)));
        }
        Ok(Self {
            vectorizer,
            coef: model.coef,
            intercept: model.intercept,
            classes: model.classes,
        })
    }

    pub fn decision(&self, sentence: &str) -> f64 {
        self.vectorizer
            .transform(sentence)
            .iter()
            .map(|(column, value)| self.coef[*column] * value)
            .sum::<f64>()
            + self.intercept
    }
}

impl SentenceClassifier for LogisticClassifier {
    fn predict(&self, sentences: &[String]) -> PortResult<Vec<u8>> {
        Ok(sentences
            .iter()
            .map(|s| {
                if self.decision(s) > 0.0 {
                    self.classes[1]
                } else {
                    self.classes[0]
                }
            })
            .collect())
    }
}

//=========================================================================================
// The Loader Adapter
//=========================================================================================

/// Loads the artifacts from fixed paths on first use and keeps them for the
/// lifetime of the process. A failed load is not cached.
pub struct JsonClassifierLoader {
    model_path: PathBuf,
    vectorizer_path: PathBuf,
    loaded: OnceCell<Arc<LogisticClassifier>>,
}

impl JsonClassifierLoader {
    pub fn new(model_path: PathBuf, vectorizer_path: PathBuf) -> Self {
        Self {
            model_path,
            vectorizer_path,
            loaded: OnceCell::new(),
        }
    }

    async fn read_artifacts(&self) -> PortResult<Arc<LogisticClassifier>> {
        let vectorizer: VectorizerArtifact = read_json(&self.vectorizer_path).await?;
        let model: ModelArtifact = read_json(&self.model_path).await?;
        let classifier = LogisticClassifier::new(TfidfVectorizer::from_artifact(vectorizer)?, model)?;
        info!(
            features = classifier.coef.len(),
            "Loaded classifier from {}",
            self.model_path.display()
        );
        Ok(Arc::new(classifier))
    }
}

#[async_trait]
impl ClassifierLoader for JsonClassifierLoader {
    async fn load(&self) -> PortResult<Arc<dyn SentenceClassifier>> {
        let classifier = self
            .loaded
            .get_or_try_init(|| self.read_artifacts())
            .await
            .map_err(|e| {
                error!("Failed to load classifier artifacts: {}", e);
                e
            })?;
        Ok(classifier.clone() as Arc<dyn SentenceClassifier>)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> PortResult<T> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| PortError::Unavailable(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw).map_err(|e| invalid(format!("{}: {}", path.display(), e)))
}

fn invalid(message: String) -> PortError {
    PortError::Unexpected(format!("Invalid classifier artifact: {}", message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vectorizer(extra: serde_json::Value) -> TfidfVectorizer {
        let mut base = json!({
            "vocabulary": {"rose": 0, "sharply": 1, "felt": 2, "proud": 3},
            "idf": [1.0, 2.0, 1.0, 1.0]
        });
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        TfidfVectorizer::from_artifact(serde_json::from_value(base).unwrap()).unwrap()
    }

    fn model(coef: Vec<f64>) -> ModelArtifact {
        ModelArtifact { coef, intercept: 0.0, classes: [0, 1] }
    }

    #[test]
    fn transform_weights_counts_by_idf_and_normalizes() {
        let v = vectorizer(json!({}));
        let row = v.transform("the bar chart rose sharply .");
        // rose -> 1 * 1.0, sharply -> 1 * 2.0, then divided by sqrt(5).
        let norm = 5f64.sqrt();
        assert_eq!(row.len(), 2);
        assert!((row[&0] - 1.0 / norm).abs() < 1e-12);
        assert!((row[&1] - 2.0 / norm).abs() < 1e-12);
    }

    #[test]
    fn single_letter_tokens_and_unknown_words_are_ignored() {
        let v = vectorizer(json!({"norm": null}));
        let row = v.transform("i felt felt a proud x");
        assert_eq!(row.get(&2), Some(&2.0));
        assert_eq!(row.get(&3), Some(&1.0));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn sublinear_tf_uses_log_counts() {
        let v = vectorizer(json!({"norm": null, "sublinear_tf": true}));
        let row = v.transform("felt felt felt");
        assert!((row[&2] - (1.0 + 3f64.ln())).abs() < 1e-12);
    }

    #[test]
    fn bigrams_are_looked_up_after_unigrams() {
        let artifact: VectorizerArtifact = serde_json::from_value(json!({
            "vocabulary": {"rose": 0, "rose sharply": 1},
            "idf": [1.0, 1.0],
            "ngram_range": [1, 2],
            "norm": null
        }))
        .unwrap();
        let v = TfidfVectorizer::from_artifact(artifact).unwrap();
        let row = v.transform("sales rose sharply");
        assert_eq!(row.get(&0), Some(&1.0));
        assert_eq!(row.get(&1), Some(&1.0));
    }

    #[test]
    fn predicts_show_for_negative_and_tell_for_positive_scores() {
        let c = LogisticClassifier::new(vectorizer(json!({})), model(vec![-1.0, -1.0, 1.0, 1.0])).unwrap();
        let labels = c
            .predict(&[
                "the bar chart rose sharply .".to_string(),
                "i felt proud of the team .".to_string(),
                "nothing known here".to_string(),
            ])
            .unwrap();
        assert_eq!(labels, vec![0, 1, 0]);
    }

    #[test]
    fn prediction_is_deterministic() {
        let c = LogisticClassifier::new(vectorizer(json!({})), model(vec![-0.5, 0.2, 0.9, 0.1])).unwrap();
        let batch = vec!["rose sharply".to_string(), "felt proud".to_string()];
        assert_eq!(c.predict(&batch).unwrap(), c.predict(&batch).unwrap());
    }

    #[test]
    fn mismatched_artifacts_are_rejected() {
        let err = LogisticClassifier::new(vectorizer(json!({})), model(vec![1.0])).unwrap_err();
        assert!(matches!(err, PortError::Unexpected(_)));

        let bad_classes = ModelArtifact { coef: vec![0.0; 4], intercept: 0.0, classes: [1, 1] };
        assert!(LogisticClassifier::new(vectorizer(json!({})), bad_classes).is_err());

        let out_of_range: VectorizerArtifact =
            serde_json::from_value(json!({"vocabulary": {"a": 3}, "idf": [1.0]})).unwrap();
        assert!(TfidfVectorizer::from_artifact(out_of_range).is_err());
    }

    #[tokio::test]
    async fn loader_reads_files_once_and_reports_missing_ones() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("model.json");
        let vectorizer_path = dir.path().join("vectorizer.json");

        let missing = JsonClassifierLoader::new(model_path.clone(), vectorizer_path.clone());
        assert!(matches!(missing.load().await, Err(PortError::Unavailable(_))));

        std::fs::write(
            &vectorizer_path,
            json!({"vocabulary": {"proud": 0}, "idf": [1.0]}).to_string(),
        )
        .unwrap();
        std::fs::write(&model_path, json!({"coef": [2.0], "intercept": -0.5}).to_string()).unwrap();

        let loader = JsonClassifierLoader::new(model_path.clone(), vectorizer_path);
        let first = loader.load().await.unwrap();
        std::fs::remove_file(&model_path).unwrap();
        let second = loader.load().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            second
                .predict(&["we were proud".to_string(), "it rose".to_string()])
                .unwrap(),
            vec![1, 0]
        );
    }
}
