//! Overspending risk classifier: bootstrap training and persistence
//!
//! The classifier is a logistic regression over the 4-dimensional risk
//! feature vector, fitted by batch gradient descent on a synthetic,
//! seeded training set. It is demo/bootstrap semantics by design: the
//! model is never retrained from observed user transactions, and the
//! fixture generation is deliberately explicit code rather than a hidden
//! training path.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};

/// Feature names, in vector order
pub const MODEL_FEATURES: [&str; 4] = [
    "delivery_ratio",
    "volatility",
    "anomaly_count",
    "budget_breach_count",
];

/// Fixed seed for the synthetic training set
const BOOTSTRAP_SEED: u64 = 42;

/// Synthetic training set size
const BOOTSTRAP_SAMPLES: usize = 200;

const TRAIN_EPOCHS: usize = 1000;
const TRAIN_LEARNING_RATE: f64 = 0.1;

/// Standardizing scaler fitted on the training set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureScaler {
    means: [f64; 4],
    stds: [f64; 4],
}

impl FeatureScaler {
    /// Fit zero-mean unit-variance parameters on a sample matrix
    fn fit(samples: &[[f64; 4]]) -> Self {
        let n = samples.len().max(1) as f64;
        let mut means = [0.0; 4];
        let mut stds = [0.0; 4];

        for j in 0..4 {
            means[j] = samples.iter().map(|row| row[j]).sum::<f64>() / n;
            let variance = samples
                .iter()
                .map(|row| (row[j] - means[j]).powi(2))
                .sum::<f64>()
                / n;
            stds[j] = variance.sqrt();
        }

        Self { means, stds }
    }

    /// Standardize one feature vector; constant dimensions pass through as 0
    pub fn transform(&self, features: [f64; 4]) -> [f64; 4] {
        let mut scaled = [0.0; 4];
        for j in 0..4 {
            scaled[j] = if self.stds[j] > 0.0 {
                (features[j] - self.means[j]) / self.stds[j]
            } else {
                0.0
            };
        }
        scaled
    }
}

/// Binary logistic regression over the scaled feature vector
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    weights: [f64; 4],
    bias: f64,
}

impl LogisticModel {
    /// Fit by full-batch gradient descent on the logistic loss
    fn fit(samples: &[[f64; 4]], labels: &[f64]) -> Self {
        let n = samples.len() as f64;
        let mut weights = [0.0; 4];
        let mut bias = 0.0;

        for _ in 0..TRAIN_EPOCHS {
            let mut grad_w = [0.0; 4];
            let mut grad_b = 0.0;

            for (row, &label) in samples.iter().zip(labels) {
                let error = sigmoid(dot(&weights, row) + bias) - label;
                for j in 0..4 {
                    grad_w[j] += error * row[j];
                }
                grad_b += error;
            }

            for j in 0..4 {
                weights[j] -= TRAIN_LEARNING_RATE * grad_w[j] / n;
            }
            bias -= TRAIN_LEARNING_RATE * grad_b / n;
        }

        Self { weights, bias }
    }

    /// P(risk = 1) for a scaled feature vector
    pub fn predict_proba(&self, scaled: [f64; 4]) -> f64 {
        sigmoid(dot(&self.weights, &scaled) + self.bias)
    }

    /// Binary class at the 0.5 boundary
    pub fn predict(&self, scaled: [f64; 4]) -> u8 {
        u8::from(self.predict_proba(scaled) >= 0.5)
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn dot(weights: &[f64; 4], features: &[f64; 4]) -> f64 {
    weights.iter().zip(features).map(|(w, x)| w * x).sum()
}

/// The persisted classifier: model, scaler, and training provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: LogisticModel,
    pub scaler: FeatureScaler,
    pub trained_at: DateTime<Utc>,
    pub features: Vec<String>,
}

impl ModelArtifact {
    /// Train the bootstrap model on the seeded synthetic set
    ///
    /// 200 samples: delivery_ratio ~ U(0, 0.5), volatility ~ U(0, 500),
    /// anomaly_count ~ U{0..10}, budget_breach_count ~ U{0..5}. A sample is
    /// labeled risky when any single feature crosses its threshold
    /// (0.25 / 300 / 5 / 2).
    pub fn train_bootstrap() -> Self {
        let mut rng = StdRng::seed_from_u64(BOOTSTRAP_SEED);

        let mut samples = Vec::with_capacity(BOOTSTRAP_SAMPLES);
        let mut labels = Vec::with_capacity(BOOTSTRAP_SAMPLES);

        for _ in 0..BOOTSTRAP_SAMPLES {
            let delivery_ratio = rng.gen::<f64>() * 0.5;
            let volatility = rng.gen::<f64>() * 500.0;
            let anomaly_count = (rng.gen::<f64>() * 10.0).floor();
            let breach_count = (rng.gen::<f64>() * 5.0).floor();

            let risky = delivery_ratio > 0.25
                || volatility > 300.0
                || anomaly_count > 5.0
                || breach_count > 2.0;

            samples.push([delivery_ratio, volatility, anomaly_count, breach_count]);
            labels.push(if risky { 1.0 } else { 0.0 });
        }

        let scaler = FeatureScaler::fit(&samples);
        let scaled: Vec<[f64; 4]> = samples.iter().map(|&row| scaler.transform(row)).collect();
        let model = LogisticModel::fit(&scaled, &labels);

        info!(samples = BOOTSTRAP_SAMPLES, "Bootstrap risk model trained");

        Self {
            model,
            scaler,
            trained_at: Utc::now(),
            features: MODEL_FEATURES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Load a persisted artifact
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let artifact = serde_json::from_str(&data)?;
        Ok(artifact)
    }

    /// Load the artifact, or train and persist a fresh one
    ///
    /// A missing or corrupt artifact is recovered by retraining and never
    /// surfaced to the caller; only an unwritable model path is a hard
    /// error. The write is atomic (temp file + rename) so a concurrent
    /// reader never observes a partial artifact.
    pub fn load_or_train(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(artifact) => return Ok(artifact),
            Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Risk model unreadable, retraining");
            }
        }

        let artifact = Self::train_bootstrap();
        artifact.persist(path)?;
        Ok(artifact)
    }

    /// Persist the artifact atomically next to its final path
    pub fn persist(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(serde_json::to_string_pretty(self)?.as_bytes())?;
        tmp.persist(path)
            .map_err(|e| Error::Model(format!("Failed to persist model artifact: {}", e)))?;

        info!(path = %path.display(), "Risk model persisted");
        Ok(())
    }
}

/// Default on-disk location for the classifier artifact
pub fn default_model_path() -> Result<PathBuf> {
    let base = dirs::data_dir()
        .ok_or_else(|| Error::Model("No platform data directory available".to_string()))?;
    Ok(base.join("nudge").join("overspend_model.json"))
}

static GLOBAL_MODEL: OnceLock<ModelArtifact> = OnceLock::new();

/// Process-wide classifier, lazily loaded or trained on first use
///
/// Concurrent first calls may each train an equivalent model; the atomic
/// persist and the OnceLock mean exactly one wins and later callers share
/// it.
pub fn global_model() -> Result<&'static ModelArtifact> {
    if let Some(artifact) = GLOBAL_MODEL.get() {
        return Ok(artifact);
    }

    let artifact = ModelArtifact::load_or_train(&default_model_path()?)?;
    Ok(GLOBAL_MODEL.get_or_init(|| artifact))
}
