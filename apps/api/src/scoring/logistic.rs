//! Learned retention scorer: logistic regression over the feature vector.
//!
//! Every feature is standardized with the training mean and scale, so a feature's
//! contribution `w_i * z_i` is measured relative to the average training candidate.
//! `explain` reports the features pulling the probability down, worst first.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::synthetic::LabeledSample;
use super::{RetentionScorer, MAX_RISK_FACTORS};
use crate::schema::{FeatureVector, ShiftPreference};

pub const FEATURE_COUNT: usize = 8;

/// Feature name plus the risk wording for "below average" and "above average".
struct FeatureInfo {
    name: &'static str,
    low: &'static str,
    high: &'static str,
}

static FEATURES: [FeatureInfo; FEATURE_COUNT] = [
    FeatureInfo {
        name: "skills_verified_count",
        low: "Мало проверенных навыков",
        high: "Много проверенных навыков",
    },
    FeatureInfo {
        name: "years_experience",
        low: "Недостаточный опыт работы",
        high: "Большой опыт работы",
    },
    FeatureInfo {
        name: "commute_time_minutes",
        low: "Короткая дорога до работы",
        high: "Долгая дорога до работы",
    },
    FeatureInfo {
        name: "salary_expectation",
        low: "Низкие зарплатные ожидания",
        high: "Высокие зарплатные ожидания",
    },
    FeatureInfo {
        name: "has_certifications",
        low: "Отсутствуют сертификаты",
        high: "Есть сертификаты",
    },
    FeatureInfo {
        name: "shift_day_only",
        low: "Готов работать не только днём",
        high: "Только дневные смены",
    },
    FeatureInfo {
        name: "shift_night_only",
        low: "Готов работать не только ночью",
        high: "Предпочтение ночной смены",
    },
    FeatureInfo {
        name: "shift_any",
        low: "Ограниченный график смен",
        high: "Готов к любому графику",
    },
];

#[derive(Debug, Error)]
pub enum ModelFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid model JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model shape mismatch: {0}")]
    Shape(String),
}

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("training set is empty")]
    Empty,

    #[error("training set has a single class; nothing to separate")]
    SingleClass,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingParams {
    pub epochs: usize,
    pub learning_rate: f64,
    pub l2: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            epochs: 500,
            learning_rate: 0.1,
            l2: 1e-3,
        }
    }
}

/// Serialized form of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModel {
    pub feature_names: Vec<String>,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
    pub weights: Vec<f64>,
    pub bias: f64,
}

/// Raw (unstandardized) feature encoding.
pub fn encode(vector: &FeatureVector) -> [f64; FEATURE_COUNT] {
    let shift = |s: ShiftPreference| f64::from(u8::from(vector.shift_preference == s));
    [
        vector.skills_verified_count as f64,
        vector.years_experience,
        vector.commute_time_minutes as f64,
        vector.salary_expectation as f64,
        f64::from(u8::from(vector.has_certifications)),
        shift(ShiftPreference::DayOnly),
        shift(ShiftPreference::NightOnly),
        shift(ShiftPreference::Any),
    ]
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl LogisticModel {
    fn standardize(&self, raw: &[f64; FEATURE_COUNT]) -> [f64; FEATURE_COUNT] {
        let mut z = [0.0; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT {
            z[i] = (raw[i] - self.means[i]) / self.scales[i];
        }
        z
    }

    fn contributions(&self, vector: &FeatureVector) -> [f64; FEATURE_COUNT] {
        let z = self.standardize(&encode(vector));
        let mut c = [0.0; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT {
            c[i] = self.weights[i] * z[i];
        }
        c
    }

    pub fn probability(&self, vector: &FeatureVector) -> f64 {
        sigmoid(self.bias + self.contributions(vector).iter().sum::<f64>())
    }

    fn check_shape(&self) -> Result<(), ModelFileError> {
        let expected: Vec<&str> = FEATURES.iter().map(|f| f.name).collect();
        if self.feature_names != expected {
            return Err(ModelFileError::Shape(format!(
                "expected features {expected:?}, found {:?}",
                self.feature_names
            )));
        }
        for (label, values) in [
            ("means", &self.means),
            ("scales", &self.scales),
            ("weights", &self.weights),
        ] {
            if values.len() != FEATURE_COUNT {
                return Err(ModelFileError::Shape(format!(
                    "{label} has {} entries, expected {FEATURE_COUNT}",
                    values.len()
                )));
            }
        }
        if self.scales.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(ModelFileError::Shape("scales must be positive".to_string()));
        }
        Ok(())
    }
}

/// Fits a logistic regression with full-batch gradient descent.
pub fn train(samples: &[LabeledSample], params: &TrainingParams) -> Result<LogisticModel, TrainingError> {
    if samples.is_empty() {
        return Err(TrainingError::Empty);
    }
    let positives = samples.iter().filter(|s| s.retained).count();
    if positives == 0 || positives == samples.len() {
        return Err(TrainingError::SingleClass);
    }

    let n = samples.len() as f64;
    let raw: Vec<[f64; FEATURE_COUNT]> = samples.iter().map(|s| encode(&s.vector)).collect();
    let labels: Vec<f64> = samples.iter().map(|s| f64::from(u8::from(s.retained))).collect();

    let mut means = vec![0.0; FEATURE_COUNT];
    for row in &raw {
        for i in 0..FEATURE_COUNT {
            means[i] += row[i] / n;
        }
    }
    let mut scales = vec![0.0; FEATURE_COUNT];
    for row in &raw {
        for i in 0..FEATURE_COUNT {
            scales[i] += (row[i] - means[i]).powi(2) / n;
        }
    }
    // Constant columns get scale 1 so they standardize to zero.
    for s in scales.iter_mut() {
        *s = if *s > 1e-12 { s.sqrt() } else { 1.0 };
    }

    let mut model = LogisticModel {
        feature_names: FEATURES.iter().map(|f| f.name.to_string()).collect(),
        means,
        scales,
        weights: vec![0.0; FEATURE_COUNT],
        bias: 0.0,
    };
    let z: Vec<[f64; FEATURE_COUNT]> = raw.iter().map(|row| model.standardize(row)).collect();

    for _ in 0..params.epochs {
        let mut grad_w = [0.0; FEATURE_COUNT];
        let mut grad_b = 0.0;
        for (row, y) in z.iter().zip(&labels) {
            let logit = model.bias + (0..FEATURE_COUNT).map(|i| model.weights[i] * row[i]).sum::<f64>();
            let err = sigmoid(logit) - y;
            for i in 0..FEATURE_COUNT {
                grad_w[i] += err * row[i] / n;
            }
            grad_b += err / n;
        }
        for i in 0..FEATURE_COUNT {
            model.weights[i] -= params.learning_rate * (grad_w[i] + params.l2 * model.weights[i]);
        }
        model.bias -= params.learning_rate * grad_b;
    }

    Ok(model)
}

/// Share of samples whose label matches `probability > 0.5`.
pub fn accuracy(model: &LogisticModel, samples: &[LabeledSample]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let correct = samples
        .iter()
        .filter(|s| (model.probability(&s.vector) > 0.5) == s.retained)
        .count();
    correct as f64 / samples.len() as f64
}

pub struct LogisticScorer {
    model: LogisticModel,
}

impl LogisticScorer {
    pub fn new(model: LogisticModel) -> Result<Self, ModelFileError> {
        model.check_shape()?;
        Ok(Self { model })
    }

    pub fn load(path: &Path) -> Result<Self, ModelFileError> {
        let text = fs::read_to_string(path)?;
        Self::new(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelFileError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(&self.model)?)?;
        Ok(())
    }

    pub fn model(&self) -> &LogisticModel {
        &self.model
    }
}

impl RetentionScorer for LogisticScorer {
    fn backend(&self) -> &'static str {
        "logistic"
    }

    fn score(&self, vector: &FeatureVector) -> f64 {
        self.model.probability(vector)
    }

    fn explain(&self, vector: &FeatureVector) -> Vec<String> {
        let z = self.model.standardize(&encode(vector));
        let contributions = self.model.contributions(vector);

        let mut negative: Vec<(usize, f64)> = contributions
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, c)| *c < 0.0)
            .collect();
        negative.sort_by(|a, b| a.1.total_cmp(&b.1));

        negative
            .into_iter()
            .take(MAX_RISK_FACTORS)
            .map(|(i, _)| {
                let info = &FEATURES[i];
                let wording = if z[i] < 0.0 { info.low } else { info.high };
                wording.to_string()
            })
            .collect()
    }
}
