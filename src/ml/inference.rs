use crate::error::{AppError, Result};
use crate::ml::bundle::ModelProvider;
use crate::ml::features::{FeatureVector, N_FEATURES};
use crate::ml::lexicon;
use crate::models::{Department, PatientObservation, RiskLevel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Reported alongside every ML prediction.
pub const MODEL_TYPE: &str = "ML Ensemble (Bagged Decision Trees, soft vote)";

/// Output of the classifier tier: labels, full percentage breakdowns and a
/// ready-made explanation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlPrediction {
    pub risk_level: RiskLevel,
    pub department: Department,

    /// Winning risk probability in percent, rounded to one decimal
    pub confidence: f64,

    /// Winning department probability in percent, rounded to one decimal
    pub department_confidence: f64,

    /// Percent per risk label (labels are sorted, as trained)
    pub risk_probabilities: BTreeMap<String, f64>,

    /// Percent per department label
    pub department_probabilities: BTreeMap<String, f64>,

    pub contributing_factors: Vec<String>,
    pub model_type: String,
    pub explanation: String,
}

/// Classifier tier over the process-wide model provider.
pub struct MlEngine {
    provider: Arc<ModelProvider>,
}

impl MlEngine {
    pub fn new(provider: Arc<ModelProvider>) -> Self {
        Self { provider }
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_available()
    }

    /// Run both classifiers for one observation.
    ///
    /// `Ok(None)` means no bundle is loaded and the caller should move on
    /// to the next tier. A label that does not decode into the closed
    /// enums, or an artifact whose scaler arity disagrees with the feature
    /// schema, is an `Err`: the artifact cannot be trusted and the caller
    /// must fail closed to the deterministic tier.
    pub fn predict(&self, obs: &PatientObservation) -> Result<Option<MlPrediction>> {
        let bundle = match self.provider.bundle() {
            Some(bundle) => bundle,
            None => return Ok(None),
        };

        if bundle.scaler.n_features() != N_FEATURES {
            return Err(AppError::MalformedModelOutput(format!(
                "Scaler expects {} features, schema has {}",
                bundle.scaler.n_features(),
                N_FEATURES
            )));
        }

        let features = FeatureVector::from_observation(obs);
        let scaled = bundle.scaler.transform_row(features.values());

        let (risk_idx, risk_proba) = bundle.risk.predict(&scaled)?;
        let risk_label = bundle.risk.label(risk_idx).ok_or_else(|| {
            AppError::MalformedModelOutput(format!("Risk label index {} out of range", risk_idx))
        })?;
        let risk_level: RiskLevel = risk_label.parse().map_err(|_| {
            AppError::MalformedModelOutput(format!("Unknown risk label {:?}", risk_label))
        })?;

        let (dept_idx, dept_proba) = bundle.department.predict(&scaled)?;
        let dept_label = bundle.department.label(dept_idx).ok_or_else(|| {
            AppError::MalformedModelOutput(format!(
                "Department label index {} out of range",
                dept_idx
            ))
        })?;
        let department: Department = dept_label.parse().map_err(|_| {
            AppError::MalformedModelOutput(format!("Unknown department label {:?}", dept_label))
        })?;

        let risk_confidence = risk_proba[risk_idx] * 100.0;
        let dept_confidence = dept_proba[dept_idx] * 100.0;
        let factors = derive_factors(obs);

        let explanation = format!(
            "ML model predicts {} risk ({:.0}% confidence). Recommended department: {} ({:.0}% confidence). Key factors: {}.",
            risk_level,
            risk_confidence,
            department,
            dept_confidence,
            factors.join(", ")
        );

        debug!(
            risk = %risk_level,
            department = %department,
            confidence = risk_confidence,
            "Classifier tier produced a prediction"
        );

        Ok(Some(MlPrediction {
            risk_level,
            department,
            confidence: round1(risk_confidence),
            department_confidence: round1(dept_confidence),
            risk_probabilities: percent_breakdown(bundle.risk.labels(), &risk_proba),
            department_probabilities: percent_breakdown(bundle.department.labels(), &dept_proba),
            contributing_factors: factors,
            model_type: MODEL_TYPE.to_string(),
            explanation,
        }))
    }
}

/// Human-readable factors derived from raw inputs, in a fixed order.
pub(crate) fn derive_factors(obs: &PatientObservation) -> Vec<String> {
    let mut factors = Vec::new();
    if obs.systolic > 160 {
        factors.push("Elevated Blood Pressure".to_string());
    }
    if obs.heart_rate > 110 {
        factors.push("High Heart Rate".to_string());
    }
    if obs.temperature > 100.0 {
        factors.push("Fever".to_string());
    }
    if lexicon::any_critical(&obs.symptoms) {
        factors.push("Critical Symptom Detected".to_string());
    }
    if lexicon::any_moderate(&obs.symptoms) {
        factors.push("Moderate Symptom Pattern".to_string());
    }
    if obs.age > 65 {
        factors.push("Elderly Patient".to_string());
    }
    if factors.is_empty() {
        factors.push("Stable Vitals".to_string());
    }
    factors
}

fn percent_breakdown(labels: &[String], proba: &[f64]) -> BTreeMap<String, f64> {
    labels
        .iter()
        .zip(proba.iter())
        .map(|(label, p)| (label.clone(), round1(p * 100.0)))
        .collect()
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
