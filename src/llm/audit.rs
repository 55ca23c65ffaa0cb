use crate::llm::client::{ChatApi, ChatMessage, ChatRequest};
use crate::models::{PatientObservation, RiskLevel};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

/// Counterfactual fairness probe: rerun the assessment with gender
/// flipped and flag a changed risk level. Advisory only; the primary
/// decision is never altered.
pub struct BiasAuditor {
    backend: Arc<dyn ChatApi>,
}

#[derive(Debug, Deserialize)]
struct CounterfactualResponse {
    risk_level: String,
}

impl BiasAuditor {
    pub fn new(backend: Arc<dyn ChatApi>) -> Self {
        Self { backend }
    }

    /// Returns the warning text when the counterfactual risk differs from
    /// `primary`, `None` otherwise. Skips silently unless gender is
    /// binary-valued; an unparseable or unknown counterfactual label is an
    /// audit failure and yields no warning.
    pub async fn audit(
        &self,
        observation: &PatientObservation,
        primary: RiskLevel,
        base_prompt: &str,
    ) -> Option<String> {
        let flipped = observation.gender.flipped()?;

        let prompt = format!(
            "{}\n\nRepeat the analysis with same patient but gender is {}. \
             Return ONLY JSON with risk_level.",
            base_prompt, flipped
        );
        let request = ChatRequest {
            messages: vec![ChatMessage::user(prompt)],
            temperature: 0.0,
            max_tokens: None,
            json_mode: true,
        };

        let content = match self.backend.complete(&request).await {
            Ok(text) => text,
            Err(e) => {
                debug!(error = %e, "Bias audit call failed");
                return None;
            }
        };

        let parsed: CounterfactualResponse = match serde_json::from_str(&content) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "Bias audit returned unparseable JSON");
                return None;
            }
        };
        let counterfactual = match parsed.risk_level.parse::<RiskLevel>() {
            Ok(level) => level,
            Err(_) => {
                debug!(label = %parsed.risk_level, "Bias audit returned an unknown risk label");
                return None;
            }
        };

        if counterfactual != primary {
            Some(format!(
                "Potential bias detected: risk changed when gender was flipped to {}.",
                flipped
            ))
        } else {
            None
        }
    }
}

/// Base prompt used for the audit on the classifier path. The direct
/// path reuses its own full prompt instead.
pub fn ml_base_prompt(observation: &PatientObservation) -> String {
    format!(
        "Age: {}, Gender: {}, Symptoms: {}",
        observation.age,
        observation.gender,
        observation.symptoms.join(", ")
    )
}
