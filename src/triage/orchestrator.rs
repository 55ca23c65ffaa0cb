use crate::llm::{assessor, audit, GenerativeLayer};
use crate::ml::{MlEngine, MlPrediction};
use crate::models::{PatientObservation, RiskAssessment};
use crate::triage::{rules, safety};
use strum_macros::Display;
use tracing::{debug, info, warn};

/// Pipeline position, in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TriageState {
    SafetyCheck,
    MlAttempt,
    DirectAttempt,
    RuleFallback,
    Done,
}

/// Tiered decision pipeline: safety gate, classifier ensemble, direct
/// generative assessment, deterministic rules. Later tiers run only when
/// earlier ones decline, and the rule tier is the unconditional floor, so
/// `assess` always produces an answer.
pub struct TriageOrchestrator {
    ml: MlEngine,
    generative: Option<GenerativeLayer>,
}

impl TriageOrchestrator {
    pub fn new(ml: MlEngine, generative: Option<GenerativeLayer>) -> Self {
        Self { ml, generative }
    }

    pub fn ml_available(&self) -> bool {
        self.ml.is_available()
    }

    pub fn generative_configured(&self) -> bool {
        self.generative.is_some()
    }

    /// Run the full pipeline for one observation.
    pub async fn assess(&self, observation: &PatientObservation) -> RiskAssessment {
        let mut state = TriageState::SafetyCheck;
        let mut note = rules::NOTE_KEY_MISSING;
        let mut decision: Option<RiskAssessment> = None;

        while decision.is_none() {
            state = match state {
                TriageState::SafetyCheck => match safety::evaluate(observation) {
                    Some(assessment) => {
                        info!(
                            heart_rate = observation.heart_rate,
                            systolic = observation.systolic,
                            temperature = observation.temperature,
                            "Safety gate fired, bypassing model tiers"
                        );
                        decision = Some(assessment);
                        TriageState::Done
                    }
                    None => TriageState::MlAttempt,
                },

                TriageState::MlAttempt => match self.ml.predict(observation) {
                    Ok(Some(prediction)) => {
                        debug!(
                            risk_level = %prediction.risk_level,
                            confidence = prediction.confidence,
                            "Classifier tier decided"
                        );
                        decision = Some(self.finish_ml_path(observation, prediction).await);
                        TriageState::Done
                    }
                    Ok(None) => {
                        debug!("No model bundle loaded, trying direct assessment");
                        TriageState::DirectAttempt
                    }
                    Err(e) => {
                        warn!(error = %e, "Classifier output rejected, failing closed to rules");
                        note = rules::NOTE_MODEL_REJECTED;
                        TriageState::RuleFallback
                    }
                },

                TriageState::DirectAttempt => match &self.generative {
                    None => {
                        note = rules::NOTE_KEY_MISSING;
                        TriageState::RuleFallback
                    }
                    Some(generative) => {
                        match generative.assessor.direct_assessment(observation).await {
                            Some(assessment) => {
                                debug!(
                                    risk_level = %assessment.risk_level,
                                    "Direct assessment tier decided"
                                );
                                let warning = generative
                                    .auditor
                                    .audit(
                                        observation,
                                        assessment.risk_level,
                                        &assessor::direct_prompt(observation),
                                    )
                                    .await;
                                decision = Some(assessment.with_bias_warning(warning));
                                TriageState::Done
                            }
                            None => {
                                note = rules::NOTE_LLM_UNAVAILABLE;
                                TriageState::RuleFallback
                            }
                        }
                    }
                },

                TriageState::RuleFallback => {
                    info!(note, "Falling back to deterministic rules");
                    decision = Some(rules::assess(observation, note));
                    TriageState::Done
                }

                TriageState::Done => break,
            };
        }

        let assessment = match decision {
            Some(assessment) => assessment,
            // Unreachable in practice; the rule tier always decides
            None => rules::assess(observation, note),
        };
        info!(
            risk_level = %assessment.risk_level,
            department = %assessment.department,
            confidence = assessment.confidence,
            bias_flagged = assessment.bias_warning.is_some(),
            "Triage decision ready"
        );
        assessment
    }

    /// Classifier result plus the optional generative overlays: an
    /// explanation rewrite, then the counterfactual audit against the
    /// final risk level. The decision fields themselves never change.
    async fn finish_ml_path(
        &self,
        observation: &PatientObservation,
        prediction: MlPrediction,
    ) -> RiskAssessment {
        let mut assessment = RiskAssessment::new(
            prediction.risk_level,
            prediction.department,
            prediction.confidence,
            prediction.explanation.clone(),
            prediction.contributing_factors.clone(),
        );

        if let Some(generative) = &self.generative {
            if let Some(enhanced) = generative
                .assessor
                .enhance_explanation(observation, &prediction)
                .await
            {
                assessment = assessment.with_explanation(enhanced);
            }
            let warning = generative
                .auditor
                .audit(
                    observation,
                    assessment.risk_level,
                    &audit::ml_base_prompt(observation),
                )
                .await;
            assessment = assessment.with_bias_warning(warning);
        }

        assessment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatApi, ChatRequest};
    use crate::ml::bundle::ModelProvider;
    use crate::models::{Department, Gender, RiskLevel};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::Mutex;

    struct ScriptedChat {
        replies: Mutex<Vec<crate::error::Result<String>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedChat {
        fn new(replies: Vec<crate::error::Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ChatApi for ScriptedChat {
        async fn complete(&self, _request: &ChatRequest) -> crate::error::Result<String> {
            *self.calls.lock().unwrap() += 1;
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Err(crate::error::AppError::RemoteCall(
                    "script exhausted".to_string(),
                ))
            } else {
                replies.remove(0)
            }
        }
    }

    fn degraded_orchestrator(generative: Option<GenerativeLayer>) -> TriageOrchestrator {
        let provider = Arc::new(ModelProvider::disabled());
        TriageOrchestrator::new(MlEngine::new(provider), generative)
    }

    fn observation() -> PatientObservation {
        PatientObservation {
            age: 50,
            gender: Gender::Male,
            systolic: 120,
            diastolic: 80,
            heart_rate: 72,
            temperature: 98.6,
            symptoms: vec!["fatigue".to_string()],
            symptom_notes: None,
            conditions: vec![],
        }
    }

    #[tokio::test]
    async fn test_safety_gate_short_circuits_everything() {
        let backend = ScriptedChat::new(vec![]);
        let orchestrator =
            degraded_orchestrator(Some(GenerativeLayer::new(backend.clone())));
        let mut obs = observation();
        obs.heart_rate = 190;

        let result = orchestrator.assess(&obs).await;
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.department, Department::Emergency);
        assert_eq!(result.confidence, 95.0);
        // No remote calls on the gate path
        assert_eq!(backend.calls(), 0);
    }

    #[tokio::test]
    async fn test_no_models_no_key_lands_on_rules_with_key_note() {
        let orchestrator = degraded_orchestrator(None);
        let result = orchestrator.assess(&observation()).await;
        assert_eq!(result.confidence, rules::RULE_CONFIDENCE);
        assert!(result.explanation.ends_with(rules::NOTE_KEY_MISSING));
        assert!(result.bias_warning.is_none());
    }

    #[tokio::test]
    async fn test_direct_success_carries_audit_verdict() {
        let backend = ScriptedChat::new(vec![
            Ok(r#"{
                "risk_level": "Medium",
                "department": "Cardiology",
                "confidence": 77.0,
                "explanation": "Borderline pressure with fatigue.",
                "contributing_factors": ["Elevated Blood Pressure"]
            }"#
            .to_string()),
            Ok(r#"{"risk_level":"High"}"#.to_string()),
        ]);
        let orchestrator =
            degraded_orchestrator(Some(GenerativeLayer::new(backend.clone())));

        let result = orchestrator.assess(&observation()).await;
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.department, Department::Cardiology);
        assert_eq!(result.confidence, 77.0);
        assert_eq!(
            result.bias_warning.as_deref(),
            Some("Potential bias detected: risk changed when gender was flipped to Female.")
        );
        // One assessment call plus one audit call
        assert_eq!(backend.calls(), 2);
    }

    #[tokio::test]
    async fn test_direct_failure_lands_on_rules_with_llm_note() {
        let backend = ScriptedChat::new(vec![Err(crate::error::AppError::RemoteCall(
            "upstream 500".to_string(),
        ))]);
        let orchestrator =
            degraded_orchestrator(Some(GenerativeLayer::new(backend.clone())));

        let result = orchestrator.assess(&observation()).await;
        assert_eq!(result.confidence, rules::RULE_CONFIDENCE);
        assert!(result.explanation.ends_with(rules::NOTE_LLM_UNAVAILABLE));
        // Failed direct attempt, and no audit afterwards
        assert_eq!(backend.calls(), 1);
    }

    #[tokio::test]
    async fn test_malformed_direct_payload_lands_on_rules() {
        let backend = ScriptedChat::new(vec![Ok(
            r#"{"risk_level":"Unheard-Of","department":"Cardiology","confidence":1.0,
                "explanation":"x","contributing_factors":["y"]}"#
                .to_string(),
        )]);
        let orchestrator = degraded_orchestrator(Some(GenerativeLayer::new(backend)));

        let result = orchestrator.assess(&observation()).await;
        assert!(result.explanation.ends_with(rules::NOTE_LLM_UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_matching_counterfactual_leaves_no_warning() {
        let backend = ScriptedChat::new(vec![
            Ok(r#"{
                "risk_level": "Low",
                "department": "General Medicine",
                "confidence": 60.0,
                "explanation": "Nothing acute.",
                "contributing_factors": ["Stable Vitals"]
            }"#
            .to_string()),
            Ok(r#"{"risk_level":"Low"}"#.to_string()),
        ]);
        let orchestrator = degraded_orchestrator(Some(GenerativeLayer::new(backend)));

        let result = orchestrator.assess(&observation()).await;
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert!(result.bias_warning.is_none());
    }
}
