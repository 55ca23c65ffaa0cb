use crate::error::{AppError, Result};
use crate::llm::client::{ChatApi, ChatMessage, ChatRequest};
use crate::ml::inference::MlPrediction;
use crate::models::{Department, PatientObservation, RiskAssessment, RiskLevel};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

const ENHANCE_SYSTEM: &str =
    "You are a medical triage assistant. Write concise clinical explanations.";
const DIRECT_SYSTEM: &str = "You are a medical triage assistant. Output only valid JSON.";

/// Generative tier: explanation rewriting on top of classifier output,
/// and a full direct assessment when no classifier bundle is loaded.
pub struct GenerativeAssessor {
    backend: Arc<dyn ChatApi>,
}

impl GenerativeAssessor {
    pub fn new(backend: Arc<dyn ChatApi>) -> Self {
        Self { backend }
    }

    /// Ask for a clinician-friendly rewrite of the classifier explanation.
    /// Returns `None` on any failure; the caller keeps the original text.
    pub async fn enhance_explanation(
        &self,
        observation: &PatientObservation,
        prediction: &MlPrediction,
    ) -> Option<String> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage::system(ENHANCE_SYSTEM),
                ChatMessage::user(enhancement_prompt(observation, prediction)),
            ],
            temperature: 0.2,
            max_tokens: Some(200),
            json_mode: false,
        };

        match self.backend.complete(&request).await {
            Ok(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
            Err(e) => {
                debug!(error = %e, "Explanation enhancement failed, keeping classifier text");
                None
            }
        }
    }

    /// Full assessment straight from the language model, used only when
    /// the classifier tier is unavailable. Returns `None` on any remote,
    /// parse, or validation failure.
    pub async fn direct_assessment(
        &self,
        observation: &PatientObservation,
    ) -> Option<RiskAssessment> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage::system(DIRECT_SYSTEM),
                ChatMessage::user(direct_prompt(observation)),
            ],
            temperature: 0.1,
            max_tokens: None,
            json_mode: true,
        };

        let content = match self.backend.complete(&request).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Direct assessment call failed");
                return None;
            }
        };

        match parse_direct_response(&content) {
            Ok(assessment) => Some(assessment),
            Err(e) => {
                warn!(error = %e, "Direct assessment response rejected");
                None
            }
        }
    }
}

pub(crate) fn enhancement_prompt(
    observation: &PatientObservation,
    prediction: &MlPrediction,
) -> String {
    let conditions = if observation.conditions.is_empty() {
        "None".to_string()
    } else {
        observation.conditions.join(", ")
    };
    format!(
        "A triage ML model predicted {} risk for a {}yo {} with symptoms: {}. \
         Vitals: BP {}, HR {}, Temp {}F. Conditions: {}. Predicted department: {}. \
         Write a concise 2-3 sentence clinical explanation for why this risk level \
         and department are appropriate. Be specific about which vitals/symptoms \
         drove the decision.",
        prediction.risk_level,
        observation.age,
        observation.gender,
        observation.symptoms.join(", "),
        observation.bp_display(),
        observation.heart_rate,
        observation.temperature,
        conditions,
        prediction.department,
    )
}

pub(crate) fn direct_prompt(observation: &PatientObservation) -> String {
    format!(
        "\nYou are an expert medical triage AI. Analyze the patient data and determine risk level and department.\n\
         \n\
         Patient Data:\n\
         Age: {}\n\
         Gender: {}\n\
         Symptoms: {}\n\
         Free Text Symptoms: {}\n\
         Vitals: BP {}, HR {}, Temp {}F\n\
         Conditions: {}\n\
         \n\
         Output JSON format:\n\
         {{\n\
           \"risk_level\": \"Low\" | \"Medium\" | \"High\",\n\
           \"department\": \"Cardiology\" | \"Emergency\" | \"Neurology\" | \"General Medicine\",\n\
           \"confidence\": number,\n\
           \"explanation\": \"concise explanation for doctor\",\n\
           \"contributing_factors\": [\"factor1\", \"factor2\"]\n\
         }}\n",
        observation.age,
        observation.gender,
        observation.symptoms.join(", "),
        observation.symptom_notes.as_deref().unwrap_or("None"),
        observation.bp_display(),
        observation.heart_rate,
        observation.temperature,
        observation.conditions.join(", "),
    )
}

#[derive(Debug, Deserialize)]
struct DirectResponse {
    risk_level: String,
    department: String,
    confidence: f64,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    contributing_factors: Vec<String>,
}

/// Decode and validate a strict-JSON direct assessment. Unknown enum
/// labels, an empty explanation, or empty factors all reject the payload.
fn parse_direct_response(content: &str) -> Result<RiskAssessment> {
    let raw: DirectResponse = serde_json::from_str(content)
        .map_err(|e| AppError::RemoteCall(format!("Direct assessment is not valid JSON: {}", e)))?;

    let risk_level: RiskLevel = raw.risk_level.parse().map_err(|_| {
        AppError::RemoteCall(format!("Unknown risk_level label: {:?}", raw.risk_level))
    })?;
    let department: Department = raw.department.parse().map_err(|_| {
        AppError::RemoteCall(format!("Unknown department label: {:?}", raw.department))
    })?;

    if raw.explanation.trim().is_empty() {
        return Err(AppError::RemoteCall(
            "Direct assessment carried no explanation".to_string(),
        ));
    }
    if raw.contributing_factors.is_empty() {
        return Err(AppError::RemoteCall(
            "Direct assessment carried no contributing factors".to_string(),
        ));
    }
    if !raw.confidence.is_finite() {
        return Err(AppError::RemoteCall(
            "Direct assessment confidence is not a finite number".to_string(),
        ));
    }

    Ok(RiskAssessment::new(
        risk_level,
        department,
        raw.confidence.clamp(0.0, 100.0),
        raw.explanation,
        raw.contributing_factors,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;

    fn observation() -> PatientObservation {
        PatientObservation {
            age: 58,
            gender: Gender::Male,
            systolic: 150,
            diastolic: 95,
            heart_rate: 88,
            temperature: 98.9,
            symptoms: vec!["chest pain".to_string(), "fatigue".to_string()],
            symptom_notes: None,
            conditions: vec!["diabetes".to_string()],
        }
    }

    #[test]
    fn test_enhancement_prompt_wording() {
        let prediction = MlPrediction {
            risk_level: RiskLevel::High,
            department: Department::Cardiology,
            confidence: 87.0,
            department_confidence: 74.0,
            risk_probabilities: Default::default(),
            department_probabilities: Default::default(),
            contributing_factors: vec![],
            model_type: String::new(),
            explanation: String::new(),
        };
        let prompt = enhancement_prompt(&observation(), &prediction);
        assert!(prompt.starts_with("A triage ML model predicted High risk for a 58yo Male"));
        assert!(prompt.contains("symptoms: chest pain, fatigue."));
        assert!(prompt.contains("Vitals: BP 150/95, HR 88, Temp 98.9F."));
        assert!(prompt.contains("Conditions: diabetes."));
        assert!(prompt.contains("Predicted department: Cardiology."));
        assert!(prompt.ends_with("drove the decision."));
    }

    #[test]
    fn test_enhancement_prompt_empty_conditions_say_none() {
        let prediction = MlPrediction {
            risk_level: RiskLevel::Low,
            department: Department::GeneralMedicine,
            confidence: 60.0,
            department_confidence: 55.0,
            risk_probabilities: Default::default(),
            department_probabilities: Default::default(),
            contributing_factors: vec![],
            model_type: String::new(),
            explanation: String::new(),
        };
        let mut obs = observation();
        obs.conditions.clear();
        let prompt = enhancement_prompt(&obs, &prediction);
        assert!(prompt.contains("Conditions: None."));
    }

    #[test]
    fn test_direct_prompt_layout() {
        let mut obs = observation();
        obs.symptom_notes = Some("worse when climbing stairs".to_string());
        let prompt = direct_prompt(&obs);
        assert!(prompt.contains("Patient Data:\nAge: 58\nGender: Male\n"));
        assert!(prompt.contains("Free Text Symptoms: worse when climbing stairs\n"));
        assert!(prompt.contains("Vitals: BP 150/95, HR 88, Temp 98.9F\n"));
        assert!(prompt.contains("\"department\": \"Cardiology\" | \"Emergency\" | \"Neurology\" | \"General Medicine\""));
    }

    #[test]
    fn test_parse_direct_response_happy_path() {
        let content = r#"{
            "risk_level": "medium",
            "department": "General Medicine",
            "confidence": 81.5,
            "explanation": "Moderate concern given vitals.",
            "contributing_factors": ["Elevated Blood Pressure"]
        }"#;
        let assessment = parse_direct_response(content).unwrap();
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
        assert_eq!(assessment.department, Department::GeneralMedicine);
        assert_eq!(assessment.confidence, 81.5);
        assert!(assessment.bias_warning.is_none());
    }

    #[test]
    fn test_parse_direct_response_clamps_confidence() {
        let content = r#"{
            "risk_level": "High",
            "department": "Emergency",
            "confidence": 180.0,
            "explanation": "x",
            "contributing_factors": ["y"]
        }"#;
        let assessment = parse_direct_response(content).unwrap();
        assert_eq!(assessment.confidence, 100.0);
    }

    #[test]
    fn test_parse_direct_response_rejects_bad_payloads() {
        assert!(parse_direct_response("not json").is_err());
        assert!(parse_direct_response(
            r#"{"risk_level":"Catastrophic","department":"Emergency","confidence":1.0,
                "explanation":"x","contributing_factors":["y"]}"#
        )
        .is_err());
        assert!(parse_direct_response(
            r#"{"risk_level":"High","department":"Emergency","confidence":1.0,
                "explanation":"x","contributing_factors":[]}"#
        )
        .is_err());
        assert!(parse_direct_response(
            r#"{"risk_level":"High","department":"Emergency","confidence":1.0,
                "explanation":"","contributing_factors":["y"]}"#
        )
        .is_err());
    }
}
