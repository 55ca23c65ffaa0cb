use crate::models::{Department, PatientObservation, RiskAssessment, RiskLevel};

pub const RULE_CONFIDENCE: f64 = 72.0;

/// Tier note when neither a model bundle nor an API key is present.
pub const NOTE_KEY_MISSING: &str =
    "ML models unavailable, OpenAI key missing. Used deterministic triage rules.";
/// Tier note when the direct assessment was attempted and failed.
pub const NOTE_LLM_UNAVAILABLE: &str =
    "LLM analysis unavailable. Used deterministic triage rules.";
/// Tier note when classifier output failed label validation.
pub const NOTE_MODEL_REJECTED: &str =
    "ML model output failed validation. Used deterministic triage rules.";

const CRITICAL_TOKENS: [&str; 4] = ["chest pain", "shortness of breath", "stroke", "seizure"];
const MODERATE_TOKENS: [&str; 3] = ["dizziness", "palpitation", "headache"];

/// Deterministic fallback tier. Always succeeds; `note` records which
/// upstream tier was skipped and lands at the end of the explanation.
///
/// Rules run in a fixed order and later steps read the risk level as
/// mutated by earlier ones. The fever step escalates Medium only, then
/// re-reads the level before reassigning the department.
pub fn assess(observation: &PatientObservation, note: &str) -> RiskAssessment {
    let mut risk = RiskLevel::Low;
    let mut department = Department::GeneralMedicine;
    let mut factors: Vec<String> = Vec::new();

    if observation.systolic >= 160 || observation.diastolic >= 100 {
        risk = RiskLevel::High;
        department = Department::Cardiology;
        factors.push("Severe Hypertension".to_string());
    } else if observation.systolic >= 140 || observation.diastolic >= 90 {
        risk = RiskLevel::Medium;
        department = Department::Cardiology;
        factors.push("Elevated Blood Pressure".to_string());
    }

    if observation.heart_rate >= 120 {
        risk = RiskLevel::High;
        department = Department::Emergency;
        factors.push("Tachycardia".to_string());
    } else if observation.heart_rate >= 100 && risk == RiskLevel::Low {
        risk = RiskLevel::Medium;
        factors.push("Elevated Heart Rate".to_string());
    }

    if observation.temperature >= 102.0 {
        if risk == RiskLevel::Medium {
            risk = RiskLevel::High;
        }
        if risk == RiskLevel::High {
            department = Department::Emergency;
        }
        factors.push("High Fever".to_string());
    }

    let blob = observation.combined_symptom_text();
    if CRITICAL_TOKENS.iter().any(|token| blob.contains(token)) {
        risk = RiskLevel::High;
        department = Department::Emergency;
        factors.push("Critical Symptom Pattern".to_string());
    } else if MODERATE_TOKENS.iter().any(|token| blob.contains(token)) {
        if risk == RiskLevel::Low {
            risk = RiskLevel::Medium;
        }
        if blob.contains("headache") {
            department = Department::Neurology;
        }
        factors.push("Moderate Symptom Pattern".to_string());
    }

    if factors.is_empty() {
        factors.push("Stable Vitals".to_string());
    }

    let explanation = format!("{}. {}", factors.join("; "), note);
    RiskAssessment::new(risk, department, RULE_CONFIDENCE, explanation, factors)
}
