use crate::models::{Department, PatientObservation, RiskAssessment, RiskLevel};

pub const CRITICAL_HEART_RATE: i32 = 150;
pub const CRITICAL_SYSTOLIC: i32 = 180;
pub const CRITICAL_TEMPERATURE: f64 = 104.0;

const GATE_EXPLANATION: &str =
    "Critical vitals detected (HR > 150 or BP > 180/x or Temp > 104F). Immediate attention required.";

/// Hard vitals gate, evaluated before any model runs. Thresholds are
/// strict: a reading exactly at a threshold passes through to the
/// pipeline. Diastolic pressure is not consulted.
pub fn evaluate(observation: &PatientObservation) -> Option<RiskAssessment> {
    let critical = observation.heart_rate > CRITICAL_HEART_RATE
        || observation.systolic > CRITICAL_SYSTOLIC
        || observation.temperature > CRITICAL_TEMPERATURE;
    if !critical {
        return None;
    }

    Some(RiskAssessment::new(
        RiskLevel::High,
        Department::Emergency,
        95.0,
        GATE_EXPLANATION,
        vec!["Critical Vitals".to_string()],
    ))
}
