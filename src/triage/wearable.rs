use crate::models::{Department, RiskAssessment, RiskLevel};
use serde::{Deserialize, Serialize};

/// Raw vitals stream from a wearable device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WearableStreams {
    pub heart_rate_stream: Vec<i32>,
    pub oxygen_level_stream: Vec<i32>,
}

fn mean(values: &[i32]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().map(|v| *v as f64).sum::<f64>() / values.len() as f64
    }
}

/// Deterministic screening over wearable streams. No models involved.
///
/// An oxygen average below 95 sets the level to Medium even when the
/// heart-rate step already produced High; only the sub-90 branch restores
/// High. Empty streams average to zero, so a missing oxygen stream reads
/// as hypoxia.
pub fn screen(streams: &WearableStreams) -> RiskAssessment {
    let avg_hr = mean(&streams.heart_rate_stream);
    let avg_o2 = mean(&streams.oxygen_level_stream);
    let max_hr = streams.heart_rate_stream.iter().copied().max().unwrap_or(0);

    let mut risk = RiskLevel::Low;
    let mut explanation = "Vitals within normal range.".to_string();
    let mut factors: Vec<String> = Vec::new();

    if avg_hr > 100.0 || max_hr > 150 {
        risk = RiskLevel::High;
        explanation = format!("Detected Tachycardia events. Max HR: {}", max_hr);
        factors.push("High Heart Rate".to_string());
    }

    if avg_o2 < 95.0 {
        risk = RiskLevel::Medium;
        explanation.push_str(&format!(" Low Oxygen Saturation ({}%).", avg_o2));
        factors.push("Low Oxygen".to_string());
        if avg_o2 < 90.0 {
            risk = RiskLevel::High;
            explanation = format!("CRITICAL Hypoxia detected ({}%).", avg_o2);
        }
    }

    let department = if factors.iter().any(|f| f.contains("Heart")) {
        Department::Cardiology
    } else {
        Department::GeneralMedicine
    };

    RiskAssessment::new(risk, department, 90.0, explanation, factors)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn streams(heart: Vec<i32>, oxygen: Vec<i32>) -> WearableStreams {
        WearableStreams {
            heart_rate_stream: heart,
            oxygen_level_stream: oxygen,
        }
    }

    #[test]
    fn test_normal_streams_stay_low() {
        let result = screen(&streams(vec![70, 72, 75], vec![98, 99, 97]));
        assert_eq!(result.risk_level, RiskLevel::Low);
        assert_eq!(result.department, Department::GeneralMedicine);
        assert_eq!(result.confidence, 90.0);
        assert_eq!(result.explanation, "Vitals within normal range.");
        assert!(result.contributing_factors.is_empty());
    }

    #[test]
    fn test_high_average_heart_rate_flags_tachycardia() {
        let result = screen(&streams(vec![110, 112, 108], vec![98, 98, 98]));
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.department, Department::Cardiology);
        assert_eq!(result.explanation, "Detected Tachycardia events. Max HR: 112");
        assert_eq!(result.contributing_factors, vec!["High Heart Rate"]);
    }

    #[test]
    fn test_single_spike_above_150_flags_tachycardia() {
        let result = screen(&streams(vec![70, 155, 72], vec![98, 98, 98]));
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.explanation, "Detected Tachycardia events. Max HR: 155");
    }

    #[test]
    fn test_mild_hypoxia_overwrites_tachycardia_level() {
        // Oxygen step rewrites the level after the heart-rate step
        let result = screen(&streams(vec![160, 160, 160], vec![93, 93, 93]));
        assert_eq!(result.risk_level, RiskLevel::Medium);
        assert_eq!(result.department, Department::Cardiology);
        assert_eq!(
            result.contributing_factors,
            vec!["High Heart Rate", "Low Oxygen"]
        );
        assert!(result
            .explanation
            .ends_with(" Low Oxygen Saturation (93%)."));
    }

    #[test]
    fn test_severe_hypoxia_restores_high_and_rewrites_explanation() {
        let result = screen(&streams(vec![70, 72], vec![85, 87]));
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.department, Department::GeneralMedicine);
        assert_eq!(result.explanation, "CRITICAL Hypoxia detected (86%).");
        assert_eq!(result.contributing_factors, vec!["Low Oxygen"]);
    }

    #[test]
    fn test_empty_oxygen_stream_reads_as_hypoxia() {
        let result = screen(&streams(vec![70, 72], vec![]));
        assert_eq!(result.risk_level, RiskLevel::High);
        assert_eq!(result.explanation, "CRITICAL Hypoxia detected (0%).");
    }
}
