use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Urgency tier assigned to a patient.
///
/// Ordering follows escalation order, so `max` and comparisons read
/// naturally in the rule engine.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumString,
    Display,
)]
#[strum(ascii_case_insensitive)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Check if this tier requires immediate attention
    pub fn is_urgent(&self) -> bool {
        matches!(self, RiskLevel::High)
    }

    /// One step up the urgency ladder (High saturates)
    pub fn escalated(&self) -> RiskLevel {
        match self {
            RiskLevel::Low => RiskLevel::Medium,
            RiskLevel::Medium | RiskLevel::High => RiskLevel::High,
        }
    }
}

/// Destination department for a triaged patient.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[strum(ascii_case_insensitive)]
pub enum Department {
    Cardiology,
    Emergency,
    Neurology,
    #[serde(rename = "General Medicine")]
    #[strum(serialize = "General Medicine")]
    GeneralMedicine,
}

/// The pipeline's single output artifact.
///
/// Constructed once by whichever tier decided, returned to the caller and
/// never mutated afterwards. The only post-construction layering allowed is
/// the explanation overlay and the bias warning, both applied through the
/// builder methods before the value leaves the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Assigned urgency tier
    pub risk_level: RiskLevel,

    /// Destination department
    pub department: Department,

    /// Confidence in percent, always within [0, 100]
    pub confidence: f64,

    /// Clinician-facing explanation text
    pub explanation: String,

    /// Non-empty ordered list of factors that drove the decision
    pub contributing_factors: Vec<String>,

    /// Advisory fairness warning from the counterfactual audit, if any
    pub bias_warning: Option<String>,
}

impl RiskAssessment {
    pub fn new(
        risk_level: RiskLevel,
        department: Department,
        confidence: f64,
        explanation: impl Into<String>,
        contributing_factors: Vec<String>,
    ) -> Self {
        Self {
            risk_level,
            department,
            confidence,
            explanation: explanation.into(),
            contributing_factors,
            bias_warning: None,
        }
    }

    /// Attach the fairness warning produced by the bias audit.
    pub fn with_bias_warning(mut self, warning: Option<String>) -> Self {
        self.bias_warning = warning;
        self
    }

    /// Replace the explanation text, leaving every decision field untouched.
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }
}
