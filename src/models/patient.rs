use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A single patient intake observation.
///
/// Built once at the request boundary and treated as immutable by every
/// pipeline stage. Blood pressure arrives as a `"systolic/diastolic"`
/// string and is parsed exactly once, here; downstream code only ever sees
/// the numeric components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientObservation {
    /// Age in years
    pub age: u32,

    /// Reported gender (lenient parse, unknown values map to `Other`)
    pub gender: Gender,

    /// Systolic blood pressure in mmHg (0 when the raw string was malformed)
    pub systolic: i32,

    /// Diastolic blood pressure in mmHg (0 when the raw string was malformed)
    pub diastolic: i32,

    /// Heart rate in beats per minute
    pub heart_rate: i32,

    /// Body temperature in degrees Fahrenheit
    pub temperature: f64,

    /// Structured symptom list
    pub symptoms: Vec<String>,

    /// Free-text symptom notes, if any
    pub symptom_notes: Option<String>,

    /// Known chronic conditions ("none"/empty entries carry no signal)
    pub conditions: Vec<String>,
}

impl PatientObservation {
    /// Blood pressure in the `"S/D"` display form used by prompts.
    pub fn bp_display(&self) -> String {
        format!("{}/{}", self.systolic, self.diastolic)
    }

    /// Conditions that actually carry clinical signal.
    ///
    /// Entries equal to `"none"` or empty after trimming are placeholders
    /// from intake forms and are excluded everywhere.
    pub fn active_conditions(&self) -> Vec<&str> {
        self.conditions
            .iter()
            .map(|c| c.as_str())
            .filter(|c| {
                let lowered = c.trim().to_lowercase();
                !lowered.is_empty() && lowered != "none"
            })
            .collect()
    }

    /// Lowercased blob of structured symptoms plus free-text notes.
    ///
    /// The rule engine matches keywords against this single string so that
    /// both input channels are honored.
    pub fn combined_symptom_text(&self) -> String {
        let mut blob = self.symptoms.join(" ");
        if let Some(notes) = &self.symptom_notes {
            blob.push(' ');
            blob.push_str(notes);
        }
        blob.to_lowercase()
    }
}

/// Reported gender, as the classifiers encode it.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display,
)]
#[strum(ascii_case_insensitive)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    /// Lenient parse: unrecognized values map to `Other` instead of failing.
    pub fn parse_lenient(raw: &str) -> Self {
        raw.trim().parse().unwrap_or(Gender::Other)
    }

    /// Numeric code used by the feature schema (male 0, female 1, other 2).
    pub fn code(&self) -> f64 {
        match self {
            Gender::Male => 0.0,
            Gender::Female => 1.0,
            Gender::Other => 2.0,
        }
    }

    /// Counterfactual gender for the bias audit. `None` when the audit
    /// precondition (binary reported gender) does not hold.
    pub fn flipped(&self) -> Option<Gender> {
        match self {
            Gender::Male => Some(Gender::Female),
            Gender::Female => Some(Gender::Male),
            Gender::Other => None,
        }
    }
}

/// Parse a `"systolic/diastolic"` string into numeric components.
///
/// Anything that is not exactly two integer fields separated by a single
/// slash yields `(0, 0)`. The zeros flow through the safety gate and rule
/// engine as true readings (they trip no threshold); the feature extractor
/// substitutes typical resting values for them instead.
pub fn parse_blood_pressure(raw: &str) -> (i32, i32) {
    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != 2 {
        return (0, 0);
    }
    match (parts[0].trim().parse(), parts[1].trim().parse()) {
        (Ok(systolic), Ok(diastolic)) => (systolic, diastolic),
        _ => (0, 0),
    }
}
