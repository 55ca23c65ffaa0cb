use crate::ml::lexicon;
use crate::models::PatientObservation;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Column names in schema order, as recorded in model metadata.
///
/// The classifiers were fitted against exactly this ordering; any change
/// here without retraining silently degrades every prediction, so the
/// schema is a single const shared by extraction, training and metadata.
pub const FEATURE_COLUMNS: [&str; 11] = [
    "age",
    "gender_encoded",
    "systolic",
    "diastolic",
    "heart_rate",
    "temperature",
    "num_symptoms",
    "has_critical_symptom",
    "has_moderate_symptom",
    "has_chronic_condition",
    "num_conditions",
];

pub const N_FEATURES: usize = FEATURE_COLUMNS.len();

/// Fixed-order numeric encoding of one patient observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    values: [f64; N_FEATURES],
}

impl FeatureVector {
    /// Encode an observation into the training schema.
    ///
    /// Two deliberate substitutions keep ad-hoc inputs inside the training
    /// distribution: a (0, 0) blood pressure (malformed raw string) encodes
    /// as the typical 120/80, and an empty symptom list encodes as a count
    /// of 1 because no training row has zero symptoms.
    pub fn from_observation(obs: &PatientObservation) -> Self {
        let (systolic, diastolic) = if obs.systolic == 0 && obs.diastolic == 0 {
            (120, 80)
        } else {
            (obs.systolic, obs.diastolic)
        };

        let symptom_count = if obs.symptoms.is_empty() {
            1.0
        } else {
            obs.symptoms.len() as f64
        };

        let active_conditions = obs.active_conditions();

        Self {
            values: [
                obs.age as f64,
                obs.gender.code(),
                systolic as f64,
                diastolic as f64,
                obs.heart_rate as f64,
                obs.temperature,
                symptom_count,
                flag(lexicon::any_critical(&obs.symptoms)),
                flag(lexicon::any_moderate(&obs.symptoms)),
                flag(!active_conditions.is_empty()),
                active_conditions.len() as f64,
            ],
        }
    }

    /// Build a vector directly from raw values (training rows).
    pub fn from_values(values: [f64; N_FEATURES]) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn to_array(&self) -> Array1<f64> {
        Array1::from_vec(self.values.to_vec())
    }
}

fn flag(condition: bool) -> f64 {
    if condition {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;

    fn observation() -> PatientObservation {
        PatientObservation {
            age: 70,
            gender: Gender::Female,
            systolic: 150,
            diastolic: 95,
            heart_rate: 110,
            temperature: 101.2,
            symptoms: vec!["chest_pain".to_string(), "dizziness".to_string()],
            symptom_notes: None,
            conditions: vec!["hypertension".to_string(), "none".to_string()],
        }
    }

    #[test]
    fn test_schema_order() {
        let features = FeatureVector::from_observation(&observation());
        let v = features.values();
        assert_eq!(v.len(), N_FEATURES);
        assert_eq!(v[0], 70.0); // age
        assert_eq!(v[1], 1.0); // female
        assert_eq!(v[2], 150.0); // systolic
        assert_eq!(v[3], 95.0); // diastolic
        assert_eq!(v[4], 110.0); // heart_rate
        assert_eq!(v[5], 101.2); // temperature
        assert_eq!(v[6], 2.0); // num_symptoms
        assert_eq!(v[7], 1.0); // has_critical_symptom
        assert_eq!(v[8], 1.0); // has_moderate_symptom
        assert_eq!(v[9], 1.0); // has_chronic_condition
        assert_eq!(v[10], 1.0); // num_conditions excludes "none"
    }

    #[test]
    fn test_underscore_and_space_phrasings_agree() {
        let mut spaced = observation();
        spaced.symptoms = vec!["chest pain".to_string()];
        let mut underscored = observation();
        underscored.symptoms = vec!["chest_pain".to_string()];

        let a = FeatureVector::from_observation(&spaced);
        let b = FeatureVector::from_observation(&underscored);
        assert_eq!(a.values()[7], 1.0);
        assert_eq!(a.values()[7], b.values()[7]);
    }

    #[test]
    fn test_empty_symptom_list_encodes_as_one() {
        let mut obs = observation();
        obs.symptoms.clear();
        let features = FeatureVector::from_observation(&obs);
        assert_eq!(features.values()[6], 1.0);
        assert_eq!(features.values()[7], 0.0);
        assert_eq!(features.values()[8], 0.0);
    }

    #[test]
    fn test_malformed_bp_substitutes_typical_values() {
        let mut obs = observation();
        obs.systolic = 0;
        obs.diastolic = 0;
        let features = FeatureVector::from_observation(&obs);
        assert_eq!(features.values()[2], 120.0);
        assert_eq!(features.values()[3], 80.0);
    }

    #[test]
    fn test_conditions_all_placeholder() {
        let mut obs = observation();
        obs.conditions = vec!["none".to_string(), "None".to_string()];
        let features = FeatureVector::from_observation(&obs);
        assert_eq!(features.values()[9], 0.0);
        assert_eq!(features.values()[10], 0.0);
    }
}
