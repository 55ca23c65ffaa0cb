use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Version stamp recorded in model metadata at training time.
///
/// Bump whenever an entry below changes. A bundle trained against a
/// different version still loads, but the provider logs the mismatch:
/// featureization and training must agree on this vocabulary or the
/// `has_critical_symptom`/`has_moderate_symptom` columns silently drift.
pub const LEXICON_VERSION: u32 = 1;

/// Symptoms that mark a patient as potentially critical.
pub const CRITICAL_SYMPTOMS: [&str; 9] = [
    "chest pain",
    "shortness of breath",
    "stroke signs",
    "seizure",
    "severe bleeding",
    "loss of consciousness",
    "difficulty breathing",
    "crushing chest pressure",
    "sudden numbness",
];

/// Symptoms that carry moderate weight on their own.
pub const MODERATE_SYMPTOMS: [&str; 10] = [
    "dizziness",
    "palpitations",
    "persistent headache",
    "high fever",
    "abdominal pain",
    "vomiting",
    "blurred vision",
    "fainting",
    "rapid heartbeat",
    "chest tightness",
];

/// Symptoms that route towards Cardiology during dataset labeling.
pub const CARDIOLOGY_INDICATORS: [&str; 5] = [
    "chest pain",
    "palpitations",
    "rapid heartbeat",
    "chest tightness",
    "crushing chest pressure",
];

/// Symptoms that route towards Neurology during dataset labeling.
pub const NEUROLOGY_INDICATORS: [&str; 6] = [
    "stroke signs",
    "seizure",
    "persistent headache",
    "sudden numbness",
    "blurred vision",
    "fainting",
];

/// Symptoms that route straight to Emergency during dataset labeling.
pub const EMERGENCY_INDICATORS: [&str; 3] = [
    "severe bleeding",
    "loss of consciousness",
    "difficulty breathing",
];

static CRITICAL_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| CRITICAL_SYMPTOMS.iter().copied().collect());

static MODERATE_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| MODERATE_SYMPTOMS.iter().copied().collect());

/// Canonical form: trimmed, lowercased, underscores collapsed to spaces.
///
/// Intake forms send `"chest pain"`, dataset rows carry `"chest_pain"`;
/// both phrasings must hit the same lexicon entry.
pub fn normalize(term: &str) -> String {
    term.trim().to_lowercase().replace('_', " ")
}

/// Underscore phrasing used by dataset rows.
pub fn underscore_form(entry: &str) -> String {
    entry.replace(' ', "_")
}

pub fn is_critical(symptom: &str) -> bool {
    CRITICAL_SET.contains(normalize(symptom).as_str())
}

pub fn is_moderate(symptom: &str) -> bool {
    MODERATE_SET.contains(normalize(symptom).as_str())
}

pub fn any_critical(symptoms: &[String]) -> bool {
    symptoms.iter().any(|s| is_critical(s))
}

pub fn any_moderate(symptoms: &[String]) -> bool {
    symptoms.iter().any(|s| is_moderate(s))
}

/// Normalized-membership test against one of the routing indicator sets.
pub fn matches_any(symptoms: &[String], indicators: &[&str]) -> bool {
    symptoms
        .iter()
        .any(|s| indicators.contains(&normalize(s).as_str()))
}
