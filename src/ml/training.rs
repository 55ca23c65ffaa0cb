use crate::config::TrainingConfig;
use crate::error::{AppError, Result};
use crate::ml::bundle::{ModelBundle, ModelMetadata};
use crate::ml::classifier::{VotingForest, VotingForestParameters};
use crate::ml::features::{FeatureVector, FEATURE_COLUMNS, N_FEATURES};
use crate::ml::lexicon;
use crate::ml::scaler::StandardScaler;
use crate::models::{Department, Gender, PatientObservation, RiskLevel};
use chrono::Utc;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::path::Path;
use tracing::info;

/// Low-risk symptom pool. Training-only vocabulary: inference never needs
/// these because they match neither severity lexicon.
const MILD_SYMPTOMS: [&str; 12] = [
    "cough",
    "mild_fever",
    "fatigue",
    "body_aches",
    "runny_nose",
    "sore_throat",
    "mild_headache",
    "nausea",
    "joint_pain",
    "skin_rash",
    "mild_back_pain",
    "congestion",
];

const CONDITIONS: [&str; 11] = [
    "diabetes",
    "hypertension",
    "asthma",
    "copd",
    "heart_disease",
    "thyroid",
    "arthritis",
    "kidney_disease",
    "liver_disease",
    "obesity",
    "anemia",
];

/// One labeled synthetic patient.
#[derive(Debug, Clone)]
pub struct TrainingRecord {
    pub observation: PatientObservation,
    pub risk_label: RiskLevel,
    pub department_label: Department,
}

/// Accuracy report for a training run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TrainingReport {
    pub samples: usize,
    pub training_samples: usize,
    pub test_samples: usize,
    pub risk_accuracy: f64,
    pub department_accuracy: f64,
}

/// Generate `samples` labeled records from the shared lexicon pools.
pub fn generate_dataset(samples: usize, rng: &mut StdRng) -> Vec<TrainingRecord> {
    (0..samples).map(|_| generate_record(rng)).collect()
}

fn generate_record(rng: &mut StdRng) -> TrainingRecord {
    let age: u32 = rng.gen_range(1..=95);
    let gender = match rng.gen_range(0..3) {
        0 => Gender::Male,
        1 => Gender::Female,
        _ => Gender::Other,
    };

    let roll: f64 = rng.gen();
    let mut risk = if roll < 0.25 {
        RiskLevel::High
    } else if roll < 0.60 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };

    // Symptoms follow the risk tier; dataset rows use underscore phrasing.
    let mut symptoms: Vec<String> = Vec::new();
    match risk {
        RiskLevel::High => {
            sample_symptoms(&lexicon::CRITICAL_SYMPTOMS, 1..=3, rng, &mut symptoms);
            if rng.gen::<f64>() > 0.5 {
                sample_symptoms(&lexicon::MODERATE_SYMPTOMS, 0..=2, rng, &mut symptoms);
            }
        }
        RiskLevel::Medium => {
            sample_symptoms(&lexicon::MODERATE_SYMPTOMS, 1..=3, rng, &mut symptoms);
            if rng.gen::<f64>() > 0.6 {
                sample_symptoms(&MILD_SYMPTOMS, 0..=2, rng, &mut symptoms);
            }
        }
        RiskLevel::Low => {
            sample_symptoms(&MILD_SYMPTOMS, 1..=3, rng, &mut symptoms);
        }
    }

    let (systolic, diastolic, heart_rate, temperature) = match risk {
        RiskLevel::High => (
            rng.gen_range(160..=220),
            rng.gen_range(95..=130),
            rng.gen_range(110..=180),
            round1(rng.gen_range(100.0..106.0)),
        ),
        RiskLevel::Medium => (
            rng.gen_range(130..=170),
            rng.gen_range(80..=100),
            rng.gen_range(85..=130),
            round1(rng.gen_range(99.0..103.0)),
        ),
        RiskLevel::Low => (
            rng.gen_range(100..=140),
            rng.gen_range(60..=90),
            rng.gen_range(55..=100),
            round1(rng.gen_range(97.0..99.5)),
        ),
    };

    let max_conditions = if age > 50 {
        3
    } else if age > 30 {
        2
    } else {
        1
    };
    let condition_count = rng.gen_range(0..=max_conditions);
    let mut conditions: Vec<String> = CONDITIONS
        .choose_multiple(rng, condition_count)
        .map(|c| c.to_string())
        .collect();
    if conditions.is_empty() {
        conditions.push("none".to_string());
    }

    let mut department = if risk == RiskLevel::High
        && (lexicon::matches_any(&symptoms, &lexicon::EMERGENCY_INDICATORS)
            || heart_rate > 150
            || systolic > 200)
    {
        Department::Emergency
    } else if lexicon::matches_any(&symptoms, &lexicon::CARDIOLOGY_INDICATORS) {
        Department::Cardiology
    } else if lexicon::matches_any(&symptoms, &lexicon::NEUROLOGY_INDICATORS) {
        Department::Neurology
    } else if risk == RiskLevel::High {
        Department::Emergency
    } else {
        Department::GeneralMedicine
    };

    // Elderly patients with mild presentations sometimes get escalated
    if age > 70 && risk == RiskLevel::Low && rng.gen::<f64>() < 0.3 {
        risk = RiskLevel::Medium;
    }

    // Cardiac history plus cardiac symptoms is always urgent
    if conditions.iter().any(|c| c == "heart_disease")
        && risk != RiskLevel::High
        && lexicon::matches_any(&symptoms, &lexicon::CARDIOLOGY_INDICATORS)
    {
        risk = RiskLevel::High;
        department = Department::Emergency;
    }

    TrainingRecord {
        observation: PatientObservation {
            age,
            gender,
            systolic,
            diastolic,
            heart_rate,
            temperature,
            symptoms,
            symptom_notes: None,
            conditions,
        },
        risk_label: risk,
        department_label: department,
    }
}

fn sample_symptoms(
    pool: &[&str],
    count_range: std::ops::RangeInclusive<usize>,
    rng: &mut StdRng,
    out: &mut Vec<String>,
) {
    let count = rng.gen_range(count_range);
    out.extend(
        pool.choose_multiple(rng, count)
            .map(|s| lexicon::underscore_form(s)),
    );
}

/// Fit scaler and both forests, returning the bundle plus held-out accuracy.
///
/// The scaler is fitted on the full matrix; the forests only ever see the
/// training partition and are scored on the held-out fifth.
pub fn train_bundle(config: &TrainingConfig) -> Result<(ModelBundle, TrainingReport)> {
    if config.samples < 10 {
        return Err(AppError::Validation(
            "Training needs at least 10 samples".to_string(),
        ));
    }
    if config.test_split <= 0.0 || config.test_split >= 1.0 {
        return Err(AppError::Validation(
            "test_split must be strictly between 0 and 1".to_string(),
        ));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let records = generate_dataset(config.samples, &mut rng);
    let n = records.len();

    let mut flat = Vec::with_capacity(n * N_FEATURES);
    for record in &records {
        flat.extend(
            FeatureVector::from_observation(&record.observation)
                .values()
                .iter()
                .copied(),
        );
    }
    let x = Array2::from_shape_vec((n, N_FEATURES), flat)
        .map_err(|e| AppError::Internal(format!("Failed to build feature matrix: {}", e)))?;

    let scaler = StandardScaler::fit(&x);
    let x_scaled = scaler.transform(&x);

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut rng);
    let test_n = (((n as f64) * config.test_split).round() as usize).clamp(1, n - 1);
    let (test_idx, train_idx) = indices.split_at(test_n);

    let x_train = rows_by_index(&x_scaled, train_idx)?;
    let x_test = rows_by_index(&x_scaled, test_idx)?;
    let risk_train = labels_by_index(&records, train_idx, |r| r.risk_label.to_string());
    let risk_test = labels_by_index(&records, test_idx, |r| r.risk_label.to_string());
    let dept_train = labels_by_index(&records, train_idx, |r| r.department_label.to_string());
    let dept_test = labels_by_index(&records, test_idx, |r| r.department_label.to_string());

    let risk_forest = VotingForest::fit(
        &x_train,
        &risk_train,
        VotingForestParameters {
            trees: config.trees,
            max_depth: config.max_depth,
            seed: config.seed,
        },
    )?;
    let dept_forest = VotingForest::fit(
        &x_train,
        &dept_train,
        VotingForestParameters {
            trees: config.trees,
            max_depth: config.max_depth,
            seed: config.seed.wrapping_add(1),
        },
    )?;

    let risk_accuracy = round4(accuracy(&risk_forest, &x_test, &risk_test)?);
    let department_accuracy = round4(accuracy(&dept_forest, &x_test, &dept_test)?);

    info!(
        samples = n,
        training_samples = train_idx.len(),
        test_samples = test_idx.len(),
        risk_accuracy,
        department_accuracy,
        "Model training completed"
    );

    let metadata = ModelMetadata {
        feature_columns: FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect(),
        risk_labels: risk_forest.labels().to_vec(),
        department_labels: dept_forest.labels().to_vec(),
        risk_accuracy,
        department_accuracy,
        training_samples: train_idx.len(),
        test_samples: test_idx.len(),
        models: vec![format!("BaggedTrees({} trees)", config.trees)],
        ensemble: "VotingForest (soft vote)".to_string(),
        lexicon_version: lexicon::LEXICON_VERSION,
        trained_at: Utc::now(),
    };

    let report = TrainingReport {
        samples: n,
        training_samples: train_idx.len(),
        test_samples: test_idx.len(),
        risk_accuracy,
        department_accuracy,
    };

    Ok((
        ModelBundle {
            risk: risk_forest,
            department: dept_forest,
            scaler,
            metadata,
        },
        report,
    ))
}

/// Train and persist the artifact bundle into `dir`.
pub fn train_and_save(config: &TrainingConfig, dir: &Path) -> Result<TrainingReport> {
    let (bundle, report) = train_bundle(config)?;
    bundle.save(dir)?;
    info!(dir = %dir.display(), "Model artifacts saved");
    Ok(report)
}

fn rows_by_index(x: &Array2<f64>, idx: &[usize]) -> Result<Array2<f64>> {
    let mut flat = Vec::with_capacity(idx.len() * x.ncols());
    for &i in idx {
        flat.extend(x.row(i).iter().copied());
    }
    Array2::from_shape_vec((idx.len(), x.ncols()), flat)
        .map_err(|e| AppError::Internal(format!("Failed to slice feature matrix: {}", e)))
}

fn labels_by_index<F>(records: &[TrainingRecord], idx: &[usize], f: F) -> Vec<String>
where
    F: Fn(&TrainingRecord) -> String,
{
    idx.iter().map(|&i| f(&records[i])).collect()
}

fn accuracy(forest: &VotingForest, x: &Array2<f64>, labels: &[String]) -> Result<f64> {
    if labels.is_empty() {
        return Ok(0.0);
    }
    let predictions = forest.predict_batch(x)?;
    let vocab = forest.labels();
    let correct = predictions
        .iter()
        .zip(labels.iter())
        .filter(|(pred, label)| vocab.iter().position(|l| l == *label) == Some(**pred))
        .count();
    Ok(correct as f64 / labels.len() as f64)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> TrainingConfig {
        TrainingConfig {
            samples: 300,
            seed: 11,
            trees: 5,
            max_depth: 6,
            test_split: 0.2,
        }
    }

    #[test]
    fn test_generation_is_deterministic() {
        let mut rng_a = StdRng::seed_from_u64(99);
        let mut rng_b = StdRng::seed_from_u64(99);
        let a = generate_dataset(50, &mut rng_a);
        let b = generate_dataset(50, &mut rng_b);

        for (left, right) in a.iter().zip(b.iter()) {
            assert_eq!(left.risk_label, right.risk_label);
            assert_eq!(left.department_label, right.department_label);
            assert_eq!(
                serde_json::to_value(&left.observation).unwrap(),
                serde_json::to_value(&right.observation).unwrap()
            );
        }
    }

    #[test]
    fn test_generated_records_are_plausible() {
        let mut rng = StdRng::seed_from_u64(5);
        for record in generate_dataset(200, &mut rng) {
            let obs = &record.observation;
            assert!((1..=95).contains(&obs.age));
            assert!((100..=220).contains(&obs.systolic));
            assert!((55..=180).contains(&obs.heart_rate));
            assert!(!obs.symptoms.is_empty());
            assert!(!obs.conditions.is_empty());

            if record.risk_label == RiskLevel::High {
                // High comes either from critical symptoms or the cardiac
                // history escalation, which needs a cardiology indicator.
                assert!(
                    lexicon::any_critical(&obs.symptoms)
                        || lexicon::matches_any(&obs.symptoms, &lexicon::CARDIOLOGY_INDICATORS)
                );
            }
            if record.department_label == Department::Neurology {
                assert!(lexicon::matches_any(
                    &obs.symptoms,
                    &lexicon::NEUROLOGY_INDICATORS
                ));
            }
        }
    }

    #[test]
    fn test_train_bundle_learns_the_synthetic_rules() {
        let (bundle, report) = train_bundle(&quick_config()).unwrap();

        assert_eq!(report.training_samples + report.test_samples, 300);
        assert!(report.risk_accuracy > 0.6, "risk {}", report.risk_accuracy);
        assert!(
            report.department_accuracy > 0.5,
            "department {}",
            report.department_accuracy
        );

        assert_eq!(bundle.metadata.risk_labels, vec!["High", "Low", "Medium"]);
        assert_eq!(bundle.metadata.lexicon_version, lexicon::LEXICON_VERSION);
        let expected_columns: Vec<String> =
            FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
        assert_eq!(bundle.metadata.feature_columns, expected_columns);
    }

    #[test]
    fn test_train_bundle_rejects_bad_config() {
        let mut config = quick_config();
        config.samples = 5;
        assert!(train_bundle(&config).is_err());

        let mut config = quick_config();
        config.test_split = 1.0;
        assert!(train_bundle(&config).is_err());
    }
}
