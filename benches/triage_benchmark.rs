// Triage Pipeline Performance Benchmarks
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use tokio::runtime::Runtime;
use triage_engine::config::TrainingConfig;
use triage_engine::ml::bundle::ModelProvider;
use triage_engine::ml::{training, FeatureVector, MlEngine};
use triage_engine::models::{Gender, PatientObservation};
use triage_engine::triage::{rules, safety, TriageOrchestrator};

fn sample_observation(symptoms: &[&str]) -> PatientObservation {
    PatientObservation {
        age: 58,
        gender: Gender::Female,
        systolic: 142,
        diastolic: 88,
        heart_rate: 96,
        temperature: 99.2,
        symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
        symptom_notes: Some("intermittent dizziness since morning".to_string()),
        conditions: vec!["hypertension".to_string()],
    }
}

fn bench_config() -> TrainingConfig {
    TrainingConfig {
        samples: 600,
        seed: 11,
        trees: 16,
        max_depth: 10,
        test_split: 0.2,
    }
}

fn feature_extraction(c: &mut Criterion) {
    let obs = sample_observation(&["chest pain", "shortness of breath"]);

    c.bench_function("feature_extraction", |b| {
        b.iter(|| FeatureVector::from_observation(black_box(&obs)));
    });
}

fn rule_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_engine");

    for symptom_count in [0usize, 2, 8].iter() {
        let pool = [
            "chest pain",
            "headache",
            "fever",
            "cough",
            "fatigue",
            "nausea",
            "dizziness",
            "sore throat",
        ];
        let obs = sample_observation(&pool[..*symptom_count]);

        group.bench_with_input(
            BenchmarkId::from_parameter(symptom_count),
            &obs,
            |b, obs| {
                b.iter(|| rules::assess(black_box(obs), rules::NOTE_KEY_MISSING));
            },
        );
    }
    group.finish();
}

fn safety_gate(c: &mut Criterion) {
    let calm = sample_observation(&["fatigue"]);
    let mut critical = sample_observation(&["fatigue"]);
    critical.heart_rate = 180;

    c.bench_function("safety_gate_pass", |b| {
        b.iter(|| safety::evaluate(black_box(&calm)));
    });
    c.bench_function("safety_gate_fire", |b| {
        b.iter(|| safety::evaluate(black_box(&critical)));
    });
}

fn classifier_prediction(c: &mut Criterion) {
    let (bundle, _) = training::train_bundle(&bench_config()).unwrap();
    let engine = MlEngine::new(Arc::new(ModelProvider::from_bundle(bundle)));
    let obs = sample_observation(&["chest pain", "shortness of breath"]);

    c.bench_function("classifier_prediction", |b| {
        b.iter(|| engine.predict(black_box(&obs)).unwrap());
    });
}

fn degraded_pipeline(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let orchestrator = Arc::new(TriageOrchestrator::new(
        MlEngine::new(Arc::new(ModelProvider::disabled())),
        None,
    ));
    let obs = sample_observation(&["headache", "nausea"]);

    c.bench_function("degraded_pipeline_assess", |b| {
        b.to_async(&rt).iter(|| {
            let orchestrator = orchestrator.clone();
            let obs = obs.clone();
            async move { orchestrator.assess(&obs).await }
        });
    });
}

fn classifier_pipeline(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let (bundle, _) = training::train_bundle(&bench_config()).unwrap();
    let orchestrator = Arc::new(TriageOrchestrator::new(
        MlEngine::new(Arc::new(ModelProvider::from_bundle(bundle))),
        None,
    ));
    let obs = sample_observation(&["chest pain", "shortness of breath"]);

    c.bench_function("classifier_pipeline_assess", |b| {
        b.to_async(&rt).iter(|| {
            let orchestrator = orchestrator.clone();
            let obs = obs.clone();
            async move { orchestrator.assess(&obs).await }
        });
    });
}

criterion_group!(
    benches,
    feature_extraction,
    rule_engine,
    safety_gate,
    classifier_prediction,
    degraded_pipeline,
    classifier_pipeline
);
criterion_main!(benches);
