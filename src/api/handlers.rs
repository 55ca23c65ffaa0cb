use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::ml::{MlEngine, MlPrediction, ModelMetadata};
use crate::models::*;
use crate::triage::{wearable, WearableStreams};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ml_models_loaded: state.provider.is_available(),
        llm_configured: state.orchestrator.generative_configured(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub ml_models_loaded: bool,
    pub llm_configured: bool,
}

/// Run the full triage pipeline for one patient
pub async fn analyze_patient(
    State(state): State<AppState>,
    Json(request): Json<PatientRequest>,
) -> Result<Json<RiskAssessment>> {
    request.validate()?;

    let request_id = Uuid::new_v4();
    let observation = request.into_observation();
    tracing::info!(
        %request_id,
        age = observation.age,
        heart_rate = observation.heart_rate,
        "Analyze request accepted"
    );

    let assessment = state.orchestrator.assess(&observation).await;
    Ok(Json(assessment))
}

/// Patient intake DTO. Blood pressure arrives as a `"systolic/diastolic"`
/// string; unparseable values degrade to zeros rather than rejecting the
/// request.
#[derive(Debug, Deserialize, Validate)]
pub struct PatientRequest {
    #[validate(range(min = 0, max = 130))]
    pub age: u32,
    pub gender: String,
    #[validate(length(max = 15))]
    pub bp: String,
    #[validate(range(min = 0, max = 400))]
    pub heart_rate: i32,
    #[validate(range(min = 60.0, max = 115.0))]
    pub temperature: f64,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub symptoms_text: Option<String>,
    #[serde(default)]
    pub conditions: Vec<String>,
}

impl PatientRequest {
    pub fn into_observation(self) -> PatientObservation {
        let (systolic, diastolic) = parse_blood_pressure(&self.bp);
        PatientObservation {
            age: self.age,
            gender: Gender::parse_lenient(&self.gender),
            systolic,
            diastolic,
            heart_rate: self.heart_rate,
            temperature: self.temperature,
            symptoms: self.symptoms,
            symptom_notes: self.symptoms_text,
            conditions: self.conditions,
        }
    }
}

/// Raw classifier prediction with full probability breakdowns
pub async fn predict_raw(
    State(state): State<AppState>,
    Json(request): Json<PatientRequest>,
) -> Result<Json<MlPrediction>> {
    request.validate()?;

    let observation = request.into_observation();
    let prediction = MlEngine::new(state.provider.clone())
        .predict(&observation)?
        .ok_or_else(|| {
            AppError::ModelUnavailable(
                "No model bundle loaded. Run `triage-cli train` first.".to_string(),
            )
        })?;

    Ok(Json(prediction))
}

/// Model bundle introspection
pub async fn models_status(State(state): State<AppState>) -> Result<Json<ModelsStatusResponse>> {
    Ok(Json(ModelsStatusResponse {
        available: state.provider.is_available(),
        metadata: state.provider.metadata().cloned(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ModelsStatusResponse {
    pub available: bool,
    pub metadata: Option<ModelMetadata>,
}

/// Deterministic screening over wearable vitals streams
pub async fn analyze_wearable(
    Json(request): Json<WearableRequest>,
) -> Result<Json<RiskAssessment>> {
    let streams = WearableStreams {
        heart_rate_stream: request.heart_rate_stream,
        oxygen_level_stream: request.oxygen_level_stream,
    };
    Ok(Json(wearable::screen(&streams)))
}

#[derive(Debug, Deserialize)]
pub struct WearableRequest {
    pub heart_rate_stream: Vec<i32>,
    pub oxygen_level_stream: Vec<i32>,
}
