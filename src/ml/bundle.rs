use crate::error::{AppError, Result};
use crate::ml::classifier::VotingForest;
use crate::ml::lexicon;
use crate::ml::scaler::StandardScaler;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub const RISK_CLASSIFIER_FILE: &str = "risk_classifier.bin";
pub const DEPARTMENT_ROUTER_FILE: &str = "department_router.bin";
pub const FEATURE_SCALER_FILE: &str = "feature_scaler.bin";
pub const MODEL_METADATA_FILE: &str = "model_metadata.json";

/// Sidecar describing a trained bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub feature_columns: Vec<String>,
    pub risk_labels: Vec<String>,
    pub department_labels: Vec<String>,
    pub risk_accuracy: f64,
    pub department_accuracy: f64,
    pub training_samples: usize,
    pub test_samples: usize,
    pub models: Vec<String>,
    pub ensemble: String,
    pub lexicon_version: u32,
    pub trained_at: DateTime<Utc>,
}

/// Everything inference needs, loaded as one immutable unit.
#[derive(Debug)]
pub struct ModelBundle {
    pub risk: VotingForest,
    pub department: VotingForest,
    pub scaler: StandardScaler,
    pub metadata: ModelMetadata,
}

impl ModelBundle {
    /// Write all four artifacts into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        fs::write(
            dir.join(RISK_CLASSIFIER_FILE),
            bincode::serialize(&self.risk)?,
        )?;
        fs::write(
            dir.join(DEPARTMENT_ROUTER_FILE),
            bincode::serialize(&self.department)?,
        )?;
        fs::write(
            dir.join(FEATURE_SCALER_FILE),
            bincode::serialize(&self.scaler)?,
        )?;
        fs::write(
            dir.join(MODEL_METADATA_FILE),
            serde_json::to_vec_pretty(&self.metadata)?,
        )?;
        Ok(())
    }

    /// Load all four artifacts. Any missing or corrupt file is reported as
    /// `ModelUnavailable`; a partial bundle never loads.
    pub fn load(dir: &Path) -> Result<Self> {
        let risk = read_bincode(&dir.join(RISK_CLASSIFIER_FILE))?;
        let department = read_bincode(&dir.join(DEPARTMENT_ROUTER_FILE))?;
        let scaler = read_bincode(&dir.join(FEATURE_SCALER_FILE))?;

        let metadata_path = dir.join(MODEL_METADATA_FILE);
        let metadata_bytes = fs::read(&metadata_path)
            .map_err(|e| AppError::ModelUnavailable(format!("{}: {}", metadata_path.display(), e)))?;
        let metadata: ModelMetadata = serde_json::from_slice(&metadata_bytes)
            .map_err(|e| AppError::ModelUnavailable(format!("{}: {}", metadata_path.display(), e)))?;

        Ok(Self {
            risk,
            department,
            scaler,
            metadata,
        })
    }
}

fn read_bincode<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let bytes = fs::read(path)
        .map_err(|e| AppError::ModelUnavailable(format!("{}: {}", path.display(), e)))?;
    bincode::deserialize(&bytes)
        .map_err(|e| AppError::ModelUnavailable(format!("{}: {}", path.display(), e)))
}

/// Process-wide holder of the trained bundle.
///
/// Loads exactly once at startup. A failed load marks the provider
/// unavailable for the lifetime of the process; there is no retry and no
/// hot-swap. Shared read-only behind `Arc`, so request handlers never lock.
pub struct ModelProvider {
    bundle: Option<Arc<ModelBundle>>,
}

impl ModelProvider {
    /// Load the bundle from `dir`, degrading to unavailable on any error.
    pub fn load(dir: &Path) -> Self {
        match ModelBundle::load(dir) {
            Ok(bundle) => {
                if bundle.metadata.lexicon_version != lexicon::LEXICON_VERSION {
                    warn!(
                        bundle_version = bundle.metadata.lexicon_version,
                        runtime_version = lexicon::LEXICON_VERSION,
                        "Model bundle was trained against a different symptom lexicon"
                    );
                }
                info!(
                    dir = %dir.display(),
                    risk_accuracy = bundle.metadata.risk_accuracy,
                    department_accuracy = bundle.metadata.department_accuracy,
                    "Model bundle loaded"
                );
                Self {
                    bundle: Some(Arc::new(bundle)),
                }
            }
            Err(e) => {
                warn!(
                    dir = %dir.display(),
                    error = %e,
                    "Model bundle unavailable; ML tier disabled for this process"
                );
                Self { bundle: None }
            }
        }
    }

    /// A provider with no bundle, used when models are knowingly absent.
    pub fn disabled() -> Self {
        Self { bundle: None }
    }

    /// Wrap an in-memory bundle (training and test paths).
    pub fn from_bundle(bundle: ModelBundle) -> Self {
        Self {
            bundle: Some(Arc::new(bundle)),
        }
    }

    pub fn is_available(&self) -> bool {
        self.bundle.is_some()
    }

    pub fn bundle(&self) -> Option<Arc<ModelBundle>> {
        self.bundle.clone()
    }

    pub fn metadata(&self) -> Option<&ModelMetadata> {
        self.bundle.as_ref().map(|b| &b.metadata)
    }
}
