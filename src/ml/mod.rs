/// Classifier tier: feature extraction, scaling, bagged-tree ensembles,
/// artifact persistence, synthetic training, and the inference adapter
/// the orchestrator calls.
pub mod bundle;
pub mod classifier;
pub mod features;
pub mod inference;
pub mod lexicon;
pub mod scaler;
pub mod training;

pub use bundle::{ModelBundle, ModelMetadata, ModelProvider};
pub use classifier::{VotingForest, VotingForestParameters};
pub use features::{FeatureVector, FEATURE_COLUMNS, N_FEATURES};
pub use inference::{MlEngine, MlPrediction};
pub use scaler::StandardScaler;
pub use training::{TrainingRecord, TrainingReport};
