use crate::error::{AppError, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters, SplitCriterion,
};
use std::collections::{BTreeSet, HashMap};

type Tree = DecisionTreeClassifier<f64, i32, DenseMatrix<f64>, Vec<i32>>;

/// Hyperparameters for one voting ensemble.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VotingForestParameters {
    /// Number of bagged trees
    pub trees: usize,

    /// Maximum depth per tree
    pub max_depth: u16,

    /// Seed for the bootstrap resampling
    pub seed: u64,
}

impl Default for VotingForestParameters {
    fn default() -> Self {
        Self {
            trees: 40,
            max_depth: 12,
            seed: 42,
        }
    }
}

/// Soft-voting ensemble of bagged decision trees.
///
/// Each tree is fitted on a bootstrap resample of the training matrix. The
/// class distribution for a row is the fraction of trees voting for each
/// label, so `predict_proba` yields a real distribution that sums to 1
/// without relying on per-tree probability estimates.
///
/// Labels live in a sorted vocabulary; predictions are indices into it. A
/// predicted index outside the vocabulary means a corrupt or mismatched
/// artifact and surfaces as `MalformedModelOutput`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VotingForest {
    trees: Vec<Tree>,
    labels: Vec<String>,
}

impl VotingForest {
    /// Fit the ensemble on a feature matrix and its string labels.
    pub fn fit(
        x: &Array2<f64>,
        labels: &[String],
        params: VotingForestParameters,
    ) -> Result<Self> {
        if x.nrows() == 0 {
            return Err(AppError::Validation(
                "Cannot fit on an empty feature matrix".to_string(),
            ));
        }
        if x.nrows() != labels.len() {
            return Err(AppError::Validation(format!(
                "Feature rows ({}) do not match label count ({})",
                x.nrows(),
                labels.len()
            )));
        }
        if params.trees == 0 {
            return Err(AppError::Validation(
                "Ensemble needs at least one tree".to_string(),
            ));
        }

        // Sorted vocabulary, matching how metadata records label sets
        let vocab: Vec<String> = labels
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let index: HashMap<&str, i32> = vocab
            .iter()
            .enumerate()
            .map(|(i, label)| (label.as_str(), i as i32))
            .collect();
        let y: Vec<i32> = labels.iter().map(|label| index[label.as_str()]).collect();

        let n_rows = x.nrows();
        let n_cols = x.ncols();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut trees = Vec::with_capacity(params.trees);

        for _ in 0..params.trees {
            let mut data = Vec::with_capacity(n_rows * n_cols);
            let mut sample_y = Vec::with_capacity(n_rows);
            for _ in 0..n_rows {
                let row = rng.gen_range(0..n_rows);
                data.extend(x.row(row).iter().copied());
                sample_y.push(y[row]);
            }

            let matrix = DenseMatrix::new(n_rows, n_cols, data, false);
            let tree_params = DecisionTreeClassifierParameters::default()
                .with_max_depth(params.max_depth)
                .with_criterion(SplitCriterion::Gini);

            let tree = DecisionTreeClassifier::fit(&matrix, &sample_y, tree_params)
                .map_err(|e| AppError::Internal(format!("Failed to train decision tree: {}", e)))?;
            trees.push(tree);
        }

        Ok(Self {
            trees,
            labels: vocab,
        })
    }

    /// Vote-fraction distribution over the label vocabulary for one row.
    pub fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        let x = DenseMatrix::new(1, features.len(), features.to_vec(), false);
        let mut votes = vec![0usize; self.labels.len()];

        for tree in &self.trees {
            let prediction = tree
                .predict(&x)
                .map_err(|e| AppError::Internal(format!("Prediction failed: {}", e)))?;
            let label = prediction[0];
            if label < 0 || label as usize >= votes.len() {
                return Err(AppError::MalformedModelOutput(format!(
                    "Tree voted for label index {} outside vocabulary of {}",
                    label,
                    self.labels.len()
                )));
            }
            votes[label as usize] += 1;
        }

        let total = self.trees.len() as f64;
        Ok(votes.into_iter().map(|v| v as f64 / total).collect())
    }

    /// Winning label index plus the full distribution for one row.
    ///
    /// Ties resolve to the lowest index, the alphabetically first label.
    pub fn predict(&self, features: &[f64]) -> Result<(usize, Vec<f64>)> {
        let proba = self.predict_proba(features)?;
        let mut best = 0;
        for (i, p) in proba.iter().enumerate() {
            if *p > proba[best] {
                best = i;
            }
        }
        Ok((best, proba))
    }

    /// Winning label indices for a whole matrix (evaluation path).
    pub fn predict_batch(&self, x: &Array2<f64>) -> Result<Vec<usize>> {
        let matrix = ndarray_to_densematrix(x);
        let mut votes = vec![vec![0usize; self.labels.len()]; x.nrows()];

        for tree in &self.trees {
            let predictions = tree
                .predict(&matrix)
                .map_err(|e| AppError::Internal(format!("Prediction failed: {}", e)))?;
            for (row, &label) in predictions.iter().enumerate() {
                if label < 0 || label as usize >= self.labels.len() {
                    return Err(AppError::MalformedModelOutput(format!(
                        "Tree voted for label index {} outside vocabulary of {}",
                        label,
                        self.labels.len()
                    )));
                }
                votes[row][label as usize] += 1;
            }
        }

        Ok(votes
            .into_iter()
            .map(|row_votes| {
                let mut best = 0;
                for (i, v) in row_votes.iter().enumerate() {
                    if *v > row_votes[best] {
                        best = i;
                    }
                }
                best
            })
            .collect())
    }

    /// Declared label vocabulary, sorted.
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Decode a predicted index back into its label.
    pub fn label(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(|s| s.as_str())
    }

    pub fn n_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

fn ndarray_to_densematrix(arr: &Array2<f64>) -> DenseMatrix<f64> {
    let shape = arr.shape();
    let data: Vec<f64> = arr.iter().cloned().collect();
    DenseMatrix::new(shape[0], shape[1], data, false)
}
