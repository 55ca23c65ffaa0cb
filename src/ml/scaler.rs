use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Per-column z-score standardization fitted once at training time.
///
/// Persisted alongside the classifiers; inference must scale with the same
/// statistics the trees were fitted against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit column means and population standard deviations.
    pub fn fit(x: &Array2<f64>) -> Self {
        let n_rows = x.nrows();
        let n_cols = x.ncols();

        if n_rows == 0 {
            return Self {
                means: vec![0.0; n_cols],
                stds: vec![0.0; n_cols],
            };
        }

        let mut means = Vec::with_capacity(n_cols);
        let mut stds = Vec::with_capacity(n_cols);

        for j in 0..n_cols {
            let column = x.column(j);
            let mean = column.sum() / n_rows as f64;
            let variance = column
                .iter()
                .map(|v| {
                    let d = v - mean;
                    d * d
                })
                .sum::<f64>()
                / n_rows as f64;
            means.push(mean);
            stds.push(variance.sqrt());
        }

        Self { means, stds }
    }

    /// Scale a full matrix (training path).
    pub fn transform(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut scaled = x.clone();
        for (j, mut column) in scaled.columns_mut().into_iter().enumerate() {
            let mean = self.means[j];
            let std = self.stds[j];
            column.mapv_inplace(|v| scale_value(v, mean, std));
        }
        scaled
    }

    /// Scale a single feature row (inference path).
    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(self.stds.iter()))
            .map(|(&v, (&mean, &std))| scale_value(v, mean, std))
            .collect()
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }
}

/// A zero-variance column scales to 0.0 instead of dividing by zero.
fn scale_value(value: f64, mean: f64, std: f64) -> f64 {
    if std == 0.0 {
        0.0
    } else {
        (value - mean) / std
    }
}
