use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Error measures on one data partition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitMetrics {
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
}

impl SplitMetrics {
    pub fn compute(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let residuals = y_true - y_pred;
        let n = residuals.len().max(1) as f64;

        let mse = residuals.mapv(|r| r * r).sum() / n;
        let mae = residuals.mapv(f64::abs).sum() / n;

        SplitMetrics {
            rmse: mse.sqrt(),
            mae,
            r2: r_squared(y_true, &residuals),
        }
    }
}

/// Coefficient of determination. A constant target scores 1 when matched
/// exactly and 0 otherwise.
fn r_squared(y_true: &Array1<f64>, residuals: &Array1<f64>) -> f64 {
    let mean = y_true.mean().unwrap_or(0.0);
    let ss_tot: f64 = y_true.iter().map(|y| (y - mean).powi(2)).sum();
    let ss_res: f64 = residuals.iter().map(|r| r * r).sum();

    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Evaluation of a trained model on its train and test partitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub train: SplitMetrics,
    pub test: SplitMetrics,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Sorted by importance, largest first.
    pub feature_importances: Vec<FeatureImportance>,
}

impl Metrics {
    pub fn new(
        train: SplitMetrics,
        test: SplitMetrics,
        train_rows: usize,
        test_rows: usize,
        names: &[String],
        importances: &[f64],
    ) -> Self {
        let mut feature_importances: Vec<FeatureImportance> = names
            .iter()
            .zip(importances)
            .map(|(feature, &importance)| FeatureImportance {
                feature: feature.clone(),
                importance,
            })
            .collect();
        feature_importances.sort_by(|a, b| b.importance.total_cmp(&a.importance));

        Metrics {
            train,
            test,
            train_rows,
            test_rows,
            feature_importances,
        }
    }

    pub fn importance_sum(&self) -> f64 {
        self.feature_importances.iter().map(|f| f.importance).sum()
    }

    pub fn log(&self) {
        info!(
            "train ({} rows) - RMSE: {:.2} µg/m³, MAE: {:.2} µg/m³, R²: {:.4}",
            self.train_rows, self.train.rmse, self.train.mae, self.train.r2
        );
        info!(
            "test ({} rows) - RMSE: {:.2} µg/m³, MAE: {:.2} µg/m³, R²: {:.4}",
            self.test_rows, self.test.rmse, self.test.mae, self.test.r2
        );
        for f in &self.feature_importances {
            info!("importance {:15}: {:.4}", f.feature, f.importance);
        }
    }
}
