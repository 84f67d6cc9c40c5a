use chrono::{DateTime, Utc};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::data::observation::Observation;
use crate::data::preprocessing::{encode_features, FeatureSchema, FeatureTable, StandardScaler};
use crate::error::Result;
use crate::model::forest::RandomForest;
use crate::training::metrics::Metrics;

/// Readings above this are almost certainly extrapolation artifacts.
pub const IMPLAUSIBLE_PM25: f64 = 500.0;

/// Everything needed to turn weather into a PM2.5 estimate.
///
/// Produced by training or by loading an artifact, never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedModel {
    pub forest: RandomForest,
    pub scaler: StandardScaler,
    pub schema: FeatureSchema,
    pub metrics: Metrics,
    pub trained_at: DateTime<Utc>,
}

impl FittedModel {
    /// Unclamped regressor output for every row of `table`.
    pub fn predict_raw(&self, table: &FeatureTable) -> Result<Array1<f64>> {
        let x = encode_features(table, &self.schema)?;
        let x_scaled = self.scaler.transform(&x);
        Ok(self.forest.predict(&x_scaled))
    }

    /// PM2.5 estimate for one observation. Any label on it is ignored.
    pub fn predict(&self, observation: &Observation) -> Result<f64> {
        let raw = self.predict_raw(&FeatureTable::from_observations(std::slice::from_ref(observation)))?;
        Ok(clamp_prediction(raw[0]))
    }

    pub fn predict_batch(&self, observations: &[Observation]) -> Result<Vec<f64>> {
        let raw = self.predict_raw(&FeatureTable::from_observations(observations))?;
        Ok(raw.iter().map(|&v| clamp_prediction(v)).collect())
    }
}

/// Floor predictions at zero. High values are reported but kept.
pub fn clamp_prediction(raw: f64) -> f64 {
    if raw > IMPLAUSIBLE_PM25 {
        warn!(prediction = raw, "implausibly high PM2.5 prediction");
    }
    raw.max(0.0)
}
