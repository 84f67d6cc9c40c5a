use std::path::Path;

use chrono::Utc;
use ndarray::Axis;
use ndarray_rand::rand::seq::SliceRandom;
use ndarray_rand::rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::data::observation::Observation;
use crate::data::preprocessing::{encode, load_table, FeatureSchema, FeatureTable, StandardScaler, LABEL_COLUMN};
use crate::error::{Pm25Error, Result};
use crate::model::fitted::FittedModel;
use crate::model::forest::{ForestParams, RandomForest};
use crate::training::metrics::{Metrics, SplitMetrics};

/// Smallest dataset that still leaves one row on each side of the split.
const MIN_ROWS: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainerConfig {
    pub forest: ForestParams,
    pub test_fraction: f64,
    pub split_seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            forest: ForestParams::default(),
            test_fraction: 0.2,
            split_seed: 42,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainerConfig,
    schema: FeatureSchema,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Self {
        Trainer {
            config,
            schema: FeatureSchema::default(),
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Load a CSV dataset and train on it.
    pub fn train_from_csv(&self, csv_path: &Path) -> Result<FittedModel> {
        let table = load_table(csv_path)?;
        info!(rows = table.len(), path = %csv_path.display(), "training data loaded");
        self.train(&table)
    }

    pub fn train_observations(&self, observations: &[Observation]) -> Result<FittedModel> {
        self.train(&FeatureTable::from_observations(observations))
    }

    pub fn train(&self, table: &FeatureTable) -> Result<FittedModel> {
        let mut missing = self.schema.missing_from(table);
        if !table.has_column(LABEL_COLUMN) {
            missing.push(LABEL_COLUMN.to_string());
        }
        if !missing.is_empty() {
            return Err(Pm25Error::Schema { missing });
        }

        let (table, dropped) = table.drop_incomplete(&self.schema);
        if dropped > 0 {
            warn!(dropped, "discarded rows with missing values");
        }
        info!(rows = table.len(), "valid training rows");
        if table.len() < MIN_ROWS {
            return Err(Pm25Error::InsufficientData {
                rows: table.len(),
                required: MIN_ROWS,
            });
        }

        let (x, y) = encode(&table, &self.schema)?;
        let y = y.ok_or_else(|| Pm25Error::Schema {
            missing: vec![LABEL_COLUMN.to_string()],
        })?;

        let scaler = StandardScaler::fit(&x)?;
        let x_scaled = scaler.transform(&x);

        let (train_idx, test_idx) =
            train_test_split(x.nrows(), self.config.test_fraction, self.config.split_seed);
        info!(train = train_idx.len(), test = test_idx.len(), "split dataset");

        let x_train = x_scaled.select(Axis(0), &train_idx);
        let y_train = y.select(Axis(0), &train_idx);
        let x_test = x_scaled.select(Axis(0), &test_idx);
        let y_test = y.select(Axis(0), &test_idx);

        info!(trees = self.config.forest.n_trees, "fitting random forest");
        let forest = RandomForest::fit(&x_train, &y_train, &self.config.forest)?;

        let metrics = Metrics::new(
            SplitMetrics::compute(&y_train, &forest.predict(&x_train)),
            SplitMetrics::compute(&y_test, &forest.predict(&x_test)),
            train_idx.len(),
            test_idx.len(),
            self.schema.names(),
            &forest.feature_importances(),
        );
        metrics.log();

        Ok(FittedModel {
            forest,
            scaler,
            schema: self.schema.clone(),
            metrics,
            trained_at: Utc::now(),
        })
    }
}

/// Shuffle `0..n` with a fixed seed and cut off `ceil(n * test_fraction)` rows
/// for testing, keeping at least one row on each side.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64 * test_fraction).ceil() as usize).clamp(1, n.saturating_sub(1).max(1));
    let test = indices.split_off(n - n_test);
    (indices, test)
}
