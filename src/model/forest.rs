use ndarray::{Array1, Array2, Axis};
use ndarray_rand::rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Pm25Error, Result};
use crate::model::tree::{RegressionTree, TreeParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub tree: TreeParams,
    /// Draw a bootstrap sample per tree instead of using every row.
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        ForestParams {
            n_trees: 100,
            tree: TreeParams::default(),
            bootstrap: true,
            seed: 42,
        }
    }
}

/// Bagged ensemble of regression trees; predictions are the mean over trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
    n_features: usize,
}

impl RandomForest {
    /// Fit `params.n_trees` trees in parallel.
    ///
    /// Tree `t` draws from stream `t` of a generator seeded with `params.seed`,
    /// so the fitted forest does not depend on thread scheduling.
    pub fn fit(x: &Array2<f64>, y: &Array1<f64>, params: &ForestParams) -> Result<Self> {
        let n = x.nrows();
        if n == 0 || params.n_trees == 0 {
            return Err(Pm25Error::InsufficientData { rows: n, required: 1 });
        }
        debug_assert_eq!(n, y.len(), "feature and label row counts differ");

        let x_view = x.view();
        let y_view = y.view();

        let trees: Vec<RegressionTree> = (0..params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = ChaCha8Rng::seed_from_u64(params.seed);
                rng.set_stream(t as u64);

                let samples: Vec<usize> = if params.bootstrap {
                    (0..n).map(|_| rng.gen_range(0..n)).collect()
                } else {
                    (0..n).collect()
                };
                RegressionTree::fit(x_view, y_view, &samples, &params.tree, &mut rng)
            })
            .collect();

        debug!(
            trees = trees.len(),
            mean_nodes = trees.iter().map(|t| t.node_count()).sum::<usize>() / trees.len(),
            "forest fitted"
        );

        Ok(RandomForest {
            trees,
            n_features: x.ncols(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict(&self, x: &Array2<f64>) -> Array1<f64> {
        let n_trees = self.trees.len() as f64;
        x.axis_iter(Axis(0))
            .map(|row| self.trees.iter().map(|tree| tree.predict_row(row)).sum::<f64>() / n_trees)
            .collect()
    }

    /// Mean of the per-tree normalized importances, renormalized to sum to 1.
    ///
    /// A forest made only of single-leaf trees learned nothing about any
    /// feature; it reports a uniform ranking.
    pub fn feature_importances(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (total, value) in totals.iter_mut().zip(tree.feature_importances()) {
                *total += value;
            }
        }

        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter().map(|v| v / sum).collect()
        } else {
            vec![1.0 / self.n_features as f64; self.n_features]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn small_params(n_trees: usize) -> ForestParams {
        ForestParams {
            n_trees,
            ..ForestParams::default()
        }
    }

    fn quadratic(n: usize) -> (Array2<f64>, Array1<f64>) {
        let x = Array2::from_shape_fn((n, 3), |(i, j)| match j {
            0 => i as f64 / n as f64,
            1 => ((i * 37) % 11) as f64,
            _ => ((i * 13) % 5) as f64,
        });
        let y = x.column(0).mapv(|v| 100.0 * v * v) + &x.column(2).mapv(|v| v * 2.0);
        (x, y)
    }

    #[test]
    fn same_seed_same_forest() {
        let (x, y) = quadratic(120);
        let a = RandomForest::fit(&x, &y, &small_params(8)).unwrap();
        let b = RandomForest::fit(&x, &y, &small_params(8)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn fits_training_data_closely() {
        let (x, y) = quadratic(200);
        let forest = RandomForest::fit(&x, &y, &small_params(20)).unwrap();
        let pred = forest.predict(&x);

        let mae = (&pred - &y).mapv(f64::abs).mean().unwrap();
        assert!(mae < 5.0, "mae = {}", mae);
    }

    #[test]
    fn importances_sum_to_one_and_rank_signal_first() {
        let (x, y) = quadratic(200);
        let forest = RandomForest::fit(&x, &y, &small_params(20)).unwrap();
        let importances = forest.feature_importances();

        assert_relative_eq!(importances.iter().sum::<f64>(), 1.0, epsilon = 1e-9);
        assert!(importances[0] > importances[1]);
        assert!(importances[0] > importances[2]);
    }

    #[test]
    fn constant_target_gets_uniform_importances() {
        let x = Array2::from_shape_fn((30, 3), |(i, j)| (i + j) as f64);
        let y = Array1::from_elem(30, 12.0);
        let forest = RandomForest::fit(&x, &y, &small_params(4)).unwrap();

        for v in forest.feature_importances() {
            assert_relative_eq!(v, 1.0 / 3.0);
        }
        assert_eq!(forest.predict(&x)[0], 12.0);
    }

    #[test]
    fn empty_input_is_rejected() {
        let x = Array2::<f64>::zeros((0, 3));
        let y = Array1::<f64>::zeros(0);
        assert!(matches!(
            RandomForest::fit(&x, &y, &ForestParams::default()),
            Err(Pm25Error::InsufficientData { .. })
        ));
    }
}
