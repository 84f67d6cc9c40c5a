use ndarray::{ArrayView1, ArrayView2};
use ndarray_rand::rand::seq::index;
use ndarray_rand::rand::Rng;
use serde::{Deserialize, Serialize};

/// Growth limits for a single regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` means all of them.
    pub max_features: Option<usize>,
}

impl Default for TreeParams {
    fn default() -> Self {
        TreeParams {
            max_depth: 15,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    improvement: f64,
}

/// CART regression tree grown on squared error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    /// Total squared-error reduction credited to each feature.
    impurity_decrease: Vec<f64>,
}

impl RegressionTree {
    /// Grow a tree on the rows of `x` listed in `samples` (duplicates allowed).
    pub fn fit<'a, R: Rng>(
        x: ArrayView2<'a, f64>,
        y: ArrayView1<'a, f64>,
        samples: &[usize],
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let mut tree = RegressionTree {
            nodes: Vec::new(),
            impurity_decrease: vec![0.0; x.ncols()],
        };
        let mut samples = samples.to_vec();
        let mut builder = Builder {
            x,
            y,
            params,
            rng,
        };
        builder.grow(&mut tree, &mut samples, 0);
        tree
    }

    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    /// Impurity-decrease importances normalized to sum to 1, or all zero for a stump.
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.impurity_decrease.iter().sum();
        if total > 0.0 {
            self.impurity_decrease.iter().map(|v| v / total).collect()
        } else {
            vec![0.0; self.impurity_decrease.len()]
        }
    }
}

struct Builder<'a, 'r, R> {
    x: ArrayView2<'a, f64>,
    y: ArrayView1<'a, f64>,
    params: &'r TreeParams,
    rng: &'r mut R,
}

impl<'a, 'r, R: Rng> Builder<'a, 'r, R> {
    fn grow(&mut self, tree: &mut RegressionTree, samples: &mut [usize], depth: usize) -> usize {
        let n = samples.len();
        let sum: f64 = samples.iter().map(|&i| self.y[i]).sum();
        let sum_sq: f64 = samples.iter().map(|&i| self.y[i] * self.y[i]).sum();
        let mean = sum / n as f64;
        let sse = sum_sq - sum * sum / n as f64;

        let node_idx = tree.nodes.len();
        tree.nodes.push(Node::Leaf { value: mean });

        let splittable = depth < self.params.max_depth
            && n >= self.params.min_samples_split
            && n >= 2 * self.params.min_samples_leaf
            && sse > 1e-12 * n as f64;
        if !splittable {
            return node_idx;
        }

        let Some(best) = self.best_split(samples, sum) else {
            return node_idx;
        };

        tree.impurity_decrease[best.feature] += best.improvement;

        let x = self.x;
        let mut left_len = 0;
        for i in 0..n {
            if x[[samples[i], best.feature]] <= best.threshold {
                samples.swap(i, left_len);
                left_len += 1;
            }
        }
        let (left_samples, right_samples) = samples.split_at_mut(left_len);

        let left = self.grow(tree, left_samples, depth + 1);
        let right = self.grow(tree, right_samples, depth + 1);
        tree.nodes[node_idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        node_idx
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let n_features = self.x.ncols();
        match self.params.max_features {
            Some(k) if k > 0 && k < n_features => index::sample(&mut *self.rng, n_features, k).into_vec(),
            _ => (0..n_features).collect(),
        }
    }

    /// Best threshold over the candidate features, scored by squared-error reduction.
    fn best_split(&mut self, samples: &[usize], total_sum: f64) -> Option<SplitCandidate> {
        let n = samples.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent_score = total_sum * total_sum / n as f64;

        let mut best: Option<SplitCandidate> = None;
        let mut order = samples.to_vec();

        for feature in self.candidate_features() {
            let column = self.x.column(feature);
            order.sort_by(|&a, &b| column[a].total_cmp(&column[b]));

            let mut left_sum = 0.0;
            for k in 1..n {
                left_sum += self.y[order[k - 1]];
                if k < min_leaf || n - k < min_leaf {
                    continue;
                }
                let lo = column[order[k - 1]];
                let hi = column[order[k]];
                if lo >= hi {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let score = left_sum * left_sum / k as f64 + right_sum * right_sum / (n - k) as f64;
                let improvement = score - parent_score;

                if improvement > best.as_ref().map_or(1e-12, |b| b.improvement) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        improvement,
                    });
                }
            }
        }
        best
    }
}
