//! Random forest regression.
//!
//! Every tree is fitted on a bootstrap sample with its own RNG, seeded from the run
//! seed and the tree index. Trees are independent, so they are fitted on the rayon
//! pool; collecting in index order keeps the forest (and its importances) identical
//! to a serial fit.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::model::tree::{RegressionTree, TreeParams};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub tree: TreeParams,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub trees: Vec<RegressionTree>,
}

impl RandomForest {
    /// Fit a forest. Returns the forest and per-feature importances (summing to 1,
    /// or all zero when no tree found a useful split).
    pub fn fit(x: &[Vec<f64>], y: &[f64], params: &ForestParams) -> (Self, Vec<f64>) {
        let n = y.len();
        let n_features = x.first().map(Vec::len).unwrap_or(0);
        if n == 0 {
            return (
                Self {
                    n_features,
                    trees: Vec::new(),
                },
                vec![0.0; n_features],
            );
        }

        let fitted: Vec<(RegressionTree, Vec<f64>)> = (0..params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(tree_seed(params.seed, t as u64));
                let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let mut importances = vec![0.0; n_features];
                let tree = RegressionTree::fit(x, y, rows, &params.tree, &mut rng, &mut importances);
                (tree, importances)
            })
            .collect();

        let mut importances = vec![0.0; n_features];
        let mut trees = Vec::with_capacity(fitted.len());
        for (tree, imp) in fitted {
            for (acc, v) in importances.iter_mut().zip(imp) {
                *acc += v;
            }
            trees.push(tree);
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for v in &mut importances {
                *v /= total;
            }
        }

        (Self { n_features, trees }, importances)
    }

    /// Mean of the tree predictions.
    pub fn predict(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return f64::NAN;
        }
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }
}

/// SplitMix64 of the run seed and tree index, so neighbouring trees get unrelated streams.
fn tree_seed(seed: u64, tree: u64) -> u64 {
    let mut z = seed ^ tree.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
