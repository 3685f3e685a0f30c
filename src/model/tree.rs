//! CART regression trees.
//!
//! Each split minimizes the summed squared error of the two children. For a
//! candidate threshold the SSE decrease is
//!
//! ```text
//! gain = S_l² / n_l + S_r² / n_r - S² / n
//! ```
//!
//! where `S` is the sum of targets, so one sorted sweep per feature scores every
//! threshold. Nodes live in a flat arena so the tree serializes as a plain list.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

/// Minimum gain for a split to be worth making.
const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
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

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Features examined per split (`>= n_features` means all).
    pub max_features: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Fit on the rows listed in `rows` (repeats allowed, as in a bootstrap sample).
    ///
    /// SSE decreases are accumulated per feature into `importances`.
    pub fn fit(
        x: &[Vec<f64>],
        y: &[f64],
        rows: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
        importances: &mut [f64],
    ) -> Self {
        let mut builder = Builder {
            x,
            y,
            params,
            n_features: importances.len(),
            nodes: Vec::new(),
            rng,
            importances,
        };
        builder.build(rows, 0);
        Self {
            nodes: builder.nodes,
        }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = row.get(*feature).copied().unwrap_or(0.0);
                    idx = if v <= *threshold { *left } else { *right };
                }
                None => return f64::NAN,
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

struct Builder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    params: &'a TreeParams,
    n_features: usize,
    nodes: Vec<Node>,
    rng: &'a mut StdRng,
    importances: &'a mut [f64],
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

impl Builder<'_> {
    fn build(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let idx = self.nodes.len();
        let mean = rows.iter().map(|&i| self.y[i]).sum::<f64>() / rows.len().max(1) as f64;
        self.nodes.push(Node::Leaf { value: mean });

        let min_leaf = self.params.min_samples_leaf.max(1);
        if depth >= self.params.max_depth || rows.len() < 2 * min_leaf {
            return idx;
        }

        let Some(best) = self.best_split(&rows, min_leaf) else {
            return idx;
        };

        self.importances[best.feature] += best.gain;
        let left = self.build(best.left, depth + 1);
        let right = self.build(best.right, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let m = self.params.max_features.max(1);
        if m >= self.n_features {
            return (0..self.n_features).collect();
        }
        let mut picked = sample(&mut *self.rng, self.n_features, m).into_vec();
        picked.sort_unstable();
        picked
    }

    fn best_split(&mut self, rows: &[usize], min_leaf: usize) -> Option<BestSplit> {
        let n = rows.len();
        let total: f64 = rows.iter().map(|&i| self.y[i]).sum();
        let parent_score = total * total / n as f64;

        let mut best: Option<(usize, f64, f64)> = None;
        let mut sorted = rows.to_vec();

        for feature in self.candidate_features() {
            sorted.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let mut left_sum = 0.0;
            for k in 0..n - 1 {
                left_sum += self.y[sorted[k]];
                let n_left = k + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let here = self.x[sorted[k]][feature];
                let next = self.x[sorted[k + 1]][feature];
                if here >= next {
                    continue;
                }

                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / n_left as f64 + right_sum * right_sum / n_right as f64
                    - parent_score;
                if gain > MIN_GAIN && best.is_none_or(|(_, _, g)| gain > g) {
                    best = Some((feature, (here + next) / 2.0, gain));
                }
            }
        }

        let (feature, threshold, gain) = best?;
        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&i| self.x[i][feature] <= threshold);

        Some(BestSplit {
            feature,
            threshold,
            gain,
            left,
            right,
        })
    }
}
