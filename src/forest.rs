//! Seeded isolation forest
//!
//! Self-contained implementation of the isolation-forest outlier model
//! (Liu et al. 2008): an ensemble of randomized binary trees, each grown on a
//! small subsample, where anomalous points isolate in fewer splits. The
//! anomaly score is `2^(-E[h(x)] / c(psi))`, in (0, 1), higher = more
//! anomalous. All randomness comes from one seeded generator, so a run is
//! reproducible given its seed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Per-tree subsample size cap.
const MAX_SUBSAMPLE: usize = 256;

/// Expected unsuccessful-search path length in a BST of `n` nodes.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let nf = n as f64;
            2.0 * ((nf - 1.0).ln() + EULER_GAMMA) - 2.0 * (nf - 1.0) / nf
        }
    }
}

enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

/// Isolation-forest outlier model.
pub struct IsolationForest {
    trees: Vec<Node>,
    subsample: usize,
}

impl IsolationForest {
    /// Fit `n_trees` isolation trees on the given rows.
    ///
    /// Each tree grows on a subsample of at most 256 rows drawn without
    /// replacement, to the standard depth cap `ceil(log2(subsample))`.
    pub fn fit(rows: &[Vec<f64>], n_trees: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        if rows.is_empty() {
            return Self {
                trees: Vec::new(),
                subsample: 0,
            };
        }

        let subsample = rows.len().min(MAX_SUBSAMPLE);
        let max_depth = (subsample as f64).log2().ceil().max(1.0) as usize;

        let trees = (0..n_trees.max(1))
            .map(|_| {
                let indices = sample_without_replacement(rows.len(), subsample, &mut rng);
                build_tree(rows, indices, 0, max_depth, &mut rng)
            })
            .collect();

        Self { trees, subsample }
    }

    /// Anomaly score for one row; higher = more anomalous.
    pub fn score(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() || self.subsample == 0 {
            return 0.5;
        }
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| path_length(tree, row, 0.0))
            .sum();
        let mean_path = total / self.trees.len() as f64;
        2.0_f64.powf(-mean_path / average_path_length(self.subsample))
    }
}

fn sample_without_replacement(n: usize, amount: usize, rng: &mut StdRng) -> Vec<usize> {
    rand::seq::index::sample(rng, n, amount).into_vec()
}

fn build_tree(
    rows: &[Vec<f64>],
    indices: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= max_depth || indices.len() <= 1 {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    // Only features that still vary across this partition can split it.
    let dims = rows[indices[0]].len();
    let mut splittable = Vec::new();
    for feature in 0..dims {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &i in &indices {
            let v = rows[i][feature];
            if v < lo {
                lo = v;
            }
            if v > hi {
                hi = v;
            }
        }
        if hi > lo && lo.is_finite() && hi.is_finite() {
            splittable.push((feature, lo, hi));
        }
    }
    if splittable.is_empty() {
        return Node::Leaf {
            size: indices.len(),
        };
    }

    let (feature, lo, hi) = splittable[rng.gen_range(0..splittable.len())];
    let threshold = rng.gen_range(lo..hi);

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| rows[i][feature] < threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_tree(rows, left, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(rows, right, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, row: &[f64], depth: f64) -> f64 {
    match node {
        Node::Leaf { size } => depth + average_path_length(*size),
        Node::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            if row[*feature] < *threshold {
                path_length(left, row, depth + 1.0)
            } else {
                path_length(right, row, depth + 1.0)
            }
        }
    }
}
