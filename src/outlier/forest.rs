//! Isolation forest over a dense feature matrix.
//!
//! Scores follow the `score_samples` convention: `-2^(-E[h(x)] / c(psi))`,
//! so lower means more anomalous and values lie in [-1, 0).

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn fit(data: &[Vec<f64>], sample: Vec<usize>, max_depth: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.grow(data, sample, 0, max_depth, rng);
        tree
    }

    /// Grow a subtree and return its node index.
    fn grow(
        &mut self,
        data: &[Vec<f64>],
        rows: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let idx = self.nodes.len();
        if depth >= max_depth || rows.len() <= 1 {
            self.nodes.push(Node::Leaf { size: rows.len() });
            return idx;
        }

        // Only features that still vary inside this node can split it
        let width = data[rows[0]].len();
        let candidates: Vec<(usize, f64, f64)> = (0..width)
            .filter_map(|f| {
                let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                    (lo.min(data[r][f]), hi.max(data[r][f]))
                });
                (hi > lo).then_some((f, lo, hi))
            })
            .collect();

        if candidates.is_empty() {
            self.nodes.push(Node::Leaf { size: rows.len() });
            return idx;
        }

        let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
        let threshold = rng.gen_range(lo..hi);
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| data[r][feature] < threshold);

        // Placeholder, patched once both children exist
        self.nodes.push(Node::Leaf { size: 0 });
        let left = self.grow(data, left_rows, depth + 1, max_depth, rng);
        let right = self.grow(data, right_rows, depth + 1, max_depth, rng);
        self.nodes[idx] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        idx
    }

    fn path_length(&self, point: &[f64]) -> f64 {
        let mut idx = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if point[*feature] < *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Average path length of an unsuccessful BST search over `n` points.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
}

impl IsolationForest {
    /// Fit `num_trees` trees, each on a sub-sample of `min(max_samples, n)`
    /// rows drawn without replacement. Tree `i` is seeded with `seed + i`,
    /// so results do not depend on thread scheduling.
    pub fn fit(data: &[Vec<f64>], num_trees: usize, max_samples: usize, seed: u64) -> Self {
        let n = data.len();
        if n == 0 {
            return Self {
                trees: Vec::new(),
                sample_size: 0,
            };
        }
        let sample_size = max_samples.min(n).max(1);
        let max_depth = (sample_size as f64).log2().ceil().max(1.0) as usize;

        let trees = (0..num_trees)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                let sample = index::sample(&mut rng, n, sample_size).into_vec();
                IsolationTree::fit(data, sample, max_depth, &mut rng)
            })
            .collect();

        Self { trees, sample_size }
    }

    /// Raw anomaly score of one point (lower is more anomalous).
    pub fn score_sample(&self, point: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return -0.5;
        }
        let mean_depth =
            self.trees.iter().map(|t| t.path_length(point)).sum::<f64>() / self.trees.len() as f64;
        let norm = average_path_length(self.sample_size);
        if norm <= 0.0 {
            return -0.5;
        }
        -(2f64.powf(-mean_depth / norm))
    }

    pub fn score_samples(&self, data: &[Vec<f64>]) -> Vec<f64> {
        data.par_iter().map(|p| self.score_sample(p)).collect()
    }
}
