//! CART regression tree with variance-reduction splits.
//!
//! Split search visits features in an order drawn from the caller's RNG and
//! keeps the first strictly best split, so ties resolve deterministically for
//! a given seed.

use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: 5,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct Candidate {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl RegressionTree {
    /// Fit on `x` (rows are samples) against `target`. Callers guarantee
    /// `x.nrows() == target.len()` and at least one row.
    pub fn fit(x: ArrayView2<'_, f64>, target: &[f64], params: &TreeParams, rng: &mut StdRng) -> Self {
        let mut tree = RegressionTree { nodes: Vec::new() };
        let indices: Vec<usize> = (0..x.nrows()).collect();
        tree.build(x, target, indices, 0, params, rng);
        tree
    }

    fn build(
        &mut self,
        x: ArrayView2<'_, f64>,
        target: &[f64],
        indices: Vec<usize>,
        depth: usize,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> usize {
        let sum: f64 = indices.iter().map(|&i| target[i]).sum();
        let value = sum / indices.len() as f64;

        let splittable = depth < params.max_depth
            && indices.len() >= params.min_samples_split.max(2)
            && indices.len() >= 2 * params.min_samples_leaf.max(1);

        let candidate = if splittable {
            best_split(x, target, &indices, params.min_samples_leaf.max(1), rng)
        } else {
            None
        };

        let Some(split) = candidate else {
            self.nodes.push(Node::Leaf { value });
            return self.nodes.len() - 1;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| x[[i, split.feature]] <= split.threshold);

        let node = self.nodes.len();
        self.nodes.push(Node::Leaf { value });
        let left = self.build(x, target, left_idx, depth + 1, params, rng);
        let right = self.build(x, target, right_idx, depth + 1, params, rng);
        self.nodes[node] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node
    }

    /// Index of the leaf `row` falls into.
    pub fn apply(&self, row: ArrayView1<'_, f64>) -> usize {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { .. } => return idx,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        match &self.nodes[self.apply(row)] {
            Node::Leaf { value } => *value,
            Node::Split { .. } => unreachable!("apply always stops on a leaf"),
        }
    }

    /// Overwrite the output of a leaf. Ignored for split nodes.
    pub fn set_leaf_value(&mut self, leaf: usize, new_value: f64) {
        if let Some(Node::Leaf { value }) = self.nodes.get_mut(leaf) {
            *value = new_value;
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
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
}

fn best_split(
    x: ArrayView2<'_, f64>,
    target: &[f64],
    indices: &[usize],
    min_leaf: usize,
    rng: &mut StdRng,
) -> Option<Candidate> {
    let n = indices.len();
    let total: f64 = indices.iter().map(|&i| target[i]).sum();
    let parent_score = total * total / n as f64;

    let mut features: Vec<usize> = (0..x.ncols()).collect();
    features.shuffle(rng);

    let mut best: Option<Candidate> = None;
    let mut order = indices.to_vec();

    for feature in features {
        order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

        let mut left_sum = 0.0;
        for pos in 1..n {
            left_sum += target[order[pos - 1]];
            if pos < min_leaf || n - pos < min_leaf {
                continue;
            }

            let lo = x[[order[pos - 1], feature]];
            let hi = x[[order[pos], feature]];
            if lo.is_nan() || hi.is_nan() || lo >= hi {
                continue;
            }

            let right_sum = total - left_sum;
            let score =
                left_sum * left_sum / pos as f64 + right_sum * right_sum / (n - pos) as f64;
            if score <= parent_score + MIN_GAIN {
                continue;
            }
            if best.as_ref().map_or(true, |b| score > b.score) {
                let mid = lo + (hi - lo) / 2.0;
                let threshold = if mid >= hi { lo } else { mid };
                best = Some(Candidate {
                    feature,
                    threshold,
                    score,
                });
            }
        }
    }

    best
}
