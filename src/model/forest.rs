//! Random forest inference over exported tree node arrays.

use super::Classifier;
use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Marker used by the exporter for "no child" / "no split feature".
const LEAF: i64 = -1;

/// One fitted tree in array form. Node 0 is the root; a node is a leaf when
/// `children_left[node] == -1`. Samples go left when `x[feature] <= threshold`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights (training sample counts or fractions)
    pub value: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub trees: Vec<TreeParams>,
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<TreeParams>,
    n_features: usize,
}

impl RandomForest {
    pub fn new(params: ForestParams, n_features: usize) -> Result<Self> {
        if params.trees.is_empty() {
            return Err(EngineError::Artifact("random forest has no trees".into()));
        }
        for (t, tree) in params.trees.iter().enumerate() {
            validate_tree(tree, n_features).map_err(|e| {
                EngineError::Artifact(format!("random forest tree {t}: {e}"))
            })?;
        }
        Ok(Self {
            trees: params.trees,
            n_features,
        })
    }

    fn leaf_distribution(tree: &TreeParams, x: &[f64]) -> [f64; 2] {
        let mut node = 0usize;
        // children always point forward (checked at load), so this walk ends
        while tree.children_left[node] != LEAF {
            let f = tree.feature[node] as usize;
            node = if x[f] <= tree.threshold[node] {
                tree.children_left[node] as usize
            } else {
                tree.children_right[node] as usize
            };
        }
        let [a, b] = tree.value[node];
        let total = a + b;
        [a / total, b / total]
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, x: &[f64]) -> Result<[f64; 2]> {
        if x.len() != self.n_features {
            return Err(EngineError::InvalidFeatureShape(format!(
                "random forest expects {} features, got {}",
                self.n_features,
                x.len()
            )));
        }
        let mut acc = [0.0, 0.0];
        for tree in &self.trees {
            let [a, b] = Self::leaf_distribution(tree, x);
            acc[0] += a;
            acc[1] += b;
        }
        let n = self.trees.len() as f64;
        Ok([acc[0] / n, acc[1] / n])
    }
}

fn validate_tree(tree: &TreeParams, n_features: usize) -> std::result::Result<(), String> {
    let n = tree.children_left.len();
    if n == 0 {
        return Err("empty tree".into());
    }
    if tree.children_right.len() != n
        || tree.feature.len() != n
        || tree.threshold.len() != n
        || tree.value.len() != n
    {
        return Err("node arrays differ in length".into());
    }
    for node in 0..n {
        let (l, r) = (tree.children_left[node], tree.children_right[node]);
        if l == LEAF {
            if r != LEAF {
                return Err(format!("node {node} has only a right child"));
            }
            let [a, b] = tree.value[node];
            if !(a.is_finite() && b.is_finite() && a >= 0.0 && b >= 0.0 && a + b > 0.0) {
                return Err(format!("leaf {node} has no usable class weights"));
            }
            continue;
        }
        for child in [l, r] {
            if child <= node as i64 || child >= n as i64 {
                return Err(format!("node {node} points to invalid child {child}"));
            }
        }
        let f = tree.feature[node];
        if f < 0 || f as usize >= n_features {
            return Err(format!("node {node} splits on unknown feature {f}"));
        }
        if !tree.threshold[node].is_finite() {
            return Err(format!("node {node} has a non-finite threshold"));
        }
    }
    Ok(())
}
