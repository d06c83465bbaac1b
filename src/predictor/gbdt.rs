//! Inference for exported gradient-boosted regression tree ensembles.
//!
//! The fitting pipeline exports each quantile model as JSON: a constant
//! initial estimate, a learning rate, and a list of binary regression trees in
//! flat node-array form. Fitting is not done here; this is evaluation only.
//!
//! ```json
//! {
//!   "quantile": 0.95,
//!   "init_value": 61.2,
//!   "learning_rate": 0.1,
//!   "trees": [
//!     { "nodes": [
//!         { "feature": 0, "threshold": 7.2, "left": 1, "right": 2 },
//!         { "value": -1.5 },
//!         { "value": 3.0 }
//!     ] }
//!   ]
//! }
//! ```

use serde::{Deserialize, Serialize};

use super::quantile::QuantileEstimator;
use crate::error::CommuteError;

/// One node in a tree's flat node array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// Go to `left` when `x[feature] <= threshold`, otherwise `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// Binary regression tree; node 0 is the root.
///
/// Every constructor checks the node structure: the array is non-empty, leaf
/// values and thresholds are finite, and children come after their parent
/// within bounds. Traversal therefore always ends on a leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TreeNodes")]
pub struct Tree {
    nodes: Vec<Node>,
}

#[derive(Deserialize)]
struct TreeNodes {
    nodes: Vec<Node>,
}

impl TryFrom<TreeNodes> for Tree {
    type Error = String;

    fn try_from(raw: TreeNodes) -> Result<Self, Self::Error> {
        check_structure(&raw.nodes)?;
        Ok(Self { nodes: raw.nodes })
    }
}

fn check_structure(nodes: &[Node]) -> Result<(), String> {
    if nodes.is_empty() {
        return Err("tree has no nodes".to_string());
    }
    for (index, node) in nodes.iter().enumerate() {
        match node {
            Node::Split {
                threshold,
                left,
                right,
                ..
            } => {
                if !threshold.is_finite() {
                    return Err(format!("node {index} has a non-finite threshold"));
                }
                for child in [left, right] {
                    if *child <= index || *child >= nodes.len() {
                        return Err(format!("node {index} has invalid child {child}"));
                    }
                }
            }
            Node::Leaf { value } => {
                if !value.is_finite() {
                    return Err(format!("leaf {index} has a non-finite value"));
                }
            }
        }
    }
    Ok(())
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> crate::Result<Self> {
        Self::try_from(TreeNodes { nodes }).map_err(CommuteError::model_unavailable)
    }

    /// Highest feature index any split reads, if the tree splits at all
    fn max_feature(&self) -> Option<usize> {
        self.nodes
            .iter()
            .filter_map(|node| match node {
                Node::Split { feature, .. } => Some(*feature),
                Node::Leaf { .. } => None,
            })
            .max()
    }

    fn leaf_value(&self, features: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = features.get(*feature).copied().unwrap_or(f64::NAN);
                    index = if x <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

/// Additive tree ensemble for a single quantile level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    /// Quantile level the ensemble was fitted for
    pub quantile: f64,
    /// Constant initial estimate (the training target's quantile)
    pub init_value: f64,
    pub learning_rate: f64,
    pub trees: Vec<Tree>,
}

impl TreeEnsemble {
    /// Parse an exported ensemble and check it against the model's feature count
    pub fn from_json(json: &str, n_features: usize) -> crate::Result<Self> {
        let ensemble: Self = serde_json::from_str(json).map_err(|e| {
            CommuteError::model_unavailable(format!("corrupt tree ensemble: {e}"))
        })?;
        ensemble.validate(n_features)?;
        Ok(ensemble)
    }

    /// Check the ensemble's constants and that every split reads a known feature
    pub fn validate(&self, n_features: usize) -> crate::Result<()> {
        if !self.init_value.is_finite() || !self.learning_rate.is_finite() {
            return Err(CommuteError::model_unavailable(
                "ensemble has a non-finite initial value or learning rate",
            ));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            if let Some(feature) = tree.max_feature().filter(|f| *f >= n_features) {
                return Err(CommuteError::model_unavailable(format!(
                    "tree {i} splits on feature {feature} but the model has {n_features}"
                )));
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.trees.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

impl QuantileEstimator for TreeEnsemble {
    fn predict(&self, features: &[f64]) -> f64 {
        let boost: f64 = self.trees.iter().map(|tree| tree.leaf_value(features)).sum();
        self.init_value + self.learning_rate * boost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUMP_ENSEMBLE: &str = r#"{
        "quantile": 0.5,
        "init_value": 60.0,
        "learning_rate": 0.5,
        "trees": [
            { "nodes": [
                { "feature": 0, "threshold": 7.0, "left": 1, "right": 2 },
                { "value": -4.0 },
                { "value": 10.0 }
            ] },
            { "nodes": [
                { "feature": 2, "threshold": 1.5, "left": 1, "right": 2 },
                { "value": 0.0 },
                { "value": 6.0 }
            ] }
        ]
    }"#;

    #[test]
    fn test_parse_and_predict() {
        let ensemble = TreeEnsemble::from_json(STUMP_ENSEMBLE, 3).unwrap();
        assert_eq!(ensemble.len(), 2);

        // 06:00, clear: 60 + 0.5 * (-4 + 0)
        assert_eq!(ensemble.predict(&[6.0, 2.0, 0.0]), 58.0);
        // 08:00, heavy rain (label 2): 60 + 0.5 * (10 + 6)
        assert_eq!(ensemble.predict(&[8.0, 2.0, 2.0]), 68.0);
    }

    #[test]
    fn test_threshold_is_inclusive_on_the_left() {
        let ensemble = TreeEnsemble::from_json(STUMP_ENSEMBLE, 3).unwrap();
        assert_eq!(ensemble.predict(&[7.0, 0.0, 0.0]), 58.0);
    }

    #[test]
    fn test_empty_ensemble_predicts_init_value() {
        let ensemble = TreeEnsemble {
            quantile: 0.95,
            init_value: 71.5,
            learning_rate: 0.1,
            trees: Vec::new(),
        };
        assert!(ensemble.is_empty());
        assert_eq!(ensemble.predict(&[8.0, 1.0, 0.0]), 71.5);
    }

    #[test]
    fn test_backward_child_is_rejected() {
        let err = Tree::new(vec![
            Node::Split {
                feature: 0,
                threshold: 1.0,
                left: 0,
                right: 1,
            },
            Node::Leaf { value: 1.0 },
        ])
        .unwrap_err();
        assert!(matches!(err, CommuteError::ModelUnavailable { .. }));
    }

    #[test]
    fn test_empty_tree_is_rejected() {
        assert!(Tree::new(Vec::new()).is_err());
    }

    #[test]
    fn test_self_referencing_tree_fails_to_parse() {
        let json = r#"{
            "quantile": 0.5, "init_value": 60.0, "learning_rate": 1.0,
            "trees": [ { "nodes": [
                { "feature": 0, "threshold": 7.0, "left": 0, "right": 0 }
            ] } ]
        }"#;
        let err = TreeEnsemble::from_json(json, 3).unwrap_err();
        assert!(err.to_string().contains("invalid child 0"));

        let empty = r#"{"quantile": 0.5, "init_value": 60.0, "learning_rate": 1.0, "trees": [ { "nodes": [] } ]}"#;
        assert!(TreeEnsemble::from_json(empty, 3).is_err());
    }

    #[test]
    fn test_unknown_feature_is_rejected() {
        let err = TreeEnsemble::from_json(STUMP_ENSEMBLE, 2).unwrap_err();
        assert!(err.to_string().contains("feature 2"));
    }

    #[test]
    fn test_corrupt_json_is_model_unavailable() {
        let err = TreeEnsemble::from_json("{ not json", 3).unwrap_err();
        assert!(matches!(err, CommuteError::ModelUnavailable { .. }));
    }
}
