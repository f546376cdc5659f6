//! Random forest regressor
//!
//! Trees are stored as flat node lists. Node 0 is the root; a split sends a
//! row left when `row[feature] <= threshold`. The forest prediction is the
//! mean of its tree outputs.

use super::{check_width, finite, InvalidModel, PredictError, Predictor};
use crate::models::CanonicalRow;
use serde::{Deserialize, Serialize};

/// A single tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
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

impl Node {
    pub fn split(feature: usize, threshold: f64, left: usize, right: usize) -> Self {
        Node::Split {
            feature,
            threshold,
            left,
            right,
        }
    }

    pub fn leaf(value: f64) -> Self {
        Node::Leaf { value }
    }
}

/// A regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Reject trees that could index out of bounds or loop.
    ///
    /// Children must point strictly forward, which rules out cycles.
    pub fn validate(&self, width: usize) -> Result<(), InvalidModel> {
        if self.nodes.is_empty() {
            return Err(InvalidModel("tree has no nodes".to_string()));
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if feature >= width {
                        return Err(InvalidModel(format!(
                            "node {} splits on feature {} but rows have {} columns",
                            idx, feature, width
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(InvalidModel(format!("node {} has a non-finite threshold", idx)));
                    }
                    for child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(InvalidModel(format!(
                                "node {} has invalid child index {}",
                                idx, child
                            )));
                        }
                    }
                }
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(InvalidModel(format!("leaf {} has a non-finite value", idx)));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walk the tree for one row. Assumes `validate` passed for the row width.
    pub(crate) fn evaluate(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }
}

/// Averaging ensemble of regression trees
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<Tree>,
    width: usize,
}

impl RandomForest {
    pub fn new(trees: Vec<Tree>, width: usize) -> Result<Self, InvalidModel> {
        if trees.is_empty() {
            return Err(InvalidModel("random forest has no trees".to_string()));
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(width)
                .map_err(|e| InvalidModel(format!("tree {}: {}", i, e)))?;
        }
        Ok(Self { trees, width })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Predictor for RandomForest {
    fn predict(&self, row: &CanonicalRow) -> Result<f64, PredictError> {
        check_width(row, self.width)?;
        let values = row.values();
        let sum: f64 = self.trees.iter().map(|tree| tree.evaluate(values)).sum();
        finite(sum / self.trees.len() as f64)
    }

    fn kind(&self) -> &'static str {
        "random_forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, low: f64, high: f64) -> Tree {
        Tree::new(vec![
            Node::split(feature, threshold, 1, 2),
            Node::leaf(low),
            Node::leaf(high),
        ])
    }

    #[test]
    fn test_tree_traversal() {
        let tree = stump(0, 50.0, 1000.0, 2000.0);
        assert_eq!(tree.evaluate(&[30.0]), 1000.0);
        // Threshold itself goes left
        assert_eq!(tree.evaluate(&[50.0]), 1000.0);
        assert_eq!(tree.evaluate(&[80.0]), 2000.0);
    }

    #[test]
    fn test_forest_averages_trees() {
        let forest = RandomForest::new(
            vec![stump(0, 50.0, 1000.0, 2000.0), stump(2, 0.5, 100.0, 300.0)],
            6,
        )
        .unwrap();
        assert_eq!(forest.num_trees(), 2);

        // Tree 1: 45 <= 50 -> 1000; tree 2: furnished 1 > 0.5 -> 300
        let row = CanonicalRow::new(vec![45.0, 2.0, 1.0, 0.0, 1.0, 0.0]);
        assert_eq!(forest.predict(&row).unwrap(), 650.0);
    }

    #[test]
    fn test_forest_rejects_wrong_width() {
        let forest = RandomForest::new(vec![stump(0, 1.0, 0.0, 1.0)], 6).unwrap();
        let row = CanonicalRow::new(vec![1.0, 2.0]);
        assert_eq!(
            forest.predict(&row),
            Err(PredictError::InputWidth { expected: 6, got: 2 })
        );
    }

    #[test]
    fn test_validation_rejects_bad_trees() {
        assert!(RandomForest::new(vec![], 6).is_err());
        assert!(RandomForest::new(vec![Tree::new(vec![])], 6).is_err());

        // Feature index out of range
        assert!(RandomForest::new(vec![stump(6, 1.0, 0.0, 1.0)], 6).is_err());

        // Child pointing back at the root would loop forever
        let cyclic = Tree::new(vec![Node::split(0, 1.0, 0, 1), Node::leaf(1.0)]);
        assert!(RandomForest::new(vec![cyclic], 6).is_err());

        // Dangling child
        let dangling = Tree::new(vec![Node::split(0, 1.0, 1, 5), Node::leaf(1.0)]);
        assert!(RandomForest::new(vec![dangling], 6).is_err());
    }

    #[test]
    fn test_node_json_shapes() {
        let nodes: Vec<Node> = serde_json::from_str(
            r#"[{"feature":0,"threshold":50.0,"left":1,"right":2},{"value":1200.0},{"value":1800.0}]"#,
        )
        .unwrap();
        assert_eq!(nodes[0], Node::split(0, 50.0, 1, 2));
        assert_eq!(nodes[1], Node::leaf(1200.0));
    }
}
