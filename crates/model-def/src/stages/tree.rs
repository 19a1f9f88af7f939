// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Binary decision tree model.

use crate::accounting::str_bytes;
use crate::stage::{
    numeric_value, reject_unknown_fields, FieldMap, InferenceConfig, InferenceResult, ParseMode,
};
use crate::wire::{WireReader, WireWriter};
use crate::{DefinitionError, Stage, TrainedModel};

/// A single node in the tree.
///
/// Interior nodes carry `split_feature`, `threshold`, and both child indices;
/// leaves carry only `leaf_value`. `default_left` chooses the branch when the
/// split feature is missing from the record.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TreeNode {
    /// Index into `feature_names` of the feature this node splits on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_feature: Option<usize>,
    /// Split threshold; values strictly below go left.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Index of the left child node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_child: Option<usize>,
    /// Index of the right child node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_child: Option<usize>,
    /// Branch taken when the split feature is missing.
    #[serde(default)]
    pub default_left: bool,
    /// Prediction value; present on leaves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaf_value: Option<f64>,
}

impl TreeNode {
    /// Creates a leaf node.
    pub fn leaf(value: f64) -> Self {
        Self {
            split_feature: None,
            threshold: None,
            left_child: None,
            right_child: None,
            default_left: false,
            leaf_value: Some(value),
        }
    }

    /// Creates an interior split node.
    pub fn split(feature: usize, threshold: f64, left: usize, right: usize) -> Self {
        Self {
            split_feature: Some(feature),
            threshold: Some(threshold),
            left_child: Some(left),
            right_child: Some(right),
            default_left: false,
            leaf_value: None,
        }
    }

    fn is_leaf(&self) -> bool {
        self.left_child.is_none()
    }
}

/// A binary decision tree over numeric features.
///
/// Traversal starts at node 0. Interior nodes route strictly-below-threshold
/// values left; records missing the split feature follow `default_left`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TreeModel {
    /// Record field names, indexed by `TreeNode::split_feature`.
    pub feature_names: Vec<String>,
    /// Nodes in index order; node 0 is the root.
    pub nodes: Vec<TreeNode>,
}

impl TreeModel {
    /// Registry type tag.
    pub const TYPE_NAME: &'static str = "tree";

    const FIELDS: &'static [&'static str] = &["feature_names", "nodes"];

    /// Constructs from a JSON payload under the given parse mode.
    pub fn from_json(payload: &serde_json::Value, mode: ParseMode) -> Result<Self, DefinitionError> {
        if mode == ParseMode::Strict {
            reject_unknown_fields(payload, Self::FIELDS)?;
            if let Some(nodes) = payload.get("nodes").and_then(|n| n.as_array()) {
                const NODE_FIELDS: &[&str] = &[
                    "split_feature",
                    "threshold",
                    "left_child",
                    "right_child",
                    "default_left",
                    "leaf_value",
                ];
                for node in nodes {
                    reject_unknown_fields(node, NODE_FIELDS)?;
                }
            }
        }
        let model: Self = serde_json::from_value(payload.clone())?;
        model.validate()?;
        Ok(model)
    }

    /// Constructs from a binary wire payload.
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Self, DefinitionError> {
        let n_features = r.read_u32()? as usize;
        let mut feature_names = Vec::with_capacity(n_features.min(r.remaining()));
        for _ in 0..n_features {
            feature_names.push(r.read_str()?);
        }
        let n_nodes = r.read_u32()? as usize;
        let mut nodes = Vec::with_capacity(n_nodes.min(r.remaining()));
        for _ in 0..n_nodes {
            nodes.push(TreeNode {
                split_feature: r.read_opt_u32()?.map(|v| v as usize),
                threshold: r.read_opt_f64()?,
                left_child: r.read_opt_u32()?.map(|v| v as usize),
                right_child: r.read_opt_u32()?.map(|v| v as usize),
                default_left: r.read_bool()?,
                leaf_value: r.read_opt_f64()?,
            });
        }
        let model = Self {
            feature_names,
            nodes,
        };
        model.validate()?;
        Ok(model)
    }

    /// Checks structural consistency of the tree.
    ///
    /// - At least one node.
    /// - Leaves carry a `leaf_value`.
    /// - Interior nodes carry a threshold, an in-bounds split feature, and
    ///   two in-bounds child indices.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.nodes.is_empty() {
            return Err(DefinitionError::Structural(
                "[tree] must have at least one node".into(),
            ));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                if node.leaf_value.is_none() {
                    return Err(DefinitionError::Structural(format!(
                        "[tree] leaf node {i} has no leaf_value",
                    )));
                }
                continue;
            }
            let feature = node.split_feature.ok_or_else(|| {
                DefinitionError::Structural(format!("[tree] split node {i} has no split_feature"))
            })?;
            if feature >= self.feature_names.len() {
                return Err(DefinitionError::Structural(format!(
                    "[tree] node {i} splits on feature {feature}, but only {} features are named",
                    self.feature_names.len(),
                )));
            }
            if node.threshold.is_none() {
                return Err(DefinitionError::Structural(format!(
                    "[tree] split node {i} has no threshold",
                )));
            }
            for child in [node.left_child, node.right_child] {
                match child {
                    Some(c) if c < self.nodes.len() && c > i => {}
                    Some(c) => {
                        return Err(DefinitionError::Structural(format!(
                            "[tree] node {i} references invalid child {c}",
                        )));
                    }
                    None => {
                        return Err(DefinitionError::Structural(format!(
                            "[tree] split node {i} is missing a child",
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walks the tree and returns the reached leaf value.
    fn traverse(&self, fields: &FieldMap) -> Result<f64, DefinitionError> {
        let mut index = 0;
        loop {
            let node = &self.nodes[index];
            if node.is_leaf() {
                // validate() guarantees leaf_value on leaves.
                return node.leaf_value.ok_or_else(|| {
                    DefinitionError::Invariant(format!("leaf node {index} lost its value"))
                });
            }
            let feature = node
                .split_feature
                .and_then(|f| self.feature_names.get(f))
                .ok_or_else(|| {
                    DefinitionError::Invariant(format!("split node {index} has no valid feature"))
                })?;
            let threshold = node.threshold.ok_or_else(|| {
                DefinitionError::Invariant(format!("split node {index} has no threshold"))
            })?;
            let go_left = match numeric_value(fields, feature) {
                Some(v) => v < threshold,
                None => node.default_left,
            };
            let next = if go_left {
                node.left_child
            } else {
                node.right_child
            };
            // validate() guarantees children exist and point forward.
            index = next.filter(|&c| c > index && c < self.nodes.len()).ok_or_else(|| {
                DefinitionError::Invariant(format!("split node {index} has no valid child"))
            })?;
        }
    }
}

impl Stage for TreeModel {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn payload(&self) -> Result<serde_json::Value, DefinitionError> {
        Ok(serde_json::to_value(self)?)
    }

    fn encode_payload(&self, w: &mut WireWriter) {
        w.write_u32(self.feature_names.len() as u32);
        for name in &self.feature_names {
            w.write_str(name);
        }
        w.write_u32(self.nodes.len() as u32);
        for node in &self.nodes {
            w.write_opt_u32(node.split_feature.map(|v| v as u32));
            w.write_opt_f64(node.threshold);
            w.write_opt_u32(node.left_child.map(|v| v as u32));
            w.write_opt_u32(node.right_child.map(|v| v as u32));
            w.write_bool(node.default_left);
            w.write_opt_f64(node.leaf_value);
        }
    }

    fn ram_bytes(&self) -> usize {
        let names: usize = self.feature_names.iter().map(|n| str_bytes(n)).sum();
        std::mem::size_of::<Self>()
            + names
            + self.feature_names.len() * std::mem::size_of::<String>()
            + self.nodes.len() * std::mem::size_of::<TreeNode>()
    }
}

impl TrainedModel for TreeModel {
    fn infer(
        &self,
        fields: &FieldMap,
        config: &InferenceConfig,
    ) -> Result<InferenceResult, DefinitionError> {
        let value = self.traverse(fields)?;
        Ok(match config {
            InferenceConfig::Regression => InferenceResult::Regression { value },
            InferenceConfig::Classification { .. } => InferenceResult::Classification {
                class_id: value.round() as i64,
            },
        })
    }
}
