// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-def
//!
//! A container format for trained inference models: one model stage plus an
//! ordered pipeline of feature preprocessors, round-tripping through a JSON
//! document encoding and a compact binary wire encoding.
//!
//! The main pieces:
//!
//! - [`Stage`] — the shared capability of every model and preprocessor
//!   variant, with the sub-traits [`TrainedModel`] and [`PreProcessor`].
//! - [`ModelDefinition`] — the immutable container, built only through
//!   [`DefinitionBuilder`], which enforces the exactly-one-model and
//!   preprocessor-ordering invariants.
//! - [`StageRegistry`] — maps type-name tags to stage factories; decoding
//!   resolves every polymorphic slot through it.
//! - [`ParseMode`] — lenient parsing drops unrecognised document fields,
//!   strict parsing rejects them.
//! - [`RenderParams`] — selects API rendering (adds the memory estimate) or
//!   storage rendering (adds the document type tag and model id).
//!
//! # Example
//! ```
//! use model_def::{
//!     DefinitionBuilder, ModelDefinition, ParseMode, RenderParams, StageRegistry,
//! };
//! use model_def::stages::{TreeModel, TreeNode};
//!
//! let def = DefinitionBuilder::new()
//!     .with_model(Box::new(TreeModel {
//!         feature_names: vec!["x".into()],
//!         nodes: vec![
//!             TreeNode::split(0, 0.5, 1, 2),
//!             TreeNode::leaf(0.0),
//!             TreeNode::leaf(1.0),
//!         ],
//!     }))
//!     .build()
//!     .unwrap();
//!
//! let doc = def.to_json_string(RenderParams::api()).unwrap();
//! let registry = StageRegistry::with_builtins();
//! let back = ModelDefinition::from_json_str(&doc, ParseMode::Lenient, &registry).unwrap();
//! assert_eq!(back, def);
//! ```

mod accounting;
mod definition;
mod error;
mod registry;
mod stage;
pub mod stages;
pub mod wire;

pub use accounting::{human_bytes, MemoryNode};
pub use definition::{doc_id, DefinitionBuilder, ModelDefinition, RenderParams, NAME};
pub use error::DefinitionError;
pub use registry::{JsonFactory, StageRegistry, WireFactory};
pub use stage::{
    reject_unknown_fields, FieldMap, InferenceConfig, InferenceResult, ParseMode, PreProcessor,
    Stage, TrainedModel,
};
