// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Builtin stage implementations.
//!
//! These are the concrete variants registered by
//! [`StageRegistry::with_builtins`](crate::StageRegistry::with_builtins):
//!
//! - [`OneHotEncoder`] — expands a categorical field into 0/1 columns.
//! - [`FrequencyEncoder`] — replaces a categorical value with its observed
//!   frequency.
//! - [`TreeModel`] — a binary decision tree over numeric features.
//!
//! Each implements both codecs, both parse modes, and self-sizing. External
//! crates can register further variants through the registry.

mod frequency;
mod one_hot;
mod tree;

pub use frequency::FrequencyEncoder;
pub use one_hot::OneHotEncoder;
pub use tree::{TreeModel, TreeNode};
