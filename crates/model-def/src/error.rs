// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for definition parsing, building, and inference.

/// Errors that can occur when decoding, building, or running a model definition.
#[derive(Debug, thiserror::Error)]
pub enum DefinitionError {
    /// Wrong cardinality or malformed section shape (e.g., zero or several
    /// `trained_model` entries, or several preprocessors in unordered form).
    #[error("{0}")]
    Structural(String),

    /// A type tag has no registered implementation.
    #[error("unknown {family} type '{type_name}'")]
    UnknownType {
        family: &'static str,
        type_name: String,
    },

    /// An unrecognised field was present in strict mode.
    #[error("unexpected field '{field}'")]
    UnexpectedField { field: String },

    /// A programming invariant was violated (a defect, not bad user input).
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// The JSON document is malformed.
    #[error("malformed document: {0}")]
    Document(#[from] serde_json::Error),

    /// The binary payload is truncated, oversized, or carries trailing bytes.
    #[error("malformed wire payload: {0}")]
    Wire(String),

    /// A stage implementation failed during `preprocess` or `infer`.
    #[error("inference failed: {0}")]
    Inference(String),
}
