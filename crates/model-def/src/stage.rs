// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The polymorphic stage capability.
//!
//! Every concrete preprocessor and every concrete model variant implements
//! [`Stage`]: it identifies itself by a type name, serialises itself to both
//! encodings, and reports its own memory footprint. The two sub-capabilities
//! are [`PreProcessor`] (rewrites fields of the input record) and
//! [`TrainedModel`] (produces an [`InferenceResult`]).
//!
//! Implementations must hold no interior mutability: once a definition is
//! built it is shared read-only, possibly across threads.

use crate::wire::WireWriter;
use crate::DefinitionError;
use std::collections::HashMap;
use std::fmt;

/// The mutable field-value record a pipeline operates on.
///
/// Owned by the caller; preprocessors read and rewrite fields by name.
pub type FieldMap = HashMap<String, serde_json::Value>;

/// Parsing strictness for the JSON document encoding.
///
/// Lenient parsing tolerates and drops unrecognised fields (reading
/// possibly-future-versioned data); strict parsing rejects them (validating
/// freshly authored input). The two modes must construct behaviourally
/// identical stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    Lenient,
    Strict,
}

/// Shared capability of every model and preprocessor variant.
pub trait Stage: fmt::Debug + Send + Sync {
    /// Registry tag identifying the concrete implementation.
    fn type_name(&self) -> &'static str;

    /// Label used in memory accounting. Defaults to the type name.
    fn name(&self) -> &str {
        self.type_name()
    }

    /// The stage's JSON payload (the value under its type-name key).
    fn payload(&self) -> Result<serde_json::Value, DefinitionError>;

    /// Appends the stage's binary payload to the writer.
    fn encode_payload(&self, w: &mut WireWriter);

    /// Self-reported in-memory footprint estimate in bytes.
    fn ram_bytes(&self) -> usize;
}

/// A feature preprocessing stage.
pub trait PreProcessor: Stage {
    /// Applies this stage's transform to the record, in place.
    fn process(&self, fields: &mut FieldMap) -> Result<(), DefinitionError>;
}

/// A trained inference model stage.
pub trait TrainedModel: Stage {
    /// Runs inference against the (already preprocessed) record.
    fn infer(
        &self,
        fields: &FieldMap,
        config: &InferenceConfig,
    ) -> Result<InferenceResult, DefinitionError>;
}

/// Typed configuration handed to the model stage at inference time.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceConfig {
    /// Predict a continuous value.
    Regression,
    /// Predict a class label.
    Classification { num_top_classes: usize },
}

/// Result of running a model stage; the shape is model-variant-specific and
/// opaque to the container.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceResult {
    Regression { value: f64 },
    Classification { class_id: i64 },
}

/// Rejects payload fields outside the `known` set.
///
/// Used by stage factories in strict mode; lenient mode skips the check and
/// lets serde drop the extras.
pub fn reject_unknown_fields(
    payload: &serde_json::Value,
    known: &[&str],
) -> Result<(), DefinitionError> {
    if let Some(obj) = payload.as_object() {
        for key in obj.keys() {
            if !known.contains(&key.as_str()) {
                return Err(DefinitionError::UnexpectedField { field: key.clone() });
            }
        }
    }
    Ok(())
}

/// Renders a record field as the string used for categorical lookups.
///
/// Numbers are rendered through their JSON representation; other value
/// kinds have no categorical meaning and yield `None`.
pub(crate) fn categorical_value(fields: &FieldMap, field: &str) -> Option<String> {
    match fields.get(field)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Extracts a numeric field value, if present and numeric.
pub(crate) fn numeric_value(fields: &FieldMap, field: &str) -> Option<f64> {
    fields.get(field)?.as_f64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reject_unknown_fields() {
        let payload = json!({"field": "f", "hot_map": {}});
        assert!(reject_unknown_fields(&payload, &["field", "hot_map"]).is_ok());

        let payload = json!({"field": "f", "bogus": 1});
        let err = reject_unknown_fields(&payload, &["field"]).unwrap_err();
        assert!(matches!(
            err,
            DefinitionError::UnexpectedField { ref field } if field == "bogus"
        ));
    }

    #[test]
    fn test_categorical_value() {
        let mut fields = FieldMap::new();
        fields.insert("s".into(), json!("red"));
        fields.insert("n".into(), json!(3));
        fields.insert("b".into(), json!(true));
        fields.insert("arr".into(), json!([1, 2]));

        assert_eq!(categorical_value(&fields, "s").as_deref(), Some("red"));
        assert_eq!(categorical_value(&fields, "n").as_deref(), Some("3"));
        assert_eq!(categorical_value(&fields, "b").as_deref(), Some("true"));
        assert_eq!(categorical_value(&fields, "arr"), None);
        assert_eq!(categorical_value(&fields, "missing"), None);
    }

    #[test]
    fn test_numeric_value() {
        let mut fields = FieldMap::new();
        fields.insert("x".into(), json!(1.25));
        fields.insert("s".into(), json!("nope"));
        assert_eq!(numeric_value(&fields, "x"), Some(1.25));
        assert_eq!(numeric_value(&fields, "s"), None);
        assert_eq!(numeric_value(&fields, "missing"), None);
    }

    #[test]
    fn test_inference_config_serde() {
        let json = serde_json::to_value(InferenceConfig::Classification { num_top_classes: 3 })
            .unwrap();
        let back: InferenceConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, InferenceConfig::Classification { num_top_classes: 3 });
    }
}
