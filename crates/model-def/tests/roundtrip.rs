// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end definition lifecycle.
//!
//! These tests exercise the complete flow from document decoding →
//! validation → pipeline execution → re-encoding, across both codecs and
//! both parse modes, including caller-registered stage variants.

use model_def::stages::{FrequencyEncoder, OneHotEncoder, TreeModel, TreeNode};
use model_def::wire::{WireReader, WireWriter};
use model_def::{
    doc_id, DefinitionBuilder, DefinitionError, FieldMap, InferenceConfig, InferenceResult,
    ModelDefinition, ParseMode, PreProcessor, RenderParams, Stage, StageRegistry, TrainedModel,
};
use serde_json::json;
use std::collections::HashMap;

// ── Helpers ────────────────────────────────────────────────────

/// x < 0.5 → 0.0, else 1.0.
fn stump() -> Box<dyn TrainedModel> {
    Box::new(TreeModel {
        feature_names: vec!["x".into()],
        nodes: vec![
            TreeNode::split(0, 0.5, 1, 2),
            TreeNode::leaf(0.0),
            TreeNode::leaf(1.0),
        ],
    })
}

fn encoders() -> Vec<Box<dyn PreProcessor>> {
    vec![
        Box::new(OneHotEncoder {
            field: "color".into(),
            hot_map: HashMap::from([
                ("red".to_string(), "color_red".to_string()),
                ("blue".to_string(), "color_blue".to_string()),
            ]),
        }),
        Box::new(FrequencyEncoder {
            field: "city".into(),
            feature_name: "city_freq".into(),
            frequency_map: HashMap::from([("athens".to_string(), 0.6)]),
        }),
    ]
}

fn full_definition() -> ModelDefinition {
    DefinitionBuilder::new()
        .with_model(stump())
        .with_preprocessors(encoders(), true)
        .with_model_id("test-model")
        .build()
        .unwrap()
}

// ── Codec round-trips ──────────────────────────────────────────

#[test]
fn test_storage_document_roundtrips_strictly() {
    let def = full_definition();
    let registry = StageRegistry::with_builtins();

    let doc = def.to_json_string(RenderParams::storage()).unwrap();
    let back = ModelDefinition::from_json_str(&doc, ParseMode::Strict, &registry).unwrap();
    assert_eq!(back, def);
    assert_eq!(back.model_id(), Some("test-model"));
}

#[test]
fn test_api_document_needs_lenient_parsing() {
    // API rendering adds memory-estimate fields the document schema does not
    // declare; strict parsing must reject them, lenient must drop them.
    let def = full_definition();
    let registry = StageRegistry::with_builtins();
    let doc = def.to_json_string(RenderParams::api()).unwrap();

    let back = ModelDefinition::from_json_str(&doc, ParseMode::Lenient, &registry).unwrap();
    assert_eq!(back, def);

    let err = ModelDefinition::from_json_str(&doc, ParseMode::Strict, &registry).unwrap_err();
    assert!(matches!(err, DefinitionError::UnexpectedField { .. }));
}

#[test]
fn test_wire_roundtrip_preserves_everything() {
    let def = full_definition();
    let registry = StageRegistry::with_builtins();
    let back = ModelDefinition::from_wire(&def.to_wire(), &registry).unwrap();
    assert_eq!(back, def);
    assert_eq!(back.preprocessors().len(), 2);
    assert_eq!(back.preprocessors()[0].type_name(), "one_hot_encoding");
}

#[test]
fn test_wire_to_json_to_wire() {
    let def = full_definition();
    let registry = StageRegistry::with_builtins();

    let via_wire = ModelDefinition::from_wire(&def.to_wire(), &registry).unwrap();
    let doc = via_wire.to_json_string(RenderParams::storage()).unwrap();
    let via_json = ModelDefinition::from_json_str(&doc, ParseMode::Strict, &registry).unwrap();
    assert_eq!(via_json.to_wire(), def.to_wire());
}

#[test]
fn test_lenient_and_strict_agree_on_clean_input() {
    let doc = full_definition()
        .to_json_string(RenderParams::storage())
        .unwrap();
    let registry = StageRegistry::with_builtins();
    let lenient = ModelDefinition::from_json_str(&doc, ParseMode::Lenient, &registry).unwrap();
    let strict = ModelDefinition::from_json_str(&doc, ParseMode::Strict, &registry).unwrap();
    assert_eq!(lenient, strict);
}

// ── Structural invariants ──────────────────────────────────────

#[test]
fn test_model_cardinality_is_enforced() {
    let registry = StageRegistry::with_builtins();

    let none = json!({"trained_model": {}, "preprocessors": []});
    let err = ModelDefinition::from_json_value(&none, ParseMode::Lenient, &registry).unwrap_err();
    assert!(matches!(err, DefinitionError::Structural(_)));

    let two = json!({
        "trained_model": [
            {"tree": {"feature_names": [], "nodes": [{"leaf_value": 0.0}]}},
            {"tree": {"feature_names": [], "nodes": [{"leaf_value": 1.0}]}},
        ],
    });
    let err = ModelDefinition::from_json_value(&two, ParseMode::Lenient, &registry).unwrap_err();
    assert!(matches!(err, DefinitionError::Structural(_)));
}

#[test]
fn test_unordered_preprocessors_rejected_when_ambiguous() {
    let registry = StageRegistry::with_builtins();
    let doc = json!({
        "trained_model": {"tree": {"feature_names": [], "nodes": [{"leaf_value": 0.0}]}},
        "preprocessors": {
            "one_hot_encoding": {"field": "a", "hot_map": {}},
            "frequency_encoding": {"field": "b", "feature_name": "f", "frequency_map": {}},
        },
    });
    let err = ModelDefinition::from_json_value(&doc, ParseMode::Lenient, &registry).unwrap_err();
    assert!(matches!(err, DefinitionError::Structural(_)));

    // One preprocessor is order-unambiguous, object form is accepted.
    let doc = json!({
        "trained_model": {"tree": {"feature_names": [], "nodes": [{"leaf_value": 0.0}]}},
        "preprocessors": {"one_hot_encoding": {"field": "a", "hot_map": {}}},
    });
    let def = ModelDefinition::from_json_value(&doc, ParseMode::Strict, &registry).unwrap();
    assert_eq!(def.preprocessors().len(), 1);
}

#[test]
fn test_array_order_is_execution_order() {
    let registry = StageRegistry::with_builtins();
    let doc = json!({
        "trained_model": {"tree": {"feature_names": [], "nodes": [{"leaf_value": 0.0}]}},
        "preprocessors": [
            {"frequency_encoding": {"field": "b", "feature_name": "f", "frequency_map": {}}},
            {"one_hot_encoding": {"field": "a", "hot_map": {}}},
        ],
    });
    let def = ModelDefinition::from_json_value(&doc, ParseMode::Strict, &registry).unwrap();
    let names: Vec<_> = def
        .preprocessors()
        .iter()
        .map(|p| p.type_name())
        .collect();
    assert_eq!(names, vec!["frequency_encoding", "one_hot_encoding"]);
}

// ── Custom stage registration ──────────────────────────────────

/// A stage that always fails, for pipeline-abort testing.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
struct PoisonStage {
    message: String,
}

impl Stage for PoisonStage {
    fn type_name(&self) -> &'static str {
        "poison"
    }

    fn payload(&self) -> Result<serde_json::Value, DefinitionError> {
        Ok(serde_json::to_value(self)?)
    }

    fn encode_payload(&self, w: &mut WireWriter) {
        w.write_str(&self.message);
    }

    fn ram_bytes(&self) -> usize {
        std::mem::size_of::<Self>() + self.message.len()
    }
}

impl PreProcessor for PoisonStage {
    fn process(&self, _fields: &mut FieldMap) -> Result<(), DefinitionError> {
        Err(DefinitionError::Inference(self.message.clone()))
    }
}

fn registry_with_poison() -> StageRegistry {
    let mut registry = StageRegistry::with_builtins();
    registry.register_preprocessor(
        "poison",
        |payload, _mode| Ok(Box::new(serde_json::from_value::<PoisonStage>(payload.clone())?)),
        |r: &mut WireReader<'_>| {
            Ok(Box::new(PoisonStage {
                message: r.read_str()?,
            }))
        },
    );
    registry
}

#[test]
fn test_registered_stage_decodes_from_both_codecs() {
    let registry = registry_with_poison();
    let def = DefinitionBuilder::new()
        .with_model(stump())
        .with_preprocessors(
            vec![Box::new(PoisonStage {
                message: "boom".into(),
            })],
            true,
        )
        .build()
        .unwrap();

    let doc = def.to_json_string(RenderParams::api()).unwrap();
    let back = ModelDefinition::from_json_str(&doc, ParseMode::Lenient, &registry).unwrap();
    assert_eq!(back, def);

    let back = ModelDefinition::from_wire(&def.to_wire(), &registry).unwrap();
    assert_eq!(back, def);
}

#[test]
fn test_unregistered_stage_fails_decoding() {
    // The same document fails against a registry without the stage.
    let def = DefinitionBuilder::new()
        .with_model(stump())
        .with_preprocessors(
            vec![Box::new(PoisonStage {
                message: "boom".into(),
            })],
            true,
        )
        .build()
        .unwrap();
    let doc = def.to_json_string(RenderParams::api()).unwrap();
    let err = ModelDefinition::from_json_str(
        &doc,
        ParseMode::Lenient,
        &StageRegistry::with_builtins(),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        DefinitionError::UnknownType { family: "preprocessor", ref type_name }
            if type_name == "poison",
    ));
}

// ── Pipeline ───────────────────────────────────────────────────

#[test]
fn test_full_pipeline_preprocesses_then_infers() {
    let def = full_definition();
    let mut fields = FieldMap::from([
        ("x".to_string(), json!(0.7)),
        ("color".to_string(), json!("red")),
        ("city".to_string(), json!("athens")),
    ]);
    let result = def
        .infer(&mut fields, &InferenceConfig::Regression)
        .unwrap();
    assert_eq!(result, InferenceResult::Regression { value: 1.0 });

    // Both preprocessors ran against the caller's record.
    assert_eq!(fields["color_red"], json!(1));
    assert_eq!(fields["color_blue"], json!(0));
    assert_eq!(fields["city_freq"], json!(0.6));
}

#[test]
fn test_later_stage_observes_earlier_output() {
    // Stage A writes `city_freq`; stage B one-hot-encodes that written value.
    // With the order reversed, B sees no input field and stays silent.
    let a = || -> Box<dyn PreProcessor> {
        Box::new(FrequencyEncoder {
            field: "city".into(),
            feature_name: "city_freq".into(),
            frequency_map: HashMap::from([("athens".to_string(), 0.5)]),
        })
    };
    let b = || -> Box<dyn PreProcessor> {
        Box::new(OneHotEncoder {
            field: "city_freq".into(),
            hot_map: HashMap::from([("0.5".to_string(), "freq_half".to_string())]),
        })
    };
    let chained = DefinitionBuilder::new()
        .with_model(stump())
        .with_preprocessors(vec![a(), b()], true)
        .build()
        .unwrap();
    let mut fields = FieldMap::from([("city".to_string(), json!("athens"))]);
    chained.preprocess(&mut fields).unwrap();
    assert_eq!(fields["freq_half"], json!(1));

    let reversed = DefinitionBuilder::new()
        .with_model(stump())
        .with_preprocessors(vec![b(), a()], true)
        .build()
        .unwrap();
    let mut fields = FieldMap::from([("city".to_string(), json!("athens"))]);
    reversed.preprocess(&mut fields).unwrap();
    assert!(!fields.contains_key("freq_half"));
}

#[test]
fn test_failing_preprocessor_aborts_before_inference() {
    let def = DefinitionBuilder::new()
        .with_model(stump())
        .with_preprocessors(
            vec![
                Box::new(PoisonStage {
                    message: "bad stage".into(),
                }),
                Box::new(FrequencyEncoder {
                    field: "city".into(),
                    feature_name: "city_freq".into(),
                    frequency_map: HashMap::new(),
                }),
            ],
            true,
        )
        .build()
        .unwrap();

    let mut fields = FieldMap::from([
        ("x".to_string(), json!(0.7)),
        ("city".to_string(), json!("athens")),
    ]);
    let err = def
        .infer(&mut fields, &InferenceConfig::Regression)
        .unwrap_err();
    assert!(matches!(err, DefinitionError::Inference(_)));

    // The stage after the failing one never ran.
    assert!(!fields.contains_key("city_freq"));
}

#[test]
fn test_empty_pipeline_is_identity() {
    let def = DefinitionBuilder::new().with_model(stump()).build().unwrap();
    let mut fields = FieldMap::from([("x".to_string(), json!(0.1))]);
    let before = fields.clone();
    def.preprocess(&mut fields).unwrap();
    assert_eq!(fields, before);
}

// ── Accounting ─────────────────────────────────────────────────

#[test]
fn test_memory_accounting_is_deterministic() {
    let def = full_definition();
    let first = def.ram_bytes();
    for _ in 0..5 {
        assert_eq!(def.ram_bytes(), first);
    }
    assert_eq!(def.memory_tree().bytes, first);
}

#[test]
fn test_memory_survives_roundtrip() {
    let def = full_definition();
    let registry = StageRegistry::with_builtins();
    let back = ModelDefinition::from_wire(&def.to_wire(), &registry).unwrap();
    assert_eq!(back.ram_bytes(), def.ram_bytes());
}

// ── Storage identity ───────────────────────────────────────────

#[test]
fn test_doc_id_embeds_model_id() {
    let def = full_definition();
    let id = doc_id(def.model_id().unwrap());
    assert_eq!(id, "trained_model_definition-test-model");
}
