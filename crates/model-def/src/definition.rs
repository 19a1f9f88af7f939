// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The trained-model definition container.
//!
//! A [`ModelDefinition`] owns exactly one model stage, an ordered sequence of
//! zero or more preprocessing stages, and an optional opaque identifier used
//! when the definition is persisted. It round-trips losslessly through two
//! encodings:
//!
//! - a JSON document (lenient or strict parsing, API or storage rendering),
//! - a compact binary wire format (type tags + payloads, order preserved).
//!
//! Definitions are constructed only through [`DefinitionBuilder::build`],
//! which enforces the structural invariants neither encoding can express:
//! exactly one model, and an unambiguous preprocessor order whenever more
//! than one preprocessor is present. Once built, a definition is immutable
//! and safe for concurrent read-only use.

use crate::accounting::{human_bytes, MemoryNode};
use crate::registry::StageRegistry;
use crate::stage::{FieldMap, InferenceConfig, InferenceResult, ParseMode, PreProcessor, TrainedModel};
use crate::wire::{WireReader, WireWriter};
use crate::DefinitionError;
use std::hash::{Hash, Hasher};

/// Container name: the storage document-type tag.
pub const NAME: &str = "trained_model_definition";

const TRAINED_MODEL: &str = "trained_model";
const PREPROCESSORS: &str = "preprocessors";
const MODEL_ID: &str = "model_id";
const DOC_TYPE: &str = "doc_type";
const HEAP_MEMORY_ESTIMATION: &str = "heap_memory_estimation";
const HEAP_MEMORY_ESTIMATION_BYTES: &str = "heap_memory_estimation_bytes";

/// Storage document id for a definition with the given model id.
pub fn doc_id(model_id: &str) -> String {
    format!("{NAME}-{model_id}")
}

/// Controls which optional fields the JSON rendering emits.
///
/// API rendering adds the memory-footprint estimate; storage rendering
/// instead adds the document-type tag and the (required) model id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderParams {
    for_storage: bool,
}

impl RenderParams {
    /// Rendering for API responses and other transport use.
    pub fn api() -> Self {
        Self { for_storage: false }
    }

    /// Rendering for persisted storage documents.
    pub fn storage() -> Self {
        Self { for_storage: true }
    }
}

/// An immutable trained-model definition: one model stage plus an ordered
/// preprocessing pipeline.
#[derive(Debug)]
pub struct ModelDefinition {
    model: Box<dyn TrainedModel>,
    preprocessors: Vec<Box<dyn PreProcessor>>,
    model_id: Option<String>,
}

impl ModelDefinition {
    // ── Accessors ──────────────────────────────────────────────

    /// The single model stage.
    pub fn model(&self) -> &dyn TrainedModel {
        self.model.as_ref()
    }

    /// The preprocessing stages, in execution order.
    pub fn preprocessors(&self) -> &[Box<dyn PreProcessor>] {
        &self.preprocessors
    }

    /// The opaque storage identifier, when present.
    pub fn model_id(&self) -> Option<&str> {
        self.model_id.as_deref()
    }

    // ── JSON codec ─────────────────────────────────────────────

    /// Decodes a definition from a JSON string.
    pub fn from_json_str(
        source: &str,
        mode: ParseMode,
        registry: &StageRegistry,
    ) -> Result<Self, DefinitionError> {
        let value: serde_json::Value = serde_json::from_str(source)?;
        Self::from_json_value(&value, mode, registry)
    }

    /// Decodes a definition from a parsed JSON value.
    ///
    /// Unknown top-level fields are dropped in lenient mode and rejected in
    /// strict mode. Unresolvable type tags fail with
    /// [`DefinitionError::UnknownType`] in both modes.
    pub fn from_json_value(
        value: &serde_json::Value,
        mode: ParseMode,
        registry: &StageRegistry,
    ) -> Result<Self, DefinitionError> {
        let obj = value.as_object().ok_or_else(|| {
            DefinitionError::Structural(format!("[{NAME}] must be a JSON object"))
        })?;

        let mut builder = DefinitionBuilder::for_parser();
        for (key, val) in obj {
            match key.as_str() {
                TRAINED_MODEL => {
                    let (entries, _) = named_entries(val, TRAINED_MODEL)?;
                    if entries.len() != 1 {
                        return Err(DefinitionError::Structural(format!(
                            "[{TRAINED_MODEL}] must have exactly one model defined, got {}",
                            entries.len(),
                        )));
                    }
                    let models = entries
                        .iter()
                        .map(|(name, payload)| registry.model_from_json(name, payload, mode))
                        .collect::<Result<Vec<_>, _>>()?;
                    builder.set_model_entries(models)?;
                }
                PREPROCESSORS => {
                    let (entries, in_order) = named_entries(val, PREPROCESSORS)?;
                    let stages = entries
                        .iter()
                        .map(|(name, payload)| {
                            registry.preprocessor_from_json(name, payload, mode)
                        })
                        .collect::<Result<Vec<_>, _>>()?;
                    builder.set_preprocessors(stages, in_order);
                }
                MODEL_ID => {
                    let id = val.as_str().ok_or_else(|| {
                        DefinitionError::Structural(format!("[{MODEL_ID}] must be a string"))
                    })?;
                    builder.set_model_id(id);
                }
                DOC_TYPE => {
                    if val.as_str() != Some(NAME) {
                        return Err(DefinitionError::Structural(format!(
                            "[{DOC_TYPE}] must be '{NAME}', got {val}",
                        )));
                    }
                }
                other => match mode {
                    ParseMode::Strict => {
                        return Err(DefinitionError::UnexpectedField {
                            field: other.to_string(),
                        });
                    }
                    ParseMode::Lenient => {
                        tracing::debug!("dropping unrecognised field '{other}'");
                    }
                },
            }
        }
        builder.build()
    }

    /// Encodes the definition as a JSON value.
    ///
    /// Field order: the singleton `trained_model` section, the ordered
    /// `preprocessors` array, then the rendering-mode extras.
    pub fn to_json(&self, params: RenderParams) -> Result<serde_json::Value, DefinitionError> {
        let mut map = serde_json::Map::new();

        let mut model_section = serde_json::Map::new();
        model_section.insert(self.model.type_name().to_string(), self.model.payload()?);
        map.insert(TRAINED_MODEL.to_string(), model_section.into());

        let stages = self
            .preprocessors
            .iter()
            .map(|p| {
                let mut entry = serde_json::Map::new();
                entry.insert(p.type_name().to_string(), p.payload()?);
                Ok(serde_json::Value::from(entry))
            })
            .collect::<Result<Vec<_>, DefinitionError>>()?;
        map.insert(PREPROCESSORS.to_string(), stages.into());

        if params.for_storage {
            let model_id = self.model_id.as_deref().ok_or_else(|| {
                DefinitionError::Invariant(
                    "storage rendering requires a model id to be set".into(),
                )
            })?;
            map.insert(DOC_TYPE.to_string(), NAME.into());
            map.insert(MODEL_ID.to_string(), model_id.into());
        } else {
            let ram = self.ram_bytes();
            map.insert(HEAP_MEMORY_ESTIMATION_BYTES.to_string(), ram.into());
            map.insert(HEAP_MEMORY_ESTIMATION.to_string(), human_bytes(ram).into());
        }

        Ok(map.into())
    }

    /// Encodes the definition as a JSON string.
    pub fn to_json_string(&self, params: RenderParams) -> Result<String, DefinitionError> {
        Ok(serde_json::to_string_pretty(&self.to_json(params)?)?)
    }

    // ── Binary codec ───────────────────────────────────────────

    /// Encodes the definition in the binary wire format.
    ///
    /// Layout, in order, no padding: model type tag + payload; preprocessor
    /// count, then each type tag + payload in execution order; presence flag
    /// + optional model id.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut w = WireWriter::new();
        w.write_str(self.model.type_name());
        self.model.encode_payload(&mut w);
        w.write_u32(self.preprocessors.len() as u32);
        for p in &self.preprocessors {
            w.write_str(p.type_name());
            p.encode_payload(&mut w);
        }
        w.write_opt_str(self.model_id.as_deref());
        w.into_bytes()
    }

    /// Decodes a definition from the binary wire format.
    ///
    /// The payload must be fully consumed; trailing bytes are rejected.
    pub fn from_wire(bytes: &[u8], registry: &StageRegistry) -> Result<Self, DefinitionError> {
        let mut r = WireReader::new(bytes);

        let model_tag = r.read_str()?;
        let model = registry.model_from_wire(&model_tag, &mut r)?;

        let count = r.read_u32()? as usize;
        if count > r.remaining() {
            return Err(DefinitionError::Wire(format!(
                "preprocessor count {count} exceeds the remaining payload size",
            )));
        }
        let mut preprocessors = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = r.read_str()?;
            preprocessors.push(registry.preprocessor_from_wire(&tag, &mut r)?);
        }

        let model_id = r.read_opt_str()?;
        r.expect_end()?;

        let mut builder = DefinitionBuilder::new()
            .with_model(model)
            .with_preprocessors(preprocessors, true);
        if let Some(id) = model_id {
            builder = builder.with_model_id(id);
        }
        builder.build()
    }

    // ── Pipeline ───────────────────────────────────────────────

    /// Applies every preprocessing stage to the record, in sequence order.
    ///
    /// The first failing stage aborts the pipeline.
    pub fn preprocess(&self, fields: &mut FieldMap) -> Result<(), DefinitionError> {
        for p in &self.preprocessors {
            p.process(fields)?;
        }
        Ok(())
    }

    /// Preprocesses the record, then runs the model stage against it.
    pub fn infer(
        &self,
        fields: &mut FieldMap,
        config: &InferenceConfig,
    ) -> Result<InferenceResult, DefinitionError> {
        self.preprocess(fields)?;
        self.model.infer(fields, config)
    }

    // ── Memory accounting ──────────────────────────────────────

    /// Estimated in-memory footprint in bytes.
    ///
    /// Shallow size of the container's own fields, plus the model's and
    /// every preprocessor's self-reported size. Stable for an unmutated
    /// instance and monotonic in the number of stages.
    pub fn ram_bytes(&self) -> usize {
        let mut size = std::mem::size_of::<Self>();
        size += self.model.ram_bytes();
        size += self
            .preprocessors
            .iter()
            .map(|p| p.ram_bytes())
            .sum::<usize>();
        size
    }

    /// The footprint broken down as a tree of named, sized children.
    ///
    /// Diagnostics only; inference never consults this.
    pub fn memory_tree(&self) -> MemoryNode {
        let mut children = Vec::with_capacity(self.preprocessors.len() + 1);
        children.push(MemoryNode::leaf(TRAINED_MODEL, self.model.ram_bytes()));
        for p in &self.preprocessors {
            children.push(MemoryNode::leaf(
                format!("pre_processor_{}", p.name()),
                p.ram_bytes(),
            ));
        }
        MemoryNode::with_children(NAME, self.ram_bytes(), children)
    }
}

// ── Structural equality ────────────────────────────────────────

/// Two stages are equal when their type tags and JSON payloads match.
fn stages_equal(a: &dyn crate::Stage, b: &dyn crate::Stage) -> bool {
    a.type_name() == b.type_name()
        && match (a.payload(), b.payload()) {
            (Ok(pa), Ok(pb)) => pa == pb,
            _ => false,
        }
}

/// Renders a JSON value with object keys sorted, so hashing is independent
/// of map iteration order.
fn canonical_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();
            let fields: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{k:?}:{}", canonical_string(&map[k])))
                .collect();
            format!("{{{}}}", fields.join(","))
        }
        serde_json::Value::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical_string).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}

fn hash_stage<H: Hasher>(stage: &dyn crate::Stage, state: &mut H) {
    stage.type_name().hash(state);
    if let Ok(payload) = stage.payload() {
        canonical_string(&payload).hash(state);
    }
}

impl PartialEq for ModelDefinition {
    fn eq(&self, other: &Self) -> bool {
        stages_equal(self.model.as_ref(), other.model.as_ref())
            && self.preprocessors.len() == other.preprocessors.len()
            && self
                .preprocessors
                .iter()
                .zip(&other.preprocessors)
                .all(|(a, b)| stages_equal(a.as_ref(), b.as_ref()))
            && self.model_id == other.model_id
    }
}

impl Eq for ModelDefinition {}

impl Hash for ModelDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        hash_stage(self.model.as_ref(), state);
        for p in &self.preprocessors {
            hash_stage(p.as_ref(), state);
        }
        self.model_id.hash(state);
    }
}

// ── Parsing helpers ────────────────────────────────────────────

/// Extracts `(type name, payload)` entries from a named-object section.
///
/// Accepts either an object (`{"tag": {...}, ...}` — unordered) or an array
/// of single-keyed objects (`[{"tag": {...}}, ...]` — explicitly ordered).
/// Returns the entries plus whether the source form was ordered.
fn named_entries<'v>(
    section: &'v serde_json::Value,
    field: &str,
) -> Result<(Vec<(&'v str, &'v serde_json::Value)>, bool), DefinitionError> {
    match section {
        serde_json::Value::Object(map) => {
            Ok((map.iter().map(|(k, v)| (k.as_str(), v)).collect(), false))
        }
        serde_json::Value::Array(items) => {
            let mut entries = Vec::with_capacity(items.len());
            for item in items {
                let obj = item.as_object().filter(|o| o.len() == 1).ok_or_else(|| {
                    DefinitionError::Structural(format!(
                        "[{field}] array entries must be objects with exactly one type-name key",
                    ))
                })?;
                for (k, v) in obj {
                    entries.push((k.as_str(), v));
                }
            }
            Ok((entries, true))
        }
        _ => Err(DefinitionError::Structural(format!(
            "[{field}] must be an object or an array of named objects",
        ))),
    }
}

// ── Builder ────────────────────────────────────────────────────

/// Mutable accumulator producing an immutable [`ModelDefinition`].
///
/// Single-use: `build()` consumes the builder and is the only path to a
/// definition. Programmatic construction treats preprocessors as ordered;
/// the parser starts unordered and flips the flag only when the source
/// presented an explicit array.
#[derive(Default)]
pub struct DefinitionBuilder {
    model: Option<Box<dyn TrainedModel>>,
    preprocessors: Vec<Box<dyn PreProcessor>>,
    model_id: Option<String>,
    processors_in_order: bool,
}

impl DefinitionBuilder {
    /// Creates a builder for programmatic construction.
    pub fn new() -> Self {
        Self {
            processors_in_order: true,
            ..Self::default()
        }
    }

    /// Creates a builder for the document parser, which must prove ordering.
    fn for_parser() -> Self {
        Self::default()
    }

    /// Sets the single model stage.
    pub fn with_model(mut self, model: Box<dyn TrainedModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Sets the preprocessing stages and whether they arrived in an
    /// explicitly ordered form.
    pub fn with_preprocessors(
        mut self,
        preprocessors: Vec<Box<dyn PreProcessor>>,
        in_order: bool,
    ) -> Self {
        self.set_preprocessors(preprocessors, in_order);
        self
    }

    /// Sets the opaque storage identifier.
    pub fn with_model_id(mut self, id: impl Into<String>) -> Self {
        self.set_model_id(id);
        self
    }

    fn set_preprocessors(&mut self, preprocessors: Vec<Box<dyn PreProcessor>>, in_order: bool) {
        self.preprocessors = preprocessors;
        self.processors_in_order = in_order;
    }

    fn set_model_id(&mut self, id: impl Into<String>) {
        self.model_id = Some(id.into());
    }

    /// Parser entry point: stores the single model from a named section.
    fn set_model_entries(
        &mut self,
        mut models: Vec<Box<dyn TrainedModel>>,
    ) -> Result<(), DefinitionError> {
        if models.len() != 1 {
            return Err(DefinitionError::Structural(format!(
                "[{TRAINED_MODEL}] must have exactly one model defined, got {}",
                models.len(),
            )));
        }
        self.model = models.pop();
        Ok(())
    }

    /// Validates the accumulated state and produces the immutable definition.
    pub fn build(self) -> Result<ModelDefinition, DefinitionError> {
        let model = self.model.ok_or_else(|| {
            DefinitionError::Structural(format!(
                "[{TRAINED_MODEL}] must have exactly one model defined, got 0",
            ))
        })?;
        if self.preprocessors.len() > 1 && !self.processors_in_order {
            return Err(DefinitionError::Structural(format!(
                "[{PREPROCESSORS}] must be an ordered array when more than one preprocessor is defined",
            )));
        }
        Ok(ModelDefinition {
            model,
            preprocessors: self.preprocessors,
            model_id: self.model_id,
        })
    }
}
