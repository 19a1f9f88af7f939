// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Type-name → stage-factory registry.
//!
//! Each capability family (model / preprocessor) holds two JSON factory
//! tables, keyed separately per [`ParseMode`], plus one wire factory table.
//! The wire format is produced only by this codebase, so wire decoding is
//! trusted and has no strictness modes.
//!
//! [`StageRegistry::with_builtins`] installs the stages shipped with this
//! crate; callers can register further variants before decoding.

use crate::stage::{ParseMode, PreProcessor, TrainedModel};
use crate::stages::{FrequencyEncoder, OneHotEncoder, TreeModel};
use crate::wire::WireReader;
use crate::DefinitionError;
use std::collections::HashMap;

/// Factory building a stage from its JSON payload.
pub type JsonFactory<T> =
    fn(&serde_json::Value, ParseMode) -> Result<Box<T>, DefinitionError>;

/// Factory building a stage from its binary wire payload.
pub type WireFactory<T> = fn(&mut WireReader<'_>) -> Result<Box<T>, DefinitionError>;

/// Per-family factory tables.
struct FamilyTable<T: ?Sized> {
    lenient: HashMap<&'static str, JsonFactory<T>>,
    strict: HashMap<&'static str, JsonFactory<T>>,
    wire: HashMap<&'static str, WireFactory<T>>,
}

impl<T: ?Sized> Default for FamilyTable<T> {
    fn default() -> Self {
        Self {
            lenient: HashMap::new(),
            strict: HashMap::new(),
            wire: HashMap::new(),
        }
    }
}

impl<T: ?Sized> FamilyTable<T> {
    fn register(&mut self, name: &'static str, json: JsonFactory<T>, wire: WireFactory<T>) {
        self.lenient.insert(name, json);
        self.strict.insert(name, json);
        self.wire.insert(name, wire);
    }

    fn json_table(&self, mode: ParseMode) -> &HashMap<&'static str, JsonFactory<T>> {
        match mode {
            ParseMode::Lenient => &self.lenient,
            ParseMode::Strict => &self.strict,
        }
    }
}

/// Maps type-name tags to concrete stage constructors.
pub struct StageRegistry {
    models: FamilyTable<dyn TrainedModel>,
    preprocessors: FamilyTable<dyn PreProcessor>,
}

impl StageRegistry {
    /// Creates an empty registry with no stages registered.
    pub fn new() -> Self {
        Self {
            models: FamilyTable::default(),
            preprocessors: FamilyTable::default(),
        }
    }

    /// Creates a registry with every builtin stage registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_model(
            TreeModel::TYPE_NAME,
            |payload, mode| Ok(Box::new(TreeModel::from_json(payload, mode)?)),
            |r| Ok(Box::new(TreeModel::from_wire(r)?)),
        );
        registry.register_preprocessor(
            OneHotEncoder::TYPE_NAME,
            |payload, mode| Ok(Box::new(OneHotEncoder::from_json(payload, mode)?)),
            |r| Ok(Box::new(OneHotEncoder::from_wire(r)?)),
        );
        registry.register_preprocessor(
            FrequencyEncoder::TYPE_NAME,
            |payload, mode| Ok(Box::new(FrequencyEncoder::from_json(payload, mode)?)),
            |r| Ok(Box::new(FrequencyEncoder::from_wire(r)?)),
        );
        registry
    }

    /// Registers a model variant under both parse modes.
    pub fn register_model(
        &mut self,
        name: &'static str,
        json: JsonFactory<dyn TrainedModel>,
        wire: WireFactory<dyn TrainedModel>,
    ) {
        self.models.register(name, json, wire);
    }

    /// Registers a preprocessor variant under both parse modes.
    pub fn register_preprocessor(
        &mut self,
        name: &'static str,
        json: JsonFactory<dyn PreProcessor>,
        wire: WireFactory<dyn PreProcessor>,
    ) {
        self.preprocessors.register(name, json, wire);
    }

    /// Builds a model stage from its JSON payload.
    pub fn model_from_json(
        &self,
        name: &str,
        payload: &serde_json::Value,
        mode: ParseMode,
    ) -> Result<Box<dyn TrainedModel>, DefinitionError> {
        let factory = self.models.json_table(mode).get(name).ok_or_else(|| {
            DefinitionError::UnknownType {
                family: "model",
                type_name: name.to_string(),
            }
        })?;
        factory(payload, mode)
    }

    /// Builds a preprocessor stage from its JSON payload.
    pub fn preprocessor_from_json(
        &self,
        name: &str,
        payload: &serde_json::Value,
        mode: ParseMode,
    ) -> Result<Box<dyn PreProcessor>, DefinitionError> {
        let factory = self.preprocessors.json_table(mode).get(name).ok_or_else(|| {
            DefinitionError::UnknownType {
                family: "preprocessor",
                type_name: name.to_string(),
            }
        })?;
        factory(payload, mode)
    }

    /// Builds a model stage from the wire payload following its type tag.
    pub fn model_from_wire(
        &self,
        name: &str,
        r: &mut WireReader<'_>,
    ) -> Result<Box<dyn TrainedModel>, DefinitionError> {
        let factory = self.models.wire.get(name).ok_or_else(|| {
            DefinitionError::UnknownType {
                family: "model",
                type_name: name.to_string(),
            }
        })?;
        factory(r)
    }

    /// Builds a preprocessor stage from the wire payload following its type tag.
    pub fn preprocessor_from_wire(
        &self,
        name: &str,
        r: &mut WireReader<'_>,
    ) -> Result<Box<dyn PreProcessor>, DefinitionError> {
        let factory = self.preprocessors.wire.get(name).ok_or_else(|| {
            DefinitionError::UnknownType {
                family: "preprocessor",
                type_name: name.to_string(),
            }
        })?;
        factory(r)
    }
}

impl Default for StageRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
