// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Frequency encoding preprocessor.

use crate::accounting::{str_bytes, MAP_ENTRY_OVERHEAD};
use crate::stage::{categorical_value, reject_unknown_fields, FieldMap, ParseMode};
use crate::wire::{WireReader, WireWriter};
use crate::{DefinitionError, PreProcessor, Stage};
use std::collections::HashMap;

/// Replaces a categorical value with its observed frequency.
///
/// Writes `frequency_map[field value]` into `feature_name`; values absent
/// from the map encode as `0.0`. A missing or non-categorical source field
/// leaves the record untouched.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrequencyEncoder {
    /// Name of the categorical input field.
    pub field: String,
    /// Name of the output feature column.
    pub feature_name: String,
    /// Categorical value → relative frequency.
    pub frequency_map: HashMap<String, f64>,
}

impl FrequencyEncoder {
    /// Registry type tag.
    pub const TYPE_NAME: &'static str = "frequency_encoding";

    const FIELDS: &'static [&'static str] = &["field", "feature_name", "frequency_map"];

    /// Constructs from a JSON payload under the given parse mode.
    pub fn from_json(payload: &serde_json::Value, mode: ParseMode) -> Result<Self, DefinitionError> {
        if mode == ParseMode::Strict {
            reject_unknown_fields(payload, Self::FIELDS)?;
        }
        Ok(serde_json::from_value(payload.clone())?)
    }

    /// Constructs from a binary wire payload.
    pub fn from_wire(r: &mut WireReader<'_>) -> Result<Self, DefinitionError> {
        let field = r.read_str()?;
        let feature_name = r.read_str()?;
        let count = r.read_u32()? as usize;
        let mut frequency_map = HashMap::with_capacity(count);
        for _ in 0..count {
            let value = r.read_str()?;
            let frequency = r.read_f64()?;
            frequency_map.insert(value, frequency);
        }
        Ok(Self {
            field,
            feature_name,
            frequency_map,
        })
    }
}

impl Stage for FrequencyEncoder {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn payload(&self) -> Result<serde_json::Value, DefinitionError> {
        Ok(serde_json::to_value(self)?)
    }

    fn encode_payload(&self, w: &mut WireWriter) {
        w.write_str(&self.field);
        w.write_str(&self.feature_name);
        w.write_u32(self.frequency_map.len() as u32);
        let mut entries: Vec<_> = self.frequency_map.iter().collect();
        entries.sort_by_key(|(k, _)| k.as_str());
        for (value, frequency) in entries {
            w.write_str(value);
            w.write_f64(*frequency);
        }
    }

    fn ram_bytes(&self) -> usize {
        let map_bytes: usize = self
            .frequency_map
            .keys()
            .map(|k| str_bytes(k) + std::mem::size_of::<f64>() + MAP_ENTRY_OVERHEAD)
            .sum();
        std::mem::size_of::<Self>()
            + str_bytes(&self.field)
            + str_bytes(&self.feature_name)
            + map_bytes
    }
}

impl PreProcessor for FrequencyEncoder {
    fn process(&self, fields: &mut FieldMap) -> Result<(), DefinitionError> {
        let Some(value) = categorical_value(fields, &self.field) else {
            return Ok(());
        };
        let frequency = self.frequency_map.get(&value).copied().unwrap_or(0.0);
        fields.insert(self.feature_name.clone(), serde_json::Value::from(frequency));
        Ok(())
    }
}
