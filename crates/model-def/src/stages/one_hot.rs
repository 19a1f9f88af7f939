// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! One-hot encoding preprocessor.

use crate::accounting::{str_bytes, MAP_ENTRY_OVERHEAD};
use crate::stage::{categorical_value, reject_unknown_fields, FieldMap, ParseMode};
use crate::wire::{WireReader, WireWriter};
use crate::{DefinitionError, PreProcessor, Stage};
use std::collections::HashMap;

/// Expands one categorical field into a set of 0/1 indicator columns.
///
/// `hot_map` maps each known categorical value to the name of the column it
/// switches on. Every mapped column is written on each invocation; the column
/// whose value matches the field gets `1`, the rest get `0`. A missing or
/// non-categorical source field leaves the record untouched.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OneHotEncoder {
    /// Name of the categorical input field.
    pub field: String,
    /// Categorical value → indicator column name.
    pub hot_map: HashMap<String, String>,
}

impl OneHotEncoder {
    /// Registry type tag.
    pub const TYPE_NAME: &'static str = "one_hot_encoding";

    const FIELDS: &'static [&'static str] = &["field", "hot_map"];

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
        let count = r.read_u32()? as usize;
        let mut hot_map = HashMap::with_capacity(count);
        for _ in 0..count {
            let value = r.read_str()?;
            let column = r.read_str()?;
            hot_map.insert(value, column);
        }
        Ok(Self { field, hot_map })
    }
}

impl Stage for OneHotEncoder {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn payload(&self) -> Result<serde_json::Value, DefinitionError> {
        Ok(serde_json::to_value(self)?)
    }

    fn encode_payload(&self, w: &mut WireWriter) {
        w.write_str(&self.field);
        w.write_u32(self.hot_map.len() as u32);
        // Sorted keys keep the encoding deterministic.
        let mut entries: Vec<_> = self.hot_map.iter().collect();
        entries.sort_by_key(|(k, _)| k.as_str());
        for (value, column) in entries {
            w.write_str(value);
            w.write_str(column);
        }
    }

    fn ram_bytes(&self) -> usize {
        let map_bytes: usize = self
            .hot_map
            .iter()
            .map(|(k, v)| str_bytes(k) + str_bytes(v) + MAP_ENTRY_OVERHEAD)
            .sum();
        std::mem::size_of::<Self>() + str_bytes(&self.field) + map_bytes
    }
}

impl PreProcessor for OneHotEncoder {
    fn process(&self, fields: &mut FieldMap) -> Result<(), DefinitionError> {
        let Some(value) = categorical_value(fields, &self.field) else {
            return Ok(());
        };
        for (candidate, column) in &self.hot_map {
            let hot = u64::from(*candidate == value);
            fields.insert(column.clone(), serde_json::Value::from(hot));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encoder() -> OneHotEncoder {
        OneHotEncoder {
            field: "color".into(),
            hot_map: HashMap::from([
                ("red".to_string(), "color_red".to_string()),
                ("blue".to_string(), "color_blue".to_string()),
            ]),
        }
    }

    #[test]
    fn test_process_sets_indicator_columns() {
        let mut fields = FieldMap::from([("color".to_string(), json!("red"))]);
        encoder().process(&mut fields).unwrap();
        assert_eq!(fields["color_red"], json!(1));
        assert_eq!(fields["color_blue"], json!(0));
    }

    #[test]
    fn test_process_missing_field_is_noop() {
        let mut fields = FieldMap::new();
        encoder().process(&mut fields).unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn test_process_numeric_field_uses_string_form() {
        let enc = OneHotEncoder {
            field: "code".into(),
            hot_map: HashMap::from([("7".to_string(), "code_7".to_string())]),
        };
        let mut fields = FieldMap::from([("code".to_string(), json!(7))]);
        enc.process(&mut fields).unwrap();
        assert_eq!(fields["code_7"], json!(1));
    }

    #[test]
    fn test_json_strict_rejects_unknown_payload_field() {
        let payload = json!({"field": "color", "hot_map": {}, "extra": true});
        assert!(OneHotEncoder::from_json(&payload, ParseMode::Lenient).is_ok());
        assert!(matches!(
            OneHotEncoder::from_json(&payload, ParseMode::Strict),
            Err(DefinitionError::UnexpectedField { .. }),
        ));
    }

    #[test]
    fn test_wire_roundtrip() {
        let enc = encoder();
        let mut w = WireWriter::new();
        enc.encode_payload(&mut w);
        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        let back = OneHotEncoder::from_wire(&mut r).unwrap();
        r.expect_end().unwrap();
        assert_eq!(back, enc);
    }

    #[test]
    fn test_ram_bytes_grows_with_map() {
        let small = encoder();
        let mut large = encoder();
        large
            .hot_map
            .insert("green".to_string(), "color_green".to_string());
        assert!(large.ram_bytes() > small.ram_bytes());
    }
}
