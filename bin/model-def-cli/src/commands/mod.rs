// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! CLI command implementations and shared helpers.

pub mod convert;
pub mod inspect;
pub mod validate;

use crate::InputFormat;
use model_def::{ModelDefinition, ParseMode, StageRegistry};
use std::path::Path;

/// Initializes tracing with a verbosity-derived filter.
///
/// `RUST_LOG` wins when set; otherwise -v maps to info, -vv to debug, and
/// -vvv and above to trace.
pub fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Loads a definition from disk in the given encoding.
///
/// JSON input is parsed leniently unless the caller asks otherwise; the
/// `validate` command is the place for strictness.
pub fn load_definition(
    path: &Path,
    format: InputFormat,
    mode: ParseMode,
) -> anyhow::Result<ModelDefinition> {
    let registry = StageRegistry::with_builtins();
    let def = match format {
        InputFormat::Json => {
            let source = std::fs::read_to_string(path)?;
            ModelDefinition::from_json_str(&source, mode, &registry)?
        }
        InputFormat::Wire => {
            let bytes = std::fs::read(path)?;
            ModelDefinition::from_wire(&bytes, &registry)?
        }
    };
    Ok(def)
}
