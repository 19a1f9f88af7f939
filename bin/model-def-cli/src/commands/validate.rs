// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `model-def validate` command: parse a document and report the first
//! problem found, or confirm it is well-formed.

use crate::InputFormat;
use model_def::ParseMode;
use std::path::PathBuf;

pub fn execute(input: PathBuf, format: InputFormat, lenient: bool) -> anyhow::Result<()> {
    let mode = if lenient {
        ParseMode::Lenient
    } else {
        ParseMode::Strict
    };
    tracing::info!("validating '{}' ({mode:?})", input.display());

    match super::load_definition(&input, format, mode) {
        Ok(def) => {
            println!(
                "OK: {} model, {} preprocessor(s), ~{} heap",
                def.model().type_name(),
                def.preprocessors().len(),
                model_def::human_bytes(def.ram_bytes()),
            );
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!("'{}' is invalid: {e}", input.display())),
    }
}
