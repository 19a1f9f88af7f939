// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `model-def convert` command: re-encode a definition between the JSON
//! document encoding (either rendering) and the binary wire encoding.

use crate::{InputFormat, OutputFormat};
use model_def::{ParseMode, RenderParams};
use std::path::PathBuf;

pub fn execute(
    input: PathBuf,
    from: InputFormat,
    output: PathBuf,
    to: OutputFormat,
) -> anyhow::Result<()> {
    let def = super::load_definition(&input, from, ParseMode::Lenient).map_err(|e| {
        anyhow::anyhow!("failed to load definition from '{}': {e}", input.display())
    })?;

    let bytes = match to {
        OutputFormat::ApiJson => def.to_json_string(RenderParams::api())?.into_bytes(),
        OutputFormat::StorageJson => def.to_json_string(RenderParams::storage())?.into_bytes(),
        OutputFormat::Wire => def.to_wire(),
    };
    std::fs::write(&output, &bytes)?;

    tracing::info!(
        "wrote {} bytes ({to:?}) to '{}'",
        bytes.len(),
        output.display(),
    );
    println!("{} → {} ({} bytes)", input.display(), output.display(), bytes.len());
    Ok(())
}
