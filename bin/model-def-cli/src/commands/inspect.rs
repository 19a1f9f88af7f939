// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `model-def inspect` command: display a definition's stages and memory
//! breakdown.

use crate::InputFormat;
use model_def::{doc_id, human_bytes, ParseMode};
use std::path::PathBuf;

pub fn execute(input: PathBuf, format: InputFormat) -> anyhow::Result<()> {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║           model-def · Definition Inspector           ║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();

    let def = super::load_definition(&input, format, ParseMode::Lenient).map_err(|e| {
        anyhow::anyhow!("failed to load definition from '{}': {e}", input.display())
    })?;

    // ── Summary ────────────────────────────────────────────────
    println!("  File: {}", input.display());
    println!("  Model: {}", def.model().type_name());
    match def.model_id() {
        Some(id) => {
            println!("  Model id: {id}");
            println!("  Storage doc id: {}", doc_id(id));
        }
        None => println!("  Model id: (none)"),
    }
    println!("  Preprocessors: {}", def.preprocessors().len());
    println!();

    // ── Pipeline ───────────────────────────────────────────────
    println!("  {:<4} {:<30} {:>12}", "Idx", "Stage", "Memory");
    println!("  {}", "-".repeat(48));
    for (i, p) in def.preprocessors().iter().enumerate() {
        println!(
            "  {:<4} {:<30} {:>12}",
            i,
            p.type_name(),
            human_bytes(p.ram_bytes()),
        );
    }
    println!(
        "  {:<4} {:<30} {:>12}",
        "*",
        def.model().type_name(),
        human_bytes(def.model().ram_bytes()),
    );
    println!();

    // ── Memory breakdown ───────────────────────────────────────
    println!("  Estimated heap footprint: {}", human_bytes(def.ram_bytes()));
    println!();
    print!("{}", def.memory_tree());

    Ok(())
}
