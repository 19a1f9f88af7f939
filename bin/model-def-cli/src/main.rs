// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # model-def
//!
//! Command-line interface for trained-model definition documents.
//!
//! ## Usage
//! ```bash
//! # Inspect a definition: stages, memory breakdown, identity
//! model-def inspect --input ./model.json
//!
//! # Validate a freshly authored document (strict by default)
//! model-def validate --input ./model.json
//!
//! # Convert between encodings and renderings
//! model-def convert --input ./model.json --output ./model.bin --to wire
//! model-def convert --input ./model.bin --from wire --output ./doc.json --to storage-json
//! ```

mod commands;

use clap::{Parser, Subcommand, ValueEnum};

/// Source encoding of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputFormat {
    /// JSON document encoding.
    Json,
    /// Compact binary wire encoding.
    Wire,
}

/// Target encoding/rendering for `convert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// JSON with the API rendering (memory estimate fields).
    ApiJson,
    /// JSON with the storage rendering (doc type + model id).
    StorageJson,
    /// Compact binary wire encoding.
    Wire,
}

#[derive(Parser)]
#[command(
    name = "model-def",
    about = "Inspect, validate, and convert trained-model definition documents",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Inspect a definition: stages, memory breakdown, and identity.
    Inspect {
        /// Path to the definition file.
        #[arg(short, long)]
        input: std::path::PathBuf,

        /// Encoding of the input file.
        #[arg(short, long, value_enum, default_value_t = InputFormat::Json)]
        format: InputFormat,
    },

    /// Validate a definition document and report the first problem found.
    Validate {
        /// Path to the definition file.
        #[arg(short, long)]
        input: std::path::PathBuf,

        /// Encoding of the input file.
        #[arg(short, long, value_enum, default_value_t = InputFormat::Json)]
        format: InputFormat,

        /// Drop unrecognised document fields instead of rejecting them.
        #[arg(short, long)]
        lenient: bool,
    },

    /// Convert a definition between encodings and renderings.
    Convert {
        /// Path to the input definition file.
        #[arg(short, long)]
        input: std::path::PathBuf,

        /// Encoding of the input file.
        #[arg(long, value_enum, default_value_t = InputFormat::Json)]
        from: InputFormat,

        /// Path to write the converted definition to.
        #[arg(short, long)]
        output: std::path::PathBuf,

        /// Target encoding and rendering.
        #[arg(short, long, value_enum)]
        to: OutputFormat,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Inspect { input, format } => commands::inspect::execute(input, format),
        Commands::Validate {
            input,
            format,
            lenient,
        } => commands::validate::execute(input, format, lenient),
        Commands::Convert {
            input,
            from,
            output,
            to,
        } => commands::convert::execute(input, from, output, to),
    }
}
