// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory accounting for diagnostics.
//!
//! A built definition reports its footprint two ways: a single
//! `ram_bytes()` total, and a [`MemoryNode`] tree breaking the total down
//! into named, sized children (one per owned stage). The tree exists purely
//! for diagnostics and monitoring; inference never consults it.

use std::fmt;

/// A named node in the memory-accounting tree.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MemoryNode {
    /// Diagnostic label (e.g., `"trained_model"`, `"pre_processor_one_hot_encoding"`).
    pub name: String,
    /// Estimated bytes for this node, including its children.
    pub bytes: usize,
    /// Child breakdown; empty for leaf stages.
    pub children: Vec<MemoryNode>,
}

impl MemoryNode {
    /// Creates a leaf node with no children.
    pub fn leaf(name: impl Into<String>, bytes: usize) -> Self {
        Self {
            name: name.into(),
            bytes,
            children: Vec::new(),
        }
    }

    /// Creates an interior node.
    pub fn with_children(name: impl Into<String>, bytes: usize, children: Vec<MemoryNode>) -> Self {
        Self {
            name: name.into(),
            bytes,
            children,
        }
    }

    fn fmt_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(
            f,
            "{:indent$}{} — {}",
            "",
            self.name,
            human_bytes(self.bytes),
            indent = depth * 2,
        )?;
        for child in &self.children {
            child.fmt_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for MemoryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_indented(f, 0)
    }
}

/// Formats a byte count as a human-readable size string.
pub fn human_bytes(bytes: usize) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = 1024.0 * 1024.0;
    const GB: f64 = 1024.0 * 1024.0 * 1024.0;

    let b = bytes as f64;
    if b >= GB {
        format!("{:.1} GB", b / GB)
    } else if b >= MB {
        format!("{:.1} MB", b / MB)
    } else if b >= KB {
        format!("{:.1} KB", b / KB)
    } else {
        format!("{bytes} B")
    }
}

/// Heap bytes held by a string's contents.
pub(crate) fn str_bytes(s: &str) -> usize {
    s.len()
}

/// Estimated bytes for one map entry's bookkeeping, on top of key/value
/// contents. A flat constant keeps the estimate stable across platforms.
pub(crate) const MAP_ENTRY_OVERHEAD: usize = 48;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(100), "100 B");
        assert_eq!(human_bytes(2048), "2.0 KB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.0 MB");
        assert_eq!(human_bytes(1024 * 1024 * 1024), "1.0 GB");
    }

    #[test]
    fn test_display_tree() {
        let tree = MemoryNode::with_children(
            "trained_model_definition",
            4096,
            vec![
                MemoryNode::leaf("trained_model", 3072),
                MemoryNode::leaf("pre_processor_one_hot_encoding", 512),
            ],
        );
        let rendered = tree.to_string();
        assert!(rendered.contains("trained_model_definition — 4.0 KB"));
        assert!(rendered.contains("  trained_model — 3.0 KB"));
        assert!(rendered.contains("  pre_processor_one_hot_encoding — 512 B"));
    }
}
