// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Nested listing of the notes directory.

use serde::Serialize;
use std::path::Path;

use super::walk::{eligible_entries, join_relative, Ancestors, EntryKind};

/// One node of the file tree. Recomputed per request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    File {
        name: String,
        path: String,
        size: u64,
    },
    Directory {
        name: String,
        path: String,
        children: Vec<TreeNode>,
    },
}

impl TreeNode {
    pub fn name(&self) -> &str {
        match self {
            TreeNode::File { name, .. } | TreeNode::Directory { name, .. } => name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            TreeNode::File { path, .. } | TreeNode::Directory { path, .. } => path,
        }
    }

    /// Number of files at or below this node.
    pub fn file_count(&self) -> usize {
        match self {
            TreeNode::File { .. } => 1,
            TreeNode::Directory { children, .. } => children.iter().map(TreeNode::file_count).sum(),
        }
    }
}

/// Build the tree rooted at `root`.
///
/// Directory links are followed. A link back to a directory already on the
/// path is listed with no children.
pub fn build_tree(root: &Path) -> Vec<TreeNode> {
    Ancestors::default()
        .within(root, |ancestors| build_subtree(root, "", ancestors))
        .unwrap_or_default()
}

/// Build the tree for `dir`, labelling paths relative to `relative_prefix`.
fn build_subtree(dir: &Path, relative_prefix: &str, ancestors: &mut Ancestors) -> Vec<TreeNode> {
    eligible_entries(dir)
        .into_iter()
        .map(|entry| {
            let path = join_relative(relative_prefix, &entry.name);
            match entry.kind {
                EntryKind::Note { size } => TreeNode::File {
                    name: entry.name,
                    path,
                    size,
                },
                EntryKind::Directory => TreeNode::Directory {
                    children: ancestors
                        .within(&entry.path, |ancestors| build_subtree(&entry.path, &path, ancestors))
                        .unwrap_or_default(),
                    name: entry.name,
                    path,
                },
            }
        })
        .collect()
}

/// A tree node flattened for rendering: one row per node, depth-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeRow {
    pub depth: usize,
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
}

/// Flatten `nodes` in display order.
pub fn flatten(nodes: &[TreeNode]) -> Vec<TreeRow> {
    let mut rows = Vec::new();
    flatten_into(nodes, 0, &mut rows);
    rows
}

fn flatten_into(nodes: &[TreeNode], depth: usize, rows: &mut Vec<TreeRow>) {
    for node in nodes {
        match node {
            TreeNode::File { name, path, size } => rows.push(TreeRow {
                depth,
                name: name.clone(),
                path: path.clone(),
                is_dir: false,
                size: *size,
            }),
            TreeNode::Directory { name, path, children } => {
                rows.push(TreeRow {
                    depth,
                    name: name.clone(),
                    path: path.clone(),
                    is_dir: true,
                    size: 0,
                });
                flatten_into(children, depth + 1, rows);
            }
        }
    }
}
