// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Directory enumeration shared by the tree builder and the search engine.
//!
//! Both apply the same two predicates: files must carry an allowed extension,
//! and directories whose name starts with `.` are skipped with everything
//! below them. Entries come back sorted by name so output is stable.
//!
//! Symlinks are followed. [`Ancestors`] tracks the canonical directories on the
//! current walk path so a link back into one of them is not descended again.

use std::fs;
use std::path::{Path, PathBuf};

/// File suffixes treated as notes (compared case-insensitively, without the dot).
pub const ALLOWED_EXTENSIONS: &[&str] = &["txt", "md", "markdown"];

/// Suffixes rendered as Markdown when viewed.
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// Marker prefix for hidden directories.
pub const HIDDEN_PREFIX: char = '.';

/// True if `name` ends in an allowed note extension.
pub fn is_allowed_file(name: impl AsRef<Path>) -> bool {
    has_extension(name.as_ref(), ALLOWED_EXTENSIONS)
}

/// True if `name` should render as Markdown.
pub fn is_markdown(name: impl AsRef<Path>) -> bool {
    has_extension(name.as_ref(), MARKDOWN_EXTENSIONS)
}

fn has_extension(path: &Path, set: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| set.iter().any(|allowed| ext.eq_ignore_ascii_case(allowed)))
        .unwrap_or(false)
}

pub fn is_hidden_dir(name: &str) -> bool {
    name.starts_with(HIDDEN_PREFIX)
}

/// Join a `/`-separated relative prefix with a child name.
pub fn join_relative(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix, name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Note { size: u64 },
    Directory,
}

/// A directory entry that passed the note filters.
#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Eligible entries of `dir`, sorted by name.
///
/// An unreadable directory yields an empty list. Symlinks are resolved, so a
/// link to a directory is listed as a directory. Broken links are skipped.
pub fn eligible_entries(dir: &Path) -> Vec<Entry> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) => {
            tracing::debug!("Skipping unreadable directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut entries: Vec<Entry> = read_dir
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let path = entry.path();
            let meta = fs::metadata(&path).ok()?;

            if meta.is_dir() {
                return (!is_hidden_dir(&name)).then(|| Entry {
                    name,
                    path,
                    kind: EntryKind::Directory,
                });
            }
            if meta.is_file() && is_allowed_file(&name) {
                return Some(Entry {
                    name,
                    path,
                    kind: EntryKind::Note { size: meta.len() },
                });
            }
            None
        })
        .collect();

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// Canonical paths of the directories on the current walk path.
#[derive(Debug, Default)]
pub struct Ancestors(Vec<PathBuf>);

impl Ancestors {
    /// Push `dir` onto the walk path. Returns false, leaving the path
    /// unchanged, when `dir` cannot be resolved or is already on it.
    pub fn enter(&mut self, dir: &Path) -> bool {
        let canonical = match fs::canonicalize(dir) {
            Ok(canonical) => canonical,
            Err(e) => {
                tracing::debug!("Skipping unresolvable directory {}: {}", dir.display(), e);
                return false;
            }
        };
        if self.0.contains(&canonical) {
            tracing::debug!("Not descending into {}: link cycle", dir.display());
            return false;
        }
        self.0.push(canonical);
        true
    }

    pub fn leave(&mut self) {
        self.0.pop();
    }

    /// Run `f` inside `dir`, or return `None` when it may not be entered.
    pub fn within<T>(&mut self, dir: &Path, f: impl FnOnce(&mut Self) -> T) -> Option<T> {
        if !self.enter(dir) {
            return None;
        }
        let out = f(self);
        self.leave();
        Some(out)
    }
}

/// A note file reached by [`walk_notes`].
#[derive(Debug, Clone)]
pub struct NoteFile {
    pub name: String,
    /// Relative to the walk root, `/`-separated.
    pub relative_path: String,
    pub path: PathBuf,
}

/// Depth-first walk over every note under `root`, in sorted order within each
/// directory. Files and subdirectories are visited in the order they sort.
pub fn walk_notes(root: &Path, visit: &mut dyn FnMut(&NoteFile)) {
    Ancestors::default().within(root, |ancestors| walk_dir(root, "", ancestors, visit));
}

fn walk_dir(dir: &Path, prefix: &str, ancestors: &mut Ancestors, visit: &mut dyn FnMut(&NoteFile)) {
    for entry in eligible_entries(dir) {
        let relative_path = join_relative(prefix, &entry.name);
        match entry.kind {
            EntryKind::Note { .. } => visit(&NoteFile {
                name: entry.name,
                relative_path,
                path: entry.path,
            }),
            EntryKind::Directory => {
                ancestors.within(&entry.path, |ancestors| {
                    walk_dir(&entry.path, &relative_path, ancestors, visit)
                });
            }
        }
    }
}
