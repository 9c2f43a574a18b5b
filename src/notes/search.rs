// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Case-insensitive substring search over note names and contents.
//!
//! A linear walk, no index. For each note a filename hit wins and the content
//! is not scanned; otherwise the content is scanned line by line and the first
//! matching line (by default) is reported with surrounding context.

use serde::Serialize;
use std::fs;
use std::path::Path;

use super::walk::{walk_notes, NoteFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Filename,
    Content,
}

/// Lines around a content match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchContext {
    /// Surrounding lines joined with `\n`.
    #[serde(rename = "context")]
    pub text: String,
    /// 1-based line number of the matching line.
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub path: String,
    pub name: String,
    pub match_type: MatchType,
    #[serde(flatten)]
    pub context: Option<MatchContext>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Content results reported per file. Later matches are dropped.
    pub max_content_matches: usize,
    /// Lines of context before and after a content match.
    pub context_lines: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_content_matches: 1,
            context_lines: 2,
        }
    }
}

/// Search `root` for `query` with default options.
pub fn search(root: &Path, query: &str) -> Vec<SearchResult> {
    search_with(root, query, SearchOptions::default())
}

/// Search `root` for `query`. A blank query matches nothing.
pub fn search_with(root: &Path, query: &str, options: SearchOptions) -> Vec<SearchResult> {
    let query = query.trim();
    if query.is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();

    let mut results = Vec::new();
    walk_notes(root, &mut |note| search_note(note, &needle, &options, &mut results));

    tracing::debug!("Search for {:?} returned {} result(s)", query, results.len());
    results
}

fn search_note(note: &NoteFile, needle: &str, options: &SearchOptions, results: &mut Vec<SearchResult>) {
    if note.name.to_lowercase().contains(needle) {
        results.push(SearchResult {
            path: note.relative_path.clone(),
            name: note.name.clone(),
            match_type: MatchType::Filename,
            context: None,
        });
        return;
    }

    let content = match fs::read(&note.path) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(_) => {
                tracing::debug!("Skipping undecodable note {}", note.relative_path);
                return;
            }
        },
        Err(e) => {
            tracing::debug!("Skipping unreadable note {}: {}", note.relative_path, e);
            return;
        }
    };

    if !content.to_lowercase().contains(needle) {
        return;
    }

    for context in content_matches(&content, needle, options) {
        results.push(SearchResult {
            path: note.relative_path.clone(),
            name: note.name.clone(),
            match_type: MatchType::Content,
            context: Some(context),
        });
    }
}

/// Matching lines of `content` (needle already lowercased), capped at
/// `options.max_content_matches`.
pub fn content_matches(content: &str, needle: &str, options: &SearchOptions) -> Vec<MatchContext> {
    let lines: Vec<&str> = content.split('\n').collect();

    lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.to_lowercase().contains(needle))
        .take(options.max_content_matches)
        .map(|(i, _)| {
            let start = i.saturating_sub(options.context_lines);
            let end = (i + options.context_lines + 1).min(lines.len());
            MatchContext {
                text: lines[start..end].join("\n"),
                line: i + 1,
            }
        })
        .collect()
}
