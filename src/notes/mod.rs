// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Notes on disk: listing, search, and file operations.
//!
//! Only `.txt`, `.md` and `.markdown` files count as notes, and directories
//! starting with `.` are invisible to both the tree and the search.

pub mod search;
pub mod store;
pub mod tree;
pub mod walk;

pub use search::{search, search_with, MatchContext, MatchType, SearchOptions, SearchResult};
pub use store::{secure_filename, Note, NoteStore};
pub use tree::{build_tree, flatten, TreeNode, TreeRow};
pub use walk::{is_allowed_file, is_markdown, ALLOWED_EXTENSIONS};
