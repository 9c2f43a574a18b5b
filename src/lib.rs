// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! notebook - Personal knowledge base on plain files
//!
//! Notes are `.txt`, `.md` and `.markdown` files under one directory. A small
//! web UI lists, searches, views and edits them behind a password plus
//! one-time-code login.
//!
//! # Core Modules
//!
//! - [`auth`] - Credential store and password/TOTP verification
//! - [`notes`] - File tree, search and note file operations
//! - [`security`] - Session table and signed session cookies
//! - [`server`] - HTTP routes, login gate and pages
//! - [`config`] - Runtime configuration from the environment
//! - [`error`] - Error type shared by the library

pub mod auth;
pub mod config;
pub mod error;
pub mod notes;
pub mod render;
pub mod security;
pub mod server;
pub mod utils;

pub use auth::{Authenticator, CredentialStore, UserRecord};
pub use config::AppConfig;
pub use error::{NotebookError, Result};
pub use notes::{build_tree, search, MatchType, Note, NoteStore, SearchResult, TreeNode};
pub use security::{CookieSigner, Flash, FlashLevel, SessionManager};
pub use server::{router, AppState, Server};
