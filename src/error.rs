// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Error types for notebook operations.
//!
//! Library code returns [`NotebookError`]. The variants map one-to-one onto the
//! conditions a user can see (not found, cannot decode, already exists, ...);
//! anything else is carried as [`NotebookError::Io`] with the underlying message.

use chrono::Utc;
use rand::Rng;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, NotebookError>;

#[derive(Debug, Error)]
pub enum NotebookError {
    /// Target path does not exist or is not a regular file.
    #[error("File not found")]
    NotFound,

    /// File exists but is not valid UTF-8.
    #[error("Unable to decode file content")]
    Undecodable,

    /// Create refused to overwrite an existing file.
    #[error("File already exists")]
    AlreadyExists,

    #[error("Filename is required")]
    MissingFilename,

    /// Filename sanitized down to nothing.
    #[error("Invalid filename")]
    InvalidFilename,

    #[error("Invalid file type")]
    DisallowedExtension,

    /// Absolute path or `..` component in a user-supplied path.
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Failed to parse credential file {path}: {source}")]
    CredentialParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("{0}")]
    Io(#[from] io::Error),
}

impl NotebookError {
    /// Map an I/O error on a lookup into `NotFound` when appropriate.
    pub fn from_lookup(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            NotebookError::NotFound
        } else {
            NotebookError::Io(err)
        }
    }

    /// True for conditions caused by user input rather than the system.
    pub fn is_user_error(&self) -> bool {
        !matches!(
            self,
            NotebookError::CredentialParse { .. } | NotebookError::Config(_) | NotebookError::Io(_)
        )
    }
}

/// Generate a unique error reference code.
/// Format: ERR-YYYYMMDD-XXXXXX (e.g., ERR-20240115-A3F8K2)
pub fn generate_reference_code() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let date = Utc::now().format("%Y%m%d");
    let mut rng = rand::thread_rng();
    let random: String = (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("ERR-{}-{}", date, random)
}
