// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Credential store backed by a JSON file.
//!
//! Format: `{"users": [{"username", "password_hash", "totp_secret", "role"}, ...]}`.
//! The file is read on every call; nothing is cached.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{NotebookError, Result};

fn default_role() -> String {
    "admin".to_string()
}

/// One provisioned user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    /// bcrypt hash (`$2b$...`).
    pub password_hash: String,
    /// Base32 TOTP secret.
    pub totp_secret: String,
    #[serde(default = "default_role")]
    pub role: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct UsersDocument {
    #[serde(default)]
    users: Vec<UserRecord>,
}

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all users keyed by username.
    ///
    /// A missing file means "no users configured" and yields an empty map.
    /// Malformed JSON is an error.
    pub fn load_users(&self) -> Result<HashMap<String, UserRecord>> {
        Ok(self
            .read_document()?
            .users
            .into_iter()
            .map(|u| (u.username.clone(), u))
            .collect())
    }

    /// Look up a single user.
    pub fn find_user(&self, username: &str) -> Result<Option<UserRecord>> {
        Ok(self.load_users()?.remove(username))
    }

    /// Insert or replace a record, keeping file order for existing users.
    pub fn upsert_user(&self, record: UserRecord) -> Result<()> {
        let mut document = self.read_document()?;
        match document.users.iter_mut().find(|u| u.username == record.username) {
            Some(existing) => *existing = record,
            None => document.users.push(record),
        }
        self.write_document(&document)
    }

    fn read_document(&self) -> Result<UsersDocument> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("Credential file {} not found, no users configured", self.path.display());
                return Ok(UsersDocument::default());
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&raw).map_err(|source| NotebookError::CredentialParse {
            path: self.path.clone(),
            source,
        })
    }

    fn write_document(&self, document: &UsersDocument) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(document).map_err(io::Error::other)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
