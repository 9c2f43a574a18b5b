// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Password + one-time-code verification.
//!
//! Unknown users fail both checks with a plain `false` so the caller can only
//! report a generic "invalid credentials". Each check reads the credential
//! store afresh.

use std::time::{SystemTime, UNIX_EPOCH};

use super::store::CredentialStore;
use super::totp;
use crate::config::DEFAULT_TOTP_WINDOW;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Authenticator {
    store: CredentialStore,
    /// Accepted drift in TOTP steps on either side of the current one.
    totp_window: u8,
}

impl Authenticator {
    pub fn new(store: CredentialStore) -> Self {
        Self {
            store,
            totp_window: DEFAULT_TOTP_WINDOW,
        }
    }

    pub fn with_totp_window(mut self, window: u8) -> Self {
        self.totp_window = window;
        self
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// True iff `username` exists and `password` matches its bcrypt hash.
    pub fn check_password(&self, username: &str, password: &str) -> Result<bool> {
        let Some(user) = self.store.find_user(username)? else {
            return Ok(false);
        };

        match bcrypt::verify(password, &user.password_hash) {
            Ok(matched) => Ok(matched),
            Err(e) => {
                tracing::warn!("Stored password hash for '{}' is unusable: {}", username, e);
                Ok(false)
            }
        }
    }

    /// True iff `username` exists and `code` is valid for the current time step
    /// (or within the configured drift window).
    pub fn check_totp(&self, username: &str, code: &str) -> Result<bool> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.check_totp_at(username, code, now)
    }

    /// [`check_totp`](Self::check_totp) against an explicit clock.
    pub fn check_totp_at(&self, username: &str, code: &str, unix_secs: u64) -> Result<bool> {
        let Some(user) = self.store.find_user(username)? else {
            return Ok(false);
        };

        match totp::verify(&user.totp_secret, code, self.totp_window, unix_secs) {
            Some(valid) => Ok(valid),
            None => {
                tracing::warn!("Stored TOTP secret for '{}' is not valid base32", username);
                Ok(false)
            }
        }
    }

    /// Both factors must pass. The code is only checked when the password does.
    pub fn login(&self, username: &str, password: &str, code: &str) -> Result<bool> {
        Ok(self.check_password(username, password)? && self.check_totp(username, code)?)
    }
}
