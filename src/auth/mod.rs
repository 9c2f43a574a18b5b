// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Two-factor authentication: bcrypt password plus TOTP code.
//!
//! ```no_run
//! use notebook::auth::{Authenticator, CredentialStore};
//!
//! let auth = Authenticator::new(CredentialStore::new("config/users.json"));
//! let ok = auth.login("admin", "hello", "123456").unwrap_or(false);
//! ```

pub mod authenticator;
pub mod store;
pub mod totp;

pub use authenticator::Authenticator;
pub use store::{CredentialStore, UserRecord};
pub use totp::{generate_secret, provisioning_uri, TOTP_DIGITS, TOTP_STEP};
