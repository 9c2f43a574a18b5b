// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Session state and cookie signing.
//!
//! ## Usage
//!
//! ```no_run
//! use notebook::security::{CookieSigner, SessionConfig, SessionManager};
//!
//! let manager = SessionManager::new(SessionConfig::default());
//! let signer = CookieSigner::from_secret(Some("change-me"));
//!
//! let id = manager.create_session(Some("admin"));
//! let header = signer.set_cookie_header(&id, manager.config().timeout_secs);
//! assert!(header.starts_with("notebook_session="));
//! ```

pub mod cookie;
pub mod locks;
pub mod session_manager;

pub use cookie::{CookieSigner, SESSION_COOKIE};
pub use locks::{resilient_read, resilient_write};
pub use session_manager::{Flash, FlashLevel, Session, SessionConfig, SessionEvent, SessionManager};
