// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Application configuration.
//!
//! One [`AppConfig`] is built at startup and handed to every component that
//! needs a path or a tunable. Values come from the process environment, with an
//! optional `.env` file loaded first.

use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{NotebookError, Result};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 5000;

/// Default inactivity timeout for sessions: 24 hours.
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 24 * 60 * 60;

/// Default TOTP drift tolerance, in 30-second steps on either side.
pub const DEFAULT_TOTP_WINDOW: u8 = 1;

/// Default maximum request body (uploads included): 10 MiB.
pub const DEFAULT_MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Shown in page titles and used as the TOTP issuer.
    pub app_name: String,
    pub app_description: String,
    /// Address to bind to (defaults to 127.0.0.1 for security).
    pub host: String,
    pub port: u16,
    /// Key for signing session cookies. `None` means a random key per process.
    pub secret_key: Option<String>,
    /// Root directory holding the notes.
    pub data_dir: PathBuf,
    /// JSON credential file.
    pub users_file: PathBuf,
    pub session_timeout_secs: u64,
    pub totp_window: u8,
    pub max_file_size: usize,
}

impl AppConfig {
    /// Configuration rooted at `root`: notes in `root/data`, users in
    /// `root/config/users.json`, everything else at defaults.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            app_name: "P_Web_NoteBook".to_string(),
            app_description: "Personal Knowledge Base".to_string(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            secret_key: None,
            data_dir: root.join("data"),
            users_file: root.join("config").join("users.json"),
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
            totp_window: DEFAULT_TOTP_WINDOW,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }

    /// Load from the environment, reading `.env` from the working directory if present.
    pub fn from_env() -> Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
        }

        let root = match env::var("NOTEBOOK_ROOT") {
            Ok(root) => PathBuf::from(root),
            Err(_) => env::current_dir()?,
        };

        let mut config = Self::with_root(root);

        if let Ok(name) = env::var("APP_NAME") {
            config.app_name = name;
        }
        if let Ok(description) = env::var("APP_DESCRIPTION") {
            config.app_description = description;
        }
        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var("PORT")? {
            config.port = port;
        }
        config.secret_key = env::var("SECRET_KEY").ok().filter(|k| !k.is_empty());
        if let Ok(dir) = env::var("DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(file) = env::var("USERS_FILE") {
            config.users_file = PathBuf::from(file);
        }
        if let Some(timeout) = parse_var("SESSION_TIMEOUT_SECS")? {
            config.session_timeout_secs = timeout;
        }
        if let Some(window) = parse_var("TOTP_WINDOW")? {
            config.totp_window = window;
        }
        if let Some(size) = parse_var("MAX_FILE_SIZE")? {
            config.max_file_size = size;
        }

        Ok(config)
    }

    /// `host:port` string for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| NotebookError::Config(format!("{} has invalid value '{}'", name, raw))),
        Err(_) => Ok(None),
    }
}
