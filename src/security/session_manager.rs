// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! In-memory session table.
//!
//! A session carries an optional authenticated identity and the flash messages
//! waiting to be shown. Sessions expire after a period of inactivity; an
//! expired session is dropped the next time it is looked up.
//!
//! ## Audit Events
//!
//! Every state change is logged as a single line:
//! `2024-01-15 10:23:45 UTC | SESSION_AUTHENTICATED | session=sess_1a2b... user=admin`

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Instant;

use super::locks::{resilient_read, resilient_write};
use crate::config::DEFAULT_SESSION_TIMEOUT_SECS;
use crate::utils::mask_sensitive;

/// Characters of a session id that may appear in logs.
const LOGGED_ID_PREFIX: usize = 12;

/// Random bytes per session id.
const SESSION_ID_BYTES: usize = 32;

/// Severity of a flash message; doubles as the CSS class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Error,
    Success,
    Info,
}

impl FlashLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlashLevel::Error => "error",
            FlashLevel::Success => "success",
            FlashLevel::Info => "info",
        }
    }
}

impl std::fmt::Display for FlashLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn new(level: FlashLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Error, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(FlashLevel::Info, message)
    }
}

/// Session events for audit logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionEvent {
    Created {
        session_id: String,
        timestamp: DateTime<Utc>,
    },
    Authenticated {
        session_id: String,
        user_id: String,
        timestamp: DateTime<Utc>,
    },
    LoggedOut {
        session_id: String,
        user_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    Expired {
        session_id: String,
        timestamp: DateTime<Utc>,
        session_duration_secs: u64,
    },
    Terminated {
        session_id: String,
        timestamp: DateTime<Utc>,
        reason: String,
    },
}

impl SessionEvent {
    /// Format event for the audit log. Session ids are masked.
    pub fn to_audit_string(&self) -> String {
        let mask = |id: &str| mask_sensitive(id, LOGGED_ID_PREFIX);
        match self {
            SessionEvent::Created { session_id, timestamp } => {
                format!("{} | SESSION_CREATED | session={}", fmt_ts(timestamp), mask(session_id))
            }
            SessionEvent::Authenticated { session_id, user_id, timestamp } => format!(
                "{} | SESSION_AUTHENTICATED | session={} user={}",
                fmt_ts(timestamp),
                mask(session_id),
                user_id
            ),
            SessionEvent::LoggedOut { session_id, user_id, timestamp } => format!(
                "{} | SESSION_LOGGED_OUT | session={} user={}",
                fmt_ts(timestamp),
                mask(session_id),
                user_id.as_deref().unwrap_or("-")
            ),
            SessionEvent::Expired { session_id, timestamp, session_duration_secs } => format!(
                "{} | SESSION_EXPIRED | session={} duration={}s",
                fmt_ts(timestamp),
                mask(session_id),
                session_duration_secs
            ),
            SessionEvent::Terminated { session_id, timestamp, reason } => format!(
                "{} | SESSION_TERMINATED | session={} reason={}",
                fmt_ts(timestamp),
                mask(session_id),
                reason
            ),
        }
    }
}

fn fmt_ts(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inactivity timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
        }
    }
}

impl SessionConfig {
    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    /// Username once login succeeded; cleared on logout.
    pub identity: Option<String>,
    pub created_at: Instant,
    pub created_at_utc: DateTime<Utc>,
    pub last_activity: Instant,
    flashes: Vec<Flash>,
    timeout_secs: u64,
}

impl Session {
    pub fn new(id: impl Into<String>, identity: Option<String>, config: &SessionConfig) -> Self {
        let now = Instant::now();
        Self {
            id: id.into(),
            identity,
            created_at: now,
            created_at_utc: Utc::now(),
            last_activity: now,
            flashes: Vec::new(),
            timeout_secs: config.timeout_secs,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    pub fn is_expired(&self) -> bool {
        self.last_activity.elapsed().as_secs() >= self.timeout_secs
    }

    pub fn time_remaining_secs(&self) -> u64 {
        self.timeout_secs.saturating_sub(self.last_activity.elapsed().as_secs())
    }

    pub fn session_duration_secs(&self) -> u64 {
        self.created_at.elapsed().as_secs()
    }

    /// Record activity, pushing expiry forward.
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn push_flash(&mut self, flash: Flash) {
        self.flashes.push(flash);
    }

    /// Remove and return pending flashes.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.flashes)
    }
}

/// Session manager for handling multiple sessions
#[derive(Debug)]
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Session>>,
    config: SessionConfig,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn generate_session_id() -> String {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        format!("sess_{}", hex::encode(bytes))
    }

    /// Create a session, optionally already authenticated, and return its id.
    /// Expired sessions are purged first.
    pub fn create_session(&self, identity: Option<&str>) -> String {
        self.cleanup_expired();

        let id = Self::generate_session_id();
        let session = Session::new(id.clone(), identity.map(str::to_string), &self.config);

        let event = SessionEvent::Created {
            session_id: id.clone(),
            timestamp: session.created_at_utc,
        };
        tracing::debug!("{}", event.to_audit_string());

        if let Some(user) = identity {
            let event = SessionEvent::Authenticated {
                session_id: id.clone(),
                user_id: user.to_string(),
                timestamp: Utc::now(),
            };
            tracing::info!("{}", event.to_audit_string());
        }

        resilient_write(&self.sessions).insert(id.clone(), session);
        id
    }

    /// Run `f` on a live session, refreshing its activity. Expired sessions
    /// are removed and `None` is returned.
    fn with_live_session<R>(&self, session_id: &str, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut sessions = resilient_write(&self.sessions);
        let session = sessions.get_mut(session_id)?;

        if session.is_expired() {
            let event = SessionEvent::Expired {
                session_id: session_id.to_string(),
                timestamp: Utc::now(),
                session_duration_secs: session.session_duration_secs(),
            };
            tracing::info!("{}", event.to_audit_string());
            sessions.remove(session_id);
            return None;
        }

        session.touch();
        Some(f(session))
    }

    /// The authenticated username of a live session, if any.
    pub fn authenticated_user(&self, session_id: &str) -> Option<String> {
        self.with_live_session(session_id, |s| s.identity.clone()).flatten()
    }

    /// True if the session exists and has not expired.
    pub fn is_live(&self, session_id: &str) -> bool {
        self.with_live_session(session_id, |_| ()).is_some()
    }

    /// Clear the identity of a session. Returns false when the session is
    /// unknown or expired; clearing an anonymous session is a no-op.
    pub fn clear_identity(&self, session_id: &str) -> bool {
        self.with_live_session(session_id, |s| {
            let previous = s.identity.take();
            let event = SessionEvent::LoggedOut {
                session_id: s.id.clone(),
                user_id: previous,
                timestamp: Utc::now(),
            };
            tracing::info!("{}", event.to_audit_string());
        })
        .is_some()
    }

    /// Queue a flash message. Returns false when the session is gone.
    pub fn push_flash(&self, session_id: &str, flash: Flash) -> bool {
        self.with_live_session(session_id, |s| s.push_flash(flash)).is_some()
    }

    /// Drain pending flash messages.
    pub fn take_flashes(&self, session_id: &str) -> Vec<Flash> {
        self.with_live_session(session_id, Session::take_flashes)
            .unwrap_or_default()
    }

    /// Remove a session outright.
    pub fn terminate_session(&self, session_id: &str, reason: &str) -> bool {
        let removed = resilient_write(&self.sessions).remove(session_id).is_some();
        if removed {
            let event = SessionEvent::Terminated {
                session_id: session_id.to_string(),
                timestamp: Utc::now(),
                reason: reason.to_string(),
            };
            tracing::info!("{}", event.to_audit_string());
        }
        removed
    }

    /// Remove expired sessions from the manager
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = resilient_write(&self.sessions);
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!("Purged {} expired session(s)", removed);
        }
        removed
    }

    pub fn active_session_count(&self) -> usize {
        resilient_read(&self.sessions)
            .values()
            .filter(|s| !s.is_expired())
            .count()
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
