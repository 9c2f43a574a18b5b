// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Signed session cookie.
//!
//! The cookie value is `<session id>.<hex HMAC-SHA256 of the id>`. A value whose
//! signature does not match is treated as no cookie at all.

use axum::http::{header, HeaderMap};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

pub const SESSION_COOKIE: &str = "notebook_session";

type HmacSha256 = Hmac<Sha256>;

#[derive(Clone)]
pub struct CookieSigner {
    key: Vec<u8>,
}

impl std::fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieSigner").field("key", &"<redacted>").finish()
    }
}

impl CookieSigner {
    pub fn new(key: impl Into<Vec<u8>>) -> Self {
        Self { key: key.into() }
    }

    /// Signer for a configured secret, or a random per-process key when none
    /// is set. A random key invalidates all cookies on restart.
    pub fn from_secret(secret: Option<&str>) -> Self {
        match secret {
            Some(secret) if !secret.is_empty() => Self::new(secret.as_bytes()),
            _ => {
                tracing::warn!("SECRET_KEY not set; sessions will not survive a restart");
                let mut key = vec![0u8; 32];
                rand::thread_rng().fill_bytes(&mut key);
                Self::new(key)
            }
        }
    }

    fn mac(&self, session_id: &str) -> Vec<u8> {
        // HMAC accepts keys of any length.
        let mut mac = match HmacSha256::new_from_slice(&self.key) {
            Ok(mac) => mac,
            Err(_) => unreachable!("HMAC accepts any key length"),
        };
        mac.update(session_id.as_bytes());
        mac.finalize().into_bytes().to_vec()
    }

    /// Cookie value for a session id.
    pub fn sign(&self, session_id: &str) -> String {
        format!("{}.{}", session_id, hex::encode(self.mac(session_id)))
    }

    /// Session id carried by a cookie value, if the signature checks out.
    pub fn verify(&self, value: &str) -> Option<String> {
        let (id, signature) = value.rsplit_once('.')?;
        if id.is_empty() {
            return None;
        }
        let provided = hex::decode(signature).ok()?;
        let expected = self.mac(id);
        if bool::from(expected.ct_eq(&provided)) {
            Some(id.to_string())
        } else {
            None
        }
    }

    /// `Set-Cookie` value establishing the session.
    pub fn set_cookie_header(&self, session_id: &str, max_age_secs: u64) -> String {
        format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            SESSION_COOKIE,
            self.sign(session_id),
            max_age_secs
        )
    }

    /// `Set-Cookie` value removing the session cookie.
    pub fn clear_cookie_header() -> String {
        format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE)
    }

    /// Verified session id from request headers.
    pub fn session_id_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(name, _)| *name == SESSION_COOKIE)
            .find_map(|(_, value)| self.verify(value))
    }
}
