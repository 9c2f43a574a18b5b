// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! RFC 6238 one-time codes, compatible with Google Authenticator and friends.

use rand::RngCore;
use totp_rs::{Algorithm, Secret, TOTP};

/// Digits per code.
pub const TOTP_DIGITS: usize = 6;

/// Seconds per time step.
pub const TOTP_STEP: u64 = 30;

/// Secret length for newly generated secrets: 160 bits, as most apps expect.
const SECRET_BYTES: usize = 20;

/// Normalize a stored base32 secret: drop spaces and padding, uppercase.
fn normalize_secret(secret: &str) -> String {
    secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Build a TOTP for `secret`, or `None` if it is not valid base32.
///
/// `new_unchecked` is used so short legacy secrets (80-bit) still verify.
pub fn build(secret: &str, skew: u8, account: &str, issuer: Option<&str>) -> Option<TOTP> {
    let bytes = Secret::Encoded(normalize_secret(secret)).to_bytes().ok()?;
    if bytes.is_empty() {
        return None;
    }
    Some(TOTP::new_unchecked(
        Algorithm::SHA1,
        TOTP_DIGITS,
        skew,
        TOTP_STEP,
        bytes,
        issuer.map(str::to_string),
        account.to_string(),
    ))
}

/// Verify `code` at `unix_secs`, accepting `skew` steps of drift either way.
pub fn verify(secret: &str, code: &str, skew: u8, unix_secs: u64) -> Option<bool> {
    let totp = build(secret, skew, "", None)?;
    Some(totp.check(code.trim(), unix_secs))
}

/// A fresh random base32 secret.
pub fn generate_secret() -> String {
    let mut bytes = vec![0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    match Secret::Raw(bytes).to_encoded() {
        Secret::Encoded(encoded) => encoded,
        Secret::Raw(_) => unreachable!("to_encoded always returns Secret::Encoded"),
    }
}

/// `otpauth://totp/...` URI for manual entry or QR encoding.
pub fn provisioning_uri(secret: &str, account: &str, issuer: &str) -> Option<String> {
    build(secret, 1, account, Some(issuer)).map(|totp| totp.get_url())
}
