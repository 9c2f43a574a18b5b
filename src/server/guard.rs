// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Login gate for the protected routes.

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use std::sync::Arc;

use super::AppState;
use crate::security::CookieSigner;

/// Identity of the signed-in user, placed in request extensions by [`require_login`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub username: String,
    pub session_id: String,
}

/// Let the request through only with a signed cookie naming a live,
/// authenticated session. Everything else is sent to `/login`.
pub async fn require_login(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(session_id) = state.signer.session_id_from_headers(request.headers()) else {
        return Redirect::to("/login").into_response();
    };

    match state.sessions.authenticated_user(&session_id) {
        Some(username) => {
            request
                .extensions_mut()
                .insert(AuthenticatedUser { username, session_id });
            next.run(request).await
        }
        None => {
            tracing::debug!("Rejected {} without an authenticated session", request.uri().path());
            // Stale cookie: drop it so the browser stops presenting it.
            (
                [(header::SET_COOKIE, CookieSigner::clear_cookie_header())],
                Redirect::to("/login"),
            )
                .into_response()
        }
    }
}
