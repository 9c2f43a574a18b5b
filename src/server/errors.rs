// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Unexpected failures inside handlers.
//!
//! Details go to the log under a reference code; the user only sees the code.
//! [`PageError`] produces a bare 500 tagged with [`ErrorReference`];
//! [`render_error_page`] turns it into the branded page.

use askama::Template;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use std::sync::Arc;

use super::templates::ErrorPage;
use super::AppState;
use crate::error::generate_reference_code;

/// Error returned from a handler when the request cannot be served at all.
#[derive(Debug)]
pub struct PageError(anyhow::Error);

impl<E> From<E> for PageError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let reference = generate_reference_code();
        tracing::error!(reference = %reference, "Request failed: {:#}", self.0);

        let mut response = (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal error. Reference: {}", reference),
        )
            .into_response();
        response.extensions_mut().insert(ErrorReference(reference));
        response
    }
}

pub type PageResult<T> = std::result::Result<T, PageError>;

/// Reference code of a failed request, attached to the response by [`PageError`].
#[derive(Debug, Clone)]
pub struct ErrorReference(pub String);

/// Replace the body of a [`PageError`] response with the error page.
pub async fn render_error_page(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let Some(ErrorReference(reference)) = response.extensions_mut().remove::<ErrorReference>() else {
        return response;
    };

    let page = ErrorPage {
        app_name: state.config.app_name.clone(),
        reference,
    };
    match page.render() {
        Ok(body) => (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response(),
        Err(e) => {
            tracing::warn!("Failed to render error page: {}", e);
            response
        }
    }
}
