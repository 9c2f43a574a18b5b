// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Request handlers.
//!
//! Expected failures (missing file, bad filename, ...) become a flash message
//! and a redirect. Anything else is a [`PageError`].

use askama::Template;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::header;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Extension, Form, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::errors::PageResult;
use super::guard::AuthenticatedUser;
use super::templates::{
    encode_path, EditPage, IndexPage, LoginPage, PageContext, SearchHit, SearchPage, TreeLink,
    ViewerPage,
};
use super::AppState;
use crate::error::NotebookError;
use crate::notes::{flatten, NoteStore, SearchResult, TreeNode};
use crate::render::markdown_to_html;
use crate::security::{CookieSigner, Flash};

const LOGGED_OUT_MESSAGE: &str = "You have been logged out";

/// Where `/logout` sends a browser that had no live session.
const LOGGED_OUT_REDIRECT: &str = "/login?logged_out=1";

// =============================================================================
// Helpers
// =============================================================================

fn render(template: impl Template) -> PageResult<Html<String>> {
    Ok(Html(template.render()?))
}

impl AppState {
    fn page(&self, flashes: Vec<Flash>, user: Option<String>) -> PageContext {
        PageContext {
            app_name: self.config.app_name.clone(),
            app_description: self.config.app_description.clone(),
            flashes,
            user,
        }
    }

    /// Page context for a signed-in user, draining their pending flashes.
    fn page_for(&self, user: &AuthenticatedUser) -> PageContext {
        let flashes = self.sessions.take_flashes(&user.session_id);
        self.page(flashes, Some(user.username.clone()))
    }

    fn flash_redirect(&self, user: &AuthenticatedUser, flash: Flash, to: &str) -> Response {
        self.sessions.push_flash(&user.session_id, flash);
        Redirect::to(to).into_response()
    }

    fn set_cookie(&self, session_id: &str) -> String {
        self.signer
            .set_cookie_header(session_id, self.config.session_timeout_secs)
    }
}

/// Flash text for a failed file operation. User errors carry their own
/// message; system errors are prefixed with what was being attempted.
fn failure_message(err: &NotebookError, action: &str) -> String {
    if err.is_user_error() {
        err.to_string()
    } else {
        format!("Error {} file: {}", action, err)
    }
}

fn view_href(path: &str) -> String {
    format!("/view/{}", encode_path(path))
}

/// Run a note-store operation on the blocking pool.
async fn with_notes<T, F>(state: &Arc<AppState>, op: F) -> PageResult<T>
where
    F: FnOnce(&NoteStore) -> T + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    Ok(tokio::task::spawn_blocking(move || op(&state.notes)).await?)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// =============================================================================
// Login / logout
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    otp: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    logged_out: Option<String>,
}

pub async fn login_page(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Query(query): Query<LoginQuery>,
) -> PageResult<Html<String>> {
    let mut flashes = state
        .signer
        .session_id_from_headers(&headers)
        .map(|id| state.sessions.take_flashes(&id))
        .unwrap_or_default();
    if query.logged_out.is_some() && flashes.is_empty() {
        flashes.push(Flash::info(LOGGED_OUT_MESSAGE));
    }

    render(LoginPage {
        page: state.page(flashes, None),
        username: String::new(),
    })
}

pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
    Form(form): Form<LoginForm>,
) -> PageResult<Response> {
    let username = form.username.trim().to_string();
    let otp = form.otp.trim().to_string();

    if username.is_empty() || form.password.is_empty() || otp.is_empty() {
        return Ok(render(LoginPage {
            page: state.page(vec![Flash::error("All fields are required")], None),
            username,
        })?
        .into_response());
    }

    let verified = {
        let state = Arc::clone(&state);
        let username = username.clone();
        let password = form.password;
        tokio::task::spawn_blocking(move || state.authenticator.login(&username, &password, &otp))
            .await??
    };

    if !verified {
        tracing::warn!("Failed login attempt for user '{}'", username);
        return Ok(render(LoginPage {
            page: state.page(
                vec![Flash::error("Invalid credentials or verification code")],
                None,
            ),
            username,
        })?
        .into_response());
    }

    if let Some(previous) = state.signer.session_id_from_headers(&headers) {
        state.sessions.terminate_session(&previous, "replaced by new login");
    }
    let session_id = state.sessions.create_session(Some(&username));
    tracing::info!("User '{}' logged in", username);

    Ok((
        [(header::SET_COOKIE, state.set_cookie(&session_id))],
        Redirect::to("/"),
    )
        .into_response())
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Response {
    let presented = state.signer.session_id_from_headers(&headers);
    let live = presented
        .clone()
        .filter(|id| state.sessions.clear_identity(id));

    match (live, presented) {
        (Some(id), _) => {
            state.sessions.push_flash(&id, Flash::info(LOGGED_OUT_MESSAGE));
            Redirect::to("/login").into_response()
        }
        // No session to carry the flash; the login page shows it from the query.
        (None, Some(_)) => (
            [(header::SET_COOKIE, CookieSigner::clear_cookie_header())],
            Redirect::to(LOGGED_OUT_REDIRECT),
        )
            .into_response(),
        (None, None) => Redirect::to(LOGGED_OUT_REDIRECT).into_response(),
    }
}

// =============================================================================
// Pages
// =============================================================================

pub async fn index(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> PageResult<Html<String>> {
    let tree = with_notes(&state, NoteStore::tree).await?;
    let rows = flatten(&tree).into_iter().map(TreeLink::from).collect();

    render(IndexPage {
        page: state.page_for(&user),
        rows,
    })
}

pub async fn view_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(path): Path<String>,
) -> PageResult<Response> {
    let note = match with_notes(&state, move |notes| notes.read(&path)).await? {
        Ok(note) => note,
        Err(e) => {
            let flash = Flash::error(failure_message(&e, "reading"));
            return Ok(state.flash_redirect(&user, flash, "/"));
        }
    };

    let html = note.is_markdown.then(|| markdown_to_html(&note.content));
    Ok(render(ViewerPage {
        page: state.page_for(&user),
        href: encode_path(&note.path),
        name: note.name,
        path: note.path,
        html,
        content: note.content,
    })?
    .into_response())
}

pub async fn edit_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(path): Path<String>,
) -> PageResult<Response> {
    let note = match with_notes(&state, move |notes| notes.read(&path)).await? {
        Ok(note) => note,
        Err(e) => {
            let flash = Flash::error(failure_message(&e, "reading"));
            return Ok(state.flash_redirect(&user, flash, "/"));
        }
    };

    Ok(render(EditPage {
        page: state.page_for(&user),
        href: encode_path(&note.path),
        path: note.path,
        filename: note.name,
        directory: String::new(),
        content: note.content,
    })?
    .into_response())
}

#[derive(Debug, Deserialize)]
pub struct SaveForm {
    #[serde(default)]
    content: String,
}

pub async fn save_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(path): Path<String>,
    Form(form): Form<SaveForm>,
) -> PageResult<Response> {
    let saved = {
        let path = path.clone();
        with_notes(&state, move |notes| notes.save(&path, &form.content)).await?
    };

    Ok(match saved {
        Ok(()) => state.flash_redirect(&user, Flash::success("File saved successfully"), &view_href(&path)),
        Err(e @ NotebookError::InvalidPath(_)) => {
            state.flash_redirect(&user, Flash::error(e.to_string()), "/")
        }
        Err(e) => {
            tracing::error!("Failed to save {}: {}", path, e);
            let flash = Flash::error(format!("Error saving file: {}", e));
            state.flash_redirect(&user, flash, &view_href(&path))
        }
    })
}

pub async fn new_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> PageResult<Html<String>> {
    render(EditPage {
        page: state.page_for(&user),
        path: String::new(),
        href: String::new(),
        filename: String::new(),
        directory: String::new(),
        content: String::new(),
    })
}

#[derive(Debug, Deserialize)]
pub struct CreateForm {
    #[serde(default)]
    filename: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    directory: String,
}

pub async fn create_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Form(form): Form<CreateForm>,
) -> PageResult<Response> {
    let created = {
        let (directory, filename, content) =
            (form.directory.clone(), form.filename.clone(), form.content.clone());
        with_notes(&state, move |notes| notes.create(&directory, &filename, &content)).await?
    };

    match created {
        Ok(relative) => Ok(state.flash_redirect(
            &user,
            Flash::success("File created successfully"),
            &view_href(&relative),
        )),
        Err(e) => {
            if !e.is_user_error() {
                tracing::error!("Failed to create {}: {}", form.filename, e);
            }
            state
                .sessions
                .push_flash(&user.session_id, Flash::error(failure_message(&e, "creating")));

            // Back to the editor with the draft intact.
            Ok(render(EditPage {
                page: state.page_for(&user),
                path: String::new(),
                href: String::new(),
                filename: form.filename,
                directory: form.directory,
                content: form.content,
            })?
            .into_response())
        }
    }
}

pub async fn upload_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    mut multipart: Multipart,
) -> PageResult<Response> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut directory = String::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Rejected malformed upload: {}", e);
                let flash = Flash::error(format!("Error uploading file: {}", e));
                return Ok(state.flash_redirect(&user, flash, "/"));
            }
        };

        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                match field.bytes().await {
                    Ok(bytes) => file = Some((filename, bytes.to_vec())),
                    Err(e) => {
                        let flash = Flash::error(format!("Error uploading file: {}", e));
                        return Ok(state.flash_redirect(&user, flash, "/"));
                    }
                }
            }
            Some("directory") => match field.text().await {
                Ok(text) => directory = text,
                Err(e) => {
                    tracing::warn!("Rejected upload with unreadable directory field: {}", e);
                    let flash = Flash::error(format!("Error uploading file: {}", e));
                    return Ok(state.flash_redirect(&user, flash, "/"));
                }
            },
            _ => {}
        }
    }

    let Some((filename, bytes)) = file.filter(|(name, _)| !name.is_empty()) else {
        return Ok(state.flash_redirect(&user, Flash::error("No file selected"), "/"));
    };

    let uploaded = {
        let filename = filename.clone();
        with_notes(&state, move |notes| notes.upload(&directory, &filename, &bytes)).await?
    };
    let flash = match uploaded {
        Ok(_) => Flash::success("File uploaded successfully"),
        Err(NotebookError::MissingFilename) => Flash::error("No file selected"),
        Err(e) => {
            if !e.is_user_error() {
                tracing::error!("Failed to store upload {}: {}", filename, e);
            }
            Flash::error(failure_message(&e, "uploading"))
        }
    };
    Ok(state.flash_redirect(&user, flash, "/"))
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

async fn run_search(state: &Arc<AppState>, query: String) -> PageResult<Vec<SearchResult>> {
    with_notes(state, move |notes| notes.search(&query)).await
}

pub async fn search_page(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Query(query): Query<SearchQuery>,
) -> PageResult<Html<String>> {
    let results = run_search(&state, query.q.clone()).await?;

    render(SearchPage {
        page: state.page_for(&user),
        query: query.q,
        results: results.into_iter().map(SearchHit::from).collect(),
    })
}

pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(path): Path<String>,
) -> PageResult<Response> {
    let deleted = {
        let path = path.clone();
        with_notes(&state, move |notes| notes.delete(&path)).await?
    };
    let flash = match deleted {
        Ok(()) => Flash::success("File deleted successfully"),
        Err(e) => {
            if !e.is_user_error() {
                tracing::error!("Failed to delete {}: {}", path, e);
            }
            Flash::error(failure_message(&e, "deleting"))
        }
    };
    Ok(state.flash_redirect(&user, flash, "/"))
}

// =============================================================================
// JSON API
// =============================================================================

pub async fn api_tree(State(state): State<Arc<AppState>>) -> PageResult<Json<Vec<TreeNode>>> {
    Ok(Json(with_notes(&state, NoteStore::tree).await?))
}

pub async fn api_search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> PageResult<Json<Vec<SearchResult>>> {
    Ok(Json(run_search(&state, query.q).await?))
}
