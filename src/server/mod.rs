// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Web server
//!
//! Serves the notebook UI and a small JSON API. Every route except `/health`,
//! `/login` and `/logout` sits behind the login gate.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `GET|POST /login`, `GET /logout` - Session management
//! - `GET /`, `/view/*path`, `/edit/*path`, `/new`, `/search?q=` - Pages
//! - `POST /save/*path`, `/create`, `/upload`, `/delete/*path` - File operations
//! - `GET /api/tree`, `/api/search?q=` - JSON
//!
//! # Example
//!
//! ```no_run
//! use notebook::config::AppConfig;
//! use notebook::server::Server;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let server = Server::new(AppConfig::from_env()?);
//! server.start().await?;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod guard;
pub mod handlers;
pub mod templates;

use anyhow::Result;
use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{Authenticator, CredentialStore};
use crate::config::AppConfig;
use crate::notes::NoteStore;
use crate::security::{CookieSigner, SessionConfig, SessionManager};

pub use errors::{PageError, PageResult};
pub use guard::{require_login, AuthenticatedUser};

/// Upper bound on how long a request may take.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Server state shared across handlers.
#[derive(Debug)]
pub struct AppState {
    pub config: AppConfig,
    pub authenticator: Authenticator,
    pub notes: NoteStore,
    pub sessions: SessionManager,
    pub signer: CookieSigner,
}

impl AppState {
    /// Wire up every component from one configuration.
    pub fn new(config: AppConfig) -> Self {
        let authenticator = Authenticator::new(CredentialStore::new(&config.users_file))
            .with_totp_window(config.totp_window);
        let notes = NoteStore::new(&config.data_dir);
        let sessions = SessionManager::new(SessionConfig::with_timeout(config.session_timeout_secs));
        let signer = CookieSigner::from_secret(config.secret_key.as_deref());

        Self {
            config,
            authenticator,
            notes,
            sessions,
            signer,
        }
    }
}

/// Build the router over existing state.
pub fn router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/", get(handlers::index))
        .route("/view/*path", get(handlers::view_note))
        .route("/edit/*path", get(handlers::edit_note))
        .route("/save/*path", post(handlers::save_note))
        .route("/new", get(handlers::new_note))
        .route("/create", post(handlers::create_note))
        .route("/upload", post(handlers::upload_note))
        .route("/search", get(handlers::search_page))
        .route("/delete/*path", post(handlers::delete_note))
        .route("/api/tree", get(handlers::api_tree))
        .route("/api/search", get(handlers::api_search))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            guard::require_login,
        ));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/login", get(handlers::login_page).post(handlers::login_submit))
        .route("/logout", get(handlers::logout))
        .merge(protected)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            errors::render_error_page,
        ))
        .layer(DefaultBodyLimit::max(state.config.max_file_size))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Notebook web server.
#[derive(Debug)]
pub struct Server {
    config: AppConfig,
}

impl Server {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Build the router with fresh state.
    pub fn build_router(&self) -> Router {
        router(Arc::new(AppState::new(self.config.clone())))
    }

    /// Start the server with graceful shutdown.
    pub async fn start(&self) -> Result<()> {
        let state = Arc::new(AppState::new(self.config.clone()));
        state.notes.ensure_root()?;

        if !self.config.users_file.exists() {
            tracing::warn!(
                "No credential file at {}; nobody can log in until a user is added with `notebook add-user`",
                self.config.users_file.display()
            );
        }

        let addr = self.config.bind_addr();
        tracing::info!("Starting {} on {}", self.config.app_name, addr);
        tracing::info!("Serving notes from {}", self.config.data_dir.display());

        // Security warning if binding to all interfaces
        if self.config.host == "0.0.0.0" {
            tracing::warn!(
                "Server is binding to 0.0.0.0 which exposes the notebook to the network. \
                Use 127.0.0.1 (default) for local-only access."
            );
        }

        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                anyhow::anyhow!(
                    "Port {} is already in use. Stop the other instance or pick another port with --port <PORT>",
                    self.config.port
                )
            } else {
                anyhow::anyhow!("Failed to bind to {}: {}", addr, e)
            }
        })?;

        axum::serve(listener, router(state))
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

/// Graceful shutdown signal handler.
///
/// Resolves on SIGINT or SIGTERM (Ctrl+C only on non-Unix platforms).
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(term), Ok(int)) => (term, int),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!("Failed to install signal handlers: {}", e);
                    std::future::pending::<()>().await;
                    return;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown...");
            }
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
    }

    tracing::info!("Shutting down server");
}
