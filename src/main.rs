// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! notebook CLI
//!
//! `notebook` (or `notebook serve`) starts the web server; `notebook add-user`
//! provisions a login.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use notebook::auth::{generate_secret, provisioning_uri, CredentialStore, UserRecord};
use notebook::config::AppConfig;
use notebook::server::Server;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Minimum accepted password length for new users.
const MIN_PASSWORD_LEN: usize = 8;

/// notebook - Personal knowledge base on plain files.
#[derive(Parser)]
#[command(name = "notebook")]
#[command(version = VERSION)]
#[command(about = "Personal knowledge base: browse, search and edit notes in the browser.")]
#[command(long_about = "notebook - Personal knowledge base\n\n\
    Start the server:    notebook\n\
    Add a user:          notebook add-user alice\n\n\
    Configuration is read from the environment and an optional .env file.")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbose mode: debug-level logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (default)
    ///
    /// Examples:
    ///   notebook serve
    ///   notebook serve --host 0.0.0.0 --port 8080
    Serve {
        /// Address to bind to
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
        /// Directory holding the notes
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Credential file
        #[arg(long)]
        users_file: Option<PathBuf>,
    },

    /// Create or replace a user and print their TOTP secret
    ///
    /// Examples:
    ///   notebook add-user alice
    ///   notebook add-user alice --role admin --issuer "My Notes"
    AddUser {
        /// Login name
        username: String,
        /// Password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Role stored with the user
        #[arg(long, default_value = "admin")]
        role: String,
        /// Issuer shown in authenticator apps (defaults to APP_NAME)
        #[arg(long)]
        issuer: Option<String>,
        /// Credential file
        #[arg(long)]
        users_file: Option<PathBuf>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = AppConfig::from_env().context("Failed to load configuration")?;

    match cli.command {
        None => serve(config),
        Some(Commands::Serve { host, port, data_dir, users_file }) => {
            if let Some(host) = host {
                config.host = host;
            }
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(dir) = data_dir {
                config.data_dir = dir;
            }
            if let Some(file) = users_file {
                config.users_file = file;
            }
            serve(config)
        }
        Some(Commands::AddUser { username, password, role, issuer, users_file }) => {
            if let Some(file) = users_file {
                config.users_file = file;
            }
            let issuer = issuer.unwrap_or_else(|| config.app_name.clone());
            add_user(&config, &username, password, &role, &issuer)
        }
    }
}

fn serve(config: AppConfig) -> Result<()> {
    println!(
        "{} {} on {}",
        "notebook".bold().cyan(),
        VERSION.dimmed(),
        format!("http://{}", config.bind_addr()).underline()
    );

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(Server::new(config).start())
}

fn prompt_password() -> Result<String> {
    let password = inquire::Password::new("Password:")
        .with_display_mode(inquire::PasswordDisplayMode::Masked)
        .with_help_message(&format!("At least {} characters", MIN_PASSWORD_LEN))
        .prompt()
        .context("Password prompt cancelled")?;
    Ok(password)
}

fn add_user(
    config: &AppConfig,
    username: &str,
    password: Option<String>,
    role: &str,
    issuer: &str,
) -> Result<()> {
    let username = username.trim();
    if username.is_empty() {
        anyhow::bail!("Username must not be empty");
    }

    let password = match password {
        Some(password) => password,
        None => prompt_password()?,
    };
    if password.chars().count() < MIN_PASSWORD_LEN {
        anyhow::bail!("Password must be at least {} characters", MIN_PASSWORD_LEN);
    }

    let password_hash =
        bcrypt::hash(&password, bcrypt::DEFAULT_COST).context("Failed to hash password")?;
    let secret = generate_secret();
    let uri = provisioning_uri(&secret, username, issuer)
        .context("Failed to build provisioning URI")?;

    let store = CredentialStore::new(&config.users_file);
    store
        .upsert_user(UserRecord {
            username: username.to_string(),
            password_hash,
            totp_secret: secret.clone(),
            role: role.to_string(),
        })
        .with_context(|| format!("Failed to write {}", config.users_file.display()))?;

    tracing::info!("Provisioned user '{}' in {}", username, config.users_file.display());

    println!("{} User '{}' saved to {}", "[✓]".green(), username.bold(), config.users_file.display());
    println!();
    println!("  TOTP secret:  {}", secret.yellow());
    println!("  Setup URI:    {}", uri);
    println!();
    println!("{}", "Add the secret to an authenticator app; it is not shown again.".dimmed());
    Ok(())
}
