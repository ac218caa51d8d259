//! Warden - user management API guarded by signed access tokens

use anyhow::{Context, Result};
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;

use config::{AuthConfig, Config, LoggingConfig};
use warden_api::{AppState, create_router};
use warden_auth::{AccessGate, AuthService, AuthSettings, TokenIssuer, TokenValidator};
use warden_db::{Database, NewUser};

/// Warden - user management API guarded by signed access tokens
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Bind address
    #[arg(long, env = "WARDEN_BIND")]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "WARDEN_PORT")]
    port: Option<u16>,

    /// Token signing secret (overrides auth.jwt_secret)
    #[arg(long, env = "WARDEN_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) = Config::load(&args.config)?;
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(secret) = args.jwt_secret {
        config.auth.jwt_secret = secret;
    }

    init_logging(&config.logging);

    info!("Starting Warden v{}", env!("CARGO_PKG_VERSION"));
    info!("{}", source);

    // Fail fast on an unusable signing secret or bootstrap admin
    config.validate()?;
    let auth_settings = AuthSettings::new(config.auth.jwt_secret.clone(), config.auth.token_ttl_minutes)
        .context("Invalid authentication settings")?;

    // Initialize database
    if let Some(parent) = Path::new(&config.database.path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create database directory {:?}", parent))?;
    }
    let db_url = format!("sqlite:{}?mode=rwc", config.database.path);
    let db = Database::new(&db_url, config.database.max_connections).await?;

    bootstrap_admin(&db, &config.auth).await?;

    // Metrics
    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    // Authentication
    let issuer = TokenIssuer::new(&auth_settings);
    let gate = Arc::new(AccessGate::new(TokenValidator::new(&auth_settings)));
    let auth = Arc::new(AuthService::new(Arc::new(db.clone()), issuer));

    let state = AppState::new(db, auth, gate);

    let app = create_router(state, Some(Arc::new(metrics_handle)))
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.server.bind_address, config.server.port)
        .parse()
        .context("Invalid bind address")?;

    info!("Listening on {}", addr);
    info!("Access tokens expire after {} minutes", auth_settings.token_ttl_minutes());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Create the configured admin account when no users exist yet
async fn bootstrap_admin(db: &Database, auth: &AuthConfig) -> Result<()> {
    let (Some(username), Some(password)) = (&auth.admin_username, &auth.admin_password) else {
        if !db.has_users().await? {
            warn!("No users exist and no bootstrap admin is configured; nobody can log in");
        }
        return Ok(());
    };

    if db.has_users().await? {
        return Ok(());
    }

    info!("Creating bootstrap admin user: {}", username);
    let password_hash = warden_auth::hash_password(password)?;
    db.insert_user(NewUser {
        username: username.clone(),
        email: format!("{}@localhost", username),
        first_name: String::new(),
        last_name: String::new(),
        password_hash,
        is_active: true,
        is_admin: true,
    })
    .await?;

    Ok(())
}

/// Initialize logging
fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    if config.format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Shutdown signal received");
}
