//! # skillswap-server
//!
//! HTTP + websocket server for the SkillSwap marketplace.
//!
//! This binary provides:
//! - **REST API** (axum) for auth, profiles, the skill catalog, exchange
//!   lifecycle, ledger history, and notifications
//! - **Websocket realtime channel** pushing notifications to per-user rooms
//!   and chat/status events to per-exchange rooms
//! - **SQLite persistence** through a single `Database` handle; every unit
//!   of work runs serialized behind one async mutex
//! - **Per-IP rate limiting** to protect against abuse

mod api;
mod auth;
mod config;
mod error;
mod rate_limit;
mod realtime;

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use tokio::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use skillswap_engine::{ExchangeEngine, Notifier};
use skillswap_store::Database;

use crate::api::AppState;
use crate::auth::AuthKeys;
use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;
use crate::realtime::Dispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,skillswap_server=debug")),
        )
        .init();

    info!("Starting SkillSwap server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        instance = %config.instance_name,
        addr = %config.http_addr,
        db = %config.db_path.display(),
        token_ttl_days = config.token_ttl_days,
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------

    // Storage (runs migrations on open).
    let db = Arc::new(Mutex::new(Database::open_at(&config.db_path)?));

    // Token key material.
    let signing_key = match config.token_signing_key {
        Some(bytes) => SigningKey::from_bytes(&bytes),
        None => {
            warn!("TOKEN_SIGNING_KEY not set; using an ephemeral key, tokens expire on restart");
            SigningKey::generate(&mut OsRng)
        }
    };
    let keys = Arc::new(AuthKeys::new(signing_key, config.token_ttl_days));

    // Realtime room registry; also the engine's event sink.
    let dispatcher = Dispatcher::new();
    let notifier = Notifier::new(Arc::new(dispatcher.clone()));

    // The exchange engine owns the storage handle.
    let engine = Arc::new(ExchangeEngine::new(db.clone(), notifier));

    let rate_limiter = RateLimiter::new(config.rate_limit_per_sec, config.rate_limit_burst);

    let app_state = AppState {
        db,
        engine,
        dispatcher,
        keys,
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes, evict buckets idle >10 min).
    let limiter = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            limiter.purge_stale(600.0).await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP server (blocks until shutdown)
    // -----------------------------------------------------------------------
    let app = api::build_router(app_state, rate_limiter);
    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    info!(addr = %config.http_addr, "HTTP API server listening");

    tokio::select! {
        result = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
        ) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e.into());
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
