//! SpecChem Safety Training Server
//!
//! Serves the learner and admin APIs for the plant safety training
//! program: course delivery, enrollment, progress, quiz grading and
//! analytics.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use specchem_training::{
    auth::{AuthState, SessionCache},
    config::{AppConfig, AuthConfig, DatabaseConfig},
    db::{create_pool, schema},
    router::build_router,
    state::{AppState, Services},
};

/// Initialize tracing/logging.
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,specchem_training=debug,tower_http=debug".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Periodically drop expired sessions from the cache.
fn spawn_session_sweeper(sessions: SessionCache, interval_secs: u64) {
    let period = Duration::from_secs(interval_secs.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let removed = sessions.purge_expired().await;
            if removed > 0 {
                tracing::debug!(removed, "Purged expired sessions");
            }
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if present
    dotenvy::dotenv().ok();

    let app_config = AppConfig::from_env();
    init_tracing(app_config.as_ref().map(|c| c.log_json).unwrap_or(false));

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting SpecChem Training server"
    );

    // Load configuration
    let app_config = app_config.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load app config, using defaults");
        AppConfig::default()
    });

    let db_config = DatabaseConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load database config, using defaults");
        DatabaseConfig::default()
    });

    let auth_config = AuthConfig::from_env().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to load auth config, using defaults");
        AuthConfig::default()
    });

    if auth_config.bypass {
        tracing::warn!("AUTH_BYPASS is enabled; every request runs as the bypass user");
    }

    tracing::info!(
        host = %app_config.host,
        port = app_config.port,
        schema = %app_config.schema,
        debug = app_config.debug,
        "Configuration loaded"
    );

    // Create database connection pool
    let db_pool = create_pool(&db_config, &app_config.schema).await?;

    if app_config.init_schema {
        schema::init(&db_pool, &app_config.schema).await?;
    }

    let auth = AuthState::new(auth_config, db_pool.clone())?;
    spawn_session_sweeper(auth.sessions.clone(), app_config.session_sweep_interval);

    let services = Services::new(db_pool.clone(), auth.sessions.clone());
    let addr: SocketAddr = app_config.bind_address().parse()?;
    let state = AppState::new(db_pool, app_config);

    let app = build_router(state, services, auth);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Server listening");

    // Run the server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
