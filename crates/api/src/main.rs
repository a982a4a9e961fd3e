use std::net::SocketAddr;
use std::sync::Arc;

use qadash_core::roles::ROLE_ADMIN;
use qadash_db::models::user::CreateUser;
use qadash_db::repositories::{SessionRepo, UserRepo};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use qadash_api::auth::password::hash_password;
use qadash_api::config::{AdminBootstrap, LogFormat, ServerConfig};
use qadash_api::middleware::metrics::init_metrics;
use qadash_api::router::build_app_router;
use qadash_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "qadash_api=debug,qadash_db=info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = qadash_db::create_pool(&database_url, config.db_max_connections)
        .await
        .expect("Failed to connect to database");
    tracing::info!(max_connections = config.db_max_connections, "Database connection pool created");

    qadash_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    let report = qadash_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!(
        previous_marker = report.previous_marker,
        current_marker = report.current_marker,
        applied = report.applied,
        "Database migrations applied"
    );

    // --- Sessions ---
    match SessionRepo::cleanup_expired(&pool).await {
        Ok(removed) => tracing::info!(removed, "Expired sessions cleaned up"),
        Err(e) => tracing::warn!(error = %e, "Failed to clean up expired sessions"),
    }

    // --- Bootstrap administrator ---
    if let Some(admin) = &config.admin {
        bootstrap_admin(&pool, admin).await;
    }

    // --- Metrics ---
    let metrics = init_metrics();

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        metrics,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Graceful shutdown complete");
}

/// Create the configured administrator unless the username is taken.
async fn bootstrap_admin(pool: &qadash_db::DbPool, admin: &AdminBootstrap) {
    let password_hash = hash_password(&admin.password).expect("Failed to hash admin password");
    let input = CreateUser {
        username: admin.username.clone(),
        password_hash,
        role: ROLE_ADMIN.to_string(),
    };
    match UserRepo::create_if_absent(pool, &input).await {
        Ok(Some(user)) => tracing::info!(user_id = user.id, username = %user.username, "Administrator created"),
        Ok(None) => tracing::debug!(username = %admin.username, "Administrator already exists"),
        Err(e) => tracing::error!(error = %e, "Failed to create administrator"),
    }
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
