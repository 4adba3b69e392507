// src/main.rs
use axum::{extract::Extension, middleware, routing::get, Json, Router};
use dotenv::dotenv;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::{net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod auth;
mod common;
mod logging_middleware;

use auth::oauth::GoogleOAuth;
use auth::store::SqliteIdentityStore;
use auth::tokens::TokenCodec;
use auth::AuthService;
use common::{AppState, GatewayConfig};

// ============================================================================
// ROUTER COMPOSITION
// ============================================================================

/// Routes and per-request layers, without the transport-level CORS/trace layers
fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(auth::auth_routes())
        .route(
            "/health",
            get(|| async { Json(serde_json::json!({ "status": "ok" })) }),
        )
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(state))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<axum::http::HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = GatewayConfig::from_env()?;
    info!(
        signing_kid = %config.signing_keys.current_kid(),
        access_ttl_minutes = config.access_ttl.num_minutes(),
        refresh_ttl_days = config.refresh_ttl.num_days(),
        "Configuration loaded"
    );

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .acquire_timeout(config.store_timeout)
        .connect_with(connect_options)
        .await?;

    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let store = Arc::new(SqliteIdentityStore::new(pool));
    let exchanger = Arc::new(GoogleOAuth::new(config.provider.clone())?);
    let codec = TokenCodec::new(config.signing_keys.clone());
    let auth_service = Arc::new(AuthService::new(
        codec,
        store,
        exchanger,
        config.session_policy(),
    ));
    info!("AuthService initialized");

    let state = Arc::new(AppState {
        auth: auth_service,
        client_url: config.client_url.clone(),
        cookie_secure: config.cookie_secure,
    });

    let app = app(state)
        .layer(cors_layer(&config.cors_origins))
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
