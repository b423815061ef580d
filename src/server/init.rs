//! Server initialization
//!
//! Opens the customer store, optionally seeds demo data, assembles the router
//! and serves until Ctrl+C or SIGTERM.

use super::config::AppConfig;
use crate::api::{api_router, health_routes, ApiState};
use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use callwise_store::{CustomerStore, SeedOutcome};
use std::net::SocketAddr;
use std::path::Path;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Open the configured SQLite database
pub async fn open_store(config: &AppConfig) -> Result<CustomerStore> {
    let path = &config.database.path;
    let store = CustomerStore::open(path, config.database.max_connections)
        .await
        .with_context(|| format!("Failed to open database at {}", path.display()))?;
    info!("SQLite customer store initialized at {}", path.display());
    Ok(store)
}

/// Assemble the HTTP application
///
/// With a static directory the frontend is served as a fallback, otherwise `/`
/// answers with a plain banner.
pub fn build_app(state: ApiState, static_dir: Option<&Path>) -> Router {
    let app = Router::new()
        .merge(health_routes::<ApiState>())
        .merge(api_router())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    match static_dir.filter(|dir| dir.exists()) {
        Some(dir) => {
            info!("Frontend enabled: serving from {}", dir.display());
            let serve_dir = ServeDir::new(dir)
                .append_index_html_on_directories(true)
                .fallback(ServeFile::new(dir.join("index.html")));
            app.fallback_service(serve_dir)
        }
        None => app.route("/", get(|| async { "Callwise call recommendation API" })),
    }
}

/// Run the HTTP server
pub async fn run(config: AppConfig) -> Result<()> {
    info!("Starting Callwise v{}", env!("CARGO_PKG_VERSION"));

    let store = open_store(&config).await?;

    if config.server.seed_on_startup {
        match store
            .seed_demo(&config.seed)
            .await
            .context("Failed to seed demo data")?
        {
            SeedOutcome::Seeded {
                customers,
                call_records,
            } => info!(customers, call_records, "Demo data seeded"),
            SeedOutcome::Skipped { existing } => {
                info!(existing, "Existing customers found, demo seed skipped")
            }
        }
    }

    let state = ApiState::new(store.clone(), config.scoring);
    let app = build_app(state, config.server.static_dir.as_deref());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    store.close().await;
    info!("Callwise shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{self, get as get_request, send};
    use axum::http::StatusCode;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_banner_without_frontend() {
        let app = build_app(test_support::state().await, None);
        let (status, body) = send(app.clone(), get_request("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "Callwise call recommendation API");

        let (status, body) = send(app, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_frontend_fallback() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>Callwise</h1>").unwrap();

        let app = build_app(test_support::state().await, Some(dir.path()));
        let (status, body) = send(app.clone(), get_request("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>Callwise</h1>");

        let (status, body) = send(app, get_request("/api/priority-list")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_open_store_creates_parent_dir() {
        let dir = TempDir::new().unwrap();
        let mut config = crate::server::loader::default_config().unwrap();
        config.database.path = dir.path().join("nested").join("callwise.db");

        let store = open_store(&config).await.unwrap();
        assert_eq!(store.count_customers().await.unwrap(), 0);
        assert!(config.database.path.exists());
        store.close().await;
    }
}
