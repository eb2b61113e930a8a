//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::middleware::{self, AllowedOrigins};
use super::routes::{self, AppState, health};
use crate::core::CoreApp;
use crate::core::constants::MAX_INGEST_BODY_BYTES;
use crate::data::SpanRepository;

pub struct ApiServer {
    app: CoreApp,
    allowed_origins: AllowedOrigins,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        let allowed_origins = AllowedOrigins::new(&app.config.server.host, app.config.server.port);
        Self {
            app,
            allowed_origins,
        }
    }

    /// Serve until shutdown is triggered. Returns CoreApp for graceful shutdown.
    pub async fn start(self) -> Result<CoreApp> {
        let Self {
            app,
            allowed_origins,
        } = self;

        let shutdown = app.shutdown.clone();
        let addr = SocketAddr::new(
            app.config
                .server
                .host
                .parse()
                .with_context(|| format!("Invalid server host: {}", app.config.server.host))?,
            app.config.server.port,
        );

        let repo: Arc<dyn SpanRepository> = Arc::new(Arc::clone(&app.store));
        let state = AppState {
            repo,
            ingestor: app.ingestor.clone(),
        };
        let router = build_router(state, &allowed_origins);

        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        tracing::info!(address = %addr, "Span store API listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        Ok(app)
    }
}

/// Full router: `/health`, `/api/v1/*`, 404 fallback, tracing and CORS
pub fn build_router(state: AppState, allowed_origins: &AllowedOrigins) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1", routes::routes(state))
        .fallback(middleware::handle_404)
        .layer(DefaultBodyLimit::max(MAX_INGEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors(allowed_origins))
}
