//! # HTTP Server
//!
//! Main HTTP server combining all endpoint routers behind the access
//! middleware.

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use super::auth_routes::auth_routes;
use super::checklist_routes::checklist_routes;
use super::errors::ApiError;
use super::health_routes::health_routes;
use super::invite_routes::invite_routes;
use super::job_routes::job_routes;
use super::middleware::authorize;
use super::section_routes::section_routes;
use super::state::AppState;
use super::stats_routes::stats_routes;
use super::submission_routes::submission_routes;
use super::user_routes::user_routes;
use crate::config::HttpConfig;

/// HTTP server for the career dashboards
pub struct HttpServer {
    config: HttpConfig,
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        let config = state.config.http.clone();
        let router = build_router(state);
        Self { config, router }
    }

    /// `host:port` the server binds to
    pub fn address(&self) -> String {
        self.config.address()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Serve until Ctrl-C
    pub async fn start(self) -> Result<(), std::io::Error> {
        // Host names resolve here, so `localhost` works as well as an IP
        let listener = TcpListener::bind(self.config.address()).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "careerhub API listening");
        info!("health check: http://{}/health", addr);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("server stopped");
        Ok(())
    }
}

/// Build the combined router with all endpoints
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.http.cors_origins);

    Router::new()
        .merge(health_routes())
        .nest("/api/auth", auth_routes(state.clone()))
        .nest("/api/users", user_routes(state.clone()))
        .nest("/api/invites", invite_routes(state.clone()))
        .nest("/api/sections", section_routes(state.clone()))
        .nest("/api/jobs", job_routes(state.clone()))
        .nest("/api/submissions", submission_routes(state.clone()))
        .nest("/api/checklists", checklist_routes(state.clone()))
        .nest("/api/stats", stats_routes(state.clone()))
        .fallback(|| async { ApiError::NotFound("Route not found".into()) })
        // Outermost last: tracing wraps CORS, which answers preflights
        // before the access check runs.
        .layer(middleware::from_fn_with_state(state, authorize))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        // If no origins configured, use permissive for development
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|s| s.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "cannot listen for Ctrl-C; running until killed");
            std::future::pending::<()>().await;
        }
    }
}
