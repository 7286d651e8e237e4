//! HTTP surface: axum router, bearer-token auth and the JSON envelope
//! handlers over the person/relationship/branch/event stores and the
//! tree engine.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Db;
use crate::error::{KintreeError, Result};

pub mod auth;
pub mod handlers;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Db>,
    pub config: Config,
}

/// HTTP server wrapper
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    pub fn new(db: Db, config: Config) -> Self {
        Self {
            state: AppState {
                db: Arc::new(db),
                config,
            },
        }
    }

    /// Run the HTTP server
    pub async fn run(&self) -> Result<()> {
        let app = create_router(self.state.clone());

        let addr = format!(
            "{}:{}",
            self.state.config.http_server.bind_address, self.state.config.http_server.port
        );
        log::info!("Starting kintree HTTP server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
            let msg = if e.kind() == std::io::ErrorKind::AddrInUse {
                format!(
                    "Port {} is already in use. Stop the other process or set http_server.port in config.toml.",
                    self.state.config.http_server.port
                )
            } else {
                format!("Failed to bind to {}: {}", addr, e)
            };
            KintreeError::Io(std::io::Error::new(std::io::ErrorKind::AddrInUse, msg))
        })?;

        axum::serve(listener, app).await.map_err(|e| {
            KintreeError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("HTTP server error: {}", e),
            ))
        })?;

        Ok(())
    }
}

/// Create the axum router
pub fn create_router(state: AppState) -> Router {
    // No configured origins means local dev: allow all. Otherwise restrict
    // to the configured list so preflight matches enforcement.
    let allowed_origins = &state.config.http_server.allowed_origins;
    let cors = if allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<axum::http::HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/persons",
            post(handlers::create_person).get(handlers::list_persons),
        )
        .route(
            "/persons/:id",
            get(handlers::get_person)
                .patch(handlers::update_person)
                .delete(handlers::delete_person),
        )
        .route("/persons/:id/tree", get(handlers::get_tree))
        .route("/persons/:id/ancestors", get(handlers::get_ancestors))
        .route("/persons/:id/descendants", get(handlers::get_descendants))
        .route(
            "/persons/:id/relationships",
            get(handlers::get_person_relationships),
        )
        .route("/persons/:id/events", get(handlers::get_person_events))
        .route("/persons/:id/media", get(handlers::get_person_media))
        .route("/relationships", post(handlers::create_relationship))
        .route(
            "/relationships/:id",
            get(handlers::get_relationship).delete(handlers::delete_relationship),
        )
        .route("/events", post(handlers::create_event))
        .route("/events/:id", get(handlers::get_event))
        .route("/branches", post(handlers::create_branch))
        .route("/branches/:id", get(handlers::get_branch))
        .route("/branches/:id/members", post(handlers::add_branch_member))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors))
        .with_state(state)
}
