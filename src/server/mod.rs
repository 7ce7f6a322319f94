pub mod handlers;
pub mod models;
pub mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{extract::Extension, http::Method, routing::get, Router};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::agent::AskAgent;
use crate::db::Database;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<AskAgent>,
    /// Graph database written by the seed endpoint
    pub db: Database,
}

/// Build the application router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any);

    Router::new()
        .nest("/api", routes::api_router())
        .route("/health", get(handlers::health_check))
        .layer(Extension(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Run the HTTP server on the specified host and port
pub async fn run_server(host: &str, port: u16, state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

    info!("Server starting on http://{}", addr);

    axum::Server::bind(&addr)
        .serve(app(state).into_make_service())
        .await?;

    Ok(())
}
