use axum::{
    body::Bytes,
    extract::{Extension, Json},
    response::IntoResponse,
};
use serde_json::json;
use tracing::{error, info};

use crate::agent::{AskRequest, AskResponse};
use crate::prompt::context_builder::{render_relationships, render_schema};
use crate::seed::{SchemaSeeder, SeedSummary};
use crate::server::models::*;
use crate::server::AppState;

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Answer a question end to end
pub async fn ask(
    Extension(state): Extension<AppState>,
    Json(req): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    if req.question.trim().is_empty() {
        return Err(ApiError::bad_request("question must not be empty"));
    }
    info!("Received ask request: {}", req.question);

    let response = state.agent.answer(&req).await.map_err(|e| {
        error!("Ask failed: {}", e);
        ApiError::from(e)
    })?;
    Ok(Json(response))
}

/// Retrieve and render the schema subgraph for a question
pub async fn retrieve(
    Extension(state): Extension<AppState>,
    Json(req): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, ApiError> {
    info!("Received retrieve request: {}", req.question);

    let options = state.agent.defaults().resolve(req.top_k, req.max_hops);
    let ctx = state
        .agent
        .retriever()
        .retrieve_subgraph(&req.question, &options)
        .await
        .map_err(|e| {
            error!("Retrieval failed: {}", e);
            ApiError::from(e)
        })?;

    Ok(Json(RetrieveResponse {
        tables: ctx.table_names(),
        schema: render_schema(&ctx),
        relationships: render_relationships(&ctx),
        nodes: ctx.nodes().to_vec(),
        edges: ctx.edges().to_vec(),
        partial: ctx.partial().cloned(),
    }))
}

/// Write the schema graph.
///
/// An empty body seeds the built-in schema; any other body must be a valid
/// `SeedRequest`.
pub async fn seed(
    Extension(state): Extension<AppState>,
    body: Bytes,
) -> Result<Json<SeedSummary>, ApiError> {
    let request = if body.iter().all(u8::is_ascii_whitespace) {
        SeedRequest::default()
    } else {
        serde_json::from_slice::<SeedRequest>(&body)
            .map_err(|e| ApiError::bad_request(format!("invalid seed request: {}", e)))?
    };

    let seeder = match request.schema {
        Some(schema) => {
            schema
                .validate()
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            SchemaSeeder::new(schema)
        }
        None => SchemaSeeder::default(),
    };

    let db = state.db.clone();
    let summary = tokio::task::spawn_blocking(move || seeder.seed(&db))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?
        .map_err(|e| {
            error!("Seeding failed: {:#}", e);
            ApiError::internal(format!("{:#}", e))
        })?;
    Ok(Json(summary))
}
