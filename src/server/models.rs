use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::error::{AskError, ErrorKind, RetrievalError};
use crate::graph::context::PartialExpansion;
use crate::graph::edge::GraphEdge;
use crate::graph::node::GraphNode;
use crate::seed::SchemaSpec;

/// Retrieval request body
#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub question: String,
    #[serde(default)]
    pub top_k: Option<usize>,
    #[serde(default)]
    pub max_hops: Option<usize>,
}

/// Retrieved subgraph plus its rendered forms
#[derive(Debug, Serialize)]
pub struct RetrieveResponse {
    pub tables: Vec<String>,
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub schema: String,
    pub relationships: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<PartialExpansion>,
}

/// Seed request body; the built-in schema is used when `schema` is absent
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SeedRequest {
    #[serde(default)]
    pub schema: Option<SchemaSpec>,
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

/// Error returned by API handlers
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub kind: &'static str,
    pub message: String,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "bad_request",
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal",
            message: message.into(),
        }
    }
}

impl From<RetrievalError> for ApiError {
    fn from(e: RetrievalError) -> Self {
        let kind = e.kind();
        Self {
            status: retrieval_status(kind),
            kind: kind.as_str(),
            message: e.to_string(),
        }
    }
}

impl From<AskError> for ApiError {
    fn from(e: AskError) -> Self {
        let (status, kind) = match &e {
            AskError::Retrieval(inner) => (retrieval_status(inner.kind()), inner.kind().as_str()),
            AskError::Generation(_) => (StatusCode::BAD_REQUEST, "sql_generation"),
            AskError::Execution { .. } => (StatusCode::BAD_REQUEST, "sql_execution"),
            AskError::Summary(_) => (StatusCode::BAD_GATEWAY, "summary"),
        };
        Self {
            status,
            kind,
            message: e.to_string(),
        }
    }
}

fn retrieval_status(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::StoreUnavailable | ErrorKind::StoreQuery => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Timeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let body = ErrorBody {
            error: self.message,
            kind: self.kind.to_string(),
        };
        (self.status, Json(body)).into_response()
    }
}
