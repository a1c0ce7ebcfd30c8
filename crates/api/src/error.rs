use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors surfaced to API clients.
///
/// Geolocation failures never appear here: the resolver degrades to the
/// default location silently, so the only client-visible failures are a
/// missing query and an unavailable store.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("query parameter is required")]
    QueryRequired,

    #[error("storage unavailable")]
    Storage(#[from] sqlx::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::QueryRequired => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),

            Self::Storage(e) => {
                error!(error = %e, "Storage query failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "storage unavailable",
                        "details": e.to_string(),
                    })),
                )
                    .into_response()
            }
        }
    }
}
