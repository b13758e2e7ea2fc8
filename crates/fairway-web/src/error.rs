use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fairway_storage::StorageError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Failed to match flyovers")]
    MatchFailed(#[source] anyhow::Error),
    #[error("Failed to load catalog")]
    Storage(#[from] StorageError),
}

impl ApiError {
    fn message(&self) -> String {
        match self {
            ApiError::MatchFailed(err) => format!("{err:#}"),
            ApiError::Storage(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.message();
        error!(error = %self, %message, "request failed");
        let body = json!({
            "success": false,
            "error": self.to_string(),
            "message": message,
        });
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
