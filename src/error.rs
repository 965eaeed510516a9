use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

pub type BoardResult<T> = Result<T, BoardError>;

#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// A referenced board, column or task does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The request payload is structurally invalid.
    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("storage task failed: {0}")]
    Background(#[from] tokio::task::JoinError),
}

impl BoardError {
    pub fn board_not_found() -> Self {
        BoardError::NotFound(String::from("Board not found"))
    }

    pub fn task_not_found() -> Self {
        BoardError::NotFound(String::from("Task not found"))
    }

    pub fn column_not_found() -> Self {
        BoardError::NotFound(String::from("Column not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            BoardError::NotFound(_) => StatusCode::NOT_FOUND,
            BoardError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for BoardError {
    fn from(rejection: JsonRejection) -> Self {
        BoardError::Validation(rejection.body_text())
    }
}

impl IntoResponse for BoardError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            String::from("Internal server error")
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_http_status() {
        assert_eq!(BoardError::board_not_found().status(), StatusCode::NOT_FOUND);
        assert_eq!(
            BoardError::Validation("bad".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            BoardError::Storage(diesel::result::Error::RollbackTransaction).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn storage_errors_hide_detail_from_clients() {
        let response =
            BoardError::Migration(String::from("table boards already exists")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"], "Internal server error");
    }
}
