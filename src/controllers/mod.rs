pub mod boards;
pub mod tasks;

use std::any::Any;

use axum::{
    extract::FromRequest,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::{db::Database, error::BoardError};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

/// JSON body whose rejections surface as validation errors.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(BoardError))]
pub struct JsonBody<T>(pub T);

/// Confirmation returned by mutations that have nothing else to report.
#[derive(Debug, Serialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Json<Message> {
        Json(Message {
            message: message.into(),
        })
    }
}

/// Reject the request naming every required field that is absent or blank.
pub(crate) fn require_fields<'a>(fields: &[(&'a str, Option<&str>)]) -> Result<(), BoardError> {
    let missing: Vec<&'a str> = fields
        .iter()
        .filter(|(_, value)| value.map_or(true, |value| value.trim().is_empty()))
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(BoardError::Validation(format!(
            "Missing required fields: {}",
            missing.join(", ")
        )))
    }
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else {
        String::from("unknown panic payload")
    };
    tracing::error!(%detail, "request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

pub fn router(db: Database) -> Router {
    let api = Router::new()
        .route("/health", get(health))
        .route("/boards", get(boards::list_boards).post(boards::create_board))
        .route("/boards/import", post(boards::import_board))
        .route(
            "/boards/:id",
            get(boards::get_board).delete(boards::delete_board),
        )
        .route("/boards/:id/backup", get(boards::backup_board))
        .route("/tasks", post(tasks::create_task))
        .route(
            "/tasks/:id",
            put(tasks::update_task).delete(tasks::delete_task),
        )
        .route("/tasks/:id/move", put(tasks::move_task));

    Router::new()
        .nest("/api", api)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState { db })
}
