use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{require_fields, AppState, JsonBody, Message};
use crate::{
    aggregate::{load_board_aggregate, BoardAggregate},
    backup::{self, BackupDocument},
    db::{
        models::{Board, Column},
        repos::board::{create_with_default_columns, DeleteBoard, ListBoards},
    },
    error::{BoardError, BoardResult},
};

#[derive(Debug, Deserialize)]
pub struct CreateBoardRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ColumnSummary {
    pub id: String,
    pub name: String,
    pub position: i32,
    pub color: String,
}

impl From<Column> for ColumnSummary {
    fn from(column: Column) -> Self {
        ColumnSummary {
            id: column.id,
            name: column.name,
            position: column.position,
            color: column.color,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BoardCreated {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnSummary>,
}

impl BoardCreated {
    fn new(board: Board, columns: Vec<Column>) -> Self {
        BoardCreated {
            id: board.id,
            name: board.name,
            description: board.description,
            columns: columns.into_iter().map(ColumnSummary::from).collect(),
        }
    }
}

pub async fn list_boards(State(state): State<AppState>) -> BoardResult<Json<Vec<Board>>> {
    let boards = state.db.run(|conn| Ok(Board::list(conn)?)).await?;
    Ok(Json(boards))
}

pub async fn get_board(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
) -> BoardResult<Json<BoardAggregate>> {
    let aggregate = state
        .db
        .run(move |conn| load_board_aggregate(&board_id, conn))
        .await?;
    Ok(Json(aggregate))
}

pub async fn create_board(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateBoardRequest>,
) -> BoardResult<(StatusCode, Json<BoardCreated>)> {
    require_fields(&[("name", request.name.as_deref())])?;

    let (board, columns) = state
        .db
        .run(move |conn| {
            let name = request.name.unwrap_or_default();
            create_with_default_columns(&name, request.description.as_deref(), conn)
        })
        .await?;

    tracing::info!(board_id = %board.id, name = %board.name, "board created");
    Ok((StatusCode::CREATED, Json(BoardCreated::new(board, columns))))
}

pub async fn delete_board(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
) -> BoardResult<Json<Message>> {
    let deleted_id = board_id.clone();
    let affected = state
        .db
        .run(move |conn| Ok(Board::delete(&board_id, conn)?))
        .await?;
    if affected == 0 {
        return Err(BoardError::board_not_found());
    }

    tracing::info!(board_id = %deleted_id, "board deleted");
    Ok(Message::new("Board deleted successfully"))
}

pub async fn backup_board(
    State(state): State<AppState>,
    Path(board_id): Path<String>,
) -> BoardResult<impl IntoResponse> {
    let aggregate = state
        .db
        .run(move |conn| load_board_aggregate(&board_id, conn))
        .await?;

    let now = Utc::now();
    let document: BackupDocument = backup::export(&aggregate, now);
    let filename = backup::backup_filename(&aggregate.board.name, now.date_naive());
    tracing::info!(
        board_id = %aggregate.board.id,
        tasks = aggregate.task_count(),
        %filename,
        "board backup created"
    );

    Ok((
        [(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )],
        Json(document),
    ))
}

pub async fn import_board(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<Value>,
) -> BoardResult<(StatusCode, Json<BoardCreated>)> {
    let template = backup::parse_import(payload).map_err(|err| {
        tracing::warn!(error = %err, "rejected board import");
        err
    })?;

    let board = state
        .db
        .run(move |conn| backup::import_board(&template, conn))
        .await?;

    Ok((StatusCode::CREATED, Json(BoardCreated::new(board, Vec::new()))))
}
