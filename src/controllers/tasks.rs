use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;

use super::{require_fields, AppState, JsonBody, Message};
use crate::{
    db::{
        models::{check_story_points, Priority, Task, TaskChangeSet},
        repos::task::{DeleteTask, UpdateTask},
    },
    error::{BoardError, BoardResult},
    ordering::{self, TaskDraft},
};

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<Priority>,
    pub story_points: Option<i32>,
    pub board_id: Option<String>,
    pub column_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<Priority>,
    pub story_points: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct MoveTaskRequest {
    pub column_id: Option<String>,
    pub position: Option<i64>,
}

pub async fn create_task(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateTaskRequest>,
) -> BoardResult<(StatusCode, Json<Task>)> {
    require_fields(&[
        ("title", request.title.as_deref()),
        ("board_id", request.board_id.as_deref()),
        ("column_id", request.column_id.as_deref()),
    ])?;

    let draft = TaskDraft {
        board_id: request.board_id.unwrap_or_default(),
        column_id: request.column_id.unwrap_or_default(),
        title: request.title.unwrap_or_default(),
        description: request.description,
        assignee: request.assignee,
        priority: request.priority.unwrap_or_default(),
        story_points: request.story_points,
    };
    let task = state
        .db
        .run(move |conn| ordering::insert_task(&draft, conn))
        .await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// Replaces every editable field; omitted optional fields are cleared.
pub async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    JsonBody(request): JsonBody<UpdateTaskRequest>,
) -> BoardResult<Json<Message>> {
    require_fields(&[("title", request.title.as_deref())])?;

    let change_set = TaskChangeSet {
        title: request.title.unwrap_or_default(),
        description: request.description,
        assignee: request.assignee,
        priority: request.priority.unwrap_or_default().as_str().to_owned(),
        story_points: check_story_points(request.story_points)?,
        updated_at: Utc::now().naive_utc(),
    };
    let affected = state
        .db
        .run(move |conn| Ok(Task::update(&task_id, change_set, conn)?))
        .await?;
    if affected == 0 {
        return Err(BoardError::task_not_found());
    }

    Ok(Message::new("Task updated successfully"))
}

pub async fn move_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    JsonBody(request): JsonBody<MoveTaskRequest>,
) -> BoardResult<Json<Message>> {
    require_fields(&[("column_id", request.column_id.as_deref())])?;
    let position = request.position.ok_or_else(|| {
        BoardError::Validation(String::from("Missing required fields: position"))
    })?;
    let column_id = request.column_id.unwrap_or_default();

    state
        .db
        .run(move |conn| ordering::move_task(&task_id, &column_id, position, conn))
        .await?;

    Ok(Message::new("Task moved successfully"))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> BoardResult<Json<Message>> {
    let affected = state
        .db
        .run(move |conn| Ok(Task::delete(&task_id, conn)?))
        .await?;
    if affected == 0 {
        return Err(BoardError::task_not_found());
    }

    Ok(Message::new("Task deleted successfully"))
}
