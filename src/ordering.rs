//! Position allocation for tasks within a column.
//!
//! Positions are append-only counters: a new task lands one past the largest
//! position in its column and nothing is ever renumbered. A move overwrites
//! the task's column and position exactly as the client asks, so siblings keep
//! their stored values and gaps or ties are possible. Two clients moving into
//! the same slot at the same time both succeed and the last write wins.

use chrono::Utc;
use diesel::SqliteConnection;

use crate::{
    db::{
        models::{check_story_points, Board, Column, NewTask, Priority, Task},
        repos::{
            board::FindBoard,
            column::FindColumn,
            task::{CreateTask, FindTask, UpdateTask},
        },
    },
    error::{BoardError, BoardResult},
};

/// Validated input for a new task; its position is assigned on insert.
#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub board_id: String,
    pub column_id: String,
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub priority: Priority,
    pub story_points: Option<i32>,
}

/// One past the highest position in the column, or 0 for an empty column.
pub fn next_position(column_id: &str, conn: &mut SqliteConnection) -> BoardResult<i32> {
    let position = match Task::max_position_in_column(column_id, conn)? {
        Some(max) => max.checked_add(1).ok_or_else(|| {
            BoardError::Validation(format!("Column {} has no positions left", column_id))
        })?,
        None => 0,
    };
    Ok(position)
}

/// Convert a client-supplied position into a stored one.
pub fn checked_position(position: i64) -> BoardResult<i32> {
    i32::try_from(position)
        .ok()
        .filter(|position| *position >= 0)
        .ok_or_else(|| {
            BoardError::Validation(format!(
                "position must be a non-negative integer, got {}",
                position
            ))
        })
}

fn ensure_column_on_board(column: &Column, board_id: &str) -> BoardResult<()> {
    if column.board_id != board_id {
        return Err(BoardError::Validation(format!(
            "Column {} does not belong to board {}",
            column.id, board_id
        )));
    }
    Ok(())
}

/// Insert a task at the end of its column.
///
/// Reading the current maximum and inserting happen under one write lock, so
/// concurrent creates in the same column get distinct positions.
pub fn insert_task(draft: &TaskDraft, conn: &mut SqliteConnection) -> BoardResult<Task> {
    let story_points = check_story_points(draft.story_points)?;

    conn.immediate_transaction(|conn| {
        let board = Board::find(&draft.board_id, conn)?.ok_or_else(BoardError::board_not_found)?;
        let column =
            Column::find(&draft.column_id, conn)?.ok_or_else(BoardError::column_not_found)?;
        ensure_column_on_board(&column, &board.id)?;

        let position = next_position(&column.id, conn)?;
        let now = Utc::now().naive_utc();
        let task_id = uuid::Uuid::new_v4().to_string();
        let task = Task::create(
            NewTask {
                id: &task_id,
                board_id: &board.id,
                column_id: &column.id,
                title: &draft.title,
                description: draft.description.as_deref(),
                assignee: draft.assignee.as_deref(),
                priority: draft.priority.as_str(),
                story_points,
                position,
                created_at: now,
                updated_at: now,
            },
            conn,
        )?;

        tracing::debug!(task_id = %task.id, column_id = %column.id, position, "task created");
        Ok(task)
    })
}

/// Put a task into `column_id` at `position`, leaving every other task as is.
pub fn move_task(
    task_id: &str,
    column_id: &str,
    position: i64,
    conn: &mut SqliteConnection,
) -> BoardResult<()> {
    conn.immediate_transaction(|conn| {
        let task = Task::find(task_id, conn)?.ok_or_else(BoardError::task_not_found)?;
        let position = checked_position(position)?;
        let column = Column::find(column_id, conn)?.ok_or_else(|| {
            BoardError::Validation(format!("Target column {} does not exist", column_id))
        })?;
        ensure_column_on_board(&column, &task.board_id)?;

        let affected = Task::relocate(task_id, column_id, position, Utc::now().naive_utc(), conn)?;
        if affected == 0 {
            return Err(BoardError::task_not_found());
        }

        tracing::debug!(
            task_id,
            from_column = %task.column_id,
            to_column = column_id,
            position,
            "task moved"
        );
        Ok(())
    })
}
