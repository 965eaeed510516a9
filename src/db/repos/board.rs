use chrono::Utc;
use diesel::{delete, insert_into, prelude::*, SqliteConnection};

use crate::{
    db::{
        models::{Board, Column, NewBoard, NewColumn},
        repos::column::{CreateColumn, DEFAULT_COLUMNS},
        schema::{boards, columns, tasks},
    },
    error::{BoardError, BoardResult},
};

pub const DEFAULT_BOARD_NAME: &str = "My SCRUM Board";
pub const DEFAULT_BOARD_DESCRIPTION: &str = "Default project board";

pub trait FindBoard {
    fn find(board_id: &str, conn: &mut SqliteConnection) -> QueryResult<Option<Board>>;
}

impl FindBoard for Board {
    fn find(board_id: &str, conn: &mut SqliteConnection) -> QueryResult<Option<Board>> {
        boards::table
            .filter(boards::id.eq(board_id))
            .select(Board::as_select())
            .first(conn)
            .optional()
    }
}

pub trait ListBoards {
    fn list(conn: &mut SqliteConnection) -> QueryResult<Vec<Board>>;
    fn count(conn: &mut SqliteConnection) -> QueryResult<i64>;
}

impl ListBoards for Board {
    /// Newest first.
    fn list(conn: &mut SqliteConnection) -> QueryResult<Vec<Board>> {
        boards::table
            .order((boards::created_at.desc(), boards::id.desc()))
            .select(Board::as_select())
            .load(conn)
    }

    fn count(conn: &mut SqliteConnection) -> QueryResult<i64> {
        boards::table.count().get_result(conn)
    }
}

pub trait CreateBoard {
    fn create(new_board: NewBoard<'_>, conn: &mut SqliteConnection) -> QueryResult<Board>;
}

impl CreateBoard for Board {
    fn create(new_board: NewBoard<'_>, conn: &mut SqliteConnection) -> QueryResult<Board> {
        let board_id = new_board.id.to_owned();
        insert_into(boards::table).values(new_board).execute(conn)?;
        boards::table
            .filter(boards::id.eq(board_id))
            .select(Board::as_select())
            .first(conn)
    }
}

pub trait DeleteBoard {
    fn delete(board_id: &str, conn: &mut SqliteConnection) -> QueryResult<usize>;
}

impl DeleteBoard for Board {
    /// Removes the board and everything under it in one transaction. The
    /// foreign keys cascade as well; the explicit deletes keep the outcome
    /// independent of the connection's `foreign_keys` pragma.
    fn delete(board_id: &str, conn: &mut SqliteConnection) -> QueryResult<usize> {
        conn.transaction(|conn| {
            delete(tasks::table.filter(tasks::board_id.eq(board_id))).execute(conn)?;
            delete(columns::table.filter(columns::board_id.eq(board_id))).execute(conn)?;
            delete(boards::table.filter(boards::id.eq(board_id))).execute(conn)
        })
    }
}

/// Create a board together with the four canonical columns.
pub fn create_with_default_columns(
    name: &str,
    description: Option<&str>,
    conn: &mut SqliteConnection,
) -> BoardResult<(Board, Vec<Column>)> {
    if name.trim().is_empty() {
        return Err(BoardError::Validation(String::from(
            "Missing required fields: name",
        )));
    }

    conn.transaction(|conn| {
        let now = Utc::now().naive_utc();
        let board_id = uuid::Uuid::new_v4().to_string();
        let board = Board::create(
            NewBoard {
                id: &board_id,
                name,
                description,
                created_at: now,
                updated_at: now,
            },
            conn,
        )?;

        let mut created = Vec::with_capacity(DEFAULT_COLUMNS.len());
        for (position, (column_name, color)) in DEFAULT_COLUMNS.into_iter().enumerate() {
            let column_id = uuid::Uuid::new_v4().to_string();
            created.push(Column::create(
                NewColumn {
                    id: &column_id,
                    board_id: &board.id,
                    name: column_name,
                    position: position as i32,
                    color,
                    created_at: now,
                },
                conn,
            )?);
        }

        Ok((board, created))
    })
}

/// First-run seeding: when the store holds no boards, create the default one.
/// Returns the board it created, if any.
pub fn ensure_default_board(conn: &mut SqliteConnection) -> BoardResult<Option<Board>> {
    if Board::count(conn)? > 0 {
        tracing::debug!("boards already exist, skipping default creation");
        return Ok(None);
    }

    let (board, _) =
        create_with_default_columns(DEFAULT_BOARD_NAME, Some(DEFAULT_BOARD_DESCRIPTION), conn)?;
    tracing::info!(board_id = %board.id, "created default board");
    Ok(Some(board))
}
