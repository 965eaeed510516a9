use diesel::{insert_into, prelude::*, SqliteConnection};

use crate::db::{
    models::{Column, NewColumn},
    schema::columns,
};

/// Canonical lanes of a new board, left to right, with their colors.
pub const DEFAULT_COLUMNS: [(&str, &str); 4] = [
    ("To Do", "#ffebee"),
    ("In Progress", "#fff3e0"),
    ("Review", "#f3e5f5"),
    ("Done", "#e8f5e8"),
];

/// Color given to imported columns that do not declare one.
pub const FALLBACK_COLUMN_COLOR: &str = "#f0f0f0";

pub trait CreateColumn {
    fn create(new_column: NewColumn<'_>, conn: &mut SqliteConnection) -> QueryResult<Column>;
}

impl CreateColumn for Column {
    fn create(new_column: NewColumn<'_>, conn: &mut SqliteConnection) -> QueryResult<Column> {
        let column_id = new_column.id.to_owned();
        insert_into(columns::table).values(new_column).execute(conn)?;
        columns::table
            .filter(columns::id.eq(column_id))
            .select(Column::as_select())
            .first(conn)
    }
}

pub trait FindColumn {
    fn find(column_id: &str, conn: &mut SqliteConnection) -> QueryResult<Option<Column>>;
}

impl FindColumn for Column {
    fn find(column_id: &str, conn: &mut SqliteConnection) -> QueryResult<Option<Column>> {
        columns::table
            .filter(columns::id.eq(column_id))
            .select(Column::as_select())
            .first(conn)
            .optional()
    }
}

pub trait ListColumns {
    fn list_for_board(board_id: &str, conn: &mut SqliteConnection) -> QueryResult<Vec<Column>>;
}

impl ListColumns for Column {
    /// Left-to-right display order.
    fn list_for_board(board_id: &str, conn: &mut SqliteConnection) -> QueryResult<Vec<Column>> {
        columns::table
            .filter(columns::board_id.eq(board_id))
            .order((
                columns::position.asc(),
                columns::created_at.asc(),
                columns::id.asc(),
            ))
            .select(Column::as_select())
            .load(conn)
    }
}
