//! Nested board -> columns -> tasks read model.

use std::collections::HashMap;

use diesel::{Connection, SqliteConnection};
use serde::Serialize;

use crate::{
    db::{
        models::{Board, Column, Task},
        repos::{board::FindBoard, column::ListColumns, task::ListTasks},
    },
    error::{BoardError, BoardResult},
};

#[derive(Debug, Clone, Serialize)]
pub struct BoardAggregate {
    #[serde(flatten)]
    pub board: Board,
    pub columns: Vec<ColumnWithTasks>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnWithTasks {
    #[serde(flatten)]
    pub column: Column,
    pub tasks: Vec<Task>,
}

impl BoardAggregate {
    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|column| column.tasks.len()).sum()
    }
}

/// Nest `tasks` under `columns`, keeping the order of both inputs.
///
/// Tasks pointing at a column that is not in `columns` are dropped and
/// reported with a warning.
pub fn assemble(board: Board, columns: Vec<Column>, tasks: Vec<Task>) -> BoardAggregate {
    let mut nested: Vec<ColumnWithTasks> = columns
        .into_iter()
        .map(|column| ColumnWithTasks {
            column,
            tasks: Vec::new(),
        })
        .collect();

    let slots: HashMap<String, usize> = nested
        .iter()
        .enumerate()
        .map(|(slot, entry)| (entry.column.id.clone(), slot))
        .collect();

    let mut orphaned = 0usize;
    for task in tasks {
        match slots.get(&task.column_id) {
            Some(&slot) => nested[slot].tasks.push(task),
            None => orphaned += 1,
        }
    }

    if orphaned > 0 {
        tracing::warn!(
            board_id = %board.id,
            orphaned,
            "dropped tasks whose column is not on the board"
        );
    }

    BoardAggregate {
        board,
        columns: nested,
    }
}

pub fn load_board_aggregate(
    board_id: &str,
    conn: &mut SqliteConnection,
) -> BoardResult<BoardAggregate> {
    // One read transaction so the three queries see the same snapshot.
    conn.transaction(|conn| {
        let board = Board::find(board_id, conn)?.ok_or_else(BoardError::board_not_found)?;
        let columns = Column::list_for_board(board_id, conn)?;
        let tasks = Task::list_for_board(board_id, conn)?;
        Ok(assemble(board, columns, tasks))
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn at(second: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(9, 0, second)
            .unwrap()
    }

    fn board() -> Board {
        Board {
            id: "b1".into(),
            name: "Sprint".into(),
            description: None,
            created_at: at(0),
            updated_at: at(0),
        }
    }

    fn column(id: &str, position: i32) -> Column {
        Column {
            id: id.into(),
            board_id: "b1".into(),
            name: id.to_uppercase(),
            position,
            color: "#ffffff".into(),
            created_at: at(0),
        }
    }

    fn task(id: &str, column_id: &str, position: i32) -> Task {
        Task {
            id: id.into(),
            board_id: "b1".into(),
            column_id: column_id.into(),
            title: id.into(),
            description: None,
            assignee: None,
            priority: "medium".into(),
            story_points: None,
            position,
            created_at: at(position as u32),
            updated_at: at(position as u32),
        }
    }

    #[test]
    fn tasks_nest_under_their_columns_in_order() {
        let aggregate = assemble(
            board(),
            vec![column("todo", 0), column("done", 1)],
            vec![
                task("t1", "todo", 0),
                task("t2", "done", 0),
                task("t3", "todo", 1),
            ],
        );

        let ids: Vec<Vec<&str>> = aggregate
            .columns
            .iter()
            .map(|c| c.tasks.iter().map(|t| t.id.as_str()).collect())
            .collect();
        assert_eq!(ids, vec![vec!["t1", "t3"], vec!["t2"]]);
        assert_eq!(aggregate.task_count(), 3);
    }

    #[test]
    fn orphaned_tasks_are_dropped() {
        let aggregate = assemble(
            board(),
            vec![column("todo", 0)],
            vec![task("t1", "todo", 0), task("ghost", "gone", 1)],
        );

        assert_eq!(aggregate.task_count(), 1);
        assert_eq!(aggregate.columns[0].tasks[0].id, "t1");
    }

    #[test]
    fn aggregate_serializes_flat_rows_with_children() {
        let aggregate = assemble(board(), vec![column("todo", 0)], vec![task("t1", "todo", 0)]);
        let json = serde_json::to_value(&aggregate).unwrap();

        assert_eq!(json["id"], "b1");
        assert_eq!(json["name"], "Sprint");
        assert_eq!(json["columns"][0]["id"], "todo");
        assert_eq!(json["columns"][0]["tasks"][0]["column_id"], "todo");
    }
}
