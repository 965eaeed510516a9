//! Portable board backups.
//!
//! A backup carries names, colors, ordering and task fields but no ids, so it
//! works as a template: importing it always yields a brand-new board. Imports
//! run in a single transaction and either create the whole board or nothing.

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use diesel::{Connection, SqliteConnection};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    aggregate::BoardAggregate,
    db::{
        models::{Board, Column, NewBoard, NewColumn, NewTask, Priority, Task},
        repos::{
            board::CreateBoard,
            column::{CreateColumn, FALLBACK_COLUMN_COLOR},
            task::CreateTask,
        },
    },
    error::{BoardError, BoardResult},
    ordering::checked_position,
};

pub const BACKUP_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupDocument {
    pub version: String,
    #[serde(rename = "exportDate")]
    pub export_date: String,
    pub board: BoardTemplate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardTemplate {
    pub name: String,
    pub description: Option<String>,
    pub columns: Vec<ColumnTemplate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnTemplate {
    pub name: String,
    pub position: i32,
    pub color: String,
    pub tasks: Vec<TaskTemplate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskTemplate {
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub priority: Priority,
    pub story_points: Option<i32>,
    pub position: i32,
}

pub fn export(aggregate: &BoardAggregate, exported_at: DateTime<Utc>) -> BackupDocument {
    let columns = aggregate
        .columns
        .iter()
        .map(|entry| ColumnTemplate {
            name: entry.column.name.clone(),
            position: entry.column.position,
            color: entry.column.color.clone(),
            tasks: entry
                .tasks
                .iter()
                .map(|task| TaskTemplate {
                    title: task.title.clone(),
                    description: task.description.clone(),
                    assignee: task.assignee.clone(),
                    priority: task.priority.parse().unwrap_or_default(),
                    story_points: task.story_points,
                    position: task.position,
                })
                .collect(),
        })
        .collect();

    BackupDocument {
        version: BACKUP_VERSION.to_owned(),
        export_date: exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        board: BoardTemplate {
            name: aggregate.board.name.clone(),
            description: aggregate.board.description.clone(),
            columns,
        },
    }
}

/// `<slug>_backup_<YYYY-MM-DD>.json`, where the slug keeps ASCII letters,
/// digits, `-` and `_`, lowercases them and turns everything else into `_`.
pub fn backup_filename(board_name: &str, date: NaiveDate) -> String {
    let slug: String = board_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("{}_backup_{}.json", slug, date.format("%Y-%m-%d"))
}

#[derive(Deserialize)]
struct RawBoard {
    name: String,
    description: Option<String>,
    columns: Vec<RawColumn>,
}

#[derive(Deserialize)]
struct RawColumn {
    name: Option<String>,
    position: Option<i64>,
    color: Option<String>,
    tasks: Option<Vec<RawTask>>,
}

#[derive(Deserialize)]
struct RawTask {
    title: Option<String>,
    description: Option<String>,
    assignee: Option<String>,
    priority: Option<String>,
    story_points: Option<i64>,
    position: Option<i64>,
}

/// Accept either a full backup document or a bare board object.
fn unwrap_envelope(payload: Value) -> Value {
    match payload {
        Value::Object(mut document) if document.get("board").map_or(false, Value::is_object) => {
            match document.get("version").and_then(Value::as_str) {
                Some(BACKUP_VERSION) => {}
                other => tracing::warn!(
                    version = ?other,
                    expected = BACKUP_VERSION,
                    "importing backup with unexpected version"
                ),
            }
            document.remove("board").unwrap_or(Value::Null)
        }
        other => other,
    }
}

fn missing_fields(board: &Value) -> Vec<&'static str> {
    let mut missing = Vec::new();
    let has_name = board
        .get("name")
        .and_then(Value::as_str)
        .map_or(false, |name| !name.trim().is_empty());
    if !has_name {
        missing.push("name");
    }
    if !board.get("columns").map_or(false, Value::is_array) {
        missing.push("columns");
    }
    missing
}

fn import_position(declared: Option<i64>, index: usize, what: &str) -> BoardResult<i32> {
    match declared {
        Some(position) => checked_position(position).map_err(|_| {
            BoardError::Validation(format!("{} has a negative or oversized position", what))
        }),
        None => i32::try_from(index)
            .map_err(|_| BoardError::Validation(format!("{} is beyond the position range", what))),
    }
}

fn import_story_points(declared: Option<i64>, what: &str) -> BoardResult<Option<i32>> {
    match declared {
        None | Some(0) => Ok(None),
        Some(points @ 1..=5) => Ok(Some(points as i32)),
        Some(points) => Err(BoardError::Validation(format!(
            "{} has story_points {}, expected 1 to 5",
            what, points
        ))),
    }
}

/// Validate an import payload and normalise it into a template, filling in
/// defaults for everything optional.
pub fn parse_import(payload: Value) -> BoardResult<BoardTemplate> {
    let board = unwrap_envelope(payload);

    let missing = missing_fields(&board);
    if !missing.is_empty() {
        return Err(BoardError::Validation(format!(
            "Invalid import data structure. Missing required fields: {}",
            missing.join(", ")
        )));
    }

    let raw: RawBoard = serde_json::from_value(board)
        .map_err(|err| BoardError::Validation(format!("Invalid import data structure: {}", err)))?;

    let mut columns = Vec::with_capacity(raw.columns.len());
    for (column_index, raw_column) in raw.columns.into_iter().enumerate() {
        let column_label = format!("Column #{}", column_index + 1);
        let name = raw_column
            .name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| BoardError::Validation(format!("{} is missing a name", column_label)))?;

        let mut tasks = Vec::new();
        for (task_index, raw_task) in raw_column.tasks.unwrap_or_default().into_iter().enumerate() {
            let task_label = format!("Task #{} in column '{}'", task_index + 1, name);
            let title = raw_task
                .title
                .filter(|title| !title.trim().is_empty())
                .ok_or_else(|| BoardError::Validation(format!("{} is missing a title", task_label)))?;
            let priority = match raw_task.priority.as_deref() {
                None | Some("") => Priority::default(),
                Some(priority) => priority.parse()?,
            };

            tasks.push(TaskTemplate {
                title,
                description: raw_task.description,
                assignee: raw_task.assignee,
                priority,
                story_points: import_story_points(raw_task.story_points, &task_label)?,
                position: import_position(raw_task.position, task_index, &task_label)?,
            });
        }

        columns.push(ColumnTemplate {
            position: import_position(raw_column.position, column_index, &column_label)?,
            color: raw_column
                .color
                .filter(|color| !color.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_COLUMN_COLOR.to_owned()),
            name,
            tasks,
        });
    }

    Ok(BoardTemplate {
        name: raw.name,
        description: raw.description,
        columns,
    })
}

/// Create a new board from a template with fresh ids throughout.
pub fn import_board(template: &BoardTemplate, conn: &mut SqliteConnection) -> BoardResult<Board> {
    conn.transaction(|conn| {
        let now = Utc::now().naive_utc();
        // Stamps increase in document order, so rows with tied positions read
        // back in the order they appear in the template.
        let mut sequence = 0i64;
        let mut next_stamp = || {
            sequence += 1;
            now + Duration::microseconds(sequence)
        };

        let board_id = uuid::Uuid::new_v4().to_string();
        let board = Board::create(
            NewBoard {
                id: &board_id,
                name: &template.name,
                description: template.description.as_deref(),
                created_at: now,
                updated_at: now,
            },
            conn,
        )?;

        for column in &template.columns {
            let column_id = uuid::Uuid::new_v4().to_string();
            Column::create(
                NewColumn {
                    id: &column_id,
                    board_id: &board.id,
                    name: &column.name,
                    position: column.position,
                    color: &column.color,
                    created_at: next_stamp(),
                },
                conn,
            )?;

            for task in &column.tasks {
                let task_id = uuid::Uuid::new_v4().to_string();
                let stamp = next_stamp();
                Task::insert(
                    NewTask {
                        id: &task_id,
                        board_id: &board.id,
                        column_id: &column_id,
                        title: &task.title,
                        description: task.description.as_deref(),
                        assignee: task.assignee.as_deref(),
                        priority: task.priority.as_str(),
                        story_points: task.story_points,
                        position: task.position,
                        created_at: stamp,
                        updated_at: stamp,
                    },
                    conn,
                )?;
            }
        }

        tracing::info!(
            board_id = %board.id,
            name = %board.name,
            columns = template.columns.len(),
            "board imported"
        );
        Ok(board)
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        aggregate::load_board_aggregate,
        db::{repos::board::ListBoards, test_support::temp_pool},
    };

    #[test]
    fn filename_slugifies_board_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            backup_filename("Sprint 1: API/Auth", date),
            "sprint_1__api_auth_backup_2024-03-09.json"
        );
        assert_eq!(
            backup_filename("release-v2_final", date),
            "release-v2_final_backup_2024-03-09.json"
        );
    }

    #[test]
    fn envelope_and_bare_forms_parse_alike() {
        let bare = json!({
            "name": "Roadmap",
            "columns": [{ "name": "Ideas", "tasks": [{ "title": "Dark mode" }] }]
        });
        let envelope = json!({ "version": "1.0", "exportDate": "2024-01-01T00:00:00Z", "board": bare.clone() });

        assert_eq!(parse_import(bare).unwrap(), parse_import(envelope).unwrap());
    }

    #[test]
    fn missing_fields_are_named() {
        let err = parse_import(json!({ "description": "no name" })).unwrap_err();
        match err {
            BoardError::Validation(message) => {
                assert!(message.contains("name"), "{}", message);
                assert!(message.contains("columns"), "{}", message);
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let err = parse_import(json!({ "name": "X", "columns": {} })).unwrap_err();
        assert!(matches!(err, BoardError::Validation(message) if message.ends_with("columns")));
    }

    #[test]
    fn defaults_fill_in_optional_fields() {
        let template = parse_import(json!({
            "name": "Defaults",
            "columns": [
                { "name": "A", "tasks": [{ "title": "first" }, { "title": "second", "story_points": 0 }] },
                { "name": "B", "position": 9, "color": "#123456" }
            ]
        }))
        .unwrap();

        let a = &template.columns[0];
        assert_eq!(a.position, 0);
        assert_eq!(a.color, FALLBACK_COLUMN_COLOR);
        assert_eq!(a.tasks[0].priority, Priority::Medium);
        assert_eq!(a.tasks[0].story_points, None);
        assert_eq!(a.tasks[1].position, 1);
        assert_eq!(a.tasks[1].story_points, None);

        let b = &template.columns[1];
        assert_eq!(b.position, 9);
        assert_eq!(b.color, "#123456");
        assert!(b.tasks.is_empty());
    }

    #[test]
    fn malformed_entries_are_rejected() {
        let bad_priority = json!({ "name": "X", "columns": [{ "name": "A", "tasks": [{ "title": "t", "priority": "urgent" }] }] });
        assert!(matches!(parse_import(bad_priority), Err(BoardError::Validation(_))));

        let bad_points = json!({ "name": "X", "columns": [{ "name": "A", "tasks": [{ "title": "t", "story_points": 13 }] }] });
        assert!(matches!(parse_import(bad_points), Err(BoardError::Validation(_))));

        let untitled = json!({ "name": "X", "columns": [{ "name": "A", "tasks": [{ "description": "?" }] }] });
        assert!(matches!(parse_import(untitled), Err(BoardError::Validation(_))));

        let negative = json!({ "name": "X", "columns": [{ "name": "A", "position": -2 }] });
        assert!(matches!(parse_import(negative), Err(BoardError::Validation(_))));
    }

    #[test]
    fn export_then_import_yields_an_independent_copy() {
        let (_dir, pool) = temp_pool();
        let mut pooled = pool.get().unwrap();
        let conn: &mut SqliteConnection = &mut pooled;

        let template = parse_import(json!({
            "name": "Origin",
            "description": "source board",
            "columns": [
                { "name": "Backlog", "position": 0, "color": "#eeeeee", "tasks": [
                    { "title": "Write docs", "assignee": "sam", "priority": "low", "story_points": 2 },
                    { "title": "Ship", "priority": "high" }
                ]},
                { "name": "Done", "position": 1, "color": "#e8f5e8", "tasks": [] }
            ]
        }))
        .unwrap();
        let source = import_board(&template, conn).unwrap();
        let source_view = load_board_aggregate(&source.id, conn).unwrap();

        let document = export(&source_view, Utc::now());
        assert_eq!(document.version, BACKUP_VERSION);
        assert_eq!(document.board, template);

        let payload = serde_json::to_value(&document).unwrap();
        let copy = import_board(&parse_import(payload).unwrap(), conn).unwrap();
        let copy_view = load_board_aggregate(&copy.id, conn).unwrap();

        assert_eq!(export(&copy_view, Utc::now()).board, document.board);
        assert_ne!(copy.id, source.id);
        for (a, b) in source_view.columns.iter().zip(&copy_view.columns) {
            assert_ne!(a.column.id, b.column.id);
            for (x, y) in a.tasks.iter().zip(&b.tasks) {
                assert_ne!(x.id, y.id);
            }
        }
        assert_eq!(Board::count(conn).unwrap(), 2);
    }

    fn task_titles(view: &BoardAggregate) -> Vec<Vec<String>> {
        view.columns
            .iter()
            .map(|entry| entry.tasks.iter().map(|task| task.title.clone()).collect())
            .collect()
    }

    #[test]
    fn tied_positions_keep_document_order() {
        let (_dir, pool) = temp_pool();
        let mut pooled = pool.get().unwrap();
        let conn: &mut SqliteConnection = &mut pooled;

        let titles = ["C1", "A", "B", "D", "E", "C2", "C3"];
        let tasks: Vec<Value> = titles
            .iter()
            .map(|title| json!({ "title": title, "position": 0 }))
            .collect();
        let template = parse_import(json!({
            "name": "Ties",
            "columns": [
                { "name": "Left", "position": 0, "tasks": tasks },
                { "name": "Middle", "position": 0 },
                { "name": "Right", "position": 0 }
            ]
        }))
        .unwrap();

        let source = import_board(&template, conn).unwrap();
        let source_view = load_board_aggregate(&source.id, conn).unwrap();
        let column_names: Vec<&str> = source_view
            .columns
            .iter()
            .map(|entry| entry.column.name.as_str())
            .collect();
        assert_eq!(column_names, vec!["Left", "Middle", "Right"]);
        assert_eq!(task_titles(&source_view)[0], titles);

        for _ in 0..3 {
            let payload = serde_json::to_value(export(&source_view, Utc::now())).unwrap();
            let copy = import_board(&parse_import(payload).unwrap(), conn).unwrap();
            let copy_view = load_board_aggregate(&copy.id, conn).unwrap();
            assert_eq!(task_titles(&copy_view), task_titles(&source_view));
            assert_eq!(
                export(&copy_view, Utc::now()).board,
                export(&source_view, Utc::now()).board
            );
        }
    }

    #[test]
    fn failed_import_writes_nothing() {
        use diesel::{sql_query, RunQueryDsl};

        let (_dir, pool) = temp_pool();
        let mut pooled = pool.get().unwrap();
        let conn: &mut SqliteConnection = &mut pooled;

        sql_query(
            "CREATE TRIGGER reject_tasks BEFORE INSERT ON tasks \
             BEGIN SELECT RAISE(ABORT, 'tasks are frozen'); END",
        )
        .execute(conn)
        .unwrap();

        let template = parse_import(json!({
            "name": "Half",
            "columns": [
                { "name": "Todo", "tasks": [{ "title": "never stored" }] }
            ]
        }))
        .unwrap();

        let err = import_board(&template, conn).unwrap_err();
        assert!(matches!(err, BoardError::Storage(_)), "{:?}", err);
        assert_eq!(Board::count(conn).unwrap(), 0);
    }
}
