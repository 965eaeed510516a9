use chrono::NaiveDateTime;
use diesel::{delete, dsl::max, insert_into, prelude::*, update, SqliteConnection};

use crate::db::{
    models::{NewTask, Task, TaskChangeSet},
    schema::tasks,
};

pub trait CreateTask {
    fn insert(new_task: NewTask<'_>, conn: &mut SqliteConnection) -> QueryResult<usize>;
    fn create(new_task: NewTask<'_>, conn: &mut SqliteConnection) -> QueryResult<Task>;
}

impl CreateTask for Task {
    fn insert(new_task: NewTask<'_>, conn: &mut SqliteConnection) -> QueryResult<usize> {
        insert_into(tasks::table).values(new_task).execute(conn)
    }

    fn create(new_task: NewTask<'_>, conn: &mut SqliteConnection) -> QueryResult<Task> {
        let task_id = new_task.id.to_owned();
        Task::insert(new_task, conn)?;
        tasks::table
            .filter(tasks::id.eq(task_id))
            .select(Task::as_select())
            .first(conn)
    }
}

pub trait FindTask {
    fn find(task_id: &str, conn: &mut SqliteConnection) -> QueryResult<Option<Task>>;
    fn max_position_in_column(
        column_id: &str,
        conn: &mut SqliteConnection,
    ) -> QueryResult<Option<i32>>;
}

impl FindTask for Task {
    fn find(task_id: &str, conn: &mut SqliteConnection) -> QueryResult<Option<Task>> {
        tasks::table
            .filter(tasks::id.eq(task_id))
            .select(Task::as_select())
            .first(conn)
            .optional()
    }

    fn max_position_in_column(
        column_id: &str,
        conn: &mut SqliteConnection,
    ) -> QueryResult<Option<i32>> {
        tasks::table
            .filter(tasks::column_id.eq(column_id))
            .select(max(tasks::position))
            .first(conn)
    }
}

pub trait ListTasks {
    fn list_for_board(board_id: &str, conn: &mut SqliteConnection) -> QueryResult<Vec<Task>>;
}

impl ListTasks for Task {
    /// Top-to-bottom order; equal positions fall back to insertion order.
    fn list_for_board(board_id: &str, conn: &mut SqliteConnection) -> QueryResult<Vec<Task>> {
        tasks::table
            .filter(tasks::board_id.eq(board_id))
            .order((
                tasks::position.asc(),
                tasks::created_at.asc(),
                tasks::id.asc(),
            ))
            .select(Task::as_select())
            .load(conn)
    }
}

pub trait UpdateTask {
    fn update(
        task_id: &str,
        change_set: TaskChangeSet,
        conn: &mut SqliteConnection,
    ) -> QueryResult<usize>;

    fn relocate(
        task_id: &str,
        column_id: &str,
        position: i32,
        updated_at: NaiveDateTime,
        conn: &mut SqliteConnection,
    ) -> QueryResult<usize>;
}

impl UpdateTask for Task {
    fn update(
        task_id: &str,
        change_set: TaskChangeSet,
        conn: &mut SqliteConnection,
    ) -> QueryResult<usize> {
        update(tasks::table.filter(tasks::id.eq(task_id)))
            .set(change_set)
            .execute(conn)
    }

    fn relocate(
        task_id: &str,
        column_id: &str,
        position: i32,
        updated_at: NaiveDateTime,
        conn: &mut SqliteConnection,
    ) -> QueryResult<usize> {
        update(tasks::table.filter(tasks::id.eq(task_id)))
            .set((
                tasks::column_id.eq(column_id),
                tasks::position.eq(position),
                tasks::updated_at.eq(updated_at),
            ))
            .execute(conn)
    }
}

pub trait DeleteTask {
    fn delete(task_id: &str, conn: &mut SqliteConnection) -> QueryResult<usize>;
}

impl DeleteTask for Task {
    fn delete(task_id: &str, conn: &mut SqliteConnection) -> QueryResult<usize> {
        delete(tasks::table.filter(tasks::id.eq(task_id))).execute(conn)
    }
}
