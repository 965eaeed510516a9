use std::{fmt, str::FromStr};

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::schema::{boards, columns, tasks};
use crate::error::BoardError;

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = boards)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Board {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = boards)]
pub struct NewBoard<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = columns)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Column {
    pub id: String,
    pub board_id: String,
    pub name: String,
    pub position: i32,
    pub color: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = columns)]
pub struct NewColumn<'a> {
    pub id: &'a str,
    pub board_id: &'a str,
    pub name: &'a str,
    pub position: i32,
    pub color: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Identifiable, Serialize)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Task {
    pub id: String,
    pub board_id: String,
    pub column_id: String,
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub priority: String,
    pub story_points: Option<i32>,
    pub position: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTask<'a> {
    pub id: &'a str,
    pub board_id: &'a str,
    pub column_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub assignee: Option<&'a str>,
    pub priority: &'a str,
    pub story_points: Option<i32>,
    pub position: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Editable task fields. `None` clears the column.
#[derive(AsChangeset)]
#[diesel(table_name = tasks)]
#[diesel(treat_none_as_null = true)]
pub struct TaskChangeSet {
    pub title: String,
    pub description: Option<String>,
    pub assignee: Option<String>,
    pub priority: String,
    pub story_points: Option<i32>,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = BoardError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(BoardError::Validation(format!(
                "Unknown priority '{}'. Expected one of: low, medium, high",
                other
            ))),
        }
    }
}

/// Story points are 1 through 5; `None` means unestimated.
pub fn check_story_points(story_points: Option<i32>) -> Result<Option<i32>, BoardError> {
    match story_points {
        Some(points) if !(1..=5).contains(&points) => Err(BoardError::Validation(format!(
            "story_points must be between 1 and 5, got {}",
            points
        ))),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!(" low ".parse::<Priority>().unwrap(), Priority::Low);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn priority_defaults_to_medium() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(Priority::default().to_string(), "medium");
    }

    #[test]
    fn story_points_outside_range_are_rejected() {
        assert_eq!(check_story_points(None).unwrap(), None);
        assert_eq!(check_story_points(Some(3)).unwrap(), Some(3));
        assert!(check_story_points(Some(0)).is_err());
        assert!(check_story_points(Some(8)).is_err());
    }
}
