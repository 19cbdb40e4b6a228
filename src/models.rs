use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One result row, keyed by lowercased column name. Every value is kept in its
/// string form; SQL `NULL` is `None`.
pub type Row = BTreeMap<String, Option<String>>;

/// Rows produced by a query together with the column names in select order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub difficulty: String,
    pub description: String,
    pub columns_info: String,
    pub solution_query: String,
}

#[derive(sqlx::FromRow, Clone, Default)]
pub struct DbTask {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub difficulty: Option<String>,
    pub description: Option<String>,
    pub columns_info: Option<String>,
    pub solution_query: Option<String>,
}

impl From<DbTask> for Task {
    fn from(task: DbTask) -> Self {
        Self {
            id: task.id.unwrap_or_default(),
            name: task.name.unwrap_or_default(),
            difficulty: task.difficulty.unwrap_or_default(),
            description: task.description.unwrap_or_default(),
            columns_info: task.columns_info.unwrap_or_default(),
            solution_query: task.solution_query.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TaskSummary {
    pub id: i64,
    pub name: String,
    pub difficulty: String,
    pub solved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SchemaColumn {
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub column_type: String,
    pub constraints: String,
}

/// A table shown to the learner, either as part of a task or from the
/// sandbox catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaTable {
    pub table_name: String,
    pub columns: Vec<SchemaColumn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ResultColumn {
    pub name: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub column_type: String,
    pub description: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserProgress {
    pub solved: bool,
    pub solved_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub solved_count: i64,
    pub total_count: i64,
    pub completion_percentage: f64,
}

impl UserStats {
    pub fn new(solved_count: i64, total_count: i64) -> Self {
        let completion_percentage = if total_count > 0 {
            ((solved_count as f64 / total_count as f64) * 100.0 * 100.0).round() / 100.0
        } else {
            0.0
        };

        Self {
            solved_count,
            total_count,
            completion_percentage,
        }
    }
}

/// Everything needed to persist a new task.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub name: String,
    pub difficulty: String,
    pub description: String,
    pub columns_info: String,
    pub solution_query: String,
    pub tables: Vec<SchemaTable>,
    pub result_schema: Vec<ResultColumn>,
    pub expected: ResultSet,
}
