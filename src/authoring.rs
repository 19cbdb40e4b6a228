//! Turns a task definition into a storable task: the reference solution is
//! run against the sandbox and its output becomes the answer key.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::{info, instrument};

use crate::error::AppError;
use crate::gate::{self, Rejection, TablePolicy};
use crate::models::{NewTask, ResultColumn, ResultSet};
use crate::sandbox::{Sandbox, SandboxError};

#[derive(Debug, Clone)]
pub struct TaskDraft {
    pub name: String,
    pub difficulty: String,
    pub description: String,
    pub columns_info: Option<String>,
    pub solution_query: String,
    pub tables: Vec<String>,
    pub result_schema: Option<Vec<ResultColumn>>,
}

#[derive(Debug, Error)]
pub enum AuthoringError {
    #[error("Unknown sandbox tables: {}", .0.join(", "))]
    UnknownTables(Vec<String>),

    #[error("A task needs at least one table")]
    NoTables,

    #[error("Solution query rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error("Solution query failed: {0}")]
    Execution(SandboxError),

    #[error(transparent)]
    App(#[from] AppError),
}

impl From<AuthoringError> for AppError {
    fn from(error: AuthoringError) -> Self {
        match error {
            AuthoringError::App(inner) => inner,
            other => AppError::Validation(other.to_string()),
        }
    }
}

pub fn default_columns_info(columns: &[String]) -> String {
    format!("Expected columns in the result: {}", columns.join(", "))
}

/// Best-effort type label for a result column, taken from its first non-null
/// value.
fn infer_type(result: &ResultSet, column: &str) -> &'static str {
    let sample = result
        .rows
        .iter()
        .find_map(|row| row.get(column).cloned().flatten());

    match sample {
        None => "TEXT",
        Some(value) if value.parse::<i64>().is_ok() => "INTEGER",
        Some(value) if value.parse::<f64>().is_ok() => "DECIMAL",
        Some(value)
            if chrono::NaiveDate::parse_from_str(value.get(..10).unwrap_or(""), "%Y-%m-%d")
                .is_ok() =>
        {
            "DATE"
        }
        Some(_) => "VARCHAR",
    }
}

#[instrument(skip(sandbox, draft), fields(name = %draft.name))]
pub async fn build_task(sandbox: &Sandbox, draft: TaskDraft) -> Result<NewTask, AuthoringError> {
    let requested: BTreeSet<String> = draft.tables.iter().map(|t| t.to_lowercase()).collect();
    if requested.is_empty() {
        return Err(AuthoringError::NoTables);
    }

    let catalog = sandbox.tables().await?;
    let known: BTreeSet<String> = catalog.iter().map(|t| t.table_name.to_lowercase()).collect();

    let unknown: Vec<String> = requested.difference(&known).cloned().collect();
    if !unknown.is_empty() {
        return Err(AuthoringError::UnknownTables(unknown));
    }

    let policy = TablePolicy::new(&requested, &known);
    gate::check_with_policy(&draft.solution_query, &policy)?;

    let expected = sandbox
        .execute(&draft.solution_query)
        .await
        .map_err(AuthoringError::Execution)?;

    let tables = catalog
        .into_iter()
        .filter(|t| requested.contains(&t.table_name.to_lowercase()))
        .collect();

    let result_schema = draft.result_schema.unwrap_or_else(|| {
        expected
            .columns
            .iter()
            .map(|column| ResultColumn {
                name: column.clone(),
                column_type: infer_type(&expected, column).to_string(),
                description: String::new(),
            })
            .collect()
    });

    let columns_info = draft
        .columns_info
        .filter(|info| !info.trim().is_empty())
        .unwrap_or_else(|| default_columns_info(&expected.columns));

    info!(rows = expected.len(), "Reference solution executed");

    Ok(NewTask {
        name: draft.name,
        difficulty: draft.difficulty,
        description: draft.description,
        columns_info,
        solution_query: draft.solution_query,
        tables,
        result_schema,
        expected,
    })
}
