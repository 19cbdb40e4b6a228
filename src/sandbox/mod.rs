pub mod schema;

pub use schema::SANDBOX_SCHEMA;

use std::collections::HashSet;

use sqlx::sqlite::SqliteRow;
use sqlx::Row as _;
use sqlx::{Column, Executor, SqlitePool, Statement, ValueRef};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::error::AppError;
use crate::models::{ResultSet, Row, SchemaColumn, SchemaTable};

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("Only one SQL statement can be run at a time")]
    MultipleStatements,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// The database learners query. Kept apart from the application database so
/// that a query slipping past the gate still cannot see users or answers.
#[derive(Debug, Clone)]
pub struct Sandbox {
    pool: SqlitePool,
}

impl Sandbox {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates and seeds the sandbox tables. Safe to run on every start.
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> Result<(), AppError> {
        info!("Seeding sandbox tables");
        sqlx::raw_sql(SANDBOX_SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Runs `sql` and stringifies every returned value. Whatever the statement
    /// changes is rolled back.
    ///
    /// Only a single statement is accepted: a second one such as `END` would
    /// commit the first.
    #[instrument(skip(self))]
    pub async fn execute(&self, sql: &str) -> Result<ResultSet, SandboxError> {
        if statement_count(sql) > 1 {
            warn!("Rejected multi-statement sandbox query");
            return Err(SandboxError::MultipleStatements);
        }

        let mut tx = self.pool.begin().await?;

        let columns: Vec<String> = {
            let statement = (&mut *tx).prepare(sql).await?;
            statement
                .columns()
                .iter()
                .map(|c| c.name().to_lowercase())
                .collect()
        };

        let rows = sqlx::query(sql).fetch_all(&mut *tx).await?;
        tx.rollback().await?;

        let rows = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .enumerate()
                    .map(|(idx, name)| Ok((name.clone(), stringify(row, idx)?)))
                    .collect::<Result<Row, sqlx::Error>>()
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        info!(rows = rows.len(), "Sandbox query executed");
        Ok(ResultSet::new(columns, rows))
    }

    /// Lists the sandbox tables with their declared columns.
    #[instrument(skip(self))]
    pub async fn tables(&self) -> Result<Vec<SchemaTable>, AppError> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx%'
             ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let columns = self.columns(&name).await?;
            tables.push(SchemaTable {
                table_name: name,
                columns,
            });
        }

        Ok(tables)
    }

    pub async fn table_names(&self) -> Result<Vec<String>, AppError> {
        Ok(self
            .tables()
            .await?
            .into_iter()
            .map(|t| t.table_name)
            .collect())
    }

    async fn columns(&self, table: &str) -> Result<Vec<SchemaColumn>, AppError> {
        let foreign_keys: HashSet<String> =
            sqlx::query_scalar(r#"SELECT "from" FROM pragma_foreign_key_list(?)"#)
                .bind(table)
                .fetch_all(&self.pool)
                .await?
                .into_iter()
                .collect();

        let rows = sqlx::query(
            r#"SELECT name, type, "notnull" AS not_null, pk FROM pragma_table_info(?) ORDER BY cid"#,
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<SchemaColumn, AppError> {
                let name: String = row.try_get("name")?;
                let column_type: String = row.try_get("type")?;
                let not_null: i64 = row.try_get("not_null")?;
                let pk: i64 = row.try_get("pk")?;

                let mut constraints = Vec::new();
                if pk > 0 {
                    constraints.push("PRIMARY KEY");
                }
                if foreign_keys.contains(&name) {
                    constraints.push("FOREIGN KEY");
                }
                if not_null != 0 && pk == 0 {
                    constraints.push("NOT NULL");
                }

                Ok(SchemaColumn {
                    name,
                    column_type,
                    constraints: constraints.join(" "),
                })
            })
            .collect()
    }
}

/// Counts the non-empty statements in `sql`. Semicolons inside string
/// literals, quoted identifiers and comments do not separate statements.
pub fn statement_count(sql: &str) -> usize {
    let mut count = 0;
    let mut pending = false;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                pending = true;
                for next in chars.by_ref() {
                    if next == c {
                        break;
                    }
                }
            }
            '[' => {
                pending = true;
                for next in chars.by_ref() {
                    if next == ']' {
                        break;
                    }
                }
            }
            '-' if chars.peek() == Some(&'-') => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = ' ';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    prev = next;
                }
            }
            ';' => {
                if pending {
                    count += 1;
                    pending = false;
                }
            }
            c if c.is_whitespace() => {}
            _ => pending = true,
        }
    }

    count + usize::from(pending)
}

// SQLite is dynamically typed, so decoding follows the storage class of each
// value rather than the declared column type.
fn stringify(row: &SqliteRow, idx: usize) -> Result<Option<String>, sqlx::Error> {
    if row.try_get_raw(idx)?.is_null() {
        return Ok(None);
    }

    if let Ok(value) = row.try_get::<i64, _>(idx) {
        return Ok(Some(value.to_string()));
    }
    if let Ok(value) = row.try_get::<f64, _>(idx) {
        return Ok(Some(value.to_string()));
    }
    if let Ok(value) = row.try_get::<String, _>(idx) {
        return Ok(Some(value));
    }

    let bytes: Vec<u8> = row.try_get(idx)?;
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}
