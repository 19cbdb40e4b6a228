use crate::{
    auth::{DbUser, User},
    error::AppError,
};
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::models::{
    DbTask, NewTask, ResultColumn, ResultSet, SchemaColumn, SchemaTable, Task, TaskSummary,
    UserProgress, UserStats,
};

#[instrument(skip(pool))]
pub async fn get_user(pool: &Pool<Sqlite>, id: &str) -> Result<User, AppError> {
    info!("Fetching user by ID");
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, email, is_admin FROM users WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(user) => Ok(User::from(user)),
        _ => Err(AppError::NotFound(format!(
            "User with id {} not found in database",
            id
        ))),
    }
}

#[instrument(skip(pool))]
pub async fn find_user_by_username(
    pool: &Pool<Sqlite>,
    username: &str,
) -> Result<Option<User>, AppError> {
    let row = sqlx::query_as::<_, DbUser>(
        "SELECT id, username, email, is_admin FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(User::from))
}

#[instrument(skip(pool))]
async fn email_taken(pool: &Pool<Sqlite>, email: &str) -> Result<bool, AppError> {
    let existing: Option<String> = sqlx::query_scalar("SELECT id FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(existing.is_some())
}

/// Maps a UNIQUE violation on `users` to the same message the duplicate
/// pre-checks give, for registrations that race past them.
pub(crate) fn registration_conflict(error: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_error) = &error {
        if db_error.is_unique_violation() {
            let message = if db_error.message().contains("users.email") {
                "Email already registered"
            } else {
                "Username already registered"
            };
            return AppError::Validation(message.to_string());
        }
    }

    AppError::Database(error)
}

/// Creates the account and an unsolved progress row for every existing task.
#[instrument(skip(pool, password))]
pub async fn create_user(
    pool: &Pool<Sqlite>,
    username: &str,
    email: &str,
    password: &str,
    is_admin: bool,
) -> Result<String, AppError> {
    info!("Creating new user");

    if find_user_by_username(pool, username).await?.is_some() {
        return Err(AppError::Validation(
            "Username already registered".to_string(),
        ));
    }

    if email_taken(pool, email).await? {
        return Err(AppError::Validation("Email already registered".to_string()));
    }

    let hashed_password = bcrypt::hash(password, bcrypt::DEFAULT_COST)?;
    let user_id = Uuid::new_v4().to_string();

    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO users (id, username, email, password, is_admin) VALUES (?, ?, ?, ?, ?)")
        .bind(&user_id)
        .bind(username)
        .bind(email)
        .bind(&hashed_password)
        .bind(is_admin)
        .execute(&mut *tx)
        .await
        .map_err(registration_conflict)?;

    let progress = sqlx::query(
        "INSERT INTO user_progress (user_id, task_id, solved)
         SELECT ?, id, FALSE FROM tasks",
    )
    .bind(&user_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        user_id = %user_id,
        tasks = progress.rows_affected(),
        "User created with task progress"
    );
    Ok(user_id)
}

#[instrument(skip(pool, password))]
pub async fn authenticate_user(
    pool: &Pool<Sqlite>,
    username: &str,
    password: &str,
) -> Result<Option<User>, AppError> {
    info!("Authenticating user");
    let credentials = sqlx::query_as::<_, (String, String)>(
        "SELECT id, password FROM users WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;

    let Some((user_id, hash)) = credentials else {
        return Ok(None);
    };

    match bcrypt::verify(password, &hash) {
        Ok(true) => Ok(Some(get_user(pool, &user_id).await?)),
        Ok(false) => Ok(None),
        Err(e) => {
            warn!(error = %e, "Stored password hash could not be verified");
            Ok(None)
        }
    }
}

#[instrument(skip(pool))]
pub async fn list_tasks(pool: &Pool<Sqlite>, user_id: &str) -> Result<Vec<TaskSummary>, AppError> {
    info!("Listing tasks with progress");
    let tasks = sqlx::query_as::<_, TaskSummary>(
        "SELECT t.id, t.name, t.difficulty, COALESCE(p.solved, FALSE) AS solved
         FROM tasks t
         LEFT JOIN user_progress p ON p.task_id = t.id AND p.user_id = ?
         ORDER BY t.id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(tasks)
}

#[instrument(skip(pool))]
pub async fn find_task(pool: &Pool<Sqlite>, task_id: i64) -> Result<Option<Task>, AppError> {
    let row = sqlx::query_as::<_, DbTask>(
        "SELECT id, name, difficulty, description, columns_info, solution_query
         FROM tasks WHERE id = ?",
    )
    .bind(task_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Task::from))
}

pub async fn get_task(pool: &Pool<Sqlite>, task_id: i64) -> Result<Task, AppError> {
    find_task(pool, task_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".to_string()))
}

#[instrument(skip(pool))]
pub async fn count_tasks(pool: &Pool<Sqlite>) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tasks")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

#[instrument(skip(pool))]
pub async fn get_task_schema(
    pool: &Pool<Sqlite>,
    task_id: i64,
) -> Result<Vec<SchemaTable>, AppError> {
    let tables = sqlx::query_as::<_, (i64, String)>(
        "SELECT id, table_name FROM schema_tables WHERE task_id = ? ORDER BY id",
    )
    .bind(task_id)
    .fetch_all(pool)
    .await?;

    let mut schema = Vec::with_capacity(tables.len());
    for (table_id, table_name) in tables {
        let columns = sqlx::query_as::<_, SchemaColumn>(
            "SELECT name, type, constraints FROM schema_columns WHERE table_id = ? ORDER BY id",
        )
        .bind(table_id)
        .fetch_all(pool)
        .await?;

        schema.push(SchemaTable {
            table_name,
            columns,
        });
    }

    Ok(schema)
}

#[instrument(skip(pool))]
pub async fn get_result_schema(
    pool: &Pool<Sqlite>,
    task_id: i64,
) -> Result<Vec<ResultColumn>, AppError> {
    let columns = sqlx::query_as::<_, ResultColumn>(
        "SELECT name, type, description FROM result_schemas WHERE task_id = ? ORDER BY position",
    )
    .bind(task_id)
    .fetch_all(pool)
    .await?;

    Ok(columns)
}

/// Tables a task's queries may touch, or `None` when the task does not exist.
#[instrument(skip(pool))]
pub async fn get_allowed_tables(
    pool: &Pool<Sqlite>,
    task_id: i64,
) -> Result<Option<Vec<String>>, AppError> {
    if find_task(pool, task_id).await?.is_none() {
        return Ok(None);
    }

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT table_name FROM schema_tables WHERE task_id = ? ORDER BY table_name",
    )
    .bind(task_id)
    .fetch_all(pool)
    .await?;

    Ok(Some(tables))
}

/// Every table assigned to any task.
#[instrument(skip(pool))]
pub async fn get_all_task_tables(pool: &Pool<Sqlite>) -> Result<Vec<String>, AppError> {
    let tables: Vec<String> =
        sqlx::query_scalar("SELECT DISTINCT table_name FROM schema_tables ORDER BY table_name")
            .fetch_all(pool)
            .await?;
    Ok(tables)
}

#[instrument(skip(pool))]
pub async fn get_expected_result(
    pool: &Pool<Sqlite>,
    task_id: i64,
) -> Result<Option<ResultSet>, AppError> {
    let data: Option<String> =
        sqlx::query_scalar("SELECT result_data FROM expected_results WHERE task_id = ?")
            .bind(task_id)
            .fetch_optional(pool)
            .await?;

    match data {
        Some(json) => Ok(Some(serde_json::from_str(&json)?)),
        None => Ok(None),
    }
}

#[instrument(skip(pool))]
pub async fn get_progress(
    pool: &Pool<Sqlite>,
    user_id: &str,
    task_id: i64,
) -> Result<Option<UserProgress>, AppError> {
    let progress = sqlx::query_as::<_, UserProgress>(
        "SELECT solved, solved_at FROM user_progress
         WHERE user_id = ? AND task_id = ?",
    )
    .bind(user_id)
    .bind(task_id)
    .fetch_optional(pool)
    .await?;

    Ok(progress)
}

pub async fn is_task_solved(
    pool: &Pool<Sqlite>,
    user_id: &str,
    task_id: i64,
) -> Result<bool, AppError> {
    Ok(get_progress(pool, user_id, task_id)
        .await?
        .is_some_and(|p| p.solved))
}

/// Records a solve. Returns `true` only for the first successful submission;
/// repeats leave the original `solved_at` untouched.
#[instrument(skip(pool))]
pub async fn mark_task_solved(
    pool: &Pool<Sqlite>,
    user_id: &str,
    task_id: i64,
) -> Result<bool, AppError> {
    let now = Utc::now().naive_utc();

    let result = sqlx::query(
        "INSERT INTO user_progress (user_id, task_id, solved, solved_at)
         VALUES (?, ?, TRUE, ?)
         ON CONFLICT (user_id, task_id) DO UPDATE
         SET solved = TRUE, solved_at = excluded.solved_at
         WHERE user_progress.solved = FALSE",
    )
    .bind(user_id)
    .bind(task_id)
    .bind(now)
    .execute(pool)
    .await?;

    let newly_solved = result.rows_affected() > 0;
    info!(newly_solved, "Recorded solved task");
    Ok(newly_solved)
}

#[instrument(skip(pool))]
pub async fn get_user_stats(pool: &Pool<Sqlite>, user_id: &str) -> Result<UserStats, AppError> {
    let solved_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_progress p
         JOIN tasks t ON t.id = p.task_id
         WHERE p.user_id = ? AND p.solved = TRUE",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await?;

    let total_count = count_tasks(pool).await?;

    Ok(UserStats::new(solved_count, total_count))
}

/// Stores a task with its schema metadata and answer key in one transaction
/// and gives every existing user an unsolved progress row for it.
#[instrument(skip(pool, task), fields(name = %task.name))]
pub async fn create_task(pool: &Pool<Sqlite>, task: &NewTask) -> Result<i64, AppError> {
    info!("Creating task");
    let expected = serde_json::to_string(&task.expected)?;

    let mut tx = pool.begin().await?;

    let task_id = sqlx::query(
        "INSERT INTO tasks (name, difficulty, description, columns_info, solution_query)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&task.name)
    .bind(&task.difficulty)
    .bind(&task.description)
    .bind(&task.columns_info)
    .bind(&task.solution_query)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    for table in &task.tables {
        let table_id = sqlx::query("INSERT INTO schema_tables (task_id, table_name) VALUES (?, ?)")
            .bind(task_id)
            .bind(&table.table_name)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        for column in &table.columns {
            sqlx::query(
                "INSERT INTO schema_columns (table_id, name, type, constraints) VALUES (?, ?, ?, ?)",
            )
            .bind(table_id)
            .bind(&column.name)
            .bind(&column.column_type)
            .bind(&column.constraints)
            .execute(&mut *tx)
            .await?;
        }
    }

    for (position, column) in task.result_schema.iter().enumerate() {
        sqlx::query(
            "INSERT INTO result_schemas (task_id, position, name, type, description)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(task_id)
        .bind(position as i64)
        .bind(&column.name)
        .bind(&column.column_type)
        .bind(&column.description)
        .execute(&mut *tx)
        .await?;
    }

    sqlx::query("INSERT INTO expected_results (task_id, result_data) VALUES (?, ?)")
        .bind(task_id)
        .bind(&expected)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "INSERT INTO user_progress (user_id, task_id, solved)
         SELECT id, ?, FALSE FROM users",
    )
    .bind(task_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(task_id, "Task created");
    Ok(task_id)
}
