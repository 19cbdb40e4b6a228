use std::collections::BTreeSet;

use rocket::FromForm;
use rocket::State;
use rocket::form::Form;
use rocket::serde::{Deserialize, Serialize, json::Json};
use sqlx::{Pool, Sqlite};
use tracing::{info, warn};
use validator::Validate;

use crate::auth::{AccessToken, Permission, User, issue_token};
use crate::authoring::{TaskDraft, build_task};
use crate::compare::{column_diff, results_match};
use crate::config::AppConfig;
use crate::db::{
    authenticate_user, create_task, create_user, find_task, get_all_task_tables,
    get_allowed_tables, get_expected_result, get_result_schema, get_task, get_task_schema,
    get_user_stats, is_task_solved, list_tasks, mark_task_solved,
};
use crate::error::AppError;
use crate::gate::{self, TablePolicy};
use crate::models::{ResultColumn, ResultSet, Row, SchemaTable, TaskSummary, UserStats};
use crate::sandbox::Sandbox;
use crate::validation::JsonValidateExt;

#[derive(Deserialize, Validate)]
pub struct RegistrationRequest {
    #[validate(length(min = 1, message = "Username cannot be empty"))]
    username: String,
    #[validate(email(message = "Invalid email address"))]
    email: String,
    #[validate(length(min = 1, message = "Password cannot be empty"))]
    password: String,
    #[serde(default)]
    secret_key: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Deserialize, FromForm)]
pub struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Serialize, Deserialize)]
pub struct TaskDetail {
    pub id: i64,
    pub name: String,
    pub difficulty: String,
    pub description: String,
    pub solved: bool,
    pub schema: Vec<SchemaTable>,
    pub result_schema: Vec<ResultColumn>,
    pub columns_info: String,
}

#[derive(Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    query: String,
}

/// Outcome of running or submitting a query. Query-level failures are reported
/// here with `success: false` rather than as HTTP errors.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct QueryResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<Row>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl QueryResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    fn solved(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            ..Default::default()
        }
    }

    fn rows(result: ResultSet) -> Self {
        Self {
            success: true,
            columns: Some(result.columns),
            results: Some(result.rows),
            ..Default::default()
        }
    }
}

#[derive(Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            is_admin: user.is_admin(),
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

#[derive(Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 1, message = "Name cannot be empty"))]
    name: String,
    #[validate(length(min = 1, message = "Description cannot be empty"))]
    description: String,
    #[validate(length(min = 1, message = "Difficulty cannot be empty"))]
    difficulty: String,
    #[validate(length(min = 1, message = "Solution query cannot be empty"))]
    solution_query: String,
    #[validate(length(min = 1, message = "Select at least one table"))]
    tables: Vec<String>,
    #[serde(default)]
    columns_info: Option<String>,
}

#[derive(Serialize, Deserialize)]
pub struct CreateTaskResponse {
    pub success: bool,
    pub task_id: i64,
}

#[derive(Deserialize)]
pub struct AdminQueryRequest {
    #[serde(default)]
    query: String,
    #[serde(default)]
    tables: Vec<String>,
}

const EMPTY_QUERY: &str = "Query cannot be empty";

fn require_query(query: &str) -> Result<(), AppError> {
    if query.trim().is_empty() {
        return Err(AppError::Validation(EMPTY_QUERY.to_string()));
    }
    Ok(())
}

/// Builds the gate policy for a task: its own tables are allowed, every other
/// sandbox or task table is off limits. `None` for unknown tasks.
async fn task_policy(
    db: &Pool<Sqlite>,
    sandbox: &Sandbox,
    task_id: i64,
) -> Result<Option<TablePolicy>, AppError> {
    let Some(allowed) = get_allowed_tables(db, task_id).await? else {
        return Ok(None);
    };

    let mut known: BTreeSet<String> = sandbox.table_names().await?.into_iter().collect();
    known.extend(get_all_task_tables(db).await?);

    Ok(Some(TablePolicy::new(allowed, known)))
}

#[post("/register", data = "<registration>")]
pub async fn api_register(
    registration: Json<RegistrationRequest>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<MessageResponse>, AppError> {
    let registration = registration.validated()?;

    let is_admin = match registration.secret_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            if key != config.admin_registration_key {
                return Err(AppError::Validation("Wrong admin key".to_string()));
            }
            true
        }
        _ => false,
    };

    create_user(
        db,
        &registration.username,
        &registration.email,
        &registration.password,
        is_admin,
    )
    .await?;

    Ok(Json(MessageResponse {
        message: "User registered successfully".to_string(),
    }))
}

async fn login(
    request: LoginRequest,
    db: &Pool<Sqlite>,
    config: &AppConfig,
) -> Result<Json<AccessToken>, AppError> {
    match authenticate_user(db, &request.username, &request.password).await? {
        Some(user) => {
            info!(username = %user.username, "User logged in");
            Ok(Json(issue_token(&user.id, config)?))
        }
        None => Err(AppError::Authentication(
            "Incorrect username or password".to_string(),
        )),
    }
}

#[post("/login", format = "form", data = "<login_form>")]
pub async fn api_login_form(
    login_form: Form<LoginRequest>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<AccessToken>, AppError> {
    login(login_form.into_inner(), db, config).await
}

#[post("/login", format = "json", data = "<login_json>", rank = 2)]
pub async fn api_login_json(
    login_json: Json<LoginRequest>,
    db: &State<Pool<Sqlite>>,
    config: &State<AppConfig>,
) -> Result<Json<AccessToken>, AppError> {
    login(login_json.into_inner(), db, config).await
}

#[get("/tasks")]
pub async fn api_get_tasks(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<Vec<TaskSummary>>, AppError> {
    user.require_permission(Permission::ViewTasks)?;
    Ok(Json(list_tasks(db, &user.id).await?))
}

#[get("/tasks/<id>")]
pub async fn api_get_task(
    id: i64,
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<TaskDetail>, AppError> {
    user.require_permission(Permission::ViewTasks)?;

    let task = get_task(db, id).await?;
    let solved = is_task_solved(db, &user.id, id).await?;
    let schema = get_task_schema(db, id).await?;
    let result_schema = get_result_schema(db, id).await?;

    Ok(Json(TaskDetail {
        id: task.id,
        name: task.name,
        difficulty: task.difficulty,
        description: task.description,
        solved,
        schema,
        result_schema,
        columns_info: task.columns_info,
    }))
}

#[post("/tasks/<id>/run", data = "<request>")]
pub async fn api_run_query(
    id: i64,
    request: Json<QueryRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
    sandbox: &State<Sandbox>,
) -> Result<Json<QueryResponse>, AppError> {
    user.require_permission(Permission::RunQueries)?;

    let query = request.into_inner().query;
    require_query(&query)?;

    let policy = task_policy(db, sandbox, id).await?;
    if let Err(rejection) = gate::check(&query, id, policy.as_ref()) {
        info!(task_id = id, %rejection, "Query rejected");
        return Ok(Json(QueryResponse::failure(rejection.to_string())));
    }

    let columns_info = find_task(db, id)
        .await?
        .map(|task| task.columns_info)
        .unwrap_or_default();

    let result = match sandbox.execute(&query).await {
        Ok(result) => result,
        Err(err) => {
            return Ok(Json(QueryResponse::failure(format!(
                "Query execution error: {}. {}",
                err, columns_info
            ))));
        }
    };

    let warning = get_expected_result(db, id).await?.and_then(|expected| {
        let diff = column_diff(&result, &expected);
        (!diff.is_empty()).then(|| format!("Warning! {}{}", columns_info, diff.describe()))
    });

    Ok(Json(QueryResponse {
        warning,
        ..QueryResponse::rows(result)
    }))
}

async fn evaluate_submission(
    task_id: i64,
    query: &str,
    user: &User,
    db: &Pool<Sqlite>,
    sandbox: &Sandbox,
) -> Result<QueryResponse, AppError> {
    let policy = task_policy(db, sandbox, task_id).await?;
    if let Err(rejection) = gate::check(query, task_id, policy.as_ref()) {
        info!(task_id, %rejection, "Submission rejected");
        return Ok(QueryResponse::failure(rejection.to_string()));
    }

    let columns_info = find_task(db, task_id)
        .await?
        .map(|task| task.columns_info)
        .unwrap_or_default();

    let Some(expected) = get_expected_result(db, task_id).await? else {
        return Ok(QueryResponse::failure(
            "No expected results found for this task",
        ));
    };

    let actual = match sandbox.execute(query).await {
        Ok(result) => result,
        Err(err) => {
            return Ok(QueryResponse::failure(format!(
                "Query execution error: {}. {}",
                err, columns_info
            )));
        }
    };

    let diff = column_diff(&actual, &expected);
    if !diff.is_empty() {
        return Ok(QueryResponse::failure(format!(
            "The query result has the wrong columns. {}{}",
            columns_info,
            diff.describe()
        )));
    }

    if !results_match(&actual, &expected) {
        return Ok(QueryResponse::failure(format!(
            "Your query result does not match the expected result. Please check: \
             1) the column names ({}); 2) the data and its formats; 3) the sort order, if required.",
            columns_info
        )));
    }

    let newly_solved = mark_task_solved(db, &user.id, task_id).await?;
    info!(task_id, username = %user.username, newly_solved, "Correct solution submitted");

    Ok(QueryResponse::solved("Your solution is correct!"))
}

#[post("/tasks/<id>/submit", data = "<request>")]
pub async fn api_submit_solution(
    id: i64,
    request: Json<QueryRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
    sandbox: &State<Sandbox>,
) -> Result<Json<QueryResponse>, AppError> {
    user.require_permission(Permission::SubmitSolutions)?;

    let query = request.into_inner().query;
    require_query(&query)?;

    match evaluate_submission(id, &query, &user, db, sandbox).await {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            err.log_and_record("Evaluating submission");
            Ok(Json(QueryResponse::failure(
                "An error occurred while processing your query. \
                 Please check your SQL syntax and that all required columns are included.",
            )))
        }
    }
}

#[get("/user/stats")]
pub async fn api_user_stats(
    user: User,
    db: &State<Pool<Sqlite>>,
) -> Result<Json<UserStats>, AppError> {
    user.require_permission(Permission::ViewOwnProfile)?;
    Ok(Json(get_user_stats(db, &user.id).await?))
}

#[get("/user/current")]
pub async fn api_current_user(user: User) -> Result<Json<CurrentUser>, AppError> {
    user.require_permission(Permission::ViewOwnProfile)?;
    Ok(Json(CurrentUser::from(user)))
}

#[get("/admin/tables")]
pub async fn api_admin_tables(
    user: User,
    sandbox: &State<Sandbox>,
) -> Result<Json<Vec<SchemaTable>>, AppError> {
    user.require_permission(Permission::ViewSandboxTables)?;
    Ok(Json(sandbox.tables().await?))
}

#[post("/admin/tasks", data = "<request>")]
pub async fn api_admin_create_task(
    request: Json<CreateTaskRequest>,
    user: User,
    db: &State<Pool<Sqlite>>,
    sandbox: &State<Sandbox>,
) -> Result<Json<CreateTaskResponse>, AppError> {
    user.require_permission(Permission::CreateTasks)?;
    let request = request.validated()?;

    let draft = TaskDraft {
        name: request.name,
        difficulty: request.difficulty,
        description: request.description,
        columns_info: request.columns_info,
        solution_query: request.solution_query,
        tables: request.tables,
        result_schema: None,
    };

    let task = build_task(sandbox, draft).await?;
    let task_id = create_task(db, &task).await?;

    info!(task_id, username = %user.username, "Task created by admin");
    Ok(Json(CreateTaskResponse {
        success: true,
        task_id,
    }))
}

#[post("/admin/run-query", data = "<request>")]
pub async fn api_admin_run_query(
    request: Json<AdminQueryRequest>,
    user: User,
    sandbox: &State<Sandbox>,
) -> Result<Json<QueryResponse>, AppError> {
    user.require_permission(Permission::RunAdminQueries)?;

    let request = request.into_inner();
    require_query(&request.query)?;

    let known = sandbox.table_names().await?;
    let policy = if request.tables.is_empty() {
        TablePolicy::new(&known, &known)
    } else {
        TablePolicy::new(&request.tables, &known)
    };

    if let Err(rejection) = gate::check_with_policy(&request.query, &policy) {
        return Ok(Json(QueryResponse::failure(rejection.to_string())));
    }

    match sandbox.execute(&request.query).await {
        Ok(result) => Ok(Json(QueryResponse::rows(result))),
        Err(err) => {
            warn!(error = %err, "Admin query failed");
            Ok(Json(QueryResponse::failure(format!(
                "Query execution error: {}",
                err
            ))))
        }
    }
}

#[get("/health")]
pub fn health() -> &'static str {
    "OK"
}
