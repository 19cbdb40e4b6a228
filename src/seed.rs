use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::authoring::{TaskDraft, build_task};
use crate::config::SeedAdmin;
use crate::db::{count_tasks, create_task, create_user, find_user_by_username};
use crate::error::AppError;
use crate::models::ResultColumn;
use crate::sandbox::Sandbox;

struct SeedTask {
    name: &'static str,
    difficulty: &'static str,
    description: &'static str,
    tables: &'static [&'static str],
    result_schema: &'static [(&'static str, &'static str, &'static str)],
    solution_query: &'static str,
}

const SEED_TASKS: &[SeedTask] = &[
    SeedTask {
        name: "Select all employees",
        difficulty: "Easy",
        description: "Write a query to select all employees from the employees table.",
        tables: &["employees"],
        result_schema: &[
            ("id", "INTEGER", "Employee ID"),
            ("name", "VARCHAR", "Employee name"),
            ("department_id", "INTEGER", "Department ID"),
            ("salary", "DECIMAL", "Employee salary"),
            ("hire_date", "DATE", "Date when employee was hired"),
        ],
        solution_query: "SELECT id, name, department_id, salary, hire_date FROM employees",
    },
    SeedTask {
        name: "Count by department",
        difficulty: "Easy",
        description: "Count the number of employees in each department, including departments without employees.",
        tables: &["employees", "departments"],
        result_schema: &[
            ("department_id", "INTEGER", "Department ID"),
            ("department_name", "VARCHAR", "Department name"),
            ("count", "INTEGER", "Number of employees in the department"),
        ],
        solution_query: "SELECT d.id AS department_id, d.name AS department_name, COUNT(e.id) AS count
FROM departments d
LEFT JOIN employees e ON e.department_id = d.id
GROUP BY d.id, d.name",
    },
    SeedTask {
        name: "Complex join with filter",
        difficulty: "Medium",
        description: "Join multiple tables and filter the results based on conditions. \
Find the number of projects each employee in the Engineering department is involved in.",
        tables: &["employees", "departments", "projects", "employee_projects"],
        result_schema: &[
            ("employee_name", "VARCHAR", "Employee name"),
            ("department_name", "VARCHAR", "Department name"),
            ("project_count", "INTEGER", "Number of projects the employee is working on"),
        ],
        solution_query: "SELECT e.name AS employee_name, d.name AS department_name, COUNT(ep.project_id) AS project_count
FROM employees e
JOIN departments d ON d.id = e.department_id
JOIN employee_projects ep ON ep.employee_id = e.id
WHERE d.name = 'Engineering'
GROUP BY e.id, e.name, d.name",
    },
    SeedTask {
        name: "Window functions",
        difficulty: "Hard",
        description: "Use window functions to calculate running totals. \
Calculate the monthly total sales and running total for the 'Laptop' product. \
Months are formatted as YYYY-MM.",
        tables: &["sales", "products", "customers"],
        result_schema: &[
            ("month", "VARCHAR", "Month of sales"),
            ("product", "VARCHAR", "Product name"),
            ("total_sales", "DECIMAL", "Total sales amount for the month"),
            ("running_total", "DECIMAL", "Running total of sales"),
        ],
        solution_query: "SELECT strftime('%Y-%m', s.sale_date) AS month,
       p.name AS product,
       SUM(s.amount) AS total_sales,
       SUM(SUM(s.amount)) OVER (ORDER BY strftime('%Y-%m', s.sale_date)) AS running_total
FROM sales s
JOIN products p ON p.id = s.product_id
WHERE p.name = 'Laptop'
GROUP BY strftime('%Y-%m', s.sale_date), p.name",
    },
    SeedTask {
        name: "Recursive CTE",
        difficulty: "Hard",
        description: "Write a recursive common table expression to display the employee hierarchy. \
Show each employee with their manager and their level, where employees without a manager are level 1.",
        tables: &["employees", "departments"],
        result_schema: &[
            ("employee_id", "INTEGER", "Employee ID"),
            ("employee_name", "VARCHAR", "Employee name"),
            ("department_id", "INTEGER", "Department ID"),
            ("manager_employee_id", "INTEGER", "Manager's employee ID (NULL for top level)"),
            ("level", "INTEGER", "Hierarchy level"),
        ],
        solution_query: "WITH RECURSIVE hierarchy (employee_id, employee_name, department_id, manager_employee_id, level) AS (
    SELECT id, name, department_id, manager_id, 1 FROM employees WHERE manager_id IS NULL
    UNION ALL
    SELECT e.id, e.name, e.department_id, e.manager_id, h.level + 1
    FROM employees e
    JOIN hierarchy h ON e.manager_id = h.employee_id
)
SELECT employee_id, employee_name, department_id, manager_employee_id, level FROM hierarchy",
    },
];

impl SeedTask {
    fn draft(&self) -> TaskDraft {
        TaskDraft {
            name: self.name.to_string(),
            difficulty: self.difficulty.to_string(),
            description: self.description.to_string(),
            columns_info: None,
            solution_query: self.solution_query.to_string(),
            tables: self.tables.iter().map(|t| t.to_string()).collect(),
            result_schema: Some(
                self.result_schema
                    .iter()
                    .map(|(name, column_type, description)| ResultColumn {
                        name: name.to_string(),
                        column_type: column_type.to_string(),
                        description: description.to_string(),
                    })
                    .collect(),
            ),
        }
    }
}

/// Seeds the built-in tasks when the task table is empty. Returns how many
/// tasks were created.
#[instrument(skip(pool, sandbox))]
pub async fn seed_tasks(pool: &Pool<Sqlite>, sandbox: &Sandbox) -> Result<usize, AppError> {
    if count_tasks(pool).await? > 0 {
        info!("Tasks already present, skipping seed");
        return Ok(0);
    }

    for seed in SEED_TASKS {
        let task = build_task(sandbox, seed.draft()).await?;
        create_task(pool, &task).await?;
    }

    info!(count = SEED_TASKS.len(), "Seeded tasks");
    Ok(SEED_TASKS.len())
}

#[instrument(skip(pool, admin), fields(username = %admin.username))]
pub async fn seed_admin(pool: &Pool<Sqlite>, admin: &SeedAdmin) -> Result<(), AppError> {
    if find_user_by_username(pool, &admin.username).await?.is_some() {
        return Ok(());
    }

    create_user(pool, &admin.username, &admin.email, &admin.password, true).await?;
    info!("Seeded admin account");
    Ok(())
}
