#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use crate::sandbox::{Sandbox, SandboxError, statement_count};

    async fn sandbox() -> Sandbox {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory database");
        let sandbox = Sandbox::new(pool);
        sandbox.bootstrap().await.expect("sandbox seeds");
        sandbox
    }

    #[rocket::async_test]
    async fn test_bootstrap_is_idempotent() {
        let sandbox = sandbox().await;
        sandbox.bootstrap().await.expect("second bootstrap");

        let result = sandbox
            .execute("SELECT COUNT(*) AS total FROM employees")
            .await
            .expect("query runs");
        assert_eq!(result.rows[0].get("total"), Some(&Some("10".to_string())));
    }

    #[rocket::async_test]
    async fn test_execute_stringifies_values() {
        let sandbox = sandbox().await;

        let result = sandbox
            .execute(
                "SELECT id AS ID, name, manager_id, hire_date, salary * 1.5 AS bonus
                 FROM employees WHERE id = 1",
            )
            .await
            .expect("query runs");

        assert_eq!(
            result.columns,
            vec!["id", "name", "manager_id", "hire_date", "bonus"]
        );
        let row = &result.rows[0];
        assert_eq!(row.get("id"), Some(&Some("1".to_string())));
        assert_eq!(row.get("name"), Some(&Some("John Doe".to_string())));
        assert_eq!(row.get("manager_id"), Some(&None));
        assert_eq!(row.get("hire_date"), Some(&Some("2020-01-15".to_string())));
        assert_eq!(row.get("bonus"), Some(&Some("7500".to_string())));
    }

    #[rocket::async_test]
    async fn test_empty_result_keeps_columns() {
        let sandbox = sandbox().await;

        let result = sandbox
            .execute("SELECT id, name FROM departments WHERE id > 100")
            .await
            .expect("query runs");

        assert!(result.is_empty());
        assert_eq!(result.columns, vec!["id", "name"]);
    }

    #[rocket::async_test]
    async fn test_changes_are_rolled_back() {
        let sandbox = sandbox().await;

        let result = sandbox
            .execute("DELETE FROM sales RETURNING id")
            .await
            .expect("statement runs");
        assert_eq!(result.len(), 15);

        let remaining = sandbox
            .execute("SELECT COUNT(*) AS total FROM sales")
            .await
            .expect("query runs");
        assert_eq!(remaining.rows[0].get("total"), Some(&Some("15".to_string())));
    }

    #[rocket::async_test]
    async fn test_statement_that_commits_cannot_persist_changes() {
        let sandbox = sandbox().await;

        let result = sandbox
            .execute(
                "REPLACE INTO employees (id, name, department_id, salary, hire_date)
                 VALUES (1, 'Hacked', 1, 0, '2020-01-15'); END",
            )
            .await;
        assert!(matches!(result, Err(SandboxError::MultipleStatements)));

        let name = sandbox
            .execute("SELECT name FROM employees WHERE id = 1")
            .await
            .expect("query runs");
        assert_eq!(name.rows[0].get("name"), Some(&Some("John Doe".to_string())));
    }

    #[rocket::async_test]
    async fn test_single_statement_with_semicolons_runs() {
        let sandbox = sandbox().await;

        let result = sandbox
            .execute("SELECT name FROM employees WHERE name <> 'a;b' ORDER BY id LIMIT 1;")
            .await
            .expect("query runs");
        assert_eq!(result.rows[0].get("name"), Some(&Some("John Doe".to_string())));
    }

    #[test]
    fn test_statement_count() {
        assert_eq!(statement_count(""), 0);
        assert_eq!(statement_count("SELECT 1"), 1);
        assert_eq!(statement_count("SELECT 1;  ;\n"), 1);
        assert_eq!(statement_count("SELECT 1; END"), 2);
        assert_eq!(statement_count("SELECT 'it''s; fine'"), 1);
        assert_eq!(statement_count(r#"SELECT "a;b", [c;d], `e;f`"#), 1);
        assert_eq!(statement_count("SELECT 1 -- ; END\n"), 1);
        assert_eq!(statement_count("SELECT 1 /* ; END */"), 1);
        assert_eq!(statement_count("SELECT 1; -- trailing comment"), 1);
        assert_eq!(statement_count("SELECT 1 /* x */; COMMIT"), 2);
    }

    #[rocket::async_test]
    async fn test_execution_error_is_reported() {
        let sandbox = sandbox().await;
        assert!(sandbox.execute("SELECT * FROM missing_table").await.is_err());
        assert!(sandbox.execute("SELEC id FROM employees").await.is_err());
    }

    #[rocket::async_test]
    async fn test_catalog_lists_tables_with_constraints() {
        let sandbox = sandbox().await;

        let names = sandbox.table_names().await.expect("catalog");
        assert_eq!(
            names,
            vec![
                "customers",
                "departments",
                "employee_projects",
                "employees",
                "products",
                "projects",
                "sales"
            ]
        );

        let tables = sandbox.tables().await.expect("catalog");
        let sales = tables
            .iter()
            .find(|t| t.table_name == "sales")
            .expect("sales listed");

        let constraints = |name: &str| {
            sales
                .columns
                .iter()
                .find(|c| c.name == name)
                .map(|c| c.constraints.clone())
        };
        assert_eq!(constraints("id"), Some("PRIMARY KEY".to_string()));
        assert_eq!(constraints("product_id"), Some("FOREIGN KEY".to_string()));
        assert_eq!(constraints("sale_date"), Some("NOT NULL".to_string()));

        let amount = sales
            .columns
            .iter()
            .find(|c| c.name == "amount")
            .expect("amount listed");
        assert_eq!(amount.column_type, "DECIMAL(10,2)");
    }
}
