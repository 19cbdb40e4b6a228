#[cfg(test)]
mod tests {
    use crate::gate::{Rejection, TablePolicy, check, check_with_policy};

    const SANDBOX: &[&str] = &[
        "departments",
        "employees",
        "projects",
        "employee_projects",
        "products",
        "customers",
        "sales",
    ];

    fn employees_only() -> TablePolicy {
        TablePolicy::new(["employees"], SANDBOX)
    }

    #[test]
    fn test_accepts_query_on_allowed_table() {
        let policy = employees_only();
        assert_eq!(check("SELECT * FROM employees", 1, Some(&policy)), Ok(()));
        assert_eq!(
            check("select name, salary from EMPLOYEES where salary > 5000", 1, Some(&policy)),
            Ok(())
        );
    }

    #[test]
    fn test_rejects_empty_query() {
        let policy = employees_only();
        assert_eq!(check("", 1, Some(&policy)), Err(Rejection::Empty));
        assert_eq!(check("   \n\t", 1, Some(&policy)), Err(Rejection::Empty));
    }

    #[test]
    fn test_rejects_unknown_task() {
        assert_eq!(
            check("SELECT * FROM employees", 99, None),
            Err(Rejection::UnknownTask(99))
        );
    }

    #[test]
    fn test_empty_check_runs_before_unknown_task() {
        assert_eq!(check(" ", 99, None), Err(Rejection::Empty));
    }

    #[test]
    fn test_rejects_system_tables() {
        let policy = employees_only();

        for table in ["users", "user_progress", "expected_results", "sqlite_master"] {
            let query = format!("SELECT * FROM employees JOIN {} ON 1 = 1", table);
            assert_eq!(
                check(&query, 1, Some(&policy)),
                Err(Rejection::SystemTable(table.to_string())),
                "{} should be restricted",
                table
            );
        }
    }

    #[test]
    fn test_rejects_tables_outside_task_sorted() {
        let policy = employees_only();
        let result = check(
            "SELECT * FROM employees e JOIN sales s ON 1 = 1 JOIN departments d ON 1 = 1",
            1,
            Some(&policy),
        );

        assert_eq!(
            result,
            Err(Rejection::DisallowedTables(vec![
                "departments".to_string(),
                "sales".to_string()
            ]))
        );

        let message = result.unwrap_err().to_string();
        assert!(message.ends_with("departments, sales"), "{}", message);
    }

    #[test]
    fn test_rejects_forbidden_keywords() {
        let policy = employees_only();

        for (query, keyword) in [
            ("DROP TABLE employees", "drop"),
            ("DELETE FROM employees", "delete"),
            ("UPDATE employees SET salary = 0", "update"),
            ("SELECT * FROM employees; COMMIT", "commit"),
            ("SAVEPOINT a", "savepoint"),
        ] {
            assert_eq!(
                check(query, 1, Some(&policy)),
                Err(Rejection::ForbiddenKeyword(keyword.to_string())),
                "{}",
                query
            );
        }
    }

    #[test]
    fn test_matches_whole_words_only() {
        let policy = employees_only();

        // updated_at / created_by / users_count contain restricted words as substrings
        assert_eq!(
            check(
                "SELECT name AS updated_at, salary AS created_by, id AS users_count FROM employees",
                1,
                Some(&policy)
            ),
            Ok(())
        );
    }

    #[test]
    fn test_table_names_inside_identifiers_are_not_tables() {
        let policy = TablePolicy::new(["employee_projects"], SANDBOX);

        assert_eq!(
            check("SELECT project_id FROM employee_projects", 1, Some(&policy)),
            Ok(())
        );
    }

    #[test]
    fn test_system_tables_checked_before_disallowed_tables() {
        let policy = employees_only();

        assert_eq!(
            check("SELECT * FROM sales, users", 1, Some(&policy)),
            Err(Rejection::SystemTable("users".to_string()))
        );
    }

    #[test]
    fn test_disallowed_tables_checked_before_keywords() {
        let policy = employees_only();

        assert!(matches!(
            check("DELETE FROM sales", 1, Some(&policy)),
            Err(Rejection::DisallowedTables(_))
        ));
    }

    #[test]
    fn test_policy_is_case_insensitive() {
        let policy = TablePolicy::new(["Employees"], ["SALES", "Employees"]);

        assert_eq!(check_with_policy("SELECT * FROM employees", &policy), Ok(()));
        assert!(check_with_policy("SELECT * FROM Sales", &policy).is_err());
    }
}
