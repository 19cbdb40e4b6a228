#[cfg(test)]
mod tests {
    use crate::compare::{ColumnDiff, column_diff, normalize_value, results_match};
    use crate::models::{ResultSet, Row};

    fn result(columns: &[&str], rows: &[&[Option<&str>]]) -> ResultSet {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let rows = rows
            .iter()
            .map(|values| {
                columns
                    .iter()
                    .cloned()
                    .zip(values.iter().map(|v| v.map(String::from)))
                    .collect::<Row>()
            })
            .collect();
        ResultSet::new(columns, rows)
    }

    #[test]
    fn test_identical_results_match() {
        let expected = result(
            &["id", "name"],
            &[&[Some("1"), Some("John Doe")], &[Some("2"), Some("Jane Smith")]],
        );
        assert!(results_match(&expected.clone(), &expected));
    }

    #[test]
    fn test_row_order_is_ignored() {
        let actual = result(
            &["id", "name"],
            &[&[Some("2"), Some("Jane Smith")], &[Some("1"), Some("John Doe")]],
        );
        let expected = result(
            &["id", "name"],
            &[&[Some("1"), Some("John Doe")], &[Some("2"), Some("Jane Smith")]],
        );
        assert!(results_match(&actual, &expected));
    }

    #[test]
    fn test_column_order_and_case_are_ignored() {
        let actual = result(&["NAME", "Id"], &[&[Some("John Doe"), Some("1")]]);
        let expected = result(&["id", "name"], &[&[Some("1"), Some("John Doe")]]);
        assert!(results_match(&actual, &expected));
    }

    #[test]
    fn test_row_count_mismatch() {
        let actual = result(&["id"], &[&[Some("1")]]);
        let expected = result(&["id"], &[&[Some("1")], &[Some("2")]]);
        assert!(!results_match(&actual, &expected));
    }

    #[test]
    fn test_column_set_mismatch() {
        let actual = result(&["id", "salary"], &[&[Some("1"), Some("5000")]]);
        let expected = result(&["id", "name"], &[&[Some("1"), Some("John Doe")]]);
        assert!(!results_match(&actual, &expected));
    }

    #[test]
    fn test_value_mismatch() {
        let actual = result(&["id", "name"], &[&[Some("1"), Some("John")]]);
        let expected = result(&["id", "name"], &[&[Some("1"), Some("John Doe")]]);
        assert!(!results_match(&actual, &expected));
    }

    #[test]
    fn test_null_differs_from_text() {
        let actual = result(&["manager_id"], &[&[None]]);
        let expected = result(&["manager_id"], &[&[Some("None")]]);
        assert!(!results_match(&actual, &expected));

        let both_null = result(&["manager_id"], &[&[None]]);
        assert!(results_match(&actual, &both_null));
    }

    #[test]
    fn test_empty_results_with_same_columns_match() {
        let actual = result(&["id", "name"], &[]);
        let expected = result(&["name", "id"], &[]);
        assert!(results_match(&actual, &expected));

        let other_columns = result(&["id"], &[]);
        assert!(!results_match(&other_columns, &expected));
    }

    #[test]
    fn test_timestamps_compare_equal_to_dates() {
        let actual = result(&["hire_date"], &[&[Some("2020-01-15 00:00:00")]]);
        let expected = result(&["hire_date"], &[&[Some("2020-01-15")]]);
        assert!(results_match(&actual, &expected));

        // date-shaped values in columns without "date" in the name
        let actual = result(&["started"], &[&[Some("2022-01-01T09:30:00")]]);
        let expected = result(&["started"], &[&[Some("2022-01-01")]]);
        assert!(results_match(&actual, &expected));
    }

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value("hire_date", None), None);
        assert_eq!(
            normalize_value("Hire_Date", Some("2020-01-15 12:00:00")),
            Some("2020-01-15".to_string())
        );
        assert_eq!(
            normalize_value("sale_date", Some("2023-01")),
            Some("2023-01".to_string())
        );
        assert_eq!(
            normalize_value("name", Some("John Doe Junior")),
            Some("John Doe Junior".to_string())
        );
        // long text in a date column is cut as well
        assert_eq!(
            normalize_value("update_date", Some("not a date at all")),
            Some("not a date".to_string())
        );
        // the value shape alone marks it as a date
        assert_eq!(
            normalize_value("created", Some("2020-01-15T10:00:00")),
            Some("2020-01-15".to_string())
        );
        assert_eq!(
            normalize_value("note", Some("2020-01-15")),
            Some("2020-01-15".to_string())
        );
        assert_eq!(
            normalize_value("note", Some("2020-1-15 and more")),
            Some("2020-1-15 and more".to_string())
        );
    }

    #[test]
    fn test_column_diff() {
        let actual = result(&["id", "Name", "bonus"], &[]);
        let expected = result(&["id", "name", "salary", "hire_date"], &[]);

        let diff = column_diff(&actual, &expected);
        assert_eq!(
            diff,
            ColumnDiff {
                missing: vec!["hire_date".to_string(), "salary".to_string()],
                extra: vec!["bonus".to_string()],
            }
        );
        assert_eq!(
            diff.describe(),
            " Missing columns: hire_date, salary. Extra columns: bonus."
        );
        assert!(column_diff(&expected, &expected).is_empty());
    }
}
