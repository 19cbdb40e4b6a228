//! Result comparison for submitted solutions.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::models::{ResultSet, Row};

const DATE_PREFIX_LEN: usize = 10;

static DATE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}").expect("date prefix pattern is valid"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnDiff {
    pub missing: Vec<String>,
    pub extra: Vec<String>,
}

impl ColumnDiff {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }

    /// Human readable suffix, e.g. ` Missing columns: a, b. Extra columns: c.`
    pub fn describe(&self) -> String {
        let mut message = String::new();
        if !self.missing.is_empty() {
            message.push_str(&format!(" Missing columns: {}.", self.missing.join(", ")));
        }
        if !self.extra.is_empty() {
            message.push_str(&format!(" Extra columns: {}.", self.extra.join(", ")));
        }
        message
    }
}

fn column_set(columns: &[String]) -> BTreeSet<String> {
    columns.iter().map(|c| c.to_lowercase()).collect()
}

pub fn column_diff(actual: &ResultSet, expected: &ResultSet) -> ColumnDiff {
    let actual = column_set(&actual.columns);
    let expected = column_set(&expected.columns);

    ColumnDiff {
        missing: expected.difference(&actual).cloned().collect(),
        extra: actual.difference(&expected).cloned().collect(),
    }
}

fn is_date_like(column: &str, value: &str) -> bool {
    value.chars().count() > DATE_PREFIX_LEN
        && (column.contains("date") || DATE_PREFIX.is_match(value))
}

/// Normalizes one cell: timestamps such as `2020-01-15 00:00:00` compare equal
/// to the plain date `2020-01-15`.
pub fn normalize_value(column: &str, value: Option<&str>) -> Option<String> {
    let column = column.to_lowercase();
    value.map(|v| {
        if is_date_like(&column, v) {
            v.chars().take(DATE_PREFIX_LEN).collect()
        } else {
            v.to_string()
        }
    })
}

fn normalize_row(row: &Row) -> Row {
    row.iter()
        .map(|(column, value)| {
            (
                column.to_lowercase(),
                normalize_value(column, value.as_deref()),
            )
        })
        .collect()
}

fn sorted_rows(rows: &[Row], key_columns: &[String]) -> Vec<Row> {
    let mut normalized: Vec<Row> = rows.iter().map(normalize_row).collect();
    normalized.sort_by_cached_key(|row| {
        key_columns
            .iter()
            .map(|column| row.get(column).cloned().flatten())
            .collect::<Vec<Option<String>>>()
    });
    normalized
}

/// True when both result sets hold the same rows under the same column names,
/// ignoring row order and column-name case.
pub fn results_match(actual: &ResultSet, expected: &ResultSet) -> bool {
    if actual.len() != expected.len() {
        debug!(
            actual = actual.len(),
            expected = expected.len(),
            "Row count mismatch"
        );
        return false;
    }

    let expected_columns = column_set(&expected.columns);
    if column_set(&actual.columns) != expected_columns {
        debug!("Column set mismatch");
        return false;
    }

    if actual.is_empty() {
        return true;
    }

    let key_columns: Vec<String> = expected_columns.into_iter().collect();
    let actual_rows = sorted_rows(&actual.rows, &key_columns);
    let expected_rows = sorted_rows(&expected.rows, &key_columns);

    actual_rows
        .iter()
        .zip(expected_rows.iter())
        .all(|(a, e)| a == e)
}
