//! Pre-execution checks on learner SQL.
//!
//! Word matching only: comments, string literals and quoting are not
//! understood, so this filters honest mistakes rather than enforcing isolation.
//! Isolation comes from running every query in the sandbox database as a single
//! statement inside a rolled back transaction.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Application tables a learner query may never mention, plus SQLite's own
/// catalog tables.
pub const SYSTEM_TABLES: &[&str] = &[
    "users",
    "user_progress",
    "tasks",
    "expected_results",
    "schema_tables",
    "schema_columns",
    "result_schemas",
    "sqlite_master",
    "sqlite_schema",
    "sqlite_sequence",
];

pub const FORBIDDEN_KEYWORDS: &[&str] = &[
    "drop",
    "truncate",
    "delete",
    "update",
    "insert",
    "alter",
    "create",
    "grant",
    "revoke",
    "commit",
    "rollback",
    "savepoint",
];

static SYSTEM_TABLE_PATTERNS: Lazy<Vec<(&'static str, Regex)>> =
    Lazy::new(|| compile_words(SYSTEM_TABLES));

static KEYWORD_PATTERNS: Lazy<Vec<(&'static str, Regex)>> =
    Lazy::new(|| compile_words(FORBIDDEN_KEYWORDS));

fn compile_words(words: &[&'static str]) -> Vec<(&'static str, Regex)> {
    words
        .iter()
        .filter_map(|word| whole_word(word).map(|re| (*word, re)))
        .collect()
}

fn whole_word(word: &str) -> Option<Regex> {
    Regex::new(&format!(r"\b{}\b", regex::escape(&word.to_lowercase()))).ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Query cannot be empty")]
    Empty,

    #[error("Unknown task: {0}")]
    UnknownTask(i64),

    #[error("Query references a restricted system table: {0}")]
    SystemTable(String),

    #[error("Query references tables that are not part of this task: {}", .0.join(", "))]
    DisallowedTables(Vec<String>),

    #[error("Query contains a forbidden operation: {0}")]
    ForbiddenKeyword(String),
}

/// Table whitelist for one gate check.
#[derive(Debug, Clone, Default)]
pub struct TablePolicy {
    allowed: BTreeSet<String>,
    known: BTreeSet<String>,
}

impl TablePolicy {
    /// `known` is every table name the gate looks for; anything found there but
    /// not in `allowed` is rejected. Allowed names always count as known.
    pub fn new<A, K>(allowed: A, known: K) -> Self
    where
        A: IntoIterator,
        A::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        let allowed: BTreeSet<String> = allowed
            .into_iter()
            .map(|t| t.as_ref().to_lowercase())
            .collect();
        let mut known: BTreeSet<String> = known
            .into_iter()
            .map(|t| t.as_ref().to_lowercase())
            .collect();
        known.extend(allowed.iter().cloned());

        Self { allowed, known }
    }
}

/// Checks `query` against the policy of a task. `None` means the task has no
/// table list, which only happens for task ids that do not exist.
pub fn check(query: &str, task_id: i64, policy: Option<&TablePolicy>) -> Result<(), Rejection> {
    if query.trim().is_empty() {
        return Err(Rejection::Empty);
    }

    let policy = policy.ok_or(Rejection::UnknownTask(task_id))?;
    check_with_policy(query, policy)
}

/// Same as [`check`] for callers that already hold a policy, such as the
/// admin console.
pub fn check_with_policy(query: &str, policy: &TablePolicy) -> Result<(), Rejection> {
    if query.trim().is_empty() {
        return Err(Rejection::Empty);
    }

    let lowered = query.to_lowercase();

    if let Some((table, _)) = SYSTEM_TABLE_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(&lowered))
    {
        return Err(Rejection::SystemTable(table.to_string()));
    }

    let disallowed: Vec<String> = policy
        .known
        .iter()
        .filter(|table| !policy.allowed.contains(*table))
        .filter(|table| whole_word(table).is_some_and(|re| re.is_match(&lowered)))
        .cloned()
        .collect();

    if !disallowed.is_empty() {
        return Err(Rejection::DisallowedTables(disallowed));
    }

    if let Some((keyword, _)) = KEYWORD_PATTERNS.iter().find(|(_, re)| re.is_match(&lowered)) {
        return Err(Rejection::ForbiddenKeyword(keyword.to_string()));
    }

    Ok(())
}
