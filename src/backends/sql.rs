// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Read-only SQLite query executor.
//!
//! Rows are rendered the way a Python DB-API client prints `cursor.fetchall()`:
//! `[('Foo', 1), ('Bar', None)]`. The response synthesizer parses that format back.

use async_trait::async_trait;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

#[cfg(feature = "telemetry")]
use tracing::debug;

use crate::error::BackendError;
use crate::response::literal::PyValue;
use crate::telemetry::BackendSpan;

use super::QueryExecutor;

/// Rows beyond this are dropped.
pub const MAX_ROWS: usize = 200;

/// Text values longer than this many characters are cut and suffixed with `...`.
pub const MAX_VALUE_CHARS: usize = 300;

#[derive(Debug, Clone, Default)]
pub struct SqliteExecutor;

impl SqliteExecutor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl QueryExecutor for SqliteExecutor {
    async fn run(&self, store: &Path, query: &str) -> Result<String, BackendError> {
        if !store.is_file() {
            return Err(BackendError::NotConfigured(format!(
                "source database {} does not exist",
                store.display()
            )));
        }

        let span = BackendSpan::start("sqlite");
        let store = store.to_path_buf();
        let query = query.to_string();

        let result = tokio::task::spawn_blocking(move || query_rows(&store, &query))
            .await
            .map_err(|e| BackendError::QueryFailed(format!("query task failed: {e}")))
            .and_then(|r| r);

        #[cfg(feature = "telemetry")]
        debug!(ok = result.is_ok(), "SQLite query finished");

        span.finish_with_result(&result);
        result
    }
}

/// Open `store` read-only and render the rows `query` returns.
pub fn query_rows(store: &Path, query: &str) -> Result<String, BackendError> {
    let conn = Connection::open_with_flags(
        store,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    let mut stmt = conn.prepare(query)?;
    let columns = stmt.column_count();
    let mut rows = stmt.query([])?;

    let mut rendered = Vec::new();
    while let Some(row) = rows.next()? {
        if rendered.len() >= MAX_ROWS {
            break;
        }
        let mut values = Vec::with_capacity(columns);
        for idx in 0..columns {
            values.push(to_py(row.get_ref(idx)?));
        }
        rendered.push(PyValue::Tuple(values));
    }

    if rendered.is_empty() {
        return Err(BackendError::EmptyResult);
    }
    Ok(PyValue::List(rendered).repr())
}

fn to_py(value: ValueRef<'_>) -> PyValue {
    match value {
        ValueRef::Null => PyValue::None,
        ValueRef::Integer(i) => PyValue::Int(i.into()),
        ValueRef::Real(f) => PyValue::Float(f),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes);
            PyValue::Str(truncate_chars(&text, MAX_VALUE_CHARS).into_owned())
        }
        ValueRef::Blob(bytes) => PyValue::Bytes(bytes.to_vec()),
    }
}

fn truncate_chars(text: &str, max: usize) -> std::borrow::Cow<'_, str> {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]).into(),
        None => text.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, std::path::PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE uml_class (name TEXT, attributes INTEGER, weight REAL, note TEXT, raw BLOB);
             INSERT INTO uml_class VALUES ('Foo', 1, 0.5, NULL, x'00ff');
             INSERT INTO uml_class VALUES ('Bar', 2, 2.0, 'it''s', NULL);",
        )
        .unwrap();
        (dir, path)
    }

    #[tokio::test]
    async fn test_rows_render_as_python_literal() {
        let (_dir, path) = store();
        let out = SqliteExecutor::new()
            .run(&path, "SELECT name, attributes FROM uml_class ORDER BY rowid")
            .await
            .unwrap();
        assert_eq!(out, "[('Foo', 1), ('Bar', 2)]");
    }

    #[tokio::test]
    async fn test_single_column_and_special_values() {
        let (_dir, path) = store();
        let exec = SqliteExecutor::new();
        assert_eq!(
            exec.run(&path, "SELECT name FROM uml_class ORDER BY name").await.unwrap(),
            "[('Bar',), ('Foo',)]"
        );
        assert_eq!(
            exec.run(&path, "SELECT weight, note, raw FROM uml_class ORDER BY rowid")
                .await
                .unwrap(),
            "[(0.5, None, b'\\x00\\xff'), (2.0, \"it's\", None)]"
        );
    }

    #[tokio::test]
    async fn test_empty_result() {
        let (_dir, path) = store();
        let err = SqliteExecutor::new()
            .run(&path, "SELECT name FROM uml_class WHERE 0")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::EmptyResult));
    }

    #[tokio::test]
    async fn test_sql_error_and_read_only() {
        let (_dir, path) = store();
        let exec = SqliteExecutor::new();
        let err = exec.run(&path, "SELEC nonsense").await.unwrap_err();
        assert!(matches!(err, BackendError::QueryFailed(_)));

        let err = exec.run(&path, "DELETE FROM uml_class").await.unwrap_err();
        assert!(matches!(err, BackendError::QueryFailed(_)));
        assert!(exec.run(&path, "SELECT count(*) FROM uml_class").await.unwrap() == "[(2,)]");
    }

    #[tokio::test]
    async fn test_missing_store() {
        let err = SqliteExecutor::new()
            .run(Path::new("/definitely/not/here.db"), "SELECT 1")
            .await
            .unwrap_err();
        assert!(err.is_precondition());
    }

    #[tokio::test]
    async fn test_row_cap() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("n.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE n (v INTEGER);
             WITH RECURSIVE c(x) AS (SELECT 1 UNION ALL SELECT x + 1 FROM c WHERE x < 500)
             INSERT INTO n SELECT x FROM c;",
        )
        .unwrap();
        let out = SqliteExecutor::new().run(&path, "SELECT v FROM n").await.unwrap();
        assert_eq!(out.matches(",)").count(), MAX_ROWS);
    }

    #[tokio::test]
    async fn test_text_is_quoted_and_truncated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.db");
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE t (v TEXT, r REAL);
             INSERT INTO t VALUES ('both '' and \"', 1e400);",
        )
        .unwrap();
        conn.execute("INSERT INTO t VALUES (?1, NULL)", ["é".repeat(MAX_VALUE_CHARS + 5)])
            .unwrap();
        let exec = SqliteExecutor::new();

        assert_eq!(
            exec.run(&path, "SELECT v, r FROM t WHERE r IS NOT NULL").await.unwrap(),
            "[('both \\' and \"', inf)]"
        );
        let long = exec.run(&path, "SELECT v FROM t WHERE r IS NULL").await.unwrap();
        assert_eq!(long, format!("[('{}...',)]", "é".repeat(MAX_VALUE_CHARS)));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 3), "abc...");
        assert_eq!(truncate_chars("abc", 3), "abc");
    }
}
