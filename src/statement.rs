//! Single-statement helpers. Every call prepares (through the connection's
//! statement cache), binds, steps and releases its statement before returning,
//! and logs the statement text when the engine refuses it.

use rusqlite::{Connection, OptionalExtension, Params, Row, Statement};

use crate::error::Result;

/// Prepares a one-off statement, bypassing the cache. Used for generated SQL.
pub(crate) fn prepare<'c>(conn: &'c Connection, sql: &str) -> Result<Statement<'c>> {
    Ok(conn.prepare(sql).map_err(|e| {
        error!("can't prepare '{}': {}", sql, e);
        e
    })?)
}

/// Runs a statement that produces no rows, returning the number of changed rows.
pub(crate) fn execute<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<usize> {
    let mut st = conn.prepare_cached(sql).map_err(|e| {
        error!("can't prepare '{}': {}", sql, e);
        e
    })?;

    Ok(st.execute(params).map_err(|e| {
        error!("step failed for '{}': {}", sql, e);
        e
    })?)
}

/// Runs a statement and returns the integer in the first column of its first
/// row. A missing row and a NULL value both yield `None`.
pub(crate) fn scalar<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Option<i64>> {
    let value: Option<Option<i64>> = row(conn, sql, params, |row| row.get(0))?;
    Ok(value.flatten())
}

/// Runs a statement and maps its first row, if there is one.
pub(crate) fn row<T, P, F>(conn: &Connection, sql: &str, params: P, f: F) -> Result<Option<T>>
where
    P: Params,
    F: FnOnce(&Row<'_>) -> rusqlite::Result<T>,
{
    let mut st = conn.prepare_cached(sql).map_err(|e| {
        error!("can't prepare '{}': {}", sql, e);
        e
    })?;

    Ok(st.query_row(params, f).optional().map_err(|e| {
        error!("step failed for '{}': {}", sql, e);
        e
    })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rusqlite::params;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (id INTEGER PRIMARY KEY, v INTEGER);")
            .unwrap();
        conn
    }

    #[test]
    fn scalar_distinguishes_missing_rows() {
        let conn = conn();
        execute(&conn, "INSERT INTO t (v) VALUES (?)", params![7]).unwrap();
        execute(&conn, "INSERT INTO t (v) VALUES (NULL)", []).unwrap();

        assert_eq!(
            scalar(&conn, "SELECT v FROM t WHERE id = ?", params![1]).unwrap(),
            Some(7)
        );
        assert_eq!(
            scalar(&conn, "SELECT v FROM t WHERE id = ?", params![2]).unwrap(),
            None
        );
        assert_eq!(
            scalar(&conn, "SELECT v FROM t WHERE id = ?", params![3]).unwrap(),
            None
        );
    }

    #[test]
    fn execute_reports_changes() {
        let conn = conn();
        execute(&conn, "INSERT INTO t (v) VALUES (1), (2), (3)", []).unwrap();

        assert_eq!(execute(&conn, "DELETE FROM t WHERE v > ?", params![1]).unwrap(), 2);
    }

    #[test]
    fn bad_sql_is_an_error() {
        let conn = conn();

        match scalar(&conn, "SELECT nope FROM t", []) {
            Err(Error::Database(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
