use std::iter::FusedIterator;

use rusqlite::{params, Connection, Row};

use crate::error::Result;
use crate::statement;

/// Row types a [`Cursor`] can walk. The id orders the walk.
pub trait Keyed {
    fn key(&self) -> i64;
}

/// Forward-only walk over the rows of one table matching a single key column.
///
/// Each step fetches one row with `id` greater than the previous one and
/// releases its statement before yielding, so the consumer may insert or delete
/// rows (including the yielded one) between steps. The statement must take the
/// key as `?1` and the last seen id as `?2`, e.g.
/// `... WHERE directory IS ?1 AND id > ?2 ORDER BY id LIMIT 1`.
///
/// After an error or the last row the cursor is exhausted for good.
pub struct Cursor<'c, T> {
    conn: &'c Connection,
    sql: &'static str,
    key: Option<i64>,
    last_id: i64,
    done: bool,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
}

impl<'c, T: Keyed> Cursor<'c, T> {
    pub(crate) fn new(
        conn: &'c Connection,
        sql: &'static str,
        key: Option<i64>,
        map: fn(&Row<'_>) -> rusqlite::Result<T>,
    ) -> Cursor<'c, T> {
        Cursor {
            conn,
            sql,
            key,
            last_id: 0,
            done: false,
            map,
        }
    }
}

impl<'c, T: Keyed> Iterator for Cursor<'c, T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Result<T>> {
        if self.done {
            return None;
        }

        match statement::row(self.conn, self.sql, params![self.key, self.last_id], self.map) {
            Ok(Some(item)) => {
                self.last_id = item.key();
                Some(Ok(item))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<'c, T: Keyed> FusedIterator for Cursor<'c, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Item {
        id: i64,
        name: String,
    }

    impl Keyed for Item {
        fn key(&self) -> i64 {
            self.id
        }
    }

    const SQL: &str = "SELECT id, name FROM items WHERE owner IS ?1 AND id > ?2 ORDER BY id LIMIT 1";

    fn item(row: &Row) -> rusqlite::Result<Item> {
        Ok(Item {
            id: row.get(0)?,
            name: row.get(1)?,
        })
    }

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE items (id INTEGER PRIMARY KEY, owner INTEGER, name TEXT);
            INSERT INTO items (owner, name) VALUES (1, 'a'), (NULL, 'b'), (1, 'c'), (2, 'd');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn walks_matching_rows_in_id_order() {
        let conn = conn();

        let names: Vec<String> = Cursor::new(&conn, SQL, Some(1), item)
            .map(|i| i.unwrap().name)
            .collect();
        assert_eq!(names, vec!["a", "c"]);

        let names: Vec<String> = Cursor::new(&conn, SQL, None, item)
            .map(|i| i.unwrap().name)
            .collect();
        assert_eq!(names, vec!["b"]);
    }

    #[test]
    fn tolerates_deleting_yielded_rows() {
        let conn = conn();

        let mut seen = 0;
        for i in Cursor::new(&conn, SQL, Some(1), item) {
            let i = i.unwrap();
            conn.execute("DELETE FROM items WHERE id = ?", params![i.id])
                .unwrap();
            seen += 1;
        }

        assert_eq!(seen, 2);
        let left: i64 = conn
            .query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))
            .unwrap();
        assert_eq!(left, 2);
    }

    #[test]
    fn stops_after_error() {
        let conn = conn();
        let mut cursor: Cursor<Item> = Cursor::new(
            &conn,
            "SELECT id, name FROM missing WHERE owner IS ?1 AND id > ?2",
            Some(1),
            item,
        );

        assert!(matches!(cursor.next(), Some(Err(_))));
        assert!(cursor.next().is_none());
    }
}
