use rusqlite::OptionalExtension;
use rusqlite::{params, Connection, Result};

use crate::schema;

/// Returns the schema version stored in the database, if any.
pub fn schema_version(conn: &Connection) -> Result<Option<u32>> {
    conn.execute_batch(schema::META_SCHEMA)?;

    conn.query_row("SELECT value FROM meta WHERE key = 'schema'", [], |row| {
        row.get(0)
    })
    .optional()
}

/// Creates `schema` on an empty database, or checks that an existing one is
/// current. Returns `false` when the stored version doesn't match.
pub fn ensure_schema(conn: &mut Connection, schema: &str) -> Result<bool> {
    trace!("trying to get schema version");

    match schema_version(conn)? {
        Some(version) if version == schema::SCHEMA_VERSION => {
            trace!("schema version {}", version);
            Ok(true)
        }
        Some(version) => {
            error!(
                "schema version {} doesn't match expected {}",
                version,
                schema::SCHEMA_VERSION
            );
            Ok(false)
        }
        None => {
            info!("initializing schema version {}", schema::SCHEMA_VERSION);

            let tx = conn.transaction()?;
            tx.execute_batch(schema)?;
            tx.execute(
                "INSERT INTO meta (key, value) VALUES ('schema', ?)",
                params![schema::SCHEMA_VERSION],
            )?;
            tx.commit()?;

            Ok(true)
        }
    }
}
