use rusqlite::{Connection, params};

use crate::error::Error;

/// Runs `sql` once per value in `batch` inside a single transaction,
/// draining the batch. Returns the number of rows actually added.
pub(crate) fn insert_batch(
    conn: &mut Connection,
    sql: &str,
    batch: &mut Vec<String>,
) -> Result<u64, Error> {
    let tx = conn.transaction()?;
    let mut added = 0u64;
    {
        let mut stmt = tx.prepare(sql)?;
        for value in batch.drain(..) {
            added += stmt.execute(params![value])? as u64;
        }
    }
    tx.commit()?;
    Ok(added)
}

/// True when `table` exists in the connected database.
pub(crate) fn table_exists(conn: &Connection, table: &str) -> Result<bool, Error> {
    let mut stmt =
        conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1")?;
    Ok(stmt.exists(params![table])?)
}
