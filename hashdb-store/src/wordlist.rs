use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, params};
use tracing::debug;

use crate::IMPORT_BATCH_SIZE;
use crate::error::Error;
use crate::import::{insert_batch, table_exists};

/// Read-mostly storage for candidate passwords.
///
/// Candidates are paged back in stable insertion order, so duplicates in
/// the imported corpus are preserved and a corpus far larger than memory
/// can be streamed batch by batch.
pub struct WordlistStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl WordlistStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        Ok(Self { conn: Mutex::new(conn), path })
    }

    /// Total number of stored candidates.
    pub fn count(&self) -> Result<u64, Error> {
        let conn = self.conn.lock().unwrap();
        if !table_exists(&conn, "PlainTextPasswords")? {
            return Err(Error::TableMissing {
                table: "PlainTextPasswords".into(),
                path: self.path.clone(),
            });
        }
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM PlainTextPasswords", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Returns up to `limit` candidates starting at `offset`, in stored
    /// order. An empty page means the corpus is exhausted, not an error.
    ///
    /// Candidates come back as raw bytes: rows written by another tool
    /// with a different encoding are handed to the caller unmodified
    /// rather than rejected here.
    pub fn page(&self, offset: u64, limit: usize) -> Result<Vec<Vec<u8>>, Error> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT password FROM PlainTextPasswords ORDER BY id LIMIT ?1 OFFSET ?2")?;
        let rows = stmt.query_map(params![limit as i64, offset as i64], |row| {
            Ok(match row.get_ref(0)? {
                ValueRef::Text(text) => text.to_vec(),
                ValueRef::Blob(blob) => blob.to_vec(),
                _ => Vec::new(),
            })
        })?;
        let mut candidates = Vec::new();
        for row in rows {
            candidates.push(row?);
        }
        Ok(candidates)
    }

    /// Imports a wordlist file, one candidate per line, creating the table
    /// on first use. Lines are decoded lossily (a wordlist with stray
    /// non-UTF-8 bytes should not abort the import) and blank lines are
    /// skipped. Returns the number of rows added.
    pub fn import_words(&self, mut reader: impl BufRead) -> Result<u64, Error> {
        let mut conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS PlainTextPasswords (
                id INTEGER PRIMARY KEY,
                password TEXT);",
        )?;

        let sql = "INSERT INTO PlainTextPasswords (password) VALUES (?1)";
        let mut batch = Vec::with_capacity(IMPORT_BATCH_SIZE);
        let mut added = 0u64;
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            let word = String::from_utf8_lossy(&line);
            let word = word.trim();
            if word.is_empty() {
                continue;
            }
            batch.push(word.to_string());
            if batch.len() >= IMPORT_BATCH_SIZE {
                added += insert_batch(&mut conn, sql, &mut batch)?;
            }
        }
        if !batch.is_empty() {
            added += insert_batch(&mut conn, sql, &mut batch)?;
        }
        debug!(added, "imported candidates");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn store() -> (tempfile::TempDir, WordlistStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = WordlistStore::open(dir.path().join("words.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn import_preserves_order_and_duplicates() {
        let (_dir, store) = store();
        let added = store.import_words(Cursor::new("alpha\n\nbeta\nalpha\n")).unwrap();
        assert_eq!(added, 3);
        assert_eq!(store.count().unwrap(), 3);

        let page = store.page(0, 10).unwrap();
        assert_eq!(page, vec![b"alpha".to_vec(), b"beta".to_vec(), b"alpha".to_vec()]);
    }

    #[test]
    fn pages_are_stable_windows() {
        let (_dir, store) = store();
        store.import_words(Cursor::new("a\nb\nc\nd\ne\n")).unwrap();

        assert_eq!(store.page(1, 2).unwrap(), vec![b"b".to_vec(), b"c".to_vec()]);
        assert_eq!(store.page(4, 2).unwrap(), vec![b"e".to_vec()]);
        assert!(store.page(5, 2).unwrap().is_empty());
    }

    #[test]
    fn lines_are_trimmed() {
        let (_dir, store) = store();
        store.import_words(Cursor::new("  spaced  \r\ntabbed\t\n")).unwrap();
        assert_eq!(store.page(0, 10).unwrap(), vec![b"spaced".to_vec(), b"tabbed".to_vec()]);
    }

    #[test]
    fn count_without_table_is_reported() {
        let (_dir, store) = store();
        let err = store.count().unwrap_err();
        assert!(matches!(err, Error::TableMissing { .. }));
    }
}
