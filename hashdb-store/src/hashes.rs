use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::IMPORT_BATCH_SIZE;
use crate::error::Error;
use crate::import::{insert_batch, table_exists};

/// Storage for target digests and recovered matches.
///
/// One database file holds a table of outstanding digests per algorithm
/// plus the shared `KnownHashes` table mapping recovered digests back to
/// their plaintext.
pub struct HashStore {
    conn: Mutex<Connection>,
    path: PathBuf,
}

impl HashStore {
    /// Opens (or creates) a hash database, bootstrapping the `KnownHashes`
    /// table so match recording always has somewhere to write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open(&path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS KnownHashes (
                id INTEGER PRIMARY KEY,
                hash TEXT UNIQUE,
                password TEXT,
                hash_type TEXT);
            CREATE INDEX IF NOT EXISTS idx_known_hash ON KnownHashes(hash);",
        )?;
        Ok(Self { conn: Mutex::new(conn), path })
    }

    /// Name of the table holding outstanding digests for `algorithm`.
    pub fn target_table(algorithm: &str) -> String {
        format!("{algorithm}hashes")
    }

    /// Loads every digest for `algorithm` that has not been recovered yet.
    ///
    /// Digests are normalized to lowercase so mixed-case hash lists still
    /// match computed digests. A database without a table for `algorithm`
    /// is reported as [`Error::TableMissing`].
    pub fn unresolved(&self, algorithm: &str) -> Result<Vec<String>, Error> {
        let table = Self::target_table(algorithm);
        let conn = self.conn.lock().unwrap();
        if !table_exists(&conn, &table)? {
            return Err(Error::TableMissing { table, path: self.path.clone() });
        }
        let mut stmt = conn.prepare(&format!(
            "SELECT hash FROM {table} WHERE hash NOT IN (SELECT hash FROM KnownHashes)"
        ))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut digests = Vec::new();
        for row in rows {
            digests.push(row?.to_lowercase());
        }
        debug!(count = digests.len(), %table, "loaded unresolved digests");
        Ok(digests)
    }

    /// Records a recovered digest/plaintext pair.
    ///
    /// Returns `false` when the digest was already recorded; a duplicate
    /// write is not an error.
    pub fn record_match(
        &self,
        digest: &str,
        plaintext: &str,
        algorithm: &str,
    ) -> Result<bool, Error> {
        let conn = self.conn.lock().unwrap();
        let added = conn.execute(
            "INSERT OR IGNORE INTO KnownHashes (hash, password, hash_type) VALUES (?1, ?2, ?3)",
            params![digest, plaintext, algorithm],
        )?;
        Ok(added > 0)
    }

    /// Plaintext previously recorded for `digest`, if any.
    pub fn lookup(&self, digest: &str) -> Result<Option<String>, Error> {
        let conn = self.conn.lock().unwrap();
        let plaintext = conn
            .query_row(
                "SELECT password FROM KnownHashes WHERE hash = ?1",
                params![digest],
                |row| row.get(0),
            )
            .optional()?;
        Ok(plaintext)
    }

    /// Imports a line-oriented hash list for `algorithm`, creating its
    /// table on first use. Blank lines are skipped and digests are stored
    /// lowercase. Returns the number of new rows.
    pub fn import_digests(&self, algorithm: &str, reader: impl BufRead) -> Result<u64, Error> {
        let table = Self::target_table(algorithm);
        let mut conn = self.conn.lock().unwrap();
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id INTEGER PRIMARY KEY,
                hash TEXT UNIQUE);
            CREATE INDEX IF NOT EXISTS idx_{table} ON {table}(hash);"
        ))?;

        let sql = format!("INSERT OR IGNORE INTO {table} (hash) VALUES (?1)");
        let mut batch = Vec::with_capacity(IMPORT_BATCH_SIZE);
        let mut added = 0u64;
        for line in reader.lines() {
            let digest = line?.trim().to_lowercase();
            if digest.is_empty() {
                continue;
            }
            batch.push(digest);
            if batch.len() >= IMPORT_BATCH_SIZE {
                added += insert_batch(&mut conn, &sql, &mut batch)?;
            }
        }
        if !batch.is_empty() {
            added += insert_batch(&mut conn, &sql, &mut batch)?;
        }
        debug!(added, %table, "imported digests");
        Ok(added)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn store() -> (tempfile::TempDir, HashStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = HashStore::open(dir.path().join("hashes.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn import_then_load_unresolved() {
        let (_dir, store) = store();
        let added = store.import_digests("md5", Cursor::new("AABB\n\nccdd\n")).unwrap();
        assert_eq!(added, 2);

        let mut digests = store.unresolved("md5").unwrap();
        digests.sort();
        assert_eq!(digests, vec!["aabb".to_string(), "ccdd".to_string()]);
    }

    #[test]
    fn reimport_adds_nothing() {
        let (_dir, store) = store();
        assert_eq!(store.import_digests("md5", Cursor::new("aabb\nccdd\n")).unwrap(), 2);
        assert_eq!(store.import_digests("md5", Cursor::new("aabb\nccdd\n")).unwrap(), 0);
        assert_eq!(store.unresolved("md5").unwrap().len(), 2);
    }

    #[test]
    fn missing_table_is_reported() {
        let (_dir, store) = store();
        let err = store.unresolved("sha1").unwrap_err();
        assert!(matches!(err, Error::TableMissing { .. }));
    }

    #[test]
    fn record_match_is_idempotent() {
        let (_dir, store) = store();
        store.import_digests("md5", Cursor::new("aabb\n")).unwrap();

        assert!(store.record_match("aabb", "hunter2", "md5").unwrap());
        assert!(!store.record_match("aabb", "hunter2", "md5").unwrap());

        assert_eq!(store.lookup("aabb").unwrap().as_deref(), Some("hunter2"));
        assert_eq!(store.lookup("ccdd").unwrap(), None);
    }

    #[test]
    fn unresolved_excludes_recovered_digests() {
        let (_dir, store) = store();
        store.import_digests("md5", Cursor::new("aabb\nccdd\n")).unwrap();
        store.record_match("aabb", "hunter2", "md5").unwrap();

        assert_eq!(store.unresolved("md5").unwrap(), vec!["ccdd".to_string()]);
    }
}
