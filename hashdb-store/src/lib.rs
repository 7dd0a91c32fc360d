//! SQLite persistence for the hashdb cracker.
//!
//! Two kinds of database back a cracking run:
//!
//! - A **hash database** ([`HashStore`]) with one table of outstanding
//!   digests per algorithm (`md5hashes`, `sha1hashes`, ...) and a shared
//!   `KnownHashes` table mapping every recovered digest back to its
//!   plaintext and algorithm.
//! - A **wordlist database** ([`WordlistStore`]) with a single
//!   `PlainTextPasswords` table of candidate passwords, read back in
//!   stable insertion order so a corpus far larger than memory can be
//!   streamed page by page.
//!
//! All match writes use `INSERT OR IGNORE`, so recording the same digest
//! twice (within a run, across runs, or from another process holding the
//! same file) leaves exactly one row and is never an error.

pub mod error;
pub mod hashes;
pub mod wordlist;

mod import;

pub use error::Error;
pub use hashes::HashStore;
pub use wordlist::WordlistStore;

/// Rows written per transaction when importing from a file.
pub const IMPORT_BATCH_SIZE: usize = 10_000;
