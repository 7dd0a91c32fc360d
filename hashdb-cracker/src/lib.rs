//! Dictionary recovery of plaintext passwords from known hash digests.
//!
//! The engine streams candidate passwords out of a wordlist database in
//! bounded batches, hashes each batch on a worker pool, and checks the
//! digests against the outstanding targets loaded from a hash database.
//! Every recovered plaintext is persisted exactly once; the run ends when
//! either all targets are resolved or the wordlist is exhausted.
//!
//! Batches complete in no particular order. Correctness does not depend on
//! which batch finishes first: the session task is the only consumer of
//! results and the only mutator of the target set, so a digest can be
//! matched at most once per run no matter how the pool schedules work.
//!
//! See `hashdb-store` for the on-disk layout.

pub mod algorithm;
pub mod batch;
pub mod error;
pub mod progress;
pub mod session;
pub mod target_set;

pub use algorithm::HashAlgorithm;
pub use error::Error;
pub use progress::RunCounters;
pub use session::{Outcome, RunReport, SessionConfig, run_session};
pub use target_set::TargetSet;

/// Candidates per batch handed to one worker.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Progress is logged every time this many candidates have been processed.
pub const REPORT_INTERVAL: u64 = 50_000;
