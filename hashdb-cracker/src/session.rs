use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::{self, Id, JoinSet};
use tracing::{debug, info, warn};

use hashdb_store::{HashStore, WordlistStore};

use crate::algorithm::HashAlgorithm;
use crate::batch::{self, Batch, BatchOutput};
use crate::error::Error;
use crate::progress::{self, RunCounters};
use crate::target_set::TargetSet;
use crate::{DEFAULT_BATCH_SIZE, REPORT_INTERVAL};

/// Tuning knobs for a cracking run.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub algorithm: HashAlgorithm,
    /// Candidates per dispatched batch.
    pub batch_size: usize,
    /// Upper bound on batches in flight; also the effective parallelism.
    pub workers: usize,
}

impl SessionConfig {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self {
            algorithm,
            batch_size: DEFAULT_BATCH_SIZE,
            workers: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        }
    }
}

/// How a run ended.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Every target digest was matched to a plaintext.
    Cracked,
    /// The wordlist ran out with digests still outstanding. A result, not
    /// an error: the listed digests are unrecoverable with this corpus.
    Exhausted { unresolved: Vec<String> },
    /// The store held no outstanding digests for this algorithm.
    NoTargets,
}

/// Summary of a finished run.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: Outcome,
    pub processed: u64,
    pub total: u64,
    pub found: u64,
    pub elapsed: Duration,
}

struct InFlight {
    batch: Batch,
    retried: bool,
}

/// Runs the matching engine to completion.
///
/// The calling task is the sole dispatcher and the sole consumer of
/// completed batches, and therefore the only mutator of the target set.
/// Batches are applied in completion order, not submission order. Once the
/// target set empties or the wordlist is exhausted, no new batches are
/// dispatched but everything already in flight is drained, so a match
/// sitting in a late batch is never dropped.
pub async fn run_session(
    config: SessionConfig,
    hashes: Arc<HashStore>,
    wordlist: Arc<WordlistStore>,
    counters: Arc<RunCounters>,
) -> Result<RunReport, Error> {
    let start = Instant::now();
    let algorithm = config.algorithm;

    let digests = {
        let hashes = Arc::clone(&hashes);
        store_call(move || hashes.unresolved(algorithm.as_str())).await?
    };
    let mut targets = TargetSet::new(digests);
    if targets.is_empty() {
        info!(%algorithm, "no outstanding digests, nothing to crack");
        counters.record(0, 0, 0);
        return Ok(RunReport {
            outcome: Outcome::NoTargets,
            processed: 0,
            total: 0,
            found: 0,
            elapsed: start.elapsed(),
        });
    }

    let total = {
        let wordlist = Arc::clone(&wordlist);
        store_call(move || wordlist.count()).await?
    };
    info!(targets = targets.len(), candidates = total, %algorithm, "starting run");
    counters.record(0, 0, targets.len() as u64);

    let mut in_flight: JoinSet<BatchOutput> = JoinSet::new();
    let mut pending: HashMap<Id, InFlight> = HashMap::new();
    let mut offset = 0u64;
    let mut next_batch_index = 0u64;
    let mut processed = 0u64;
    let mut found = 0u64;
    let mut exhausted = false;
    let mut next_report = REPORT_INTERVAL;

    loop {
        // Keep up to `workers` batches in flight while there is anything
        // left to look for; stop dispatching as soon as either terminal
        // condition holds and let the drain below finish the rest.
        while !exhausted && !targets.is_empty() && in_flight.len() < config.workers {
            let page = {
                let wordlist = Arc::clone(&wordlist);
                let size = config.batch_size;
                store_call(move || wordlist.page(offset, size)).await?
            };
            if page.is_empty() {
                exhausted = true;
                break;
            }
            offset += page.len() as u64;
            let batch = Batch { index: next_batch_index, candidates: page };
            next_batch_index += 1;
            dispatch(&mut in_flight, &mut pending, batch, algorithm, false);
        }

        // Take whichever batch completes first, regardless of dispatch
        // order. An empty set means the run is fully drained.
        let Some(joined) = in_flight.join_next_with_id().await else {
            break;
        };

        match joined {
            Ok((id, output)) => {
                pending.remove(&id);
                processed += output.attempted as u64;
                found += apply(&mut targets, &hashes, algorithm, &output)?;
                counters.record(processed, found, targets.len() as u64);

                while processed >= next_report {
                    let est = progress::estimate(start.elapsed(), processed, total);
                    let eta = est
                        .eta
                        .map(progress::format_duration)
                        .unwrap_or_else(|| "unknown".to_string());
                    info!(
                        processed,
                        total,
                        found,
                        remaining = targets.len(),
                        rate = est.rate,
                        %eta,
                        "progress"
                    );
                    next_report += REPORT_INTERVAL;
                }
            }
            Err(join_error) => {
                let Some(failed) = pending.remove(&join_error.id()) else {
                    return Err(Error::BatchFailed {
                        index: next_batch_index,
                        reason: format!("untracked worker died: {join_error}"),
                    });
                };
                if failed.retried {
                    return Err(Error::BatchFailed {
                        index: failed.batch.index,
                        reason: join_error.to_string(),
                    });
                }
                warn!(batch = failed.batch.index, %join_error, "batch worker died, retrying once");
                dispatch(&mut in_flight, &mut pending, failed.batch, algorithm, true);
            }
        }
    }

    let elapsed = start.elapsed();
    let outcome = if targets.is_empty() {
        info!(found, "all digests cracked");
        Outcome::Cracked
    } else {
        let unresolved = targets.into_unresolved();
        info!(found, unresolved = unresolved.len(), "wordlist exhausted");
        Outcome::Exhausted { unresolved }
    };
    Ok(RunReport { outcome, processed, total, found, elapsed })
}

/// Hands a batch to the blocking pool, keeping a copy keyed by task id so
/// it can be retried if the worker dies.
fn dispatch(
    in_flight: &mut JoinSet<BatchOutput>,
    pending: &mut HashMap<Id, InFlight>,
    batch: Batch,
    algorithm: HashAlgorithm,
    retried: bool,
) {
    let work = batch.clone();
    let handle = in_flight.spawn_blocking(move || batch::compute_batch(work, algorithm));
    pending.insert(handle.id(), InFlight { batch, retried });
}

/// Checks a completed batch against the target set, recording every fresh
/// match. Returns how many digests this batch resolved.
fn apply(
    targets: &mut TargetSet,
    hashes: &HashStore,
    algorithm: HashAlgorithm,
    output: &BatchOutput,
) -> Result<u64, Error> {
    let mut found = 0u64;
    for (plaintext, digest) in &output.pairs {
        debug!("{digest} -> {{ {plaintext} }}");
        if targets.remove(digest) {
            if !hashes.record_match(digest, plaintext, algorithm.as_str())? {
                debug!(%digest, "match was already recorded");
            }
            found += 1;
            info!("password found: {plaintext} for hash {digest}");
        }
    }
    Ok(found)
}

/// Runs a store operation on the blocking pool so SQLite never stalls the
/// runtime, mapping a dead task to an I/O error like any other lost worker.
async fn store_call<T, F>(f: F) -> Result<T, Error>
where
    F: FnOnce() -> Result<T, hashdb_store::Error> + Send + 'static,
    T: Send + 'static,
{
    let result = task::spawn_blocking(f)
        .await
        .map_err(|e| std::io::Error::other(format!("store task died: {e}")))?;
    Ok(result?)
}
