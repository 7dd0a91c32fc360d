use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use hashdb_cracker::{
    DEFAULT_BATCH_SIZE, Error, HashAlgorithm, Outcome, RunCounters, SessionConfig, progress,
    run_session,
};
use hashdb_store::{HashStore, WordlistStore};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hashdb-cracker")]
#[command(about = "Recover plaintext passwords for known hash digests from a wordlist database")]
struct Cli {
    /// Log every candidate/digest pair and other debug detail
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the matching engine against a hash database
    Crack {
        /// Wordlist database (PlainTextPasswords table)
        wordlist: PathBuf,

        /// Hash database holding target digests and recovered matches
        hashes: PathBuf,

        /// Digest algorithm of the targets (md5, sha1, sha256, sha512)
        algorithm: HashAlgorithm,

        /// Candidates per worker batch
        #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
        batch_size: usize,

        /// Number of concurrent hashing workers (default: all cores)
        #[arg(short = 'j', long)]
        workers: Option<usize>,

        /// Disable progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Import a line-oriented hash list into a hash database
    LoadHashes {
        /// Hash list file, one digest per line
        file: PathBuf,

        /// Hash database to import into
        hashes: PathBuf,

        /// Algorithm the digests were produced with
        algorithm: HashAlgorithm,
    },

    /// Import a wordlist file into a wordlist database
    LoadWordlist {
        /// Wordlist file, one candidate per line
        file: PathBuf,

        /// Wordlist database to import into
        wordlist: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Command::Crack { wordlist, hashes, algorithm, batch_size, workers, no_progress } => {
            crack(wordlist, hashes, algorithm, batch_size, workers, no_progress).await
        }
        Command::LoadHashes { file, hashes, algorithm } => {
            load_hashes(file, hashes, algorithm).await
        }
        Command::LoadWordlist { file, wordlist } => load_wordlist(file, wordlist).await,
    }
}

async fn crack(
    wordlist: PathBuf,
    hashes: PathBuf,
    algorithm: HashAlgorithm,
    batch_size: usize,
    workers: Option<usize>,
    no_progress: bool,
) -> Result<(), Error> {
    let wordlist = Arc::new(WordlistStore::open(&wordlist)?);
    let hashes = Arc::new(HashStore::open(&hashes)?);

    let mut config = SessionConfig::new(algorithm);
    config.batch_size = batch_size.max(1);
    if let Some(workers) = workers {
        config.workers = workers.max(1);
    }

    let total = wordlist.count()?;
    let counters = Arc::new(RunCounters::default());

    // Progress task polling the shared counters, so display cost stays
    // constant no matter how fast batches complete.
    let progress_bar = if !no_progress {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_task = progress_bar.clone().map(|pb| {
        let counters = Arc::clone(&counters);
        let start = Instant::now();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(100)).await;
                let (processed, found, remaining) = counters.snapshot();
                pb.set_position(processed);
                let est = progress::estimate(start.elapsed(), processed, total);
                let eta = est
                    .eta
                    .map(progress::format_duration)
                    .unwrap_or_else(|| "unknown".to_string());
                pb.set_message(format!("{found} found, {remaining} left, eta {eta}"));
            }
        })
    });

    let report = run_session(config, hashes, wordlist, counters).await;

    if let Some(task) = progress_task {
        task.abort();
    }
    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }
    let report = report?;

    println!(
        "Processed {}/{} candidates in {}.",
        report.processed,
        report.total,
        progress::format_duration(report.elapsed)
    );
    match report.outcome {
        Outcome::NoTargets => {
            println!("No outstanding {algorithm} digests, nothing to crack.");
        }
        Outcome::Cracked => {
            println!("All {} digests cracked.", report.found);
        }
        Outcome::Exhausted { unresolved } => {
            println!(
                "Cracked {} digests. No plaintext found for {}:",
                report.found,
                unresolved.len()
            );
            for digest in unresolved {
                println!("  {digest}");
            }
        }
    }
    Ok(())
}

async fn load_hashes(file: PathBuf, hashes: PathBuf, algorithm: HashAlgorithm) -> Result<(), Error> {
    let store = HashStore::open(&hashes)?;
    let added = tokio::task::spawn_blocking(move || {
        let reader = BufReader::new(File::open(&file)?);
        store.import_digests(algorithm.as_str(), reader)
    })
    .await
    .map_err(|e| std::io::Error::other(format!("import task died: {e}")))??;

    println!("Imported {added} new {algorithm} digests.");
    Ok(())
}

async fn load_wordlist(file: PathBuf, wordlist: PathBuf) -> Result<(), Error> {
    let store = WordlistStore::open(&wordlist)?;
    let added = tokio::task::spawn_blocking(move || {
        let reader = BufReader::new(File::open(&file)?);
        store.import_words(reader)
    })
    .await
    .map_err(|e| std::io::Error::other(format!("import task died: {e}")))??;

    println!("Imported {added} candidates.");
    Ok(())
}
