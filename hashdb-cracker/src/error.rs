#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown hash algorithm '{name}' (expected md5, sha1, sha256 or sha512)")]
    UnknownAlgorithm { name: String },

    #[error("batch {index} failed twice: {reason}")]
    BatchFailed { index: u64, reason: String },

    #[error("storage error: {0}")]
    Store(#[from] hashdb_store::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
