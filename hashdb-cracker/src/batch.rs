use tracing::debug;

use crate::algorithm::HashAlgorithm;

/// A page of candidate passwords as raw wordlist bytes, tagged with its
/// dispatch index so a batch whose worker died can be retried.
#[derive(Debug, Clone)]
pub struct Batch {
    pub index: u64,
    pub candidates: Vec<Vec<u8>>,
}

/// Digests computed for one batch.
#[derive(Debug)]
pub struct BatchOutput {
    pub index: u64,
    /// `(plaintext, digest)` pairs for every decodable candidate.
    pub pairs: Vec<(String, String)>,
    /// Number of candidates consumed, including skipped ones.
    pub attempted: usize,
}

/// Hashes every candidate in the batch with `algorithm`.
///
/// Pure function of its inputs: no shared state and no knowledge of the
/// target set. A candidate that is not valid UTF-8 is skipped but still
/// counts as attempted, so coverage accounting stays honest.
pub fn compute_batch(batch: Batch, algorithm: HashAlgorithm) -> BatchOutput {
    let attempted = batch.candidates.len();
    let mut pairs = Vec::with_capacity(attempted);
    for raw in &batch.candidates {
        match std::str::from_utf8(raw) {
            Ok(word) => pairs.push((word.to_string(), algorithm.digest_hex(raw))),
            Err(_) => debug!(batch = batch.index, "skipping undecodable candidate"),
        }
    }
    BatchOutput { index: batch.index, pairs, attempted }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_every_candidate() {
        let batch = Batch {
            index: 7,
            candidates: vec![b"password".to_vec(), b"abc123".to_vec()],
        };
        let output = compute_batch(batch, HashAlgorithm::Md5);

        assert_eq!(output.index, 7);
        assert_eq!(output.attempted, 2);
        assert_eq!(output.pairs.len(), 2);
        assert_eq!(output.pairs[1].0, "abc123");
        assert_eq!(output.pairs[1].1, "e99a18c428cb38d5f260853678922e03");
    }

    #[test]
    fn undecodable_candidates_are_skipped_but_counted() {
        let batch = Batch {
            index: 0,
            candidates: vec![b"ok".to_vec(), vec![0xff, 0xfe], b"also-ok".to_vec()],
        };
        let output = compute_batch(batch, HashAlgorithm::Sha1);

        assert_eq!(output.attempted, 3);
        let words: Vec<&str> = output.pairs.iter().map(|(w, _)| w.as_str()).collect();
        assert_eq!(words, vec!["ok", "also-ok"]);
    }
}
