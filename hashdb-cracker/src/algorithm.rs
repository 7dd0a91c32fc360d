use std::fmt;
use std::str::FromStr;

use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};

use crate::error::Error;

/// Lowercase hex lookup table, matching the usual `hexdigest` output of
/// other tooling so imported hash lists compare byte-for-byte.
const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";

/// Digest algorithm for a cracking run.
///
/// One run targets exactly one algorithm; the per-algorithm table name in
/// the hash store is derived from [`HashAlgorithm::as_str`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    /// Lowercase hex digest of `data`.
    pub fn digest_hex(&self, data: &[u8]) -> String {
        match self {
            Self::Md5 => hex_string(&Md5::digest(data)),
            Self::Sha1 => hex_string(&Sha1::digest(data)),
            Self::Sha256 => hex_string(&Sha256::digest(data)),
            Self::Sha512 => hex_string(&Sha512::digest(data)),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            _ => Err(Error::UnknownAlgorithm { name: s.to_string() }),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX_CHARS[(b >> 4) as usize] as char);
        out.push(HEX_CHARS[(b & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_names() {
        assert_eq!("md5".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Md5);
        assert_eq!(" SHA1 ".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha1);
        assert_eq!("sha256".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha256);
        assert_eq!("sha512".parse::<HashAlgorithm>().unwrap(), HashAlgorithm::Sha512);
    }

    #[test]
    fn rejects_unknown_names() {
        let err = "ntlm".parse::<HashAlgorithm>().unwrap_err();
        assert!(matches!(err, Error::UnknownAlgorithm { name } if name == "ntlm"));
    }

    #[test]
    fn known_digest_vectors() {
        assert_eq!(
            HashAlgorithm::Md5.digest_hex(b"abc123"),
            "e99a18c428cb38d5f260853678922e03"
        );
        assert_eq!(
            HashAlgorithm::Sha1.digest_hex(b"password123"),
            "cbfdac6008f9cab4083784cbd1874f76618d2a97"
        );
        assert_eq!(
            HashAlgorithm::Sha256.digest_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            HashAlgorithm::Sha512.digest_hex(b"abc"),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
             2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
    }
}
