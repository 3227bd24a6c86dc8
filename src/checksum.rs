// ─── Checksums ───
// Digest algorithms accepted for artifact integrity verification.

use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Digest algorithms in preference order. SHA-256 is preferred; SHA-1 is
/// accepted because most repositories still publish only `.sha1` files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChecksumAlgorithm {
    Sha256,
    Sha1,
}

impl ChecksumAlgorithm {
    /// All algorithms in the order repositories are probed.
    pub fn preference_order() -> &'static [Self] {
        &[Self::Sha256, Self::Sha1]
    }

    /// Suffix of the published checksum file (`artifact.jar.sha256`).
    pub fn file_suffix(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Sha1 => "sha1",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha1 => "SHA-1",
        }
    }

    /// Hex digest of `bytes` under this algorithm.
    pub fn digest(&self, bytes: &[u8]) -> String {
        match self {
            Self::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(bytes);
                hex::encode(hasher.finalize())
            }
            Self::Sha1 => {
                let mut hasher = Sha1::new();
                hasher.update(bytes);
                hex::encode(hasher.finalize())
            }
        }
    }
}

/// A verified digest value paired with its algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub algorithm: ChecksumAlgorithm,
    pub value: String,
}

impl Checksum {
    pub fn of(algorithm: ChecksumAlgorithm, bytes: &[u8]) -> Self {
        Self {
            value: algorithm.digest(bytes),
            algorithm,
        }
    }

    /// Whether `bytes` hash to this checksum.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        self.algorithm.digest(bytes) == self.value
    }
}

/// Published checksum files sometimes carry `<hex>  <filename>` lines
/// (coreutils style). Keep only the leading hex token, lowercased.
pub fn normalize_published_value(raw: &str) -> String {
    raw.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_digest_known_vector() {
        assert_eq!(
            ChecksumAlgorithm::Sha256.digest(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn sha1_digest_known_vector() {
        assert_eq!(
            ChecksumAlgorithm::Sha1.digest(b"abc"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
    }

    #[test]
    fn checksum_matches_bytes() {
        let sum = Checksum::of(ChecksumAlgorithm::Sha256, b"payload");
        assert!(sum.matches(b"payload"));
        assert!(!sum.matches(b"tampered"));
    }

    #[test]
    fn normalize_strips_filename_suffix() {
        assert_eq!(
            normalize_published_value("ABCDEF  lib-1.0.jar\n"),
            "abcdef"
        );
        assert_eq!(normalize_published_value("abcdef"), "abcdef");
        assert_eq!(normalize_published_value("   "), "");
    }

    #[test]
    fn preference_order_starts_strong() {
        assert_eq!(
            ChecksumAlgorithm::preference_order()[0],
            ChecksumAlgorithm::Sha256
        );
    }
}
