//! Content fingerprints for each side of a pair.
//!
//! A fingerprint identifies content for deduplication and cross-referencing.
//! It is not an integrity check, so MD5 (the historical format of the
//! `file_pairs.hash_*` columns) stays the default.

use clap::ValueEnum;
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum FingerprintAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl FingerprintAlgorithm {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha256 => "sha256",
        }
    }

    #[must_use]
    pub fn digest(self, text: &str) -> String {
        match self {
            Self::Md5 => hex_digest::<Md5>(text),
            Self::Sha256 => hex_digest::<Sha256>(text),
        }
    }
}

/// MD5 fingerprint of `text` as 32 lowercase hex characters.
#[must_use]
pub fn fingerprint(text: &str) -> String {
    FingerprintAlgorithm::Md5.digest(text)
}

fn hex_digest<D: Digest>(text: &str) -> String
where
    sha2::digest::Output<D>: std::fmt::LowerHex,
{
    let mut hasher = D::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
