//! Content fingerprints used as the deduplication key.
//!
//! A fingerprint is the lowercase hex SHA-256 digest of the raw file bytes.
//! No format validation happens here: any byte stream has a fingerprint.

use sha2::{Digest, Sha256};
use std::path::Path;

/// Length of a hex-encoded fingerprint.
pub const FINGERPRINT_LEN: usize = 64;

pub fn fingerprint_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Hash a file by streaming it, so large PDFs are not held in memory.
pub fn fingerprint_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}
