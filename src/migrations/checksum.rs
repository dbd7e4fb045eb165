//! # Migration Checksum
//!
//! SHA-256 over the raw bytes of a migration file, rendered as lowercase
//! hex. The digest is stored in the registry when a migration is applied
//! and recomputed on every run to detect files edited after the fact.

use sha2::{Digest, Sha256};

/// Length of a rendered checksum in hex characters
pub const CHECKSUM_HEX_LEN: usize = 64;

/// Compute the checksum of migration file content
pub fn compute_checksum(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}
