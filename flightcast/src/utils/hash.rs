//! Hash utilities for Flightcast.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest
///
/// Used to correlate prompts in logs without logging their content.
///
/// # Example
/// ```
/// use flightcast::utils::hash::sha256_hex;
///
/// let hash = sha256_hex(b"hello world");
/// assert_eq!(hash.len(), 64);
/// ```
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
