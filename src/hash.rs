use sha2::{Sha256, Digest};

use crate::utils::*;


/// Get SHA-256 hash of a buffer as lowercase hex.
pub fn sha256_hex(buffer: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(buffer);
    hex::encode(hasher.finalize())
}


/// Get SHA-256 hash of a buffer interpreted as a big-endian integer.
pub fn sha256_u512(buffer: &[u8]) -> U512 {
    let mut hasher = Sha256::new();
    hasher.update(buffer);
    u512_from_be_bytes(&hasher.finalize())
}


/// Render a hex digest as a hexadecimal integer: leading zeros stripped,
/// `"0"` for zero.
pub fn hex_as_integer(digest: &str) -> &str {
    let trimmed = digest.trim_start_matches('0');
    if trimmed.is_empty() && !digest.is_empty() {
        "0"
    } else {
        trimmed
    }
}
