//! Checksums of embedded migration SQL

use sha2::{Digest, Sha256};

/// SHA-256 of the migration text, lower-case hex
pub fn compute_checksum(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum_shape_and_stability() {
        let checksum = compute_checksum("CREATE TABLE t (x)");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum("CREATE TABLE t (x)"));
        assert_ne!(checksum, compute_checksum("CREATE TABLE t (y)"));
    }
}
