//! Content hashing over raw source bytes.
//!
//! The hash is the dedup/identity key for re-import detection: two uploads
//! with the same bytes are the same document regardless of filename.

use std::fmt::Write as _;

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the raw source bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_vector() {
        // SHA-256 of the empty input.
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn same_bytes_same_hash() {
        assert_eq!(content_hash(b"[File]"), content_hash(b"[File]"));
        assert_ne!(content_hash(b"[File]"), content_hash(b"[file]"));
    }
}
