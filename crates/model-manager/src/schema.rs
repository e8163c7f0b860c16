//! Schema fingerprinting
//!
//! A fingerprint is the first [`FINGERPRINT_LEN`] hex characters of the
//! SHA-256 digest of the feature names joined with
//! [`FINGERPRINT_SEPARATOR`]. It is order-sensitive. Equal fingerprints make
//! two schemas compatible, not identical; identity is checked separately on
//! the full name sequence.

use sha2::{Digest, Sha256};

/// Joins feature names before hashing; never part of a well-formed name
pub const FINGERPRINT_SEPARATOR: &str = "|";

/// Hex characters kept from the digest
pub const FINGERPRINT_LEN: usize = 10;

/// Fingerprints an ordered feature-name sequence
///
/// The empty sequence hashes the empty string.
pub fn fingerprint<S: AsRef<str>>(names: &[S]) -> String {
    let joined = names
        .iter()
        .map(|n| n.as_ref())
        .collect::<Vec<_>>()
        .join(FINGERPRINT_SEPARATOR);

    let digest = Sha256::digest(joined.as_bytes());
    let mut hex = hex::encode(digest);
    hex.truncate(FINGERPRINT_LEN);
    hex
}

/// Whether `candidate` has the shape of a fingerprint
pub fn is_fingerprint(candidate: &str) -> bool {
    candidate.len() == FINGERPRINT_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
