//! Content integrity verification.
//!
//! Every file listed in the registry index carries a checksum. Fetched content is
//! hashed and compared before anything is transformed or written.
//!
//! The canonical algorithm is SHA-256 over the raw bytes exactly as fetched (no
//! line-ending or encoding normalization), rendered as `sha256:<lowercase hex>`.
//! The same function produces the checksums published in the registry
//! ([`generate_checksum_map`]) and the ones verified on install, so the two can
//! never drift apart.
//!
//! Comparison is lenient about presentation only: upper-case hex and a missing
//! `sha256:` prefix are accepted.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::GreaterError;

const PREFIX: &str = "sha256:";

/// Ordered `path -> checksum` map, as published in the registry index.
pub type ChecksumMap = BTreeMap<String, String>;

/// Outcome of verifying one file in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationResult {
    /// Registry-virtual path of the file
    pub path: String,
    /// Checksum the registry expects
    pub expected: String,
    /// Checksum of the content that was checked
    pub actual: String,
    /// Whether the two match
    pub valid: bool,
}

/// Compute the canonical checksum of `content`.
///
/// ```
/// use greater_cli::integrity::compute_checksum;
///
/// assert_eq!(
///     compute_checksum(b""),
///     "sha256:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
pub fn compute_checksum(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    format!("{PREFIX}{}", hex::encode(digest))
}

/// Normalize a checksum to `sha256:<lowercase hex>`.
///
/// Returns `None` when the value is not a well-formed SHA-256 digest.
pub fn normalize_checksum(checksum: &str) -> Option<String> {
    let trimmed = checksum.trim();
    let hex_part = match trimmed.get(..PREFIX.len()) {
        Some(p) if p.eq_ignore_ascii_case(PREFIX) => &trimmed[PREFIX.len()..],
        _ => trimmed,
    };
    if hex_part.len() == 64 && hex_part.bytes().all(|b| b.is_ascii_hexdigit()) {
        Some(format!("{PREFIX}{}", hex_part.to_ascii_lowercase()))
    } else {
        None
    }
}

/// Whether `checksum` is a well-formed SHA-256 digest in any accepted presentation.
pub fn is_valid_checksum(checksum: &str) -> bool {
    normalize_checksum(checksum).is_some()
}

/// Whether `content` hashes to `expected`. A malformed `expected` never matches.
pub fn verify_checksum(content: &[u8], expected: &str) -> bool {
    normalize_checksum(expected).is_some_and(|expected| compute_checksum(content) == expected)
}

/// Verify `content`, failing with [`GreaterError::ChecksumMismatch`] naming `path`.
pub fn verify_checksum_or_err(content: &[u8], expected: &str, path: &str) -> Result<()> {
    if verify_checksum(content, expected) {
        return Ok(());
    }
    Err(GreaterError::ChecksumMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        actual: compute_checksum(content),
    }
    .into())
}

/// Verify a batch of `(path, content, expected)` entries.
///
/// Every entry is checked; the result keeps input order so callers can report
/// all mismatches at once.
pub fn verify_multiple_checksums<'a, I>(files: I) -> Vec<VerificationResult>
where
    I: IntoIterator<Item = (&'a str, &'a [u8], &'a str)>,
{
    files
        .into_iter()
        .map(|(path, content, expected)| {
            let actual = compute_checksum(content);
            let valid = normalize_checksum(expected).is_some_and(|e| e == actual);
            VerificationResult {
                path: path.to_string(),
                expected: expected.to_string(),
                actual,
                valid,
            }
        })
        .collect()
}

/// Build the checksum map for a set of `(path, content)` pairs.
pub fn generate_checksum_map<'a, I>(files: I) -> ChecksumMap
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    files.into_iter().map(|(path, content)| (path.to_string(), compute_checksum(content))).collect()
}

/// Checksum of a file on disk.
pub async fn compute_file_checksum(path: &Path) -> Result<String> {
    let content = tokio::fs::read(path).await.with_context(|| {
        format!("Cannot read file for checksum calculation: {}", path.display())
    })?;
    Ok(compute_checksum(&content))
}
