//! Content fingerprints of commits that survive rebases and amends.
//!
//! A fingerprint is a SHA-256 over the zero-context diff of a commit with all
//! line-number metadata removed, so it only changes when the commit's own
//! content changes. Added and deleted files contribute a marker plus their
//! path instead of their content. A binary change or an empty commit has no
//! fingerprint.

use std::collections::HashMap;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, trace};

use crate::errors::GitError;
use crate::git::parser::{classify_file_diff, FileDiff};
use crate::git::BranchStore;

/// Why a commit could not be fingerprinted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Unavailable {
    /// The commit touches no files.
    NoChanges,
    /// The commit changes a binary file.
    Binary { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DiffFingerprint {
    /// Lowercase hex SHA-256 of the normalised diff.
    Content(String),
    Unavailable(Unavailable),
}

impl DiffFingerprint {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Content(_))
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Self::Content(value) => Some(value),
            Self::Unavailable(_) => None,
        }
    }
}

/// Compute the fingerprint of `sha`. Any store failure aborts; there is no
/// partial result.
#[instrument(skip(store))]
pub async fn fingerprint<S: BranchStore>(store: &S, sha: &str) -> Result<DiffFingerprint, GitError> {
    let paths = store.changed_paths(sha).await?;
    if paths.is_empty() {
        debug!(sha, "commit touches no files");
        return Ok(DiffFingerprint::Unavailable(Unavailable::NoChanges));
    }

    let mut hasher = Sha256::new();
    for path in &paths {
        let lines = store.file_diff(sha, path).await?;
        match classify_file_diff(&lines) {
            FileDiff::Added => {
                hasher.update(b"new file\n");
                hasher.update(path.as_bytes());
                hasher.update(b"\n");
            }
            FileDiff::Deleted => {
                hasher.update(b"deleted file\n");
                hasher.update(path.as_bytes());
                hasher.update(b"\n");
            }
            FileDiff::Binary => {
                debug!(sha, path, "binary change, no fingerprint");
                return Ok(DiffFingerprint::Unavailable(Unavailable::Binary {
                    path: path.clone(),
                }));
            }
            FileDiff::Modified { body } => {
                trace!(sha, path, body = %body.join("\n"), "fingerprint body");
                for line in &body {
                    hasher.update(line.as_bytes());
                    hasher.update(b"\n");
                }
            }
        }
    }

    let value = hex::encode(hasher.finalize());
    debug!(sha, fingerprint = %value, "computed fingerprint");
    Ok(DiffFingerprint::Content(value))
}

/// Fingerprints computed during one reconciliation run, keyed by commit SHA.
#[derive(Debug, Default)]
pub struct FingerprintCache {
    entries: HashMap<String, DiffFingerprint>,
}

impl FingerprintCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached fingerprint of `sha`, computing it on first use.
    pub async fn get<S: BranchStore>(
        &mut self,
        store: &S,
        sha: &str,
    ) -> Result<DiffFingerprint, GitError> {
        if let Some(found) = self.entries.get(sha) {
            return Ok(found.clone());
        }
        let computed = fingerprint(store, sha).await?;
        self.entries.insert(sha.to_string(), computed.clone());
        Ok(computed)
    }
}
