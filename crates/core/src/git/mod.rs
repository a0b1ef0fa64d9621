//! Access to the branch store: the commits and refs giiter reconciles.

pub mod client;
pub mod parser;

pub use client::GitClient;

use crate::errors::GitError;
use crate::models::{Branch, CommitInfo};

/// How a branch should be pushed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PushRequest {
    /// Overwrite the remote ref regardless of ancestry.
    pub force: bool,
    /// Transport-level push options (`git push -o`).
    pub options: Vec<String>,
}

impl PushRequest {
    pub fn force() -> Self {
        Self {
            force: true,
            options: Vec::new(),
        }
    }
}

/// Everything the engine needs from version control. Calls are issued one at a
/// time and awaited before the next one starts.
#[allow(async_fn_in_trait)]
pub trait BranchStore {
    /// First-parent commits of `base..feature`, oldest first.
    async fn list_commits(&self, base: &str, feature: &str) -> Result<Vec<CommitInfo>, GitError>;

    /// Message of an arbitrary commit.
    async fn commit_info(&self, sha: &str) -> Result<CommitInfo, GitError>;

    /// Every local branch with its tip.
    async fn list_branches(&self) -> Result<Vec<Branch>, GitError>;

    /// Paths touched by a commit, in diff order.
    async fn changed_paths(&self, sha: &str) -> Result<Vec<String>, GitError>;

    /// Zero-context diff of one path in one commit, line by line.
    async fn file_diff(&self, sha: &str, path: &str) -> Result<Vec<String>, GitError>;

    /// Repoint `name` at `sha` unconditionally.
    async fn move_branch(&self, name: &str, sha: &str) -> Result<(), GitError>;

    async fn create_branch(&self, name: &str, sha: &str) -> Result<(), GitError>;

    async fn delete_branch(&self, name: &str) -> Result<(), GitError>;

    async fn push_branch(&self, remote: &str, name: &str, request: &PushRequest)
        -> Result<(), GitError>;

    async fn delete_remote_branch(&self, remote: &str, name: &str) -> Result<(), GitError>;
}
