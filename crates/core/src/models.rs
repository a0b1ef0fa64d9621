//! Domain model types used throughout giiter.
//!
//! A [`Record`] is the unit of reconciliation: one logical change, carrying at
//! most one feature commit and the review branches that expose it.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Commits and branches
// ---------------------------------------------------------------------------

/// Subject line and body of a commit message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMessage {
    pub subject: String,
    pub description: String,
}

/// A commit as reported by the store, without its position in any range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub sha: String,
    pub message: CommitMessage,
}

/// A commit of the feature stack. `position` is its zero-based index in the
/// first-parent range `base..feature`, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureCommit {
    pub sha: String,
    pub subject: String,
    pub description: String,
    pub position: usize,
}

/// A raw local branch: name and the full SHA it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub name: String,
    pub tip: String,
}

/// A branch in the review namespace of one feature, `<prefix>/<feature>/<n>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewBranch {
    pub name: String,
    pub numeric_suffix: u64,
    pub tip_sha: String,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// The four mutually exclusive reconciliation states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordState {
    New,
    Orphan,
    Current,
    Stale,
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Orphan => write!(f, "orphan"),
            Self::Current => write!(f, "current"),
            Self::Stale => write!(f, "stale"),
        }
    }
}

/// What a record holds. Each variant carries only the fields that make sense
/// in that state; attached branches always share one tip SHA.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecordKind {
    /// A feature commit nobody reviews yet.
    New { commit: FeatureCommit },
    /// Review branches whose commit left the feature range.
    Orphan {
        review: CommitInfo,
        branches: Vec<ReviewBranch>,
    },
    /// Review branches pointing exactly at the feature commit.
    Current {
        commit: FeatureCommit,
        branches: Vec<ReviewBranch>,
    },
    /// Review branches pointing at an older incarnation of the feature commit.
    Stale {
        commit: FeatureCommit,
        review: CommitInfo,
        branches: Vec<ReviewBranch>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    #[serde(flatten)]
    pub kind: RecordKind,
}

impl Record {
    pub fn new_commit(commit: FeatureCommit, id: u64) -> Self {
        Self {
            id,
            kind: RecordKind::New { commit },
        }
    }

    pub fn state(&self) -> RecordState {
        match self.kind {
            RecordKind::New { .. } => RecordState::New,
            RecordKind::Orphan { .. } => RecordState::Orphan,
            RecordKind::Current { .. } => RecordState::Current,
            RecordKind::Stale { .. } => RecordState::Stale,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self.kind, RecordKind::New { .. })
    }

    pub fn is_orphan(&self) -> bool {
        matches!(self.kind, RecordKind::Orphan { .. })
    }

    pub fn is_current(&self) -> bool {
        matches!(self.kind, RecordKind::Current { .. })
    }

    pub fn is_stale(&self) -> bool {
        matches!(self.kind, RecordKind::Stale { .. })
    }

    /// The feature commit, absent for orphans.
    pub fn commit(&self) -> Option<&FeatureCommit> {
        match &self.kind {
            RecordKind::New { commit }
            | RecordKind::Current { commit, .. }
            | RecordKind::Stale { commit, .. } => Some(commit),
            RecordKind::Orphan { .. } => None,
        }
    }

    pub fn branches(&self) -> &[ReviewBranch] {
        match &self.kind {
            RecordKind::New { .. } => &[],
            RecordKind::Orphan { branches, .. }
            | RecordKind::Current { branches, .. }
            | RecordKind::Stale { branches, .. } => branches,
        }
    }

    pub fn branch_names(&self) -> Vec<&str> {
        self.branches().iter().map(|b| b.name.as_str()).collect()
    }

    /// SHA the attached review branches point at, if any.
    pub fn review_sha(&self) -> Option<&str> {
        match &self.kind {
            RecordKind::New { .. } => None,
            RecordKind::Current { commit, .. } => Some(&commit.sha),
            RecordKind::Orphan { review, .. } | RecordKind::Stale { review, .. } => {
                Some(&review.sha)
            }
        }
    }

    /// The SHA to show: the feature commit when there is one, else the
    /// orphaned review tip.
    pub fn display_sha(&self) -> &str {
        match &self.kind {
            RecordKind::New { commit }
            | RecordKind::Current { commit, .. }
            | RecordKind::Stale { commit, .. } => &commit.sha,
            RecordKind::Orphan { review, .. } => &review.sha,
        }
    }

    pub fn subject(&self) -> &str {
        match &self.kind {
            RecordKind::New { commit }
            | RecordKind::Current { commit, .. }
            | RecordKind::Stale { commit, .. } => &commit.subject,
            RecordKind::Orphan { review, .. } => &review.message.subject,
        }
    }

    /// Largest numeric suffix among the attached branches.
    pub fn max_branch_id(&self) -> Option<u64> {
        self.branches().iter().map(|b| b.numeric_suffix).max()
    }

    /// Turn a stale record into a current one once its branches were moved.
    pub(crate) fn mark_current(&mut self) {
        if let RecordKind::Stale {
            commit, branches, ..
        } = &mut self.kind
        {
            let commit = commit.clone();
            let mut branches = std::mem::take(branches);
            for branch in &mut branches {
                branch.tip_sha = commit.sha.clone();
            }
            self.kind = RecordKind::Current { commit, branches };
        }
    }
}

/// Shorten a SHA for display.
pub fn short_sha(sha: &str) -> &str {
    &sha[..sha.len().min(7)]
}
