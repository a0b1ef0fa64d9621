//! Manual pairing of a commit with an existing review branch.
//!
//! When the heuristics fail to recognise a heavily rewritten commit, the
//! operator can move a review branch (typically an orphan's) onto the commit
//! so the review thread survives.

use tracing::{info, instrument};

use crate::errors::{AssignError, CoreError};
use crate::git::BranchStore;
use crate::models::Record;
use crate::refresh::move_review_branch;

/// The branch move an assignment boils down to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub branch: String,
    pub sha: String,
}

/// Check an assignment against the listing. Positions are 1-based, as shown
/// to the operator.
pub fn plan_assign(
    records: &[Record],
    commit_position: usize,
    branch_position: usize,
) -> Result<Assignment, AssignError> {
    let len = records.len();
    for (which, position) in [("commit", commit_position), ("branch", branch_position)] {
        if position == 0 || position > len {
            return Err(AssignError::PositionOutOfRange {
                which,
                position,
                len,
            });
        }
    }
    if commit_position == branch_position {
        return Err(AssignError::SamePosition(commit_position));
    }

    let target = &records[commit_position - 1];
    if !target.branches().is_empty() {
        return Err(AssignError::AlreadyReviewed(commit_position));
    }
    let Some(commit) = target.commit() else {
        return Err(AssignError::AlreadyReviewed(commit_position));
    };

    let source = &records[branch_position - 1];
    let branch = match source.branches() {
        [] => return Err(AssignError::NoReviewBranch(branch_position)),
        [only] => only,
        many => {
            return Err(AssignError::AmbiguousReviewBranch {
                position: branch_position,
                branches: many.iter().map(|b| b.name.clone()).collect(),
            })
        }
    };

    Ok(Assignment {
        branch: branch.name.clone(),
        sha: commit.sha.clone(),
    })
}

/// Validate and perform an assignment. Nothing is mutated when validation
/// fails.
#[instrument(skip(store, records))]
pub async fn assign<S: BranchStore>(
    store: &S,
    records: &[Record],
    commit_position: usize,
    branch_position: usize,
    remote: Option<&str>,
) -> Result<Assignment, CoreError> {
    let assignment = plan_assign(records, commit_position, branch_position)?;
    move_review_branch(store, &assignment.branch, &assignment.sha, remote).await?;
    info!(branch = %assignment.branch, sha = %assignment.sha, "assigned review branch");
    Ok(assignment)
}
