//! Convergence of review branches onto the current feature commits.

use tracing::{info, instrument};

use crate::errors::GitError;
use crate::git::{BranchStore, PushRequest};
use crate::models::Record;

/// Force `branch` onto `sha`, and onto the remote as well when `remote` is set.
pub(crate) async fn move_review_branch<S: BranchStore>(
    store: &S,
    branch: &str,
    sha: &str,
    remote: Option<&str>,
) -> Result<(), GitError> {
    store.move_branch(branch, sha).await?;
    if let Some(remote) = remote {
        store
            .push_branch(remote, branch, &PushRequest::force())
            .await?;
    }
    Ok(())
}

/// Apply the outcome of a reconciliation.
///
/// Stale records get their branches moved onto the feature commit and become
/// current. Orphans are deleted only when no new record is left, since a new
/// commit may still be assigned to an orphaned branch by hand. Failures stop
/// the run where they happen; moves already made are kept.
#[instrument(skip_all, fields(records = records.len(), remote = ?remote))]
pub async fn refresh<S: BranchStore>(
    store: &S,
    mut records: Vec<Record>,
    remote: Option<&str>,
) -> Result<Vec<Record>, GitError> {
    for record in records.iter_mut().filter(|r| r.is_stale()) {
        if let Some(commit) = record.commit() {
            let sha = commit.sha.clone();
            for name in record.branch_names() {
                move_review_branch(store, name, &sha, remote).await?;
            }
        }
        record.mark_current();
    }

    if let Some(pending) = records.iter().find(|r| r.is_new()) {
        info!(
            commit = %pending.display_sha(),
            "unreviewed commits remain, keeping orphaned review branches"
        );
        return Ok(records);
    }

    let mut kept = Vec::with_capacity(records.len());
    for record in records {
        if !record.is_orphan() {
            kept.push(record);
            continue;
        }
        for name in record.branch_names() {
            store.delete_branch(name).await?;
            if let Some(remote) = remote {
                store.delete_remote_branch(remote, name).await?;
            }
            info!(branch = name, "deleted orphaned review branch");
        }
    }
    Ok(kept)
}
