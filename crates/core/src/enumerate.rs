//! Enumeration of the feature stack and of its review branches.

use tracing::{debug, instrument};

use crate::errors::{CoreError, GitError, InputError};
use crate::git::BranchStore;
use crate::models::{Branch, FeatureCommit, ReviewBranch};

/// `<prefix>/<feature>/`, the namespace holding a feature's review branches.
pub fn review_namespace(prefix: &str, feature: &str) -> String {
    format!("{}/{}/", prefix, feature)
}

pub fn review_branch_name(prefix: &str, feature: &str, id: u64) -> String {
    format!("{}{}", review_namespace(prefix, feature), id)
}

/// Pick the review branches of `feature` out of a full branch listing,
/// ordered by numeric suffix and then by name.
///
/// Every branch inside the namespace must end in a decimal number.
pub fn parse_review_branches(
    branches: &[Branch],
    prefix: &str,
    feature: &str,
) -> Result<Vec<ReviewBranch>, InputError> {
    let namespace = review_namespace(prefix, feature);
    let mut review = Vec::new();

    for branch in branches {
        let Some(suffix) = branch.name.strip_prefix(&namespace) else {
            continue;
        };
        let numeric_suffix = suffix
            .bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| suffix.parse::<u64>().ok())
            .flatten()
            .ok_or_else(|| InputError::InvalidBranchSuffix {
                branch: branch.name.clone(),
                suffix: suffix.to_string(),
            })?;
        review.push(ReviewBranch {
            name: branch.name.clone(),
            numeric_suffix,
            tip_sha: branch.tip.clone(),
        });
    }

    review.sort_by(|a, b| {
        a.numeric_suffix
            .cmp(&b.numeric_suffix)
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(review)
}

/// The commits of `base..feature` along first parents, oldest first.
#[instrument(skip(store))]
pub async fn feature_commits<S: BranchStore>(
    store: &S,
    base: &str,
    feature: &str,
) -> Result<Vec<FeatureCommit>, GitError> {
    let commits = store
        .list_commits(base, feature)
        .await?
        .into_iter()
        .enumerate()
        .map(|(position, info)| FeatureCommit {
            sha: info.sha,
            subject: info.message.subject,
            description: info.message.description,
            position,
        })
        .collect::<Vec<_>>();
    debug!(count = commits.len(), "enumerated feature commits");
    Ok(commits)
}

/// The review branches of `feature` currently in the store.
#[instrument(skip(store))]
pub async fn review_branches<S: BranchStore>(
    store: &S,
    prefix: &str,
    feature: &str,
) -> Result<Vec<ReviewBranch>, CoreError> {
    let branches = store.list_branches().await?;
    let review = parse_review_branches(&branches, prefix, feature)?;
    debug!(count = review.len(), "enumerated review branches");
    Ok(review)
}
