//! The review engine: one feature branch, its base, and its review branches.
//!
//! Every operation re-derives the record listing from the live store; nothing
//! is remembered between calls.

use tracing::{info, instrument};

use crate::assign::assign;
use crate::config::GiiterConfig;
use crate::enumerate::{feature_commits, review_branches};
use crate::errors::{CoreError, InputError};
use crate::git::BranchStore;
use crate::make::{make_review_branches, MakeOptions};
use crate::matcher::reconcile;
use crate::models::{Record, ReviewBranch};
use crate::refresh::refresh;

/// Everything one run needs to know, resolved up front.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub base: String,
    pub feature: String,
    pub prefix: String,
    pub use_subject_fallback: bool,
    /// Remote to propagate branch changes to; `None` keeps them local.
    pub remote: Option<String>,
    pub merge_request: bool,
    pub title_prefix: Option<String>,
}

impl EngineConfig {
    pub fn new(base: impl Into<String>, feature: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            feature: feature.into(),
            prefix: "review".into(),
            use_subject_fallback: false,
            remote: None,
            merge_request: true,
            title_prefix: None,
        }
    }

    /// Combine resolved branches with the settings of a config file.
    pub fn from_config(
        config: &GiiterConfig,
        base: impl Into<String>,
        feature: impl Into<String>,
    ) -> Self {
        Self {
            base: base.into(),
            feature: feature.into(),
            prefix: config.review.prefix.clone(),
            use_subject_fallback: config.review.subject_fallback,
            remote: config.push_remote().map(str::to_string),
            merge_request: config.remote.merge_request,
            title_prefix: config.review.title_prefix.clone(),
        }
    }
}

pub struct ReviewEngine<S> {
    store: S,
    config: EngineConfig,
}

impl<S: BranchStore> ReviewEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn remote(&self) -> Option<&str> {
        self.config.remote.as_deref()
    }

    /// Enumerate and match. Never mutates the store.
    #[instrument(skip(self), fields(feature = %self.config.feature, base = %self.config.base))]
    pub async fn reconcile(&self) -> Result<Vec<Record>, CoreError> {
        let commits = feature_commits(&self.store, &self.config.base, &self.config.feature).await?;
        let branches = self.review_branches().await?;
        let records = reconcile(
            &self.store,
            commits,
            branches,
            self.config.use_subject_fallback,
        )
        .await?;
        Ok(records)
    }

    /// Reconcile, then converge stale branches and clean up orphans.
    pub async fn refresh(&self) -> Result<Vec<Record>, CoreError> {
        let records = self.reconcile().await?;
        Ok(refresh(&self.store, records, self.remote()).await?)
    }

    /// Move the single review branch of the record at `branch_position` onto
    /// the commit of the record at `commit_position` (both 1-based), then
    /// return the fresh listing.
    pub async fn assign(
        &self,
        commit_position: usize,
        branch_position: usize,
    ) -> Result<Vec<Record>, CoreError> {
        let records = self.reconcile().await?;
        assign(
            &self.store,
            &records,
            commit_position,
            branch_position,
            self.remote(),
        )
        .await?;
        self.reconcile().await
    }

    /// Refresh, then create review branches for every unreviewed commit.
    pub async fn make(&self) -> Result<Vec<Record>, CoreError> {
        let records = self.refresh().await?;
        let opts = MakeOptions {
            prefix: &self.config.prefix,
            feature: &self.config.feature,
            base: &self.config.base,
            remote: self.remote(),
            merge_request: self.config.merge_request,
            title_prefix: self.config.title_prefix.as_deref(),
        };
        Ok(make_review_branches(&self.store, records, &opts).await?)
    }

    pub async fn review_branches(&self) -> Result<Vec<ReviewBranch>, CoreError> {
        review_branches(&self.store, &self.config.prefix, &self.config.feature).await
    }

    /// Delete every review branch of the feature, locally and on the remote.
    /// Returns the deleted branch names.
    #[instrument(skip(self), fields(feature = %self.config.feature))]
    pub async fn delete_all(&self) -> Result<Vec<String>, CoreError> {
        let branches = self.review_branches().await?;
        let mut deleted = Vec::with_capacity(branches.len());
        for branch in branches {
            self.store.delete_branch(&branch.name).await?;
            if let Some(remote) = self.remote() {
                self.store.delete_remote_branch(remote, &branch.name).await?;
            }
            info!(branch = %branch.name, "deleted review branch");
            deleted.push(branch.name);
        }
        Ok(deleted)
    }

    /// The record shown at 1-based `position` of the listing.
    pub async fn record_at(&self, position: usize) -> Result<Record, CoreError> {
        let mut records = self.reconcile().await?;
        let len = records.len();
        if position == 0 || position > len {
            return Err(InputError::UnknownPosition { position, len }.into());
        }
        Ok(records.swap_remove(position - 1))
    }
}
