//! Pairing of feature commits with review branches.
//!
//! Every review branch is matched against the feature commits by three tiers,
//! the first success winning:
//!
//! 1. its tip is one of the feature commits (the pair is current);
//! 2. its tip has the same [fingerprint](crate::fingerprint) as a feature
//!    commit (the pair is stale, the commit was rewritten);
//! 3. optionally, its tip has the same subject line as a feature commit.
//!
//! Branches that match nothing become orphans, commits left without a branch
//! become new records and receive fresh ids above every existing suffix.
//!
//! The exact tier runs for all branches before any heuristic, and branches are
//! visited in ascending suffix order, so the outcome does not depend on how
//! the store happens to list branches. The matcher only reads from the store.

use std::collections::HashMap;

use tracing::{debug, instrument};

use crate::errors::{CoreError, GitError, InputError};
use crate::fingerprint::FingerprintCache;
use crate::git::BranchStore;
use crate::models::{CommitInfo, FeatureCommit, Record, RecordKind, ReviewBranch};

/// A feature commit and whatever got attached to it so far.
struct Slot {
    commit: FeatureCommit,
    branches: Vec<ReviewBranch>,
    review: Option<CommitInfo>,
}

impl Slot {
    fn is_free(&self) -> bool {
        self.branches.is_empty()
    }
}

struct OrphanSlot {
    review: CommitInfo,
    branches: Vec<ReviewBranch>,
}

struct Matcher<'a, S> {
    store: &'a S,
    use_subject_fallback: bool,
    slots: Vec<Slot>,
    sha_index: HashMap<String, usize>,
    /// Tip SHA of heuristically matched branches -> slot.
    stale_index: HashMap<String, usize>,
    orphans: Vec<OrphanSlot>,
    orphan_index: HashMap<String, usize>,
    fingerprints: FingerprintCache,
    /// Built on the first branch that misses the exact tier.
    fingerprint_index: Option<HashMap<String, Vec<usize>>>,
}

/// Reconcile `commits` (oldest first) with the review `branches` of the same
/// feature and return the records in listing order: commits in position
/// order, then orphans.
#[instrument(skip_all, fields(commits = commits.len(), branches = branches.len()))]
pub async fn reconcile<S: BranchStore>(
    store: &S,
    commits: Vec<FeatureCommit>,
    mut branches: Vec<ReviewBranch>,
    use_subject_fallback: bool,
) -> Result<Vec<Record>, CoreError> {
    branches.sort_by(|a, b| {
        a.numeric_suffix
            .cmp(&b.numeric_suffix)
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut matcher = Matcher::new(store, commits, use_subject_fallback);

    let mut pending = Vec::new();
    for branch in branches {
        if let Some(branch) = matcher.attach_exact(branch) {
            pending.push(branch);
        }
    }
    for branch in pending {
        matcher.attach_heuristic(branch).await?;
    }

    Ok(matcher.into_records()?)
}

impl<'a, S: BranchStore> Matcher<'a, S> {
    fn new(store: &'a S, commits: Vec<FeatureCommit>, use_subject_fallback: bool) -> Self {
        let mut sha_index = HashMap::with_capacity(commits.len());
        let mut slots = Vec::with_capacity(commits.len());
        for commit in commits {
            sha_index.entry(commit.sha.clone()).or_insert(slots.len());
            slots.push(Slot {
                commit,
                branches: Vec::new(),
                review: None,
            });
        }
        Self {
            store,
            use_subject_fallback,
            slots,
            sha_index,
            stale_index: HashMap::new(),
            orphans: Vec::new(),
            orphan_index: HashMap::new(),
            fingerprints: FingerprintCache::new(),
            fingerprint_index: None,
        }
    }

    /// Exact-SHA tier. Returns the branch back when it does not apply.
    fn attach_exact(&mut self, branch: ReviewBranch) -> Option<ReviewBranch> {
        match self.sha_index.get(&branch.tip_sha) {
            Some(&index) => {
                debug!(branch = %branch.name, "matched by sha");
                self.slots[index].branches.push(branch);
                None
            }
            None => Some(branch),
        }
    }

    async fn attach_heuristic(&mut self, branch: ReviewBranch) -> Result<(), GitError> {
        let tip = branch.tip_sha.clone();

        // Branches sharing a tip share the outcome of the first one.
        if let Some(&index) = self.stale_index.get(&tip) {
            self.slots[index].branches.push(branch);
            return Ok(());
        }
        if let Some(&index) = self.orphan_index.get(&tip) {
            self.orphans[index].branches.push(branch);
            return Ok(());
        }

        let review = self.store.commit_info(&tip).await?;

        if let Some(index) = self.match_fingerprint(&tip).await? {
            debug!(branch = %branch.name, commit = %self.slots[index].commit.sha, "matched by fingerprint");
            self.attach_stale(index, branch, review);
            return Ok(());
        }

        if self.use_subject_fallback {
            let found = self
                .slots
                .iter()
                .position(|s| s.is_free() && s.commit.subject == review.message.subject);
            if let Some(index) = found {
                debug!(branch = %branch.name, commit = %self.slots[index].commit.sha, "matched by subject");
                self.attach_stale(index, branch, review);
                return Ok(());
            }
        }

        debug!(branch = %branch.name, "no matching commit, orphan");
        self.orphan_index.insert(tip, self.orphans.len());
        self.orphans.push(OrphanSlot {
            review,
            branches: vec![branch],
        });
        Ok(())
    }

    fn attach_stale(&mut self, index: usize, branch: ReviewBranch, review: CommitInfo) {
        self.stale_index.insert(branch.tip_sha.clone(), index);
        let slot = &mut self.slots[index];
        slot.review = Some(review);
        slot.branches.push(branch);
    }

    /// First free slot whose commit fingerprint equals the one of `tip`.
    async fn match_fingerprint(&mut self, tip: &str) -> Result<Option<usize>, GitError> {
        self.ensure_fingerprint_index().await?;

        let fingerprint = self.fingerprints.get(self.store, tip).await?;
        let Some(value) = fingerprint.value() else {
            return Ok(None);
        };
        let candidates = self
            .fingerprint_index
            .as_ref()
            .and_then(|index| index.get(value));
        Ok(candidates.and_then(|candidates| {
            candidates
                .iter()
                .copied()
                .find(|&index| self.slots[index].is_free())
        }))
    }

    async fn ensure_fingerprint_index(&mut self) -> Result<(), GitError> {
        if self.fingerprint_index.is_some() {
            return Ok(());
        }
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (position, slot) in self.slots.iter().enumerate() {
            let fingerprint = self.fingerprints.get(self.store, &slot.commit.sha).await?;
            if let Some(value) = fingerprint.value() {
                index.entry(value.to_string()).or_default().push(position);
            }
        }
        debug!(commits = self.slots.len(), distinct = index.len(), "built fingerprint index");
        self.fingerprint_index = Some(index);
        Ok(())
    }

    fn into_records(self) -> Result<Vec<Record>, InputError> {
        let mut records = Vec::with_capacity(self.slots.len() + self.orphans.len());

        for slot in self.slots {
            let id = min_suffix(&slot.branches);
            let kind = match slot.review {
                _ if slot.branches.is_empty() => RecordKind::New {
                    commit: slot.commit,
                },
                Some(review) => RecordKind::Stale {
                    commit: slot.commit,
                    review,
                    branches: slot.branches,
                },
                None => RecordKind::Current {
                    commit: slot.commit,
                    branches: slot.branches,
                },
            };
            records.push(Record { id, kind });
        }

        for orphan in self.orphans {
            records.push(Record {
                id: min_suffix(&orphan.branches),
                kind: RecordKind::Orphan {
                    review: orphan.review,
                    branches: orphan.branches,
                },
            });
        }

        allocate_ids(&mut records)?;
        Ok(records)
    }
}

fn min_suffix(branches: &[ReviewBranch]) -> u64 {
    branches.iter().map(|b| b.numeric_suffix).min().unwrap_or(0)
}

/// Give new records ids above every suffix in use, in listing order.
fn allocate_ids(records: &mut [Record]) -> Result<(), InputError> {
    let mut max_id = records
        .iter()
        .filter_map(Record::max_branch_id)
        .max()
        .unwrap_or(0);
    for record in records.iter_mut().filter(|r| r.is_new()) {
        max_id = max_id
            .checked_add(1)
            .ok_or(InputError::IdSpaceExhausted(max_id))?;
        record.id = max_id;
    }
    Ok(())
}
