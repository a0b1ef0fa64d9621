//! Creation of review branches for unreviewed commits.

use tracing::{info, instrument};

use crate::enumerate::review_branch_name;
use crate::errors::GitError;
use crate::git::{BranchStore, PushRequest};
use crate::models::{FeatureCommit, Record, RecordKind, ReviewBranch};

/// Naming and propagation settings for new review branches.
#[derive(Debug, Clone, Default)]
pub struct MakeOptions<'a> {
    pub prefix: &'a str,
    pub feature: &'a str,
    pub base: &'a str,
    /// Push created branches to this remote.
    pub remote: Option<&'a str>,
    /// Ask the remote to open a merge request on push.
    pub merge_request: bool,
    pub title_prefix: Option<&'a str>,
}

/// `Draft: [<title_prefix>: ]<subject>`
pub fn merge_request_title(title_prefix: Option<&str>, subject: &str) -> String {
    let mut title = String::from("Draft: ");
    if let Some(prefix) = title_prefix.filter(|p| !p.is_empty()) {
        title.push_str(prefix);
        title.push_str(": ");
    }
    title.push_str(subject);
    title
}

/// Push options asking the server to open a draft merge request of the
/// commit against `target`.
pub fn merge_request_options(
    title_prefix: Option<&str>,
    commit: &FeatureCommit,
    target: &str,
) -> Vec<String> {
    let mut options = vec![
        "merge_request.create".to_string(),
        format!("merge_request.target={}", target),
        format!(
            "merge_request.title={}",
            merge_request_title(title_prefix, &commit.subject)
        ),
    ];
    if !commit.description.is_empty() {
        options.push(format!("merge_request.description={}", commit.description));
    }
    options
}

/// Create a review branch for every new record, in listing order.
///
/// Reviews are stacked: the first one targets the base branch, every later
/// one targets the first review branch of the record before it. Created
/// records come back as current.
#[instrument(skip_all, fields(feature = opts.feature, records = records.len()))]
pub async fn make_review_branches<S: BranchStore>(
    store: &S,
    mut records: Vec<Record>,
    opts: &MakeOptions<'_>,
) -> Result<Vec<Record>, GitError> {
    let mut target = opts.base.to_string();

    for record in records.iter_mut() {
        if let RecordKind::New { commit } = &record.kind {
            let name = review_branch_name(opts.prefix, opts.feature, record.id);
            store.create_branch(&name, &commit.sha).await?;

            if let Some(remote) = opts.remote {
                let request = PushRequest {
                    force: false,
                    options: if opts.merge_request {
                        merge_request_options(opts.title_prefix, commit, &target)
                    } else {
                        Vec::new()
                    },
                };
                store.push_branch(remote, &name, &request).await?;
            }
            info!(branch = %name, target = %target, "created review branch");

            let commit = commit.clone();
            record.kind = RecordKind::Current {
                branches: vec![ReviewBranch {
                    name,
                    numeric_suffix: record.id,
                    tip_sha: commit.sha.clone(),
                }],
                commit,
            };
        }

        target = match record.branches().first() {
            Some(branch) => branch.name.clone(),
            None => opts.base.to_string(),
        };
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordState;
    use crate::testing::MemoryStore;

    fn commit(sha: &str, position: usize, description: &str) -> FeatureCommit {
        FeatureCommit {
            sha: sha.into(),
            subject: format!("subject {}", sha),
            description: description.into(),
            position,
        }
    }

    fn opts(remote: Option<&'static str>) -> MakeOptions<'static> {
        MakeOptions {
            prefix: "review",
            feature: "feat",
            base: "main",
            remote,
            merge_request: true,
            title_prefix: None,
        }
    }

    #[test]
    fn test_title() {
        assert_eq!(merge_request_title(None, "add A"), "Draft: add A");
        assert_eq!(merge_request_title(Some(""), "add A"), "Draft: add A");
        assert_eq!(
            merge_request_title(Some("PROJ-1"), "add A"),
            "Draft: PROJ-1: add A"
        );
    }

    #[test]
    fn test_options_carry_description_only_when_present() {
        let plain = merge_request_options(None, &commit("c1", 0, ""), "main");
        assert_eq!(
            plain,
            vec![
                "merge_request.create",
                "merge_request.target=main",
                "merge_request.title=Draft: subject c1",
            ]
        );
        let with_body = merge_request_options(None, &commit("c1", 0, "why"), "main");
        assert_eq!(with_body.last().unwrap(), "merge_request.description=why");
    }

    #[tokio::test]
    async fn test_creates_branches_for_new_records_only() {
        let store = MemoryStore::new();
        store.set_branch("review/feat/1", "c1");

        let records = vec![
            Record {
                id: 1,
                kind: RecordKind::Current {
                    commit: commit("c1", 0, ""),
                    branches: vec![ReviewBranch {
                        name: "review/feat/1".into(),
                        numeric_suffix: 1,
                        tip_sha: "c1".into(),
                    }],
                },
            },
            Record::new_commit(commit("c2", 1, ""), 2),
        ];
        let records = make_review_branches(&store, records, &opts(None)).await.unwrap();

        assert!(records.iter().all(|r| r.state() == RecordState::Current));
        assert_eq!(records[1].branch_names(), vec!["review/feat/2"]);
        assert_eq!(store.branch_tip("review/feat/2").as_deref(), Some("c2"));
        assert_eq!(store.count_calls("create_branch"), 1);
        assert!(store.pushes().is_empty());
    }

    #[tokio::test]
    async fn test_pushed_reviews_are_stacked() {
        let store = MemoryStore::new();
        let records = vec![
            Record::new_commit(commit("c1", 0, ""), 1),
            Record::new_commit(commit("c2", 1, "body"), 2),
        ];
        make_review_branches(&store, records, &opts(Some("origin")))
            .await
            .unwrap();

        let pushes = store.pushes();
        assert_eq!(pushes.len(), 2);
        assert_eq!(pushes[0].0, "review/feat/1");
        assert!(!pushes[0].1.force);
        assert!(pushes[0].1.options.contains(&"merge_request.target=main".to_string()));
        assert!(pushes[1]
            .1
            .options
            .contains(&"merge_request.target=review/feat/1".to_string()));
        assert!(pushes[1]
            .1
            .options
            .contains(&"merge_request.description=body".to_string()));
    }

    #[tokio::test]
    async fn test_merge_request_options_can_be_disabled() {
        let store = MemoryStore::new();
        let mut options = opts(Some("origin"));
        options.merge_request = false;
        make_review_branches(&store, vec![Record::new_commit(commit("c1", 0, ""), 1)], &options)
            .await
            .unwrap();
        assert_eq!(
            store.pushes(),
            vec![("review/feat/1".to_string(), PushRequest::default())]
        );
    }

    #[tokio::test]
    async fn test_existing_branch_aborts() {
        let store = MemoryStore::new();
        store.set_branch("review/feat/1", "elsewhere");
        let err = make_review_branches(
            &store,
            vec![Record::new_commit(commit("c1", 0, ""), 1)],
            &opts(Some("origin")),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, GitError::CommandFailed { .. }));
        assert!(store.pushes().is_empty());
    }
}
