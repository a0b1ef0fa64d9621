//! In-memory [`BranchStore`] for unit tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::errors::GitError;
use crate::git::{BranchStore, PushRequest};
use crate::models::{Branch, CommitInfo, CommitMessage};

#[derive(Default)]
pub struct MemoryStore {
    range: RefCell<Vec<CommitInfo>>,
    messages: RefCell<HashMap<String, CommitMessage>>,
    paths: RefCell<HashMap<String, Vec<String>>>,
    diffs: RefCell<HashMap<(String, String), Vec<String>>>,
    branches: RefCell<BTreeMap<String, String>>,
    failing: RefCell<HashSet<String>>,
    calls: RefCell<Vec<String>>,
    pushes: RefCell<Vec<(String, PushRequest)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a commit to the feature range.
    pub fn push_commit(&self, sha: &str, subject: &str) {
        self.push_commit_with_body(sha, subject, "");
    }

    pub fn push_commit_with_body(&self, sha: &str, subject: &str, description: &str) {
        let message = CommitMessage {
            subject: subject.into(),
            description: description.into(),
        };
        self.messages.borrow_mut().insert(sha.into(), message.clone());
        self.range.borrow_mut().push(CommitInfo {
            sha: sha.into(),
            message,
        });
    }

    /// Register a commit outside the feature range (a review branch tip).
    pub fn add_commit(&self, sha: &str, subject: &str) {
        self.messages.borrow_mut().insert(
            sha.into(),
            CommitMessage {
                subject: subject.into(),
                description: String::new(),
            },
        );
    }

    pub fn add_file_diff(&self, sha: &str, path: &str, lines: Vec<String>) {
        self.paths
            .borrow_mut()
            .entry(sha.into())
            .or_default()
            .push(path.into());
        self.diffs
            .borrow_mut()
            .insert((sha.into(), path.into()), lines);
    }

    /// Register a one-hunk text modification of `path` in `sha`.
    pub fn add_modification(&self, sha: &str, path: &str, hunk: &str, body: &[&str]) {
        let mut lines = vec![
            sha.to_string(),
            format!("diff --git a/{0} b/{0}", path),
            "index 1111111..2222222 100644".to_string(),
            format!("--- a/{}", path),
            format!("+++ b/{}", path),
            hunk.to_string(),
        ];
        lines.extend(body.iter().map(|l| l.to_string()));
        self.add_file_diff(sha, path, lines);
    }

    pub fn add_binary(&self, sha: &str, path: &str) {
        self.add_file_diff(
            sha,
            path,
            vec![
                sha.to_string(),
                format!("diff --git a/{0} b/{0}", path),
                "index 1111111..2222222 100644".to_string(),
                format!("Binary files a/{0} and b/{0} differ", path),
            ],
        );
    }

    pub fn set_branch(&self, name: &str, tip: &str) {
        self.branches.borrow_mut().insert(name.into(), tip.into());
    }

    pub fn branch_tip(&self, name: &str) -> Option<String> {
        self.branches.borrow().get(name).cloned()
    }

    pub fn branch_names(&self) -> Vec<String> {
        self.branches.borrow().keys().cloned().collect()
    }

    /// Make the call rendered as `call` (see [`MemoryStore::calls`]) fail.
    pub fn fail_on(&self, call: &str) {
        self.failing.borrow_mut().insert(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    pub fn pushes(&self) -> Vec<(String, PushRequest)> {
        self.pushes.borrow().clone()
    }

    pub fn reset_calls(&self) {
        self.calls.borrow_mut().clear();
        self.pushes.borrow_mut().clear();
    }

    fn record(&self, call: String) -> Result<(), GitError> {
        let failing = self.failing.borrow().contains(&call);
        self.calls.borrow_mut().push(call.clone());
        if failing {
            return Err(GitError::CommandFailed {
                command: call,
                exit_code: 1,
                stdout: String::new(),
                stderr: "injected failure".into(),
            });
        }
        Ok(())
    }

    fn missing(call: &str, detail: &str) -> GitError {
        GitError::CommandFailed {
            command: call.into(),
            exit_code: 128,
            stdout: String::new(),
            stderr: detail.into(),
        }
    }
}

impl BranchStore for MemoryStore {
    async fn list_commits(&self, base: &str, feature: &str) -> Result<Vec<CommitInfo>, GitError> {
        self.record(format!("list_commits {}..{}", base, feature))?;
        Ok(self.range.borrow().clone())
    }

    async fn commit_info(&self, sha: &str) -> Result<CommitInfo, GitError> {
        let call = format!("commit_info {}", sha);
        self.record(call.clone())?;
        let message = self
            .messages
            .borrow()
            .get(sha)
            .cloned()
            .ok_or_else(|| Self::missing(&call, "unknown revision"))?;
        Ok(CommitInfo {
            sha: sha.into(),
            message,
        })
    }

    async fn list_branches(&self) -> Result<Vec<Branch>, GitError> {
        self.record("list_branches".into())?;
        Ok(self
            .branches
            .borrow()
            .iter()
            .map(|(name, tip)| Branch {
                name: name.clone(),
                tip: tip.clone(),
            })
            .collect())
    }

    async fn changed_paths(&self, sha: &str) -> Result<Vec<String>, GitError> {
        self.record(format!("changed_paths {}", sha))?;
        Ok(self.paths.borrow().get(sha).cloned().unwrap_or_default())
    }

    async fn file_diff(&self, sha: &str, path: &str) -> Result<Vec<String>, GitError> {
        self.record(format!("file_diff {} {}", sha, path))?;
        Ok(self
            .diffs
            .borrow()
            .get(&(sha.to_string(), path.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn move_branch(&self, name: &str, sha: &str) -> Result<(), GitError> {
        self.record(format!("move_branch {} {}", name, sha))?;
        self.set_branch(name, sha);
        Ok(())
    }

    async fn create_branch(&self, name: &str, sha: &str) -> Result<(), GitError> {
        let call = format!("create_branch {} {}", name, sha);
        self.record(call.clone())?;
        if self.branches.borrow().contains_key(name) {
            return Err(Self::missing(&call, "branch already exists"));
        }
        self.set_branch(name, sha);
        Ok(())
    }

    async fn delete_branch(&self, name: &str) -> Result<(), GitError> {
        let call = format!("delete_branch {}", name);
        self.record(call.clone())?;
        if self.branches.borrow_mut().remove(name).is_none() {
            return Err(Self::missing(&call, "branch not found"));
        }
        Ok(())
    }

    async fn push_branch(
        &self,
        remote: &str,
        name: &str,
        request: &PushRequest,
    ) -> Result<(), GitError> {
        self.record(format!("push_branch {} {}", remote, name))?;
        self.pushes
            .borrow_mut()
            .push((name.to_string(), request.clone()));
        Ok(())
    }

    async fn delete_remote_branch(&self, remote: &str, name: &str) -> Result<(), GitError> {
        self.record(format!("delete_remote_branch {} {}", remote, name))
    }
}
