//! Asynchronous `git` CLI client.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::parser::{parse_branch_listing, parse_changed_paths, parse_commit_log, COMMIT_FORMAT};
use super::{BranchStore, PushRequest};
use crate::errors::GitError;
use crate::models::{Branch, CommitInfo};

/// Client running `git` inside one working tree.
#[derive(Debug, Clone)]
pub struct GitClient {
    repo_path: PathBuf,
}

impl GitClient {
    /// Create a client operating on the repository at `repo_path`.
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        let client = Self {
            repo_path: repo_path.into(),
        };
        debug!(path = %client.repo_path.display(), "created GitClient");
        client
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Name of the checked-out branch; empty output means detached HEAD.
    #[instrument(skip(self))]
    pub async fn current_branch(&self) -> Result<Option<String>, GitError> {
        let output = self.run_git(&["branch", "--show-current"]).await?;
        let name = output.trim();
        Ok((!name.is_empty()).then(|| name.to_string()))
    }

    /// `git rebase <base> <feature>`, attached to the terminal.
    #[instrument(skip(self))]
    pub async fn rebase(&self, base: &str, feature: &str) -> Result<(), GitError> {
        self.run_git_attached(&["rebase", base, feature]).await?;
        info!(base, feature, "rebased feature branch");
        Ok(())
    }

    /// Show the change introduced by `sha` on the terminal.
    #[instrument(skip(self))]
    pub async fn show_diff(&self, sha: &str, extra_args: &[String]) -> Result<(), GitError> {
        let range = format!("{}~..{}", sha, sha);
        let mut args = vec!["diff", range.as_str()];
        args.extend(extra_args.iter().map(String::as_str));
        self.run_git_attached(&args).await
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.repo_path)
            .args(args)
            .env("LC_ALL", "C")
            .kill_on_drop(true);
        cmd
    }

    async fn run_git(&self, args: &[&str]) -> Result<String, GitError> {
        let mut cmd = self.command(args);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let command = format!("git {}", args.join(" "));
        debug!(cmd = %command, "running git command");
        let output = cmd.output().await.map_err(spawn_error)?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            let exit_code = output.status.code().unwrap_or(-1);
            warn!(exit_code, %stderr, cmd = %command, "git command failed");
            return Err(GitError::CommandFailed {
                command,
                exit_code,
                stdout,
                stderr,
            });
        }
        Ok(stdout)
    }

    async fn run_git_attached(&self, args: &[&str]) -> Result<(), GitError> {
        let mut cmd = self.command(args);
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let command = format!("git {}", args.join(" "));
        debug!(cmd = %command, "running attached git command");
        let status = cmd.status().await.map_err(spawn_error)?;
        if !status.success() {
            return Err(GitError::CommandFailed {
                command,
                exit_code: status.code().unwrap_or(-1),
                stdout: String::new(),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}

fn spawn_error(e: std::io::Error) -> GitError {
    if e.kind() == std::io::ErrorKind::NotFound {
        GitError::BinaryNotFound("git".into())
    } else {
        GitError::IoError(e)
    }
}

impl BranchStore for GitClient {
    #[instrument(skip(self))]
    async fn list_commits(&self, base: &str, feature: &str) -> Result<Vec<CommitInfo>, GitError> {
        let range = format!("{}..{}", base, feature);
        let output = self
            .run_git(&["log", "--first-parent", "--reverse", COMMIT_FORMAT, &range])
            .await?;
        parse_commit_log(&output)
    }

    #[instrument(skip(self))]
    async fn commit_info(&self, sha: &str) -> Result<CommitInfo, GitError> {
        let output = self
            .run_git(&["log", "-1", COMMIT_FORMAT, sha, "--"])
            .await?;
        parse_commit_log(&output)?
            .into_iter()
            .next()
            .ok_or_else(|| GitError::UnexpectedOutput {
                command: format!("git log -1 {}", sha),
                detail: "no commit printed".into(),
            })
    }

    #[instrument(skip(self))]
    async fn list_branches(&self) -> Result<Vec<Branch>, GitError> {
        let output = self
            .run_git(&["branch", "--format=%(objectname) %(refname:short)"])
            .await?;
        parse_branch_listing(&output)
    }

    #[instrument(skip(self))]
    async fn changed_paths(&self, sha: &str) -> Result<Vec<String>, GitError> {
        let output = self
            .run_git(&["diff-tree", "-r", "--name-only", sha])
            .await?;
        Ok(parse_changed_paths(&output))
    }

    #[instrument(skip(self))]
    async fn file_diff(&self, sha: &str, path: &str) -> Result<Vec<String>, GitError> {
        let pathspec = literal_pathspec(path);
        let output = self
            .run_git(&["diff-tree", "--unified=0", "-c", sha, "--", &pathspec])
            .await?;
        Ok(output.lines().map(str::to_string).collect())
    }

    #[instrument(skip(self))]
    async fn move_branch(&self, name: &str, sha: &str) -> Result<(), GitError> {
        self.run_git(&["branch", "-f", name, sha]).await?;
        info!(name, sha, "moved branch");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn create_branch(&self, name: &str, sha: &str) -> Result<(), GitError> {
        self.run_git(&["branch", name, sha]).await?;
        info!(name, sha, "created branch");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_branch(&self, name: &str) -> Result<(), GitError> {
        self.run_git(&["branch", "-D", name]).await?;
        info!(name, "deleted branch");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn push_branch(
        &self,
        remote: &str,
        name: &str,
        request: &PushRequest,
    ) -> Result<(), GitError> {
        let mut args = vec!["push"];
        if request.force {
            args.push("--force");
        }
        for option in &request.options {
            args.push("-o");
            args.push(option);
        }
        args.push(remote);
        args.push(name);
        self.run_git(&args).await?;
        info!(remote, name, force = request.force, "pushed branch");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_remote_branch(&self, remote: &str, name: &str) -> Result<(), GitError> {
        self.run_git(&["push", remote, "--delete", name]).await?;
        info!(remote, name, "deleted remote branch");
        Ok(())
    }
}

/// Pathspec matching `path` verbatim, without glob expansion.
fn literal_pathspec(path: &str) -> String {
    format!(":(literal){}", path)
}
