//! Parsers for line-oriented `git` output.

use tracing::{debug, warn};

use crate::errors::GitError;
use crate::models::{Branch, CommitInfo, CommitMessage};

/// Separates fields of one commit in our `--format` strings.
pub const FIELD_SEP: char = '\x1f';
/// Terminates one commit in our `--format` strings.
pub const RECORD_SEP: char = '\x1e';

/// `--format` producing `sha, subject, body` for [`parse_commit_log`].
pub const COMMIT_FORMAT: &str = "--format=%H%x1f%s%x1f%b%x1e";

/// Parse `git log` output produced with [`COMMIT_FORMAT`].
pub fn parse_commit_log(output: &str) -> Result<Vec<CommitInfo>, GitError> {
    let mut commits = Vec::new();
    for chunk in output.split(RECORD_SEP) {
        let chunk = chunk.trim_start_matches(['\n', '\r']);
        if chunk.trim().is_empty() {
            continue;
        }
        let mut fields = chunk.splitn(3, FIELD_SEP);
        let sha = fields.next().unwrap_or_default().trim();
        let subject = fields.next().ok_or_else(|| GitError::UnexpectedOutput {
            command: "git log".into(),
            detail: format!("missing subject for commit '{}'", sha),
        })?;
        let description = fields.next().unwrap_or_default();
        commits.push(CommitInfo {
            sha: sha.to_string(),
            message: CommitMessage {
                subject: subject.to_string(),
                description: description.trim_end().to_string(),
            },
        });
    }
    debug!(count = commits.len(), "parsed git log entries");
    Ok(commits)
}

/// Parse `git branch --format='%(objectname) %(refname:short)'`.
pub fn parse_branch_listing(output: &str) -> Result<Vec<Branch>, GitError> {
    let mut branches = Vec::new();
    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let (tip, name) = line.split_once(' ').ok_or_else(|| GitError::UnexpectedOutput {
            command: "git branch".into(),
            detail: format!("malformed branch line '{}'", line),
        })?;
        // Detached HEAD shows up as "(HEAD detached at ...)".
        if name.starts_with('(') {
            continue;
        }
        branches.push(Branch {
            name: name.trim().to_string(),
            tip: tip.to_string(),
        });
    }
    debug!(count = branches.len(), "parsed branch listing");
    Ok(branches)
}

/// Parse `git diff-tree -r --name-only <sha>`. The first line is the commit id
/// itself and is not a path.
pub fn parse_changed_paths(output: &str) -> Vec<String> {
    output
        .lines()
        .skip(1)
        .filter(|l| !l.is_empty())
        .map(unquote_path)
        .collect()
}

/// Undo git's C-style quoting of unusual path names.
pub fn unquote_path(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    else {
        return raw.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.bytes().peekable();
    while let Some(b) = chars.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        match chars.next() {
            Some(b'a') => bytes.push(0x07),
            Some(b'b') => bytes.push(0x08),
            Some(b't') => bytes.push(b'\t'),
            Some(b'n') => bytes.push(b'\n'),
            Some(b'v') => bytes.push(0x0b),
            Some(b'f') => bytes.push(0x0c),
            Some(b'r') => bytes.push(b'\r'),
            Some(d @ b'0'..=b'7') => {
                let mut value = u32::from(d - b'0');
                for _ in 0..2 {
                    match chars.peek() {
                        Some(&o @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(o - b'0');
                            chars.next();
                        }
                        _ => break,
                    }
                }
                bytes.push(value as u8);
            }
            Some(other) => bytes.push(other),
            None => {
                warn!(path = raw, "dangling escape in quoted path");
                bytes.push(b'\\');
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// How one file changed in a commit, as far as fingerprinting cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDiff {
    Added,
    Deleted,
    Binary,
    /// Content lines of a zero-context diff, without file and hunk headers.
    Modified { body: Vec<String> },
}

/// Classify the zero-context diff of a single path.
///
/// Added/deleted markers win over the binary indicator: an added binary file
/// is still identified by its path.
pub fn classify_file_diff(lines: &[String]) -> FileDiff {
    let mut body = Vec::new();
    let mut seen_diff = false;
    let mut in_header = false;

    for line in lines {
        if line.starts_with("diff --") {
            seen_diff = true;
            in_header = true;
            continue;
        }
        // diff-tree prints the commit id before the first file header.
        if !seen_diff {
            continue;
        }
        if in_header {
            if line.starts_with("new file mode") {
                return FileDiff::Added;
            }
            if line.starts_with("deleted file mode") {
                return FileDiff::Deleted;
            }
            if line.starts_with("Binary files") || line.starts_with("GIT binary patch") {
                return FileDiff::Binary;
            }
            if line.starts_with("+++ ") {
                in_header = false;
            }
            continue;
        }
        if line.starts_with("@@") {
            continue;
        }
        body.push(line.clone());
    }

    FileDiff::Modified { body }
}
