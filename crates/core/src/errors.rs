//! Error types for the giiter core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them all for callers that want a
//! single error type.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Assign(#[from] AssignError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Failures of the external `git` process.
#[derive(Debug, Error)]
pub enum GitError {
    /// The `git` binary was not found on `$PATH`.
    #[error("git binary not found: {0}")]
    BinaryNotFound(String),

    /// A `git` command exited with a non-zero status.
    #[error("`{command}` failed (exit {exit_code}): {}", captured_output(.stdout, .stderr))]
    CommandFailed {
        command: String,
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    /// `git` succeeded but printed something we could not interpret.
    #[error("unexpected output from `{command}`: {detail}")]
    UnexpectedOutput { command: String, detail: String },

    /// Generic I/O wrapper.
    #[error("git I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

fn captured_output(stdout: &str, stderr: &str) -> String {
    match (stdout.trim(), stderr.trim()) {
        ("", "") => "no output".to_string(),
        (out, "") => out.to_string(),
        ("", err) => err.to_string(),
        (out, err) => format!("{}\n{}", err, out),
    }
}

// ---------------------------------------------------------------------------
// Input errors
// ---------------------------------------------------------------------------

/// Malformed or missing input detected before anything is mutated.
#[derive(Debug, Error)]
pub enum InputError {
    /// A branch inside the review namespace does not end in a number.
    #[error("review branch '{branch}' has non-numeric suffix '{suffix}'")]
    InvalidBranchSuffix { branch: String, suffix: String },

    /// A required branch name could not be determined.
    #[error("{0} branch is required")]
    MissingBranch(&'static str),

    /// `main`/`master` cannot be used as a feature branch.
    #[error("'{0}' is protected and cannot be used as a feature branch")]
    ProtectedBranch(String),

    /// A listing position that does not exist.
    #[error("position {position} is out of range (1..={len})")]
    UnknownPosition { position: usize, len: usize },

    /// A review branch already uses the largest representable id.
    #[error("no review id is left above {0}")]
    IdSpaceExhausted(u64),
}

// ---------------------------------------------------------------------------
// Assign errors
// ---------------------------------------------------------------------------

/// Rejections of a manual commit-to-branch assignment.
#[derive(Debug, Error)]
pub enum AssignError {
    #[error("{which} position {position} is out of range (1..={len})")]
    PositionOutOfRange {
        which: &'static str,
        position: usize,
        len: usize,
    },

    #[error("commit and branch positions both point at record {0}")]
    SamePosition(usize),

    #[error("commit already has a review (record {0})")]
    AlreadyReviewed(usize),

    #[error("record {0} has no review branch to reassign")]
    NoReviewBranch(usize),

    #[error("unable to choose any review branch: record {position} has {}", .branches.join(", "))]
    AmbiguousReviewBranch {
        position: usize,
        branches: Vec<String>,
    },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// TOML serialization error when writing the file back.
    #[error("configuration serialize error: {0}")]
    SerializeError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading or writing the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
