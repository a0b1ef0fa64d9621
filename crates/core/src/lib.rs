//! giiter core library.
//!
//! Keeps one review branch per commit of a stacked feature branch: commits are
//! matched to their review branches by SHA, by diff fingerprint and optionally
//! by subject, and the review branches are then moved, created or deleted to
//! follow the rewritten history.

pub mod assign;
pub mod config;
pub mod engine;
pub mod enumerate;
pub mod errors;
pub mod fingerprint;
pub mod git;
pub mod make;
pub mod matcher;
pub mod models;
pub mod refresh;

#[cfg(test)]
mod testing;

// Re-exports for convenience.
pub use config::GiiterConfig;
pub use engine::{EngineConfig, ReviewEngine};
pub use git::GitClient;
