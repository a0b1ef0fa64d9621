//! Configuration for giiter.
//!
//! Read from a TOML file; every section is optional. Besides the tool
//! settings the file remembers which base branch each feature branch was
//! last reconciled against.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, level_filters::LevelFilter};

use crate::errors::{ConfigError, InputError};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GiiterConfig {
    /// Review branch naming and matching.
    #[serde(default)]
    pub review: ReviewSection,

    /// Propagation of review branches to a remote.
    #[serde(default)]
    pub remote: RemoteSection,

    #[serde(default)]
    pub log: LogSection,

    /// Remembered base branch per feature branch.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<FeatureBranch>,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSection {
    /// First component of review branch names, `<prefix>/<feature>/<n>`.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Match rewritten commits by subject line when their content changed.
    #[serde(default)]
    pub subject_fallback: bool,

    /// Inserted into merge request titles: `Draft: <title_prefix>: <subject>`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title_prefix: Option<String>,
}

impl Default for ReviewSection {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            subject_fallback: false,
            title_prefix: None,
        }
    }
}

fn default_prefix() -> String {
    "review".into()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteSection {
    /// Push moved and created review branches, delete removed ones remotely.
    #[serde(default)]
    pub push: bool,

    #[serde(default = "default_remote")]
    pub name: String,

    /// Ask the server to open a merge request when a new branch is pushed.
    #[serde(default = "default_true")]
    pub merge_request: bool,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            push: false,
            name: default_remote(),
            merge_request: true,
        }
    }
}

fn default_remote() -> String {
    "origin".into()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSection {
    /// Minimum tracing level: off, error, warn, info, debug, trace.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".into()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureBranch {
    pub branch: String,
    pub base: String,
}

// ---------------------------------------------------------------------------
// Loading & saving
// ---------------------------------------------------------------------------

impl GiiterConfig {
    /// Load a [`GiiterConfig`] from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: GiiterConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Like [`GiiterConfig::load_from_file`], but a missing file means defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load_from_file(path) {
            Err(ConfigError::FileNotFound(path)) => {
                debug!(path, "no configuration file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Write the configuration back, creating parent directories as needed.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;
        std::fs::write(path, contents)?;
        info!(path = %path.display(), "saved configuration");
        Ok(())
    }

    /// Validate that all values are sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.review.prefix;
        if prefix.is_empty() || prefix.contains('/') {
            return Err(ConfigError::InvalidValue {
                field: "review.prefix".into(),
                detail: "prefix must be a single non-empty path component".into(),
            });
        }
        if self.remote.push && self.remote.name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "remote.name".into(),
                detail: "remote name must not be empty when pushing".into(),
            });
        }
        if LevelFilter::from_str(&self.log.level).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "log.level".into(),
                detail: format!("unknown log level '{}'", self.log.level),
            });
        }
        for feature in &self.features {
            if feature.branch.is_empty() || feature.base.is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "features".into(),
                    detail: "remembered feature entries need both branch and base".into(),
                });
            }
        }
        Ok(())
    }

    /// Remote to propagate branch changes to, when pushing is enabled.
    pub fn push_remote(&self) -> Option<&str> {
        self.remote.push.then_some(self.remote.name.as_str())
    }

    pub fn remembered_base(&self, feature: &str) -> Option<&str> {
        self.features
            .iter()
            .find(|f| f.branch == feature)
            .map(|f| f.base.as_str())
    }

    /// Remember `base` for `feature`. Returns whether anything changed.
    pub fn remember_base(&mut self, feature: &str, base: &str) -> bool {
        match self.features.iter_mut().find(|f| f.branch == feature) {
            Some(entry) if entry.base == base => false,
            Some(entry) => {
                entry.base = base.to_string();
                true
            }
            None => {
                self.features.push(FeatureBranch {
                    branch: feature.to_string(),
                    base: base.to_string(),
                });
                true
            }
        }
    }

    /// Generate a default TOML config template string.
    pub fn default_template() -> &'static str {
        r#"# giiter configuration

[review]
prefix = "review"
# Match rewritten commits by subject when their content changed too.
subject_fallback = false
# title_prefix = "PROJ-123"

[remote]
push = false
name = "origin"
# Open a merge request when a new review branch is pushed.
merge_request = true

[log]
level = "warn"

# Remembered base branches, maintained by giiter.
# [[features]]
# branch = "my-feature"
# base = "main"
"#
    }
}

// ---------------------------------------------------------------------------
// Branch resolution
// ---------------------------------------------------------------------------

fn is_protected(branch: &str) -> bool {
    branch == "main" || branch == "master"
}

/// The feature branch: the explicit one, else the checked-out one.
pub fn resolve_feature(
    explicit: Option<&str>,
    current: Option<&str>,
) -> Result<String, InputError> {
    let feature = explicit
        .filter(|b| !b.is_empty())
        .or(current.filter(|b| !b.is_empty()))
        .ok_or(InputError::MissingBranch("feature"))?;
    if is_protected(feature) {
        return Err(InputError::ProtectedBranch(feature.to_string()));
    }
    Ok(feature.to_string())
}

/// The base branch: the explicit one, which is then remembered for `feature`,
/// else the remembered one. Returns the base and whether `config` changed.
pub fn resolve_base(
    config: &mut GiiterConfig,
    feature: &str,
    explicit: Option<&str>,
) -> Result<(String, bool), InputError> {
    match explicit.filter(|b| !b.is_empty()) {
        Some(base) => {
            let changed = config.remember_base(feature, base);
            Ok((base.to_string(), changed))
        }
        None => config
            .remembered_base(feature)
            .map(|base| (base.to_string(), false))
            .ok_or(InputError::MissingBranch("base")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_toml() -> &'static str {
        r#"
[review]
prefix = "mr"
subject_fallback = true
title_prefix = "PROJ-1"

[remote]
push = true
name = "upstream"
merge_request = false

[log]
level = "debug"

[[features]]
branch = "feat"
base = "main"
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: GiiterConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.review.prefix, "mr");
        assert!(config.review.subject_fallback);
        assert_eq!(config.review.title_prefix.as_deref(), Some("PROJ-1"));
        assert_eq!(config.push_remote(), Some("upstream"));
        assert!(!config.remote.merge_request);
        assert_eq!(config.remembered_base("feat"), Some("main"));
        config.validate().unwrap();
    }

    #[test]
    fn test_defaults() {
        let config: GiiterConfig = toml::from_str("").unwrap();
        assert_eq!(config, GiiterConfig::default());
        assert_eq!(config.review.prefix, "review");
        assert!(!config.review.subject_fallback);
        assert_eq!(config.push_remote(), None);
        assert!(config.remote.merge_request);
        assert_eq!(config.log.level, "warn");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, sample_toml()).unwrap();

        let config = GiiterConfig::load_from_file(&path).expect("load failed");
        assert_eq!(config.log.level, "debug");
    }

    #[test]
    fn test_file_not_found() {
        let result = GiiterConfig::load_from_file("/nonexistent/giiter.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
        let config = GiiterConfig::load_or_default("/nonexistent/giiter.toml").unwrap();
        assert_eq!(config, GiiterConfig::default());
    }

    #[test]
    fn test_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[review\nprefix =").unwrap();
        assert!(matches!(
            GiiterConfig::load_or_default(&path),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_save_round_trip_keeps_remembered_bases() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = GiiterConfig::default();
        assert!(config.remember_base("feat", "main"));
        config.save_to_file(&path).unwrap();

        let loaded = GiiterConfig::load_from_file(&path).unwrap();
        assert_eq!(loaded.remembered_base("feat"), Some("main"));
    }

    #[test]
    fn test_validate_rejects_bad_prefix() {
        let mut config = GiiterConfig::default();
        config.review.prefix = "a/b".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "review.prefix"
        ));
        config.review.prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_remote_when_pushing() {
        let mut config = GiiterConfig::default();
        config.remote.name = String::new();
        config.validate().unwrap();
        config.remote.push = true;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "remote.name"
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_level() {
        let mut config = GiiterConfig::default();
        config.log.level = "chatty".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_template_is_valid() {
        let config: GiiterConfig = toml::from_str(GiiterConfig::default_template())
            .expect("default template should be valid TOML");
        config.validate().unwrap();
    }

    #[test]
    fn test_resolve_feature() {
        assert_eq!(resolve_feature(Some("feat"), Some("other")).unwrap(), "feat");
        assert_eq!(resolve_feature(None, Some("other")).unwrap(), "other");
        assert!(matches!(
            resolve_feature(None, None),
            Err(InputError::MissingBranch("feature"))
        ));
        assert!(matches!(
            resolve_feature(None, Some("main")),
            Err(InputError::ProtectedBranch(_))
        ));
        assert!(matches!(
            resolve_feature(Some("master"), None),
            Err(InputError::ProtectedBranch(_))
        ));
    }

    #[test]
    fn test_resolve_base_remembers() {
        let mut config = GiiterConfig::default();
        assert!(matches!(
            resolve_base(&mut config, "feat", None),
            Err(InputError::MissingBranch("base"))
        ));

        let (base, changed) = resolve_base(&mut config, "feat", Some("develop")).unwrap();
        assert_eq!((base.as_str(), changed), ("develop", true));

        let (base, changed) = resolve_base(&mut config, "feat", None).unwrap();
        assert_eq!((base.as_str(), changed), ("develop", false));

        let (_, changed) = resolve_base(&mut config, "feat", Some("develop")).unwrap();
        assert!(!changed);
        let (_, changed) = resolve_base(&mut config, "feat", Some("main")).unwrap();
        assert!(changed);
        assert_eq!(config.features.len(), 1);
    }
}
