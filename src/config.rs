//! Per-invocation configuration for an index run
//!
//! One `IndexConfig` is constructed per invocation and threaded through the
//! pipeline explicitly. There is no hidden global state: the fingerprint
//! cache lives in the store, exemption rules live here as pattern data.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::error::ConfigError;

/// Name of the project-level ignore file (gitignore syntax, `#` comments).
pub const IGNORE_FILE_NAME: &str = ".cartographignore";

/// Built-in ignore defaults merged with the project ignore file.
///
/// These cover artifacts no indexing run should ever descend into.
const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git/",
    "node_modules/",
    "target/",
    "__pycache__/",
    ".venv/",
    "venv/",
    "dist/",
    "build/",
    "*.min.js",
    "*.db",
    "*.db-journal",
    "*.db-wal",
];

/// Default dead-code symbol exemption patterns.
///
/// Magic names and decorator patterns that legitimately have zero in-project
/// callers (framework entry points, test fixtures, dunder protocol methods).
/// Kept as data so projects can extend or replace the list.
const DEFAULT_EXEMPT_NAME_PATTERNS: &[&str] = &["__*__", "main", "test_*", "*_test"];
const DEFAULT_EXEMPT_DECORATOR_PATTERNS: &[&str] = &[
    "*route*",
    "*app.get*",
    "*app.post*",
    "*app.put*",
    "*app.delete*",
    "*fixture*",
    "*pytest*",
    "*task*",
];

/// Tunable dead-code scoring parameters.
///
/// The penalty weights are a starting point targeting a low false-positive
/// rate, not derived constants. They are data so they can be tuned without
/// touching the analysis code.
#[derive(Debug, Clone)]
pub struct DeadCodeConfig {
    /// Minimum confidence for a candidate to be emitted
    pub confidence_threshold: f64,
    /// Penalty when the symbol name occurs as a string literal elsewhere
    pub string_reference_penalty: f64,
    /// Penalty when the defining file carries a wildcard export
    pub wildcard_export_penalty: f64,
}

impl Default for DeadCodeConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.7,
            string_reference_penalty: 0.3,
            wildcard_export_penalty: 0.2,
        }
    }
}

/// Configuration for one index invocation.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Merged ignore matcher (project file + built-in defaults)
    ignore: Gitignore,
    /// Exempt symbol name patterns for dead-code analysis
    exempt_names: GlobSet,
    /// Exempt decorator patterns for dead-code analysis
    exempt_decorators: GlobSet,
    /// Dead-code scoring parameters
    pub dead_code: DeadCodeConfig,
    /// Worker pool size for the parse stage
    pub worker_count: NonZeroUsize,
    /// Per-file parse timeout guarding pathological input
    pub parse_timeout: Duration,
    /// Re-parse every file even when fingerprints are unchanged
    pub force_refresh: bool,
}

impl IndexConfig {
    /// Load configuration for a project root, failing fast on any problem.
    ///
    /// Merges the project's `.cartographignore` (when present) with the
    /// built-in ignore defaults. A malformed ignore file or pattern is a
    /// `ConfigError`, detected here before any indexing begins.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let ignore = Self::build_ignore(root)?;
        let exempt_names = Self::build_globset(DEFAULT_EXEMPT_NAME_PATTERNS)?;
        let exempt_decorators = Self::build_globset(DEFAULT_EXEMPT_DECORATOR_PATTERNS)?;

        let worker_count = std::thread::available_parallelism()
            .unwrap_or(NonZeroUsize::new(1).expect("1 is non-zero"));

        Ok(Self {
            ignore,
            exempt_names,
            exempt_decorators,
            dead_code: DeadCodeConfig::default(),
            worker_count,
            parse_timeout: Duration::from_secs(10),
            force_refresh: false,
        })
    }

    /// Override the dead-code confidence threshold, validating the range.
    pub fn with_confidence_threshold(mut self, threshold: f64) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&threshold) || threshold.is_nan() {
            return Err(ConfigError::ThresholdOutOfRange(threshold));
        }
        self.dead_code.confidence_threshold = threshold;
        Ok(self)
    }

    /// Override the worker pool size.
    pub fn with_worker_count(mut self, count: usize) -> Result<Self, ConfigError> {
        self.worker_count = NonZeroUsize::new(count).ok_or(ConfigError::ZeroWorkers)?;
        Ok(self)
    }

    /// Override the per-file parse timeout.
    pub fn with_parse_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::ZeroParseTimeout);
        }
        self.parse_timeout = timeout;
        Ok(self)
    }

    /// Replace the exemption name patterns (dead-code analysis).
    pub fn with_exempt_names(mut self, patterns: &[&str]) -> Result<Self, ConfigError> {
        self.exempt_names = Self::build_globset(patterns)?;
        Ok(self)
    }

    /// True when the path should be skipped by the scanner.
    pub fn is_ignored(&self, rel_path: &Path, is_dir: bool) -> bool {
        self.ignore
            .matched_path_or_any_parents(rel_path, is_dir)
            .is_ignore()
    }

    /// True when a symbol name matches an exemption pattern.
    pub fn is_exempt_name(&self, name: &str) -> bool {
        self.exempt_names.is_match(name)
    }

    /// True when any decorator matches an exemption pattern.
    pub fn is_exempt_decorator(&self, decorators: &[String]) -> bool {
        decorators.iter().any(|d| self.exempt_decorators.is_match(d))
    }

    fn build_ignore(root: &Path) -> Result<Gitignore, ConfigError> {
        let mut builder = GitignoreBuilder::new(root);

        for pattern in DEFAULT_IGNORE_PATTERNS {
            builder
                .add_line(None, pattern)
                .map_err(|e| ConfigError::InvalidIgnorePattern {
                    path: PathBuf::from("<builtin>"),
                    reason: e.to_string(),
                })?;
        }

        let ignore_file = root.join(IGNORE_FILE_NAME);
        if ignore_file.exists() {
            // Surface unreadable files explicitly instead of silently skipping
            std::fs::metadata(&ignore_file).map_err(|e| ConfigError::UnreadableIgnoreFile {
                path: ignore_file.clone(),
                source: e,
            })?;
            if let Some(err) = builder.add(&ignore_file) {
                return Err(ConfigError::InvalidIgnorePattern {
                    path: ignore_file,
                    reason: err.to_string(),
                });
            }
        }

        builder.build().map_err(|e| ConfigError::InvalidIgnorePattern {
            path: ignore_file,
            reason: e.to_string(),
        })
    }

    fn build_globset(patterns: &[&str]) -> Result<GlobSet, ConfigError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| ConfigError::InvalidExemptionPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })?;
            builder.add(glob);
        }
        builder
            .build()
            .map_err(|e| ConfigError::InvalidExemptionPattern {
                pattern: "<set>".to_string(),
                reason: e.to_string(),
            })
    }
}
