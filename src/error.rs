//! Error kinds for cartograph
//!
//! Per-file errors (scan/parse) are data, not control flow: they accumulate
//! into run reports. Only configuration and store errors abort a run.

use std::path::PathBuf;

/// Configuration errors detected before indexing begins.
///
/// These always fail fast: a run never starts with a bad configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("ignore file {path} is unreadable: {source}")]
    UnreadableIgnoreFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid ignore pattern in {path}: {reason}")]
    InvalidIgnorePattern { path: PathBuf, reason: String },

    #[error("dead-code confidence threshold {0} is outside [0, 1]")]
    ThresholdOutOfRange(f64),

    #[error("invalid exemption pattern '{pattern}': {reason}")]
    InvalidExemptionPattern { pattern: String, reason: String },

    #[error("worker count must be at least 1")]
    ZeroWorkers,

    #[error("parse timeout must be greater than zero")]
    ZeroParseTimeout,
}

/// A per-file parse failure recorded in the run report.
///
/// Never fatal: the coordinator logs it, keeps the file's previous symbols
/// unchanged, and continues with the rest of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Project-relative path of the failed file
    pub path: String,
    /// Human-readable reason (syntax error, timeout, unreadable)
    pub reason: String,
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}
