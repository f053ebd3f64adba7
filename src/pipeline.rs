//! Full index run: scan, parse, resolve, analyze-ready store, TOC.
//!
//! Phases run in strict order for one invocation. The parse stage is the
//! only parallel phase; the coordinator blocks on pool drain before
//! resolution starts, because resolution needs the globally consistent
//! symbol set. Per-file scan and parse errors aggregate into the report;
//! only store and configuration failures are fatal.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::config::IndexConfig;
use crate::error::ParseFailure;
use crate::indexer::index_files;
use crate::resolver::{resolve_project, ResolutionSummary};
use crate::scanner::scan;
use crate::store::{Statistics, Store};
use crate::toc::{self, TOC_FILE_NAME};

/// File name of the store database, next to the TOC blob.
pub const STORE_FILE_NAME: &str = "cartograph.db";

/// How a completed run ended. Fatal outcomes surface as errors instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every scanned file processed
    Success,
    /// The run completed but at least one file failed to parse
    PartialSuccess,
}

/// Final summary of one index run.
#[derive(Debug)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub changed: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub succeeded: usize,
    pub failed: Vec<ParseFailure>,
    pub resolution: ResolutionSummary,
    pub statistics: Statistics,
}

/// Paths of the artifacts a run maintains under the project root.
pub fn artifact_paths(root: &Path) -> (PathBuf, PathBuf) {
    (root.join(STORE_FILE_NAME), root.join(TOC_FILE_NAME))
}

/// Run the whole pipeline against a project root.
///
/// # Errors
/// Fatal only for an unreadable root, an unopenable store, or a store
/// write failure. Parse failures are reported, not raised.
pub fn run_index(root: &Path, config: &IndexConfig) -> Result<RunReport> {
    let metadata = std::fs::metadata(root)
        .with_context(|| format!("project root {} is not readable", root.display()))?;
    if !metadata.is_dir() {
        anyhow::bail!("project root {} is not a directory", root.display());
    }

    let (store_path, toc_path) = artifact_paths(root);
    let mut store = Store::open(&store_path)?;

    let outcome = scan(root, config, &store).context("scan failed")?;
    let changed = outcome.changed.len();
    let removed = outcome.removed.len();

    if !outcome.removed.is_empty() {
        store
            .delete_files(&outcome.removed)
            .context("failed to delete removed files")?;
    }

    let report = index_files(&mut store, &outcome.changed, config)?;
    let resolution = resolve_project(&mut store)?;

    let toc = toc::build(&store)?;
    toc.save(&toc_path)?;

    let statistics = store.statistics()?;
    let run = RunReport {
        outcome: if report.is_partial() {
            RunOutcome::PartialSuccess
        } else {
            RunOutcome::Success
        },
        changed,
        removed,
        unchanged: outcome.unchanged,
        succeeded: report.succeeded,
        failed: report.failed,
        resolution,
        statistics,
    };

    info!(
        changed = run.changed,
        removed = run.removed,
        unchanged = run.unchanged,
        succeeded = run.succeeded,
        failed = run.failed.len(),
        symbols = run.statistics.functions + run.statistics.methods + run.statistics.classes,
        "index run complete"
    );
    Ok(run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_run_produces_store_and_toc() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.py", "def foo():\n    return 1\n");

        let config = IndexConfig::load(temp.path()).unwrap();
        let report = run_index(temp.path(), &config).unwrap();

        assert_eq!(report.outcome, RunOutcome::Success);
        assert_eq!(report.changed, 1);
        assert_eq!(report.statistics.files, 1);

        let (store_path, toc_path) = artifact_paths(temp.path());
        assert!(store_path.exists());
        assert!(toc_path.exists());
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.py", "def foo():\n    return 1\n");

        let config = IndexConfig::load(temp.path()).unwrap();
        run_index(temp.path(), &config).unwrap();
        let second = run_index(temp.path(), &config).unwrap();

        assert_eq!(second.changed, 0);
        assert_eq!(second.unchanged, 1);
        assert_eq!(second.statistics.files, 1);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let temp = TempDir::new().unwrap();
        let gone = temp.path().join("nope");
        let config = IndexConfig::load(temp.path()).unwrap();
        assert!(run_index(&gone, &config).is_err());
    }

    #[test]
    fn test_removed_file_cascades() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "a.py", "def foo():\n    return 1\n");
        write(temp.path(), "b.py", "import a\n");

        let config = IndexConfig::load(temp.path()).unwrap();
        run_index(temp.path(), &config).unwrap();

        std::fs::remove_file(temp.path().join("b.py")).unwrap();
        let report = run_index(temp.path(), &config).unwrap();
        assert_eq!(report.removed, 1);
        assert_eq!(report.statistics.files, 1);
        assert_eq!(report.statistics.imports, 0);
    }
}
