//! Filesystem scanner with fingerprint-based change detection.
//!
//! Walks the project root, applies ignore rules, detects languages by
//! extension, and diffs what it finds against the fingerprints recorded in
//! the store. Only changed files flow into the parse stage; files that
//! vanished since the last run are reported for deletion.
//!
//! Change detection is two-tier: mtime+size first (no read), content hash
//! second. A file whose metadata moved but whose content hash is unchanged
//! counts as unchanged, so a `touch` never triggers a re-parse.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::IndexConfig;
use crate::parser::{count_loc, Language, LanguageTable};
use crate::store::{Store, StoredFingerprint};

/// A source file the parse stage must (re-)process.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    /// Project-relative path with `/` separators, the store key
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub language: Language,
    pub content: String,
    pub content_hash: String,
    pub loc: usize,
    pub mtime: i64,
    pub size: u64,
}

/// What one scan pass found.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// New or modified files, sorted by relative path
    pub changed: Vec<ScannedFile>,
    /// Previously indexed paths that no longer exist, sorted
    pub removed: Vec<String>,
    /// Files whose fingerprints matched and were skipped
    pub unchanged: usize,
}

/// Running counts emitted as the scan classifies files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanProgress {
    pub changed: usize,
    pub unchanged: usize,
}

/// Scan the project root and diff it against the store.
///
/// # Arguments
/// * `root` - Project root directory
/// * `config` - Ignore rules and the force-refresh flag
/// * `store` - Source of last-run fingerprints
///
/// # Guarantees
/// - Output ordering is deterministic (sorted by relative path)
/// - An unreadable or non-UTF-8 file is logged and skipped, never fatal
pub fn scan(root: &Path, config: &IndexConfig, store: &Store) -> Result<ScanOutcome> {
    scan_with_progress(root, config, store, |_| {})
}

/// [`scan`] with a callback invoked each time a file is classified.
pub fn scan_with_progress(
    root: &Path,
    config: &IndexConfig,
    store: &Store,
    mut progress: impl FnMut(ScanProgress),
) -> Result<ScanOutcome> {
    let table = LanguageTable::new();
    let fingerprints = store
        .file_fingerprints()
        .context("failed to load stored fingerprints")?;

    let mut outcome = ScanOutcome::default();
    let mut seen = ahash::AHashSet::new();

    let walker = WalkDir::new(root).follow_links(false).into_iter();
    let mut walker = walker.filter_entry(|entry| {
        let rel = match entry.path().strip_prefix(root) {
            Ok(rel) => rel,
            Err(_) => return true,
        };
        if rel.as_os_str().is_empty() {
            return true;
        }
        !config.is_ignored(rel, entry.file_type().is_dir())
    });

    while let Some(entry) = walker.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(language) = table.detect(entry.path()) else {
            continue;
        };
        let rel_path = match relative_key(root, entry.path()) {
            Some(rel) => rel,
            None => continue,
        };

        let metadata = match entry.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(path = %rel_path, error = %err, "skipping file with unreadable metadata");
                continue;
            }
        };
        let mtime = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let size = metadata.len();

        seen.insert(rel_path.clone());

        let stored = fingerprints.get(&rel_path);
        if !config.force_refresh {
            if let Some(stored) = stored {
                // mtime 0 means the filesystem reported no timestamp; the
                // metadata tier cannot be trusted, fall through to the hash.
                if mtime != 0 && stored.mtime == mtime && stored.size == size {
                    outcome.unchanged += 1;
                    progress(progress_of(&outcome));
                    continue;
                }
            }
        }

        let content = match std::fs::read_to_string(entry.path()) {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %rel_path, error = %err, "skipping unreadable file");
                // A previously indexed file keeps its last good rows; only a
                // path the store has never seen is dropped from the scan set.
                if stored.is_none() {
                    seen.remove(&rel_path);
                } else {
                    outcome.unchanged += 1;
                    progress(progress_of(&outcome));
                }
                continue;
            }
        };
        let content_hash = blake3::hash(content.as_bytes()).to_hex().to_string();

        if !config.force_refresh && hash_matches(stored, &content_hash) {
            debug!(path = %rel_path, "metadata moved but content unchanged");
            outcome.unchanged += 1;
            progress(progress_of(&outcome));
            continue;
        }

        outcome.changed.push(ScannedFile {
            loc: count_loc(&content),
            rel_path,
            abs_path: entry.path().to_path_buf(),
            language,
            content,
            content_hash,
            mtime,
            size,
        });
        progress(progress_of(&outcome));
    }

    for path in fingerprints.keys() {
        if !seen.contains(path) {
            outcome.removed.push(path.clone());
        }
    }

    outcome.changed.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
    outcome.removed.sort();

    debug!(
        changed = outcome.changed.len(),
        removed = outcome.removed.len(),
        unchanged = outcome.unchanged,
        "scan complete"
    );
    Ok(outcome)
}

fn progress_of(outcome: &ScanOutcome) -> ScanProgress {
    ScanProgress {
        changed: outcome.changed.len(),
        unchanged: outcome.unchanged,
    }
}

fn hash_matches(stored: Option<&StoredFingerprint>, hash: &str) -> bool {
    stored.is_some_and(|s| s.content_hash == hash)
}

/// Project-relative store key with forward slashes on every platform.
fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
