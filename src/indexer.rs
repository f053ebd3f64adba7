//! Parse-stage coordinator.
//!
//! Files fan out to a worker pool over a shared cursor; parsed results flow
//! back over a channel to the coordinator, which is the only writer and
//! commits them to the store in batches. A failed file is logged and
//! reported but never aborts the run, and its previously indexed rows stay
//! in place until it parses again.
//!
//! Workers check a shared cancellation flag between files, so a fatal store
//! error winds the pool down at the next file boundary instead of tearing
//! threads down mid-parse.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::IndexConfig;
use crate::error::ParseFailure;
use crate::parser::parse_source;
use crate::scanner::ScannedFile;
use crate::store::{FileRow, ParsedFile, Store};

/// Files per store transaction during the parse stage.
const COMMIT_BATCH_SIZE: usize = 64;

/// Outcome of one parse stage run.
#[derive(Debug, Default)]
pub struct IndexReport {
    /// Files parsed and committed
    pub succeeded: usize,
    /// Files that failed to parse, with reasons, sorted by path
    pub failed: Vec<ParseFailure>,
}

impl IndexReport {
    /// True when at least one file failed but the run itself completed.
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Parse the changed files in parallel and commit them to the store.
///
/// # Arguments
/// * `store` - Open store; all writes happen on this thread
/// * `files` - Changed files from the scanner, already sorted
/// * `config` - Worker count and per-file parse timeout
///
/// # Guarantees
/// - Per-file failures are isolated; the batch they would have joined
///   commits without them
/// - A store write failure cancels the pool and fails the run
pub fn index_files(
    store: &mut Store,
    files: &[ScannedFile],
    config: &IndexConfig,
) -> Result<IndexReport> {
    if files.is_empty() {
        return Ok(IndexReport::default());
    }

    let worker_count = config.worker_count.get().min(files.len());
    let cursor = AtomicUsize::new(0);
    let cancelled = AtomicBool::new(false);
    let timeout = config.parse_timeout;

    let mut report = IndexReport::default();
    let mut commit_error = None;

    std::thread::scope(|scope| {
        let (tx, rx) = mpsc::channel::<Result<ParsedFile, ParseFailure>>();

        for _ in 0..worker_count {
            let tx = tx.clone();
            let cursor = &cursor;
            let cancelled = &cancelled;
            scope.spawn(move || loop {
                if cancelled.load(Ordering::Relaxed) {
                    break;
                }
                let idx = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(file) = files.get(idx) else { break };

                let parsed = parse_source(file.language, &file.rel_path, &file.content, timeout)
                    .map(|result| ParsedFile {
                        file: file_row(file),
                        result,
                    });
                if tx.send(parsed).is_err() {
                    break;
                }
            });
        }
        drop(tx);

        let mut batch: Vec<ParsedFile> = Vec::with_capacity(COMMIT_BATCH_SIZE);
        for parsed in rx {
            match parsed {
                Ok(parsed) => {
                    batch.push(parsed);
                    if batch.len() >= COMMIT_BATCH_SIZE {
                        if let Err(err) = commit(store, &mut batch, &mut report) {
                            cancelled.store(true, Ordering::Relaxed);
                            commit_error = Some(err);
                            break;
                        }
                    }
                }
                Err(failure) => {
                    warn!(path = %failure.path, reason = %failure.reason, "parse failed");
                    report.failed.push(failure);
                }
            }
        }

        if commit_error.is_none() && !batch.is_empty() {
            if let Err(err) = commit(store, &mut batch, &mut report) {
                cancelled.store(true, Ordering::Relaxed);
                commit_error = Some(err);
            }
        }
    });

    if let Some(err) = commit_error {
        return Err(err).context("store write failed during parse stage");
    }

    report.failed.sort_by(|a, b| a.path.cmp(&b.path));
    info!(
        succeeded = report.succeeded,
        failed = report.failed.len(),
        "parse stage complete"
    );
    Ok(report)
}

fn commit(store: &mut Store, batch: &mut Vec<ParsedFile>, report: &mut IndexReport) -> Result<()> {
    store.commit_batch(batch)?;
    report.succeeded += batch.len();
    batch.clear();
    Ok(())
}

fn file_row(file: &ScannedFile) -> FileRow {
    FileRow {
        path: file.rel_path.clone(),
        language: file.language,
        loc: file.loc,
        content_hash: file.content_hash.clone(),
        mtime: file.mtime,
        size: file.size,
        updated_at: chrono::Utc::now().timestamp(),
    }
}
