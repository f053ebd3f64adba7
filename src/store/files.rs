//! File rows and fingerprint cache operations.

use anyhow::{Context, Result};
use rusqlite::{params, Transaction};

use crate::parser::Language;

use super::Store;

/// One row of the `files` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRow {
    /// Project-relative path, the primary key
    pub path: String,
    pub language: Language,
    pub loc: usize,
    pub content_hash: String,
    /// Filesystem mtime (seconds since epoch) at index time
    pub mtime: i64,
    pub size: u64,
    /// Unix timestamp of the index write
    pub updated_at: i64,
}

/// Fingerprint data recorded at the last index of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFingerprint {
    pub mtime: i64,
    pub size: u64,
    pub content_hash: String,
}

pub(super) fn upsert_file_tx(tx: &Transaction, row: &FileRow) -> Result<()> {
    tx.execute(
        "INSERT INTO files (path, language, loc, content_hash, mtime, size, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(path) DO UPDATE SET
             language = excluded.language,
             loc = excluded.loc,
             content_hash = excluded.content_hash,
             mtime = excluded.mtime,
             size = excluded.size,
             updated_at = excluded.updated_at",
        params![
            row.path,
            row.language.as_str(),
            row.loc as i64,
            row.content_hash,
            row.mtime,
            row.size as i64,
            row.updated_at,
        ],
    )
    .with_context(|| format!("failed to upsert file row for {}", row.path))?;
    Ok(())
}

pub(super) fn replace_entry_points_tx(
    tx: &Transaction,
    path: &str,
    entry_points: &[String],
) -> Result<()> {
    tx.execute("DELETE FROM entry_points WHERE file = ?1", params![path])
        .with_context(|| format!("failed to clear entry points for {path}"))?;
    let mut stmt = tx
        .prepare_cached("INSERT OR IGNORE INTO entry_points (file, name) VALUES (?1, ?2)")
        .context("failed to prepare entry point insert")?;
    for name in entry_points {
        stmt.execute(params![path, name])
            .with_context(|| format!("failed to insert entry point {name} for {path}"))?;
    }
    Ok(())
}

impl Store {
    /// Upsert a list of file rows in one transaction.
    pub fn upsert_files(&mut self, rows: &[FileRow]) -> Result<()> {
        let tx = self
            .conn_mut()
            .transaction()
            .context("failed to begin file upsert transaction")?;
        for row in rows {
            upsert_file_tx(&tx, row)?;
        }
        tx.commit().context("failed to commit file upsert")
    }

    /// All recorded fingerprints, keyed by relative path.
    ///
    /// The scanner diffs these against the filesystem to decide what
    /// changed since the last run.
    pub fn file_fingerprints(&self) -> Result<ahash::AHashMap<String, StoredFingerprint>> {
        let mut stmt = self
            .conn()
            .prepare_cached("SELECT path, mtime, size, content_hash FROM files")
            .context("failed to prepare fingerprint query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    StoredFingerprint {
                        mtime: row.get(1)?,
                        size: row.get::<_, i64>(2)? as u64,
                        content_hash: row.get(3)?,
                    },
                ))
            })
            .context("failed to query fingerprints")?;

        let mut map = ahash::AHashMap::new();
        for row in rows {
            let (path, fingerprint) = row.context("failed to read fingerprint row")?;
            map.insert(path, fingerprint);
        }
        Ok(map)
    }

    /// All file rows, sorted by path for deterministic output.
    pub fn all_files(&self) -> Result<Vec<FileRow>> {
        let mut stmt = self
            .conn()
            .prepare_cached(
                "SELECT path, language, loc, content_hash, mtime, size, updated_at
                 FROM files ORDER BY path",
            )
            .context("failed to prepare file listing")?;
        let rows = stmt
            .query_map([], |row| {
                let language_key: String = row.get(1)?;
                let language = Language::from_str_key(&language_key).ok_or_else(|| {
                    rusqlite::Error::FromSqlConversionFailure(
                        1,
                        rusqlite::types::Type::Text,
                        Box::new(std::io::Error::new(
                            std::io::ErrorKind::InvalidData,
                            format!("unknown language {language_key:?}"),
                        )),
                    )
                })?;
                Ok(FileRow {
                    path: row.get(0)?,
                    language,
                    loc: row.get::<_, i64>(2)? as usize,
                    content_hash: row.get(3)?,
                    mtime: row.get(4)?,
                    size: row.get::<_, i64>(5)? as u64,
                    updated_at: row.get(6)?,
                })
            })
            .context("failed to query files")?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read file rows")
    }

    /// Delete files and, via cascades, every dependent row, atomically.
    pub fn delete_files(&mut self, paths: &[String]) -> Result<()> {
        let tx = self
            .conn_mut()
            .transaction()
            .context("failed to begin delete transaction")?;
        {
            let mut stmt = tx
                .prepare_cached("DELETE FROM files WHERE path = ?1")
                .context("failed to prepare file delete")?;
            for path in paths {
                stmt.execute(params![path])
                    .with_context(|| format!("failed to delete file {path}"))?;
            }
        }
        tx.commit().context("failed to commit file delete")
    }

    /// Entry point names per file, for the analysis stage.
    pub fn entry_points(&self) -> Result<ahash::AHashSet<(String, String)>> {
        let mut stmt = self
            .conn()
            .prepare_cached("SELECT file, name FROM entry_points")
            .context("failed to prepare entry point query")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .context("failed to query entry points")?;
        let mut set = ahash::AHashSet::new();
        for row in rows {
            set.insert(row.context("failed to read entry point row")?);
        }
        Ok(set)
    }
}
