//! Dependency edges between files and between symbols.
//!
//! Edges are derived data: the resolver recomputes them from imports and
//! raw calls after every index run, so writes replace the whole edge set
//! rather than patching it.

use anyhow::{Context, Result};
use rusqlite::params;

use super::Store;

/// File-level dependency: `source` imports something `target` provides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEdge {
    pub source: String,
    pub target: String,
    /// Row id of the import statement this edge came from
    pub via_import: i64,
    pub line: usize,
}

/// Symbol-level call edge between two stored symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEdge {
    pub caller_symbol: String,
    pub callee_symbol: String,
    pub line: usize,
}

/// Both directions of a file's dependencies, each sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDependencies {
    pub depends_on: Vec<String>,
    pub depended_by: Vec<String>,
}

impl Store {
    /// Replace the full edge set in one transaction.
    pub fn replace_graph(&mut self, file_edges: &[FileEdge], call_edges: &[CallEdge]) -> Result<()> {
        let tx = self
            .conn_mut()
            .transaction()
            .context("failed to begin graph transaction")?;
        {
            tx.execute("DELETE FROM file_edges", [])
                .context("failed to clear file edges")?;
            tx.execute("DELETE FROM call_edges", [])
                .context("failed to clear call edges")?;

            let mut file_stmt = tx
                .prepare_cached(
                    "INSERT INTO file_edges (source, target, via_import, line)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .context("failed to prepare file edge insert")?;
            for edge in file_edges {
                file_stmt
                    .execute(params![
                        edge.source,
                        edge.target,
                        edge.via_import,
                        edge.line as i64
                    ])
                    .with_context(|| {
                        format!("failed to insert edge {} -> {}", edge.source, edge.target)
                    })?;
            }

            let mut call_stmt = tx
                .prepare_cached(
                    "INSERT INTO call_edges (caller_symbol, callee_symbol, line)
                     VALUES (?1, ?2, ?3)",
                )
                .context("failed to prepare call edge insert")?;
            for edge in call_edges {
                call_stmt
                    .execute(params![
                        edge.caller_symbol,
                        edge.callee_symbol,
                        edge.line as i64
                    ])
                    .with_context(|| {
                        format!(
                            "failed to insert call edge {} -> {}",
                            edge.caller_symbol, edge.callee_symbol
                        )
                    })?;
            }
        }
        tx.commit().context("failed to commit graph")
    }

    /// Every file edge, ordered for deterministic graph construction.
    pub fn all_file_edges(&self) -> Result<Vec<FileEdge>> {
        let mut stmt = self
            .conn()
            .prepare_cached(
                "SELECT source, target, via_import, line
                 FROM file_edges ORDER BY source, target, line",
            )
            .context("failed to prepare file edge listing")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(FileEdge {
                    source: row.get(0)?,
                    target: row.get(1)?,
                    via_import: row.get(2)?,
                    line: row.get::<_, i64>(3)? as usize,
                })
            })
            .context("failed to query file edges")?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read file edge rows")
    }

    /// Every call edge, ordered by (caller, line).
    pub fn all_call_edges(&self) -> Result<Vec<CallEdge>> {
        let mut stmt = self
            .conn()
            .prepare_cached(
                "SELECT caller_symbol, callee_symbol, line
                 FROM call_edges ORDER BY caller_symbol, line, callee_symbol",
            )
            .context("failed to prepare call edge listing")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CallEdge {
                    caller_symbol: row.get(0)?,
                    callee_symbol: row.get(1)?,
                    line: row.get::<_, i64>(2)? as usize,
                })
            })
            .context("failed to query call edges")?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read call edge rows")
    }

    /// Direct dependencies of one file, both directions, deduplicated.
    pub fn file_dependencies(&self, path: &str) -> Result<FileDependencies> {
        let mut deps = FileDependencies::default();

        let mut stmt = self
            .conn()
            .prepare_cached(
                "SELECT DISTINCT target FROM file_edges WHERE source = ?1 ORDER BY target",
            )
            .context("failed to prepare depends-on query")?;
        let rows = stmt
            .query_map(params![path], |row| row.get::<_, String>(0))
            .context("failed to query depends-on")?;
        for row in rows {
            deps.depends_on.push(row.context("failed to read edge row")?);
        }

        let mut stmt = self
            .conn()
            .prepare_cached(
                "SELECT DISTINCT source FROM file_edges WHERE target = ?1 ORDER BY source",
            )
            .context("failed to prepare depended-by query")?;
        let rows = stmt
            .query_map(params![path], |row| row.get::<_, String>(0))
            .context("failed to query depended-by")?;
        for row in rows {
            deps.depended_by.push(row.context("failed to read edge row")?);
        }

        Ok(deps)
    }

    /// Incoming call-edge counts per callee symbol id.
    ///
    /// Symbols with no incoming edges are absent from the map; dead-code
    /// analysis treats absence as zero.
    pub fn incoming_call_counts(&self) -> Result<ahash::AHashMap<String, usize>> {
        let mut stmt = self
            .conn()
            .prepare_cached("SELECT callee_symbol, COUNT(*) FROM call_edges GROUP BY callee_symbol")
            .context("failed to prepare call count query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })
            .context("failed to query call counts")?;
        let mut map = ahash::AHashMap::new();
        for row in rows {
            let (callee, count) = row.context("failed to read call count row")?;
            map.insert(callee, count);
        }
        Ok(map)
    }
}
