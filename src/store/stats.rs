//! Aggregate counts over the store, for reports and the table of contents.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::Store;

/// Snapshot of store-wide counts.
///
/// `per_language` uses a BTreeMap so serialized output is ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub files: usize,
    pub functions: usize,
    pub methods: usize,
    pub classes: usize,
    pub imports: usize,
    pub exports: usize,
    pub file_edges: usize,
    pub call_edges: usize,
    pub total_loc: usize,
    pub per_language: BTreeMap<String, usize>,
}

impl Store {
    /// Compute current counts across all tables.
    pub fn statistics(&self) -> Result<Statistics> {
        let conn = self.conn();
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = conn
                .query_row(sql, [], |row| row.get(0))
                .with_context(|| format!("failed statistics query: {sql}"))?;
            Ok(n as usize)
        };

        let mut stats = Statistics {
            files: count("SELECT COUNT(*) FROM files")?,
            functions: count("SELECT COUNT(*) FROM symbols WHERE kind = 'function'")?,
            methods: count("SELECT COUNT(*) FROM symbols WHERE kind = 'method'")?,
            classes: count("SELECT COUNT(*) FROM symbols WHERE kind = 'class'")?,
            imports: count("SELECT COUNT(*) FROM imports")?,
            exports: count("SELECT COUNT(*) FROM exports")?,
            file_edges: count("SELECT COUNT(*) FROM file_edges")?,
            call_edges: count("SELECT COUNT(*) FROM call_edges")?,
            total_loc: count("SELECT COALESCE(SUM(loc), 0) FROM files")?,
            per_language: BTreeMap::new(),
        };

        let mut stmt = conn
            .prepare_cached("SELECT language, COUNT(*) FROM files GROUP BY language")
            .context("failed to prepare language count query")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
            })
            .context("failed to query language counts")?;
        for row in rows {
            let (language, n) = row.context("failed to read language count row")?;
            stats.per_language.insert(language, n);
        }

        Ok(stats)
    }
}
