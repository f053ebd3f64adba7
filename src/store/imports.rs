//! Import and export rows.
//!
//! Imports carry an optional `resolved_target` column that the resolver
//! fills in after the parse stage settles. Exports back the dead-code
//! analysis and wildcard re-export tracking.

use anyhow::{Context, Result};
use rusqlite::{params, Transaction};

use crate::parser::{ExportRecord, ImportRecord};

use super::Store;

/// One row of the `imports` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRow {
    pub id: i64,
    pub file: String,
    pub statement: String,
    pub module: String,
    pub line: usize,
    /// Relative path of the file this import resolves to, once resolved
    pub resolved_target: Option<String>,
}

/// One row of the `exports` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub file: String,
    pub name: String,
    pub kind: String,
}

pub(super) fn replace_imports_tx(
    tx: &Transaction,
    path: &str,
    imports: &[ImportRecord],
) -> Result<()> {
    tx.execute("DELETE FROM imports WHERE file = ?1", params![path])
        .with_context(|| format!("failed to clear imports for {path}"))?;
    let mut stmt = tx
        .prepare_cached(
            "INSERT INTO imports (file, statement, module, line) VALUES (?1, ?2, ?3, ?4)",
        )
        .context("failed to prepare import insert")?;
    for import in imports {
        stmt.execute(params![
            path,
            import.statement,
            import.module,
            import.line as i64
        ])
        .with_context(|| format!("failed to insert import of {} in {path}", import.module))?;
    }
    Ok(())
}

pub(super) fn replace_exports_tx(
    tx: &Transaction,
    path: &str,
    exports: &[ExportRecord],
) -> Result<()> {
    tx.execute("DELETE FROM exports WHERE file = ?1", params![path])
        .with_context(|| format!("failed to clear exports for {path}"))?;
    let mut stmt = tx
        .prepare_cached("INSERT INTO exports (file, name, kind) VALUES (?1, ?2, ?3)")
        .context("failed to prepare export insert")?;
    for export in exports {
        stmt.execute(params![path, export.name, export.kind])
            .with_context(|| format!("failed to insert export {} in {path}", export.name))?;
    }
    Ok(())
}

impl Store {
    /// Every import row, ordered by (file, line) for deterministic resolution.
    pub fn all_imports(&self) -> Result<Vec<ImportRow>> {
        let mut stmt = self
            .conn()
            .prepare_cached(
                "SELECT id, file, statement, module, line, resolved_target
                 FROM imports ORDER BY file, line, id",
            )
            .context("failed to prepare import listing")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ImportRow {
                    id: row.get(0)?,
                    file: row.get(1)?,
                    statement: row.get(2)?,
                    module: row.get(3)?,
                    line: row.get::<_, i64>(4)? as usize,
                    resolved_target: row.get(5)?,
                })
            })
            .context("failed to query imports")?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read import rows")
    }

    /// Record resolver verdicts for a batch of imports in one transaction.
    ///
    /// `targets` pairs an import row id with the resolved relative path, or
    /// `None` for imports the resolver declared external or unresolvable.
    pub fn set_resolved_targets(&mut self, targets: &[(i64, Option<String>)]) -> Result<()> {
        let tx = self
            .conn_mut()
            .transaction()
            .context("failed to begin resolution transaction")?;
        {
            let mut stmt = tx
                .prepare_cached("UPDATE imports SET resolved_target = ?2 WHERE id = ?1")
                .context("failed to prepare resolution update")?;
            for (id, target) in targets {
                stmt.execute(params![id, target])
                    .with_context(|| format!("failed to record resolution for import {id}"))?;
            }
        }
        tx.commit().context("failed to commit resolutions")
    }

    /// Every export row, ordered by (file, name).
    pub fn all_exports(&self) -> Result<Vec<ExportRow>> {
        let mut stmt = self
            .conn()
            .prepare_cached("SELECT file, name, kind FROM exports ORDER BY file, name")
            .context("failed to prepare export listing")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ExportRow {
                    file: row.get(0)?,
                    name: row.get(1)?,
                    kind: row.get(2)?,
                })
            })
            .context("failed to query exports")?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read export rows")
    }

    /// Files that export a wildcard (`export *` or `pub use ...::*`).
    ///
    /// Symbols in these files may be consumed without a by-name import, so
    /// dead-code confidence drops for them.
    pub fn wildcard_export_files(&self) -> Result<ahash::AHashSet<String>> {
        let mut stmt = self
            .conn()
            .prepare_cached("SELECT DISTINCT file FROM exports WHERE name = '*'")
            .context("failed to prepare wildcard export query")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .context("failed to query wildcard exports")?;
        let mut set = ahash::AHashSet::new();
        for row in rows {
            set.insert(row.context("failed to read wildcard export row")?);
        }
        Ok(set)
    }
}
