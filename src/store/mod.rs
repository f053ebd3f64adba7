//! Structured store for indexed facts.
//!
//! One SQLite database per project root. Writes go through the coordinator
//! only, in batched transactions; readers may attach concurrently thanks to
//! WAL mode. Re-indexing a file is delete-then-insert inside one
//! transaction, never additive, so a file's symbol set is always replaced
//! wholesale.
//!
//! All queries are parameterized. This is a design invariant of the store
//! layer, not a style preference: no SQL is ever assembled from row data.

pub mod edges;
pub mod files;
pub mod imports;
pub mod schema;
pub mod stats;
pub mod symbols;

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::parser::ParseResult;

pub use edges::{CallEdge, FileDependencies, FileEdge};
pub use files::{FileRow, StoredFingerprint};
pub use imports::{ExportRow, ImportRow};
pub use stats::Statistics;
pub use symbols::SymbolRow;

/// A fully parsed file ready for a batched commit.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub file: FileRow,
    pub result: ParseResult,
}

/// Handle on the project's store database.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) the store at the given path.
    ///
    /// Fatal when the database cannot be opened or its schema is newer than
    /// this build supports.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open store at {}", path.display()))?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory store")?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    pub(crate) fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    /// Commit a batch of parsed files in one transaction.
    ///
    /// Each file in the batch is replaced wholesale: its previous symbols,
    /// imports, exports and entry points are deleted and the new records
    /// inserted. Dependent edges go with them via cascades; the resolver
    /// recomputes edges after the parse stage settles.
    ///
    /// On error the whole batch rolls back: no file is ever half-written.
    pub fn commit_batch(&mut self, batch: &[ParsedFile]) -> Result<()> {
        let tx = self
            .conn
            .transaction()
            .context("failed to begin batch transaction")?;

        for parsed in batch {
            files::upsert_file_tx(&tx, &parsed.file)?;
            symbols::replace_symbols_tx(&tx, &parsed.file.path, &parsed.result.symbols)?;
            imports::replace_imports_tx(&tx, &parsed.file.path, &parsed.result.imports)?;
            imports::replace_exports_tx(&tx, &parsed.file.path, &parsed.result.exports)?;
            files::replace_entry_points_tx(&tx, &parsed.file.path, &parsed.result.entry_points)?;
        }

        tx.commit().context("failed to commit batch")
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::parser::{
        symbol_id, ImportRecord, Language, RawCall, SymbolKind, SymbolRecord,
    };

    /// Build a FileRow with fixed fingerprint data for store tests.
    pub fn file_row(path: &str, language: Language, loc: usize) -> FileRow {
        FileRow {
            path: path.to_string(),
            language,
            loc,
            content_hash: format!("hash-{path}"),
            mtime: 1_700_000_000,
            size: 128,
            updated_at: 1_700_000_000,
        }
    }

    /// Build a function symbol with optional calls for store tests.
    pub fn function_symbol(
        path: &str,
        name: &str,
        line: usize,
        complexity: u32,
        exported: bool,
        calls: &[(&str, usize)],
    ) -> SymbolRecord {
        SymbolRecord {
            id: symbol_id(Language::Python, path, SymbolKind::Function, name, line),
            kind: SymbolKind::Function,
            name: name.to_string(),
            line_start: line,
            line_end: line + 2,
            complexity: Some(complexity),
            parameters: vec![],
            raw_calls: calls
                .iter()
                .map(|(n, l)| RawCall {
                    name: n.to_string(),
                    line: *l,
                })
                .collect(),
            exported,
            decorators: vec![],
            code: format!("def {name}():\n    pass"),
        }
    }

    pub fn import_record(statement: &str, module: &str, line: usize) -> ImportRecord {
        ImportRecord {
            statement: statement.to_string(),
            module: module.to_string(),
            line,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::parser::Language;

    #[test]
    fn test_commit_batch_replaces_wholesale() {
        let mut store = Store::open_in_memory().unwrap();

        let first = ParsedFile {
            file: file_row("a.py", Language::Python, 10),
            result: ParseResult {
                symbols: vec![
                    function_symbol("a.py", "old_one", 1, 1, false, &[]),
                    function_symbol("a.py", "old_two", 5, 1, false, &[]),
                ],
                ..Default::default()
            },
        };
        store.commit_batch(&[first]).unwrap();
        assert_eq!(store.symbols_for_file("a.py").unwrap().len(), 2);

        let second = ParsedFile {
            file: file_row("a.py", Language::Python, 4),
            result: ParseResult {
                symbols: vec![function_symbol("a.py", "fresh", 1, 1, false, &[])],
                ..Default::default()
            },
        };
        store.commit_batch(&[second]).unwrap();

        let symbols = store.symbols_for_file("a.py").unwrap();
        assert_eq!(symbols.len(), 1, "re-index never accumulates old rows");
        assert_eq!(symbols[0].name, "fresh");
    }

    #[test]
    fn test_cascade_delete_removes_dependents() {
        let mut store = Store::open_in_memory().unwrap();

        let parsed = ParsedFile {
            file: file_row("a.py", Language::Python, 10),
            result: ParseResult {
                symbols: vec![function_symbol("a.py", "f", 1, 1, true, &[])],
                imports: vec![import_record("import b", "b", 1)],
                ..Default::default()
            },
        };
        store.commit_batch(&[parsed]).unwrap();
        store.delete_files(&["a.py".to_string()]).unwrap();

        assert!(store.symbols_for_file("a.py").unwrap().is_empty());
        assert!(store.all_imports().unwrap().is_empty());
        assert_eq!(store.statistics().unwrap().files, 0);
    }
}
