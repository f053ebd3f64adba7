//! Symbol rows: per-file replacement writes and indexed reads.

use anyhow::{Context, Result};
use rusqlite::{params, Row, Transaction};

use crate::parser::{RawCall, SymbolKind, SymbolRecord};

use super::Store;

/// One row of the `symbols` table.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolRow {
    pub id: String,
    pub file: String,
    pub kind: SymbolKind,
    pub name: String,
    pub line_start: usize,
    pub line_end: usize,
    pub complexity: Option<u32>,
    pub parameters: Vec<String>,
    pub raw_calls: Vec<RawCall>,
    pub exported: bool,
    pub decorators: Vec<String>,
    pub code: String,
}

fn decode_json<T: serde::de::DeserializeOwned>(idx: usize, text: &str) -> rusqlite::Result<T> {
    serde_json::from_str(text).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn symbol_from_row(row: &Row) -> rusqlite::Result<SymbolRow> {
    let kind_key: String = row.get(2)?;
    let kind = SymbolKind::from_str_key(&kind_key).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("unknown symbol kind {kind_key:?}"),
            )),
        )
    })?;
    let parameters: String = row.get(7)?;
    let raw_calls: String = row.get(8)?;
    let decorators: String = row.get(10)?;
    Ok(SymbolRow {
        id: row.get(0)?,
        file: row.get(1)?,
        kind,
        name: row.get(3)?,
        line_start: row.get::<_, i64>(4)? as usize,
        line_end: row.get::<_, i64>(5)? as usize,
        complexity: row.get::<_, Option<i64>>(6)?.map(|c| c as u32),
        parameters: decode_json(7, &parameters)?,
        raw_calls: decode_json(8, &raw_calls)?,
        exported: row.get::<_, i64>(9)? != 0,
        decorators: decode_json(10, &decorators)?,
        code: row.get(11)?,
    })
}

/// Escape LIKE metacharacters so literal text matches literally.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

const SYMBOL_COLUMNS: &str = "id, file, kind, name, line_start, line_end, complexity, \
                              parameters, raw_calls, exported, decorators, code";

/// Replace a file's symbols inside an open transaction.
///
/// Delete-then-insert: the file's symbol set is never partially patched.
pub(super) fn replace_symbols_tx(
    tx: &Transaction,
    path: &str,
    symbols: &[SymbolRecord],
) -> Result<()> {
    tx.execute("DELETE FROM symbols WHERE file = ?1", params![path])
        .with_context(|| format!("failed to clear symbols for {path}"))?;

    let mut stmt = tx
        .prepare_cached(
            "INSERT INTO symbols (id, file, kind, name, line_start, line_end, complexity,
                                  parameters, raw_calls, exported, decorators, code)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .context("failed to prepare symbol insert")?;

    for symbol in symbols {
        stmt.execute(params![
            symbol.id,
            path,
            symbol.kind.as_str(),
            symbol.name,
            symbol.line_start as i64,
            symbol.line_end as i64,
            symbol.complexity.map(|c| c as i64),
            serde_json::to_string(&symbol.parameters).context("failed to encode parameters")?,
            serde_json::to_string(&symbol.raw_calls).context("failed to encode raw calls")?,
            symbol.exported as i64,
            serde_json::to_string(&symbol.decorators).context("failed to encode decorators")?,
            symbol.code,
        ])
        .with_context(|| format!("failed to insert symbol {} in {path}", symbol.name))?;
    }
    Ok(())
}

impl Store {
    /// Symbols defined in one file, ordered by line.
    pub fn symbols_for_file(&self, path: &str) -> Result<Vec<SymbolRow>> {
        let mut stmt = self
            .conn()
            .prepare_cached(&format!(
                "SELECT {SYMBOL_COLUMNS} FROM symbols WHERE file = ?1 ORDER BY line_start, id"
            ))
            .context("failed to prepare per-file symbol query")?;
        let rows = stmt
            .query_map(params![path], symbol_from_row)
            .context("failed to query symbols for file")?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read symbol rows")
    }

    /// Find symbols whose name matches a glob-ish pattern.
    ///
    /// `*` and `?` translate to SQL wildcards; a pattern without wildcards
    /// matches as a substring. Literal `_` and `%` are escaped, so an
    /// underscore in a name only matches an underscore. The pattern travels
    /// as a bound parameter.
    pub fn find_symbols_by_pattern(&self, pattern: &str) -> Result<Vec<SymbolRow>> {
        let like = if pattern.contains('*') || pattern.contains('?') {
            escape_like(pattern).replace('*', "%").replace('?', "_")
        } else {
            format!("%{}%", escape_like(pattern))
        };
        let mut stmt = self
            .conn()
            .prepare_cached(&format!(
                "SELECT {SYMBOL_COLUMNS} FROM symbols
                 WHERE name LIKE ?1 ESCAPE '\\' ORDER BY file, name, id"
            ))
            .context("failed to prepare pattern query")?;
        let rows = stmt
            .query_map(params![like], symbol_from_row)
            .context("failed to query symbols by pattern")?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read symbol rows")
    }

    /// Functions at or above a raw cyclomatic complexity, most complex first.
    pub fn complex_functions(&self, min_complexity: u32, limit: usize) -> Result<Vec<SymbolRow>> {
        let mut stmt = self
            .conn()
            .prepare_cached(&format!(
                "SELECT {SYMBOL_COLUMNS} FROM symbols
                 WHERE complexity IS NOT NULL AND complexity >= ?1
                 ORDER BY complexity DESC, id LIMIT ?2"
            ))
            .context("failed to prepare complexity query")?;
        let rows = stmt
            .query_map(params![min_complexity as i64, limit as i64], symbol_from_row)
            .context("failed to query complex functions")?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read symbol rows")
    }

    /// Every symbol row, ordered by (file, line) for deterministic passes.
    pub fn all_symbols(&self) -> Result<Vec<SymbolRow>> {
        let mut stmt = self
            .conn()
            .prepare_cached(&format!(
                "SELECT {SYMBOL_COLUMNS} FROM symbols ORDER BY file, line_start, id"
            ))
            .context("failed to prepare symbol listing")?;
        let rows = stmt
            .query_map([], symbol_from_row)
            .context("failed to query all symbols")?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to read symbol rows")
    }

    /// How many other files mention `name` as a quoted string literal.
    ///
    /// A dead-code mitigation signal: names referenced as strings are often
    /// dispatched dynamically (registries, getattr, task queues).
    pub fn string_reference_count(&self, name: &str, exclude_file: &str) -> Result<usize> {
        let needle = escape_like(name);
        let double_quoted = format!("%\"{needle}\"%");
        let single_quoted = format!("%'{needle}'%");
        let count: i64 = self
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM symbols
                 WHERE file != ?1
                   AND (code LIKE ?2 ESCAPE '\\' OR code LIKE ?3 ESCAPE '\\')",
                params![exclude_file, double_quoted, single_quoted],
                |row| row.get(0),
            )
            .context("failed to count string references")?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::{ParsedFile, Store};
    use crate::parser::{Language, ParseResult};

    fn seeded_store() -> Store {
        let mut store = Store::open_in_memory().unwrap();
        store
            .commit_batch(&[
                ParsedFile {
                    file: file_row("a.py", Language::Python, 30),
                    result: ParseResult {
                        symbols: vec![
                            function_symbol("a.py", "parse_config", 1, 8, true, &[]),
                            function_symbol("a.py", "parse_args", 10, 3, true, &[]),
                        ],
                        ..Default::default()
                    },
                },
                ParsedFile {
                    file: file_row("b.py", Language::Python, 10),
                    result: ParseResult {
                        symbols: vec![function_symbol("b.py", "render", 1, 1, false, &[])],
                        ..Default::default()
                    },
                },
            ])
            .unwrap();
        store
    }

    #[test]
    fn test_pattern_query() {
        let store = seeded_store();

        let hits = store.find_symbols_by_pattern("parse_*").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "parse_args");

        let hits = store.find_symbols_by_pattern("render").unwrap();
        assert_eq!(hits.len(), 1);

        let hits = store.find_symbols_by_pattern("nothing_here").unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_complex_functions_ordering() {
        let store = seeded_store();
        let hits = store.complex_functions(2, 10).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name, "parse_config");
        assert_eq!(hits[0].complexity, Some(8));
    }

    #[test]
    fn test_underscore_in_pattern_matches_literally() {
        let mut store = Store::open_in_memory().unwrap();
        store
            .commit_batch(&[ParsedFile {
                file: file_row("a.py", Language::Python, 10),
                result: ParseResult {
                    symbols: vec![
                        function_symbol("a.py", "parse_config", 1, 1, true, &[]),
                        function_symbol("a.py", "parseXconfig", 5, 1, true, &[]),
                    ],
                    ..Default::default()
                },
            }])
            .unwrap();

        let hits = store.find_symbols_by_pattern("parse_config").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "parse_config");

        // ? is still the single-character wildcard when asked for
        let hits = store.find_symbols_by_pattern("parse?config").unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn test_round_trip_preserves_json_columns() {
        let mut store = Store::open_in_memory().unwrap();
        let mut symbol = function_symbol("c.py", "f", 1, 2, true, &[("g", 2), ("h", 3)]);
        symbol.parameters = vec!["x".to_string(), "y=1".to_string()];
        symbol.decorators = vec!["app.route('/x')".to_string()];
        store
            .commit_batch(&[ParsedFile {
                file: file_row("c.py", Language::Python, 5),
                result: ParseResult {
                    symbols: vec![symbol.clone()],
                    ..Default::default()
                },
            }])
            .unwrap();

        let rows = store.symbols_for_file("c.py").unwrap();
        assert_eq!(rows[0].parameters, symbol.parameters);
        assert_eq!(rows[0].raw_calls, symbol.raw_calls);
        assert_eq!(rows[0].decorators, symbol.decorators);
    }

    #[test]
    fn test_string_reference_count() {
        let mut store = Store::open_in_memory().unwrap();
        let mut caller = function_symbol("d.py", "dispatch", 1, 1, true, &[]);
        caller.code = "def dispatch():\n    registry.get(\"target_fn\")()".to_string();
        store
            .commit_batch(&[
                ParsedFile {
                    file: file_row("d.py", Language::Python, 5),
                    result: ParseResult {
                        symbols: vec![caller],
                        ..Default::default()
                    },
                },
                ParsedFile {
                    file: file_row("e.py", Language::Python, 5),
                    result: ParseResult {
                        symbols: vec![function_symbol("e.py", "target_fn", 1, 1, false, &[])],
                        ..Default::default()
                    },
                },
            ])
            .unwrap();

        assert_eq!(store.string_reference_count("target_fn", "e.py").unwrap(), 1);
        assert_eq!(store.string_reference_count("absent", "e.py").unwrap(), 0);
    }

    #[test]
    fn test_string_reference_underscore_is_literal() {
        let mut store = Store::open_in_memory().unwrap();
        let mut caller = function_symbol("d.py", "dispatch", 1, 1, true, &[]);
        caller.code = "def dispatch():\n    registry.get(\"a-b\")()".to_string();
        store
            .commit_batch(&[ParsedFile {
                file: file_row("d.py", Language::Python, 5),
                result: ParseResult {
                    symbols: vec![caller],
                    ..Default::default()
                },
            }])
            .unwrap();

        // "a-b" in code must not count as a reference to a_b
        assert_eq!(store.string_reference_count("a_b", "e.py").unwrap(), 0);
        assert_eq!(store.string_reference_count("a-b", "e.py").unwrap(), 1);
    }
}
