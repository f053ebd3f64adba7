//! Dead-code candidate detection with confidence scoring.
//!
//! A symbol is a candidate only when every hard condition holds: zero
//! incoming call edges, not exported, not an entry point, and no exemption
//! match (magic names, route-handler and test-fixture decorators).
//! Confidence then starts at 1.0 and drops for each mitigating signal, so
//! a candidate is a scored suspicion, never a verdict.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::IndexConfig;
use crate::parser::SymbolKind;
use crate::store::Store;

/// A symbol believed unreferenced, with the evidence that tempers it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeadCodeCandidate {
    pub symbol_id: String,
    pub file: String,
    pub name: String,
    pub line: usize,
    /// Always within [0, 1]
    pub confidence: f64,
    /// Mitigating signals that reduced the confidence
    pub reasons: Vec<String>,
}

/// Find likely-dead symbols above a confidence threshold.
///
/// # Arguments
/// * `store` - Store with a settled resolution pass
/// * `config` - Exemption patterns and penalty weights
/// * `min_confidence` - Emission threshold, typically `config.dead_code.confidence_threshold`
///
/// # Guarantees
/// - Deterministic output, sorted by (file, line)
/// - Confidence is clamped to [0, 1]
/// - An empty store returns an empty list
pub fn dead_code_candidates(
    store: &Store,
    config: &IndexConfig,
    min_confidence: f64,
) -> Result<Vec<DeadCodeCandidate>> {
    let symbols = store.all_symbols().context("failed to load symbols")?;
    let incoming = store
        .incoming_call_counts()
        .context("failed to load call counts")?;
    let entry_points = store.entry_points().context("failed to load entry points")?;
    let wildcard_files = store
        .wildcard_export_files()
        .context("failed to load wildcard exports")?;

    let mut candidates = Vec::new();
    for symbol in &symbols {
        // Classes are referenced through instantiation and inheritance the
        // call graph does not model; only callables are judged here.
        if !matches!(symbol.kind, SymbolKind::Function | SymbolKind::Method) {
            continue;
        }
        if incoming.get(&symbol.id).copied().unwrap_or(0) > 0 {
            continue;
        }
        if symbol.exported {
            continue;
        }
        if entry_points.contains(&(symbol.file.clone(), symbol.name.clone())) {
            continue;
        }
        if config.is_exempt_name(&symbol.name) || config.is_exempt_decorator(&symbol.decorators) {
            continue;
        }

        let mut confidence = 1.0_f64;
        let mut reasons = Vec::new();
        if store.string_reference_count(&symbol.name, &symbol.file)? > 0 {
            confidence -= config.dead_code.string_reference_penalty;
            reasons.push("name appears as a string literal elsewhere".to_string());
        }
        if wildcard_files.contains(&symbol.file) {
            confidence -= config.dead_code.wildcard_export_penalty;
            reasons.push("defining file has a wildcard export".to_string());
        }
        let confidence = confidence.clamp(0.0, 1.0);

        if confidence >= min_confidence {
            candidates.push(DeadCodeCandidate {
                symbol_id: symbol.id.clone(),
                file: symbol.file.clone(),
                name: symbol.name.clone(),
                line: symbol.line_start,
                confidence,
                reasons,
            });
        }
    }

    candidates.sort_by(|a, b| (&a.file, a.line).cmp(&(&b.file, b.line)));
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Language, ParseResult};
    use crate::store::test_support::*;
    use crate::store::{CallEdge, ExportRow, ParsedFile};
    use crate::parser::ExportRecord;
    use tempfile::TempDir;

    fn test_config() -> IndexConfig {
        let temp = TempDir::new().unwrap();
        IndexConfig::load(temp.path()).unwrap()
    }

    fn commit_one(store: &mut Store, path: &str, result: ParseResult) {
        store
            .commit_batch(&[ParsedFile {
                file: file_row(path, Language::Python, 10),
                result,
            }])
            .unwrap();
    }

    #[test]
    fn test_uncalled_private_function_is_flagged() {
        let mut store = Store::open_in_memory().unwrap();
        commit_one(
            &mut store,
            "a.py",
            ParseResult {
                symbols: vec![function_symbol("a.py", "helper", 1, 1, false, &[])],
                ..Default::default()
            },
        );

        let config = test_config();
        let candidates = dead_code_candidates(&store, &config, 0.7).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "helper");
        assert_eq!(candidates[0].confidence, 1.0);
        assert!(candidates[0].reasons.is_empty());
    }

    #[test]
    fn test_called_function_is_not_flagged() {
        let mut store = Store::open_in_memory().unwrap();
        let callee = function_symbol("a.py", "used", 1, 1, false, &[]);
        let caller = function_symbol("a.py", "run", 5, 1, false, &[("used", 6)]);
        let callee_id = callee.id.clone();
        let caller_id = caller.id.clone();
        commit_one(
            &mut store,
            "a.py",
            ParseResult {
                symbols: vec![callee, caller],
                ..Default::default()
            },
        );
        store
            .replace_graph(
                &[],
                &[CallEdge {
                    caller_symbol: caller_id,
                    callee_symbol: callee_id,
                    line: 6,
                }],
            )
            .unwrap();

        let config = test_config();
        let candidates = dead_code_candidates(&store, &config, 0.7).unwrap();
        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert!(!names.contains(&"used"));
        assert!(names.contains(&"run"), "uncalled caller is still a candidate");
    }

    #[test]
    fn test_exported_and_entry_point_exempt() {
        let mut store = Store::open_in_memory().unwrap();
        commit_one(
            &mut store,
            "a.py",
            ParseResult {
                symbols: vec![
                    function_symbol("a.py", "public_api", 1, 1, true, &[]),
                    function_symbol("a.py", "startup", 5, 1, false, &[]),
                ],
                entry_points: vec!["startup".to_string()],
                ..Default::default()
            },
        );

        let config = test_config();
        assert!(dead_code_candidates(&store, &config, 0.7).unwrap().is_empty());
    }

    #[test]
    fn test_route_decorator_never_flagged() {
        let mut store = Store::open_in_memory().unwrap();
        let mut handler = function_symbol("views.py", "list_users", 1, 1, false, &[]);
        handler.decorators = vec!["app.route('/users')".to_string()];
        commit_one(
            &mut store,
            "views.py",
            ParseResult {
                symbols: vec![handler],
                ..Default::default()
            },
        );

        let config = test_config();
        assert!(dead_code_candidates(&store, &config, 0.0).unwrap().is_empty());
    }

    #[test]
    fn test_mitigating_signals_lower_confidence() {
        let mut store = Store::open_in_memory().unwrap();
        commit_one(
            &mut store,
            "a.py",
            ParseResult {
                symbols: vec![function_symbol("a.py", "dispatched", 1, 1, false, &[])],
                exports: vec![ExportRecord {
                    name: "*".to_string(),
                    kind: "reexport".to_string(),
                }],
                ..Default::default()
            },
        );
        let mut referrer = function_symbol("b.py", "lookup", 1, 1, true, &[]);
        referrer.code = "def lookup():\n    registry['dispatched']".to_string();
        commit_one(
            &mut store,
            "b.py",
            ParseResult {
                symbols: vec![referrer],
                ..Default::default()
            },
        );

        let config = test_config();
        // 1.0 - 0.3 (string ref) - 0.2 (wildcard export) = 0.5, below 0.7
        assert!(dead_code_candidates(&store, &config, 0.7).unwrap().is_empty());

        let candidates = dead_code_candidates(&store, &config, 0.4).unwrap();
        let flagged: Vec<_> = candidates.iter().filter(|c| c.name == "dispatched").collect();
        assert_eq!(flagged.len(), 1);
        assert!((flagged[0].confidence - 0.5).abs() < 1e-9);
        assert_eq!(flagged[0].reasons.len(), 2);
    }

    #[test]
    fn test_empty_store_returns_empty() {
        let store = Store::open_in_memory().unwrap();
        let config = test_config();
        assert!(dead_code_candidates(&store, &config, 0.7).unwrap().is_empty());
    }

    #[test]
    fn test_export_row_type_is_queryable() {
        // Exports written through the batch surface as rows
        let mut store = Store::open_in_memory().unwrap();
        commit_one(
            &mut store,
            "a.py",
            ParseResult {
                exports: vec![ExportRecord {
                    name: "thing".to_string(),
                    kind: "function".to_string(),
                }],
                ..Default::default()
            },
        );
        let exports = store.all_exports().unwrap();
        assert_eq!(
            exports,
            vec![ExportRow {
                file: "a.py".to_string(),
                name: "thing".to_string(),
                kind: "function".to_string(),
            }]
        );
    }
}
