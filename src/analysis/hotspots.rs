//! Hotspot detection: complex code in highly coupled modules.
//!
//! A hotspot is a function in the top quartile of composite complexity
//! whose defining module has a coupling score above 0.5. Both signals must
//! hold; either alone is just a refactoring hint.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::analysis::complexity::{complexity_ranking, ComplexityEntry};
use crate::resolver::graph::coupling_scores;
use crate::store::Store;

const COUPLING_CUTOFF: f64 = 0.5;

/// A function flagged by both complexity and coupling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hotspot {
    pub symbol_id: String,
    pub file: String,
    pub name: String,
    pub line: usize,
    pub composite: f64,
    pub coupling: f64,
}

/// Intersect top-quartile complexity with coupling > 0.5.
///
/// An empty or single-module project yields no hotspots (coupling is 0).
pub fn find_hotspots(store: &Store) -> Result<Vec<Hotspot>> {
    let ranking = complexity_ranking(store)?;
    if ranking.is_empty() {
        return Ok(Vec::new());
    }

    let files = store.all_files().context("failed to load files")?;
    let paths: Vec<String> = files.into_iter().map(|f| f.path).collect();
    let edges = store.all_file_edges().context("failed to load file edges")?;
    let coupling = coupling_scores(&paths, &edges);

    let quartile_len = ranking.len().div_ceil(4);
    let hotspots = ranking
        .into_iter()
        .take(quartile_len)
        .filter_map(|entry: ComplexityEntry| {
            let score = coupling.get(&entry.file).copied().unwrap_or(0.0);
            (score > COUPLING_CUTOFF).then(|| Hotspot {
                symbol_id: entry.symbol_id,
                file: entry.file,
                name: entry.name,
                line: entry.line,
                composite: entry.composite,
                coupling: score,
            })
        })
        .collect();
    Ok(hotspots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Language, ParseResult};
    use crate::store::test_support::*;
    use crate::store::{FileEdge, ParsedFile};

    fn commit(store: &mut Store, path: &str, symbols: Vec<crate::parser::SymbolRecord>) {
        store
            .commit_batch(&[ParsedFile {
                file: file_row(path, Language::Python, 10),
                result: ParseResult {
                    symbols,
                    ..Default::default()
                },
            }])
            .unwrap();
    }

    #[test]
    fn test_hotspot_requires_both_signals() {
        let mut store = Store::open_in_memory().unwrap();
        // hub.py couples to both spokes; spoke files barely couple
        let mut complex_in_hub = function_symbol("hub.py", "dispatch", 1, 15, false, &[]);
        complex_in_hub.code = "def dispatch():\n    if a:\n        pass".to_string();
        let mut complex_isolated = function_symbol("s1.py", "crunch", 1, 12, false, &[]);
        complex_isolated.code = "def crunch():\n    if a:\n        pass".to_string();
        commit(&mut store, "hub.py", vec![complex_in_hub]);
        commit(&mut store, "s1.py", vec![complex_isolated]);
        commit(&mut store, "s2.py", vec![function_symbol("s2.py", "t1", 1, 1, false, &[])]);
        commit(&mut store, "s3.py", vec![function_symbol("s3.py", "t2", 1, 1, false, &[])]);

        // hub imports all three spokes: coupling 3/6 = 0.5 is not enough,
        // so s1 also imports hub to push it over the cutoff
        let mk = |s: &str, t: &str| FileEdge {
            source: s.to_string(),
            target: t.to_string(),
            via_import: 0,
            line: 1,
        };
        store
            .replace_graph(
                &[
                    mk("hub.py", "s1.py"),
                    mk("hub.py", "s2.py"),
                    mk("hub.py", "s3.py"),
                    mk("s1.py", "hub.py"),
                ],
                &[],
            )
            .unwrap();

        let hotspots = find_hotspots(&store).unwrap();
        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].name, "dispatch");
        assert!(hotspots[0].coupling > 0.5);
    }

    #[test]
    fn test_single_module_has_no_hotspots() {
        let mut store = Store::open_in_memory().unwrap();
        commit(
            &mut store,
            "only.py",
            vec![function_symbol("only.py", "f", 1, 20, false, &[])],
        );
        assert!(find_hotspots(&store).unwrap().is_empty());
    }

    #[test]
    fn test_empty_store_returns_empty() {
        let store = Store::open_in_memory().unwrap();
        assert!(find_hotspots(&store).unwrap().is_empty());
    }
}
