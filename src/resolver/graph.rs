//! Dependency graph construction, cycle detection, coupling.
//!
//! Two graphs come out of resolution: a module-level file graph from
//! resolved imports, and a function-level call graph. A call edge is added
//! only when caller and callee are both known symbols reachable via a
//! resolved import (or the same file); unresolvable calls are dropped, not
//! stored dangling.
//!
//! Cycle detection runs strongly-connected components first, which is cheap
//! on large acyclic graphs, then enumerates simple cycles only inside SCCs
//! of size greater than one.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::store::{CallEdge, FileEdge, ImportRow, Store, SymbolRow};

/// Ceiling on enumerated simple cycles per SCC, to bound pathological
/// densely connected components.
const MAX_CYCLES_PER_SCC: usize = 64;

/// Build both edge sets from the resolved imports and stored symbols.
pub fn build_edges(
    store: &Store,
    resolved_imports: &[(ImportRow, String)],
) -> Result<(Vec<FileEdge>, Vec<CallEdge>)> {
    let mut file_edges: Vec<FileEdge> = resolved_imports
        .iter()
        .map(|(import, target)| FileEdge {
            source: import.file.clone(),
            target: target.clone(),
            via_import: import.id,
            line: import.line,
        })
        .collect();
    file_edges.sort_by(|a, b| (&a.source, &a.target, a.line).cmp(&(&b.source, &b.target, b.line)));

    let symbols = store.all_symbols().context("failed to load symbols")?;
    let call_edges = build_call_edges(&symbols, &file_edges);
    Ok((file_edges, call_edges))
}

fn build_call_edges(symbols: &[SymbolRow], file_edges: &[FileEdge]) -> Vec<CallEdge> {
    // (file, name) -> earliest-defined symbol id
    let mut by_name: ahash::AHashMap<(&str, &str), &SymbolRow> = ahash::AHashMap::new();
    for symbol in symbols {
        by_name
            .entry((symbol.file.as_str(), symbol.name.as_str()))
            .and_modify(|existing| {
                if symbol.line_start < existing.line_start {
                    *existing = symbol;
                }
            })
            .or_insert(symbol);
    }

    // importer -> resolved targets, sorted and deduplicated
    let mut targets: ahash::AHashMap<&str, Vec<&str>> = ahash::AHashMap::new();
    for edge in file_edges {
        targets
            .entry(edge.source.as_str())
            .or_default()
            .push(edge.target.as_str());
    }
    for list in targets.values_mut() {
        list.sort_unstable();
        list.dedup();
    }

    let mut call_edges = Vec::new();
    for caller in symbols {
        for call in &caller.raw_calls {
            let callee = by_name
                .get(&(caller.file.as_str(), call.name.as_str()))
                .copied()
                .or_else(|| {
                    targets.get(caller.file.as_str()).and_then(|imported| {
                        imported
                            .iter()
                            .find_map(|file| by_name.get(&(*file, call.name.as_str())).copied())
                    })
                });
            if let Some(callee) = callee {
                call_edges.push(CallEdge {
                    caller_symbol: caller.id.clone(),
                    callee_symbol: callee.id.clone(),
                    line: call.line,
                });
            }
        }
    }
    call_edges.sort_by(|a, b| {
        (&a.caller_symbol, a.line, &a.callee_symbol).cmp(&(&b.caller_symbol, b.line, &b.callee_symbol))
    });
    call_edges
}

/// Enumerate circular dependency chains in the file graph.
///
/// Each chain lists its files in traversal order, rotated to start at the
/// lexicographically smallest path. An acyclic graph yields an empty list.
pub fn detect_cycles(edges: &[FileEdge]) -> Vec<Vec<String>> {
    let mut graph: DiGraph<String, ()> = DiGraph::new();
    let mut nodes: ahash::AHashMap<String, NodeIndex> = ahash::AHashMap::new();

    let mut seen_pairs = ahash::AHashSet::new();
    for edge in edges {
        if edge.source == edge.target {
            continue;
        }
        if !seen_pairs.insert((edge.source.clone(), edge.target.clone())) {
            continue;
        }
        let a = *nodes
            .entry(edge.source.clone())
            .or_insert_with(|| graph.add_node(edge.source.clone()));
        let b = *nodes
            .entry(edge.target.clone())
            .or_insert_with(|| graph.add_node(edge.target.clone()));
        graph.add_edge(a, b, ());
    }

    let mut cycles = Vec::new();
    for scc in tarjan_scc(&graph) {
        if scc.len() < 2 {
            continue;
        }
        enumerate_scc_cycles(&graph, &scc, &mut cycles);
    }

    for cycle in &mut cycles {
        rotate_to_smallest(cycle);
    }
    cycles.sort();
    cycles.dedup();
    cycles
}

/// DFS enumeration of simple cycles inside one SCC.
///
/// Cycles are discovered from each start node, visiting only nodes at or
/// after the start in SCC order, so every simple cycle is found exactly
/// once (at its smallest member).
fn enumerate_scc_cycles(
    graph: &DiGraph<String, ()>,
    scc: &[NodeIndex],
    cycles: &mut Vec<Vec<String>>,
) {
    let mut members: Vec<NodeIndex> = scc.to_vec();
    members.sort_by(|a, b| graph[*a].cmp(&graph[*b]));
    let rank: ahash::AHashMap<NodeIndex, usize> =
        members.iter().enumerate().map(|(i, n)| (*n, i)).collect();

    let mut found = 0usize;
    for (start_rank, &start) in members.iter().enumerate() {
        let mut path = vec![start];
        let mut on_path: ahash::AHashSet<NodeIndex> = [start].into_iter().collect();
        dfs_cycles(
            graph, &rank, start, start_rank, start, &mut path, &mut on_path, cycles, &mut found,
        );
        if found >= MAX_CYCLES_PER_SCC {
            break;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn dfs_cycles(
    graph: &DiGraph<String, ()>,
    rank: &ahash::AHashMap<NodeIndex, usize>,
    start: NodeIndex,
    start_rank: usize,
    current: NodeIndex,
    path: &mut Vec<NodeIndex>,
    on_path: &mut ahash::AHashSet<NodeIndex>,
    cycles: &mut Vec<Vec<String>>,
    found: &mut usize,
) {
    if *found >= MAX_CYCLES_PER_SCC {
        return;
    }
    let mut neighbors: Vec<NodeIndex> = graph
        .neighbors(current)
        .filter(|n| rank.get(n).is_some_and(|r| *r >= start_rank))
        .collect();
    neighbors.sort_by(|a, b| graph[*a].cmp(&graph[*b]));

    for next in neighbors {
        if next == start {
            cycles.push(path.iter().map(|n| graph[*n].clone()).collect());
            *found += 1;
            if *found >= MAX_CYCLES_PER_SCC {
                return;
            }
        } else if !on_path.contains(&next) {
            path.push(next);
            on_path.insert(next);
            dfs_cycles(graph, rank, start, start_rank, next, path, on_path, cycles, found);
            on_path.remove(&next);
            path.pop();
        }
    }
}

fn rotate_to_smallest(cycle: &mut Vec<String>) {
    if let Some(min_idx) = cycle
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.cmp(b))
        .map(|(i, _)| i)
    {
        cycle.rotate_left(min_idx);
    }
}

/// Coupling score per module: normalized in+out degree.
///
/// score = (distinct in-neighbors + distinct out-neighbors) / (2 * (n - 1)),
/// clamped to [0, 1]; defined as 0 when the project has at most one module.
pub fn coupling_scores(paths: &[String], edges: &[FileEdge]) -> BTreeMap<String, f64> {
    let mut scores: BTreeMap<String, f64> = paths.iter().map(|p| (p.clone(), 0.0)).collect();
    let n = paths.len();
    if n <= 1 {
        return scores;
    }

    let mut out_neighbors: ahash::AHashMap<&str, ahash::AHashSet<&str>> = ahash::AHashMap::new();
    let mut in_neighbors: ahash::AHashMap<&str, ahash::AHashSet<&str>> = ahash::AHashMap::new();
    for edge in edges {
        if edge.source == edge.target {
            continue;
        }
        out_neighbors
            .entry(edge.source.as_str())
            .or_default()
            .insert(edge.target.as_str());
        in_neighbors
            .entry(edge.target.as_str())
            .or_default()
            .insert(edge.source.as_str());
    }

    let denominator = (2 * (n - 1)) as f64;
    for (path, score) in scores.iter_mut() {
        let degree = out_neighbors.get(path.as_str()).map_or(0, |s| s.len())
            + in_neighbors.get(path.as_str()).map_or(0, |s| s.len());
        *score = (degree as f64 / denominator).clamp(0.0, 1.0);
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(source: &str, target: &str) -> FileEdge {
        FileEdge {
            source: source.to_string(),
            target: target.to_string(),
            via_import: 0,
            line: 1,
        }
    }

    #[test]
    fn test_three_file_cycle_found_once() {
        let edges = vec![edge("a.py", "b.py"), edge("b.py", "c.py"), edge("c.py", "a.py")];
        let cycles = detect_cycles(&edges);
        assert_eq!(cycles, vec![vec!["a.py", "b.py", "c.py"]]);
    }

    #[test]
    fn test_acyclic_graph_yields_no_cycles() {
        let edges = vec![edge("a.py", "b.py"), edge("b.py", "c.py"), edge("a.py", "c.py")];
        assert!(detect_cycles(&edges).is_empty());
    }

    #[test]
    fn test_two_independent_cycles() {
        let edges = vec![
            edge("a.py", "b.py"),
            edge("b.py", "a.py"),
            edge("x.py", "y.py"),
            edge("y.py", "x.py"),
        ];
        let cycles = detect_cycles(&edges);
        assert_eq!(
            cycles,
            vec![vec!["a.py", "b.py"], vec!["x.py", "y.py"]]
        );
    }

    #[test]
    fn test_self_import_is_not_a_cycle() {
        let cycles = detect_cycles(&[edge("a.py", "a.py")]);
        assert!(cycles.is_empty());
    }

    #[test]
    fn test_coupling_bounds_and_single_module() {
        let paths = vec!["only.py".to_string()];
        let scores = coupling_scores(&paths, &[]);
        assert_eq!(scores["only.py"], 0.0);

        let paths: Vec<String> = ["a.py", "b.py", "c.py"].iter().map(|s| s.to_string()).collect();
        let edges = vec![edge("a.py", "b.py"), edge("c.py", "a.py")];
        let scores = coupling_scores(&paths, &edges);
        // a: 1 out + 1 in over 2*(3-1) = 4
        assert!((scores["a.py"] - 0.5).abs() < 1e-9);
        assert!((scores["b.py"] - 0.25).abs() < 1e-9);
        assert!(scores.values().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_duplicate_imports_count_once_for_coupling() {
        let paths: Vec<String> = ["a.py", "b.py"].iter().map(|s| s.to_string()).collect();
        let edges = vec![edge("a.py", "b.py"), edge("a.py", "b.py")];
        let scores = coupling_scores(&paths, &edges);
        assert!((scores["a.py"] - 0.5).abs() < 1e-9);
    }
}
