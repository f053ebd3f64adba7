//! Composite complexity ranking.
//!
//! composite = cyclomatic * 0.5 + (LOC / 10) * 0.3 + nesting * 0.2
//!
//! LOC counts non-empty snippet lines; nesting depth is estimated from the
//! snippet's indentation relative to its first line, which tracks real
//! block depth closely enough for ranking purposes. Ranking is descending,
//! ties broken by symbol id so repeated runs agree.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::parser::count_loc;
use crate::store::Store;

const CYCLOMATIC_WEIGHT: f64 = 0.5;
const LOC_WEIGHT: f64 = 0.3;
const NESTING_WEIGHT: f64 = 0.2;

/// One ranked entry in the complexity report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComplexityEntry {
    pub symbol_id: String,
    pub file: String,
    pub name: String,
    pub line: usize,
    pub cyclomatic: u32,
    pub loc: usize,
    pub nesting: u32,
    /// Always >= 0
    pub composite: f64,
    /// 1-based position, descending by composite
    pub rank: usize,
}

/// Rank every measured function by composite complexity.
///
/// Symbols without a cyclomatic score (classes, pattern-extracted
/// languages) are excluded. An empty store returns an empty list.
pub fn complexity_ranking(store: &Store) -> Result<Vec<ComplexityEntry>> {
    let symbols = store.all_symbols().context("failed to load symbols")?;

    let mut entries: Vec<ComplexityEntry> = symbols
        .iter()
        .filter_map(|symbol| {
            let cyclomatic = symbol.complexity?;
            let loc = count_loc(&symbol.code);
            let nesting = estimate_nesting(&symbol.code);
            let composite = f64::from(cyclomatic) * CYCLOMATIC_WEIGHT
                + (loc as f64 / 10.0) * LOC_WEIGHT
                + f64::from(nesting) * NESTING_WEIGHT;
            Some(ComplexityEntry {
                symbol_id: symbol.id.clone(),
                file: symbol.file.clone(),
                name: symbol.name.clone(),
                line: symbol.line_start,
                cyclomatic,
                loc,
                nesting,
                composite,
                rank: 0,
            })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.composite
            .partial_cmp(&a.composite)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.symbol_id.cmp(&b.symbol_id))
    });
    for (idx, entry) in entries.iter_mut().enumerate() {
        entry.rank = idx + 1;
    }
    Ok(entries)
}

/// Estimate block nesting depth from indentation.
///
/// Depth is the maximum indent beyond the snippet's first line, counted in
/// 4-space units; a tab counts as one level.
fn estimate_nesting(code: &str) -> u32 {
    let mut lines = code.lines().filter(|l| !l.trim().is_empty());
    let Some(first) = lines.next() else { return 0 };
    let base = indent_width(first);

    lines
        .map(|line| indent_width(line).saturating_sub(base) / 4)
        .max()
        .unwrap_or(0) as u32
}

fn indent_width(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            ' ' => width += 1,
            '\t' => width += 4,
            _ => break,
        }
    }
    width
}
