//! Table-of-contents keyword index.
//!
//! A compact, derived summary over the store: per-type counts, the most
//! complex functions, and a keyword map from name tokens to exact
//! locations. Always rebuilt in full after resolution and analysis settle;
//! the relational store stays the source of truth and the TOC is a cache
//! persisted as one JSON blob for fast load.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::analysis::complexity_ranking;
use crate::store::{Statistics, Store};

/// File name of the persisted TOC blob, next to the store database.
pub const TOC_FILE_NAME: &str = "cartograph.toc.json";

/// Where a keyword points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TocPointer {
    /// "function", "method", "class" or "file"
    pub entity_type: String,
    /// Symbol id, or the path itself for files
    pub entity_id: String,
    pub file: String,
    pub line: usize,
}

/// A notable entry surfaced in the sections summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TocComplexEntry {
    pub name: String,
    pub file: String,
    pub line: usize,
    pub composite: f64,
}

/// Section summaries: counts plus notable entries, no full records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TocSections {
    pub top_complex: Vec<TocComplexEntry>,
}

/// The full table of contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Toc {
    pub sections: TocSections,
    /// keyword -> pointers, many-to-many
    pub keywords: BTreeMap<String, Vec<TocPointer>>,
    pub statistics: Statistics,
    /// Unix timestamp of the rebuild
    pub built_at: i64,
}

impl Toc {
    /// Pointers for one keyword, empty when unknown. Case-insensitive.
    pub fn search(&self, keyword: &str) -> &[TocPointer] {
        self.keywords
            .get(&keyword.to_lowercase())
            .map_or(&[], Vec::as_slice)
    }

    /// Persist as a single JSON blob.
    pub fn save(&self, path: &Path) -> Result<()> {
        let blob = serde_json::to_vec(self).context("failed to encode TOC")?;
        std::fs::write(path, blob)
            .with_context(|| format!("failed to write TOC to {}", path.display()))?;
        Ok(())
    }

    /// Load a previously persisted blob.
    pub fn load(path: &Path) -> Result<Self> {
        let blob = std::fs::read(path)
            .with_context(|| format!("failed to read TOC from {}", path.display()))?;
        serde_json::from_slice(&blob).context("failed to decode TOC")
    }
}

/// Rebuild the TOC from the store.
///
/// # Guarantees
/// - Every stored symbol is reachable through at least one keyword token
/// - Deterministic: identical store contents produce an identical TOC
///   apart from the build timestamp
pub fn build(store: &Store) -> Result<Toc> {
    let statistics = store.statistics().context("failed to load statistics")?;
    let symbols = store.all_symbols().context("failed to load symbols")?;
    let files = store.all_files().context("failed to load files")?;

    let mut keywords: BTreeMap<String, Vec<TocPointer>> = BTreeMap::new();
    let mut add = |keywords: &mut BTreeMap<String, Vec<TocPointer>>,
                   token: String,
                   pointer: &TocPointer| {
        let entries = keywords.entry(token).or_default();
        if !entries.contains(pointer) {
            entries.push(pointer.clone());
        }
    };

    for symbol in &symbols {
        let pointer = TocPointer {
            entity_type: symbol.kind.as_str().to_string(),
            entity_id: symbol.id.clone(),
            file: symbol.file.clone(),
            line: symbol.line_start,
        };
        for token in tokenize(&symbol.name) {
            add(&mut keywords, token, &pointer);
        }
        // The full name always resolves, even when single-token
        add(&mut keywords, symbol.name.to_lowercase(), &pointer);
    }

    for file in &files {
        let pointer = TocPointer {
            entity_type: "file".to_string(),
            entity_id: file.path.clone(),
            file: file.path.clone(),
            line: 1,
        };
        for token in tokenize(&file.path) {
            add(&mut keywords, token, &pointer);
        }
    }

    let sections = TocSections {
        top_complex: complexity_ranking(store)?
            .into_iter()
            .take(10)
            .map(|entry| TocComplexEntry {
                name: entry.name,
                file: entry.file,
                line: entry.line,
                composite: entry.composite,
            })
            .collect(),
    };

    debug!(keywords = keywords.len(), "TOC rebuilt");
    Ok(Toc {
        sections,
        keywords,
        statistics,
        built_at: chrono::Utc::now().timestamp(),
    })
}

/// Split a name into lowercase lookup tokens.
///
/// Path and punctuation separators split first, then camelCase boundaries
/// within each piece. Single-character fragments are dropped.
pub fn tokenize(name: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    for piece in name.split(|c: char| !c.is_alphanumeric()) {
        if piece.is_empty() {
            continue;
        }
        for token in split_camel(piece) {
            if token.len() >= 2 && !tokens.contains(&token) {
                tokens.push(token);
            }
        }
    }
    tokens
}

fn split_camel(piece: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in piece.chars() {
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            tokens.push(current.to_lowercase());
            current = String::new();
        }
        prev_lower = c.is_lowercase() || c.is_numeric();
        current.push(c);
    }
    if !current.is_empty() {
        tokens.push(current.to_lowercase());
    }
    tokens
}
