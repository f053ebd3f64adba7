//! Per-language symbol extraction
//!
//! Every extractor produces the same `ParseResult` shape so downstream
//! stages stay language-agnostic. Languages with a tree-sitter grammar get
//! a real syntax tree (accurate complexity and scope); the rest go through
//! best-effort pattern extraction with no complexity score.
//!
//! Extractors are pure: input (path, contents) → output `ParseResult`.
//! No filesystem access. No global state. Malformed input yields a
//! `ParseFailure` that the coordinator logs and skips.

pub mod complexity;
pub mod javascript;
pub mod pattern;
pub mod pool;
pub mod python;
pub mod rust;
pub mod typescript;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ParseFailure;

/// Supported languages.
///
/// A closed set: adding a language means one new variant, one extractor,
/// and one row in the extension table. No runtime reflection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Python,
    Rust,
    JavaScript,
    TypeScript,
    Go,
    Ruby,
}

impl Language {
    /// Stable string key for storage and statistics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Rust => "rust",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Go => "go",
            Language::Ruby => "ruby",
        }
    }

    /// Parse a storage key back to a language.
    pub fn from_str_key(s: &str) -> Option<Self> {
        match s {
            "python" => Some(Language::Python),
            "rust" => Some(Language::Rust),
            "javascript" => Some(Language::JavaScript),
            "typescript" => Some(Language::TypeScript),
            "go" => Some(Language::Go),
            "ruby" => Some(Language::Ruby),
            _ => None,
        }
    }

    /// True when a tree-sitter grammar backs this language.
    ///
    /// Pattern-extracted languages get no complexity scores.
    pub fn has_syntax_tree(&self) -> bool {
        matches!(
            self,
            Language::Python | Language::Rust | Language::JavaScript | Language::TypeScript
        )
    }

    /// Source file extensions resolved against this language.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py"],
            Language::Rust => &["rs"],
            Language::JavaScript => &["js", "mjs", "cjs", "jsx"],
            Language::TypeScript => &["ts", "tsx"],
            Language::Go => &["go"],
            Language::Ruby => &["rb"],
        }
    }
}

/// Extension → language dispatch table, built once at startup.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    map: ahash::AHashMap<&'static str, Language>,
}

impl LanguageTable {
    /// Build the table from the closed language set.
    pub fn new() -> Self {
        let mut map = ahash::AHashMap::new();
        for language in [
            Language::Python,
            Language::Rust,
            Language::JavaScript,
            Language::TypeScript,
            Language::Go,
            Language::Ruby,
        ] {
            for ext in language.extensions() {
                map.insert(*ext, language);
            }
        }
        Self { map }
    }

    /// Detect the language of a path by extension, if supported.
    pub fn detect(&self, path: &Path) -> Option<Language> {
        let ext = path.extension()?.to_str()?;
        self.map.get(ext).copied()
    }
}

impl Default for LanguageTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Kind of extracted symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    Method,
    Class,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Class => "class",
        }
    }

    pub fn from_str_key(s: &str) -> Option<Self> {
        match s {
            "function" => Some(SymbolKind::Function),
            "method" => Some(SymbolKind::Method),
            "class" => Some(SymbolKind::Class),
            _ => None,
        }
    }
}

/// An unresolved call site inside a symbol body.
///
/// Only the textual callee name is recorded; resolution to a concrete
/// symbol happens later against the full symbol set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCall {
    pub name: String,
    /// 1-indexed line of the call site
    pub line: usize,
}

/// A symbol extracted from one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolRecord {
    /// Stable id: blake3 of language:file:kind:name:line, 32 hex chars
    pub id: String,
    pub kind: SymbolKind,
    pub name: String,
    /// 1-indexed inclusive line range
    pub line_start: usize,
    pub line_end: usize,
    /// Cyclomatic complexity; None for classes and pattern-extracted symbols
    pub complexity: Option<u32>,
    pub parameters: Vec<String>,
    pub raw_calls: Vec<RawCall>,
    pub exported: bool,
    pub decorators: Vec<String>,
    /// Verbatim source snippet of the symbol
    pub code: String,
}

/// An import statement extracted from one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRecord {
    /// Raw statement text as written
    pub statement: String,
    /// Textual module path (e.g. "./util", "os.path", "crate::scanner")
    pub module: String,
    /// 1-indexed line
    pub line: usize,
}

/// An export entry extracted from one file.
///
/// `name` is `*` for wildcard re-exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub name: String,
    pub kind: String,
}

/// Uniform output of every extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    pub symbols: Vec<SymbolRecord>,
    pub imports: Vec<ImportRecord>,
    pub exports: Vec<ExportRecord>,
    /// Names of symbols recognized as program entry points in this file
    /// (a `main` function, targets of a Python main guard, ...)
    pub entry_points: Vec<String>,
}

/// Derive the stable symbol id.
///
/// Deterministic across runs: identical (language, file, kind, name, line)
/// always hashes to the same id.
pub fn symbol_id(
    language: Language,
    rel_path: &str,
    kind: SymbolKind,
    name: &str,
    line: usize,
) -> String {
    let input = format!(
        "{}:{}:{}:{}:{}",
        language.as_str(),
        rel_path,
        kind.as_str(),
        name,
        line
    );
    blake3::hash(input.as_bytes()).to_hex()[..32].to_string()
}

/// Parse one file's content with the extractor for its language.
///
/// # Arguments
/// * `language` - Language selected via the dispatch table
/// * `rel_path` - Project-relative path (identity only, never read)
/// * `source` - File content
/// * `timeout` - Per-file parse timeout for pathological input
///
/// # Returns
/// A uniform `ParseResult`, or a `ParseFailure` carrying path + reason.
///
/// # Guarantees
/// - Deterministic: identical input produces identical output
/// - A failure never panics and never aborts the surrounding batch
pub fn parse_source(
    language: Language,
    rel_path: &str,
    source: &str,
    timeout: Duration,
) -> Result<ParseResult, ParseFailure> {
    match language {
        Language::Python => python::parse(rel_path, source, timeout),
        Language::Rust => rust::parse(rel_path, source, timeout),
        Language::JavaScript => javascript::parse(rel_path, source, timeout),
        Language::TypeScript => typescript::parse(rel_path, source, timeout),
        Language::Go | Language::Ruby => pattern::parse(language, rel_path, source),
    }
}

/// Count non-empty lines of code.
pub fn count_loc(source: &str) -> usize {
    source.lines().filter(|l| !l.trim().is_empty()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_table_detection() {
        let table = LanguageTable::new();
        assert_eq!(table.detect(Path::new("a/b.py")), Some(Language::Python));
        assert_eq!(table.detect(Path::new("lib.rs")), Some(Language::Rust));
        assert_eq!(table.detect(Path::new("x.tsx")), Some(Language::TypeScript));
        assert_eq!(table.detect(Path::new("x.mjs")), Some(Language::JavaScript));
        assert_eq!(table.detect(Path::new("m.go")), Some(Language::Go));
        assert_eq!(table.detect(Path::new("m.rb")), Some(Language::Ruby));
        assert_eq!(table.detect(Path::new("readme.md")), None);
        assert_eq!(table.detect(Path::new("Makefile")), None);
    }

    #[test]
    fn test_symbol_id_deterministic() {
        let a = symbol_id(Language::Python, "src/a.py", SymbolKind::Function, "foo", 3);
        let b = symbol_id(Language::Python, "src/a.py", SymbolKind::Function, "foo", 3);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);

        let c = symbol_id(Language::Python, "src/a.py", SymbolKind::Function, "foo", 4);
        assert_ne!(a, c, "different line must produce a different id");
    }

    #[test]
    fn test_count_loc_skips_blank_lines() {
        assert_eq!(count_loc("a\n\nb\n   \nc"), 3);
        assert_eq!(count_loc(""), 0);
    }

    #[test]
    fn test_language_round_trip_keys() {
        for lang in [
            Language::Python,
            Language::Rust,
            Language::JavaScript,
            Language::TypeScript,
            Language::Go,
            Language::Ruby,
        ] {
            assert_eq!(Language::from_str_key(lang.as_str()), Some(lang));
        }
        assert_eq!(Language::from_str_key("cobol"), None);
    }
}
