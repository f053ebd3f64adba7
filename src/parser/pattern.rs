//! Best-effort pattern extraction for languages without a bundled grammar.
//!
//! Go and Ruby go through line-oriented regex extraction: symbols and
//! imports only, no complexity score and no call sites. Lower confidence by
//! design; downstream consumers see the same `ParseResult` shape and treat
//! missing complexity as "not measured".

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ParseFailure;
use crate::parser::{
    symbol_id, ExportRecord, ImportRecord, Language, ParseResult, SymbolKind, SymbolRecord,
};

struct GoPatterns {
    function: Regex,
    type_def: Regex,
    import_single: Regex,
    import_block_entry: Regex,
}

struct RubyPatterns {
    method: Regex,
    class: Regex,
    require: Regex,
}

fn go_patterns() -> &'static GoPatterns {
    static PATTERNS: OnceLock<GoPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| GoPatterns {
        // `func Name(` and `func (r *Recv) Name(`
        function: Regex::new(r"^func\s+(?:\([^)]*\)\s+)?([A-Za-z_][A-Za-z0-9_]*)\s*\(")
            .expect("static pattern"),
        type_def: Regex::new(r"^type\s+([A-Za-z_][A-Za-z0-9_]*)\s+(?:struct|interface)\b")
            .expect("static pattern"),
        import_single: Regex::new(r#"^import\s+(?:[A-Za-z_.]+\s+)?"([^"]+)""#)
            .expect("static pattern"),
        import_block_entry: Regex::new(r#"^\s+(?:[A-Za-z_.]+\s+)?"([^"]+)"\s*$"#)
            .expect("static pattern"),
    })
}

fn ruby_patterns() -> &'static RubyPatterns {
    static PATTERNS: OnceLock<RubyPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| RubyPatterns {
        method: Regex::new(r"^\s*def\s+(?:self\.)?([A-Za-z_][A-Za-z0-9_]*[?!=]?)")
            .expect("static pattern"),
        class: Regex::new(r"^\s*(?:class|module)\s+([A-Z][A-Za-z0-9_:]*)").expect("static pattern"),
        require: Regex::new(r#"^\s*require(_relative)?\s+['"]([^'"]+)['"]"#)
            .expect("static pattern"),
    })
}

/// Pattern-extract a Go or Ruby file.
///
/// Never fails on malformed content: unmatched lines are simply skipped.
pub fn parse(
    language: Language,
    rel_path: &str,
    source: &str,
) -> Result<ParseResult, ParseFailure> {
    let result = match language {
        Language::Go => extract_go(rel_path, source),
        Language::Ruby => extract_ruby(rel_path, source),
        other => {
            return Err(ParseFailure {
                path: rel_path.to_string(),
                reason: format!("no pattern extractor for {}", other.as_str()),
            })
        }
    };
    Ok(result)
}

fn extract_go(rel_path: &str, source: &str) -> ParseResult {
    let patterns = go_patterns();
    let mut result = ParseResult::default();
    let mut in_import_block = false;

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;

        if line.trim_start().starts_with("import (") {
            in_import_block = true;
            continue;
        }
        if in_import_block {
            if line.trim() == ")" {
                in_import_block = false;
            } else if let Some(caps) = patterns.import_block_entry.captures(line) {
                result.imports.push(ImportRecord {
                    statement: line.trim().to_string(),
                    module: caps[1].to_string(),
                    line: line_no,
                });
            }
            continue;
        }

        if let Some(caps) = patterns.import_single.captures(line) {
            result.imports.push(ImportRecord {
                statement: line.trim().to_string(),
                module: caps[1].to_string(),
                line: line_no,
            });
        } else if let Some(caps) = patterns.function.captures(line) {
            let name = caps[1].to_string();
            // Go exports by capitalization
            let exported = name.chars().next().is_some_and(|c| c.is_uppercase());
            if name == "main" {
                result.entry_points.push(name.clone());
            }
            if exported {
                result.exports.push(ExportRecord {
                    name: name.clone(),
                    kind: "function".to_string(),
                });
            }
            result.symbols.push(pattern_symbol(
                Language::Go,
                rel_path,
                SymbolKind::Function,
                name,
                line_no,
                line,
                exported,
            ));
        } else if let Some(caps) = patterns.type_def.captures(line) {
            let name = caps[1].to_string();
            let exported = name.chars().next().is_some_and(|c| c.is_uppercase());
            if exported {
                result.exports.push(ExportRecord {
                    name: name.clone(),
                    kind: "type".to_string(),
                });
            }
            result.symbols.push(pattern_symbol(
                Language::Go,
                rel_path,
                SymbolKind::Class,
                name,
                line_no,
                line,
                exported,
            ));
        }
    }

    result
}

fn extract_ruby(rel_path: &str, source: &str) -> ParseResult {
    let patterns = ruby_patterns();
    let mut result = ParseResult::default();

    for (idx, line) in source.lines().enumerate() {
        let line_no = idx + 1;

        if let Some(caps) = patterns.require.captures(line) {
            let relative = caps.get(1).is_some();
            let module = if relative {
                format!("./{}", &caps[2])
            } else {
                caps[2].to_string()
            };
            result.imports.push(ImportRecord {
                statement: line.trim().to_string(),
                module,
                line: line_no,
            });
        } else if let Some(caps) = patterns.class.captures(line) {
            result.symbols.push(pattern_symbol(
                Language::Ruby,
                rel_path,
                SymbolKind::Class,
                caps[1].to_string(),
                line_no,
                line,
                true,
            ));
        } else if let Some(caps) = patterns.method.captures(line) {
            let name = caps[1].to_string();
            let exported = !name.starts_with('_');
            result.symbols.push(pattern_symbol(
                Language::Ruby,
                rel_path,
                SymbolKind::Method,
                name,
                line_no,
                line,
                exported,
            ));
        }
    }

    result
}

fn pattern_symbol(
    language: Language,
    rel_path: &str,
    kind: SymbolKind,
    name: String,
    line: usize,
    line_text: &str,
    exported: bool,
) -> SymbolRecord {
    SymbolRecord {
        id: symbol_id(language, rel_path, kind, &name, line),
        kind,
        name,
        line_start: line,
        line_end: line,
        complexity: None,
        parameters: Vec::new(),
        raw_calls: Vec::new(),
        exported,
        decorators: Vec::new(),
        code: line_text.trim().to_string(),
    }
}
