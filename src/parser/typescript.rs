//! TypeScript symbol extraction using tree-sitter-typescript.
//!
//! The TypeScript grammar is a superset of the JavaScript one; parsing uses
//! the TypeScript parser and the tree walk is shared with `javascript`.

use std::time::Duration;

use crate::error::ParseFailure;
use crate::parser::javascript::extract_tree;
use crate::parser::pool::with_parser;
use crate::parser::{Language, ParseResult};

/// Parse TypeScript source into the uniform result shape.
pub fn parse(
    rel_path: &str,
    source: &str,
    timeout: Duration,
) -> Result<ParseResult, ParseFailure> {
    let tree = with_parser(Language::TypeScript, timeout, |parser| {
        parser.parse(source.as_bytes(), None)
    })
    .map_err(|e| ParseFailure {
        path: rel_path.to_string(),
        reason: format!("parser initialization failed: {e}"),
    })?;

    let Some(tree) = tree else {
        return Err(ParseFailure {
            path: rel_path.to_string(),
            reason: "parse timeout".to_string(),
        });
    };

    let root = tree.root_node();
    if root.has_error() {
        return Err(ParseFailure {
            path: rel_path.to_string(),
            reason: "syntax error".to_string(),
        });
    }

    Ok(extract_tree(Language::TypeScript, rel_path, source, root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SymbolKind;

    fn parse_ok(source: &str) -> ParseResult {
        parse("src/app.ts", source, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_typed_function() {
        let result = parse_ok("export function add(a: number, b: number): number { return a + b; }\n");
        assert_eq!(result.symbols.len(), 1);
        assert_eq!(result.symbols[0].parameters, vec!["a: number", "b: number"]);
        assert!(result.symbols[0].exported);
    }

    #[test]
    fn test_interface_extracted_as_class_kind() {
        let result = parse_ok("export interface User { id: string; }\n");
        assert_eq!(result.symbols.len(), 1);
        assert_eq!(result.symbols[0].kind, SymbolKind::Class);
        assert_eq!(result.symbols[0].complexity, None);
    }

    #[test]
    fn test_symbol_ids_differ_from_javascript() {
        let ts = parse("a.ts", "function f() {}", Duration::from_secs(5)).unwrap();
        let js = crate::parser::javascript::parse("a.ts", "function f() {}", Duration::from_secs(5))
            .unwrap();
        assert_ne!(
            ts.symbols[0].id, js.symbols[0].id,
            "language participates in the stable id"
        );
    }
}
