//! Rust symbol extraction using tree-sitter-rust.
//!
//! Extracts functions, impl methods, type definitions (struct/enum/trait map
//! to the language-agnostic class kind), `use` imports and `pub` exports.

use std::time::Duration;

use tree_sitter::Node;

use crate::error::ParseFailure;
use crate::parser::complexity::{cyclomatic, node_text, RUST_RULES};
use crate::parser::pool::with_parser;
use crate::parser::{
    symbol_id, ExportRecord, ImportRecord, Language, ParseResult, RawCall, SymbolKind,
    SymbolRecord,
};

/// Parse Rust source into the uniform result shape.
pub fn parse(
    rel_path: &str,
    source: &str,
    timeout: Duration,
) -> Result<ParseResult, ParseFailure> {
    let tree = with_parser(Language::Rust, timeout, |parser| {
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

    Ok(extract(rel_path, source, root))
}

fn extract(rel_path: &str, source: &str, root: Node) -> ParseResult {
    let mut result = ParseResult::default();
    // Outer attributes precede the item they annotate in the child list.
    let mut pending_attributes: Vec<String> = Vec::new();

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        match child.kind() {
            "attribute_item" => {
                let text = node_text(child, source)
                    .trim_start_matches("#[")
                    .trim_end_matches(']')
                    .to_string();
                pending_attributes.push(text);
                continue;
            }
            "function_item" => {
                if let Some(symbol) = function_symbol(
                    rel_path,
                    source,
                    child,
                    SymbolKind::Function,
                    &pending_attributes,
                ) {
                    if symbol.name == "main" {
                        result.entry_points.push(symbol.name.clone());
                    }
                    if symbol.exported {
                        result.exports.push(ExportRecord {
                            name: symbol.name.clone(),
                            kind: "function".to_string(),
                        });
                    }
                    result.symbols.push(symbol);
                }
            }
            "struct_item" | "enum_item" | "trait_item" => {
                if let Some(symbol) = type_symbol(rel_path, source, child, &pending_attributes) {
                    if symbol.exported {
                        result.exports.push(ExportRecord {
                            name: symbol.name.clone(),
                            kind: "type".to_string(),
                        });
                    }
                    result.symbols.push(symbol);
                }
            }
            "impl_item" => {
                extract_impl_methods(rel_path, source, child, &mut result);
            }
            "use_declaration" => {
                result.imports.extend(extract_use(child, source));
                if is_pub(child) {
                    // pub use re-exports; a glob re-export is the wildcard case
                    let module = use_module_path(child, source);
                    let name = if node_text(child, source).contains("::*") {
                        "*".to_string()
                    } else {
                        module
                            .rsplit("::")
                            .next()
                            .unwrap_or(&module)
                            .to_string()
                    };
                    result.exports.push(ExportRecord {
                        name,
                        kind: "reexport".to_string(),
                    });
                }
            }
            _ => {}
        }
        pending_attributes.clear();
    }

    result
}

fn function_symbol(
    rel_path: &str,
    source: &str,
    node: Node,
    kind: SymbolKind,
    attributes: &[String],
) -> Option<SymbolRecord> {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())?;
    let line_start = node.start_position().row + 1;

    Some(SymbolRecord {
        id: symbol_id(Language::Rust, rel_path, kind, &name, line_start),
        kind,
        name,
        line_start,
        line_end: node.end_position().row + 1,
        complexity: Some(cyclomatic(node, &RUST_RULES)),
        parameters: extract_parameters(node, source),
        raw_calls: collect_calls(node, source),
        exported: is_pub(node),
        decorators: attributes.to_vec(),
        code: node_text(node, source).to_string(),
    })
}

fn type_symbol(
    rel_path: &str,
    source: &str,
    node: Node,
    attributes: &[String],
) -> Option<SymbolRecord> {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())?;
    let line_start = node.start_position().row + 1;

    Some(SymbolRecord {
        id: symbol_id(Language::Rust, rel_path, SymbolKind::Class, &name, line_start),
        kind: SymbolKind::Class,
        name,
        line_start,
        line_end: node.end_position().row + 1,
        complexity: None,
        parameters: Vec::new(),
        raw_calls: Vec::new(),
        exported: is_pub(node),
        decorators: attributes.to_vec(),
        code: node_text(node, source).to_string(),
    })
}

fn extract_impl_methods(rel_path: &str, source: &str, node: Node, result: &mut ParseResult) {
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let mut pending_attributes: Vec<String> = Vec::new();
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        match child.kind() {
            "attribute_item" => {
                let text = node_text(child, source)
                    .trim_start_matches("#[")
                    .trim_end_matches(']')
                    .to_string();
                pending_attributes.push(text);
                continue;
            }
            "function_item" => {
                if let Some(symbol) = function_symbol(
                    rel_path,
                    source,
                    child,
                    SymbolKind::Method,
                    &pending_attributes,
                ) {
                    result.symbols.push(symbol);
                }
            }
            _ => {}
        }
        pending_attributes.clear();
    }
}

fn is_pub(node: Node) -> bool {
    let mut cursor = node.walk();
    let has_vis = node
        .children(&mut cursor)
        .any(|c| c.kind() == "visibility_modifier");
    has_vis
}

fn extract_parameters(node: Node, source: &str) -> Vec<String> {
    let Some(params) = node.child_by_field_name("parameters") else {
        return Vec::new();
    };
    let mut out = Vec::new();
    let mut cursor = params.walk();
    for child in params.children(&mut cursor) {
        match child.kind() {
            "(" | ")" | "," => {}
            _ => {
                let text = node_text(child, source).trim().to_string();
                if !text.is_empty() {
                    out.push(text);
                }
            }
        }
    }
    out
}

fn collect_calls(function_node: Node, source: &str) -> Vec<RawCall> {
    let mut calls = Vec::new();
    let mut stack = vec![function_node];
    while let Some(node) = stack.pop() {
        if node.kind() == "call_expression" {
            if let Some(func) = node.child_by_field_name("function") {
                if let Some(name) = callee_name(func, source) {
                    calls.push(RawCall {
                        name,
                        line: node.start_position().row + 1,
                    });
                }
            }
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }
    calls.sort_by(|a, b| a.line.cmp(&b.line).then_with(|| a.name.cmp(&b.name)));
    calls
}

fn callee_name(func: Node, source: &str) -> Option<String> {
    match func.kind() {
        "identifier" => Some(node_text(func, source).to_string()),
        "field_expression" => func
            .child_by_field_name("field")
            .map(|n| node_text(n, source).to_string()),
        "scoped_identifier" => func
            .child_by_field_name("name")
            .map(|n| node_text(n, source).to_string()),
        _ => None,
    }
}

fn extract_use(node: Node, source: &str) -> Vec<ImportRecord> {
    let statement = node_text(node, source).to_string();
    let module = use_module_path(node, source);
    if module.is_empty() {
        return Vec::new();
    }
    vec![ImportRecord {
        statement,
        module,
        line: node.start_position().row + 1,
    }]
}

/// Base path of a use declaration: `use a::b::{c, d};` → `a::b`,
/// `use a::b::C;` → `a::b::C`, `use a::b::*;` → `a::b`.
fn use_module_path(node: Node, source: &str) -> String {
    let text = node_text(node, source)
        .trim_start_matches("pub")
        .trim()
        .trim_start_matches("use")
        .trim()
        .trim_end_matches(';')
        .trim();
    let text = match text.split_once(" as ") {
        Some((path, _alias)) => path,
        None => text,
    };
    let base = match text.find("::{") {
        Some(pos) => &text[..pos],
        None => text.trim_end_matches("::*"),
    };
    base.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> ParseResult {
        parse("src/lib.rs", source, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_functions_and_visibility() {
        let result = parse_ok(
            r#"
pub fn public_api() {}

fn private_helper() {
    public_api();
}
"#,
        );
        assert_eq!(result.symbols.len(), 2);
        assert!(result.symbols[0].exported);
        assert!(!result.symbols[1].exported);
        assert_eq!(result.exports.len(), 1);
        assert_eq!(result.exports[0].name, "public_api");
        assert_eq!(result.symbols[1].raw_calls[0].name, "public_api");
    }

    #[test]
    fn test_types_map_to_class_kind() {
        let result = parse_ok("pub struct Config;\nenum Mode { A, B }\ntrait Runner {}\n");
        let kinds: Vec<SymbolKind> = result.symbols.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SymbolKind::Class, SymbolKind::Class, SymbolKind::Class]
        );
        assert!(result.symbols.iter().all(|s| s.complexity.is_none()));
    }

    #[test]
    fn test_impl_methods() {
        let result = parse_ok(
            r#"
struct Engine;

impl Engine {
    pub fn start(&self) {}
    fn warm_up(&self) { self.start(); }
}
"#,
        );
        let methods: Vec<&SymbolRecord> = result
            .symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Method)
            .collect();
        assert_eq!(methods.len(), 2);
        assert!(methods[0].exported);
        assert!(!methods[1].exported);
        assert_eq!(methods[1].raw_calls[0].name, "start");
    }

    #[test]
    fn test_use_module_paths() {
        let result = parse_ok(
            "use std::collections::HashMap;\nuse crate::scanner::{scan, Fingerprint};\npub use crate::parser::*;\n",
        );
        let modules: Vec<&str> = result.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(
            modules,
            vec!["std::collections::HashMap", "crate::scanner", "crate::parser"]
        );
        // Glob re-export surfaces as wildcard export
        assert!(result.exports.iter().any(|e| e.name == "*"));
    }

    #[test]
    fn test_main_is_entry_point() {
        let result = parse_ok("fn main() { run(); }\nfn run() {}\n");
        assert_eq!(result.entry_points, vec!["main"]);
    }

    #[test]
    fn test_attributes_as_decorators() {
        let result = parse_ok("#[test]\nfn check_roundtrip() {}\n");
        assert_eq!(result.symbols[0].decorators, vec!["test"]);
    }
}
