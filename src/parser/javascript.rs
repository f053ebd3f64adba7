//! JavaScript symbol extraction using tree-sitter-javascript.
//!
//! The TypeScript grammar is a superset of this one, so the tree walk is
//! shared: `typescript.rs` parses with its own grammar and delegates here.

use std::time::Duration;

use tree_sitter::Node;

use crate::error::ParseFailure;
use crate::parser::complexity::{cyclomatic, node_text, JAVASCRIPT_RULES};
use crate::parser::pool::with_parser;
use crate::parser::{
    symbol_id, ExportRecord, ImportRecord, Language, ParseResult, RawCall, SymbolKind,
    SymbolRecord,
};

/// Parse JavaScript source into the uniform result shape.
pub fn parse(
    rel_path: &str,
    source: &str,
    timeout: Duration,
) -> Result<ParseResult, ParseFailure> {
    let tree = with_parser(Language::JavaScript, timeout, |parser| {
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

    Ok(extract_tree(Language::JavaScript, rel_path, source, root))
}

/// Shared tree walk for the JavaScript and TypeScript grammars.
pub(crate) fn extract_tree(
    language: Language,
    rel_path: &str,
    source: &str,
    root: Node,
) -> ParseResult {
    let mut result = ParseResult::default();

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        extract_statement(language, rel_path, source, child, false, &mut result);
    }

    result
}

fn extract_statement(
    language: Language,
    rel_path: &str,
    source: &str,
    node: Node,
    exported: bool,
    result: &mut ParseResult,
) {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" => {
            if let Some(symbol) =
                function_symbol(language, rel_path, source, node, SymbolKind::Function, exported)
            {
                if symbol.name == "main" {
                    result.entry_points.push(symbol.name.clone());
                }
                if exported {
                    result.exports.push(ExportRecord {
                        name: symbol.name.clone(),
                        kind: "function".to_string(),
                    });
                }
                result.symbols.push(symbol);
            }
        }
        "class_declaration" => {
            extract_class(language, rel_path, source, node, exported, result);
        }
        "interface_declaration" => {
            // TypeScript only
            if let Some(symbol) = type_symbol(language, rel_path, source, node, exported) {
                if exported {
                    result.exports.push(ExportRecord {
                        name: symbol.name.clone(),
                        kind: "interface".to_string(),
                    });
                }
                result.symbols.push(symbol);
            }
        }
        "lexical_declaration" | "variable_declaration" => {
            extract_variable_functions(language, rel_path, source, node, exported, result);
        }
        "import_statement" => {
            if let Some(import) = extract_import(node, source) {
                result.imports.push(import);
            }
        }
        "export_statement" => {
            extract_export(language, rel_path, source, node, result);
        }
        _ => {}
    }
}

fn extract_export(
    language: Language,
    rel_path: &str,
    source: &str,
    node: Node,
    result: &mut ParseResult,
) {
    let text = node_text(node, source);

    // `export * from './x'` is the wildcard case
    if text.starts_with("export *") {
        result.exports.push(ExportRecord {
            name: "*".to_string(),
            kind: "wildcard".to_string(),
        });
        if let Some(import) = extract_reexport_source(node, source) {
            result.imports.push(import);
        }
        return;
    }

    // `export { a, b }` and `export { a } from './x'`
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "export_clause" => {
                let mut clause_cursor = child.walk();
                for spec in child.children(&mut clause_cursor) {
                    if spec.kind() == "export_specifier" {
                        if let Some(name) = spec.child_by_field_name("name") {
                            result.exports.push(ExportRecord {
                                name: node_text(name, source).to_string(),
                                kind: "name".to_string(),
                            });
                        }
                    }
                }
                if let Some(import) = extract_reexport_source(node, source) {
                    result.imports.push(import);
                }
            }
            // `export function f() {}`, `export class C {}`, `export const f = ...`
            "function_declaration"
            | "generator_function_declaration"
            | "class_declaration"
            | "interface_declaration"
            | "lexical_declaration"
            | "variable_declaration" => {
                extract_statement(language, rel_path, source, child, true, result);
            }
            _ => {}
        }
    }
}

fn extract_reexport_source(node: Node, source: &str) -> Option<ImportRecord> {
    let module_node = node.child_by_field_name("source")?;
    Some(ImportRecord {
        statement: node_text(node, source).to_string(),
        module: strip_quotes(node_text(module_node, source)),
        line: node.start_position().row + 1,
    })
}

fn extract_class(
    language: Language,
    rel_path: &str,
    source: &str,
    node: Node,
    exported: bool,
    result: &mut ParseResult,
) {
    let Some(symbol) = type_symbol(language, rel_path, source, node, exported) else {
        return;
    };
    if exported {
        result.exports.push(ExportRecord {
            name: symbol.name.clone(),
            kind: "class".to_string(),
        });
    }
    result.symbols.push(symbol);

    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        if child.kind() == "method_definition" {
            if let Some(symbol) =
                function_symbol(language, rel_path, source, child, SymbolKind::Method, exported)
            {
                result.symbols.push(symbol);
            }
        }
    }
}

/// `const foo = () => {}` and `const foo = function () {}` bindings.
fn extract_variable_functions(
    language: Language,
    rel_path: &str,
    source: &str,
    node: Node,
    exported: bool,
    result: &mut ParseResult,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() != "variable_declarator" {
            continue;
        }
        let Some(value) = child.child_by_field_name("value") else {
            continue;
        };
        if !matches!(
            value.kind(),
            "arrow_function" | "function_expression" | "function"
        ) {
            continue;
        }
        let Some(name_node) = child.child_by_field_name("name") else {
            continue;
        };
        let name = node_text(name_node, source).to_string();
        let line_start = node.start_position().row + 1;

        if exported {
            result.exports.push(ExportRecord {
                name: name.clone(),
                kind: "function".to_string(),
            });
        }
        result.symbols.push(SymbolRecord {
            id: symbol_id(language, rel_path, SymbolKind::Function, &name, line_start),
            kind: SymbolKind::Function,
            name,
            line_start,
            line_end: node.end_position().row + 1,
            complexity: Some(cyclomatic(value, &JAVASCRIPT_RULES)),
            parameters: extract_parameters(value, source),
            raw_calls: collect_calls(value, source),
            exported,
            decorators: Vec::new(),
            code: node_text(node, source).to_string(),
        });
    }
}

fn function_symbol(
    language: Language,
    rel_path: &str,
    source: &str,
    node: Node,
    kind: SymbolKind,
    exported: bool,
) -> Option<SymbolRecord> {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())?;
    let line_start = node.start_position().row + 1;

    Some(SymbolRecord {
        id: symbol_id(language, rel_path, kind, &name, line_start),
        kind,
        name,
        line_start,
        line_end: node.end_position().row + 1,
        complexity: Some(cyclomatic(node, &JAVASCRIPT_RULES)),
        parameters: extract_parameters(node, source),
        raw_calls: collect_calls(node, source),
        exported,
        decorators: collect_decorators(node, source),
        code: node_text(node, source).to_string(),
    })
}

fn type_symbol(
    language: Language,
    rel_path: &str,
    source: &str,
    node: Node,
    exported: bool,
) -> Option<SymbolRecord> {
    let name = node
        .child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())?;
    let line_start = node.start_position().row + 1;

    Some(SymbolRecord {
        id: symbol_id(language, rel_path, SymbolKind::Class, &name, line_start),
        kind: SymbolKind::Class,
        name,
        line_start,
        line_end: node.end_position().row + 1,
        complexity: None,
        parameters: Vec::new(),
        raw_calls: Vec::new(),
        exported,
        decorators: collect_decorators(node, source),
        code: node_text(node, source).to_string(),
    })
}

/// TypeScript decorators attach as `decorator` children of the declaration.
fn collect_decorators(node: Node, source: &str) -> Vec<String> {
    let mut decorators = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "decorator" {
            decorators.push(
                node_text(child, source)
                    .trim_start_matches('@')
                    .trim()
                    .to_string(),
            );
        }
    }
    decorators
}

fn extract_parameters(node: Node, source: &str) -> Vec<String> {
    let Some(params) = node.child_by_field_name("parameters") else {
        // Arrow functions with a single bare parameter use `parameter`
        if let Some(param) = node.child_by_field_name("parameter") {
            return vec![node_text(param, source).to_string()];
        }
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
        "member_expression" => func
            .child_by_field_name("property")
            .map(|n| node_text(n, source).to_string()),
        _ => None,
    }
}

fn extract_import(node: Node, source: &str) -> Option<ImportRecord> {
    let module_node = node.child_by_field_name("source")?;
    Some(ImportRecord {
        statement: node_text(node, source).to_string(),
        module: strip_quotes(node_text(module_node, source)),
        line: node.start_position().row + 1,
    })
}

fn strip_quotes(s: &str) -> String {
    s.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> ParseResult {
        parse("src/app.js", source, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_function_declarations() {
        let result = parse_ok(
            r#"
function helper(x) { return x * 2; }
export function api(req, res) { helper(1); }
"#,
        );
        assert_eq!(result.symbols.len(), 2);
        assert!(!result.symbols[0].exported);
        assert!(result.symbols[1].exported);
        assert_eq!(result.symbols[1].raw_calls[0].name, "helper");
        assert_eq!(result.exports.len(), 1);
    }

    #[test]
    fn test_arrow_function_bindings() {
        let result = parse_ok("export const handler = (event) => { return event; };\n");
        assert_eq!(result.symbols.len(), 1);
        assert_eq!(result.symbols[0].name, "handler");
        assert_eq!(result.symbols[0].kind, SymbolKind::Function);
        assert!(result.symbols[0].exported);
    }

    #[test]
    fn test_class_and_methods() {
        let result = parse_ok(
            r#"
export class Store {
  get(key) { return this.read(key); }
  read(key) { return null; }
}
"#,
        );
        let kinds: Vec<SymbolKind> = result.symbols.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![SymbolKind::Class, SymbolKind::Method, SymbolKind::Method]
        );
        let get = &result.symbols[1];
        assert_eq!(get.raw_calls[0].name, "read");
    }

    #[test]
    fn test_imports_and_wildcard_export() {
        let result = parse_ok(
            r#"
import { helper } from './util';
import fs from 'fs';
export * from './models';
"#,
        );
        let modules: Vec<&str> = result.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(modules, vec!["./util", "fs", "./models"]);
        assert!(result.exports.iter().any(|e| e.name == "*"));
    }

    #[test]
    fn test_complexity_counts_ternary_and_logical() {
        let result = parse_ok(
            "function f(a, b) { if (a && b) { return 1; } return a ? 2 : 3; }\n",
        );
        // 1 + if + && + ternary
        assert_eq!(result.symbols[0].complexity, Some(4));
    }

    #[test]
    fn test_syntax_error_reported() {
        let err = parse("src/bad.js", "function ( { ]", Duration::from_secs(5));
        assert_eq!(err.unwrap_err().reason, "syntax error");
    }
}
