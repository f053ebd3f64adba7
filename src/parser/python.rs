//! Python symbol extraction using tree-sitter-python.
//!
//! Extracts functions, classes, methods, imports, `__all__` exports and
//! main-guard entry points. Pure function: input (path, contents) → output
//! `ParseResult`. No filesystem access, no global state.

use std::time::Duration;

use tree_sitter::Node;

use crate::error::ParseFailure;
use crate::parser::complexity::{cyclomatic, node_text, PYTHON_RULES};
use crate::parser::pool::with_parser;
use crate::parser::{
    symbol_id, ExportRecord, ImportRecord, Language, ParseResult, RawCall, SymbolKind,
    SymbolRecord,
};

/// Parse Python source into the uniform result shape.
pub fn parse(
    rel_path: &str,
    source: &str,
    timeout: Duration,
) -> Result<ParseResult, ParseFailure> {
    let tree = with_parser(Language::Python, timeout, |parser| {
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

    // __all__ gates the exported flag for every top-level symbol, so it is
    // collected before symbols are.
    let dunder_all = collect_dunder_all(root, source);

    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        extract_top_level(rel_path, source, child, &dunder_all, &mut result);
    }

    for name in dunder_all.iter().flatten() {
        result.exports.push(ExportRecord {
            name: name.clone(),
            kind: "name".to_string(),
        });
    }

    result
}

fn extract_top_level(
    rel_path: &str,
    source: &str,
    node: Node,
    dunder_all: &Option<Vec<String>>,
    result: &mut ParseResult,
) {
    match node.kind() {
        "function_definition" => {
            if let Some(symbol) =
                function_symbol(rel_path, source, node, &[], SymbolKind::Function, dunder_all)
            {
                if symbol.name == "main" {
                    result.entry_points.push(symbol.name.clone());
                }
                result.symbols.push(symbol);
            }
        }
        "class_definition" => {
            extract_class(rel_path, source, node, &[], dunder_all, result);
        }
        "decorated_definition" => {
            let decorators = collect_decorators(node, source);
            if let Some(inner) = node.child_by_field_name("definition") {
                match inner.kind() {
                    "function_definition" => {
                        if let Some(symbol) = function_symbol(
                            rel_path,
                            source,
                            inner,
                            &decorators,
                            SymbolKind::Function,
                            dunder_all,
                        ) {
                            if symbol.name == "main" {
                                result.entry_points.push(symbol.name.clone());
                            }
                            result.symbols.push(symbol);
                        }
                    }
                    "class_definition" => {
                        extract_class(rel_path, source, inner, &decorators, dunder_all, result);
                    }
                    _ => {}
                }
            }
        }
        "import_statement" | "import_from_statement" => {
            result.imports.extend(extract_import(node, source));
        }
        "if_statement" => {
            if is_main_guard(node, source) {
                collect_guard_entry_points(node, source, &mut result.entry_points);
            }
        }
        _ => {}
    }
}

fn extract_class(
    rel_path: &str,
    source: &str,
    node: Node,
    decorators: &[String],
    dunder_all: &Option<Vec<String>>,
    result: &mut ParseResult,
) {
    let Some(name) = named_child_text(node, "name", source) else {
        return;
    };

    let exported = is_exported(&name, dunder_all);
    result.symbols.push(SymbolRecord {
        id: symbol_id(
            Language::Python,
            rel_path,
            SymbolKind::Class,
            &name,
            node.start_position().row + 1,
        ),
        kind: SymbolKind::Class,
        name: name.clone(),
        line_start: node.start_position().row + 1,
        line_end: node.end_position().row + 1,
        complexity: None,
        parameters: Vec::new(),
        raw_calls: Vec::new(),
        exported,
        decorators: decorators.to_vec(),
        code: node_text(node, source).to_string(),
    });

    // Methods live one level below the class body.
    let Some(body) = node.child_by_field_name("body") else {
        return;
    };
    let mut cursor = body.walk();
    for child in body.children(&mut cursor) {
        match child.kind() {
            "function_definition" => {
                if let Some(mut symbol) = function_symbol(
                    rel_path,
                    source,
                    child,
                    &[],
                    SymbolKind::Method,
                    dunder_all,
                ) {
                    symbol.exported = exported && !symbol.name.starts_with('_');
                    result.symbols.push(symbol);
                }
            }
            "decorated_definition" => {
                let method_decorators = collect_decorators(child, source);
                if let Some(inner) = child.child_by_field_name("definition") {
                    if inner.kind() == "function_definition" {
                        if let Some(mut symbol) = function_symbol(
                            rel_path,
                            source,
                            inner,
                            &method_decorators,
                            SymbolKind::Method,
                            dunder_all,
                        ) {
                            symbol.exported = exported && !symbol.name.starts_with('_');
                            result.symbols.push(symbol);
                        }
                    }
                }
            }
            _ => {}
        }
    }
}

fn function_symbol(
    rel_path: &str,
    source: &str,
    node: Node,
    decorators: &[String],
    kind: SymbolKind,
    dunder_all: &Option<Vec<String>>,
) -> Option<SymbolRecord> {
    let name = named_child_text(node, "name", source)?;
    let line_start = node.start_position().row + 1;

    Some(SymbolRecord {
        id: symbol_id(Language::Python, rel_path, kind, &name, line_start),
        kind,
        name: name.clone(),
        line_start,
        line_end: node.end_position().row + 1,
        complexity: Some(cyclomatic(node, &PYTHON_RULES)),
        parameters: extract_parameters(node, source),
        raw_calls: collect_calls(node, source),
        exported: is_exported(&name, dunder_all),
        decorators: decorators.to_vec(),
        code: node_text(node, source).to_string(),
    })
}

/// Exported: listed in `__all__` when one exists, otherwise any top-level
/// name without a leading underscore.
fn is_exported(name: &str, dunder_all: &Option<Vec<String>>) -> bool {
    match dunder_all {
        Some(names) => names.iter().any(|n| n == name),
        None => !name.starts_with('_'),
    }
}

fn named_child_text(node: Node, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field)
        .map(|n| node_text(n, source).to_string())
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

fn collect_decorators(node: Node, source: &str) -> Vec<String> {
    let mut decorators = Vec::new();
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.kind() == "decorator" {
            let text = node_text(child, source)
                .trim_start_matches('@')
                .trim()
                .to_string();
            decorators.push(text);
        }
    }
    decorators
}

/// Collect raw call names inside a function body.
///
/// Attribute calls keep only the final segment (`obj.save()` → `save`);
/// resolution against the full symbol set happens later. Calls inside
/// nested defs and lambdas are attributed to the enclosing function since
/// nested defs are not extracted as standalone symbols.
fn collect_calls(function_node: Node, source: &str) -> Vec<RawCall> {
    let mut calls = Vec::new();
    let mut stack = vec![function_node];
    while let Some(node) = stack.pop() {
        if node.kind() == "call" {
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
        "attribute" => func
            .child_by_field_name("attribute")
            .map(|n| node_text(n, source).to_string()),
        _ => None,
    }
}

fn extract_import(node: Node, source: &str) -> Vec<ImportRecord> {
    let statement = node_text(node, source).to_string();
    let line = node.start_position().row + 1;

    let module = match node.kind() {
        "import_from_statement" => node
            .child_by_field_name("module_name")
            .map(|n| node_text(n, source).to_string()),
        "import_statement" => {
            // `import a.b` or `import a.b as c`: the first dotted/plain name
            let mut cursor = node.walk();
            let found = node
                .children(&mut cursor)
                .find(|c| matches!(c.kind(), "dotted_name" | "aliased_import"))
                .map(|c| {
                    if c.kind() == "aliased_import" {
                        c.child_by_field_name("name")
                            .map(|n| node_text(n, source).to_string())
                            .unwrap_or_else(|| node_text(c, source).to_string())
                    } else {
                        node_text(c, source).to_string()
                    }
                });
            found
        }
        _ => None,
    };

    match module {
        Some(module) => vec![ImportRecord {
            statement,
            module,
            line,
        }],
        None => Vec::new(),
    }
}

fn collect_dunder_all(root: Node, source: &str) -> Option<Vec<String>> {
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() != "expression_statement" {
            continue;
        }
        let Some(assignment) = child.child(0).filter(|n| n.kind() == "assignment") else {
            continue;
        };
        let Some(left) = assignment.child_by_field_name("left") else {
            continue;
        };
        if node_text(left, source) != "__all__" {
            continue;
        }
        let Some(right) = assignment.child_by_field_name("right") else {
            continue;
        };
        let mut names = Vec::new();
        let mut list_cursor = right.walk();
        for item in right.children(&mut list_cursor) {
            if item.kind() == "string" {
                let text = node_text(item, source)
                    .trim_matches(|c| c == '"' || c == '\'')
                    .to_string();
                if !text.is_empty() {
                    names.push(text);
                }
            }
        }
        return Some(names);
    }
    None
}

fn is_main_guard(node: Node, source: &str) -> bool {
    let Some(condition) = node.child_by_field_name("condition") else {
        return false;
    };
    let text = node_text(condition, source);
    text.contains("__name__") && text.contains("__main__")
}

/// Functions called directly under a main guard are execution roots.
fn collect_guard_entry_points(node: Node, source: &str, entry_points: &mut Vec<String>) {
    let Some(body) = node.child_by_field_name("consequence") else {
        return;
    };
    let mut stack = vec![body];
    while let Some(current) = stack.pop() {
        if current.kind() == "call" {
            if let Some(func) = current.child_by_field_name("function") {
                if let Some(name) = callee_name(func, source) {
                    if !entry_points.contains(&name) {
                        entry_points.push(name);
                    }
                }
            }
        }
        let mut cursor = current.walk();
        for child in current.children(&mut cursor) {
            stack.push(child);
        }
    }
    entry_points.sort();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> ParseResult {
        parse("src/mod.py", source, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_extracts_functions_and_classes() {
        let result = parse_ok(
            r#"
def top(a, b=1):
    return a + b

class Widget:
    def render(self):
        pass

    def _hidden(self):
        pass
"#,
        );

        let names: Vec<&str> = result.symbols.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["top", "Widget", "render", "_hidden"]);

        let top = &result.symbols[0];
        assert_eq!(top.kind, SymbolKind::Function);
        assert_eq!(top.parameters, vec!["a", "b=1"]);
        assert_eq!(top.complexity, Some(1));
        assert!(top.exported);

        let widget = &result.symbols[1];
        assert_eq!(widget.kind, SymbolKind::Class);
        assert_eq!(widget.complexity, None);

        let render = &result.symbols[2];
        assert_eq!(render.kind, SymbolKind::Method);
        assert!(render.exported);

        let hidden = &result.symbols[3];
        assert!(!hidden.exported, "underscore methods are not exported");
    }

    #[test]
    fn test_dunder_all_gates_export() {
        let result = parse_ok(
            r#"
__all__ = ["public_fn"]

def public_fn():
    pass

def also_public_looking():
    pass
"#,
        );
        let public = result.symbols.iter().find(|s| s.name == "public_fn").unwrap();
        let other = result
            .symbols
            .iter()
            .find(|s| s.name == "also_public_looking")
            .unwrap();
        assert!(public.exported);
        assert!(!other.exported, "__all__ excludes unlisted names");
        assert_eq!(result.exports.len(), 1);
        assert_eq!(result.exports[0].name, "public_fn");
    }

    #[test]
    fn test_imports() {
        let result = parse_ok(
            r#"
import os.path
from collections import OrderedDict
from .util import helper
"#,
        );
        let modules: Vec<&str> = result.imports.iter().map(|i| i.module.as_str()).collect();
        assert_eq!(modules, vec!["os.path", "collections", ".util"]);
        assert_eq!(result.imports[0].line, 2);
        assert!(result.imports[2].statement.contains("from .util import helper"));
    }

    #[test]
    fn test_raw_calls_with_lines() {
        let result = parse_ok(
            r#"
def bar():
    foo()
    obj.save()
"#,
        );
        let bar = &result.symbols[0];
        let names: Vec<&str> = bar.raw_calls.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["foo", "save"]);
        assert_eq!(bar.raw_calls[0].line, 3);
    }

    #[test]
    fn test_decorators_captured() {
        let result = parse_ok(
            r#"
@app.route("/users")
def list_users():
    pass
"#,
        );
        let symbol = &result.symbols[0];
        assert_eq!(symbol.decorators, vec![r#"app.route("/users")"#]);
    }

    #[test]
    fn test_main_guard_entry_points() {
        let result = parse_ok(
            r#"
def run():
    pass

if __name__ == "__main__":
    run()
"#,
        );
        assert_eq!(result.entry_points, vec!["run"]);
    }

    #[test]
    fn test_syntax_error_is_parse_failure() {
        let err = parse("src/bad.py", "def broken(:\n  ???", Duration::from_secs(5));
        let failure = err.unwrap_err();
        assert_eq!(failure.path, "src/bad.py");
        assert_eq!(failure.reason, "syntax error");
    }

    #[test]
    fn test_deterministic_symbol_ids() {
        let source = "def f():\n    pass\n";
        let a = parse_ok(source);
        let b = parse_ok(source);
        assert_eq!(a.symbols[0].id, b.symbols[0].id);
    }
}
