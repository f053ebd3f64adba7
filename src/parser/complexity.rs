//! Cyclomatic complexity counting over tree-sitter syntax trees.
//!
//! The formula is shared by every grammar-backed extractor: start at 1,
//! +1 per branching construct, +1 per short-circuit boolean operator,
//! +1 per lambda/closure literal. Node kinds differ per grammar, so each
//! extractor supplies its own `ComplexityRules` table.
//!
//! Deterministic: identical input always yields the identical score.

use tree_sitter::Node;

/// Per-grammar node kind tables driving the shared counter.
#[derive(Debug, Clone, Copy)]
pub struct ComplexityRules {
    /// Branching constructs: if/elif/for/while/except/case equivalents
    pub branch_kinds: &'static [&'static str],
    /// Short-circuit boolean operators (named nodes or anonymous tokens)
    pub operator_kinds: &'static [&'static str],
    /// Lambda/closure literals
    pub closure_kinds: &'static [&'static str],
    /// Nested named function definitions: counted as their own symbols,
    /// excluded from the enclosing function's score
    pub nested_function_kinds: &'static [&'static str],
}

/// Compute cyclomatic complexity for a function node.
///
/// Walks the subtree iteratively. Nested named functions are skipped
/// entirely (they are extracted as separate symbols); closure literals add
/// one and their bodies still count toward the enclosing function.
pub fn cyclomatic(function_node: Node, rules: &ComplexityRules) -> u32 {
    let mut score: u32 = 1;
    let mut stack: Vec<Node> = vec![function_node];

    while let Some(node) = stack.pop() {
        let kind = node.kind();

        // The root is the function being scored; any other function
        // definition below it owns its own score.
        if node != function_node && rules.nested_function_kinds.contains(&kind) {
            continue;
        }

        if node != function_node {
            if rules.branch_kinds.contains(&kind)
                || rules.operator_kinds.contains(&kind)
                || rules.closure_kinds.contains(&kind)
            {
                score += 1;
            }
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            stack.push(child);
        }
    }

    score
}

/// Slice the source text covered by a node, guarding against stale ranges.
pub(crate) fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    let start = node.start_byte().min(source.len());
    let end = node.end_byte().min(source.len());
    if start >= end {
        return "";
    }
    // Byte ranges from tree-sitter always fall on character boundaries of
    // the parsed source.
    source.get(start..end).unwrap_or("")
}

/// Rules for the Python grammar.
pub const PYTHON_RULES: ComplexityRules = ComplexityRules {
    branch_kinds: &[
        "if_statement",
        "elif_clause",
        "for_statement",
        "while_statement",
        "except_clause",
        "case_clause",
        "conditional_expression",
    ],
    operator_kinds: &["boolean_operator"],
    closure_kinds: &["lambda"],
    nested_function_kinds: &["function_definition"],
};

/// Rules for the Rust grammar.
pub const RUST_RULES: ComplexityRules = ComplexityRules {
    branch_kinds: &[
        "if_expression",
        "while_expression",
        "for_expression",
        "match_arm",
    ],
    operator_kinds: &["&&", "||"],
    closure_kinds: &["closure_expression"],
    nested_function_kinds: &["function_item"],
};

/// Rules for the JavaScript and TypeScript grammars.
///
/// Both `function` and `function_expression` appear in the list to cover
/// the grammar rename between tree-sitter-javascript releases.
pub const JAVASCRIPT_RULES: ComplexityRules = ComplexityRules {
    branch_kinds: &[
        "if_statement",
        "for_statement",
        "for_in_statement",
        "while_statement",
        "do_statement",
        "catch_clause",
        "switch_case",
        "ternary_expression",
    ],
    operator_kinds: &["&&", "||", "??"],
    closure_kinds: &["arrow_function", "function_expression", "function"],
    nested_function_kinds: &["function_declaration", "method_definition"],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::pool::with_parser;
    use crate::parser::Language;
    use std::time::Duration;

    fn python_complexity(source: &str) -> u32 {
        with_parser(Language::Python, Duration::from_secs(5), |parser| {
            let tree = parser.parse(source.as_bytes(), None).unwrap();
            let root = tree.root_node();
            let mut cursor = root.walk();
            let func = root
                .children(&mut cursor)
                .find(|n| n.kind() == "function_definition")
                .expect("source must contain a function");
            cyclomatic(func, &PYTHON_RULES)
        })
        .unwrap()
    }

    #[test]
    fn test_straight_line_function_is_one() {
        assert_eq!(python_complexity("def f():\n    return 1\n"), 1);
    }

    #[test]
    fn test_two_ifs_one_for_one_and() {
        // 1 base + 2 if + 1 for + 1 and = 5
        let source = r#"
def f(items, flag):
    if flag:
        pass
    if items and flag:
        pass
    for x in items:
        pass
"#;
        assert_eq!(python_complexity(source), 5);
    }

    #[test]
    fn test_lambda_counts_once() {
        let source = "def f(xs):\n    return sorted(xs, key=lambda x: x.name)\n";
        assert_eq!(python_complexity(source), 2);
    }

    #[test]
    fn test_nested_function_excluded() {
        let source = r#"
def outer():
    def inner(x):
        if x:
            return 1
        return 0
    return inner
"#;
        // inner's if does not leak into outer's score
        assert_eq!(python_complexity(source), 1);
    }

    #[test]
    fn test_deterministic_across_parses() {
        let source = "def f(a, b):\n    while a or b:\n        a -= 1\n";
        let first = python_complexity(source);
        for _ in 0..5 {
            assert_eq!(python_complexity(source), first);
        }
        assert_eq!(first, 3); // 1 + while + or
    }

    #[test]
    fn test_rust_match_arms() {
        let score = with_parser(Language::Rust, Duration::from_secs(5), |parser| {
            let source = "fn f(x: u8) -> u8 { match x { 0 => 1, 1 => 2, _ => 3 } }";
            let tree = parser.parse(source.as_bytes(), None).unwrap();
            let root = tree.root_node();
            let mut cursor = root.walk();
            let func = root
                .children(&mut cursor)
                .find(|n| n.kind() == "function_item")
                .unwrap();
            cyclomatic(func, &RUST_RULES)
        })
        .unwrap();
        assert_eq!(score, 4); // 1 + 3 arms
    }
}
