//! Thread-local parser pool for reusing tree-sitter Parser instances.
//!
//! Each worker thread keeps one parser per grammar, created lazily on first
//! use. RefCell gives single-threaded mutable access with no locks, so
//! parallel workers never contend on parser state.

use std::cell::RefCell;
use std::time::Duration;

use anyhow::Result;

use crate::parser::Language;

thread_local! {
    static PYTHON_PARSER: RefCell<Option<tree_sitter::Parser>> = const { RefCell::new(None) };
    static RUST_PARSER: RefCell<Option<tree_sitter::Parser>> = const { RefCell::new(None) };
    static JAVASCRIPT_PARSER: RefCell<Option<tree_sitter::Parser>> = const { RefCell::new(None) };
    static TYPESCRIPT_PARSER: RefCell<Option<tree_sitter::Parser>> = const { RefCell::new(None) };
}

fn grammar(language: Language) -> tree_sitter::Language {
    match language {
        Language::Python => tree_sitter_python::language(),
        Language::Rust => tree_sitter_rust::language(),
        Language::JavaScript => tree_sitter_javascript::language(),
        Language::TypeScript => tree_sitter_typescript::language_typescript(),
        Language::Go | Language::Ruby => {
            unreachable!("pattern-extracted languages have no tree-sitter grammar")
        }
    }
}

fn cell_for(language: Language) -> &'static std::thread::LocalKey<RefCell<Option<tree_sitter::Parser>>> {
    match language {
        Language::Python => &PYTHON_PARSER,
        Language::Rust => &RUST_PARSER,
        Language::JavaScript => &JAVASCRIPT_PARSER,
        Language::TypeScript => &TYPESCRIPT_PARSER,
        Language::Go | Language::Ruby => {
            unreachable!("pattern-extracted languages have no tree-sitter grammar")
        }
    }
}

/// Execute a closure with this thread's parser for the given language.
///
/// The parser is created on first use and reused for every subsequent file
/// the thread processes. The per-file timeout is (re)applied on each call
/// before the closure runs.
///
/// # Guarantees
/// - No lock contention: each thread owns its parsers
/// - Timeout applies to the next `parse` call inside the closure
pub fn with_parser<F, R>(language: Language, timeout: Duration, f: F) -> Result<R>
where
    F: FnOnce(&mut tree_sitter::Parser) -> R,
{
    cell_for(language).with(|parser_cell| {
        let mut parser_ref = parser_cell.borrow_mut();
        if parser_ref.is_none() {
            let mut parser = tree_sitter::Parser::new();
            parser.set_language(&grammar(language))?;
            *parser_ref = Some(parser);
        }
        let parser = parser_ref
            .as_mut()
            .expect("parser initialized above when None");
        parser.set_timeout_micros(timeout.as_micros().min(u128::from(u64::MAX)) as u64);
        Ok(f(parser))
    })
}
