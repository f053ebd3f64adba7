//! Import resolution and dependency graph construction.
//!
//! Runs after the parse stage settles, against the globally consistent
//! symbol set. Resolution maps each import statement to a concrete
//! in-project file when possible; everything else is either a recognized
//! standard-library module (skipped) or unresolved (expected for third
//! party dependencies, never an error).
//!
//! Resolution priority per import: exact relative-path match, then
//! package-root match, then a suffix match over the project tree, then the
//! stdlib allow-list, else unresolved. When a suffix match hits several
//! files the tie-break is deterministic: longest shared path prefix with
//! the importing file, then lexicographic order, and the ambiguity is
//! recorded in the summary.

pub mod graph;
pub mod stdlib;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::parser::Language;
use crate::store::{ImportRow, Store};

/// How one import was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    /// Matched an in-project file via a relative path
    Relative,
    /// Matched an in-project file from the package root or by suffix
    Project,
    /// Recognized standard-library or builtin module
    Stdlib,
    /// No in-project or stdlib match (third-party or unknown)
    Unresolved,
}

/// An import that matched more than one project file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbiguousImport {
    pub file: String,
    pub module: String,
    /// The candidate chosen by the tie-break
    pub chosen: String,
    /// Every candidate that matched, sorted
    pub candidates: Vec<String>,
}

/// Aggregate outcome of one resolution pass.
#[derive(Debug, Default)]
pub struct ResolutionSummary {
    pub resolved: usize,
    pub stdlib: usize,
    pub unresolved: usize,
    pub ambiguous: Vec<AmbiguousImport>,
    pub file_edges: usize,
    pub call_edges: usize,
}

/// Resolve every stored import and rebuild both dependency graphs.
///
/// # Guarantees
/// - Deterministic: identical store contents produce identical edges
/// - Unresolvable imports are recorded as such, never fabricated into edges
pub fn resolve_project(store: &mut Store) -> Result<ResolutionSummary> {
    let files = store.all_files().context("failed to load files")?;
    let imports = store.all_imports().context("failed to load imports")?;

    let mut languages = ahash::AHashMap::new();
    let mut file_set = ahash::AHashSet::new();
    for file in &files {
        languages.insert(file.path.clone(), file.language);
        file_set.insert(file.path.clone());
    }
    let mut sorted_paths: Vec<&str> = file_set.iter().map(String::as_str).collect();
    sorted_paths.sort_unstable();

    let mut summary = ResolutionSummary::default();
    let mut verdicts = Vec::with_capacity(imports.len());
    let mut resolved_imports: Vec<(ImportRow, String)> = Vec::new();

    for import in imports {
        let Some(&language) = languages.get(&import.file) else {
            verdicts.push((import.id, None));
            continue;
        };
        let (kind, target) =
            resolve_one(language, &import, &file_set, &sorted_paths, &mut summary);
        match kind {
            ResolutionKind::Relative | ResolutionKind::Project => summary.resolved += 1,
            ResolutionKind::Stdlib => summary.stdlib += 1,
            ResolutionKind::Unresolved => summary.unresolved += 1,
        }
        if let Some(target) = target.clone() {
            if target != import.file {
                resolved_imports.push((import.clone(), target));
            }
        }
        verdicts.push((import.id, target));
    }

    store
        .set_resolved_targets(&verdicts)
        .context("failed to record resolution verdicts")?;

    let (file_edges, call_edges) = graph::build_edges(store, &resolved_imports)?;
    summary.file_edges = file_edges.len();
    summary.call_edges = call_edges.len();
    store
        .replace_graph(&file_edges, &call_edges)
        .context("failed to persist dependency graph")?;

    info!(
        resolved = summary.resolved,
        stdlib = summary.stdlib,
        unresolved = summary.unresolved,
        ambiguous = summary.ambiguous.len(),
        "resolution pass complete"
    );
    Ok(summary)
}

fn resolve_one(
    language: Language,
    import: &ImportRow,
    file_set: &ahash::AHashSet<String>,
    sorted_paths: &[&str],
    summary: &mut ResolutionSummary,
) -> (ResolutionKind, Option<String>) {
    let module = import.module.as_str();
    let importer_dir = parent_dir(&import.file);

    // (a) exact relative-path match
    for candidate in relative_candidates(language, importer_dir, module) {
        if file_set.contains(&candidate) {
            return (ResolutionKind::Relative, Some(candidate));
        }
    }

    // (b) package-root match
    for candidate in root_candidates(language, importer_dir, module) {
        if file_set.contains(&candidate) {
            return (ResolutionKind::Project, Some(candidate));
        }
    }

    // Suffix match over the whole tree; this is where ambiguity can arise
    if let Some(needles) = suffix_needles(language, module) {
        let mut matches: Vec<String> = sorted_paths
            .iter()
            .filter(|path| needles.iter().any(|n| path_ends_with(path, n)))
            .map(|path| path.to_string())
            .collect();
        matches.retain(|m| m != &import.file);
        match matches.len() {
            0 => {}
            1 => return (ResolutionKind::Project, Some(matches.remove(0))),
            _ => {
                let chosen = break_tie(&import.file, &matches);
                debug!(
                    file = %import.file,
                    module = %module,
                    chosen = %chosen,
                    candidates = matches.len(),
                    "ambiguous import"
                );
                summary.ambiguous.push(AmbiguousImport {
                    file: import.file.clone(),
                    module: module.to_string(),
                    chosen: chosen.clone(),
                    candidates: matches,
                });
                return (ResolutionKind::Project, Some(chosen));
            }
        }
    }

    // (c) stdlib allow-list
    if stdlib::is_stdlib(language, module) {
        return (ResolutionKind::Stdlib, None);
    }

    (ResolutionKind::Unresolved, None)
}

/// Longest shared path prefix with the importer, then lexicographic.
fn break_tie(importer: &str, candidates: &[String]) -> String {
    let importer_segments: Vec<&str> = importer.split('/').collect();
    let mut best: Option<(&String, usize)> = None;
    for candidate in candidates {
        let shared = candidate
            .split('/')
            .zip(&importer_segments)
            .take_while(|(a, b)| a == *b)
            .count();
        let better = match best {
            None => true,
            Some((current, current_shared)) => {
                shared > current_shared || (shared == current_shared && candidate < current)
            }
        };
        if better {
            best = Some((candidate, shared));
        }
    }
    best.map(|(c, _)| c.clone()).unwrap_or_default()
}

fn parent_dir(path: &str) -> &str {
    path.rfind('/').map_or("", |idx| &path[..idx])
}

/// Collapse `.` and `..` segments; returns None when the path escapes root.
fn normalize(path: &str) -> Option<String> {
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                stack.pop()?;
            }
            other => stack.push(other),
        }
    }
    Some(stack.join("/"))
}

fn join(dir: &str, rest: &str) -> String {
    if dir.is_empty() {
        rest.to_string()
    } else {
        format!("{dir}/{rest}")
    }
}

fn with_extensions(base: &str, language: Language) -> Vec<String> {
    let mut candidates = Vec::new();
    match language {
        Language::Python => {
            candidates.push(format!("{base}.py"));
            candidates.push(format!("{base}/__init__.py"));
        }
        Language::Rust => {
            candidates.push(format!("{base}.rs"));
            candidates.push(format!("{base}/mod.rs"));
        }
        Language::JavaScript | Language::TypeScript => {
            for ext in ["ts", "tsx", "js", "mjs", "cjs", "jsx"] {
                candidates.push(format!("{base}.{ext}"));
            }
            for ext in ["ts", "js"] {
                candidates.push(format!("{base}/index.{ext}"));
            }
        }
        Language::Go => candidates.push(format!("{base}.go")),
        Language::Ruby => candidates.push(format!("{base}.rb")),
    }
    candidates
}

fn relative_candidates(language: Language, importer_dir: &str, module: &str) -> Vec<String> {
    let base = match language {
        Language::Python => {
            if !module.starts_with('.') {
                return Vec::new();
            }
            let dots = module.chars().take_while(|c| *c == '.').count();
            let rest = &module[dots..];
            let mut dir = importer_dir.to_string();
            for _ in 1..dots {
                dir = parent_dir(&dir).to_string();
            }
            if rest.is_empty() {
                dir
            } else {
                join(&dir, &rest.replace('.', "/"))
            }
        }
        _ => {
            if !(module.starts_with("./") || module.starts_with("../")) {
                return Vec::new();
            }
            match normalize(&join(importer_dir, module)) {
                Some(base) => base,
                None => return Vec::new(),
            }
        }
    };
    if base.is_empty() {
        return Vec::new();
    }
    with_extensions(&base, language)
}

fn root_candidates(language: Language, importer_dir: &str, module: &str) -> Vec<String> {
    match language {
        Language::Python => {
            if module.starts_with('.') {
                return Vec::new();
            }
            with_extensions(&module.replace('.', "/"), language)
        }
        Language::Rust => {
            let segments: Vec<&str> = module.split("::").collect();
            match segments.split_first() {
                Some((&"crate", rest)) if !rest.is_empty() => {
                    // Deeper paths name items, not files; try each prefix
                    let mut candidates = Vec::new();
                    for end in (1..=rest.len()).rev() {
                        candidates.extend(with_extensions(
                            &format!("src/{}", rest[..end].join("/")),
                            language,
                        ));
                    }
                    candidates
                }
                Some((&"self", rest)) | Some((&"super", rest)) if !rest.is_empty() => {
                    let dir = if segments[0] == "super" {
                        parent_dir(importer_dir)
                    } else {
                        importer_dir
                    };
                    with_extensions(&join(dir, &rest.join("/")), language)
                }
                _ => Vec::new(),
            }
        }
        Language::JavaScript | Language::TypeScript => {
            if module.starts_with('.') {
                return Vec::new();
            }
            with_extensions(module, language)
        }
        Language::Go | Language::Ruby => {
            if module.starts_with('.') {
                Vec::new()
            } else {
                with_extensions(module, language)
            }
        }
    }
}

/// Path suffixes to match against the whole tree, or None for modules that
/// can only be relative.
fn suffix_needles(language: Language, module: &str) -> Option<Vec<String>> {
    if module.starts_with('.') {
        return None;
    }
    let base = match language {
        Language::Python => module.replace('.', "/"),
        Language::Rust => {
            let segments: Vec<&str> = module
                .split("::")
                .filter(|s| !matches!(*s, "crate" | "self" | "super"))
                .collect();
            if segments.is_empty() {
                return None;
            }
            segments.join("/")
        }
        _ => module.to_string(),
    };
    Some(with_extensions(&base, language))
}

fn path_ends_with(path: &str, needle: &str) -> bool {
    path == needle
        || path
            .strip_suffix(needle)
            .is_some_and(|prefix| prefix.ends_with('/'))
}
