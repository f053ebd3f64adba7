//! Standard-library and builtin allow-lists per language.
//!
//! An import whose module matches here is neither an in-project edge nor an
//! unresolved dependency; the resolver skips it silently. The lists cover
//! the commonly imported surface, not the exhaustive library index: a miss
//! just downgrades the import to "unresolved", which is already the
//! expected verdict for third-party modules.

use crate::parser::Language;

/// Top-level Python standard library modules.
const PYTHON_STDLIB: &[&str] = &[
    "abc", "argparse", "asyncio", "base64", "collections", "contextlib", "copy", "csv",
    "dataclasses", "datetime", "decimal", "enum", "functools", "glob", "hashlib", "heapq",
    "http", "importlib", "inspect", "io", "itertools", "json", "logging", "math", "multiprocessing",
    "os", "pathlib", "pickle", "queue", "random", "re", "shutil", "signal", "socket", "sqlite3",
    "string", "struct", "subprocess", "sys", "tempfile", "threading", "time", "traceback",
    "types", "typing", "unittest", "urllib", "uuid", "warnings", "weakref", "xml", "zlib",
];

/// Node.js builtin modules (importable bare or with the `node:` prefix).
const NODE_BUILTINS: &[&str] = &[
    "assert", "buffer", "child_process", "cluster", "console", "crypto", "dns", "events",
    "fs", "http", "https", "module", "net", "os", "path", "perf_hooks", "process",
    "querystring", "readline", "stream", "string_decoder", "timers", "tls", "url", "util",
    "v8", "vm", "worker_threads", "zlib",
];

/// Go standard library packages (first path element has no dot).
const GO_STDLIB: &[&str] = &[
    "bufio", "bytes", "context", "crypto", "database", "encoding", "errors", "flag", "fmt",
    "hash", "html", "io", "log", "math", "net", "os", "path", "reflect", "regexp", "runtime",
    "sort", "strconv", "strings", "sync", "testing", "time", "unicode",
];

/// Ruby standard library requires.
const RUBY_STDLIB: &[&str] = &[
    "base64", "bigdecimal", "csv", "date", "digest", "erb", "fileutils", "forwardable",
    "json", "logger", "net/http", "open-uri", "openssl", "optparse", "pathname", "set",
    "socket", "stringio", "tempfile", "time", "timeout", "uri", "yaml",
];

/// True when the import names a standard-library or builtin module.
///
/// Matches on the leading segment of the module path, so `os.path`,
/// `node:fs/promises` and `std::collections::HashMap` all qualify.
pub fn is_stdlib(language: Language, module: &str) -> bool {
    match language {
        Language::Python => {
            let head = module.split('.').next().unwrap_or(module);
            PYTHON_STDLIB.binary_search(&head).is_ok()
        }
        Language::JavaScript | Language::TypeScript => {
            let bare = module.strip_prefix("node:").unwrap_or(module);
            let head = bare.split('/').next().unwrap_or(bare);
            NODE_BUILTINS.binary_search(&head).is_ok()
        }
        Language::Rust => {
            let head = module.split("::").next().unwrap_or(module);
            matches!(head, "std" | "core" | "alloc")
        }
        Language::Go => {
            let head = module.split('/').next().unwrap_or(module);
            // Go convention: stdlib import paths have no domain dot
            !head.contains('.') && GO_STDLIB.binary_search(&head).is_ok()
        }
        Language::Ruby => {
            let head = module.split('/').next().unwrap_or(module);
            RUBY_STDLIB.binary_search(&module).is_ok() || RUBY_STDLIB.binary_search(&head).is_ok()
        }
    }
}
