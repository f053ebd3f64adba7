//! Cartograph: a structured, queryable knowledge base over a source tree.
//!
//! Cartograph scans a project, extracts symbols and imports per language,
//! persists them to a relational store, resolves imports into file and call
//! graphs, and derives analyses (dead-code candidates, complexity ranking,
//! hotspots) plus a keyword table of contents. Downstream tools query the
//! store, analyses and TOC; they never touch the pipeline internals.
//!
//! # Position conventions
//!
//! All line numbers are 1-indexed; line ranges are inclusive.
//!
//! # Typical use
//!
//! ```no_run
//! use std::path::Path;
//! use cartograph::{config::IndexConfig, pipeline};
//!
//! # fn main() -> anyhow::Result<()> {
//! let root = Path::new("/path/to/project");
//! let config = IndexConfig::load(root)?;
//! let report = pipeline::run_index(root, &config)?;
//! println!("{} files indexed, {} failed", report.succeeded, report.failed.len());
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod error;
pub mod indexer;
pub mod parser;
pub mod pipeline;
pub mod resolver;
pub mod scanner;
pub mod store;
pub mod toc;

pub use analysis::{complexity_ranking, dead_code_candidates, find_hotspots};
pub use config::{DeadCodeConfig, IndexConfig};
pub use error::{ConfigError, ParseFailure};
pub use pipeline::{run_index, RunOutcome, RunReport};
pub use resolver::graph::{coupling_scores, detect_cycles};
pub use store::Store;
pub use toc::Toc;
