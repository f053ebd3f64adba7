//! Analysis passes over the resolved graph and store.
//!
//! Every pass here is a pure read: no writes, no hidden state, safe to
//! re-run at any time. An empty store yields empty results, never an error.

pub mod complexity;
pub mod dead_code;
pub mod hotspots;

pub use complexity::{complexity_ranking, ComplexityEntry};
pub use dead_code::{dead_code_candidates, DeadCodeCandidate};
pub use hotspots::{find_hotspots, Hotspot};
