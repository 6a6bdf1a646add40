//! Dependency graph core (§4.2): a canonical, metadata-carrying graph and a
//! compact integer-indexed projection suited to hot traversal.

pub mod canonical;
pub mod compressed;

pub use canonical::DependencyGraph;
pub use compressed::{estimate_memory_savings, CompressedGraph, NO_ID};
