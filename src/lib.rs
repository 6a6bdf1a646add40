//! `bha` — a build-time hotspot analyzer core: parses compiler trace files
//! into a shared data model, aggregates them into cross-unit metrics, and
//! turns those metrics into scored, prioritized refactoring suggestions.
//!
//! This crate is a library: it has no CLI, no exporters, and no build-system
//! drivers. Host applications assemble `parsers`, `aggregate`, `suggest`,
//! `concurrency`, and `anonymize` into whatever surface they need.

pub mod aggregate;
pub mod anonymize;
pub mod concurrency;
pub mod config;
pub mod error;
pub mod graph;
pub mod model;
pub mod observability;
pub mod parsers;
pub mod suggest;

pub use aggregate::{aggregate, AnalysisResult};
pub use anonymize::{AnonymizationConfig, Anonymizer, BuildTrace};
pub use concurrency::{global_pool, ThreadPool};
pub use config::Config;
pub use error::{Error, Result};
pub use graph::{CompressedGraph, DependencyGraph, NO_ID};
pub use model::{CompilationUnit, CompilerType};
pub use parsers::{default_registry, parse_trace_files, ParserRegistry, TraceParser};
pub use suggest::{register_all_suggesters, Suggester, SuggesterRegistry, Suggestion, SuggestionType};
