//! Core data model shared by parsers, aggregation, and suggesters (§3).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Which compiler family produced a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompilerType {
    Clang,
    Gcc,
    Msvc,
    IntelClassic,
    IntelOneApi,
    Nvcc,
}

impl std::fmt::Display for CompilerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CompilerType::Clang => "Clang",
            CompilerType::Gcc => "GCC",
            CompilerType::Msvc => "MSVC",
            CompilerType::IntelClassic => "Intel Classic",
            CompilerType::IntelOneApi => "Intel oneAPI",
            CompilerType::Nvcc => "NVCC",
        };
        write!(f, "{s}")
    }
}

/// Named timing buckets a parser can attribute time to. Any subset may be
/// zero; the sum need not equal `total_time` (parsers report what they
/// actually observe).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeBreakdown {
    pub preprocessing: Duration,
    pub parsing: Duration,
    pub semantic_analysis: Duration,
    pub template_instantiation: Duration,
    pub code_generation: Duration,
    pub optimization: Duration,
}

impl TimeBreakdown {
    pub fn sum(&self) -> Duration {
        self.preprocessing
            + self.parsing
            + self.semantic_analysis
            + self.template_instantiation
            + self.code_generation
            + self.optimization
    }
}

/// Source location for a template instantiation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
}

/// A single template instantiation, merged across occurrences within one
/// compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateInstantiation {
    pub name: String,
    pub full_signature: String,
    pub location: Location,
    pub time: Duration,
    pub count: u32,
}

/// Time spent parsing one included header, merged across occurrences
/// within one compilation unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IncludeInfo {
    pub header: String,
    pub parse_time: Duration,
}

/// Per-unit timing rollup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_time: Duration,
    pub frontend_time: Duration,
    pub backend_time: Duration,
    pub breakdown: TimeBreakdown,
    pub direct_includes: usize,
}

/// A single translation unit's parsed timing trace, produced by exactly one
/// `TraceParser` invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    pub source_file: PathBuf,
    pub compiler_type: Option<CompilerType>,
    pub metrics: Metrics,
    /// Sorted by `time` descending (§3 invariant).
    pub templates: Vec<TemplateInstantiation>,
    /// Sorted by `parse_time` descending (§3 invariant).
    pub includes: Vec<IncludeInfo>,
}

impl CompilationUnit {
    pub fn new(source_file: PathBuf) -> Self {
        Self {
            source_file,
            ..Default::default()
        }
    }

    /// Finalizes derived fields and re-establishes the sort invariants.
    /// Parsers should call this once after populating `templates`/`includes`
    /// rather than sorting inline at every merge point.
    pub fn finalize(&mut self) {
        self.templates
            .sort_by(|a, b| b.time.cmp(&a.time).then_with(|| a.name.cmp(&b.name)));
        self.includes.sort_by(|a, b| {
            b.parse_time
                .cmp(&a.parse_time)
                .then_with(|| a.header.cmp(&b.header))
        });
        self.metrics.direct_includes = self.includes.len();
    }
}

/// Kind of dependency edge in the canonical graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKind {
    DirectInclude,
    TransitiveInclude,
    Forward,
}

/// One outgoing edge in the canonical `DependencyGraph`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub target: String,
    pub kind: DependencyKind,
    pub weight: f64,
    pub line_number: u32,
    pub is_system_header: bool,
}
