//! Cross-unit aggregation (§4.3): rolls up parsed `CompilationUnit`s into
//! the `AnalysisResult` every suggester consumes.
//!
//! Rollups use `rayon` fold/reduce over the per-unit slice, mirroring the
//! teacher's `priority`/`risk` aggregation code, which is a separate,
//! internal parallelism path from the explicit thread-pool primitive in
//! `concurrency` (§5 public submit/future contract vs. §4.3 internal math).

use crate::graph::DependencyGraph;
use crate::model::{CompilationUnit, DependencyEdge, DependencyKind};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;

/// Per-compilation-unit rollup (§3 `AnalysisResult.files`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStat {
    pub file: PathBuf,
    pub compile_time: Duration,
    pub frontend_time: Duration,
    pub backend_time: Duration,
    pub include_count: usize,
    pub template_count: usize,
    /// No parser populates this (line counting is an out-of-scope file
    /// utility, §1); callers that have it may patch it in before passing
    /// files to suggesters that need it, e.g. unity-build.
    pub lines_of_code: usize,
}

/// One template's build-wide rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateAggregate {
    pub name: String,
    pub full_signature: String,
    pub total_time: Duration,
    pub instantiation_count: u32,
    pub files_using: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateAggregation {
    pub templates: Vec<TemplateAggregate>,
}

/// One header's build-wide rollup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderAggregate {
    pub path: String,
    pub total_parse_time: Duration,
    pub inclusion_count: usize,
    pub including_files: usize,
    pub included_by: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyAggregation {
    pub headers: Vec<HeaderAggregate>,
}

/// How a symbol's linkage was inferred (§4.5.7, §9 Design Notes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolLinkage {
    Static,
    AnonymousNamespace,
    External,
}

/// Name-shape heuristic for internal-linkage symbols. Acknowledged as a
/// heuristic (§9): a richer symbol extractor may replace it so long as the
/// conflict sets it feeds the unity-build suggester only refine, never
/// expand, what this produces.
pub fn infer_linkage(name: &str) -> SymbolLinkage {
    if name.contains("(anonymous namespace)") || name.contains("_GLOBAL__N") {
        SymbolLinkage::AnonymousNamespace
    } else if name.starts_with('_') || name.starts_with("_L") || name.starts_with("_Z") {
        SymbolLinkage::Static
    } else {
        SymbolLinkage::External
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub defined_in: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolAggregation {
    pub symbols: Vec<SymbolInfo>,
}

/// Scalar rollups over the whole analyzed set (§3, §6).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_files_compiled: usize,
    pub average_file_time: Duration,
    pub median_file_time: Duration,
    pub p95_file_time: Duration,
    pub p99_file_time: Duration,
    pub total_dependencies: usize,
    pub avg_include_depth: f64,
    pub max_include_depth: usize,
    pub circular_dependency_count: usize,
    pub top_slow_files: Vec<PathBuf>,
}

/// The full aggregated view every suggester is handed (§3).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub files: Vec<FileStat>,
    pub templates: TemplateAggregation,
    pub dependencies: DependencyAggregation,
    pub symbols: SymbolAggregation,
    pub metrics: MetricsSummary,
}

const TOP_SLOW_FILES_LIMIT: usize = 10;

fn merge_template_maps(
    mut a: HashMap<String, TemplateAggregate>,
    b: HashMap<String, TemplateAggregate>,
) -> HashMap<String, TemplateAggregate> {
    for (key, value) in b {
        a.entry(key)
            .and_modify(|existing| {
                existing.total_time += value.total_time;
                existing.instantiation_count += value.instantiation_count;
                for file in &value.files_using {
                    if !existing.files_using.contains(file) {
                        existing.files_using.push(file.clone());
                    }
                }
            })
            .or_insert(value);
    }
    a
}

fn merge_header_maps(
    mut a: HashMap<String, HeaderAggregate>,
    b: HashMap<String, HeaderAggregate>,
) -> HashMap<String, HeaderAggregate> {
    for (key, value) in b {
        a.entry(key)
            .and_modify(|existing| {
                existing.total_parse_time += value.total_parse_time;
                existing.inclusion_count += value.inclusion_count;
                for file in &value.included_by {
                    if !existing.included_by.contains(file) {
                        existing.included_by.push(file.clone());
                    }
                }
                existing.including_files = existing.included_by.len();
            })
            .or_insert(value);
    }
    a
}

/// Nearest-rank percentile over a slice already sorted ascending. Ties
/// break toward the higher rank (§4.3).
fn percentile(sorted_ascending: &[Duration], p: f64) -> Duration {
    if sorted_ascending.is_empty() {
        return Duration::ZERO;
    }
    let n = sorted_ascending.len();
    let rank = ((p / 100.0) * n as f64).ceil() as usize;
    let index = rank.clamp(1, n) - 1;
    sorted_ascending[index]
}

fn median(sorted_ascending: &[Duration]) -> Duration {
    if sorted_ascending.is_empty() {
        return Duration::ZERO;
    }
    let n = sorted_ascending.len();
    if n % 2 == 1 {
        sorted_ascending[n / 2]
    } else {
        (sorted_ascending[n / 2 - 1] + sorted_ascending[n / 2]) / 2
    }
}

/// Builds the canonical `#include` graph from parsed units: one edge per
/// `(source_file, header)` pair, weighted by the header's parse time.
fn build_dependency_graph(units: &[CompilationUnit]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for unit in units {
        let source = unit.source_file.to_string_lossy().into_owned();
        graph.add_node(source.clone());
        for include in &unit.includes {
            graph.add_edge(
                source.clone(),
                DependencyEdge {
                    target: include.header.clone(),
                    kind: DependencyKind::DirectInclude,
                    weight: include.parse_time.as_secs_f64(),
                    line_number: 0,
                    is_system_header: false,
                },
            );
        }
    }
    graph
}

/// Longest acyclic include chain reachable from each node, via bounded-depth
/// DFS (a `visited` set per traversal keeps cyclic graphs from looping).
fn include_depths(graph: &DependencyGraph) -> HashMap<&str, usize> {
    let mut depths = HashMap::new();
    for node in graph.nodes() {
        let mut visited = HashSet::new();
        depths.insert(node.as_str(), longest_chain(graph, node, &mut visited));
    }
    depths
}

fn longest_chain<'a>(graph: &'a DependencyGraph, node: &'a str, visited: &mut HashSet<&'a str>) -> usize {
    if !visited.insert(node) {
        return 0;
    }
    let max_child = graph
        .edges_from(node)
        .iter()
        .map(|edge| longest_chain(graph, edge.target.as_str(), visited))
        .max()
        .unwrap_or(0);
    visited.remove(node);
    max_child + 1
}

/// Counts back-edges found during a DFS over the include graph — each one
/// witnesses a cycle. This undercounts graphs with multiple disjoint paths
/// back to the same ancestor; it is a cheap approximation, not exact SCC
/// enumeration.
fn count_circular_dependencies(graph: &DependencyGraph) -> usize {
    #[derive(PartialEq, Clone, Copy)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut colors: HashMap<&str, Color> = graph.nodes().iter().map(|n| (n.as_str(), Color::White)).collect();
    let mut count = 0usize;

    fn visit<'a>(
        graph: &'a DependencyGraph,
        node: &'a str,
        colors: &mut HashMap<&'a str, Color>,
        count: &mut usize,
    ) {
        colors.insert(node, Color::Gray);
        for edge in graph.edges_from(node) {
            match colors.get(edge.target.as_str()).copied() {
                Some(Color::Gray) => *count += 1,
                Some(Color::White) | None => visit(graph, edge.target.as_str(), colors, count),
                Some(Color::Black) => {}
            }
        }
        colors.insert(node, Color::Black);
    }

    for node in graph.nodes() {
        if colors.get(node.as_str()).copied() == Some(Color::White) {
            visit(graph, node, &mut colors, &mut count);
        }
    }

    count
}

/// Aggregates parsed units into the shared `AnalysisResult`. Header/template
/// rollups use a `rayon` fold-then-reduce over the unit slice; dependency
/// graph metrics are computed once over the assembled canonical graph.
pub fn aggregate(units: &[CompilationUnit]) -> AnalysisResult {
    let files: Vec<FileStat> = units
        .par_iter()
        .map(|unit| FileStat {
            file: unit.source_file.clone(),
            compile_time: unit.metrics.total_time,
            frontend_time: unit.metrics.frontend_time,
            backend_time: unit.metrics.backend_time,
            include_count: unit.metrics.direct_includes,
            template_count: unit.templates.len(),
            lines_of_code: 0,
        })
        .collect();

    let template_map = units
        .par_iter()
        .fold(HashMap::new, |mut acc: HashMap<String, TemplateAggregate>, unit| {
            for template in &unit.templates {
                acc.entry(template.full_signature.clone())
                    .and_modify(|existing| {
                        existing.total_time += template.time;
                        existing.instantiation_count += template.count;
                        if !existing.files_using.contains(&unit.source_file) {
                            existing.files_using.push(unit.source_file.clone());
                        }
                    })
                    .or_insert_with(|| TemplateAggregate {
                        name: template.name.clone(),
                        full_signature: template.full_signature.clone(),
                        total_time: template.time,
                        instantiation_count: template.count,
                        files_using: vec![unit.source_file.clone()],
                    });
            }
            acc
        })
        .reduce(HashMap::new, merge_template_maps);

    let mut templates: Vec<TemplateAggregate> = template_map.into_values().collect();
    templates.sort_by(|a, b| b.total_time.cmp(&a.total_time).then_with(|| a.full_signature.cmp(&b.full_signature)));

    let header_map = units
        .par_iter()
        .fold(HashMap::new, |mut acc: HashMap<String, HeaderAggregate>, unit| {
            for include in &unit.includes {
                acc.entry(include.header.clone())
                    .and_modify(|existing| {
                        existing.total_parse_time += include.parse_time;
                        existing.inclusion_count += 1;
                        if !existing.included_by.contains(&unit.source_file) {
                            existing.included_by.push(unit.source_file.clone());
                        }
                        existing.including_files = existing.included_by.len();
                    })
                    .or_insert_with(|| HeaderAggregate {
                        path: include.header.clone(),
                        total_parse_time: include.parse_time,
                        inclusion_count: 1,
                        including_files: 1,
                        included_by: vec![unit.source_file.clone()],
                    });
            }
            acc
        })
        .reduce(HashMap::new, merge_header_maps);

    let mut headers: Vec<HeaderAggregate> = header_map.into_values().collect();
    headers.sort_by(|a, b| b.total_parse_time.cmp(&a.total_parse_time).then_with(|| a.path.cmp(&b.path)));

    let symbols = SymbolAggregation::default();

    let graph = build_dependency_graph(units);
    let depths = include_depths(&graph);
    let max_include_depth = depths.values().copied().max().unwrap_or(0);
    let avg_include_depth = if depths.is_empty() {
        0.0
    } else {
        depths.values().sum::<usize>() as f64 / depths.len() as f64
    };
    let circular_dependency_count = count_circular_dependencies(&graph);

    let mut sorted_times: Vec<Duration> = files.iter().map(|f| f.compile_time).collect();
    sorted_times.sort();

    let average_file_time = if files.is_empty() {
        Duration::ZERO
    } else {
        sorted_times.iter().sum::<Duration>() / files.len() as u32
    };

    let mut top_slow_files: Vec<FileStat> = files.clone();
    top_slow_files.sort_by(|a, b| b.compile_time.cmp(&a.compile_time));
    let top_slow_files = top_slow_files
        .into_iter()
        .take(TOP_SLOW_FILES_LIMIT)
        .map(|f| f.file)
        .collect();

    let metrics = MetricsSummary {
        total_files_compiled: files.len(),
        average_file_time,
        median_file_time: median(&sorted_times),
        p95_file_time: percentile(&sorted_times, 95.0),
        p99_file_time: percentile(&sorted_times, 99.0),
        total_dependencies: graph.edge_count(),
        avg_include_depth,
        max_include_depth,
        circular_dependency_count,
        top_slow_files,
    };

    AnalysisResult {
        files,
        templates: TemplateAggregation { templates },
        dependencies: DependencyAggregation { headers },
        symbols,
        metrics,
    }
}
