//! Clang `-ftime-trace` Chrome-trace JSON parser (§4.1, §6).
//!
//! Ground truth for the event-name mapping taken from
//! `examples/original_source/sources/bha/parsers/clang_parser.cpp`.

use super::{read_to_string, sniff_prefix, TraceParser};
use crate::error::{Error, Result};
use crate::model::{
    CompilationUnit, CompilerType, IncludeInfo, Location, Metrics, TemplateInstantiation,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub(crate) const TRACE_EVENTS_MARKER: &str = "traceEvents";

#[derive(Debug, Deserialize, Default)]
struct RawEventArgs {
    #[serde(default)]
    detail: String,
    #[serde(default)]
    file: String,
    #[serde(default)]
    line: i64,
}

#[derive(Debug, Deserialize, Default)]
struct RawEvent {
    #[serde(default)]
    name: String,
    #[serde(default)]
    dur: f64,
    #[serde(default)]
    args: RawEventArgs,
}

#[derive(Debug, Deserialize, Default)]
struct RawTrace {
    #[serde(rename = "traceEvents", default)]
    trace_events: Vec<RawEvent>,
}

fn micros_to_duration(us: f64) -> Duration {
    Duration::from_secs_f64((us.max(0.0)) / 1_000_000.0)
}

fn is_source_extension(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    [".c", ".cc", ".cpp", ".cxx", ".c++"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

fn resolve_source_file(events: &[RawEvent], source_hint: &Path) -> PathBuf {
    for event in events {
        if (event.name == "ExecuteCompiler" || event.name == "Total ExecuteCompiler")
            && !event.args.detail.is_empty()
        {
            return PathBuf::from(&event.args.detail);
        }
    }

    for event in events {
        if event.name == "ParseDeclarationOrFunctionDefinition" && !event.args.detail.is_empty() {
            if let Some(colon) = event.args.detail.find(':') {
                let candidate = &event.args.detail[..colon];
                if is_source_extension(candidate) {
                    return PathBuf::from(candidate);
                }
            }
        }
    }

    for event in events {
        if event.name == "Source" && !event.args.detail.is_empty() && is_source_extension(&event.args.detail) {
            return PathBuf::from(&event.args.detail);
        }
    }

    source_hint.to_path_buf()
}

fn process_templates(events: &[RawEvent]) -> Vec<TemplateInstantiation> {
    let mut map: HashMap<String, TemplateInstantiation> = HashMap::new();

    for event in events {
        let is_template_event = event.name == "InstantiateClass"
            || event.name == "InstantiateFunction"
            || event.name.starts_with("Instantiate");
        if !is_template_event {
            continue;
        }

        let entry = map.entry(event.args.detail.clone()).or_insert_with(|| {
            TemplateInstantiation {
                name: event.name.clone(),
                full_signature: event.args.detail.clone(),
                location: if event.args.file.is_empty() {
                    Location::default()
                } else {
                    Location {
                        file: event.args.file.clone(),
                        line: event.args.line.max(0) as usize,
                    }
                },
                time: Duration::ZERO,
                count: 0,
            }
        });

        entry.time += micros_to_duration(event.dur);
        entry.count += 1;
    }

    let mut templates: Vec<_> = map.into_values().collect();
    templates.sort_by(|a, b| b.time.cmp(&a.time).then_with(|| a.name.cmp(&b.name)));
    templates
}

fn process_includes(events: &[RawEvent]) -> Vec<IncludeInfo> {
    let mut map: HashMap<String, IncludeInfo> = HashMap::new();

    for event in events {
        if event.name != "Source" || event.args.detail.is_empty() {
            continue;
        }
        let entry = map.entry(event.args.detail.clone()).or_insert_with(|| IncludeInfo {
            header: event.args.detail.clone(),
            parse_time: Duration::ZERO,
        });
        entry.parse_time += micros_to_duration(event.dur);
    }

    let mut includes: Vec<_> = map.into_values().collect();
    includes.sort_by(|a, b| b.parse_time.cmp(&a.parse_time).then_with(|| a.header.cmp(&b.header)));
    includes
}

fn calculate_metrics(events: &[RawEvent]) -> Metrics {
    let mut metrics = Metrics::default();
    let mut frontend = Duration::ZERO;
    let mut backend = Duration::ZERO;

    for event in events {
        let dur = micros_to_duration(event.dur);
        match event.name.as_str() {
            "Total ExecuteCompiler" | "ExecuteCompiler" => metrics.total_time = dur,
            "Total Frontend" => frontend = dur,
            "Total Backend" => backend = dur,
            "Total Source" => metrics.breakdown.preprocessing += dur,
            "Total ParseClass" | "ParseClass" => metrics.breakdown.parsing += dur,
            "PerformPendingInstantiations" | "Total PerformPendingInstantiations" => {
                metrics.breakdown.template_instantiation += dur;
            }
            name if name.starts_with("Instantiate") || name.starts_with("Total Instantiate") => {
                metrics.breakdown.template_instantiation += dur;
            }
            "CodeGen Function" | "Total CodeGen Function" | "PerFunctionPasses"
            | "Total PerFunctionPasses" => {
                metrics.breakdown.code_generation += dur;
            }
            "OptModule" | "Total OptModule" | "RunLoopPass" | "Total RunLoopPass"
            | "OptFunction" | "Total OptFunction" => {
                metrics.breakdown.optimization += dur;
            }
            _ => {}
        }
    }

    metrics.frontend_time = frontend;
    metrics.backend_time = backend;

    if metrics.total_time == Duration::ZERO && frontend != Duration::ZERO {
        metrics.total_time = frontend + backend;
    }

    metrics
}

/// Shared parse routine for any Chrome-trace-shaped input; `compiler_type`
/// lets callers (Clang vs. Intel oneAPI) tag the resulting unit distinctly
/// while reusing identical event-mapping semantics.
pub(crate) fn parse_chrome_trace(
    content: &str,
    source_hint: &Path,
    compiler_type: CompilerType,
) -> Result<CompilationUnit> {
    let trace: RawTrace = serde_json::from_str(content)
        .map_err(|e| Error::parse_with_detail("invalid chrome-trace JSON", e.to_string()))?;

    let source_file = resolve_source_file(&trace.trace_events, source_hint);
    let mut unit = CompilationUnit::new(source_file);
    unit.compiler_type = Some(compiler_type);
    unit.metrics = calculate_metrics(&trace.trace_events);
    unit.templates = process_templates(&trace.trace_events);
    unit.includes = process_includes(&trace.trace_events);
    unit.finalize();
    Ok(unit)
}

pub struct ClangTraceParser;

impl TraceParser for ClangTraceParser {
    fn name(&self) -> &'static str {
        "Clang"
    }

    fn compiler_type(&self) -> CompilerType {
        CompilerType::Clang
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn can_parse(&self, path: &Path) -> bool {
        match read_to_string(path) {
            Ok(content) => self.can_parse_content(&content),
            Err(_) => false,
        }
    }

    fn can_parse_content(&self, content: &str) -> bool {
        sniff_prefix(content).contains(TRACE_EVENTS_MARKER)
    }

    fn parse_file(&self, path: &Path) -> Result<CompilationUnit> {
        let content = read_to_string(path)?;
        self.parse_content(&content, path)
    }

    fn parse_content(&self, content: &str, source_hint: &Path) -> Result<CompilationUnit> {
        if !self.can_parse_content(content) {
            return Err(Error::parse("not a valid Clang trace"));
        }
        parse_chrome_trace(content, source_hint, CompilerType::Clang)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "traceEvents": [
            {"name": "ExecuteCompiler", "ph": "X", "ts": 0, "dur": 1000, "args": {"detail": "main.cpp"}},
            {"name": "Total Frontend", "ph": "X", "ts": 0, "dur": 700, "args": {}},
            {"name": "Total Backend", "ph": "X", "ts": 0, "dur": 300, "args": {}},
            {"name": "InstantiateClass", "ph": "X", "ts": 0, "dur": 50, "args": {"detail": "Foo<int>", "file": "foo.h", "line": 10}},
            {"name": "InstantiateClass", "ph": "X", "ts": 0, "dur": 25, "args": {"detail": "Foo<int>", "file": "foo.h", "line": 10}},
            {"name": "Source", "ph": "X", "ts": 0, "dur": 200, "args": {"detail": "foo.h"}}
        ]
    }"#;

    #[test]
    fn detects_and_rejects_content() {
        let parser = ClangTraceParser;
        assert!(parser.can_parse_content(SAMPLE));
        assert!(!parser.can_parse_content("not json at all"));
    }

    #[test]
    fn merges_repeated_template_instantiations() {
        let parser = ClangTraceParser;
        let unit = parser
            .parse_content(SAMPLE, Path::new("hint.cpp"))
            .unwrap();
        assert_eq!(unit.templates.len(), 1);
        assert_eq!(unit.templates[0].count, 2);
        assert_eq!(unit.templates[0].time, Duration::from_micros(75));
    }

    #[test]
    fn total_time_falls_back_to_frontend_plus_backend() {
        let parser = ClangTraceParser;
        let json = r#"{"traceEvents": [
            {"name": "Total Frontend", "ph": "X", "ts": 0, "dur": 700000, "args": {}},
            {"name": "Total Backend", "ph": "X", "ts": 0, "dur": 300000, "args": {}}
        ]}"#;
        let unit = parser.parse_content(json, Path::new("hint.cpp")).unwrap();
        assert_eq!(unit.metrics.total_time, unit.metrics.frontend_time + unit.metrics.backend_time);
    }

    #[test]
    fn includes_sorted_by_parse_time_descending() {
        let parser = ClangTraceParser;
        let unit = parser
            .parse_content(SAMPLE, Path::new("hint.cpp"))
            .unwrap();
        let times: Vec<_> = unit.includes.iter().map(|i| i.parse_time).collect();
        let mut sorted = times.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(times, sorted);
    }
}
