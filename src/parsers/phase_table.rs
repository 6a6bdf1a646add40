//! GCC `-ftime-report` phase-timing text parser (§4.1).
//!
//! Phase-name-to-breakdown mapping grounded on
//! `examples/original_source/sources/bha/parsers/gcc_parser.cpp`, which in
//! turn cites GCC's own `gcc/timevar.def`.

use super::{extension_matches, read_to_string, TraceParser};
use crate::error::{Error, Result};
use crate::model::{CompilationUnit, CompilerType, TimeBreakdown};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::time::Duration;

const TIME_HEADER: &str = "Time variable";
const GCC_EXTENSIONS: &[&str] = &["txt", "log", "report"];

static TIME_TRIPLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+)\s*\([^)]*\)").expect("valid regex"));

struct TimingLine {
    phase_name: String,
    wall_time: Duration,
}

fn parse_timing_line(line: &str) -> Option<TimingLine> {
    let trimmed = line.trim();
    if !trimmed.starts_with("phase ") && !trimmed.contains(':') {
        return None;
    }

    let colon_pos = trimmed.find(':')?;
    let phase_name = trimmed[..colon_pos].trim().to_string();
    let times_part = &trimmed[colon_pos + 1..];

    let times: Vec<f64> = TIME_TRIPLE
        .captures_iter(times_part)
        .filter_map(|cap| cap.get(1)?.as_str().parse::<f64>().ok())
        .collect();

    let wall_time = times.get(2).copied().map(Duration::from_secs_f64).unwrap_or(Duration::ZERO);

    Some(TimingLine { phase_name, wall_time })
}

fn map_phase_to_breakdown(timing: &TimingLine, breakdown: &mut TimeBreakdown) {
    let name = timing.phase_name.as_str();
    let wall = timing.wall_time;

    match name {
        "phase parsing" => breakdown.parsing += wall,
        "phase lang. deferred" => breakdown.semantic_analysis += wall,
        "phase late parsing cleanups" => breakdown.parsing += wall,
        "phase opt and generate" => {
            breakdown.optimization += wall / 2;
            breakdown.code_generation += wall / 2;
        }
        "phase last asm" => breakdown.code_generation += wall,
        "phase stream in" | "phase stream out" => breakdown.optimization += wall,
        "phase finalize" => breakdown.code_generation += wall,
        _ => {
            let lower = name.to_ascii_lowercase();
            if lower.contains("preprocess") {
                breakdown.preprocessing += wall;
            } else if lower.contains("pars") {
                breakdown.parsing += wall;
            } else if lower.contains("template") || lower.contains("instantiat") {
                breakdown.template_instantiation += wall;
            } else if lower.contains("semantic") || lower.contains("name lookup") || lower.contains("overload") {
                breakdown.semantic_analysis += wall;
            } else if lower.contains("optim") || lower.contains("inline") {
                breakdown.optimization += wall;
            } else if lower.contains("expand")
                || lower.contains("rtl")
                || lower.contains("codegen")
                || lower.contains("final")
                || lower.contains("assemb")
            {
                breakdown.code_generation += wall;
            }
        }
    }
}

pub struct GccPhaseParser;

impl TraceParser for GccPhaseParser {
    fn name(&self) -> &'static str {
        "GCC"
    }

    fn compiler_type(&self) -> CompilerType {
        CompilerType::Gcc
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        GCC_EXTENSIONS
    }

    fn can_parse(&self, path: &Path) -> bool {
        if !extension_matches(path, GCC_EXTENSIONS) {
            return false;
        }
        match read_to_string(path) {
            Ok(content) => self.can_parse_content(&content),
            Err(_) => false,
        }
    }

    fn can_parse_content(&self, content: &str) -> bool {
        content.contains(TIME_HEADER)
            && content.contains("usr")
            && content.contains("sys")
            && content.contains("wall")
    }

    fn parse_file(&self, path: &Path) -> Result<CompilationUnit> {
        let content = read_to_string(path)?;
        let source_hint = path.with_extension("cpp");
        self.parse_content(&content, &source_hint)
    }

    fn parse_content(&self, content: &str, source_hint: &Path) -> Result<CompilationUnit> {
        if !self.can_parse_content(content) {
            return Err(Error::parse("not a valid GCC time report"));
        }

        let mut unit = CompilationUnit::new(source_hint.to_path_buf());
        unit.compiler_type = Some(CompilerType::Gcc);

        let mut total_wall = Duration::ZERO;
        for line in content.lines() {
            if let Some(timing) = parse_timing_line(line) {
                total_wall += timing.wall_time;
                map_phase_to_breakdown(&timing, &mut unit.metrics.breakdown);
            }
        }

        unit.metrics.total_time = total_wall;
        unit.metrics.frontend_time = unit.metrics.breakdown.preprocessing
            + unit.metrics.breakdown.parsing
            + unit.metrics.breakdown.semantic_analysis
            + unit.metrics.breakdown.template_instantiation;
        unit.metrics.backend_time =
            unit.metrics.breakdown.code_generation + unit.metrics.breakdown.optimization;
        unit.finalize();
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Time variable                                   usr           sys          wall
 phase parsing                      :   1.200 ( 40%)   0.100 ( 30%)   1.300 (38%)
 phase opt and generate             :   0.800 ( 27%)   0.050 ( 15%)   0.900 (26%)
 phase lang. deferred                :   0.300 (10%)   0.020 (6%)   0.320 (9%)
";

    #[test]
    fn detects_gcc_time_report() {
        let parser = GccPhaseParser;
        assert!(parser.can_parse_content(SAMPLE));
        assert!(!parser.can_parse_content("not a gcc report"));
    }

    #[test]
    fn splits_opt_and_generate_evenly() {
        let parser = GccPhaseParser;
        let unit = parser.parse_content(SAMPLE, Path::new("main.cpp")).unwrap();
        assert_eq!(unit.metrics.breakdown.optimization, Duration::from_secs_f64(0.45));
        assert_eq!(unit.metrics.breakdown.code_generation, Duration::from_secs_f64(0.45));
    }

    #[test]
    fn lang_deferred_counts_as_semantic_analysis() {
        let parser = GccPhaseParser;
        let unit = parser.parse_content(SAMPLE, Path::new("main.cpp")).unwrap();
        assert_eq!(unit.metrics.breakdown.semantic_analysis, Duration::from_secs_f64(0.32));
    }

    #[test]
    fn total_time_sums_wall_column() {
        let parser = GccPhaseParser;
        let unit = parser.parse_content(SAMPLE, Path::new("main.cpp")).unwrap();
        assert_eq!(unit.metrics.total_time, Duration::from_secs_f64(1.3 + 0.9 + 0.32));
    }
}
