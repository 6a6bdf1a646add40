//! Intel Classic compiler (icc) optimization-report parser (§4.1).
//!
//! Grounded on `examples/original_source/sources/bha/parsers/intel_parser.cpp`.

use super::{extension_matches, read_to_string, TraceParser};
use crate::error::Result;
use crate::model::{CompilationUnit, CompilerType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::time::Duration;

const ICC_MARKER: &str = "Intel(R) C++ Compiler";
const ICC_OPT_REPORT: &str = "LOOP BEGIN";
const INTEL_CLASSIC_EXTENSIONS: &[&str] = &["optrpt", "txt", "log"];

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.?\d*)\s*(?:s|seconds?)").expect("valid regex"));
static LOOP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"LOOP BEGIN at ([^:]+):(\d+)").expect("valid regex"));

pub struct IntelClassicParser;

impl TraceParser for IntelClassicParser {
    fn name(&self) -> &'static str {
        "Intel Classic"
    }

    fn compiler_type(&self) -> CompilerType {
        CompilerType::IntelClassic
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        INTEL_CLASSIC_EXTENSIONS
    }

    fn can_parse(&self, path: &Path) -> bool {
        if !extension_matches(path, INTEL_CLASSIC_EXTENSIONS) {
            return false;
        }
        match read_to_string(path) {
            Ok(content) => self.can_parse_content(&content),
            Err(_) => false,
        }
    }

    fn can_parse_content(&self, content: &str) -> bool {
        content.contains(ICC_MARKER) || (content.contains(ICC_OPT_REPORT) && content.contains("icc"))
    }

    fn parse_file(&self, path: &Path) -> Result<CompilationUnit> {
        let content = read_to_string(path)?;
        let source_hint = if path.extension().and_then(|e| e.to_str()) == Some("optrpt") {
            path.with_extension("cpp")
        } else {
            path.to_path_buf()
        };
        self.parse_content(&content, &source_hint)
    }

    fn parse_content(&self, content: &str, source_hint: &Path) -> Result<CompilationUnit> {
        let mut unit = CompilationUnit::new(source_hint.to_path_buf());
        unit.compiler_type = Some(CompilerType::IntelClassic);

        let mut total_time = Duration::ZERO;
        let mut resolved_source = false;

        for line in content.lines() {
            if !resolved_source {
                if let Some(cap) = LOOP_RE.captures(line) {
                    unit.source_file = cap[1].to_string().into();
                    resolved_source = true;
                }
            }
            if let Some(cap) = TIME_RE.captures(line) {
                if let Ok(seconds) = cap[1].parse::<f64>() {
                    total_time += Duration::from_secs_f64(seconds);
                }
            }
        }

        unit.metrics.total_time = total_time;
        unit.metrics.breakdown.optimization = total_time;
        unit.finalize();
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Intel(R) C++ Compiler for applications running on Intel(R) 64, Version 2021.1
LOOP BEGIN at hotpath.cpp:42
   remark: loop was vectorized, 2.500 seconds
LOOP END
";

    #[test]
    fn detects_icc_marker() {
        let parser = IntelClassicParser;
        assert!(parser.can_parse_content(SAMPLE));
        assert!(!parser.can_parse_content("unrelated text"));
    }

    #[test]
    fn resolves_source_file_from_loop_begin() {
        let parser = IntelClassicParser;
        let unit = parser.parse_content(SAMPLE, Path::new("hint.cpp")).unwrap();
        assert_eq!(unit.source_file, Path::new("hotpath.cpp"));
    }

    #[test]
    fn attributes_all_time_to_optimization() {
        let parser = IntelClassicParser;
        let unit = parser.parse_content(SAMPLE, Path::new("hint.cpp")).unwrap();
        assert_eq!(unit.metrics.total_time, Duration::from_secs_f64(2.5));
        assert_eq!(unit.metrics.breakdown.optimization, Duration::from_secs_f64(2.5));
    }
}
