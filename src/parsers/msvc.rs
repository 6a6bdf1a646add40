//! MSVC `/Bt+` timing-line parser (§4.1).
//!
//! Grounded on `examples/original_source/sources/bha/parsers/msvc_parser.cpp`.

use super::{extension_matches, read_to_string, TraceParser};
use crate::error::{Error, Result};
use crate::model::{CompilationUnit, CompilerType};
use std::path::Path;
use std::time::Duration;

const TIME_PREFIX: &str = "time(";
const C1XX_MARKER: &str = "c1xx.dll";
const C2_MARKER: &str = "c2.dll";
const MSVC_EXTENSIONS: &[&str] = &["txt", "log", "btlog"];

struct MsvcTimeLine {
    target: String,
    total_time: Duration,
}

fn parse_msvc_time(time_str: &str) -> Duration {
    let trimmed = time_str.trim().trim_end_matches('s');
    trimmed
        .parse::<f64>()
        .ok()
        .map(Duration::from_secs_f64)
        .unwrap_or(Duration::ZERO)
}

fn parse_msvc_line(line: &str) -> Option<MsvcTimeLine> {
    let trimmed = line.trim();
    if !trimmed.starts_with(TIME_PREFIX) {
        return None;
    }

    let close_paren = trimmed.find(')')?;
    let target = trimmed[5..close_paren].to_string();

    let equals_pos = trimmed[close_paren..].find('=').map(|p| p + close_paren)?;
    let time_start = equals_pos + 1;
    let rest = &trimmed[time_start..];
    let time_end = rest.find([' ', '<']).unwrap_or(rest.len());

    Some(MsvcTimeLine {
        target,
        total_time: parse_msvc_time(&rest[..time_end]),
    })
}

pub struct MsvcTimingParser;

impl TraceParser for MsvcTimingParser {
    fn name(&self) -> &'static str {
        "MSVC"
    }

    fn compiler_type(&self) -> CompilerType {
        CompilerType::Msvc
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        MSVC_EXTENSIONS
    }

    fn can_parse(&self, path: &Path) -> bool {
        if !extension_matches(path, MSVC_EXTENSIONS) {
            return false;
        }
        match read_to_string(path) {
            Ok(content) => self.can_parse_content(&content),
            Err(_) => false,
        }
    }

    fn can_parse_content(&self, content: &str) -> bool {
        content.contains(TIME_PREFIX) && (content.contains(C1XX_MARKER) || content.contains(C2_MARKER))
    }

    fn parse_file(&self, path: &Path) -> Result<CompilationUnit> {
        let content = read_to_string(path)?;
        self.parse_content(&content, path)
    }

    fn parse_content(&self, content: &str, source_hint: &Path) -> Result<CompilationUnit> {
        if !self.can_parse_content(content) {
            return Err(Error::parse("not a valid MSVC timing output"));
        }

        let mut unit = CompilationUnit::new(source_hint.to_path_buf());
        unit.compiler_type = Some(CompilerType::Msvc);

        for line in content.lines() {
            let Some(timing) = parse_msvc_line(line) else {
                continue;
            };
            let lower_target = timing.target.to_ascii_lowercase();

            if lower_target.contains("c1xx") {
                unit.metrics.frontend_time = timing.total_time;
                unit.metrics.breakdown.parsing = timing.total_time.mul_f64(0.4);
                unit.metrics.breakdown.semantic_analysis = timing.total_time.mul_f64(0.3);
                unit.metrics.breakdown.template_instantiation = timing.total_time.mul_f64(0.3);
            } else if lower_target.contains("c2") {
                unit.metrics.backend_time = timing.total_time;
                unit.metrics.breakdown.optimization = timing.total_time.mul_f64(0.5);
                unit.metrics.breakdown.code_generation = timing.total_time.mul_f64(0.5);
            } else if [".cpp", ".cxx", ".cc", ".c"]
                .iter()
                .any(|ext| lower_target.ends_with(ext))
            {
                unit.source_file = timing.target.into();
                unit.metrics.total_time = timing.total_time;
            }
        }

        if unit.metrics.total_time == Duration::ZERO {
            unit.metrics.total_time = unit.metrics.frontend_time + unit.metrics.backend_time;
        }

        unit.finalize();
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r"time(C:\src\main.cpp)=2.000s
time(C:\bin\c1xx.dll)=1.200s < 100 - 1300 > BB [main.cpp]
time(C:\bin\c2.dll)=0.800s < 1300 - 2100 > BB [main.cpp]
";

    #[test]
    fn detects_msvc_output() {
        let parser = MsvcTimingParser;
        assert!(parser.can_parse_content(SAMPLE));
        assert!(!parser.can_parse_content("no timing here"));
    }

    #[test]
    fn splits_frontend_40_30_30() {
        let parser = MsvcTimingParser;
        let unit = parser.parse_content(SAMPLE, Path::new("hint.cpp")).unwrap();
        assert_eq!(unit.metrics.frontend_time, Duration::from_secs_f64(1.2));
        assert_eq!(unit.metrics.breakdown.parsing, Duration::from_secs_f64(1.2 * 0.4));
        assert_eq!(unit.metrics.breakdown.semantic_analysis, Duration::from_secs_f64(1.2 * 0.3));
        assert_eq!(unit.metrics.breakdown.template_instantiation, Duration::from_secs_f64(1.2 * 0.3));
    }

    #[test]
    fn splits_backend_50_50() {
        let parser = MsvcTimingParser;
        let unit = parser.parse_content(SAMPLE, Path::new("hint.cpp")).unwrap();
        assert_eq!(unit.metrics.backend_time, Duration::from_secs_f64(0.8));
        assert_eq!(unit.metrics.breakdown.optimization, Duration::from_secs_f64(0.4));
        assert_eq!(unit.metrics.breakdown.code_generation, Duration::from_secs_f64(0.4));
    }

    #[test]
    fn source_line_sets_total_time_and_source_file() {
        let parser = MsvcTimingParser;
        let unit = parser.parse_content(SAMPLE, Path::new("hint.cpp")).unwrap();
        assert_eq!(unit.metrics.total_time, Duration::from_secs_f64(2.0));
        assert_eq!(unit.source_file, Path::new(r"C:\src\main.cpp"));
    }
}
