//! NVCC (CUDA) compile-timing log parser (§4.1).
//!
//! Grounded on `examples/original_source/sources/bha/parsers/nvcc_parser.cpp`.

use super::{extension_matches, read_to_string, TraceParser};
use crate::error::Result;
use crate::model::{CompilationUnit, CompilerType};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::time::Duration;

const NVCC_MARKER: &str = "nvcc";
const PTXAS_MARKER: &str = "ptxas";
const FATBIN_MARKER: &str = "fatbinary";
const CICC_MARKER: &str = "cicc";
const NVCC_SNIFF_BYTES: usize = 1000;
const NVCC_EXTENSIONS: &[&str] = &["txt", "log", "nvlog"];

static NAME_EQ_TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\s*[:=]\s*(\d+\.?\d*)\s*s").expect("valid regex"));
static TIME_THEN_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.?\d*)\s*s\s+(\w+)").expect("valid regex"));

struct NvccPhase {
    name: String,
    time: Duration,
}

fn parse_nvcc_phases(content: &str) -> Vec<NvccPhase> {
    let mut phases = Vec::new();

    for cap in NAME_EQ_TIME_RE.captures_iter(content) {
        if let Ok(seconds) = cap[2].parse::<f64>() {
            phases.push(NvccPhase {
                name: cap[1].to_string(),
                time: Duration::from_secs_f64(seconds),
            });
        }
    }

    for cap in TIME_THEN_NAME_RE.captures_iter(content) {
        let name = cap[2].to_string();
        if phases.iter().any(|p| p.name == name) {
            continue;
        }
        if let Ok(seconds) = cap[1].parse::<f64>() {
            phases.push(NvccPhase {
                name,
                time: Duration::from_secs_f64(seconds),
            });
        }
    }

    phases
}

pub struct NvccParser;

impl TraceParser for NvccParser {
    fn name(&self) -> &'static str {
        "NVCC"
    }

    fn compiler_type(&self) -> CompilerType {
        CompilerType::Nvcc
    }

    fn supported_extensions(&self) -> &'static [&'static str] {
        NVCC_EXTENSIONS
    }

    fn can_parse(&self, path: &Path) -> bool {
        if !extension_matches(path, NVCC_EXTENSIONS) {
            return false;
        }
        match read_to_string(path) {
            Ok(content) => self.can_parse_content(&content),
            Err(_) => false,
        }
    }

    fn can_parse_content(&self, content: &str) -> bool {
        let prefix_len = content.len().min(NVCC_SNIFF_BYTES);
        let mut end = prefix_len;
        while end > 0 && !content.is_char_boundary(end) {
            end -= 1;
        }
        let lower = content[..end].to_ascii_lowercase();

        lower.contains(NVCC_MARKER)
            || lower.contains(PTXAS_MARKER)
            || lower.contains(FATBIN_MARKER)
            || lower.contains(CICC_MARKER)
    }

    fn parse_file(&self, path: &Path) -> Result<CompilationUnit> {
        let content = read_to_string(path)?;
        let source_hint = path.with_extension("cu");
        self.parse_content(&content, &source_hint)
    }

    fn parse_content(&self, content: &str, source_hint: &Path) -> Result<CompilationUnit> {
        let mut unit = CompilationUnit::new(source_hint.to_path_buf());
        unit.compiler_type = Some(CompilerType::Nvcc);

        let phases = parse_nvcc_phases(content);

        let mut host_time = Duration::ZERO;
        let mut device_time = Duration::ZERO;
        let mut link_time = Duration::ZERO;
        let mut total_time = Duration::ZERO;

        for phase in &phases {
            let lower_name = phase.name.to_ascii_lowercase();
            total_time += phase.time;

            if lower_name.contains("compile") || lower_name.contains("host") || lower_name.contains("c++") {
                host_time += phase.time;
            } else if lower_name.contains("ptx") || lower_name.contains("cicc") || lower_name.contains("device") {
                device_time += phase.time;
            } else if lower_name.contains("fat") || lower_name.contains("link") || lower_name.contains("nvlink") {
                link_time += phase.time;
            }
        }

        unit.metrics.total_time = total_time;
        unit.metrics.frontend_time = host_time;
        unit.metrics.backend_time = device_time + link_time;

        unit.metrics.breakdown.parsing = host_time / 3;
        unit.metrics.breakdown.semantic_analysis = host_time / 3;
        unit.metrics.breakdown.template_instantiation = host_time / 3;
        unit.metrics.breakdown.code_generation = device_time;
        unit.metrics.breakdown.optimization = link_time;

        unit.finalize();
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "nvcc: compile=1.500s cicc=0.800s ptxas=0.400s fatbinary=0.100s";

    #[test]
    fn detects_nvcc_marker() {
        let parser = NvccParser;
        assert!(parser.can_parse_content(SAMPLE));
        assert!(!parser.can_parse_content("no cuda toolchain mentioned here"));
    }

    #[test]
    fn buckets_phases_into_host_device_link() {
        let parser = NvccParser;
        let unit = parser.parse_content(SAMPLE, Path::new("hint.cu")).unwrap();
        assert_eq!(unit.metrics.frontend_time, Duration::from_secs_f64(1.5));
        assert_eq!(unit.metrics.backend_time, Duration::from_secs_f64(0.8 + 0.4 + 0.1));
    }

    #[test]
    fn total_time_is_sum_of_all_phases() {
        let parser = NvccParser;
        let unit = parser.parse_content(SAMPLE, Path::new("hint.cu")).unwrap();
        assert_eq!(unit.metrics.total_time, Duration::from_secs_f64(1.5 + 0.8 + 0.4 + 0.1));
    }
}
