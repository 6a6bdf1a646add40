//! Intel oneAPI compiler (icx) parser (§4.1) — icx is Clang-based, so its
//! trace is Chrome-trace JSON with an extra vendor marker; this wraps the
//! Clang parser rather than re-deriving its event mapping.
//!
//! Grounded on `examples/original_source/sources/bha/parsers/intel_parser.cpp`.

use super::chrome_trace::{parse_chrome_trace, TRACE_EVENTS_MARKER};
use super::{read_to_string, sniff_prefix, TraceParser};
use crate::error::{Error, Result};
use crate::model::{CompilationUnit, CompilerType};
use std::path::Path;

const ICX_MARKER: &str = "icx";

pub struct IntelOneApiParser;

impl TraceParser for IntelOneApiParser {
    fn name(&self) -> &'static str {
        "Intel oneAPI"
    }

    fn compiler_type(&self) -> CompilerType {
        CompilerType::IntelOneApi
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
        let prefix = sniff_prefix(content);
        if !prefix.contains(TRACE_EVENTS_MARKER) {
            return false;
        }
        prefix.contains(ICX_MARKER) || prefix.contains("Intel") || prefix.contains("oneAPI")
    }

    fn parse_file(&self, path: &Path) -> Result<CompilationUnit> {
        let content = read_to_string(path)?;
        self.parse_content(&content, path)
    }

    fn parse_content(&self, content: &str, source_hint: &Path) -> Result<CompilationUnit> {
        if !self.can_parse_content(content) {
            return Err(Error::parse("not a valid Intel oneAPI trace"));
        }
        parse_chrome_trace(content, source_hint, CompilerType::IntelOneApi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_both_trace_events_and_vendor_marker() {
        let parser = IntelOneApiParser;
        let plain_clang = r#"{"traceEvents":[{"name":"ExecuteCompiler","args":{"detail":"main.cpp"}}]}"#;
        assert!(!parser.can_parse_content(plain_clang));

        let icx = r#"{"traceEvents":[{"name":"ExecuteCompiler","args":{"detail":"icx main.cpp"}}]}"#;
        assert!(parser.can_parse_content(icx));
    }

    #[test]
    fn parses_via_shared_chrome_trace_logic() {
        let parser = IntelOneApiParser;
        let content = r#"{"traceEvents":[
            {"name":"ExecuteCompiler","dur":1000,"args":{"detail":"icx build of main.cpp"}},
            {"name":"Total Frontend","dur":600,"args":{}},
            {"name":"Total Backend","dur":400,"args":{}}
        ]}"#;
        let unit = parser.parse_content(content, Path::new("hint.cpp")).unwrap();
        assert_eq!(unit.compiler_type, Some(CompilerType::IntelOneApi));
    }
}
