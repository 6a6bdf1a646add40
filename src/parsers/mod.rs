//! Pluggable, auto-detecting trace parser framework (§4.1, §6).

mod chrome_trace;
mod intel_classic;
mod intel_oneapi;
mod msvc;
mod nvcc;
mod phase_table;

pub use chrome_trace::ClangTraceParser;
pub use intel_classic::IntelClassicParser;
pub use intel_oneapi::IntelOneApiParser;
pub use msvc::MsvcTimingParser;
pub use nvcc::NvccParser;
pub use phase_table::GccPhaseParser;

use crate::error::{Error, Result};
use crate::model::{CompilationUnit, CompilerType, IncludeInfo, TemplateInstantiation};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Implemented by every compiler-specific trace decoder. Implementations
/// must be stateless with respect to parsing so a single instance can be
/// shared across concurrent callers (§3 invariant).
pub trait TraceParser: Send + Sync {
    fn name(&self) -> &'static str;
    fn compiler_type(&self) -> CompilerType;
    fn supported_extensions(&self) -> &'static [&'static str];

    /// Cheap path-based pre-check (extension) followed by a content sniff.
    fn can_parse(&self, path: &Path) -> bool;

    /// Bounded-prefix content sniff (§4.1): must be cheap, so implementations
    /// should only inspect the first ~1 KiB of `content`.
    fn can_parse_content(&self, content: &str) -> bool;

    fn parse_file(&self, path: &Path) -> Result<CompilationUnit>;
    fn parse_content(&self, content: &str, source_hint: &Path) -> Result<CompilationUnit>;

    /// Whether `parse_streaming` is implemented; default parsers are
    /// batch-only.
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Incremental variant that yields template/include records as they are
    /// decoded. A streaming implementation must produce the same aggregate
    /// as its batch counterpart for identical input (§4.1).
    fn parse_streaming(
        &self,
        _path: &Path,
        _template_callback: &mut dyn FnMut(&TemplateInstantiation),
        _include_callback: &mut dyn FnMut(&IncludeInfo),
    ) -> Result<()> {
        Err(Error::internal("streaming not supported by this parser"))
    }
}

/// Bounded prefix length inspected by `can_parse_content` implementations
/// (§4.1: "approximately 1 KiB").
pub const SNIFF_PREFIX_BYTES: usize = 1024;

/// Truncates `content` to its first `SNIFF_PREFIX_BYTES` bytes at a char
/// boundary, for cheap marker inspection.
pub fn sniff_prefix(content: &str) -> &str {
    if content.len() <= SNIFF_PREFIX_BYTES {
        return content;
    }
    let mut end = SNIFF_PREFIX_BYTES;
    while end > 0 && !content.is_char_boundary(end) {
        end -= 1;
    }
    &content[..end]
}

fn extension_matches(path: &Path, extensions: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    extensions.iter().any(|candidate| candidate.trim_start_matches('.') == ext)
}

fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read(path)
        .map_err(|e| crate::error::io_error_for_path(e, &path.to_path_buf()))
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

/// Registry of available trace parsers. Mutated only at registration time
/// (expected to happen before any parallel use, per §5); lookups are pure
/// reads over the registered list, so the registry itself needs no internal
/// synchronization for read access.
#[derive(Default)]
pub struct ParserRegistry {
    parsers: Vec<Arc<dyn TraceParser>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, parser: Arc<dyn TraceParser>) {
        self.parsers.push(parser);
    }

    /// Filters candidates by extension match (preserving registration
    /// order), then returns the first whose `can_parse` accepts the file.
    pub fn find_for_file(&self, path: &Path) -> Option<Arc<dyn TraceParser>> {
        self.parsers
            .iter()
            .filter(|p| extension_matches(path, p.supported_extensions()))
            .find(|p| p.can_parse(path))
            .cloned()
    }

    /// Calls `can_parse_content` on each parser in registration order,
    /// returning the first that accepts — so more-specific parsers must be
    /// registered ahead of more-general ones that share a marker.
    pub fn find_for_content(&self, content: &str) -> Option<Arc<dyn TraceParser>> {
        self.parsers
            .iter()
            .find(|p| p.can_parse_content(content))
            .cloned()
    }

    pub fn get_by_type(&self, compiler_type: CompilerType) -> Option<Arc<dyn TraceParser>> {
        self.parsers
            .iter()
            .find(|p| p.compiler_type() == compiler_type)
            .cloned()
    }

    pub fn list(&self) -> &[Arc<dyn TraceParser>] {
        &self.parsers
    }

    pub fn supported_extensions(&self) -> Vec<&'static str> {
        let mut exts: Vec<&'static str> = self
            .parsers
            .iter()
            .flat_map(|p| p.supported_extensions().iter().copied())
            .collect();
        exts.sort_unstable();
        exts.dedup();
        exts
    }

    pub fn is_supported_extension(&self, ext: &str) -> bool {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        self.supported_extensions()
            .iter()
            .any(|candidate| candidate.trim_start_matches('.') == ext)
    }

    /// Parses a single file, auto-detecting the parser by extension then
    /// content. A registry miss surfaces as `NotFound`, never `ParseError`
    /// (§4.1, §7).
    pub fn parse_trace_file(&self, path: &Path) -> Result<CompilationUnit> {
        match self.find_for_file(path) {
            Some(parser) => parser.parse_file(path),
            None => Err(Error::not_found_path("no parser found for file", path)),
        }
    }
}

/// Builds the default registry with every built-in parser registered in
/// the order required by §4.1: more-specific markers (Intel oneAPI) ahead
/// of the more-general formats (Clang Chrome-trace) they are a superset of.
pub fn register_all_parsers() -> ParserRegistry {
    let mut registry = ParserRegistry::new();
    registry.register(Arc::new(IntelOneApiParser));
    registry.register(Arc::new(ClangTraceParser));
    registry.register(Arc::new(GccPhaseParser));
    registry.register(Arc::new(MsvcTimingParser));
    registry.register(Arc::new(IntelClassicParser));
    registry.register(Arc::new(NvccParser));
    registry
}

static DEFAULT_REGISTRY: once_cell::sync::Lazy<ParserRegistry> =
    once_cell::sync::Lazy::new(register_all_parsers);

/// Module-scoped default registry, for ergonomic call sites that don't need
/// to thread a registry through explicitly.
pub fn default_registry() -> &'static ParserRegistry {
    &DEFAULT_REGISTRY
}

/// Parses many trace files in parallel via the global thread pool (§6),
/// returning one `Result` per input, in input order. One failing file does
/// not abort sibling parses (§7).
pub fn parse_trace_files(paths: Vec<PathBuf>) -> Vec<Result<CompilationUnit>> {
    crate::concurrency::global_pool()
        .parallel_map(paths, |path| default_registry().parse_trace_file(&path))
        .expect("global pool accepts submissions")
}

/// Walks `path` (file or directory) and returns only paths whose extension
/// is claimed by some registered parser. Directories are walked recursively
/// by default. Does not deduplicate by canonical path (§9 Open Question):
/// duplicates reachable via distinct symlinks are possible.
pub fn collect_trace_files(path: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if !path.exists() {
        return Err(Error::not_found_path("path does not exist", path));
    }

    let registry = default_registry();

    if path.is_file() {
        return Ok(if has_supported_extension(path, registry) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let mut walker = walkdir::WalkDir::new(path);
    if !recursive {
        walker = walker.max_depth(1);
    }

    let mut out = Vec::new();
    for entry in walker.into_iter().filter_map(std::result::Result::ok) {
        let entry_path = entry.path();
        if entry.file_type().is_file() && has_supported_extension(entry_path, registry) {
            out.push(entry_path.to_path_buf());
        }
    }
    Ok(out)
}

fn has_supported_extension(path: &Path, registry: &ParserRegistry) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| registry.is_supported_extension(ext))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_parser_rejects_unrelated_text() {
        for parser in register_all_parsers().list() {
            assert!(
                !parser.can_parse_content("the quick brown fox jumps over the lazy dog"),
                "{} falsely accepted unrelated text",
                parser.name()
            );
        }
    }

    #[test]
    fn intel_oneapi_registered_before_generic_chrome_trace() {
        let registry = register_all_parsers();
        let content = r#"{"traceEvents":[{"name":"ExecuteCompiler","ph":"X","ts":0,"dur":1,"args":{"detail":"icx build"}}]}"#;
        let parser = registry.find_for_content(content).unwrap();
        assert_eq!(parser.compiler_type(), CompilerType::IntelOneApi);
    }
}
