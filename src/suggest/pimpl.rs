//! PIMPL (pointer-to-implementation) suggester (§4.5.6).

use super::{
    savings_percent, sort_by_savings_desc, suggestion_id, Action, FileTarget, Priority, Suggester,
    SuggestionContext, SuggestionResult, SuggestionType,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

const MIN_COMPILE_TIME: Duration = Duration::from_millis(500);
const MIN_INCLUDE_COUNT: usize = 3;
const SOURCE_EXTENSIONS: &[&str] = &["cpp", "cc", "cxx"];
const REJECT_MARKERS: &[&str] = &["_impl", "impl_", "pimpl", "_p.", "private"];

/// Suggests hiding a translation unit's heavy includes behind a
/// pointer-to-implementation to decouple its header from their parse cost.
#[derive(Default)]
pub struct PimplSuggester;

fn is_source_file(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| SOURCE_EXTENSIONS.iter().any(|s| s.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

fn looks_already_pimpl(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    REJECT_MARKERS.iter().any(|marker| lower.contains(marker))
}

/// Guesses the header(s) corresponding to a source file by swapping the
/// extension and, when present, swapping an adjacent `src`/`include`
/// directory segment.
fn possible_headers(source_path: &str) -> Vec<PathBuf> {
    let path = Path::new(source_path);
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or(source_path);
    let parent = path.parent();

    let mut candidates = Vec::new();
    for ext in ["h", "hpp", "hh", "hxx"] {
        if let Some(parent) = parent {
            candidates.push(parent.join(format!("{stem}.{ext}")));

            let components: Vec<_> = parent.components().collect();
            if let Some(pos) = components.iter().position(|c| c.as_os_str() == "src") {
                let mut swapped: PathBuf = components[..pos].iter().collect();
                swapped.push("include");
                swapped.extend(&components[pos + 1..]);
                swapped.push(format!("{stem}.{ext}"));
                candidates.push(swapped);
            }
        } else {
            candidates.push(PathBuf::from(format!("{stem}.{ext}")));
        }
    }
    candidates
}

/// `ln(frontend_ms+1) × ln(includes+1) × (1 + 0.1×templates)` (§4.5.6).
fn complexity_score(frontend_time: Duration, include_count: usize, template_count: usize) -> f64 {
    let frontend_ms = frontend_time.as_secs_f64() * 1000.0;
    frontend_ms.ln_1p() * (include_count as f64).ln_1p() * (1.0 + 0.1 * template_count as f64)
}

fn confidence_for(
    frontend_time: Duration,
    backend_time: Duration,
    compile_time: Duration,
    include_count: usize,
) -> f64 {
    let known_total = frontend_time.as_secs_f64() + backend_time.as_secs_f64();
    let frontend_ratio = if known_total > 0.0 {
        (frontend_time.as_secs_f64() / known_total).clamp(0.0, 1.0)
    } else {
        0.5
    };

    let time_confidence = if compile_time > Duration::from_secs(2) {
        0.9
    } else if compile_time > Duration::from_secs(1) {
        0.75
    } else if compile_time > Duration::from_millis(500) {
        0.55
    } else {
        0.35
    };
    let include_confidence = (include_count as f64 / 20.0).min(1.0);
    let time_and_include = time_confidence * 0.7 + include_confidence * 0.3;

    (frontend_ratio * 0.6 + time_and_include * 0.4).clamp(0.30, 0.95)
}

fn priority_for(compile_time: Duration, include_count: usize) -> Priority {
    if compile_time > Duration::from_secs(5) && include_count >= 20 {
        Priority::Critical
    } else if (compile_time > Duration::from_secs(2) && include_count >= 10)
        || compile_time > Duration::from_secs(3)
    {
        Priority::High
    } else if (compile_time > Duration::from_secs(1) && include_count >= 5)
        || compile_time > Duration::from_millis(1500)
    {
        Priority::Medium
    } else {
        Priority::Low
    }
}

/// Savings are driven by the time PIMPL actually removes from dependents:
/// the source file's own frontend time, falling back to `0.6 × compile_time`
/// when the parser never separated frontend from backend (§4.5.6).
fn estimate_savings(frontend_time: Duration, compile_time: Duration, dependents: usize) -> Duration {
    let time_for_savings = if frontend_time.is_zero() {
        compile_time.mul_f64(0.6)
    } else {
        frontend_time
    };
    let scale = 0.25 * ((dependents.max(1) as f64) + 1.0).ln();
    time_for_savings.mul_f64(scale).min(compile_time)
}

impl Suggester for PimplSuggester {
    fn name(&self) -> &'static str {
        "pimpl"
    }

    fn suggestion_type(&self) -> SuggestionType {
        SuggestionType::PimplPattern
    }

    fn suggest(&self, context: &SuggestionContext<'_>) -> SuggestionResult {
        let started = Instant::now();
        let total_time = context.total_time();

        let mut items_analyzed = 0usize;
        let mut items_skipped = 0usize;
        let mut suggestions = Vec::new();

        for unit in context.units {
            items_analyzed += 1;
            let path_str = unit.source_file.to_string_lossy().to_string();

            let include_count = unit.metrics.direct_includes;
            let compile_time = unit.metrics.total_time;
            let frontend_time = unit.metrics.frontend_time;
            let backend_time = unit.metrics.backend_time;

            let eligible = is_source_file(&path_str)
                && compile_time >= MIN_COMPILE_TIME
                && include_count >= MIN_INCLUDE_COUNT
                && !looks_already_pimpl(&path_str);

            if !eligible {
                items_skipped += 1;
                continue;
            }

            let confidence = confidence_for(frontend_time, backend_time, compile_time, include_count);
            let priority = priority_for(compile_time, include_count);

            if confidence < 0.4 && priority == Priority::Low {
                items_skipped += 1;
                continue;
            }

            let dependents = context
                .analysis
                .dependencies
                .headers
                .iter()
                .find(|h| possible_headers(&path_str).iter().any(|c| c.to_string_lossy() == h.path))
                .map(|h| h.including_files)
                .unwrap_or(0);

            let savings = estimate_savings(frontend_time, compile_time, dependents);
            let header_guess = possible_headers(&path_str)
                .into_iter()
                .next()
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|| format!("{path_str}.h"));

            let complexity = complexity_score(frontend_time, include_count, unit.templates.len());

            suggestions.push(super::Suggestion {
                id: suggestion_id(SuggestionType::PimplPattern, &path_str),
                suggestion_type: SuggestionType::PimplPattern,
                priority,
                confidence,
                estimated_savings: savings,
                estimated_savings_percent: savings_percent(savings, total_time),
                title: format!("Apply PIMPL idiom to {}", header_guess),
                description: format!(
                    "{} compiles in {:.0} ms and pulls in {} direct includes (complexity score {:.2}). Hiding its implementation details behind a pointer-to-implementation would let dependents avoid parsing them.",
                    path_str,
                    compile_time.as_secs_f64() * 1000.0,
                    include_count,
                    complexity
                ),
                rationale: "The PIMPL idiom moves private members and heavy includes out of a class's header into a separate implementation struct, so only the .cpp file pays their parse cost.".to_string(),
                implementation_steps: vec![
                    "Introduce a forward-declared `Impl` struct and a `std::unique_ptr<Impl> impl_` member.".to_string(),
                    "Move private data members and heavy-include-dependent types into `Impl`.".to_string(),
                    "Move method bodies that touch those members into the .cpp file.".to_string(),
                    "Declare (but do not define) the special member functions in the header; define them in the .cpp where `Impl` is complete.".to_string(),
                    "Remove now-unneeded includes from the header.".to_string(),
                ],
                caveats: vec![
                    "Adds an indirection (pointer dereference and heap allocation) for every access to hidden members.".to_string(),
                    "Requires out-of-line definitions for constructors/destructor so `Impl` is complete at their point of instantiation.".to_string(),
                    "Not suitable for performance-critical inner-loop types.".to_string(),
                ],
                verification: "Recompile dependents and confirm their include set shrank along with their compile time.".to_string(),
                primary_target: FileTarget {
                    path: header_guess.clone().into(),
                    action: Action::Modify,
                    note: "introduce Impl struct and move heavy includes into the .cpp".to_string(),
                },
                secondary_targets: vec![FileTarget {
                    path: path_str.clone().into(),
                    action: Action::Modify,
                    note: "define Impl and out-of-line methods here".to_string(),
                }],
                before_code: Some("class Widget {\npublic:\n    Widget();\n    ~Widget();\nprivate:\n    HeavyType member_;\n};".to_string()),
                after_code: Some("class Widget {\npublic:\n    Widget();\n    ~Widget();\nprivate:\n    struct Impl;\n    std::unique_ptr<Impl> impl_;\n};".to_string()),
                is_safe: false,
            });
        }

        sort_by_savings_desc(&mut suggestions);

        SuggestionResult {
            suggestions,
            items_analyzed,
            items_skipped,
            generation_time: started.elapsed(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AnalysisResult;
    use crate::model::{CompilationUnit, IncludeInfo};
    use crate::suggest::SuggestOptions;

    fn unit_with(path: &str, compile_ms: u64, include_count: usize) -> CompilationUnit {
        let mut unit = CompilationUnit::new(PathBuf::from(path));
        unit.metrics.total_time = Duration::from_millis(compile_ms);
        for i in 0..include_count {
            unit.includes.push(IncludeInfo {
                header: format!("dep{i}.h"),
                parse_time: Duration::from_millis(10),
            });
        }
        unit.finalize();
        unit
    }

    #[test]
    fn suggests_pimpl_for_heavy_source_with_many_includes() {
        let unit = unit_with("src/widget.cpp", 800, 5);
        let units = vec![unit];
        let analysis = AnalysisResult::default();
        let options = SuggestOptions::default();
        let context = SuggestionContext { units: &units, analysis: &analysis, options: &options };

        let result = PimplSuggester.suggest(&context);
        assert_eq!(result.suggestions.len(), 1);
        assert!(!result.suggestions[0].is_safe);
    }

    #[test]
    fn rejects_files_that_already_look_like_pimpl() {
        let unit = unit_with("src/widget_impl.cpp", 800, 5);
        let units = vec![unit];
        let analysis = AnalysisResult::default();
        let options = SuggestOptions::default();
        let context = SuggestionContext { units: &units, analysis: &analysis, options: &options };

        let result = PimplSuggester.suggest(&context);
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn header_guess_swaps_src_for_include_dir() {
        let candidates = possible_headers("project/src/widget.cpp");
        assert!(candidates.iter().any(|c| c.to_string_lossy().contains("include/widget.h")));
        assert!(candidates.iter().any(|c| c.to_string_lossy() == "project/src/widget.h"));
    }
}
