//! Include-removal / move-to-cpp suggester (§4.5.3).

use super::{
    savings_percent, sort_by_savings_desc, suggestion_id, Action, FileTarget, Priority, Suggester,
    SuggestionContext, SuggestionResult, SuggestionType,
};
use std::path::Path;
use std::time::{Duration, Instant};

const MIN_PARSE_TIME: Duration = Duration::from_millis(100);
const HEADER_EXTENSIONS: &[&str] = &["h", "hpp", "hh", "hxx"];

/// Suggests dropping headers that are included far more often than the
/// number of distinct files that use them (evidence of an unnecessary
/// transitive pull-in), plus a move-to-cpp variant per header includer.
#[derive(Default)]
pub struct IncludeRemovalSuggester;

fn looks_like_forward_header(header: &str) -> bool {
    let basename = Path::new(header)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(header)
        .to_ascii_lowercase();
    ["fwd", "forward", "decl"].iter().any(|marker| basename.contains(marker))
}

fn is_header_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| HEADER_EXTENSIONS.iter().any(|h| h.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

fn priority_for(savings: Duration, including_files: usize) -> Priority {
    if savings > Duration::from_secs(1) && including_files >= 20 {
        Priority::Critical
    } else if savings > Duration::from_millis(500) && including_files >= 10 {
        Priority::High
    } else if savings > Duration::from_millis(100) {
        Priority::Medium
    } else {
        Priority::Low
    }
}

impl Suggester for IncludeRemovalSuggester {
    fn name(&self) -> &'static str {
        "include_removal"
    }

    fn suggestion_type(&self) -> SuggestionType {
        SuggestionType::IncludeRemoval
    }

    fn suggest(&self, context: &SuggestionContext<'_>) -> SuggestionResult {
        let started = Instant::now();
        let total_time = context.total_time();

        let mut items_analyzed = 0usize;
        let mut items_skipped = 0usize;
        let mut suggestions = Vec::new();

        for header in &context.analysis.dependencies.headers {
            items_analyzed += 1;

            let eligible = header.total_parse_time > MIN_PARSE_TIME
                && header.inclusion_count > 2 * header.including_files
                && !looks_like_forward_header(&header.path);

            if !eligible {
                items_skipped += 1;
                continue;
            }

            let removal_savings = header.total_parse_time / 4;
            let priority = priority_for(removal_savings, header.including_files);

            suggestions.push(super::Suggestion {
                id: suggestion_id(SuggestionType::IncludeRemoval, &header.path),
                suggestion_type: SuggestionType::IncludeRemoval,
                priority,
                confidence: 0.7,
                estimated_savings: removal_savings,
                estimated_savings_percent: savings_percent(removal_savings, total_time),
                title: format!("Remove unnecessary repeated inclusion of {}", header.path),
                description: format!(
                    "{} is included {} times across only {} files, suggesting transitive over-inclusion.",
                    header.path, header.inclusion_count, header.including_files
                ),
                rationale: "Inclusion count far exceeding the number of distinct including files signals the header is pulled in transitively more than it is used directly.".to_string(),
                implementation_steps: vec![
                    format!("Audit includers of {} and drop the include where the header's symbols are unused.", header.path),
                ],
                caveats: vec!["Conservative estimate; assumes only a quarter of parse time is reclaimable.".to_string()],
                verification: "Recompile and confirm no missing-symbol errors after each removal.".to_string(),
                primary_target: FileTarget {
                    path: header.path.clone().into(),
                    action: Action::Remove,
                    note: "candidate for removal from redundant includers".to_string(),
                },
                secondary_targets: Vec::new(),
                before_code: None,
                after_code: None,
                is_safe: false,
            });

            for includer in header.included_by.iter().filter(|p| is_header_file(p)) {
                let move_savings = header.total_parse_time / (header.inclusion_count as u32 + 1);
                let target_label = format!("{}::{}", includer.display(), header.path);
                suggestions.push(super::Suggestion {
                    id: suggestion_id(SuggestionType::MoveToCpp, &target_label),
                    suggestion_type: SuggestionType::MoveToCpp,
                    priority: priority_for(move_savings, header.including_files),
                    confidence: 0.65,
                    estimated_savings: move_savings,
                    estimated_savings_percent: savings_percent(move_savings, total_time),
                    title: format!("Move usage of {} out of {}", header.path, includer.display()),
                    description: format!(
                        "{} only needs {} in its .cpp file, not its own header.",
                        includer.display(),
                        header.path
                    ),
                    rationale: "Keeping heavy includes out of headers limits their parse cost to a single translation unit.".to_string(),
                    implementation_steps: vec![
                        format!("Move the `#include \"{}\"` from {} into its corresponding .cpp file.", header.path, includer.display()),
                    ],
                    caveats: vec!["Only valid if the header itself does not need the included type in its own interface.".to_string()],
                    verification: "Recompile dependents of the includer after the move.".to_string(),
                    primary_target: FileTarget {
                        path: includer.clone(),
                        action: Action::Modify,
                        note: format!("move include of {} to .cpp", header.path),
                    },
                    secondary_targets: Vec::new(),
                    before_code: Some(format!("#include \"{}\"", header.path)),
                    after_code: None,
                    is_safe: false,
                });
            }
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
    use crate::aggregate::{AnalysisResult, DependencyAggregation, HeaderAggregate};
    use crate::model::CompilationUnit;
    use crate::suggest::SuggestOptions;
    use std::path::PathBuf;

    fn analysis_with(header: HeaderAggregate) -> AnalysisResult {
        AnalysisResult {
            dependencies: DependencyAggregation { headers: vec![header] },
            ..Default::default()
        }
    }

    #[test]
    fn flags_over_included_header_for_removal() {
        let header = HeaderAggregate {
            path: "heavy.h".to_string(),
            total_parse_time: Duration::from_millis(400),
            inclusion_count: 10,
            including_files: 2,
            included_by: Vec::new(),
        };
        let analysis = analysis_with(header);
        let units: Vec<CompilationUnit> = Vec::new();
        let options = SuggestOptions::default();
        let context = SuggestionContext {
            units: &units,
            analysis: &analysis,
            options: &options,
        };

        let result = IncludeRemovalSuggester.suggest(&context);
        assert_eq!(result.suggestions.len(), 1);
        assert_eq!(result.suggestions[0].estimated_savings, Duration::from_millis(100));
    }

    #[test]
    fn rejects_forward_named_headers() {
        let header = HeaderAggregate {
            path: "widget_fwd.h".to_string(),
            total_parse_time: Duration::from_millis(400),
            inclusion_count: 10,
            including_files: 2,
            included_by: Vec::new(),
        };
        let analysis = analysis_with(header);
        let units: Vec<CompilationUnit> = Vec::new();
        let options = SuggestOptions::default();
        let context = SuggestionContext {
            units: &units,
            analysis: &analysis,
            options: &options,
        };

        let result = IncludeRemovalSuggester.suggest(&context);
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn emits_move_to_cpp_for_header_includers() {
        let header = HeaderAggregate {
            path: "heavy.h".to_string(),
            total_parse_time: Duration::from_millis(400),
            inclusion_count: 10,
            including_files: 2,
            included_by: vec![PathBuf::from("other.h")],
        };
        let analysis = analysis_with(header);
        let units: Vec<CompilationUnit> = Vec::new();
        let options = SuggestOptions::default();
        let context = SuggestionContext {
            units: &units,
            analysis: &analysis,
            options: &options,
        };

        let result = IncludeRemovalSuggester.suggest(&context);
        assert_eq!(result.suggestions.len(), 2);
        assert!(result.suggestions.iter().any(|s| s.suggestion_type == SuggestionType::MoveToCpp));
    }
}
