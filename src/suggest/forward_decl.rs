//! Forward-declaration suggester (§4.5.2).

use super::{
    savings_percent, sort_by_savings_desc, suggestion_id, Action, FileTarget, Priority, Suggester,
    SuggestionContext, SuggestionResult, SuggestionType,
};
use std::path::Path;
use std::time::{Duration, Instant};

const MIN_PARSE_TIME: Duration = Duration::from_millis(20);
const HEADER_EXTENSIONS: &[&str] = &["h", "hpp", "hh", "hxx"];

/// Suggests replacing `#include` with a forward declaration at each
/// header-to-header inclusion site, one suggestion per (header, includer)
/// pair.
#[derive(Default)]
pub struct ForwardDeclarationSuggester;

fn is_header_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| HEADER_EXTENSIONS.iter().any(|h| h.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

fn priority_for(parse_time: Duration, includer_count: usize) -> Priority {
    if parse_time > Duration::from_millis(500) && includer_count >= 10 {
        Priority::Critical
    } else if parse_time > Duration::from_millis(200) && includer_count >= 5 {
        Priority::High
    } else if parse_time > Duration::from_millis(50) {
        Priority::Medium
    } else {
        Priority::Low
    }
}

impl Suggester for ForwardDeclarationSuggester {
    fn name(&self) -> &'static str {
        "forward_declaration"
    }

    fn suggestion_type(&self) -> SuggestionType {
        SuggestionType::ForwardDeclaration
    }

    fn suggest(&self, context: &SuggestionContext<'_>) -> SuggestionResult {
        let started = Instant::now();
        let total_time = context.total_time();

        let mut items_analyzed = 0usize;
        let mut items_skipped = 0usize;
        let mut suggestions = Vec::new();

        for header in &context.analysis.dependencies.headers {
            items_analyzed += 1;

            let header_includers: Vec<_> = header
                .included_by
                .iter()
                .filter(|path| is_header_file(path))
                .collect();

            if header.total_parse_time < MIN_PARSE_TIME || header_includers.is_empty() {
                items_skipped += 1;
                continue;
            }

            let per_occurrence = header.total_parse_time / header.inclusion_count.max(1) as u32;
            let priority = priority_for(header.total_parse_time, header_includers.len());

            for includer in &header_includers {
                let target_label = format!("{}::{}", includer.display(), header.path);
                suggestions.push(super::Suggestion {
                    id: suggestion_id(SuggestionType::ForwardDeclaration, &target_label),
                    suggestion_type: SuggestionType::ForwardDeclaration,
                    priority,
                    confidence: 0.75,
                    estimated_savings: per_occurrence,
                    estimated_savings_percent: savings_percent(per_occurrence, total_time),
                    title: format!("Forward-declare types from {} in {}", header.path, includer.display()),
                    description: format!(
                        "{} includes {} ({:.0} ms average parse cost) but may only need a forward declaration.",
                        includer.display(),
                        header.path,
                        per_occurrence.as_secs_f64() * 1000.0
                    ),
                    rationale: "Header-to-header includes compound parse cost across every downstream translation unit.".to_string(),
                    implementation_steps: vec![
                        format!("Replace `#include \"{}\"` in {} with forward declarations of the types actually used.", header.path, includer.display()),
                        "Move any definitions that need the full type into the .cpp file.".to_string(),
                    ],
                    caveats: vec!["Requires that only pointer/reference usages of the type appear in the header.".to_string()],
                    verification: "Recompile dependents and confirm no missing-definition errors.".to_string(),
                    primary_target: FileTarget {
                        path: (*includer).clone(),
                        action: Action::Modify,
                        note: format!("replace include of {} with a forward declaration", header.path),
                    },
                    secondary_targets: Vec::new(),
                    before_code: Some(format!("#include \"{}\"", header.path)),
                    after_code: Some("// forward declarations only".to_string()),
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

    #[test]
    fn emits_one_suggestion_per_header_includer_pair() {
        let header = HeaderAggregate {
            path: "widget.h".to_string(),
            total_parse_time: Duration::from_millis(300),
            inclusion_count: 2,
            including_files: 2,
            included_by: vec![PathBuf::from("gadget.h"), PathBuf::from("app.cpp")],
        };
        let analysis = AnalysisResult {
            dependencies: DependencyAggregation { headers: vec![header] },
            ..Default::default()
        };
        let units: Vec<CompilationUnit> = Vec::new();
        let options = SuggestOptions::default();
        let context = SuggestionContext {
            units: &units,
            analysis: &analysis,
            options: &options,
        };

        let result = ForwardDeclarationSuggester.suggest(&context);
        assert_eq!(result.suggestions.len(), 1);
        assert!(!result.suggestions[0].is_safe);
    }

    #[test]
    fn skips_headers_with_no_header_includer() {
        let header = HeaderAggregate {
            path: "widget.h".to_string(),
            total_parse_time: Duration::from_millis(300),
            inclusion_count: 1,
            including_files: 1,
            included_by: vec![PathBuf::from("app.cpp")],
        };
        let analysis = AnalysisResult {
            dependencies: DependencyAggregation { headers: vec![header] },
            ..Default::default()
        };
        let units: Vec<CompilationUnit> = Vec::new();
        let options = SuggestOptions::default();
        let context = SuggestionContext {
            units: &units,
            analysis: &analysis,
            options: &options,
        };

        let result = ForwardDeclarationSuggester.suggest(&context);
        assert!(result.suggestions.is_empty());
        assert_eq!(result.items_skipped, 1);
    }
}
