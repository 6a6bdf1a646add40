//! Precompiled-header suggester (§4.5.1).

use super::{
    savings_percent, sort_by_savings_desc, suggestion_id, Action, FileTarget, Priority, Suggester,
    SuggestionContext, SuggestionResult, SuggestionType,
};
use std::path::Path;
use std::time::{Duration, Instant};

const MIN_PARSE_TIME: Duration = Duration::from_millis(100);
const MIN_INCLUSION_COUNT: usize = 5;

/// Suggests adding a header to the project's precompiled header when it is
/// parsed often enough and expensively enough to be worth caching.
#[derive(Default)]
pub struct PchSuggester;

fn looks_pseudo_standard(header: &str) -> bool {
    let basename = Path::new(header)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(header);
    !basename.contains('.') || basename.starts_with("std")
}

fn priority_for(inclusion_count: usize, parse_time_ratio: f64) -> Priority {
    if inclusion_count >= 50 && parse_time_ratio > 0.05 {
        Priority::Critical
    } else if inclusion_count >= 20 && parse_time_ratio > 0.02 {
        Priority::High
    } else if inclusion_count >= 10 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

impl Suggester for PchSuggester {
    fn name(&self) -> &'static str {
        "pch"
    }

    fn suggestion_type(&self) -> SuggestionType {
        SuggestionType::PchOptimization
    }

    fn suggest(&self, context: &SuggestionContext<'_>) -> SuggestionResult {
        let started = Instant::now();
        let total_time = context.total_time();

        let mut items_analyzed = 0usize;
        let mut items_skipped = 0usize;
        let mut suggestions = Vec::new();

        for header in &context.analysis.dependencies.headers {
            items_analyzed += 1;

            if header.total_parse_time < MIN_PARSE_TIME
                || header.inclusion_count < MIN_INCLUSION_COUNT
                || looks_pseudo_standard(&header.path)
            {
                items_skipped += 1;
                continue;
            }

            let parse_time_ratio = if total_time.is_zero() {
                0.0
            } else {
                header.total_parse_time.as_secs_f64() / total_time.as_secs_f64()
            };

            let savings_per_unit = header.total_parse_time / header.inclusion_count as u32;
            let savings = savings_per_unit * (header.inclusion_count as u32 - 1);

            suggestions.push(super::Suggestion {
                id: suggestion_id(SuggestionType::PchOptimization, &header.path),
                suggestion_type: SuggestionType::PchOptimization,
                priority: priority_for(header.inclusion_count, parse_time_ratio),
                confidence: 0.9,
                estimated_savings: savings,
                estimated_savings_percent: savings_percent(savings, total_time),
                title: format!("Add {} to the precompiled header", header.path),
                description: format!(
                    "{} is parsed {} times, costing {:.0} ms total.",
                    header.path,
                    header.inclusion_count,
                    header.total_parse_time.as_secs_f64() * 1000.0
                ),
                rationale: "Repeated per-TU parsing of the same header is wasted work once it is stable enough to precompile.".to_string(),
                implementation_steps: vec![
                    format!("Add `#include \"{}\"` to the project's PCH source.", header.path),
                    "Rebuild and confirm the PCH is regenerated before dependents.".to_string(),
                ],
                caveats: vec!["PCH churn increases if the header changes frequently.".to_string()],
                verification: "Compare total build wall time before/after regenerating the PCH.".to_string(),
                primary_target: FileTarget {
                    path: header.path.clone().into(),
                    action: Action::Modify,
                    note: "candidate for precompilation".to_string(),
                },
                secondary_targets: Vec::new(),
                before_code: None,
                after_code: None,
                is_safe: true,
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
    use crate::aggregate::{AnalysisResult, DependencyAggregation, HeaderAggregate};
    use crate::model::{CompilationUnit, Metrics};
    use crate::suggest::SuggestOptions;

    fn unit_with_total(seconds: u64) -> CompilationUnit {
        let mut unit = CompilationUnit::new("main.cpp".into());
        unit.metrics = Metrics {
            total_time: Duration::from_secs(seconds),
            ..Default::default()
        };
        unit
    }

    #[test]
    fn pch_scenario_matches_spec_literal_example() {
        let header = HeaderAggregate {
            path: "expensive_header.h".to_string(),
            total_parse_time: Duration::from_millis(500),
            inclusion_count: 20,
            including_files: 15,
            included_by: Vec::new(),
        };
        let analysis = AnalysisResult {
            dependencies: DependencyAggregation { headers: vec![header] },
            ..Default::default()
        };
        let units = vec![unit_with_total(10)];
        let options = SuggestOptions::default();
        let context = SuggestionContext {
            units: &units,
            analysis: &analysis,
            options: &options,
        };

        let result = PchSuggester.suggest(&context);
        assert_eq!(result.suggestions.len(), 1);
        let suggestion = &result.suggestions[0];
        assert!(suggestion.is_safe);
        assert_eq!(suggestion.estimated_savings, Duration::from_millis(475));
        assert_eq!(suggestion.priority, Priority::High);
    }

    #[test]
    fn rejects_pseudo_standard_header_names() {
        assert!(looks_pseudo_standard("stdint.h"));
        assert!(looks_pseudo_standard("std_utils.h"));
        assert!(looks_pseudo_standard("noext"));
        assert!(!looks_pseudo_standard("widget.h"));
    }
}
