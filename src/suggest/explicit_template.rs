//! Explicit template instantiation suggester (§4.5.4).

use super::{
    savings_percent, sort_by_savings_desc, suggestion_id, Action, FileTarget, Priority, Suggester,
    SuggestionContext, SuggestionResult, SuggestionType,
};
use std::time::{Duration, Instant};

const MIN_INSTANTIATION_COUNT: u32 = 3;
const MIN_TOTAL_TIME: Duration = Duration::from_millis(50);

/// Suggests explicitly instantiating (and `extern template`-declaring)
/// templates that are instantiated redundantly across many translation
/// units.
#[derive(Default)]
pub struct ExplicitTemplateSuggester;

fn priority_for(total_time: Duration, instantiation_count: u32, time_ratio: f64) -> Priority {
    if total_time > Duration::from_secs(5) && instantiation_count >= 50 {
        Priority::Critical
    } else if total_time > Duration::from_secs(1) && instantiation_count >= 20 {
        Priority::High
    } else if time_ratio > 0.01 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

fn short_name(full_signature: &str) -> &str {
    match full_signature.find('<') {
        Some(angle_pos) => match full_signature[..angle_pos].rfind("::") {
            Some(last_colon) => &full_signature[last_colon + 2..angle_pos],
            None => &full_signature[..angle_pos],
        },
        None => full_signature,
    }
}

impl Suggester for ExplicitTemplateSuggester {
    fn name(&self) -> &'static str {
        "explicit_template"
    }

    fn suggestion_type(&self) -> SuggestionType {
        SuggestionType::ExplicitTemplate
    }

    fn suggest(&self, context: &SuggestionContext<'_>) -> SuggestionResult {
        let started = Instant::now();
        let total_time = context.total_time();

        let mut items_analyzed = 0usize;
        let mut items_skipped = 0usize;
        let mut suggestions = Vec::new();

        for template in &context.analysis.templates.templates {
            items_analyzed += 1;

            let name = if !template.full_signature.is_empty() {
                template.full_signature.as_str()
            } else {
                template.name.as_str()
            };

            let eligible = template.instantiation_count >= MIN_INSTANTIATION_COUNT
                && template.total_time >= MIN_TOTAL_TIME
                && !name.starts_with("std::")
                && !name.starts_with("testing::");

            if !eligible {
                items_skipped += 1;
                continue;
            }

            let time_ratio = if total_time.is_zero() {
                0.0
            } else {
                template.total_time.as_secs_f64() / total_time.as_secs_f64()
            };

            let savings = template.total_time * (template.instantiation_count - 1)
                / template.instantiation_count;
            let short = short_name(name);

            suggestions.push(super::Suggestion {
                id: suggestion_id(SuggestionType::ExplicitTemplate, name),
                suggestion_type: SuggestionType::ExplicitTemplate,
                priority: priority_for(template.total_time, template.instantiation_count, time_ratio),
                confidence: 0.7,
                estimated_savings: savings,
                estimated_savings_percent: savings_percent(savings, total_time),
                title: format!("Add explicit instantiation for {short}"),
                description: format!(
                    "Template '{}' is instantiated {} times with total time of {:.0} ms. Using explicit instantiation eliminates redundant instantiations.",
                    name,
                    template.instantiation_count,
                    template.total_time.as_secs_f64() * 1000.0
                ),
                rationale: "Explicit template instantiation forces the compiler to instantiate a template in a single translation unit, while extern template prevents duplicate instantiations in other units.".to_string(),
                implementation_steps: vec![
                    "Create template_instantiations.cpp (or similar).".to_string(),
                    format!("Add explicit instantiation: template class {name};"),
                    format!("Add extern template in header: extern template class {name};"),
                    "Rebuild and verify link succeeds.".to_string(),
                ],
                caveats: vec![
                    "Requires identifying all type arguments used.".to_string(),
                    "Must instantiate for each combination of template arguments.".to_string(),
                    "Header users must see extern template before implicit use.".to_string(),
                ],
                verification: "Check that total template time decreases in next trace.".to_string(),
                primary_target: FileTarget {
                    path: "template_instantiations.cpp".into(),
                    action: Action::Create,
                    note: "create file for explicit instantiations".to_string(),
                },
                secondary_targets: Vec::new(),
                before_code: Some("// implicit instantiation in each TU".to_string()),
                after_code: Some(format!(
                    "// in template_instantiations.cpp:\ntemplate class {name};\n\n// in header or using files:\nextern template class {name};"
                )),
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
    use crate::aggregate::{AnalysisResult, TemplateAggregate, TemplateAggregation};
    use crate::model::CompilationUnit;
    use crate::suggest::SuggestOptions;
    use std::path::PathBuf;

    fn unit_with_total(seconds: u64) -> CompilationUnit {
        let mut unit = CompilationUnit::new(PathBuf::from("main.cpp"));
        unit.metrics.total_time = Duration::from_secs(seconds);
        unit
    }

    #[test]
    fn template_scenario_matches_spec_literal_example() {
        let template = TemplateAggregate {
            name: "MyContainer".to_string(),
            full_signature: "MyContainer<int>".to_string(),
            total_time: Duration::from_millis(500),
            instantiation_count: 20,
            files_using: Vec::new(),
        };
        let analysis = AnalysisResult {
            templates: TemplateAggregation { templates: vec![template] },
            ..Default::default()
        };
        let units = vec![unit_with_total(60)];
        let options = SuggestOptions::default();
        let context = SuggestionContext {
            units: &units,
            analysis: &analysis,
            options: &options,
        };

        let result = ExplicitTemplateSuggester.suggest(&context);
        assert_eq!(result.suggestions.len(), 1);
        let suggestion = &result.suggestions[0];
        assert!(suggestion.is_safe);
        assert_eq!(suggestion.estimated_savings, Duration::from_millis(475));
    }

    #[test]
    fn rejects_std_templates() {
        let template = TemplateAggregate {
            name: "vector".to_string(),
            full_signature: "std::vector<int>".to_string(),
            total_time: Duration::from_millis(500),
            instantiation_count: 100,
            files_using: Vec::new(),
        };
        let analysis = AnalysisResult {
            templates: TemplateAggregation { templates: vec![template] },
            ..Default::default()
        };
        let units: Vec<CompilationUnit> = Vec::new();
        let options = SuggestOptions::default();
        let context = SuggestionContext {
            units: &units,
            analysis: &analysis,
            options: &options,
        };

        let result = ExplicitTemplateSuggester.suggest(&context);
        assert!(result.suggestions.is_empty());
        assert!(result.items_skipped >= 1);
    }

    #[test]
    fn short_name_strips_namespace_and_arguments() {
        assert_eq!(short_name("ns::MyContainer<int>"), "MyContainer");
        assert_eq!(short_name("MyContainer<int>"), "MyContainer");
        assert_eq!(short_name("PlainName"), "PlainName");
    }
}
