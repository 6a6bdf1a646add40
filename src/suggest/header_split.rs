//! Header split suggester (§4.5.5).

use super::{
    savings_percent, sort_by_savings_desc, suggestion_id, Action, FileTarget, Priority, Suggester,
    SuggestionContext, SuggestionResult, SuggestionType,
};
use std::path::Path;
use std::time::{Duration, Instant};

const MIN_PARSE_TIME: Duration = Duration::from_millis(200);
const MIN_INCLUDING_FILES: usize = 5;
const HEADER_EXTENSIONS: &[&str] = &["h", "hpp", "hh", "hxx"];
const ALREADY_SPLIT_MARKERS: &[&str] = &["_fwd", "_types", "_decl", "_impl", "_internal", "_detail"];

/// Split pattern a header is best suited for, chosen by filename heuristic
/// and fan-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SplitPattern {
    ForwardDecl,
    TypesAndFwd,
    FunctionalGroups,
    PublicPrivate,
}

impl SplitPattern {
    fn reduction_factor(self) -> f64 {
        match self {
            SplitPattern::ForwardDecl => 0.30,
            SplitPattern::TypesAndFwd => 0.25,
            SplitPattern::FunctionalGroups => 0.20,
            SplitPattern::PublicPrivate => 0.15,
        }
    }

    fn rationale_clause(self) -> &'static str {
        match self {
            SplitPattern::ForwardDecl => "This header would benefit from a forward-declaration header (_fwd.h) since many includers likely only need to reference types without seeing their full definition.",
            SplitPattern::TypesAndFwd => "Separating type definitions from forward declarations allows includers to choose the minimal header they need.",
            SplitPattern::FunctionalGroups => "This utility-style header contains multiple unrelated groups that could be split into focused headers.",
            SplitPattern::PublicPrivate => "Separating public API from internal details prevents external code from depending on implementation.",
        }
    }

    fn implementation_steps(self, filename: &str, fwd: &str, types: &str, internal: &str) -> Vec<String> {
        match self {
            SplitPattern::ForwardDecl => vec![
                "Identify classes and structs that can be forward-declared.".to_string(),
                format!("Create {fwd} with forward declarations."),
                format!("Update {filename} to include {fwd}."),
                "Audit includers: replace #include with forward decl where possible.".to_string(),
                "Run include-what-you-use (IWYU) to validate minimal includes.".to_string(),
                "Verify compilation and run tests.".to_string(),
            ],
            SplitPattern::TypesAndFwd => vec![
                "Separate type definitions from function declarations.".to_string(),
                format!("Create {fwd} with forward declarations."),
                format!("Create {types} with type definitions."),
                format!("Update {filename} to include both split headers."),
                "Update includers to use minimal required header.".to_string(),
                "Verify compilation and run tests.".to_string(),
            ],
            SplitPattern::FunctionalGroups => vec![
                "Identify logical groups of related functions/classes.".to_string(),
                "Create separate headers for each functional group.".to_string(),
                "Move declarations to appropriate group headers.".to_string(),
                format!("Update {filename} to include all group headers."),
                "Update includers to use specific group headers.".to_string(),
                "Consider deprecating the umbrella header.".to_string(),
                "Verify compilation and run tests.".to_string(),
            ],
            SplitPattern::PublicPrivate => vec![
                "Identify public API vs internal implementation details.".to_string(),
                format!("Create {internal} for internals."),
                format!("Keep {filename} as the public API header."),
                "Move internal details to the internal header.".to_string(),
                format!("Update internal code to use {internal}."),
                format!("Document that {filename} is the public interface."),
                "Verify compilation and run tests.".to_string(),
            ],
        }
    }
}

/// Suggests splitting a large, widely-included header into smaller, more
/// targeted ones.
#[derive(Default)]
pub struct HeaderSplitSuggester;

fn is_header_file(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| HEADER_EXTENSIONS.iter().any(|h| h.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

fn basename_lower(path: &str) -> String {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(path)
        .to_ascii_lowercase()
}

fn looks_already_split(path: &str) -> bool {
    let lower = basename_lower(path);
    ALREADY_SPLIT_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn determine_pattern(path: &str, including_files: usize) -> SplitPattern {
    let lower = basename_lower(path);
    if ["type", "struct", "enum"].iter().any(|m| lower.contains(m)) {
        SplitPattern::TypesAndFwd
    } else if ["util", "helper", "common"].iter().any(|m| lower.contains(m)) {
        SplitPattern::FunctionalGroups
    } else if including_files > 20 {
        SplitPattern::ForwardDecl
    } else if ["core", "main", "api"].iter().any(|m| lower.contains(m)) {
        SplitPattern::PublicPrivate
    } else {
        SplitPattern::ForwardDecl
    }
}

fn priority_for(parse_time: Duration, including_files: usize) -> Priority {
    let total_impact_ms = parse_time.as_secs_f64() * 1000.0 * including_files as f64;
    if parse_time > Duration::from_secs(1) && including_files >= 50 {
        Priority::Critical
    } else if parse_time > Duration::from_millis(500) && including_files >= 20 {
        Priority::High
    } else if (parse_time > Duration::from_millis(200) && including_files >= 10) || total_impact_ms > 5000.0 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

fn confidence_for(parse_time: Duration, including_files: usize, inclusion_count: usize) -> f64 {
    let time_confidence = if parse_time > Duration::from_secs(1) {
        0.9
    } else if parse_time > Duration::from_millis(500) {
        0.75
    } else if parse_time > Duration::from_millis(200) {
        0.6
    } else {
        0.4
    };

    let includer_confidence = (1.0_f64.min(((including_files + 1) as f64).ln() / 50.0_f64.ln())).max(0.0);

    let mut repetition_factor = 1.0;
    if including_files > 0 && inclusion_count > including_files {
        let avg_inclusions = inclusion_count as f64 / including_files as f64;
        if avg_inclusions > 2.0 {
            repetition_factor = 1.1;
        }
    }

    let confidence = (time_confidence * 0.6 + includer_confidence * 0.4) * repetition_factor;
    confidence.clamp(0.30, 0.95)
}

fn estimate_savings(parse_time: Duration, including_files: usize, pattern: SplitPattern) -> Duration {
    let includer_factor = ((including_files + 1) as f64).ln();
    parse_time.mul_f64(pattern.reduction_factor() * includer_factor)
}

fn split_name(path: &str, suffix: &str) -> String {
    let p = Path::new(path);
    let stem = p.file_stem().and_then(|s| s.to_str()).unwrap_or(path);
    let ext = p.extension().and_then(|e| e.to_str()).map(|e| format!(".{e}")).unwrap_or_default();
    format!("{stem}_{suffix}{ext}")
}

impl Suggester for HeaderSplitSuggester {
    fn name(&self) -> &'static str {
        "header_split"
    }

    fn suggestion_type(&self) -> SuggestionType {
        SuggestionType::HeaderSplit
    }

    fn suggest(&self, context: &SuggestionContext<'_>) -> SuggestionResult {
        let started = Instant::now();
        let total_time = context.total_time();

        let mut items_analyzed = 0usize;
        let mut items_skipped = 0usize;
        let mut suggestions = Vec::new();

        for header in &context.analysis.dependencies.headers {
            items_analyzed += 1;

            let eligible = is_header_file(&header.path)
                && header.total_parse_time >= MIN_PARSE_TIME
                && header.including_files >= MIN_INCLUDING_FILES
                && !looks_already_split(&header.path);

            if !eligible {
                items_skipped += 1;
                continue;
            }

            let pattern = determine_pattern(&header.path, header.including_files);
            let confidence = confidence_for(header.total_parse_time, header.including_files, header.inclusion_count);
            let priority = priority_for(header.total_parse_time, header.including_files);
            let savings = estimate_savings(header.total_parse_time, header.including_files, pattern);

            let filename = Path::new(&header.path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(&header.path)
                .to_string();
            let fwd = split_name(&header.path, "fwd");
            let types = split_name(&header.path, "types");
            let internal = split_name(&header.path, "internal");

            let mut description = format!(
                "Header '{}' takes {:.0} ms to parse and is included by {} files",
                header.path,
                header.total_parse_time.as_secs_f64() * 1000.0,
                header.including_files
            );
            if header.inclusion_count > header.including_files {
                description.push_str(&format!(" ({} total inclusions)", header.inclusion_count));
            }
            description.push_str(". Splitting into smaller, focused headers can reduce compile times when files only need a subset of declarations.");

            suggestions.push(super::Suggestion {
                id: suggestion_id(SuggestionType::HeaderSplit, &filename),
                suggestion_type: SuggestionType::HeaderSplit,
                priority,
                confidence,
                estimated_savings: savings,
                estimated_savings_percent: savings_percent(savings, total_time),
                title: format!("Consider splitting {filename}"),
                description,
                rationale: format!(
                    "Large, frequently-included headers cause unnecessary parsing overhead. {}",
                    pattern.rationale_clause()
                ),
                implementation_steps: pattern.implementation_steps(&filename, &fwd, &types, &internal),
                caveats: vec![
                    "Requires understanding of symbol dependencies between declarations.".to_string(),
                    "May require updating include statements in many files.".to_string(),
                    "Forward declarations cannot be used when the full type is needed (sizeof, members).".to_string(),
                    "Split headers need to be kept in sync with the main header.".to_string(),
                ],
                verification: "Create split headers incrementally, verifying compilation at each step, then measure compile time before/after.".to_string(),
                primary_target: FileTarget {
                    path: header.path.clone().into(),
                    action: Action::Modify,
                    note: "split into smaller, focused headers".to_string(),
                },
                secondary_targets: Vec::new(),
                before_code: Some(format!("// {filename}\n#pragma once\n\nclass MyClass {{ /* ... */ }};\nstruct MyStruct {{ /* ... */ }};\nvoid my_function();")),
                after_code: Some(format!(
                    "// {fwd} - forward declarations only\n#pragma once\nclass MyClass;\nstruct MyStruct;\n\n// {filename} - full header\n#pragma once\n#include \"{fwd}\"\nclass MyClass {{ /* ... */ }};\nvoid my_function();"
                )),
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
    use crate::aggregate::{AnalysisResult, DependencyAggregation, HeaderAggregate};
    use crate::model::CompilationUnit;
    use crate::suggest::SuggestOptions;

    fn header(path: &str, parse_ms: u64, including_files: usize, inclusion_count: usize) -> HeaderAggregate {
        HeaderAggregate {
            path: path.to_string(),
            total_parse_time: Duration::from_millis(parse_ms),
            inclusion_count,
            including_files,
            included_by: Vec::new(),
        }
    }

    #[test]
    fn suggests_split_for_large_widely_included_header() {
        let analysis = AnalysisResult {
            dependencies: DependencyAggregation { headers: vec![header("widget.h", 500, 15, 20)] },
            ..Default::default()
        };
        let units: Vec<CompilationUnit> = Vec::new();
        let options = SuggestOptions::default();
        let context = SuggestionContext { units: &units, analysis: &analysis, options: &options };

        let result = HeaderSplitSuggester.suggest(&context);
        assert_eq!(result.suggestions.len(), 1);
        assert!(!result.suggestions[0].is_safe);
        assert!(result.suggestions[0].confidence >= 0.30 && result.suggestions[0].confidence <= 0.95);
    }

    #[test]
    fn rejects_already_split_headers() {
        let analysis = AnalysisResult {
            dependencies: DependencyAggregation { headers: vec![header("widget_fwd.h", 500, 15, 20)] },
            ..Default::default()
        };
        let units: Vec<CompilationUnit> = Vec::new();
        let options = SuggestOptions::default();
        let context = SuggestionContext { units: &units, analysis: &analysis, options: &options };

        let result = HeaderSplitSuggester.suggest(&context);
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn picks_types_and_fwd_pattern_for_type_named_header() {
        assert_eq!(determine_pattern("my_types.h", 6), SplitPattern::TypesAndFwd);
        assert_eq!(determine_pattern("string_utils.h", 6), SplitPattern::FunctionalGroups);
        assert_eq!(determine_pattern("core_api.h", 6), SplitPattern::PublicPrivate);
        assert_eq!(determine_pattern("fanned_out.h", 25), SplitPattern::ForwardDecl);
    }
}
