//! End-to-end: parse a trace, aggregate it, and run the suggestion engine
//! over the result, through the crate's public API only.

use bha::model::IncludeInfo;
use bha::suggest::{sort_by_savings_desc, SuggestOptions, SuggestionContext};
use bha::{aggregate, default_registry, register_all_suggesters, CompilationUnit, CompilerType};
use std::path::PathBuf;
use std::time::Duration;

fn expensive_header_unit(index: usize) -> CompilationUnit {
    let json = r#"{"traceEvents":[
        {"name":"ExecuteCompiler","ph":"X","ts":0,"dur":10000000,"args":{"detail":"main.cpp"}}
    ]}"#;

    let parser = default_registry()
        .find_for_content(json)
        .expect("chrome-trace content should be recognized by some registered parser");
    assert_eq!(parser.compiler_type(), CompilerType::Clang);

    let source = PathBuf::from(format!("unit_{index}.cpp"));
    let mut unit = parser
        .parse_content(json, &source)
        .expect("valid chrome-trace content should parse");

    // A real build would have many units independently including the same
    // widely-shared, slow-to-parse header; synthesize that picture here so
    // the PCH suggester has something to find.
    unit.includes.push(IncludeInfo {
        header: "expensive_header.h".to_string(),
        parse_time: Duration::from_millis(500),
    });
    unit.finalize();
    unit
}

#[test]
fn pipeline_produces_sorted_suggestions_from_parsed_units() {
    let units: Vec<CompilationUnit> = (0..20).map(expensive_header_unit).collect();
    let analysis = aggregate(&units);

    assert_eq!(analysis.files.len(), 20);

    let options = SuggestOptions::default();
    let context = SuggestionContext {
        units: &units,
        analysis: &analysis,
        options: &options,
    };

    let registry = register_all_suggesters();
    let results = registry.suggest_all(&context);
    assert_eq!(results.len(), 7);

    let mut all_suggestions: Vec<_> =
        results.into_iter().flat_map(|(_, result)| result.suggestions).collect();
    sort_by_savings_desc(&mut all_suggestions);

    for window in all_suggestions.windows(2) {
        assert!(window[0].estimated_savings >= window[1].estimated_savings);
    }
    for suggestion in &all_suggestions {
        assert!((0.0..=1.0).contains(&suggestion.confidence));
    }
}

#[test]
fn unrelated_text_is_rejected_by_every_registered_parser() {
    for parser in default_registry().list() {
        assert!(!parser.can_parse_content("not a trace file at all"));
    }
}

#[test]
fn missing_trace_file_surfaces_not_found_not_parse_error() {
    let err = default_registry()
        .parse_trace_file(&PathBuf::from("/nonexistent/does-not-exist.json"))
        .unwrap_err();
    assert!(matches!(err, bha::Error::NotFound { .. }));
}
