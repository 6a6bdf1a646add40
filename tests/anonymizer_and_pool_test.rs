//! End-to-end: anonymizing a trace built from parsed units, and the bounded
//! thread pool used to parse them concurrently.

use bha::anonymize::BuildTrace;
use bha::graph::DependencyGraph;
use bha::model::{CompilationUnit, IncludeInfo};
use bha::{aggregate, AnonymizationConfig, Anonymizer, ThreadPool};
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn anonymizing_a_real_analyzed_trace_hides_paths_and_commit_deterministically() {
    let mut unit = CompilationUnit::new(PathBuf::from("/home/dev/secret_project/main.cpp"));
    unit.includes = vec![IncludeInfo {
        header: "/home/dev/secret_project/internal.h".to_string(),
        parse_time: Duration::from_millis(50),
    }];
    unit.finalize();

    let mut graph = DependencyGraph::new();
    graph.add_edge(
        "/home/dev/secret_project/main.cpp",
        bha::graph::canonical::direct_include_edge("/home/dev/secret_project/internal.h", 1.0),
    );

    let analysis = aggregate(std::slice::from_ref(&unit));

    let trace = BuildTrace {
        compilation_units: vec![unit],
        dependency_graph: graph,
        metrics: analysis.metrics,
        commit_sha: "deadbeefcafe".to_string(),
        branch: "feature/secret-work".to_string(),
    };

    let mut anonymizer = Anonymizer::new(AnonymizationConfig::default());
    let first_pass = anonymizer.anonymize_trace(&trace);
    let second_pass = anonymizer.anonymize_trace(&trace);

    assert_eq!(first_pass, second_pass, "repeated anonymization of the same trace must be idempotent");
    assert!(!first_pass.compilation_units[0]
        .source_file
        .to_string_lossy()
        .contains("secret_project"));
    assert_ne!(first_pass.commit_sha, trace.commit_sha);
}

#[test]
fn thread_pool_parallel_map_preserves_input_order() {
    let pool = ThreadPool::new(4);
    let items: Vec<u32> = (0..50).collect();
    let results = pool.parallel_map(items.clone(), |n| n * n).expect("pool accepts submissions");
    let expected: Vec<u32> = items.iter().map(|n| n * n).collect();
    assert_eq!(results, expected);
}
