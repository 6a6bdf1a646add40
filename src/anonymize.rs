//! Trace anonymizer (§4.6): deterministic, idempotent path/commit renaming
//! that preserves directory structure without exposing real identifiers.
//!
//! Grounded on `examples/original_source/sources/bha/security/anonymizer.cpp`:
//! SHA-256 (truncated) hashing for paths, sequential short-id assignment for
//! commit SHAs, and memoized per-instance mappings so repeated calls on the
//! same input return the same token.

use crate::aggregate::MetricsSummary;
use crate::graph::DependencyGraph;
use crate::model::{CompilationUnit, DependencyEdge};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Configuration controlling what an `Anonymizer` rewrites and how.
#[derive(Debug, Clone)]
pub struct AnonymizationConfig {
    pub anonymize_paths: bool,
    pub anonymize_commit_info: bool,
    pub preserve_extensions: bool,
    pub preserve_directory_structure: bool,
    pub replacement_root: String,
    pub preserve_patterns: Vec<String>,
}

impl Default for AnonymizationConfig {
    fn default() -> Self {
        Self {
            anonymize_paths: true,
            anonymize_commit_info: true,
            preserve_extensions: true,
            preserve_directory_structure: true,
            replacement_root: "/project".to_string(),
            preserve_patterns: Vec::new(),
        }
    }
}

/// The raw, possibly sensitive build trace an `Anonymizer` consumes and
/// returns an anonymized copy of (§4.6 "Trace anonymization").
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildTrace {
    pub compilation_units: Vec<CompilationUnit>,
    pub dependency_graph: DependencyGraph,
    pub metrics: MetricsSummary,
    pub commit_sha: String,
    pub branch: String,
}

/// Rewrites paths and commit metadata in a `BuildTrace` to deterministic,
/// non-identifying substitutes. One `Anonymizer` instance memoizes its
/// mappings so the same input always produces the same output for the
/// lifetime of the instance.
pub struct Anonymizer {
    config: AnonymizationConfig,
    path_mapping: HashMap<String, String>,
    commit_mapping: HashMap<String, String>,
    commit_counter: u64,
}

fn hash_string(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let full = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
    full[..16].to_string()
}

impl Anonymizer {
    pub fn new(config: AnonymizationConfig) -> Self {
        Self {
            config,
            path_mapping: HashMap::new(),
            commit_mapping: HashMap::new(),
            commit_counter: 0,
        }
    }

    /// Anonymizes every path-bearing field of `trace`, plus `commit_sha` and
    /// `branch` when their respective config flags are set. Each category is
    /// gated independently.
    pub fn anonymize_trace(&mut self, trace: &BuildTrace) -> BuildTrace {
        let mut anonymized = trace.clone();

        if self.config.anonymize_paths {
            for unit in &mut anonymized.compilation_units {
                unit.source_file = PathBuf::from(self.anonymize_path(&unit.source_file.to_string_lossy()));
                for include in &mut unit.includes {
                    include.header = self.anonymize_path(&include.header);
                }
            }

            let mut new_graph = DependencyGraph::new();
            for node in trace.dependency_graph.nodes() {
                new_graph.add_node(self.anonymize_path(node));
            }
            for node in trace.dependency_graph.nodes() {
                let anon_source = self.anonymize_path(node);
                for edge in trace.dependency_graph.edges_from(node) {
                    let anon_edge = DependencyEdge {
                        target: self.anonymize_path(&edge.target),
                        ..edge.clone()
                    };
                    new_graph.add_edge(anon_source.clone(), anon_edge);
                }
            }
            anonymized.dependency_graph = new_graph;

            anonymized.metrics.top_slow_files = trace
                .metrics
                .top_slow_files
                .iter()
                .map(|p| PathBuf::from(self.anonymize_path(&p.to_string_lossy())))
                .collect();
        }

        if self.config.anonymize_commit_info {
            anonymized.commit_sha = self.anonymize_commit_sha(&trace.commit_sha);
            anonymized.branch = format!("branch_{}", self.commit_counter);
            self.commit_counter += 1;
        }

        anonymized
    }

    /// Anonymizes a single filesystem path. Deterministic and idempotent:
    /// repeated calls with the same input return the same output.
    pub fn anonymize_path(&mut self, path: &str) -> String {
        if self.should_preserve_path(path) {
            return path.to_string();
        }

        if let Some(existing) = self.path_mapping.get(path) {
            return existing.clone();
        }

        let anonymous = self.generate_anonymous_path(path);
        self.path_mapping.insert(path.to_string(), anonymous.clone());
        anonymous
    }

    /// Anonymizes a commit SHA. Empty input maps to empty output; otherwise
    /// SHAs are assigned sequential tokens as they are first seen.
    pub fn anonymize_commit_sha(&mut self, sha: &str) -> String {
        if sha.is_empty() {
            return String::new();
        }

        if let Some(existing) = self.commit_mapping.get(sha) {
            return existing.clone();
        }

        let anonymous = self.generate_anonymous_commit();
        self.commit_mapping.insert(sha.to_string(), anonymous.clone());
        anonymous
    }

    /// Resets all internal mappings and counters so future anonymizations
    /// start fresh.
    pub fn clear_mapping(&mut self) {
        self.path_mapping.clear();
        self.commit_mapping.clear();
        self.commit_counter = 0;
    }

    pub fn path_mapping(&self) -> &HashMap<String, String> {
        &self.path_mapping
    }

    fn should_preserve_path(&self, path: &str) -> bool {
        self.config.preserve_patterns.iter().any(|pattern| path.contains(pattern.as_str()))
    }

    fn generate_anonymous_path(&self, original: &str) -> String {
        let p = Path::new(original);

        let extension = if self.config.preserve_extensions {
            p.extension().and_then(|e| e.to_str()).map(|e| format!(".{e}")).unwrap_or_default()
        } else {
            String::new()
        };

        let filename = format!("file_{}{}", &hash_string(original)[..8], extension);

        if self.config.preserve_directory_structure {
            if let Some(parent) = p.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                let dir_hash = hash_string(&parent.to_string_lossy());
                return format!("{}/dir_{}/{}", self.config.replacement_root, &dir_hash[..8], filename);
            }
        }

        format!("{}/{}", self.config.replacement_root, filename)
    }

    fn generate_anonymous_commit(&mut self) -> String {
        let short_id = format!("{:08x}", self.commit_counter);
        self.commit_counter += 1;
        format!("{short_id}{}", "0".repeat(32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::IncludeInfo;
    use std::time::Duration;

    #[test]
    fn anonymize_path_is_idempotent() {
        let mut anonymizer = Anonymizer::new(AnonymizationConfig::default());
        let first = anonymizer.anonymize_path("/home/user/file.cpp");
        let second = anonymizer.anonymize_path("/home/user/file.cpp");
        assert_eq!(first, second);
    }

    #[test]
    fn anonymize_path_preserves_extension_and_directory_hash() {
        let mut anonymizer = Anonymizer::new(AnonymizationConfig::default());
        let anon = anonymizer.anonymize_path("/home/user/project/widget.cpp");
        assert!(anon.starts_with("/project/dir_"));
        assert!(anon.ends_with(".cpp"));
    }

    #[test]
    fn distinct_paths_map_to_distinct_tokens() {
        let mut anonymizer = Anonymizer::new(AnonymizationConfig::default());
        let a = anonymizer.anonymize_path("/home/user/a.cpp");
        let b = anonymizer.anonymize_path("/home/user/b.cpp");
        assert_ne!(a, b);
    }

    #[test]
    fn preserve_pattern_exempts_matching_paths() {
        let config = AnonymizationConfig {
            preserve_patterns: vec!["vendor/".to_string()],
            ..AnonymizationConfig::default()
        };
        let mut anonymizer = Anonymizer::new(config);
        let path = "/home/user/vendor/lib.h";
        assert_eq!(anonymizer.anonymize_path(path), path);
    }

    #[test]
    fn commit_sha_anonymization_empty_maps_to_empty() {
        let mut anonymizer = Anonymizer::new(AnonymizationConfig::default());
        assert_eq!(anonymizer.anonymize_commit_sha(""), "");
    }

    #[test]
    fn commit_sha_anonymization_is_idempotent_and_sequential() {
        let mut anonymizer = Anonymizer::new(AnonymizationConfig::default());
        let first = anonymizer.anonymize_commit_sha("abc123");
        let again = anonymizer.anonymize_commit_sha("abc123");
        assert_eq!(first, again);
        assert_eq!(first.len(), 40);
        assert!(first.ends_with(&"0".repeat(32)));

        let second_sha = anonymizer.anonymize_commit_sha("def456");
        assert_ne!(first, second_sha);
    }

    #[test]
    fn clear_mapping_resets_state() {
        let mut anonymizer = Anonymizer::new(AnonymizationConfig::default());
        let first = anonymizer.anonymize_path("/home/user/file.cpp");
        anonymizer.clear_mapping();
        assert!(anonymizer.path_mapping().is_empty());
        let after_clear = anonymizer.anonymize_path("/home/user/file.cpp");
        assert_eq!(first, after_clear);
    }

    #[test]
    fn anonymize_trace_rewrites_unit_paths_and_commit_info() {
        let mut unit = CompilationUnit::new(PathBuf::from("/home/user/main.cpp"));
        unit.includes = vec![IncludeInfo {
            header: "/home/user/common.h".to_string(),
            parse_time: Duration::from_millis(10),
        }];
        unit.finalize();

        let mut graph = DependencyGraph::new();
        graph.add_edge(
            "/home/user/main.cpp",
            crate::graph::canonical::direct_include_edge("/home/user/common.h", 1.0),
        );

        let trace = BuildTrace {
            compilation_units: vec![unit],
            dependency_graph: graph,
            metrics: MetricsSummary::default(),
            commit_sha: "abc123".to_string(),
            branch: "main".to_string(),
        };

        let mut anonymizer = Anonymizer::new(AnonymizationConfig::default());
        let anonymized = anonymizer.anonymize_trace(&trace);

        assert_ne!(anonymized.compilation_units[0].source_file, trace.compilation_units[0].source_file);
        assert_ne!(anonymized.commit_sha, trace.commit_sha);
        assert_eq!(anonymized.branch, "branch_0");
        assert_eq!(anonymized.dependency_graph.node_count(), 2);
    }
}
