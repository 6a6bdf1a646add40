//! Unity-build suggester (§4.5.7): groups source files that share enough
//! headers and compile fast enough together to pay off as a unity build,
//! using complete-linkage hierarchical clustering over a pairwise distance
//! matrix and a name-shape symbol-conflict check.

use super::{
    savings_percent, sort_by_savings_desc, suggestion_id, Action, FileTarget, Priority, Suggester,
    SuggestionContext, SuggestionResult, SuggestionType,
};
use crate::aggregate::{infer_linkage, SymbolLinkage};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};

const DISTANCE_THRESHOLD: f64 = 0.5;
const MAX_CLUSTER_SIZE: usize = 10;
const MAX_TIME_PER_GROUP: Duration = Duration::from_secs(30);
const MAX_MEMORY_PER_GROUP_BYTES: u64 = 4 * 1024 * 1024 * 1024;
const BYTES_PER_LINE_ESTIMATE: u64 = 10;

/// Kind of symbol collision two files risk when merged into a unity
/// translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolConflictType {
    StaticSymbol,
    AnonymousNamespace,
    MacroRedefinition,
    GlobalVariable,
}

impl SymbolConflictType {
    fn risk_weight(self) -> f64 {
        match self {
            SymbolConflictType::StaticSymbol => 1.0,
            SymbolConflictType::AnonymousNamespace => 0.8,
            SymbolConflictType::MacroRedefinition => 0.5,
            SymbolConflictType::GlobalVariable => 0.9,
        }
    }
}

/// One detected symbol collision between two files proposed for the same
/// unity group.
#[derive(Debug, Clone)]
pub struct SymbolConflict {
    pub file_a: PathBuf,
    pub file_b: PathBuf,
    pub symbol: String,
    pub conflict_type: SymbolConflictType,
}

/// Per-file metadata consulted when scoring a candidate unity group.
#[derive(Debug, Clone)]
pub struct UnityFileMeta {
    pub path: PathBuf,
    pub compile_time: Duration,
    pub includes: HashSet<String>,
    pub lines_of_code: u64,
}

struct Cluster {
    members: Vec<usize>,
}

fn jaccard_distance(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    if union == 0.0 {
        0.0
    } else {
        1.0 - intersection / union
    }
}

fn time_distance(a: Duration, b: Duration) -> f64 {
    let max = a.as_secs_f64().max(b.as_secs_f64());
    if max == 0.0 {
        return 0.0;
    }
    (a.as_secs_f64() - b.as_secs_f64()).abs() / max
}

fn directory_distance(a: &std::path::Path, b: &std::path::Path) -> f64 {
    match (a.parent(), b.parent()) {
        (Some(pa), Some(pb)) if pa == pb => 0.0,
        _ => 1.0,
    }
}

fn pairwise_distance(a: &UnityFileMeta, b: &UnityFileMeta) -> f64 {
    let include_dist = jaccard_distance(&a.includes, &b.includes);
    let time_dist = time_distance(a.compile_time, b.compile_time);
    let dir_dist = directory_distance(&a.path, &b.path);
    0.6 * include_dist + 0.2 * time_dist + 0.2 * dir_dist
}

fn build_distance_matrix(files: &[UnityFileMeta]) -> Vec<Vec<f64>> {
    let n = files.len();
    let mut matrix = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = pairwise_distance(&files[i], &files[j]);
            matrix[i][j] = d;
            matrix[j][i] = d;
        }
    }
    matrix
}

/// Complete-linkage agglomerative clustering: merges the two clusters whose
/// maximum pairwise distance is smallest, stopping once every remaining pair
/// exceeds `DISTANCE_THRESHOLD` or a merge would exceed `max_cluster_size`.
fn cluster_files(matrix: &[Vec<f64>], max_cluster_size: usize) -> Vec<Cluster> {
    let n = matrix.len();
    let mut clusters: Vec<Cluster> = (0..n).map(|i| Cluster { members: vec![i] }).collect();

    loop {
        let mut best: Option<(usize, usize, f64)> = None;
        for i in 0..clusters.len() {
            for j in (i + 1)..clusters.len() {
                if clusters[i].members.len() + clusters[j].members.len() > max_cluster_size {
                    continue;
                }
                let complete_linkage = clusters[i]
                    .members
                    .iter()
                    .flat_map(|&a| clusters[j].members.iter().map(move |&b| matrix[a][b]))
                    .fold(0.0_f64, f64::max);

                if best.map(|(_, _, d)| complete_linkage < d).unwrap_or(true) {
                    best = Some((i, j, complete_linkage));
                }
            }
        }

        match best {
            Some((i, j, distance)) if distance <= DISTANCE_THRESHOLD => {
                let merged = clusters[j].members.clone();
                clusters[i].members.extend(merged);
                clusters.remove(j);
            }
            _ => break,
        }
    }

    clusters
}

fn detect_conflicts(files: &[&UnityFileMeta], symbols_by_file: &HashMap<PathBuf, Vec<String>>) -> Vec<SymbolConflict> {
    let mut conflicts = Vec::new();
    for i in 0..files.len() {
        for j in (i + 1)..files.len() {
            let empty = Vec::new();
            let symbols_a = symbols_by_file.get(&files[i].path).unwrap_or(&empty);
            let symbols_b = symbols_by_file.get(&files[j].path).unwrap_or(&empty);

            for symbol in symbols_a {
                if symbols_b.contains(symbol) {
                    let conflict_type = match infer_linkage(symbol) {
                        SymbolLinkage::Static => SymbolConflictType::StaticSymbol,
                        SymbolLinkage::AnonymousNamespace => SymbolConflictType::AnonymousNamespace,
                        SymbolLinkage::External => continue,
                    };
                    conflicts.push(SymbolConflict {
                        file_a: files[i].path.clone(),
                        file_b: files[j].path.clone(),
                        symbol: symbol.clone(),
                        conflict_type,
                    });
                }
            }
        }
    }
    conflicts
}

fn conflict_risk(conflicts: &[SymbolConflict]) -> f64 {
    conflicts
        .iter()
        .map(|c| c.conflict_type.risk_weight())
        .fold(0.0_f64, f64::max)
        .min(1.0)
}

fn header_ratio_for(common_include_count: usize) -> f64 {
    if common_include_count > 30 {
        0.60
    } else if common_include_count > 15 {
        0.55
    } else if common_include_count >= 5 {
        0.50
    } else {
        0.40
    }
}

fn common_include_count(members: &[&UnityFileMeta]) -> usize {
    let mut iter = members.iter();
    let Some(first) = iter.next() else { return 0 };
    let mut common = first.includes.clone();
    for file in iter {
        common.retain(|h| file.includes.contains(h));
    }
    common.len()
}

fn priority_for(total_compile_time: Duration, file_count: usize, conflict_risk: f64) -> Priority {
    if conflict_risk > 0.8 {
        return Priority::Low;
    }
    let ms = total_compile_time.as_secs_f64() * 1000.0;
    let score = file_count as f64 * (ms + 1.0).ln() * (1.0 - conflict_risk);
    if score > 50.0 && file_count >= 5 {
        Priority::High
    } else if score > 20.0 && file_count >= 3 {
        Priority::Medium
    } else {
        Priority::Low
    }
}

fn memory_estimate_bytes(members: &[&UnityFileMeta]) -> u64 {
    let estimates: Vec<u64> = members.iter().map(|m| m.lines_of_code * BYTES_PER_LINE_ESTIMATE).collect();
    let max = estimates.iter().copied().max().unwrap_or(0);
    let sum: u64 = estimates.iter().sum();
    max + (0.3 * (sum.saturating_sub(max)) as f64) as u64
}

/// Suggests merging a cluster of files sharing headers and directories into
/// a single unity translation unit.
#[derive(Default)]
pub struct UnityBuildSuggester;

impl Suggester for UnityBuildSuggester {
    fn name(&self) -> &'static str {
        "unity_build"
    }

    fn suggestion_type(&self) -> SuggestionType {
        SuggestionType::UnityBuild
    }

    fn suggest(&self, context: &SuggestionContext<'_>) -> SuggestionResult {
        let started = Instant::now();
        let total_time = context.total_time();

        let files: Vec<UnityFileMeta> = context
            .units
            .iter()
            .map(|unit| UnityFileMeta {
                path: unit.source_file.clone(),
                compile_time: unit.metrics.total_time,
                includes: unit.includes.iter().map(|i| i.header.clone()).collect(),
                lines_of_code: context
                    .analysis
                    .files
                    .iter()
                    .find(|f| f.file == unit.source_file)
                    .map(|f| f.lines_of_code as u64)
                    .unwrap_or(0),
            })
            .collect();

        let items_analyzed = files.len();
        let mut items_skipped = 0usize;
        let mut suggestions = Vec::new();

        if files.len() < 2 {
            return SuggestionResult {
                suggestions,
                items_analyzed,
                items_skipped: items_analyzed,
                generation_time: started.elapsed(),
            };
        }

        let symbols_by_file: HashMap<PathBuf, Vec<String>> = context
            .analysis
            .symbols
            .symbols
            .iter()
            .fold(HashMap::new(), |mut acc, symbol| {
                acc.entry(symbol.defined_in.clone()).or_insert_with(Vec::new).push(symbol.name.clone());
                acc
            });

        // Bucket by parent directory ("module") first; clustering only ever
        // runs within a bucket, never across directories.
        let mut buckets: HashMap<Option<PathBuf>, Vec<usize>> = HashMap::new();
        for (i, file) in files.iter().enumerate() {
            buckets.entry(file.path.parent().map(|p| p.to_path_buf())).or_default().push(i);
        }

        let mut clusters: Vec<Cluster> = Vec::new();
        let mut bucket_keys: Vec<_> = buckets.keys().cloned().collect();
        bucket_keys.sort();
        for key in bucket_keys {
            let indices = &buckets[&key];
            if indices.len() < 2 {
                items_skipped += indices.len();
                continue;
            }
            let bucket_files: Vec<UnityFileMeta> = indices.iter().map(|&i| files[i].clone()).collect();
            let matrix = build_distance_matrix(&bucket_files);
            for local_cluster in cluster_files(&matrix, MAX_CLUSTER_SIZE) {
                let members = local_cluster.members.iter().map(|&local| indices[local]).collect();
                clusters.push(Cluster { members });
            }
        }

        for cluster in clusters {
            if cluster.members.len() < 2 {
                items_skipped += 1;
                continue;
            }

            let members: Vec<&UnityFileMeta> = cluster.members.iter().map(|&i| &files[i]).collect();
            let conflicts = detect_conflicts(&members, &symbols_by_file);
            let risk = conflict_risk(&conflicts);

            if risk > 0.9 {
                items_skipped += 1;
                continue;
            }

            let total_compile_time: Duration = members.iter().map(|m| m.compile_time).sum();
            let memory_estimate = memory_estimate_bytes(&members);

            if total_compile_time > MAX_TIME_PER_GROUP || memory_estimate > MAX_MEMORY_PER_GROUP_BYTES {
                items_skipped += 1;
                continue;
            }

            let n = members.len() as f64;
            let shared_ratio = header_ratio_for(common_include_count(&members)) + 0.10;
            let savings = total_compile_time.mul_f64(shared_ratio * (n - 1.0) / n * (1.0 - 0.5 * risk));

            let priority = priority_for(total_compile_time, members.len(), risk);
            let confidence = (0.85 - 0.5 * risk).clamp(0.0, 0.95);

            let group_label = members
                .iter()
                .map(|m| m.path.file_stem().and_then(|s| s.to_str()).unwrap_or("unit"))
                .collect::<Vec<_>>()
                .join("_");
            let unity_filename = format!("unity_{group_label}.cpp");

            let file_list = members
                .iter()
                .map(|m| format!("#include \"{}\"", m.path.display()))
                .collect::<Vec<_>>()
                .join("\n");

            let mut caveats = vec![
                "All files in the group must compile together without macro or symbol collisions.".to_string(),
                "Incremental rebuilds touch the whole unity unit when any member file changes.".to_string(),
                "Parallel compilation across the group is lost (single translation unit).".to_string(),
            ];
            if !conflicts.is_empty() {
                caveats.push(format!(
                    "{} potential symbol collision(s) detected; rename before merging (e.g. '{}').",
                    conflicts.len(),
                    conflicts[0].symbol
                ));
            }

            suggestions.push(super::Suggestion {
                id: suggestion_id(SuggestionType::UnityBuild, &unity_filename),
                suggestion_type: SuggestionType::UnityBuild,
                priority,
                confidence,
                estimated_savings: savings,
                estimated_savings_percent: savings_percent(savings, total_time),
                title: format!("Merge {} files into a unity build", members.len()),
                description: format!(
                    "{} files sharing {} common includes compile in {:.0} ms total. Combining them into {} could amortize header parsing across the group.",
                    members.len(),
                    common_include_count(&members),
                    total_compile_time.as_secs_f64() * 1000.0,
                    unity_filename
                ),
                rationale: "Files that share most of their includes and compile in similar time cluster naturally into one unity translation unit, so shared headers are parsed once instead of once per file.".to_string(),
                implementation_steps: vec![
                    format!("Create {unity_filename}."),
                    format!("Add includes for each member source file:\n{file_list}"),
                    "Remove the member files from the normal build and build the unity file instead.".to_string(),
                    "Resolve any symbol or macro collisions surfaced by the combined compile.".to_string(),
                ],
                caveats,
                verification: "Compile the unity file, run the existing test suite, and compare total build time against the separately-compiled baseline.".to_string(),
                primary_target: FileTarget {
                    path: unity_filename.clone().into(),
                    action: Action::Create,
                    note: format!("unity translation unit for {} files", members.len()),
                },
                secondary_targets: members
                    .iter()
                    .map(|m| FileTarget {
                        path: m.path.clone(),
                        action: Action::Remove,
                        note: "excluded from normal build, compiled via the unity file".to_string(),
                    })
                    .collect(),
                before_code: None,
                after_code: Some(format!("// {unity_filename}\n{file_list}")),
                is_safe: conflicts.is_empty(),
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

    fn unit_with(path: &str, compile_ms: u64, includes: &[&str]) -> CompilationUnit {
        let mut unit = CompilationUnit::new(PathBuf::from(path));
        unit.metrics.total_time = Duration::from_millis(compile_ms);
        unit.includes = includes
            .iter()
            .map(|h| IncludeInfo { header: h.to_string(), parse_time: Duration::from_millis(5) })
            .collect();
        unit.finalize();
        unit
    }

    #[test]
    fn clusters_files_sharing_headers_into_unity_group() {
        let units = vec![
            unit_with("src/a.cpp", 100, &["common.h", "util.h"]),
            unit_with("src/b.cpp", 110, &["common.h", "util.h"]),
            unit_with("src/c.cpp", 120, &["common.h", "util.h"]),
        ];
        let analysis = AnalysisResult::default();
        let options = SuggestOptions::default();
        let context = SuggestionContext { units: &units, analysis: &analysis, options: &options };

        let result = UnityBuildSuggester.suggest(&context);
        assert_eq!(result.items_analyzed, 3);
        assert!(!result.suggestions.is_empty());
        assert!(result.suggestions[0].is_safe);
    }

    #[test]
    fn skips_single_file_input() {
        let units = vec![unit_with("src/a.cpp", 100, &["common.h"])];
        let analysis = AnalysisResult::default();
        let options = SuggestOptions::default();
        let context = SuggestionContext { units: &units, analysis: &analysis, options: &options };

        let result = UnityBuildSuggester.suggest(&context);
        assert!(result.suggestions.is_empty());
    }

    #[test]
    fn jaccard_distance_is_zero_for_identical_include_sets() {
        let a: HashSet<String> = ["x.h", "y.h"].iter().map(|s| s.to_string()).collect();
        let b = a.clone();
        assert_eq!(jaccard_distance(&a, &b), 0.0);
    }

    #[test]
    fn conflict_risk_is_zero_with_no_conflicts() {
        assert_eq!(conflict_risk(&[]), 0.0);
    }
}
