//! Suggestion engine (§4.4/§4.5): a registry of `Suggester`s that turn an
//! `AnalysisResult` into scored, prioritized refactoring recommendations.

mod explicit_template;
mod forward_decl;
mod header_split;
mod include_removal;
mod pch;
mod pimpl;
mod unity_build;

pub use explicit_template::ExplicitTemplateSuggester;
pub use forward_decl::ForwardDeclarationSuggester;
pub use header_split::HeaderSplitSuggester;
pub use include_removal::IncludeRemovalSuggester;
pub use pch::PchSuggester;
pub use pimpl::PimplSuggester;
pub use unity_build::{SymbolConflict, SymbolConflictType, UnityBuildSuggester, UnityFileMeta};

use crate::aggregate::AnalysisResult;
use crate::model::CompilationUnit;
use std::path::PathBuf;
use std::time::Duration;

/// Kind of refactoring a `Suggestion` recommends (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SuggestionType {
    PchOptimization,
    ForwardDeclaration,
    IncludeRemoval,
    MoveToCpp,
    ExplicitTemplate,
    HeaderSplit,
    UnityBuild,
    PimplPattern,
}

impl SuggestionType {
    /// Stable prefix used by `suggestion_id` (§4.4 deterministic IDs).
    fn id_prefix(self) -> &'static str {
        match self {
            SuggestionType::PchOptimization => "pch",
            SuggestionType::ForwardDeclaration => "fwd",
            SuggestionType::IncludeRemoval => "incl-rm",
            SuggestionType::MoveToCpp => "move-cpp",
            SuggestionType::ExplicitTemplate => "extern-tpl",
            SuggestionType::HeaderSplit => "split",
            SuggestionType::UnityBuild => "unity",
            SuggestionType::PimplPattern => "pimpl",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Action {
    Create,
    Modify,
    Remove,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FileTarget {
    pub path: PathBuf,
    pub action: Action,
    pub note: String,
}

/// One refactoring recommendation (§3).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Suggestion {
    pub id: String,
    pub suggestion_type: SuggestionType,
    pub priority: Priority,
    pub confidence: f64,
    pub estimated_savings: Duration,
    pub estimated_savings_percent: f64,
    pub title: String,
    pub description: String,
    pub rationale: String,
    pub implementation_steps: Vec<String>,
    pub caveats: Vec<String>,
    pub verification: String,
    pub primary_target: FileTarget,
    pub secondary_targets: Vec<FileTarget>,
    pub before_code: Option<String>,
    pub after_code: Option<String>,
    pub is_safe: bool,
}

/// Deterministic id: a pure function of suggestion type and target (§4.4).
pub fn suggestion_id(kind: SuggestionType, target: &str) -> String {
    let basename = std::path::Path::new(target)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(target);
    format!("{}-{}", kind.id_prefix(), basename)
}

/// `100 * savings / total_time`, or `0.0` when total build time is unknown
/// (§4.4).
pub fn savings_percent(savings: Duration, total_time: Duration) -> f64 {
    if total_time.is_zero() {
        0.0
    } else {
        100.0 * savings.as_secs_f64() / total_time.as_secs_f64()
    }
}

/// Sorts suggestions by `estimated_savings` descending (§4.4 result-ordering
/// invariant), applied by every suggester before returning.
pub fn sort_by_savings_desc(suggestions: &mut [Suggestion]) {
    suggestions.sort_by(|a, b| {
        b.estimated_savings
            .cmp(&a.estimated_savings)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Per-run tunables a host may override (thresholds live on each suggester's
/// `Default` impl instead; this only carries cross-cutting run options).
#[derive(Debug, Clone, Default)]
pub struct SuggestOptions {
    pub max_suggestions_per_type: Option<usize>,
}

/// What a `Suggester` is handed: the raw units (for total build time), the
/// aggregated view, and the run's options.
pub struct SuggestionContext<'a> {
    pub units: &'a [CompilationUnit],
    pub analysis: &'a AnalysisResult,
    pub options: &'a SuggestOptions,
}

impl<'a> SuggestionContext<'a> {
    pub fn total_time(&self) -> Duration {
        self.units.iter().map(|u| u.metrics.total_time).sum()
    }
}

/// Outcome of one suggester's run (§4.4).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionResult {
    pub suggestions: Vec<Suggestion>,
    pub items_analyzed: usize,
    pub items_skipped: usize,
    pub generation_time: Duration,
}

/// Implemented by every refactoring analyzer (§4.4).
pub trait Suggester: Send + Sync {
    fn name(&self) -> &'static str;
    fn suggestion_type(&self) -> SuggestionType;
    fn suggest(&self, context: &SuggestionContext<'_>) -> SuggestionResult;
}

/// Registry of suggesters, mutated only at registration time (§5), mirroring
/// `ParserRegistry`.
#[derive(Default)]
pub struct SuggesterRegistry {
    suggesters: Vec<Box<dyn Suggester>>,
}

impl SuggesterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, suggester: Box<dyn Suggester>) {
        self.suggesters.push(suggester);
    }

    pub fn list(&self) -> &[Box<dyn Suggester>] {
        &self.suggesters
    }

    /// Runs every registered suggester independently; one suggester's
    /// internal panic-free failure never blocks the others (§7) — each
    /// produces its own `SuggestionResult` regardless of what the others
    /// found.
    pub fn suggest_all(&self, context: &SuggestionContext<'_>) -> Vec<(&'static str, SuggestionResult)> {
        self.suggesters
            .iter()
            .map(|s| (s.name(), s.suggest(context)))
            .collect()
    }
}

/// Builds the registry with the seven built-in suggesters (§4.5).
pub fn register_all_suggesters() -> SuggesterRegistry {
    let mut registry = SuggesterRegistry::new();
    registry.register(Box::new(PchSuggester::default()));
    registry.register(Box::new(ForwardDeclarationSuggester::default()));
    registry.register(Box::new(IncludeRemovalSuggester::default()));
    registry.register(Box::new(ExplicitTemplateSuggester::default()));
    registry.register(Box::new(HeaderSplitSuggester::default()));
    registry.register(Box::new(PimplSuggester::default()));
    registry.register(Box::new(UnityBuildSuggester::default()));
    registry
}
