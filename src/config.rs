//! Tunable thresholds for suggesters and the anonymizer (§7 ambient stack).
//!
//! Mirrors the teacher's `ScoringWeights`/`DebtmapConfig` shape: every field
//! has a `#[serde(default = "...")]` so a partial TOML file only overrides
//! what it names, and a hand-written `Default` impl keeps `Config::default()`
//! usable without going through `toml` at all.

use serde::{Deserialize, Serialize};

/// PCH-suggester thresholds (§4.5.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PchThresholds {
    #[serde(default = "default_pch_min_inclusion_count")]
    pub min_inclusion_count: usize,
    #[serde(default = "default_pch_min_parse_time_ms")]
    pub min_parse_time_ms: u64,
}

impl Default for PchThresholds {
    fn default() -> Self {
        Self {
            min_inclusion_count: default_pch_min_inclusion_count(),
            min_parse_time_ms: default_pch_min_parse_time_ms(),
        }
    }
}

fn default_pch_min_inclusion_count() -> usize {
    10
}
fn default_pch_min_parse_time_ms() -> u64 {
    100
}

/// Unity-build suggester thresholds (§4.5.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnityBuildThresholds {
    #[serde(default = "default_max_files_per_group")]
    pub max_files_per_group: usize,
    #[serde(default = "default_max_time_per_group_secs")]
    pub max_time_per_group_secs: u64,
    #[serde(default = "default_max_memory_per_group_bytes")]
    pub max_memory_per_group_bytes: u64,
    #[serde(default = "default_distance_threshold")]
    pub distance_threshold: f64,
}

impl Default for UnityBuildThresholds {
    fn default() -> Self {
        Self {
            max_files_per_group: default_max_files_per_group(),
            max_time_per_group_secs: default_max_time_per_group_secs(),
            max_memory_per_group_bytes: default_max_memory_per_group_bytes(),
            distance_threshold: default_distance_threshold(),
        }
    }
}

fn default_max_files_per_group() -> usize {
    10
}
fn default_max_time_per_group_secs() -> u64 {
    30
}
fn default_max_memory_per_group_bytes() -> u64 {
    4 * 1024 * 1024 * 1024
}
fn default_distance_threshold() -> f64 {
    0.5
}

/// Anonymizer defaults (§4.6), used when a caller builds an `Anonymizer`
/// from loaded config rather than constructing `AnonymizationConfig`
/// directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnonymizerDefaults {
    #[serde(default = "default_anonymize_paths")]
    pub anonymize_paths: bool,
    #[serde(default = "default_anonymize_commit_info")]
    pub anonymize_commit_info: bool,
    #[serde(default = "default_replacement_root")]
    pub replacement_root: String,
}

impl Default for AnonymizerDefaults {
    fn default() -> Self {
        Self {
            anonymize_paths: default_anonymize_paths(),
            anonymize_commit_info: default_anonymize_commit_info(),
            replacement_root: default_replacement_root(),
        }
    }
}

fn default_anonymize_paths() -> bool {
    true
}
fn default_anonymize_commit_info() -> bool {
    true
}
fn default_replacement_root() -> String {
    "/project".to_string()
}

/// Root configuration for the crate's suggesters and anonymizer, loadable
/// from a TOML file via `Config::from_toml_str`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub pch: PchThresholds,
    #[serde(default)]
    pub unity_build: UnityBuildThresholds,
    #[serde(default)]
    pub anonymizer: AnonymizerDefaults,
}

impl Config {
    /// Parses a TOML document into a `Config`, filling in defaults for any
    /// field the document omits.
    pub fn from_toml_str(contents: &str) -> Result<Self, crate::error::Error> {
        toml::from_str(contents).map_err(|e| crate::error::Error::parse(e.to_string()))
    }

    /// Checks that every tunable is within its sane range. Thresholds
    /// themselves stay permissive (a user may legitimately want a very low
    /// bar); this only rejects values that would make a suggester divide by
    /// zero or loop forever.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.unity_build.distance_threshold) {
            return Err("unity_build.distance_threshold must be between 0.0 and 1.0".to_string());
        }
        if self.unity_build.max_files_per_group == 0 {
            return Err("unity_build.max_files_per_group must be at least 1".to_string());
        }
        if self.unity_build.max_time_per_group_secs == 0 {
            return Err("unity_build.max_time_per_group_secs must be at least 1".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config = Config::from_toml_str("[pch]\nmin_inclusion_count = 5\n").unwrap();
        assert_eq!(config.pch.min_inclusion_count, 5);
        assert_eq!(config.pch.min_parse_time_ms, default_pch_min_parse_time_ms());
        assert_eq!(config.unity_build.max_files_per_group, default_max_files_per_group());
    }

    #[test]
    fn rejects_out_of_range_distance_threshold() {
        let mut config = Config::default();
        config.unity_build.distance_threshold = 1.5;
        assert!(config.validate().is_err());
    }
}
