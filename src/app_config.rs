use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pipeline configuration module
/// This module handles loading, validating and defaulting the tunable
/// parameters of every pipeline stage. All thresholds that the alignment
/// and fusion stages depend on live here so a deployment can tune them
/// without code changes.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Line grouping parameters
    #[serde(default)]
    pub grouping: GroupingConfig,

    /// Line/character alignment parameters
    #[serde(default)]
    pub alignment: AlignmentConfig,

    /// Candidate fusion parameters
    #[serde(default)]
    pub fusion: FusionConfig,

    /// Break classification parameters
    #[serde(default)]
    pub breaks: BreakConfig,

    /// Token locking parameters
    #[serde(default)]
    pub locking: LockingConfig,

    /// Segmentation parameters
    #[serde(default)]
    pub segmentation: SegmentationConfig,

    /// Translation orchestration parameters
    #[serde(default)]
    pub translation: TranslationConfig,

    /// Recognition engine parameters
    #[serde(default)]
    pub engines: EngineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grouping: GroupingConfig::default(),
            alignment: AlignmentConfig::default(),
            fusion: FusionConfig::default(),
            breaks: BreakConfig::default(),
            locking: LockingConfig::default(),
            segmentation: SegmentationConfig::default(),
            translation: TranslationConfig::default(),
            engines: EngineConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file {:?}", path.as_ref()))?;
        let config: Self =
            serde_json::from_str(&content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.fusion.epsilon) {
            anyhow::bail!("fusion.epsilon must be within [0, 1]");
        }
        if !(0.0..=1.0).contains(&self.locking.confidence_threshold) {
            anyhow::bail!("locking.confidence_threshold must be within [0, 1]");
        }
        if self.breaks.paragraph_gap_factor <= self.breaks.line_gap_factor {
            anyhow::bail!("breaks.paragraph_gap_factor must exceed breaks.line_gap_factor");
        }
        if self.translation.max_concurrent_requests == 0 {
            anyhow::bail!("translation.max_concurrent_requests must be at least 1");
        }
        Ok(())
    }
}

/// Parameters for clustering symbols into lines
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GroupingConfig {
    // @field: Minimum vertical band overlap ratio to join a line
    #[serde(default = "default_min_band_overlap")]
    pub min_band_overlap: f32,

    // @field: Maximum center distance as a fraction of symbol height
    #[serde(default = "default_max_center_distance_ratio")]
    pub max_center_distance_ratio: f32,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            min_band_overlap: default_min_band_overlap(),
            max_center_distance_ratio: default_max_center_distance_ratio(),
        }
    }
}

/// Parameters for the DP aligners
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AlignmentConfig {
    // @field: Weight of geometric band overlap in the line match score
    #[serde(default = "default_geometry_weight")]
    pub geometry_weight: f32,

    // @field: Weight of content similarity in the line match score
    #[serde(default = "default_content_weight")]
    pub content_weight: f32,

    // @field: Penalty applied to a skip step in the line DP
    #[serde(default = "default_line_skip_penalty")]
    pub line_skip_penalty: f32,

    // @field: Penalty applied to a skip step in the character DP
    #[serde(default = "default_char_skip_penalty")]
    pub char_skip_penalty: f32,

    // @field: Bonus for matching identical symbols in the character DP
    #[serde(default = "default_identity_bonus")]
    pub identity_bonus: f32,

    // @field: Minimum IoU for two symbols to count as a character match
    #[serde(default = "default_min_char_iou")]
    pub min_char_iou: f32,

    // @field: Line match scores below this are recorded as ambiguous
    #[serde(default = "default_ambiguity_threshold")]
    pub ambiguity_threshold: f32,

    // @field: Symbol count above which a line is flagged as abnormal
    #[serde(default = "default_max_line_symbols")]
    pub max_line_symbols: usize,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            geometry_weight: default_geometry_weight(),
            content_weight: default_content_weight(),
            line_skip_penalty: default_line_skip_penalty(),
            char_skip_penalty: default_char_skip_penalty(),
            identity_bonus: default_identity_bonus(),
            min_char_iou: default_min_char_iou(),
            ambiguity_threshold: default_ambiguity_threshold(),
            max_line_symbols: default_max_line_symbols(),
        }
    }
}

/// Parameters for candidate fusion
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct FusionConfig {
    // @field: Confidence near-tie epsilon
    #[serde(default = "default_fusion_epsilon")]
    pub epsilon: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            epsilon: default_fusion_epsilon(),
        }
    }
}

/// Parameters for inter-line gap classification
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BreakConfig {
    // @field: Gap over median line height that counts as a line break
    #[serde(default = "default_line_gap_factor")]
    pub line_gap_factor: f32,

    // @field: Gap over median line height that counts as a paragraph break
    #[serde(default = "default_paragraph_gap_factor")]
    pub paragraph_gap_factor: f32,
}

impl Default for BreakConfig {
    fn default() -> Self {
        Self {
            line_gap_factor: default_line_gap_factor(),
            paragraph_gap_factor: default_paragraph_gap_factor(),
        }
    }
}

/// Parameters for the token locking engine
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LockingConfig {
    // @field: Minimum confidence for a glyph to be lockable
    #[serde(default = "default_lock_confidence_threshold")]
    pub confidence_threshold: f32,

    // @field: Maximum locked glyphs per segmented unit
    #[serde(default = "default_max_locks_per_unit")]
    pub max_locks_per_unit: usize,

    // @field: Maximum unit length (chars) before locking is disabled
    #[serde(default = "default_max_unit_chars")]
    pub max_unit_chars: usize,
}

impl Default for LockingConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_lock_confidence_threshold(),
            max_locks_per_unit: default_max_locks_per_unit(),
            max_unit_chars: default_max_unit_chars(),
        }
    }
}

/// Parameters for segmentation and the raw-text cross-check
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SegmentationConfig {
    // @field: Normalized edit distance above which a divergence is logged
    #[serde(default = "default_divergence_threshold")]
    pub divergence_threshold: f32,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            divergence_threshold: default_divergence_threshold(),
        }
    }
}

/// Parameters for translation orchestration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TranslationConfig {
    // @field: Max concurrent baseline requests
    #[serde(default = "default_concurrent_requests")]
    pub max_concurrent_requests: usize,

    // @field: Per-call timeout in milliseconds
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    // @field: Whether the refinement stage runs at all
    #[serde(default = "default_enable_refinement")]
    pub enable_refinement: bool,

    // @field: Minimum refined/baseline length ratio before rejection
    #[serde(default = "default_min_refined_length_ratio")]
    pub min_refined_length_ratio: f32,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            max_concurrent_requests: default_concurrent_requests(),
            call_timeout_ms: default_call_timeout_ms(),
            enable_refinement: default_enable_refinement(),
            min_refined_length_ratio: default_min_refined_length_ratio(),
        }
    }
}

/// Parameters for recognition engine calls
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EngineConfig {
    // @field: Per-engine timeout in milliseconds
    #[serde(default = "default_engine_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_engine_timeout_ms(),
        }
    }
}

fn default_min_band_overlap() -> f32 {
    0.5
}

fn default_max_center_distance_ratio() -> f32 {
    0.7
}

fn default_geometry_weight() -> f32 {
    0.6
}

fn default_content_weight() -> f32 {
    0.4
}

fn default_line_skip_penalty() -> f32 {
    -0.2
}

fn default_char_skip_penalty() -> f32 {
    -0.1
}

fn default_identity_bonus() -> f32 {
    0.3
}

fn default_min_char_iou() -> f32 {
    0.1
}

fn default_ambiguity_threshold() -> f32 {
    0.35
}

fn default_max_line_symbols() -> usize {
    120
}

fn default_fusion_epsilon() -> f32 {
    0.03
}

fn default_line_gap_factor() -> f32 {
    0.6
}

fn default_paragraph_gap_factor() -> f32 {
    1.8
}

fn default_lock_confidence_threshold() -> f32 {
    0.85
}

fn default_max_locks_per_unit() -> usize {
    64
}

fn default_max_unit_chars() -> usize {
    400
}

fn default_divergence_threshold() -> f32 {
    0.25
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_call_timeout_ms() -> u64 {
    30_000
}

fn default_enable_refinement() -> bool {
    true
}

fn default_min_refined_length_ratio() -> f32 {
    0.8
}

fn default_engine_timeout_ms() -> u64 {
    15_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_shouldValidate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.locking.confidence_threshold, 0.85);
        assert_eq!(config.translation.min_refined_length_ratio, 0.8);
    }

    #[test]
    fn test_config_fromPartialJson_shouldFillDefaults() {
        let json = r#"{ "fusion": { "epsilon": 0.05 } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.fusion.epsilon, 0.05);
        assert_eq!(config.grouping.min_band_overlap, 0.5);
        assert_eq!(config.translation.max_concurrent_requests, 4);
    }

    #[test]
    fn test_validate_withInvertedGapFactors_shouldFail() {
        let mut config = Config::default();
        config.breaks.paragraph_gap_factor = 0.2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_withEpsilonOutOfRange_shouldFail() {
        let mut config = Config::default();
        config.fusion.epsilon = 1.5;
        assert!(config.validate().is_err());
    }
}
