//! Configuration structures and constants for the crashsift-core library.
//!
//! This module provides the configuration for metric extraction, global
//! normalization, threshold sweeps and candidate selection. A `CoreConfig` can
//! be built in code (see [`CoreConfigBuilder`]), loaded from a JSON file, and
//! adjusted through `CRASHSIFT_*` environment variables.

mod builder;
mod utils;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, CoreResult};
use crate::types::{FeatureAggregation, FilterLogic, ThresholdPair, UnknownLabelPolicy};

pub use builder::CoreConfigBuilder;
use utils::{get_env_f64, get_env_opt_path, get_env_path, get_env_usize};

// Default constants

/// Frames taken on each side of the accident frame.
/// 30 frames is about one second of footage at 30 fps.
pub const DEFAULT_WINDOW_HALF_WIDTH: usize = 30;

/// Detections at or below this confidence are ignored.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Percentile of per-video max distances used as the global reference.
/// P95 damps single-outlier videos while keeping most of the range.
pub const DEFAULT_REFERENCE_PERCENTILE: f64 = 95.0;

/// COCO class ids treated as vulnerable road users (person, bicycle, motorcycle).
pub const DEFAULT_VRU_CLASS_IDS: [u32; 3] = [0, 1, 3];

/// COCO class ids treated as vehicles (car, bus, truck).
pub const DEFAULT_VEHICLE_CLASS_IDS: [u32; 3] = [2, 5, 7];

/// Lower and upper bound of the candidate sample-count band.
pub const DEFAULT_MIN_SAMPLES: usize = 150;
pub const DEFAULT_MAX_SAMPLES: usize = 500;

/// Sample count candidates are ranked against.
pub const DEFAULT_TARGET_SAMPLES: usize = 200;

/// Number of ranked candidates kept.
pub const DEFAULT_TOP_K: usize = 15;

/// Complexity weight of the weighted composite heuristic.
pub const DEFAULT_COMPLEXITY_WEIGHT: f64 = 0.7;

/// Complexity percentiles walked by the marginal-efficiency analysis.
pub const DEFAULT_MARGINAL_PERCENTILES: [f64; 5] = [60.0, 65.0, 70.0, 75.0, 80.0];

/// Thresholds of the configuration that was in use before the sweep, used as
/// the "old" side of the configuration comparison.
pub const DEFAULT_BASELINE_THRESHOLDS: ThresholdPair = ThresholdPair::new(6, 1.0);

/// Thresholds for the single-metric vs joint strategy comparison.
pub const DEFAULT_STRATEGY_THRESHOLDS: ThresholdPair = ThresholdPair::new(6, 0.6);

/// Bounds of a threshold grid.
///
/// Complexity thresholds run over `complexity_min..=complexity_max`; dynamic
/// thresholds over the half-open `[dynamic_start, dynamic_stop)` in steps of
/// `dynamic_step`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepRange {
    pub complexity_min: u32,
    pub complexity_max: u32,
    pub dynamic_start: f64,
    pub dynamic_stop: f64,
    pub dynamic_step: f64,
}

impl SweepRange {
    /// Coarse grid used for the supervised F1 sweep.
    pub const F1_DEFAULT: SweepRange = SweepRange {
        complexity_min: 3,
        complexity_max: 14,
        dynamic_start: 0.0,
        dynamic_stop: 1.1,
        dynamic_step: 0.1,
    };

    /// Finer grid used for the sample-count sweep and candidate search.
    pub const COUNT_DEFAULT: SweepRange = SweepRange {
        complexity_min: 4,
        complexity_max: 9,
        dynamic_start: 0.50,
        dynamic_stop: 0.95,
        dynamic_step: 0.05,
    };

    fn validate(&self, name: &str) -> CoreResult<()> {
        if self.complexity_min > self.complexity_max {
            return Err(CoreError::InvalidConfig(format!(
                "{name}: complexity_min {} exceeds complexity_max {}",
                self.complexity_min, self.complexity_max
            )));
        }
        if !(self.dynamic_step.is_finite() && self.dynamic_step > 0.0) {
            return Err(CoreError::InvalidConfig(format!(
                "{name}: dynamic_step must be positive, got {}",
                self.dynamic_step
            )));
        }
        if !(self.dynamic_stop > self.dynamic_start) {
            return Err(CoreError::InvalidConfig(format!(
                "{name}: empty dynamic range [{}, {})",
                self.dynamic_start, self.dynamic_stop
            )));
        }
        Ok(())
    }
}

/// Main configuration structure for the crashsift-core library.
///
/// All fields have defaults; only the input and output paths normally need
/// to be set.
///
/// # Examples
///
/// ```rust,no_run
/// use crashsift_core::config::CoreConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .annotation_file(PathBuf::from("/data/crash/videos/Crash-1500.txt"))
///     .tensor_dir(PathBuf::from("/data/crash/yolo_features/positive"))
///     .output_dir(PathBuf::from("/data/out"))
///     .window_half_width(30)
///     .confidence_threshold(0.5)
///     .build();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Fixed-width accident label file
    pub annotation_file: PathBuf,

    /// Directory of per-video `.npz` detection/feature archives
    pub tensor_dir: PathBuf,

    /// Optional JSON list of human judgements
    pub judgement_file: Option<PathBuf>,

    /// Directory receiving every exported table and decision file
    pub output_dir: PathBuf,

    /// Directory for run logs (defaults to `output_dir/logs` in the driver)
    pub log_dir: Option<PathBuf>,

    /// Half-width W of the extraction window around the accident frame
    pub window_half_width: usize,

    /// Detections must exceed this confidence to count
    pub confidence_threshold: f64,

    /// Per-frame feature aggregation strategy
    pub aggregation: FeatureAggregation,

    /// Percentile of raw per-video max distances used as global reference
    pub reference_percentile: f64,

    /// Class ids counted as vulnerable road users
    pub vru_class_ids: Vec<u32>,

    /// Class ids counted as vehicles
    pub vehicle_class_ids: Vec<u32>,

    /// Worker threads for per-video extraction
    pub jobs: usize,

    /// Grid of the supervised F1 sweep
    pub f1_sweep: SweepRange,

    /// Selection logic of the supervised F1 sweep
    pub f1_logic: FilterLogic,

    /// Grid of the sample-count sweep feeding candidate selection
    pub count_sweep: SweepRange,

    /// Treatment of unlabeled videos in supervised scoring
    pub unknown_label_policy: UnknownLabelPolicy,

    /// Candidate sample-count band
    pub min_samples: usize,
    pub max_samples: usize,

    /// Sample count candidates are ranked against
    pub target_samples: usize,

    /// Number of ranked candidates kept
    pub top_k: usize,

    /// Complexity weight of the weighted composite heuristic; dynamic gets
    /// the remainder
    pub complexity_weight: f64,

    /// Complexity percentiles for marginal-efficiency analysis
    pub marginal_percentiles: Vec<f64>,

    /// Previously used thresholds, compared against the best-F1 pair
    pub baseline_thresholds: ThresholdPair,

    /// Thresholds for the single-metric vs joint strategy comparison
    pub strategy_thresholds: ThresholdPair,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            annotation_file: PathBuf::from("Crash-1500.txt"),
            tensor_dir: PathBuf::from("."),
            judgement_file: None,
            output_dir: PathBuf::from("."),
            log_dir: None,
            window_half_width: DEFAULT_WINDOW_HALF_WIDTH,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            aggregation: FeatureAggregation::default(),
            reference_percentile: DEFAULT_REFERENCE_PERCENTILE,
            vru_class_ids: DEFAULT_VRU_CLASS_IDS.to_vec(),
            vehicle_class_ids: DEFAULT_VEHICLE_CLASS_IDS.to_vec(),
            jobs: num_cpus::get(),
            f1_sweep: SweepRange::F1_DEFAULT,
            f1_logic: FilterLogic::Or,
            count_sweep: SweepRange::COUNT_DEFAULT,
            unknown_label_policy: UnknownLabelPolicy::default(),
            min_samples: DEFAULT_MIN_SAMPLES,
            max_samples: DEFAULT_MAX_SAMPLES,
            target_samples: DEFAULT_TARGET_SAMPLES,
            top_k: DEFAULT_TOP_K,
            complexity_weight: DEFAULT_COMPLEXITY_WEIGHT,
            marginal_percentiles: DEFAULT_MARGINAL_PERCENTILES.to_vec(),
            baseline_thresholds: DEFAULT_BASELINE_THRESHOLDS,
            strategy_thresholds: DEFAULT_STRATEGY_THRESHOLDS,
        }
    }
}

impl CoreConfig {
    /// Creates a configuration with the given input and output paths and
    /// defaults for everything else.
    pub fn new(annotation_file: PathBuf, tensor_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            annotation_file,
            tensor_dir,
            output_dir,
            ..Self::default()
        }
    }

    /// Loads a configuration from a JSON file. Missing keys take defaults.
    pub fn from_json_file(path: &Path) -> CoreResult<Self> {
        if !path.is_file() {
            return Err(CoreError::not_found("configuration file", path));
        }
        let content = std::fs::read_to_string(path)?;
        let config: CoreConfig = serde_json::from_str(&content)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Applies `CRASHSIFT_*` environment overrides on top of the current
    /// values.
    pub fn apply_env_overrides(&mut self) {
        self.annotation_file = get_env_path("CRASHSIFT_ANNOTATION_FILE", self.annotation_file.clone());
        self.tensor_dir = get_env_path("CRASHSIFT_TENSOR_DIR", self.tensor_dir.clone());
        self.judgement_file = get_env_opt_path("CRASHSIFT_JUDGEMENT_FILE", self.judgement_file.clone());
        self.output_dir = get_env_path("CRASHSIFT_OUTPUT_DIR", self.output_dir.clone());
        self.log_dir = get_env_opt_path("CRASHSIFT_LOG_DIR", self.log_dir.clone());
        self.window_half_width = get_env_usize("CRASHSIFT_WINDOW", self.window_half_width);
        self.confidence_threshold = get_env_f64("CRASHSIFT_CONFIDENCE", self.confidence_threshold);
        self.reference_percentile =
            get_env_f64("CRASHSIFT_REFERENCE_PERCENTILE", self.reference_percentile);
        self.jobs = get_env_usize("CRASHSIFT_JOBS", self.jobs);
        self.target_samples = get_env_usize("CRASHSIFT_TARGET_SAMPLES", self.target_samples);
        self.top_k = get_env_usize("CRASHSIFT_TOP_K", self.top_k);
    }

    /// Checks parameter ranges.
    pub fn validate(&self) -> CoreResult<()> {
        if self.window_half_width == 0 {
            return Err(CoreError::InvalidConfig(
                "window_half_width must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(CoreError::InvalidConfig(format!(
                "confidence_threshold must be within [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if !(self.reference_percentile > 0.0 && self.reference_percentile <= 100.0) {
            return Err(CoreError::InvalidConfig(format!(
                "reference_percentile must be within (0, 100], got {}",
                self.reference_percentile
            )));
        }
        if self.jobs == 0 {
            return Err(CoreError::InvalidConfig("jobs must be at least 1".to_string()));
        }
        self.f1_sweep.validate("f1_sweep")?;
        self.count_sweep.validate("count_sweep")?;
        if self.min_samples > self.max_samples {
            return Err(CoreError::InvalidConfig(format!(
                "min_samples {} exceeds max_samples {}",
                self.min_samples, self.max_samples
            )));
        }
        if self.top_k == 0 {
            return Err(CoreError::InvalidConfig("top_k must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.complexity_weight) {
            return Err(CoreError::InvalidConfig(format!(
                "complexity_weight must be within [0, 1], got {}",
                self.complexity_weight
            )));
        }
        if self
            .marginal_percentiles
            .iter()
            .any(|p| !(0.0..=100.0).contains(p))
        {
            return Err(CoreError::InvalidConfig(
                "marginal_percentiles must lie within [0, 100]".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.window_half_width, 30);
        assert_eq!(config.f1_logic, FilterLogic::Or);
    }

    #[test]
    fn rejects_inverted_sample_band() {
        let config = CoreConfig {
            min_samples: 600,
            ..CoreConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_empty_dynamic_range() {
        let mut config = CoreConfig::default();
        config.count_sweep.dynamic_stop = config.count_sweep.dynamic_start;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_takes_defaults() {
        let config: CoreConfig = serde_json::from_str(
            r#"{ "window_half_width": 12, "aggregation": "first_slot", "f1_logic": "AND" }"#,
        )
        .unwrap();
        assert_eq!(config.window_half_width, 12);
        assert_eq!(config.aggregation, FeatureAggregation::FirstSlot);
        assert_eq!(config.f1_logic, FilterLogic::And);
        assert_eq!(config.top_k, DEFAULT_TOP_K);
    }
}
