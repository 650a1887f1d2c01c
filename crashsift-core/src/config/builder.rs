// ============================================================================
// crashsift-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// Fluent construction of CoreConfig. Unset fields take the values of
// CoreConfig::default().
//
// KEY COMPONENTS:
// - CoreConfigBuilder: collects overrides and produces a CoreConfig
// - build_validated: build plus CoreConfig::validate

// ---- Standard library imports ----
use std::path::PathBuf;

// ---- Internal crate imports ----
use super::{CoreConfig, SweepRange};
use crate::error::CoreResult;
use crate::types::{FeatureAggregation, FilterLogic, ThresholdPair, UnknownLabelPolicy};

/// Builder for creating CoreConfig instances.
///
/// # Examples
///
/// ```rust
/// use crashsift_core::config::CoreConfigBuilder;
/// use crashsift_core::types::UnknownLabelPolicy;
/// use std::path::PathBuf;
///
/// let config = CoreConfigBuilder::new()
///     .annotation_file(PathBuf::from("/data/Crash-1500.txt"))
///     .tensor_dir(PathBuf::from("/data/features"))
///     .output_dir(PathBuf::from("/data/out"))
///     .unknown_label_policy(UnknownLabelPolicy::TreatAsNegative)
///     .target_samples(250)
///     .build();
///
/// assert_eq!(config.target_samples, 250);
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// Creates a new builder seeded with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing configuration, e.g. one loaded from JSON.
    pub fn from_config(config: CoreConfig) -> Self {
        Self { config }
    }

    pub fn annotation_file(mut self, path: PathBuf) -> Self {
        self.config.annotation_file = path;
        self
    }

    pub fn tensor_dir(mut self, dir: PathBuf) -> Self {
        self.config.tensor_dir = dir;
        self
    }

    pub fn judgement_file(mut self, path: PathBuf) -> Self {
        self.config.judgement_file = Some(path);
        self
    }

    pub fn output_dir(mut self, dir: PathBuf) -> Self {
        self.config.output_dir = dir;
        self
    }

    pub fn log_dir(mut self, dir: PathBuf) -> Self {
        self.config.log_dir = Some(dir);
        self
    }

    pub fn window_half_width(mut self, frames: usize) -> Self {
        self.config.window_half_width = frames;
        self
    }

    pub fn confidence_threshold(mut self, threshold: f64) -> Self {
        self.config.confidence_threshold = threshold;
        self
    }

    pub fn aggregation(mut self, aggregation: FeatureAggregation) -> Self {
        self.config.aggregation = aggregation;
        self
    }

    pub fn reference_percentile(mut self, percentile: f64) -> Self {
        self.config.reference_percentile = percentile;
        self
    }

    pub fn vru_class_ids(mut self, ids: Vec<u32>) -> Self {
        self.config.vru_class_ids = ids;
        self
    }

    pub fn vehicle_class_ids(mut self, ids: Vec<u32>) -> Self {
        self.config.vehicle_class_ids = ids;
        self
    }

    /// Sets the number of extraction worker threads.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.config.jobs = jobs;
        self
    }

    pub fn f1_sweep(mut self, range: SweepRange, logic: FilterLogic) -> Self {
        self.config.f1_sweep = range;
        self.config.f1_logic = logic;
        self
    }

    pub fn count_sweep(mut self, range: SweepRange) -> Self {
        self.config.count_sweep = range;
        self
    }

    pub fn unknown_label_policy(mut self, policy: UnknownLabelPolicy) -> Self {
        self.config.unknown_label_policy = policy;
        self
    }

    /// Sets the accepted candidate sample-count band.
    pub fn sample_band(mut self, min: usize, max: usize) -> Self {
        self.config.min_samples = min;
        self.config.max_samples = max;
        self
    }

    pub fn target_samples(mut self, target: usize) -> Self {
        self.config.target_samples = target;
        self
    }

    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    pub fn complexity_weight(mut self, weight: f64) -> Self {
        self.config.complexity_weight = weight;
        self
    }

    pub fn marginal_percentiles(mut self, percentiles: Vec<f64>) -> Self {
        self.config.marginal_percentiles = percentiles;
        self
    }

    pub fn baseline_thresholds(mut self, thresholds: ThresholdPair) -> Self {
        self.config.baseline_thresholds = thresholds;
        self
    }

    pub fn strategy_thresholds(mut self, thresholds: ThresholdPair) -> Self {
        self.config.strategy_thresholds = thresholds;
        self
    }

    /// Builds the CoreConfig instance without validation.
    pub fn build(self) -> CoreConfig {
        self.config
    }

    /// Builds the CoreConfig instance and checks parameter ranges.
    pub fn build_validated(self) -> CoreResult<CoreConfig> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_defaults() {
        let config = CoreConfigBuilder::new()
            .window_half_width(10)
            .sample_band(10, 20)
            .target_samples(15)
            .build();
        assert_eq!(config.window_half_width, 10);
        assert_eq!((config.min_samples, config.max_samples), (10, 20));
        assert_eq!(config.confidence_threshold, super::super::DEFAULT_CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn build_validated_rejects_zero_window() {
        let result = CoreConfigBuilder::new().window_half_width(0).build_validated();
        assert!(result.is_err());
    }
}
