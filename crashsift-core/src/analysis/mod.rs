//! Analyses over a normalised metrics table.
//!
//! Everything here is a pure function of a [`MetricsTable`](crate::processing::MetricsTable).

pub mod comparison;
pub mod distribution;
pub mod marginal;
pub mod sweep;
pub mod unsupervised;

pub use comparison::{
    ConfigurationComparison, ImprovementMetrics, StrategyComparison, compare_configurations,
    improvement_metrics, strategy_comparison,
};
pub use distribution::{DistributionReport, ThresholdSuggestions, distribution_report, suggest_thresholds};
pub use marginal::{MarginalRow, marginal_efficiency, operating_point};
pub use sweep::{
    SupervisedScore, SweepOrder, ThresholdCandidate, ThresholdGrid, best_by_f1, score_mask,
    selection_mask, sweep, sweep_table, top_by_f1,
};
pub use unsupervised::{
    Direction, HeuristicResult, distribution_adaptive, elbow_threshold, methods_report,
    percentile_threshold, stddev_threshold, weighted_composite,
};
