//! Descriptive statistics of the metrics table and percentile-based
//! threshold suggestions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::processing::MetricsTable;
use crate::stats;
use crate::types::HumanJudgement;

/// Quantiles reported for each metric.
pub const REPORTED_QUANTILES: [f64; 6] = [25.0, 50.0, 70.0, 80.0, 90.0, 95.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation.
    pub std: f64,
    /// Keyed `p25`, `p50`, ...
    pub quantiles: BTreeMap<String, f64>,
}

impl MetricSummary {
    #[must_use]
    pub fn from_values(values: &[f64]) -> Self {
        Self {
            min: stats::min(values),
            max: stats::max(values),
            mean: stats::mean(values),
            median: stats::median(values),
            std: stats::std_sample(values),
            quantiles: REPORTED_QUANTILES
                .iter()
                .map(|q| (format!("p{q}"), stats::percentile(values, *q)))
                .collect(),
        }
    }
}

/// Per-label means of the videos carrying that judgement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelGroup {
    pub count: usize,
    pub percentage: f64,
    pub dynamic_mean: f64,
    pub dynamic_std: f64,
    pub complexity_mean: f64,
    pub complexity_std: f64,
    pub vru_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionReport {
    pub total_videos: usize,
    pub dynamic_change: MetricSummary,
    pub scene_complexity: MetricSummary,
    pub vru_interaction_count: usize,
    pub vru_interaction_rate: f64,
    /// Keyed `positive`, `negative`, `unknown`; empty groups are omitted.
    pub labels: BTreeMap<String, LabelGroup>,
}

/// Summarises both metrics, the VRU flag and the label breakdown.
#[must_use]
pub fn distribution_report(table: &MetricsTable) -> DistributionReport {
    let records = table.records();
    let vru = records.iter().filter(|r| r.has_vru_interaction).count();

    let mut labels = BTreeMap::new();
    for (key, judgement) in [
        ("positive", HumanJudgement::Positive),
        ("negative", HumanJudgement::Negative),
        ("unknown", HumanJudgement::Unknown),
    ] {
        let group: Vec<_> = records.iter().filter(|r| r.human_judgement == judgement).collect();
        if group.is_empty() {
            continue;
        }
        let dynamic: Vec<f64> = group.iter().map(|r| r.dynamic_change).collect();
        let complexity: Vec<f64> = group.iter().map(|r| f64::from(r.scene_complexity)).collect();
        let group_vru = group.iter().filter(|r| r.has_vru_interaction).count();
        labels.insert(
            key.to_string(),
            LabelGroup {
                count: group.len(),
                percentage: stats::ratio_pct(group.len(), records.len()),
                dynamic_mean: stats::mean(&dynamic),
                dynamic_std: stats::std_sample(&dynamic),
                complexity_mean: stats::mean(&complexity),
                complexity_std: stats::std_sample(&complexity),
                vru_rate: stats::ratio_pct(group_vru, group.len()),
            },
        );
    }

    DistributionReport {
        total_videos: records.len(),
        dynamic_change: MetricSummary::from_values(&table.dynamic_values()),
        scene_complexity: MetricSummary::from_values(&table.complexity_values()),
        vru_interaction_count: vru,
        vru_interaction_rate: stats::ratio_pct(vru, records.len()),
        labels,
    }
}

/// Threshold pair suggested by one strategy. Complexity is kept fractional
/// since it is a percentile of integer counts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuggestedThresholds {
    pub dynamic_change_threshold: f64,
    pub complexity_threshold: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdSuggestions {
    /// P80 dynamic, P75 complexity.
    pub conservative: SuggestedThresholds,
    /// P60 dynamic, P50 complexity.
    pub balanced: SuggestedThresholds,
    /// P40 dynamic, P25 complexity.
    pub aggressive: SuggestedThresholds,
}

#[must_use]
pub fn suggest_thresholds(table: &MetricsTable) -> ThresholdSuggestions {
    let dynamic = table.dynamic_values();
    let complexity = table.complexity_values();
    let at = |pd: f64, pc: f64| SuggestedThresholds {
        dynamic_change_threshold: stats::percentile(&dynamic, pd),
        complexity_threshold: stats::percentile(&complexity, pc),
    };
    ThresholdSuggestions {
        conservative: at(80.0, 75.0),
        balanced: at(60.0, 50.0),
        aggressive: at(40.0, 25.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{record, table, unlabeled};
    use approx::assert_relative_eq;

    #[test]
    fn summarises_both_metrics() {
        let t = table(unlabeled(&[(2, 0.1), (4, 0.2), (6, 0.3), (8, 0.4), (10, 0.5)]));
        let report = distribution_report(&t);
        assert_eq!(report.total_videos, 5);
        assert_relative_eq!(report.scene_complexity.mean, 6.0);
        assert_relative_eq!(report.scene_complexity.median, 6.0);
        assert_relative_eq!(report.scene_complexity.std, 10.0f64.sqrt());
        assert_relative_eq!(report.scene_complexity.quantiles["p25"], 4.0);
        assert_relative_eq!(report.dynamic_change.max, 0.5);
        assert_eq!(report.labels.len(), 1);
        assert_eq!(report.labels["unknown"].count, 5);
    }

    #[test]
    fn groups_by_label() {
        let t = table(vec![
            record("a", 5, 0.5, HumanJudgement::Positive),
            record("b", 3, 0.1, HumanJudgement::Negative),
            record("c", 7, 0.7, HumanJudgement::Positive),
        ]);
        let report = distribution_report(&t);
        assert_eq!(report.labels["positive"].count, 2);
        assert_relative_eq!(report.labels["positive"].complexity_mean, 6.0);
        assert_eq!(report.labels["negative"].dynamic_std, 0.0);
        assert!(!report.labels.contains_key("unknown"));
    }

    #[test]
    fn suggestions_follow_percentiles() {
        let points: Vec<(u32, f64)> = (0..11).map(|i| (i, f64::from(i) / 10.0)).collect();
        let s = suggest_thresholds(&table(unlabeled(&points)));
        assert_relative_eq!(s.conservative.dynamic_change_threshold, 0.8, epsilon = 1e-12);
        assert_relative_eq!(s.conservative.complexity_threshold, 7.5);
        assert_relative_eq!(s.balanced.complexity_threshold, 5.0);
        assert_relative_eq!(s.aggressive.dynamic_change_threshold, 0.4, epsilon = 1e-12);
    }

    #[test]
    fn empty_table_reports_zeros() {
        let report = distribution_report(&table(Vec::new()));
        assert_eq!(report.total_videos, 0);
        assert_eq!(report.vru_interaction_rate, 0.0);
        assert_eq!(report.dynamic_change.mean, 0.0);
    }
}
