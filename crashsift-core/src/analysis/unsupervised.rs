//! Label-free threshold heuristics.
//!
//! Five independent ways of picking a cutoff from the shape of a metric's
//! distribution. Each returns a [`HeuristicResult`] with the threshold and
//! how many videos it keeps. None of them look at human judgements.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::processing::MetricsTable;
use crate::stats;

/// Skewness below which a distribution is treated as near-normal.
const NEAR_NORMAL_SKEW: f64 = 0.5;

/// Percentile used as non-parametric cutoff by the composite and adaptive
/// heuristics.
const UPPER_QUARTILE: f64 = 75.0;

/// Added to min-max ranges so constant metrics normalise to zero.
const NORMALIZATION_EPSILON: f64 = 1e-6;

/// Which side of `mean ± n·std` is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// `threshold = mean + n·std`, keep values `>=` it.
    Above,
    /// `threshold = mean - n·std`, keep values `<=` it.
    Below,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Above => "above",
            Direction::Below => "below",
        })
    }
}

/// Method-specific diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeuristicDetail {
    StdDev {
        mean: f64,
        std: f64,
        n_std: f64,
        direction: Direction,
    },
    Percentile {
        percentile: f64,
    },
    Elbow {
        elbow_position: usize,
    },
    Weighted {
        complexity_weight: f64,
        dynamic_weight: f64,
        selected_videos: Vec<String>,
    },
    Adaptive {
        mean: f64,
        std: f64,
        skewness: f64,
        kurtosis: f64,
        near_normal: bool,
    },
}

/// Output of one heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicResult {
    pub method: String,
    pub threshold: f64,
    pub selected_count: usize,
    pub percentage: f64,
    pub detail: HeuristicDetail,
}

fn count_at_least(values: &[f64], threshold: f64) -> usize {
    values.iter().filter(|v| **v >= threshold).count()
}

fn result(method: String, values: &[f64], threshold: f64, count: usize, detail: HeuristicDetail) -> HeuristicResult {
    HeuristicResult {
        method,
        threshold,
        selected_count: count,
        percentage: stats::ratio_pct(count, values.len()),
        detail,
    }
}

/// `mean ± n·std` with the population standard deviation.
#[must_use]
pub fn stddev_threshold(values: &[f64], n_std: f64, direction: Direction) -> HeuristicResult {
    let mean = stats::mean(values);
    let std = stats::std_population(values);
    let (threshold, count) = match direction {
        Direction::Above => {
            let t = mean + n_std * std;
            (t, count_at_least(values, t))
        }
        Direction::Below => {
            let t = mean - n_std * std;
            (t, values.iter().filter(|v| **v <= t).count())
        }
    };
    result(
        format!("stddev mean {direction} {n_std}*std"),
        values,
        threshold,
        count,
        HeuristicDetail::StdDev {
            mean,
            std,
            n_std,
            direction,
        },
    )
}

/// Keeps values at or above the `p`-th percentile.
#[must_use]
pub fn percentile_threshold(values: &[f64], p: f64) -> HeuristicResult {
    let threshold = stats::percentile(values, p);
    result(
        format!("percentile P{p}"),
        values,
        threshold,
        count_at_least(values, threshold),
        HeuristicDetail::Percentile { percentile: p },
    )
}

/// Breakpoint of maximal curvature in the descending sorted values.
///
/// The second difference of the sorted sequence is taken and the index
/// after its largest magnitude becomes the breakpoint. With fewer than
/// three values there is no curvature and the minimum is used, which keeps
/// every video.
#[must_use]
pub fn elbow_threshold(values: &[f64]) -> HeuristicResult {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let (position, threshold) = if sorted.len() < 3 {
        let last = sorted.len().saturating_sub(1);
        (last, sorted.last().copied().unwrap_or(0.0))
    } else {
        let diff1: Vec<f64> = sorted.windows(2).map(|w| w[1] - w[0]).collect();
        let diff2: Vec<f64> = diff1.windows(2).map(|w| w[1] - w[0]).collect();
        let mut best = 0;
        for (i, d) in diff2.iter().enumerate() {
            if d.abs() > diff2[best].abs() {
                best = i;
            }
        }
        (best + 1, sorted[best + 1])
    };

    result(
        "elbow".to_string(),
        values,
        threshold,
        count_at_least(values, threshold),
        HeuristicDetail::Elbow {
            elbow_position: position,
        },
    )
}

/// Min-max normalised convex combination of both metrics; videos scoring
/// at or above the 75th percentile of the composite are kept.
#[must_use]
pub fn weighted_composite(table: &MetricsTable, complexity_weight: f64, dynamic_weight: f64) -> HeuristicResult {
    let cplx = min_max_normalize(&table.complexity_values());
    let dynamic = min_max_normalize(&table.dynamic_values());
    let scores: Vec<f64> = cplx
        .iter()
        .zip(&dynamic)
        .map(|(c, d)| c * complexity_weight + d * dynamic_weight)
        .collect();

    let threshold = stats::percentile(&scores, UPPER_QUARTILE);
    let selected_videos: Vec<String> = table
        .records()
        .iter()
        .zip(&scores)
        .filter(|(_, s)| **s >= threshold)
        .map(|(r, _)| r.video_name.clone())
        .collect();

    result(
        format!("weighted composite (complexity {complexity_weight}, dynamic {dynamic_weight})"),
        &scores,
        threshold,
        selected_videos.len(),
        HeuristicDetail::Weighted {
            complexity_weight,
            dynamic_weight,
            selected_videos,
        },
    )
}

fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    let lo = stats::min(values);
    let hi = stats::max(values);
    values
        .iter()
        .map(|v| (v - lo) / (hi - lo + NORMALIZATION_EPSILON))
        .collect()
}

/// `mean + 1·std` for near-normal data (`|skew| < 0.5`), otherwise the
/// 75th percentile.
#[must_use]
pub fn distribution_adaptive(values: &[f64]) -> HeuristicResult {
    let mean = stats::mean(values);
    let std = stats::std_population(values);
    let skewness = stats::skewness(values);
    let kurtosis = stats::excess_kurtosis(values);
    let near_normal = skewness.abs() < NEAR_NORMAL_SKEW;

    let threshold = if near_normal {
        mean + std
    } else {
        stats::percentile(values, UPPER_QUARTILE)
    };

    result(
        "distribution adaptive".to_string(),
        values,
        threshold,
        count_at_least(values, threshold),
        HeuristicDetail::Adaptive {
            mean,
            std,
            skewness,
            kurtosis,
            near_normal,
        },
    )
}

/// Runs the standard battery on scene complexity, keyed by method.
#[must_use]
pub fn methods_report(table: &MetricsTable, complexity_weight: f64) -> BTreeMap<String, HeuristicResult> {
    let cplx = table.complexity_values();
    let mut report = BTreeMap::new();

    for n in [0.5, 1.0, 1.5, 2.0] {
        report.insert(format!("stddev_cplx_{n:.1}"), stddev_threshold(&cplx, n, Direction::Above));
    }
    for p in [50.0, 60.0, 70.0, 75.0, 80.0, 90.0] {
        report.insert(format!("percentile_cplx_{p}"), percentile_threshold(&cplx, p));
    }
    report.insert("elbow_cplx".to_string(), elbow_threshold(&cplx));
    report.insert(
        "weighted_combined".to_string(),
        weighted_composite(table, complexity_weight, 1.0 - complexity_weight),
    );
    report.insert("adaptive_dist".to_string(), distribution_adaptive(&cplx));

    log::info!("Ran {} unsupervised threshold heuristics", report.len());
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{table, unlabeled};
    use approx::assert_relative_eq;

    #[test]
    fn stddev_above_and_below() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let above = stddev_threshold(&values, 1.0, Direction::Above);
        assert_relative_eq!(above.threshold, 7.0);
        assert_eq!(above.selected_count, 2);
        assert_relative_eq!(above.percentage, 25.0);

        let below = stddev_threshold(&values, 1.0, Direction::Below);
        assert_relative_eq!(below.threshold, 3.0);
        assert_eq!(below.selected_count, 1);
    }

    #[test]
    fn percentile_keeps_upper_share() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let r = percentile_threshold(&values, 80.0);
        assert_relative_eq!(r.threshold, 8.2);
        assert_eq!(r.selected_count, 2);
    }

    #[test]
    fn elbow_finds_the_drop() {
        // sorted desc: 10 9 8 2 1 -> diff1 -1 -1 -6 -1 -> diff2 0 -5 5
        let r = elbow_threshold(&[1.0, 2.0, 8.0, 9.0, 10.0]);
        assert_eq!(r.detail, HeuristicDetail::Elbow { elbow_position: 2 });
        assert_relative_eq!(r.threshold, 8.0);
        assert_eq!(r.selected_count, 3);
    }

    #[test]
    fn elbow_with_too_few_values_keeps_everything() {
        let r = elbow_threshold(&[3.0, 1.0]);
        assert_relative_eq!(r.threshold, 1.0);
        assert_eq!(r.selected_count, 2);
        assert_eq!(elbow_threshold(&[]).selected_count, 0);
    }

    #[test]
    fn weighted_composite_selects_top_quarter() {
        let t = table(unlabeled(&[(1, 0.1), (2, 0.2), (3, 0.3), (10, 1.0)]));
        let r = weighted_composite(&t, 0.7, 0.3);
        match &r.detail {
            HeuristicDetail::Weighted { selected_videos, .. } => {
                assert_eq!(selected_videos, &vec!["v03".to_string()]);
            }
            other => panic!("unexpected detail {other:?}"),
        }
        assert_eq!(r.selected_count, 1);
    }

    #[test]
    fn adaptive_switches_on_skew() {
        let symmetric = distribution_adaptive(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(matches!(symmetric.detail, HeuristicDetail::Adaptive { near_normal: true, .. }));
        assert_relative_eq!(symmetric.threshold, 3.0 + 2.0f64.sqrt());

        let skewed = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 20.0];
        let r = distribution_adaptive(&skewed);
        assert!(matches!(r.detail, HeuristicDetail::Adaptive { near_normal: false, .. }));
        assert_relative_eq!(r.threshold, stats::percentile(&skewed, 75.0));
    }

    #[test]
    fn report_runs_full_battery() {
        let t = table(unlabeled(&[(3, 0.2), (5, 0.4), (6, 0.9), (9, 0.3), (12, 1.1)]));
        let report = methods_report(&t, 0.7);
        assert_eq!(report.len(), 4 + 6 + 3);
        assert!(report.contains_key("stddev_cplx_1.5"));
        assert!(report.contains_key("percentile_cplx_75"));
        assert!(report.contains_key("adaptive_dist"));
    }

    #[test]
    fn empty_input_does_not_panic() {
        let t = table(Vec::new());
        let report = methods_report(&t, 0.7);
        assert!(report.values().all(|r| r.selected_count == 0 && r.percentage == 0.0));
    }
}
