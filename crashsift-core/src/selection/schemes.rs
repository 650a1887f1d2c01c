//! Per-candidate result sets.
//!
//! A scheme is a ranked candidate applied to the table with AND logic: the
//! list of surviving videos plus statistics describing them.

use serde::{Deserialize, Serialize};

use crate::analysis::ThresholdCandidate;
use crate::processing::MetricsTable;
use crate::stats;
use crate::types::{FilterLogic, ThresholdPair, VideoRecord};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineAverages {
    pub avg_dynamic: f64,
    pub avg_complexity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilteredAverages {
    pub avg_dynamic: f64,
    pub avg_complexity: f64,
    pub min_dynamic: f64,
    pub max_dynamic: f64,
    pub min_complexity: u32,
    pub max_complexity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    pub dynamic_percent: f64,
    pub complexity_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeStatistics {
    pub scheme_id: usize,
    pub complexity_threshold: u32,
    pub dynamic_threshold: f64,
    pub total_videos: usize,
    pub filtered_count: usize,
    pub retention_rate: f64,
    pub baseline: BaselineAverages,
    pub filtered: FilteredAverages,
    pub improvement: Improvement,
}

impl SchemeStatistics {
    #[must_use]
    pub fn thresholds(&self) -> ThresholdPair {
        ThresholdPair::new(self.complexity_threshold, self.dynamic_threshold)
    }
}

/// A selected video as listed in scheme and final exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeVideo {
    pub video_name: String,
    pub accident_frame: usize,
    pub scene_complexity: u32,
    pub dynamic_change: f64,
    pub window_length: usize,
}

impl From<&VideoRecord> for SchemeVideo {
    fn from(r: &VideoRecord) -> Self {
        Self {
            video_name: r.video_name.clone(),
            accident_frame: r.accident_frame,
            scene_complexity: r.scene_complexity,
            dynamic_change: r.dynamic_change,
            window_length: r.window_length,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeResult {
    pub description: String,
    pub statistics: SchemeStatistics,
    /// Sorted by dynamic change, descending.
    pub videos: Vec<SchemeVideo>,
}

impl SchemeResult {
    /// File name of this scheme's export, e.g. `05_scheme_01_C6_D0.70.json`.
    #[must_use]
    pub fn file_name(&self) -> String {
        scheme_file_name(self.statistics.scheme_id, self.statistics.thresholds())
    }
}

#[must_use]
pub fn scheme_file_name(scheme_id: usize, thresholds: ThresholdPair) -> String {
    format!(
        "05_scheme_{:02}_C{}_D{:.2}.json",
        scheme_id, thresholds.complexity, thresholds.dynamic
    )
}

/// Applies `thresholds` with AND logic and summarises the survivors.
#[must_use]
pub fn build_scheme(table: &MetricsTable, scheme_id: usize, thresholds: ThresholdPair) -> SchemeResult {
    let records = table.records();
    let mut selected: Vec<&VideoRecord> = records
        .iter()
        .filter(|r| r.passes(thresholds, FilterLogic::And))
        .collect();
    selected.sort_by(|a, b| b.dynamic_change.total_cmp(&a.dynamic_change));

    let base_dyn = stats::mean(&table.dynamic_values());
    let base_cplx = stats::mean(&table.complexity_values());
    let sel_dyn: Vec<f64> = selected.iter().map(|r| r.dynamic_change).collect();
    let sel_cplx: Vec<f64> = selected.iter().map(|r| f64::from(r.scene_complexity)).collect();
    let avg_dynamic = stats::mean(&sel_dyn);
    let avg_complexity = stats::mean(&sel_cplx);
    let lift = |value: f64, base: f64| {
        if selected.is_empty() {
            0.0
        } else {
            stats::improvement_pct(value, base)
        }
    };

    let statistics = SchemeStatistics {
        scheme_id,
        complexity_threshold: thresholds.complexity,
        dynamic_threshold: thresholds.dynamic,
        total_videos: records.len(),
        filtered_count: selected.len(),
        retention_rate: stats::ratio_pct(selected.len(), records.len()),
        baseline: BaselineAverages {
            avg_dynamic: base_dyn,
            avg_complexity: base_cplx,
        },
        filtered: FilteredAverages {
            avg_dynamic,
            avg_complexity,
            min_dynamic: stats::min(&sel_dyn),
            max_dynamic: stats::max(&sel_dyn),
            min_complexity: selected.iter().map(|r| r.scene_complexity).min().unwrap_or(0),
            max_complexity: selected.iter().map(|r| r.scene_complexity).max().unwrap_or(0),
        },
        improvement: Improvement {
            dynamic_percent: lift(avg_dynamic, base_dyn),
            complexity_percent: lift(avg_complexity, base_cplx),
        },
    };

    SchemeResult {
        description: format!(
            "Scheme #{}: Complexity>={}, Dynamic>={:.4}",
            scheme_id, thresholds.complexity, thresholds.dynamic
        ),
        statistics,
        videos: selected.into_iter().map(SchemeVideo::from).collect(),
    }
}

/// Builds one scheme per candidate, numbered from 1 in candidate order.
#[must_use]
pub fn build_schemes(table: &MetricsTable, candidates: &[ThresholdCandidate]) -> Vec<SchemeResult> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| build_scheme(table, i + 1, c.thresholds()))
        .collect()
}

/// One row of `05_schemes_summary.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeSummaryRow {
    pub scheme_id: usize,
    pub complexity_threshold: u32,
    pub dynamic_threshold: f64,
    pub video_count: usize,
    pub retention_rate: f64,
    pub avg_dynamic: f64,
    pub avg_complexity: f64,
    pub dynamic_improvement: f64,
    pub complexity_improvement: f64,
}

impl From<&SchemeResult> for SchemeSummaryRow {
    fn from(s: &SchemeResult) -> Self {
        let st = &s.statistics;
        Self {
            scheme_id: st.scheme_id,
            complexity_threshold: st.complexity_threshold,
            dynamic_threshold: st.dynamic_threshold,
            video_count: st.filtered_count,
            retention_rate: st.retention_rate,
            avg_dynamic: st.filtered.avg_dynamic,
            avg_complexity: st.filtered.avg_complexity,
            dynamic_improvement: st.improvement.dynamic_percent,
            complexity_improvement: st.improvement.complexity_percent,
        }
    }
}

/// Body of `05_schemes_comparison.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemesComparison {
    pub description: String,
    pub total_schemes: usize,
    pub schemes: Vec<SchemeResult>,
}

impl SchemesComparison {
    #[must_use]
    pub fn new(schemes: Vec<SchemeResult>) -> Self {
        Self {
            description: "Filtering results of all candidate schemes".to_string(),
            total_schemes: schemes.len(),
            schemes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{table, unlabeled};
    use approx::assert_relative_eq;

    #[test]
    fn scheme_keeps_and_orders_survivors() {
        let t = table(unlabeled(&[(6, 0.7), (8, 0.9), (5, 0.95), (7, 0.75), (2, 0.1)]));
        let s = build_scheme(&t, 1, ThresholdPair::new(6, 0.7));

        let names: Vec<&str> = s.videos.iter().map(|v| v.video_name.as_str()).collect();
        assert_eq!(names, vec!["v01", "v03", "v00"]);
        assert_eq!(s.statistics.filtered_count, 3);
        assert_relative_eq!(s.statistics.retention_rate, 60.0);
        assert_eq!(s.statistics.filtered.min_complexity, 6);
        assert_eq!(s.statistics.filtered.max_complexity, 8);
        assert_relative_eq!(s.statistics.filtered.max_dynamic, 0.9);
        assert_relative_eq!(s.statistics.baseline.avg_complexity, 5.6);
        assert_relative_eq!(
            s.statistics.improvement.complexity_percent,
            (7.0 / 5.6 - 1.0) * 100.0,
            epsilon = 1e-9
        );
        assert_eq!(s.file_name(), "05_scheme_01_C6_D0.70.json");
    }

    #[test]
    fn empty_scheme_has_zero_statistics() {
        let t = table(unlabeled(&[(1, 0.1)]));
        let s = build_scheme(&t, 12, ThresholdPair::new(9, 0.9));
        assert!(s.videos.is_empty());
        assert_eq!(s.statistics.filtered.max_complexity, 0);
        assert_eq!(s.statistics.improvement.dynamic_percent, 0.0);
        assert_eq!(s.file_name(), "05_scheme_12_C9_D0.90.json");
    }
}
