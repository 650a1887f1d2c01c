//! Row types and writers for the tabular exports, plus the snapshot loader
//! used to re-run selection without touching the tensor archives.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{files, write_csv, write_json};
use crate::analysis::comparison::{StrategyStats, SubsetStats};
use crate::analysis::{StrategyComparison, SupervisedScore, ThresholdCandidate};
use crate::error::{CoreError, CoreResult};
use crate::processing::{GlobalReference, MetricsTable};
use crate::types::{HumanJudgement, SkipReport, VideoRecord};

/// One line of `00_raw_metrics.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetricsRow {
    pub video_name: String,
    pub accident_frame: usize,
    pub dynamic_change: f64,
    pub scene_complexity: u32,
    pub window_length: usize,
    pub has_vru_interaction: bool,
    /// 1, 0 or empty.
    pub human_judgement: Option<u8>,
}

impl From<&VideoRecord> for RawMetricsRow {
    fn from(r: &VideoRecord) -> Self {
        Self {
            video_name: r.video_name.clone(),
            accident_frame: r.accident_frame,
            dynamic_change: r.dynamic_change,
            scene_complexity: r.scene_complexity,
            window_length: r.window_length,
            has_vru_interaction: r.has_vru_interaction,
            human_judgement: r.human_judgement.as_label(),
        }
    }
}

impl From<RawMetricsRow> for VideoRecord {
    fn from(row: RawMetricsRow) -> Self {
        Self {
            video_name: row.video_name,
            accident_frame: row.accident_frame,
            window_length: row.window_length,
            dynamic_change: row.dynamic_change,
            scene_complexity: row.scene_complexity,
            has_vru_interaction: row.has_vru_interaction,
            human_judgement: row
                .human_judgement
                .map_or(HumanJudgement::Unknown, |l| HumanJudgement::from_label(i64::from(l))),
        }
    }
}

/// Normalisation epoch and skip counts stored next to the raw metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub reference: GlobalReference,
    pub skips: SkipReport,
    pub video_count: usize,
}

/// Writes `00_raw_metrics.csv` and `00_global_reference.json`.
pub fn write_metrics_snapshot(dir: &Path, table: &MetricsTable) -> CoreResult<()> {
    let rows: Vec<RawMetricsRow> = table.records().iter().map(RawMetricsRow::from).collect();
    write_csv(&dir.join(files::RAW_METRICS), &rows)?;
    write_json(
        &dir.join(files::GLOBAL_REFERENCE),
        &MetricsSnapshot {
            reference: table.reference(),
            skips: table.skips().clone(),
            video_count: table.len(),
        },
    )
}

pub fn load_metrics_csv(path: &Path) -> CoreResult<Vec<VideoRecord>> {
    if !path.is_file() {
        return Err(CoreError::not_found("Metrics snapshot", path));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let mut records = Vec::new();
    for row in reader.deserialize::<RawMetricsRow>() {
        records.push(VideoRecord::from(row?));
    }
    log::debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Rebuilds the metrics table exported by a previous run in `dir`.
///
/// The values are taken as written; nothing is renormalised. A missing
/// reference file leaves the table's epoch unknown.
pub fn load_metrics_snapshot(dir: &Path) -> CoreResult<MetricsTable> {
    let records = load_metrics_csv(&dir.join(files::RAW_METRICS))?;
    let reference_path = dir.join(files::GLOBAL_REFERENCE);
    let snapshot: Option<MetricsSnapshot> = if reference_path.is_file() {
        Some(serde_json::from_slice(&std::fs::read(&reference_path)?)?)
    } else {
        log::warn!(
            "{} not found; global reference of the snapshot is unknown",
            reference_path.display()
        );
        None
    };
    let (reference, skips) = match snapshot {
        Some(s) => (s.reference, s.skips),
        None => (
            GlobalReference {
                value: None,
                percentile: 0.0,
                contributing_videos: 0,
            },
            SkipReport::default(),
        ),
    };
    Ok(MetricsTable::from_parts(records, reference, skips))
}

/// One line of `02_threshold_sweep_results.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepResultRow {
    pub dynamic_threshold: f64,
    pub complexity_threshold: u32,
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tn: usize,
    pub recall: f64,
    pub precision: f64,
    pub f1: f64,
    pub predicted_positive: usize,
    pub actual_positive: usize,
}

impl SweepResultRow {
    fn new(candidate: &ThresholdCandidate, score: &SupervisedScore) -> Self {
        Self {
            dynamic_threshold: candidate.dynamic_threshold,
            complexity_threshold: candidate.complexity_threshold,
            tp: score.tp,
            fp: score.fp,
            fn_: score.fn_,
            tn: score.tn,
            recall: score.recall,
            precision: score.precision,
            f1: score.f1,
            predicted_positive: score.predicted_positive(),
            actual_positive: score.actual_positive(),
        }
    }
}

/// Rows for every scored candidate, in sweep order.
#[must_use]
pub fn sweep_result_rows(candidates: &[ThresholdCandidate]) -> Vec<SweepResultRow> {
    candidates
        .iter()
        .filter_map(|c| c.score.as_ref().map(|s| SweepResultRow::new(c, s)))
        .collect()
}

/// Body of `03_optimal_config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimalConfig {
    pub dynamic_change_threshold: f64,
    pub scene_complexity_threshold: f64,
    pub recall: f64,
    pub precision: f64,
    pub f1: f64,
    pub true_positive: usize,
    pub false_positive: usize,
    pub false_negative: usize,
}

impl OptimalConfig {
    #[must_use]
    pub fn from_candidate(candidate: &ThresholdCandidate) -> Option<Self> {
        let score = candidate.score.as_ref()?;
        Some(Self {
            dynamic_change_threshold: candidate.dynamic_threshold,
            scene_complexity_threshold: f64::from(candidate.complexity_threshold),
            recall: score.recall,
            precision: score.precision,
            f1: score.f1,
            true_positive: score.tp,
            false_positive: score.fp,
            false_negative: score.fn_,
        })
    }
}

/// One line of `03_threshold_sweep_table.csv`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepTableRow {
    pub complexity: u32,
    pub dynamic: f64,
    pub count: usize,
    pub percentage: f64,
}

impl From<&ThresholdCandidate> for SweepTableRow {
    fn from(c: &ThresholdCandidate) -> Self {
        Self {
            complexity: c.complexity_threshold,
            dynamic: c.dynamic_threshold,
            count: c.selected_count,
            percentage: c.percentage,
        }
    }
}

pub fn load_candidates(path: &Path) -> CoreResult<Vec<ThresholdCandidate>> {
    if !path.is_file() {
        return Err(CoreError::not_found("Candidate list", path));
    }
    Ok(serde_json::from_slice(&std::fs::read(path)?)?)
}

/// Strategy entry of `strategy_comparison.json`, without the video list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyEntry {
    pub statistics: StrategyStats,
    pub recommended: bool,
}

/// Body of `strategy_comparison.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyOverview {
    pub total_videos: usize,
    pub baseline: SubsetStats,
    pub strategies: BTreeMap<String, StrategyEntry>,
}

impl From<&StrategyComparison> for StrategyOverview {
    fn from(c: &StrategyComparison) -> Self {
        Self {
            total_videos: c.total_videos,
            baseline: c.baseline,
            strategies: c
                .strategies
                .iter()
                .map(|s| {
                    (
                        s.name.clone(),
                        StrategyEntry {
                            statistics: s.statistics,
                            recommended: s.recommended,
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Writes `strategy_comparison.json` and one `filtered_<name>.json` per
/// strategy.
pub fn write_strategy_comparison(dir: &Path, comparison: &StrategyComparison) -> CoreResult<()> {
    write_json(
        &dir.join(files::STRATEGY_COMPARISON),
        &StrategyOverview::from(comparison),
    )?;
    for strategy in &comparison.strategies {
        write_json(&dir.join(files::strategy_videos(&strategy.name)), strategy)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::record;
    use tempfile::tempdir;

    fn sample_table() -> MetricsTable {
        let mut positive = record("b.mp4", 7, 0.8, HumanJudgement::Positive);
        positive.has_vru_interaction = true;
        MetricsTable::from_parts(
            vec![
                positive,
                record("a.mp4", 3, 0.25, HumanJudgement::Unknown),
                record("c.mp4", 5, 1.0, HumanJudgement::Negative),
            ],
            GlobalReference {
                value: Some(7.6),
                percentile: 95.0,
                contributing_videos: 3,
            },
            SkipReport {
                unannotated: 2,
                ..SkipReport::default()
            },
        )
    }

    #[test]
    fn snapshot_reloads_identically() {
        let dir = tempdir().unwrap();
        let table = sample_table();
        write_metrics_snapshot(dir.path(), &table).unwrap();

        let csv = std::fs::read_to_string(dir.path().join(files::RAW_METRICS)).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("video_name,accident_frame,dynamic_change,scene_complexity,window_length,has_vru_interaction,human_judgement")
        );
        assert_eq!(lines.next(), Some("a.mp4,30,0.25,3,60,false,"));

        let loaded = load_metrics_snapshot(dir.path()).unwrap();
        assert_eq!(loaded.records(), table.records());
        assert_eq!(loaded.reference(), table.reference());
        assert_eq!(loaded.skips().unannotated, 2);
    }

    #[test]
    fn missing_snapshot_is_data_not_found() {
        let dir = tempdir().unwrap();
        let err = load_metrics_snapshot(dir.path()).unwrap_err();
        assert!(err.is_data_not_found());
    }

    #[test]
    fn sweep_rows_skip_unscored_candidates() {
        let scored = ThresholdCandidate {
            complexity_threshold: 4,
            dynamic_threshold: 0.3,
            selected_count: 2,
            percentage: 50.0,
            avg_dynamic: 0.0,
            avg_complexity: 0.0,
            dynamic_improvement: 0.0,
            complexity_improvement: 0.0,
            score: Some(SupervisedScore::from_counts(1, 1, 1, 1, 0)),
        };
        let unscored = ThresholdCandidate {
            score: None,
            ..scored.clone()
        };
        let rows = sweep_result_rows(&[scored.clone(), unscored]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].predicted_positive, 2);
        assert_eq!(rows[0].actual_positive, 2);

        let optimal = OptimalConfig::from_candidate(&scored).unwrap();
        assert_eq!(optimal.scene_complexity_threshold, 4.0);
        assert_eq!(optimal.false_negative, 1);
    }
}
