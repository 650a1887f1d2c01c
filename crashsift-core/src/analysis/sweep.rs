//! Threshold grid sweep and supervised scoring.
//!
//! Every (complexity, dynamic) pair of a [`ThresholdGrid`] is applied to the
//! metrics table as a selection mask. Each pair yields a
//! [`ThresholdCandidate`] with the selected count, the mean metrics of the
//! selection and their lift over the whole table. When at least one video
//! carries a known judgement the candidate is also scored against the
//! labels.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::SweepRange;
use crate::processing::MetricsTable;
use crate::stats;
use crate::types::{FilterLogic, HumanJudgement, ThresholdPair, UnknownLabelPolicy, VideoRecord};

/// Grid values are rounded to this many decimal places.
const GRID_DECIMALS: i32 = 9;

/// Which axis varies slowest when walking the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SweepOrder {
    #[default]
    ComplexityMajor,
    DynamicMajor,
}

/// Complexity and dynamic thresholds to sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdGrid {
    pub complexity: Vec<u32>,
    pub dynamic: Vec<f64>,
    pub order: SweepOrder,
}

impl ThresholdGrid {
    /// Half-open `[start, stop)` range with `ceil((stop - start) / step)`
    /// points at `start + i * step`, each rounded to 1e-9.
    #[must_use]
    pub fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
        if !(step > 0.0) || !(stop > start) {
            return Vec::new();
        }
        let n = ((stop - start) / step).ceil() as usize;
        let scale = 10f64.powi(GRID_DECIMALS);
        (0..n)
            .map(|i| ((start + i as f64 * step) * scale).round() / scale)
            .collect()
    }

    #[must_use]
    pub fn from_range(range: &SweepRange, order: SweepOrder) -> Self {
        Self {
            complexity: (range.complexity_min..=range.complexity_max).collect(),
            dynamic: Self::arange(range.dynamic_start, range.dynamic_stop, range.dynamic_step),
            order,
        }
    }

    /// All threshold pairs in sweep order.
    #[must_use]
    pub fn pairs(&self) -> Vec<ThresholdPair> {
        let mut pairs = Vec::with_capacity(self.complexity.len() * self.dynamic.len());
        match self.order {
            SweepOrder::ComplexityMajor => {
                for &c in &self.complexity {
                    for &d in &self.dynamic {
                        pairs.push(ThresholdPair::new(c, d));
                    }
                }
            }
            SweepOrder::DynamicMajor => {
                for &d in &self.dynamic {
                    for &c in &self.complexity {
                        pairs.push(ThresholdPair::new(c, d));
                    }
                }
            }
        }
        pairs
    }
}

/// Confusion counts and derived scores of one selection mask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SupervisedScore {
    pub tp: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tn: usize,
    /// Unlabeled videos left out of the counts.
    pub unknown: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

impl SupervisedScore {
    #[must_use]
    pub fn from_counts(tp: usize, fp: usize, fn_: usize, tn: usize, unknown: usize) -> Self {
        let precision = if tp + fp > 0 { tp as f64 / (tp + fp) as f64 } else { 0.0 };
        let recall = if tp + fn_ > 0 { tp as f64 / (tp + fn_) as f64 } else { 0.0 };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            tp,
            fp,
            fn_,
            tn,
            unknown,
            precision,
            recall,
            f1,
        }
    }

    #[must_use]
    pub fn predicted_positive(&self) -> usize {
        self.tp + self.fp
    }

    #[must_use]
    pub fn actual_positive(&self) -> usize {
        self.tp + self.fn_
    }
}

/// Summary of one threshold pair applied to the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdCandidate {
    pub complexity_threshold: u32,
    pub dynamic_threshold: f64,
    #[serde(rename = "count")]
    pub selected_count: usize,
    pub percentage: f64,
    pub avg_dynamic: f64,
    pub avg_complexity: f64,
    pub dynamic_improvement: f64,
    pub complexity_improvement: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<SupervisedScore>,
}

impl ThresholdCandidate {
    #[must_use]
    pub fn thresholds(&self) -> ThresholdPair {
        ThresholdPair::new(self.complexity_threshold, self.dynamic_threshold)
    }

    #[must_use]
    pub fn f1(&self) -> f64 {
        self.score.map_or(0.0, |s| s.f1)
    }
}

/// Boolean selection per record, in table order.
#[must_use]
pub fn selection_mask(records: &[VideoRecord], thresholds: ThresholdPair, logic: FilterLogic) -> Vec<bool> {
    records.iter().map(|r| r.passes(thresholds, logic)).collect()
}

/// Confusion counts of a mask against the records' judgements.
#[must_use]
pub fn score_mask(records: &[VideoRecord], mask: &[bool], policy: UnknownLabelPolicy) -> SupervisedScore {
    let (mut tp, mut fp, mut fn_, mut tn, mut unknown) = (0, 0, 0, 0, 0);
    for (record, &selected) in records.iter().zip(mask) {
        let judgement = match (record.human_judgement, policy) {
            (HumanJudgement::Unknown, UnknownLabelPolicy::TreatAsNegative) => HumanJudgement::Negative,
            (j, _) => j,
        };
        match (judgement, selected) {
            (HumanJudgement::Positive, true) => tp += 1,
            (HumanJudgement::Negative, true) => fp += 1,
            (HumanJudgement::Positive, false) => fn_ += 1,
            (HumanJudgement::Negative, false) => tn += 1,
            (HumanJudgement::Unknown, _) => unknown += 1,
        }
    }
    SupervisedScore::from_counts(tp, fp, fn_, tn, unknown)
}

/// Count statistics of the records selected by `mask`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SelectionStats {
    pub count: usize,
    pub percentage: f64,
    pub avg_dynamic: f64,
    pub avg_complexity: f64,
    pub dynamic_improvement: f64,
    pub complexity_improvement: f64,
}

#[must_use]
pub fn selection_stats(records: &[VideoRecord], mask: &[bool]) -> SelectionStats {
    let all_dyn: Vec<f64> = records.iter().map(|r| r.dynamic_change).collect();
    let all_cplx: Vec<f64> = records.iter().map(|r| f64::from(r.scene_complexity)).collect();
    let selected: Vec<&VideoRecord> = records
        .iter()
        .zip(mask)
        .filter_map(|(r, &m)| m.then_some(r))
        .collect();
    let sel_dyn: Vec<f64> = selected.iter().map(|r| r.dynamic_change).collect();
    let sel_cplx: Vec<f64> = selected.iter().map(|r| f64::from(r.scene_complexity)).collect();

    let avg_dynamic = stats::mean(&sel_dyn);
    let avg_complexity = stats::mean(&sel_cplx);
    SelectionStats {
        count: selected.len(),
        percentage: stats::ratio_pct(selected.len(), records.len()),
        avg_dynamic,
        avg_complexity,
        dynamic_improvement: if selected.is_empty() {
            0.0
        } else {
            stats::improvement_pct(avg_dynamic, stats::mean(&all_dyn))
        },
        complexity_improvement: if selected.is_empty() {
            0.0
        } else {
            stats::improvement_pct(avg_complexity, stats::mean(&all_cplx))
        },
    }
}

/// Applies every pair of `grid` to the table.
#[must_use]
pub fn sweep(
    table: &MetricsTable,
    grid: &ThresholdGrid,
    logic: FilterLogic,
    policy: UnknownLabelPolicy,
) -> Vec<ThresholdCandidate> {
    let records = table.records();
    let labeled = records.iter().any(|r| r.human_judgement.is_known());
    let pairs = grid.pairs();
    log::debug!(
        "Sweeping {} threshold pairs ({} logic, {} videos, labeled: {})",
        pairs.len(),
        logic,
        records.len(),
        labeled
    );

    pairs
        .into_iter()
        .map(|thresholds| {
            let mask = selection_mask(records, thresholds, logic);
            let stats = selection_stats(records, &mask);
            ThresholdCandidate {
                complexity_threshold: thresholds.complexity,
                dynamic_threshold: thresholds.dynamic,
                selected_count: stats.count,
                percentage: stats.percentage,
                avg_dynamic: stats.avg_dynamic,
                avg_complexity: stats.avg_complexity,
                dynamic_improvement: stats.dynamic_improvement,
                complexity_improvement: stats.complexity_improvement,
                score: labeled.then(|| score_mask(records, &mask, policy)),
            }
        })
        .collect()
}

/// First candidate with the maximal F1, if any candidate was scored.
#[must_use]
pub fn best_by_f1(candidates: &[ThresholdCandidate]) -> Option<&ThresholdCandidate> {
    let mut best: Option<&ThresholdCandidate> = None;
    for candidate in candidates.iter().filter(|c| c.score.is_some()) {
        if best.is_none_or(|b| candidate.f1() > b.f1()) {
            best = Some(candidate);
        }
    }
    best
}

/// The `k` highest-F1 candidates, ties kept in sweep order.
#[must_use]
pub fn top_by_f1(candidates: &[ThresholdCandidate], k: usize) -> Vec<ThresholdCandidate> {
    let mut scored: Vec<ThresholdCandidate> = candidates
        .iter()
        .filter(|c| c.score.is_some())
        .cloned()
        .collect();
    scored.sort_by(|a, b| b.f1().total_cmp(&a.f1()));
    scored.truncate(k);
    scored
}

/// Entry of the keyed sweep table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepCell {
    pub complexity_threshold: u32,
    pub dynamic_threshold: f64,
    pub count: usize,
    pub percentage: f64,
}

/// Sweep results keyed `cplx_<c>_dyn_<d:.2>`.
#[must_use]
pub fn sweep_table(candidates: &[ThresholdCandidate]) -> BTreeMap<String, SweepCell> {
    candidates
        .iter()
        .map(|c| {
            (
                sweep_key(c.thresholds()),
                SweepCell {
                    complexity_threshold: c.complexity_threshold,
                    dynamic_threshold: c.dynamic_threshold,
                    count: c.selected_count,
                    percentage: c.percentage,
                },
            )
        })
        .collect()
}

#[must_use]
pub fn sweep_key(thresholds: ThresholdPair) -> String {
    format!("cplx_{}_dyn_{:.2}", thresholds.complexity, thresholds.dynamic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{record, table};
    use approx::assert_relative_eq;

    /// Ten records: five positives with high metrics, five negatives low.
    fn ten() -> MetricsTable {
        let mut records = Vec::new();
        for i in 0..5 {
            records.push(record(&format!("p{i}"), 8 + i, 0.8, HumanJudgement::Positive));
            records.push(record(&format!("n{i}"), 2, 0.1 + 0.05 * i as f64, HumanJudgement::Negative));
        }
        table(records)
    }

    fn single(t: &MetricsTable, c: u32, d: f64, logic: FilterLogic) -> ThresholdCandidate {
        let grid = ThresholdGrid {
            complexity: vec![c],
            dynamic: vec![d],
            order: SweepOrder::ComplexityMajor,
        };
        sweep(t, &grid, logic, UnknownLabelPolicy::Exclude).remove(0)
    }

    #[test]
    fn arange_matches_half_open_grid() {
        let coarse = ThresholdGrid::arange(0.0, 1.1, 0.1);
        assert_eq!(coarse.len(), 11);
        assert_eq!(coarse[3], 0.3);
        assert_eq!(coarse[10], 1.0);

        let fine = ThresholdGrid::arange(0.50, 0.95, 0.05);
        assert_eq!(fine.len(), 9);
        assert_eq!(fine[0], 0.5);
        assert_eq!(fine[8], 0.9);
        assert!(ThresholdGrid::arange(1.0, 1.0, 0.1).is_empty());
    }

    #[test]
    fn default_grids_have_expected_sizes() {
        let f1 = ThresholdGrid::from_range(&SweepRange::F1_DEFAULT, SweepOrder::DynamicMajor);
        assert_eq!(f1.pairs().len(), 12 * 11);
        let count = ThresholdGrid::from_range(&SweepRange::COUNT_DEFAULT, SweepOrder::ComplexityMajor);
        assert_eq!(count.pairs().len(), 6 * 9);
        assert_eq!(count.pairs()[1], ThresholdPair::new(4, 0.55));
    }

    #[test]
    fn all_pass_gives_full_recall() {
        let c = single(&ten(), 0, 0.0, FilterLogic::And);
        let s = c.score.unwrap();
        assert_eq!(c.selected_count, 10);
        assert_eq!((s.tp, s.fp, s.fn_, s.tn), (5, 5, 0, 0));
        assert_relative_eq!(s.recall, 1.0);
        assert_relative_eq!(s.precision, 0.5);
        assert_relative_eq!(s.f1, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn all_fail_scores_zero_without_panicking() {
        let c = single(&ten(), 100, 5.0, FilterLogic::And);
        let s = c.score.unwrap();
        assert_eq!(c.selected_count, 0);
        assert_eq!((s.precision, s.recall, s.f1), (0.0, 0.0, 0.0));
        assert_eq!(c.avg_dynamic, 0.0);
        assert_eq!(c.dynamic_improvement, 0.0);
    }

    #[test]
    fn exact_split_is_perfect() {
        let c = single(&ten(), 8, 0.5, FilterLogic::And);
        let s = c.score.unwrap();
        assert_eq!((s.tp, s.fp, s.fn_, s.tn), (5, 0, 0, 5));
        assert_relative_eq!(s.f1, 1.0);
    }

    #[test]
    fn or_logic_selects_either_metric() {
        let t = ten();
        assert_eq!(single(&t, 100, 0.5, FilterLogic::Or).selected_count, 5);
        assert_eq!(single(&t, 100, 0.5, FilterLogic::And).selected_count, 0);
    }

    #[test]
    fn raising_a_threshold_never_grows_the_selection() {
        let t = ten();
        let grid = ThresholdGrid::from_range(&SweepRange::F1_DEFAULT, SweepOrder::ComplexityMajor);
        for logic in [FilterLogic::And, FilterLogic::Or] {
            let results = sweep(&t, &grid, logic, UnknownLabelPolicy::Exclude);
            let count = |c: u32, d: f64| {
                results
                    .iter()
                    .find(|r| r.complexity_threshold == c && r.dynamic_threshold == d)
                    .map(|r| r.selected_count)
                    .unwrap()
            };
            for w in grid.complexity.windows(2) {
                for &d in &grid.dynamic {
                    assert!(count(w[1], d) <= count(w[0], d));
                }
            }
            for w in grid.dynamic.windows(2) {
                for &c in &grid.complexity {
                    assert!(count(c, w[1]) <= count(c, w[0]));
                }
            }
        }
    }

    #[test]
    fn unknown_labels_follow_policy() {
        let t = table(vec![
            record("a", 5, 0.5, HumanJudgement::Positive),
            record("b", 5, 0.5, HumanJudgement::Unknown),
        ]);
        let mask = vec![true, true];
        let excluded = score_mask(t.records(), &mask, UnknownLabelPolicy::Exclude);
        assert_eq!((excluded.tp, excluded.fp, excluded.unknown), (1, 0, 1));
        let negative = score_mask(t.records(), &mask, UnknownLabelPolicy::TreatAsNegative);
        assert_eq!((negative.tp, negative.fp, negative.unknown), (1, 1, 0));
    }

    #[test]
    fn unlabeled_table_has_no_scores() {
        let t = table(vec![record("a", 5, 0.5, HumanJudgement::Unknown)]);
        let c = single(&t, 1, 0.1, FilterLogic::And);
        assert!(c.score.is_none());
        assert!(best_by_f1(&[c]).is_none());
    }

    #[test]
    fn best_by_f1_takes_first_maximum() {
        let t = ten();
        let grid = ThresholdGrid {
            complexity: vec![8, 9, 100],
            dynamic: vec![0.5],
            order: SweepOrder::ComplexityMajor,
        };
        let results = sweep(&t, &grid, FilterLogic::And, UnknownLabelPolicy::Exclude);
        let best = best_by_f1(&results).unwrap();
        assert_eq!(best.complexity_threshold, 8);
        let top = top_by_f1(&results, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].complexity_threshold, 8);
        assert_eq!(top[1].complexity_threshold, 9);
    }

    #[test]
    fn sweep_keys_use_two_decimals() {
        assert_eq!(sweep_key(ThresholdPair::new(6, 0.7)), "cplx_6_dyn_0.70");
        assert_eq!(sweep_key(ThresholdPair::new(4, 0.55)), "cplx_4_dyn_0.55");
    }
}
