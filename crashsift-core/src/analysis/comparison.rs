//! Single-metric versus joint filtering, and old-versus-new threshold
//! comparisons.

use serde::{Deserialize, Serialize};

use crate::processing::MetricsTable;
use crate::stats;
use crate::types::{FilterLogic, HumanJudgement, ThresholdPair, VideoRecord};

/// Means of a subset of the table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubsetStats {
    pub count: usize,
    pub complexity: f64,
    pub dynamic: f64,
    /// Fraction of the subset with a VRU interaction.
    pub vru_rate: f64,
}

impl SubsetStats {
    fn of<'a>(records: impl IntoIterator<Item = &'a VideoRecord>) -> Self {
        let mut cplx = Vec::new();
        let mut dynamic = Vec::new();
        let mut vru = 0usize;
        for r in records {
            cplx.push(f64::from(r.scene_complexity));
            dynamic.push(r.dynamic_change);
            vru += usize::from(r.has_vru_interaction);
        }
        Self {
            count: cplx.len(),
            complexity: stats::mean(&cplx),
            dynamic: stats::mean(&dynamic),
            vru_rate: if cplx.is_empty() { 0.0 } else { vru as f64 / cplx.len() as f64 },
        }
    }
}

/// A filtered subset with its lift over the baseline, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FilteredStats {
    #[serde(flatten)]
    pub subset: SubsetStats,
    pub complexity_improvement: f64,
    pub dynamic_improvement: f64,
}

impl FilteredStats {
    fn against(subset: SubsetStats, baseline: &SubsetStats) -> Self {
        let lift = |value: f64, base: f64| {
            if subset.count == 0 {
                0.0
            } else {
                stats::improvement_pct(value, base)
            }
        };
        Self {
            subset,
            complexity_improvement: lift(subset.complexity, baseline.complexity),
            dynamic_improvement: lift(subset.dynamic, baseline.dynamic),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImprovementMetrics {
    pub thresholds: ThresholdPair,
    pub baseline: SubsetStats,
    pub only_complexity: FilteredStats,
    pub only_dynamic: FilteredStats,
    pub both: FilteredStats,
    /// Extra complexity lift of the joint filter over complexity alone.
    pub complexity_extra: f64,
    /// Extra dynamic lift of the joint filter over dynamic alone.
    pub dynamic_extra: f64,
    /// Pearson correlation between the two metrics over the whole table.
    pub correlation: f64,
}

/// Compares complexity-only, dynamic-only and joint filtering at
/// `thresholds` against the unfiltered table.
#[must_use]
pub fn improvement_metrics(table: &MetricsTable, thresholds: ThresholdPair) -> ImprovementMetrics {
    let records = table.records();
    let baseline = SubsetStats::of(records);
    let cplx_pass = |r: &&VideoRecord| r.scene_complexity >= thresholds.complexity;
    let dyn_pass = |r: &&VideoRecord| r.dynamic_change >= thresholds.dynamic;

    let only_complexity = SubsetStats::of(records.iter().filter(cplx_pass));
    let only_dynamic = SubsetStats::of(records.iter().filter(dyn_pass));
    let both = SubsetStats::of(records.iter().filter(cplx_pass).filter(dyn_pass));

    let extra = |joint: f64, single: f64| {
        if both.count == 0 {
            0.0
        } else {
            stats::improvement_pct(joint, single)
        }
    };

    ImprovementMetrics {
        thresholds,
        baseline,
        only_complexity: FilteredStats::against(only_complexity, &baseline),
        only_dynamic: FilteredStats::against(only_dynamic, &baseline),
        both: FilteredStats::against(both, &baseline),
        complexity_extra: extra(both.complexity, only_complexity.complexity),
        dynamic_extra: extra(both.dynamic, only_dynamic.dynamic),
        correlation: stats::pearson(&table.complexity_values(), &table.dynamic_values()),
    }
}

/// Statistics of one filtering strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StrategyStats {
    pub count: usize,
    pub retention_rate: f64,
    pub avg_complexity: f64,
    pub avg_dynamic: f64,
    pub complexity_improvement: f64,
    pub dynamic_improvement: f64,
}

/// Videos kept by one filtering strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyOutcome {
    /// `complexity_only`, `dynamic_only` or `combined`.
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complexity_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dynamic_threshold: Option<f64>,
    pub total_count: usize,
    pub statistics: StrategyStats,
    pub recommended: bool,
    pub videos: Vec<VideoRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyComparison {
    pub total_videos: usize,
    pub baseline: SubsetStats,
    pub strategies: Vec<StrategyOutcome>,
}

/// Builds the three strategy lists.
///
/// Complexity-only videos are ordered by complexity, dynamic-only by
/// dynamic change, and the joint list by (complexity, dynamic), all
/// descending.
#[must_use]
pub fn strategy_comparison(table: &MetricsTable, thresholds: ThresholdPair) -> StrategyComparison {
    let records = table.records();
    let baseline = SubsetStats::of(records);

    let collect = |keep: &dyn Fn(&VideoRecord) -> bool| -> Vec<VideoRecord> {
        records.iter().filter(|r| keep(r)).cloned().collect()
    };

    let mut complexity_only = collect(&|r| r.scene_complexity >= thresholds.complexity);
    complexity_only.sort_by(|a, b| b.scene_complexity.cmp(&a.scene_complexity));

    let mut dynamic_only = collect(&|r| r.dynamic_change >= thresholds.dynamic);
    dynamic_only.sort_by(|a, b| b.dynamic_change.total_cmp(&a.dynamic_change));

    let mut combined = collect(&|r| r.passes(thresholds, FilterLogic::And));
    combined.sort_by(|a, b| {
        b.scene_complexity
            .cmp(&a.scene_complexity)
            .then(b.dynamic_change.total_cmp(&a.dynamic_change))
    });

    let outcome = |name: &str,
                   description: String,
                   complexity_threshold: Option<u32>,
                   dynamic_threshold: Option<f64>,
                   videos: Vec<VideoRecord>,
                   recommended: bool| {
        let subset = SubsetStats::of(&videos);
        let lifted = FilteredStats::against(subset, &baseline);
        StrategyOutcome {
            name: name.to_string(),
            description,
            complexity_threshold,
            dynamic_threshold,
            total_count: videos.len(),
            statistics: StrategyStats {
                count: videos.len(),
                retention_rate: stats::ratio_pct(videos.len(), records.len()),
                avg_complexity: subset.complexity,
                avg_dynamic: subset.dynamic,
                complexity_improvement: lifted.complexity_improvement,
                dynamic_improvement: lifted.dynamic_improvement,
            },
            recommended,
            videos,
        }
    };

    let strategies = vec![
        outcome(
            "complexity_only",
            format!("Scene complexity >= {} only", thresholds.complexity),
            Some(thresholds.complexity),
            None,
            complexity_only,
            false,
        ),
        outcome(
            "dynamic_only",
            format!("Dynamic change >= {} only", thresholds.dynamic),
            None,
            Some(thresholds.dynamic),
            dynamic_only,
            false,
        ),
        outcome(
            "combined",
            format!(
                "Complexity >= {} AND dynamic >= {}",
                thresholds.complexity, thresholds.dynamic
            ),
            Some(thresholds.complexity),
            Some(thresholds.dynamic),
            combined,
            true,
        ),
    ];

    StrategyComparison {
        total_videos: records.len(),
        baseline,
        strategies,
    }
}

/// One side of a configuration comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationOutcome {
    pub thresholds: ThresholdPair,
    pub pass_count: usize,
    /// Selected videos judged positive.
    pub correct_count: usize,
    /// `correct_count / pass_count` in percent.
    pub precision_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfigurationComparison {
    pub logic: FilterLogic,
    pub old: ConfigurationOutcome,
    pub new: ConfigurationOutcome,
    pub pass_count_change: i64,
    /// Positives selected only by the new thresholds.
    pub newly_found_positives: usize,
    /// Positives selected only by the old thresholds.
    pub dropped_positives: usize,
    /// Negatives selected only by the new thresholds.
    pub added_false_positives: usize,
}

/// Compares two threshold pairs on the same table.
#[must_use]
pub fn compare_configurations(
    table: &MetricsTable,
    old: ThresholdPair,
    new: ThresholdPair,
    logic: FilterLogic,
) -> ConfigurationComparison {
    let mut old_pass = 0;
    let mut new_pass = 0;
    let mut old_correct = 0;
    let mut new_correct = 0;
    let mut newly_found = 0;
    let mut dropped = 0;
    let mut added_fp = 0;

    for r in table.records() {
        let o = r.passes(old, logic);
        let n = r.passes(new, logic);
        let positive = r.human_judgement == HumanJudgement::Positive;
        old_pass += usize::from(o);
        new_pass += usize::from(n);
        old_correct += usize::from(o && positive);
        new_correct += usize::from(n && positive);
        match (o, n, r.human_judgement) {
            (false, true, HumanJudgement::Positive) => newly_found += 1,
            (true, false, HumanJudgement::Positive) => dropped += 1,
            (false, true, HumanJudgement::Negative) => added_fp += 1,
            _ => {}
        }
    }

    let side = |thresholds, pass_count, correct_count| ConfigurationOutcome {
        thresholds,
        pass_count,
        correct_count,
        precision_pct: stats::ratio_pct(correct_count, pass_count),
    };

    ConfigurationComparison {
        logic,
        old: side(old, old_pass, old_correct),
        new: side(new, new_pass, new_correct),
        pass_count_change: new_pass as i64 - old_pass as i64,
        newly_found_positives: newly_found,
        dropped_positives: dropped,
        added_false_positives: added_fp,
    }
}
