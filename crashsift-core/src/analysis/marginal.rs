// ============================================================================
// crashsift-core/src/analysis/marginal.rs
// ============================================================================
//
// MARGINAL EFFICIENCY: Quality Gained per Sample Lost
//
// Walks a ladder of complexity percentiles. At each step the threshold
// rises, fewer videos survive and their mean complexity rises. The ratio of
// quality gained to samples lost between consecutive steps is the marginal
// efficiency; the operating point is the last step before that ratio
// collapses.

use serde::{Deserialize, Serialize};

use crate::processing::MetricsTable;
use crate::stats;

/// One rung of the percentile ladder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginalRow {
    pub percentile: f64,
    pub threshold: f64,
    pub count: usize,
    pub retention_rate: f64,
    pub avg_complexity: f64,
    /// Mean complexity lift over the whole table, in percent.
    pub quality_improvement: f64,
    /// Change of `quality_improvement` since the previous rung.
    pub marginal_quality: f64,
    /// Videos dropped since the previous rung.
    pub marginal_sample_loss: usize,
    /// `marginal_quality / marginal_sample_loss`, 0 when nothing was lost.
    pub efficiency_ratio: f64,
}

/// Builds the ladder over the given complexity percentiles, in order.
///
/// The first rung has no predecessor, so its marginal fields are zero.
#[must_use]
pub fn marginal_efficiency(table: &MetricsTable, percentiles: &[f64]) -> Vec<MarginalRow> {
    let complexity = table.complexity_values();
    let baseline = stats::mean(&complexity);
    let mut rows: Vec<MarginalRow> = Vec::with_capacity(percentiles.len());

    for &p in percentiles {
        let threshold = stats::percentile(&complexity, p);
        let kept: Vec<f64> = complexity.iter().copied().filter(|c| *c >= threshold).collect();
        let avg_complexity = stats::mean(&kept);
        let quality_improvement = if kept.is_empty() {
            0.0
        } else {
            stats::improvement_pct(avg_complexity, baseline)
        };

        let (marginal_quality, marginal_sample_loss, efficiency_ratio) = match rows.last() {
            Some(prev) => {
                let mq = quality_improvement - prev.quality_improvement;
                let loss = prev.count.saturating_sub(kept.len());
                let ratio = if loss > 0 { mq / loss as f64 } else { 0.0 };
                (mq, loss, ratio)
            }
            None => (0.0, 0, 0.0),
        };

        rows.push(MarginalRow {
            percentile: p,
            threshold,
            count: kept.len(),
            retention_rate: stats::ratio_pct(kept.len(), complexity.len()),
            avg_complexity,
            quality_improvement,
            marginal_quality,
            marginal_sample_loss,
            efficiency_ratio,
        });
    }

    rows
}

/// Picks the rung just before the steepest relative fall in efficiency.
///
/// # Algorithm Overview
///
/// 1. Skip the first rung, whose efficiency is undefined
/// 2. For each later pair of rungs with positive efficiency at the first,
///    compute `(eff[i] - eff[i + 1]) / eff[i]`
/// 3. Return rung `i` of the largest positive drop
///
/// Returns `None` with fewer than three rungs or when efficiency never
/// falls.
#[must_use]
pub fn operating_point(rows: &[MarginalRow]) -> Option<&MarginalRow> {
    if rows.len() < 3 {
        return None;
    }

    // ========================================================================
    // STEP 1: RELATIVE DROPS BETWEEN CONSECUTIVE RUNGS
    // ========================================================================

    let mut best: Option<(usize, f64)> = None;
    for i in 1..rows.len() - 1 {
        let current = rows[i].efficiency_ratio;
        if current <= 0.0 {
            continue;
        }
        let drop = (current - rows[i + 1].efficiency_ratio) / current;

        // ====================================================================
        // STEP 2: KEEP THE FIRST STEEPEST DROP
        // ====================================================================

        if drop > 0.0 && best.is_none_or(|(_, b)| drop > b) {
            best = Some((i, drop));
        }
    }

    best.map(|(i, drop)| {
        log::debug!(
            "Marginal efficiency falls {:.1}% after P{}",
            drop * 100.0,
            rows[i].percentile
        );
        &rows[i]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{table, unlabeled};
    use approx::assert_relative_eq;

    fn row(p: f64, eff: f64) -> MarginalRow {
        MarginalRow {
            percentile: p,
            threshold: 0.0,
            count: 0,
            retention_rate: 0.0,
            avg_complexity: 0.0,
            quality_improvement: 0.0,
            marginal_quality: 0.0,
            marginal_sample_loss: 0,
            efficiency_ratio: eff,
        }
    }

    #[test]
    fn ladder_tracks_losses_and_gains() {
        let points: Vec<(u32, f64)> = (1..=10).map(|c| (c, 0.5)).collect();
        let t = table(unlabeled(&points));
        let rows = marginal_efficiency(&t, &[50.0, 80.0]);
        assert_eq!(rows.len(), 2);

        // P50 = 5.5 keeps 6..=10 (mean 8), P80 = 8.2 keeps 9, 10 (mean 9.5)
        assert_eq!(rows[0].count, 5);
        assert_relative_eq!(rows[0].quality_improvement, (8.0 / 5.5 - 1.0) * 100.0);
        assert_eq!(rows[0].efficiency_ratio, 0.0);
        assert_eq!(rows[1].count, 2);
        assert_eq!(rows[1].marginal_sample_loss, 3);
        let mq = (9.5 / 5.5 - 8.0 / 5.5) * 100.0;
        assert_relative_eq!(rows[1].marginal_quality, mq, epsilon = 1e-9);
        assert_relative_eq!(rows[1].efficiency_ratio, mq / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn no_loss_means_zero_efficiency() {
        let t = table(unlabeled(&[(5, 0.1), (5, 0.2), (5, 0.3)]));
        let rows = marginal_efficiency(&t, &[60.0, 70.0]);
        assert_eq!(rows[1].marginal_sample_loss, 0);
        assert_eq!(rows[1].efficiency_ratio, 0.0);
    }

    #[test]
    fn operating_point_precedes_the_cliff() {
        let rows = vec![
            row(60.0, 0.0),
            row(65.0, 0.35),
            row(70.0, 0.31),
            row(75.0, 0.10),
            row(80.0, 0.12),
        ];
        assert_eq!(operating_point(&rows).unwrap().percentile, 70.0);
    }

    #[test]
    fn operating_point_needs_three_rows_and_a_drop() {
        assert!(operating_point(&[row(60.0, 0.0), row(65.0, 0.3)]).is_none());
        let rising = vec![row(60.0, 0.0), row(65.0, 0.1), row(70.0, 0.2)];
        assert!(operating_point(&rising).is_none());
    }
}
