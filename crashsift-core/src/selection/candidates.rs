//! Candidate ranking and scheme recommendations.

use serde::{Deserialize, Serialize};

use super::schemes::SchemeSummaryRow;
use crate::analysis::ThresholdCandidate;

/// Number of schemes listed under each recommendation heading.
pub const RECOMMENDATIONS_PER_CATEGORY: usize = 3;

/// Keeps candidates whose selection size lies in `[min, max]`, orders them by
/// distance to `target` and returns the first `top_k`.
///
/// The sort is stable: equally distant candidates keep their sweep order.
#[must_use]
pub fn select_candidates(
    sweep: &[ThresholdCandidate],
    min: usize,
    max: usize,
    target: usize,
    top_k: usize,
) -> Vec<ThresholdCandidate> {
    let mut in_band: Vec<ThresholdCandidate> = sweep
        .iter()
        .filter(|c| (min..=max).contains(&c.selected_count))
        .cloned()
        .collect();
    in_band.sort_by_key(|c| c.selected_count.abs_diff(target));
    in_band.truncate(top_k);

    log::info!(
        "{} of {} sweep candidates fall in [{}, {}]; keeping {}",
        sweep.iter().filter(|c| (min..=max).contains(&c.selected_count)).count(),
        sweep.len(),
        min,
        max,
        in_band.len()
    );
    in_band
}

/// A recommended scheme with the score it was ranked by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub scheme_id: usize,
    pub complexity_threshold: u32,
    pub dynamic_threshold: f64,
    pub video_count: usize,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Recommendations {
    /// Smallest distance to the target sample count.
    pub closest_to_target: Vec<Recommendation>,
    /// Largest dynamic-change improvement.
    pub highest_dynamic: Vec<Recommendation>,
    /// Best composite of size fit and both improvements.
    pub balanced: Vec<Recommendation>,
}

fn ranked(
    rows: &[SchemeSummaryRow],
    score: impl Fn(&SchemeSummaryRow) -> f64,
    ascending: bool,
) -> Vec<Recommendation> {
    let mut scored: Vec<Recommendation> = rows
        .iter()
        .map(|r| Recommendation {
            scheme_id: r.scheme_id,
            complexity_threshold: r.complexity_threshold,
            dynamic_threshold: r.dynamic_threshold,
            video_count: r.video_count,
            score: score(r),
        })
        .collect();
    if ascending {
        scored.sort_by(|a, b| a.score.total_cmp(&b.score));
    } else {
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    }
    scored.truncate(RECOMMENDATIONS_PER_CATEGORY);
    scored
}

#[must_use]
pub fn recommendations(rows: &[SchemeSummaryRow], target: usize) -> Recommendations {
    let distance = |r: &SchemeSummaryRow| r.video_count.abs_diff(target) as f64;
    Recommendations {
        closest_to_target: ranked(rows, distance, true),
        highest_dynamic: ranked(rows, |r| r.dynamic_improvement, false),
        balanced: ranked(
            rows,
            |r| -distance(r) / 20.0 + r.dynamic_improvement / 5.0 + r.complexity_improvement / 10.0,
            false,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(count: usize) -> ThresholdCandidate {
        ThresholdCandidate {
            complexity_threshold: 5,
            dynamic_threshold: 0.5,
            selected_count: count,
            percentage: 0.0,
            avg_dynamic: 0.0,
            avg_complexity: 0.0,
            dynamic_improvement: 0.0,
            complexity_improvement: 0.0,
            score: None,
        }
    }

    fn row(id: usize, count: usize, dyn_impr: f64, cplx_impr: f64) -> SchemeSummaryRow {
        SchemeSummaryRow {
            scheme_id: id,
            complexity_threshold: 6,
            dynamic_threshold: 0.7,
            video_count: count,
            retention_rate: 0.0,
            avg_dynamic: 0.0,
            avg_complexity: 0.0,
            dynamic_improvement: dyn_impr,
            complexity_improvement: cplx_impr,
        }
    }

    #[test]
    fn ranks_by_distance_to_target() {
        let sweep: Vec<_> = [120, 195, 205, 310].into_iter().map(candidate).collect();
        let ranked = select_candidates(&sweep, 100, 500, 200, 15);
        let counts: Vec<usize> = ranked.iter().map(|c| c.selected_count).collect();
        assert_eq!(counts, vec![195, 205, 120, 310]);
    }

    #[test]
    fn band_and_top_k_are_applied() {
        let sweep: Vec<_> = [90, 150, 199, 201, 500, 501].into_iter().map(candidate).collect();
        let ranked = select_candidates(&sweep, 150, 500, 200, 3);
        let counts: Vec<usize> = ranked.iter().map(|c| c.selected_count).collect();
        assert_eq!(counts, vec![199, 201, 150]);
    }

    #[test]
    fn equal_distance_keeps_sweep_order() {
        let mut first = candidate(190);
        first.complexity_threshold = 3;
        let mut second = candidate(210);
        second.complexity_threshold = 4;
        let ranked = select_candidates(&[first, second], 150, 500, 200, 15);
        assert_eq!(ranked[0].complexity_threshold, 3);
    }

    #[test]
    fn recommendation_categories() {
        let rows = vec![
            row(1, 200, 10.0, 5.0),
            row(2, 260, 80.0, 20.0),
            row(3, 150, 40.0, 40.0),
            row(4, 205, 5.0, 0.0),
        ];
        let rec = recommendations(&rows, 200);

        let ids = |v: &[Recommendation]| v.iter().map(|r| r.scheme_id).collect::<Vec<_>>();
        assert_eq!(ids(&rec.closest_to_target), vec![1, 4, 3]);
        assert_eq!(ids(&rec.highest_dynamic), vec![2, 3, 1]);
        // 2: -3 + 16 + 2 = 15; 3: -2.5 + 8 + 4 = 9.5; 1: 0 + 2 + 0.5 = 2.5
        assert_eq!(ids(&rec.balanced), vec![2, 3, 1]);
    }
}
