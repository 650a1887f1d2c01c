//! Pass 2: global normalisation of dynamic change.
//!
//! The global reference is a percentile (P95 by default) of the strictly
//! positive raw max distances over the complete pass-1 corpus. Every
//! video's `dynamic_change` is its raw max distance divided by that one
//! reference, so values are comparable across the whole table.
//!
//! A [`MetricsTable`] carries the reference it was normalised against; the
//! only way to obtain one from extracted tensors is [`normalize_corpus`],
//! which consumes a finished [`RawCorpus`].

use serde::{Deserialize, Serialize};

use super::extraction::RawCorpus;
use super::judgements::JudgementIndex;
use crate::stats;
use crate::types::{SkipReport, VideoRecord};

/// The normalisation epoch of a metrics table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalReference {
    /// `None` when no video had a positive max distance.
    pub value: Option<f64>,
    pub percentile: f64,
    /// Number of videos with a positive max distance.
    pub contributing_videos: usize,
}

/// Normalised metrics for every extracted video, sorted by video name.
#[derive(Debug, Clone)]
pub struct MetricsTable {
    records: Vec<VideoRecord>,
    reference: GlobalReference,
    skips: SkipReport,
}

impl MetricsTable {
    /// Reassembles a table from a previously exported snapshot.
    pub(crate) fn from_parts(
        mut records: Vec<VideoRecord>,
        reference: GlobalReference,
        skips: SkipReport,
    ) -> Self {
        records.sort_by(|a, b| a.video_name.cmp(&b.video_name));
        Self {
            records,
            reference,
            skips,
        }
    }

    #[must_use]
    pub fn records(&self) -> &[VideoRecord] {
        &self.records
    }

    #[must_use]
    pub fn reference(&self) -> GlobalReference {
        self.reference
    }

    #[must_use]
    pub fn skips(&self) -> &SkipReport {
        &self.skips
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sets each record's human judgement from the index; videos missing
    /// from it become `Unknown`.
    pub fn attach_judgements(&mut self, judgements: &JudgementIndex) {
        for record in &mut self.records {
            record.human_judgement = judgements.get(&record.video_name);
        }
        let known = self
            .records
            .iter()
            .filter(|r| r.human_judgement.is_known())
            .count();
        log::info!("Attached judgements: {} of {} videos labeled", known, self.records.len());
    }

    /// Dynamic change values in table order.
    #[must_use]
    pub fn dynamic_values(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.dynamic_change).collect()
    }

    /// Scene complexity values in table order.
    #[must_use]
    pub fn complexity_values(&self) -> Vec<f64> {
        self.records
            .iter()
            .map(|r| f64::from(r.scene_complexity))
            .collect()
    }
}

/// Computes the global reference over the complete raw corpus.
#[must_use]
pub fn compute_global_reference(raw: &RawCorpus, percentile: f64) -> GlobalReference {
    let positive: Vec<f64> = raw
        .videos
        .iter()
        .map(|v| v.max_dist)
        .filter(|d| *d > 0.0)
        .collect();
    let value = if positive.is_empty() {
        None
    } else {
        Some(stats::percentile(&positive, percentile)).filter(|v| *v > 0.0)
    };
    GlobalReference {
        value,
        percentile,
        contributing_videos: positive.len(),
    }
}

/// Normalises every video against `reference`.
///
/// Without a usable reference each video falls back to its own maximum,
/// which yields 1.0 for a positive distance and 0.0 otherwise.
#[must_use]
pub fn normalize_corpus(raw: RawCorpus, reference: GlobalReference) -> MetricsTable {
    match reference.value {
        Some(value) => log::info!(
            "Normalizing {} videos against P{} reference {:.6} ({} contributing)",
            raw.videos.len(),
            reference.percentile,
            value,
            reference.contributing_videos
        ),
        None => log::warn!(
            "No positive feature distances in corpus; falling back to per-video normalization"
        ),
    }

    let records = raw
        .videos
        .into_iter()
        .map(|v| VideoRecord {
            dynamic_change: normalize_distance(v.max_dist, reference.value),
            video_name: v.video_name,
            accident_frame: v.accident_frame,
            window_length: v.window_length,
            scene_complexity: v.scene_complexity,
            has_vru_interaction: v.has_vru_interaction,
            human_judgement: Default::default(),
        })
        .collect();

    MetricsTable::from_parts(records, reference, raw.skips)
}

fn normalize_distance(max_dist: f64, reference: Option<f64>) -> f64 {
    match reference {
        Some(value) if value > 0.0 => max_dist / value,
        _ if max_dist > 0.0 => 1.0,
        _ => 0.0,
    }
}

/// Both passes in sequence.
#[must_use]
pub fn normalize(raw: RawCorpus, percentile: f64) -> MetricsTable {
    let reference = compute_global_reference(&raw, percentile);
    normalize_corpus(raw, reference)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::extraction::RawVideoMetrics;
    use approx::assert_relative_eq;

    fn raw(dists: &[f64]) -> RawCorpus {
        RawCorpus {
            videos: dists
                .iter()
                .enumerate()
                .map(|(i, d)| RawVideoMetrics {
                    video_name: format!("{:06}.mp4", i + 1),
                    accident_frame: 40,
                    window_length: 60,
                    max_dist: *d,
                    scene_complexity: 3,
                    has_vru_interaction: false,
                })
                .collect(),
            skips: SkipReport::default(),
        }
    }

    #[test]
    fn p95_reference_of_three_videos() {
        let table = normalize(raw(&[2.0, 4.0, 8.0]), 95.0);
        let reference = table.reference().value.unwrap();
        assert_relative_eq!(reference, 7.6, epsilon = 1e-12);
        let dyns = table.dynamic_values();
        assert_relative_eq!(dyns[0], 0.263, epsilon = 1e-3);
        assert_relative_eq!(dyns[1], 0.526, epsilon = 1e-3);
        assert_relative_eq!(dyns[2], 1.053, epsilon = 1e-3);
    }

    #[test]
    fn dynamic_change_times_reference_recovers_max_dist() {
        let dists = [0.0, 0.3, 1.7, 2.2, 9.0, 0.05];
        let table = normalize(raw(&dists), 95.0);
        let reference = table.reference().value.unwrap();
        for (record, d) in table.records().iter().zip(dists) {
            assert_relative_eq!(record.dynamic_change * reference, d, epsilon = 1e-12);
        }
    }

    #[test]
    fn zero_distances_do_not_contribute() {
        let reference = compute_global_reference(&raw(&[0.0, 0.0, 3.0]), 95.0);
        assert_eq!(reference.contributing_videos, 1);
        assert_relative_eq!(reference.value.unwrap(), 3.0);
    }

    #[test]
    fn local_fallback_without_positive_distances() {
        let table = normalize(raw(&[0.0, 0.0]), 95.0);
        assert!(table.reference().value.is_none());
        assert!(table.dynamic_values().iter().all(|d| *d == 0.0));
        assert_eq!(normalize_distance(2.5, None), 1.0);
    }

    #[test]
    fn judgements_attach_by_name() {
        use crate::types::HumanJudgement;
        let mut table = normalize(raw(&[1.0, 2.0]), 95.0);
        let judgements: JudgementIndex =
            [("000002.mp4".to_string(), HumanJudgement::Positive)].into_iter().collect();
        table.attach_judgements(&judgements);
        assert_eq!(table.records()[0].human_judgement, HumanJudgement::Unknown);
        assert_eq!(table.records()[1].human_judgement, HumanJudgement::Positive);
    }
}
