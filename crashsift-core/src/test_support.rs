//! Fixture builders shared by unit tests.

use crate::processing::normalization::{GlobalReference, MetricsTable};
use crate::types::{HumanJudgement, SkipReport, VideoRecord};

pub(crate) fn record(name: &str, complexity: u32, dynamic: f64, judgement: HumanJudgement) -> VideoRecord {
    VideoRecord {
        video_name: name.to_string(),
        accident_frame: 30,
        window_length: 60,
        dynamic_change: dynamic,
        scene_complexity: complexity,
        has_vru_interaction: false,
        human_judgement: judgement,
    }
}

/// Unlabeled records from (complexity, dynamic) pairs, named `v00`, `v01`, ...
pub(crate) fn unlabeled(points: &[(u32, f64)]) -> Vec<VideoRecord> {
    points
        .iter()
        .enumerate()
        .map(|(i, &(c, d))| record(&format!("v{i:02}"), c, d, HumanJudgement::Unknown))
        .collect()
}

pub(crate) fn table(records: Vec<VideoRecord>) -> MetricsTable {
    MetricsTable::from_parts(
        records,
        GlobalReference {
            value: Some(1.0),
            percentile: 95.0,
            contributing_videos: 0,
        },
        SkipReport::default(),
    )
}
