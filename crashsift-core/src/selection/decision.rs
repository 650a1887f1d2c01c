//! Final decision record and list exports.
//!
//! Which scheme becomes final is decided outside the crate; this module only
//! records the choice together with its rationale and writes the final lists.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::schemes::{BaselineAverages, FilteredAverages, SchemeResult, SchemeVideo};
use crate::error::CoreResult;
use crate::reporting::{self, files};
use crate::types::FilterLogic;

/// Caller-supplied context for a decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionInput {
    pub description: Option<String>,
    pub rationale: BTreeMap<String, String>,
    pub alternatives: BTreeMap<String, String>,
}

impl DecisionInput {
    /// Rationale entries derived from the scheme's own statistics. Used when
    /// the caller has not written any.
    #[must_use]
    pub fn generated(scheme: &SchemeResult, sample_band: (usize, usize)) -> Self {
        let st = &scheme.statistics;
        let mut rationale = BTreeMap::new();
        rationale.insert(
            "reason_1".to_string(),
            format!(
                "Sample size: {} videos (target band {}-{})",
                st.filtered_count, sample_band.0, sample_band.1
            ),
        );
        rationale.insert(
            "reason_2".to_string(),
            format!(
                "Complexity improvement: {:.1}% (baseline {:.2} -> filtered {:.2})",
                st.improvement.complexity_percent, st.baseline.avg_complexity, st.filtered.avg_complexity
            ),
        );
        rationale.insert(
            "reason_3".to_string(),
            format!(
                "Dynamic improvement: {:.1}% (baseline {:.4} -> filtered {:.4})",
                st.improvement.dynamic_percent, st.baseline.avg_dynamic, st.filtered.avg_dynamic
            ),
        );
        Self {
            description: None,
            rationale,
            alternatives: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.rationale.is_empty() && self.alternatives.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionThresholds {
    pub scene_complexity: u32,
    pub dynamic_change: f64,
    pub logic: FilterLogic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImprovementPercent {
    pub dynamic: f64,
    pub complexity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionStatistics {
    pub total_videos: usize,
    pub filtered_count: usize,
    pub retention_rate_percent: f64,
    pub baseline: BaselineAverages,
    pub filtered: FilteredAverages,
    pub improvement_percent: ImprovementPercent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputFiles {
    pub videos_json: String,
    pub videos_csv: String,
    pub videos_txt: String,
    pub decision_document: String,
}

impl Default for OutputFiles {
    fn default() -> Self {
        Self {
            videos_json: files::FINAL_VIDEOS_JSON.to_string(),
            videos_csv: files::FINAL_VIDEOS_CSV.to_string(),
            videos_txt: files::FINAL_VIDEOS_TXT.to_string(),
            decision_document: files::FINAL_DECISION.to_string(),
        }
    }
}

/// Body of `06_final_decision.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision_timestamp: String,
    pub decision_stage: String,
    pub description: String,
    pub thresholds: DecisionThresholds,
    pub rationale: BTreeMap<String, String>,
    pub statistics: DecisionStatistics,
    pub alternatives: BTreeMap<String, String>,
    pub output_files: OutputFiles,
}

#[must_use]
pub fn build_decision(scheme: &SchemeResult, input: DecisionInput, timestamp: NaiveDateTime) -> DecisionRecord {
    let st = &scheme.statistics;
    DecisionRecord {
        decision_timestamp: timestamp.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        decision_stage: "Final Selection".to_string(),
        description: input
            .description
            .unwrap_or_else(|| format!("Scheme #{}: final threshold decision", st.scheme_id)),
        thresholds: DecisionThresholds {
            scene_complexity: st.complexity_threshold,
            dynamic_change: st.dynamic_threshold,
            logic: FilterLogic::And,
        },
        rationale: input.rationale,
        statistics: DecisionStatistics {
            total_videos: st.total_videos,
            filtered_count: st.filtered_count,
            retention_rate_percent: st.retention_rate,
            baseline: st.baseline,
            filtered: st.filtered,
            improvement_percent: ImprovementPercent {
                dynamic: st.improvement.dynamic_percent,
                complexity: st.improvement.complexity_percent,
            },
        },
        alternatives: input.alternatives,
        output_files: OutputFiles::default(),
    }
}

/// Body of `07_final_filtered_videos.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalVideoList {
    pub decision: DecisionRecord,
    pub description: String,
    pub total_count: usize,
    pub videos: Vec<SchemeVideo>,
}

fn final_text(scheme_id: usize, decision: &DecisionRecord, videos: &[SchemeVideo]) -> String {
    let th = &decision.thresholds;
    let mut out = String::new();
    out.push_str(&format!("# Scheme #{} final selection ({} videos)\n", scheme_id, videos.len()));
    out.push_str(&format!(
        "# Thresholds: Complexity >= {}, Dynamic >= {}\n",
        th.scene_complexity, th.dynamic_change
    ));
    out.push_str(&format!("# Generated: {}\n\n", decision.decision_timestamp));
    for (i, v) in videos.iter().enumerate() {
        out.push_str(&format!(
            "{:3}. {:20} | Complexity: {:2} | Dynamic: {:.4} | Accident Frame: {:3}\n",
            i + 1,
            v.video_name,
            v.scene_complexity,
            v.dynamic_change,
            v.accident_frame
        ));
    }
    out
}

/// Writes the decision document and the three final video lists into `dir`.
/// Returns the paths written, decision document first.
pub fn export_final(dir: &Path, scheme: &SchemeResult, decision: &DecisionRecord) -> CoreResult<Vec<PathBuf>> {
    let th = &decision.thresholds;
    let list = FinalVideoList {
        decision: decision.clone(),
        description: format!(
            "Scheme #{} final selection: Complexity>={}, Dynamic>={}",
            scheme.statistics.scheme_id, th.scene_complexity, th.dynamic_change
        ),
        total_count: scheme.videos.len(),
        videos: scheme.videos.clone(),
    };

    let decision_path = dir.join(&decision.output_files.decision_document);
    let json_path = dir.join(&decision.output_files.videos_json);
    let csv_path = dir.join(&decision.output_files.videos_csv);
    let txt_path = dir.join(&decision.output_files.videos_txt);

    reporting::write_json(&decision_path, decision)?;
    reporting::write_json(&json_path, &list)?;
    reporting::write_csv(&csv_path, &scheme.videos)?;
    reporting::write_text(&txt_path, &final_text(scheme.statistics.scheme_id, decision, &scheme.videos))?;

    log::info!(
        "Final selection exported: {} videos (C>={}, D>={:.2}) to {}",
        scheme.videos.len(),
        th.scene_complexity,
        th.dynamic_change,
        dir.display()
    );
    Ok(vec![decision_path, json_path, csv_path, txt_path])
}
