//! Shared data types flowing between pipeline stages.
//!
//! The metrics table produced by the normalizer is the only state passed
//! downstream; everything after it is a pure function of the table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How per-frame appearance features are aggregated across detection slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureAggregation {
    /// Mean over detections whose confidence clears the threshold, falling
    /// back to slot 0 when none do.
    #[default]
    ConfidentMean,
    /// Always use object slot 0.
    FirstSlot,
}

/// How the two per-metric threshold tests combine into one selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FilterLogic {
    /// Both metrics must clear their thresholds.
    #[default]
    And,
    /// Either metric clearing its threshold selects the video.
    Or,
}

impl FilterLogic {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            FilterLogic::And => "AND",
            FilterLogic::Or => "OR",
        }
    }

    #[must_use]
    pub fn combine(self, complexity_pass: bool, dynamic_pass: bool) -> bool {
        match self {
            FilterLogic::And => complexity_pass && dynamic_pass,
            FilterLogic::Or => complexity_pass || dynamic_pass,
        }
    }
}

impl fmt::Display for FilterLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Manually curated label for a video.
///
/// Videos missing from the judgement file are `Unknown`, which is kept apart
/// from `Negative` so precision and recall are not silently skewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HumanJudgement {
    #[default]
    Unknown,
    Positive,
    Negative,
}

impl HumanJudgement {
    /// Maps the 0/1 encoding used by the judgement file.
    #[must_use]
    pub fn from_label(label: i64) -> Self {
        match label {
            1 => HumanJudgement::Positive,
            0 => HumanJudgement::Negative,
            _ => HumanJudgement::Unknown,
        }
    }

    #[must_use]
    pub const fn as_label(self) -> Option<u8> {
        match self {
            HumanJudgement::Positive => Some(1),
            HumanJudgement::Negative => Some(0),
            HumanJudgement::Unknown => None,
        }
    }

    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, HumanJudgement::Unknown)
    }
}

/// Treatment of unlabeled videos during supervised scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownLabelPolicy {
    /// Unlabeled videos are left out of the confusion counts.
    #[default]
    Exclude,
    /// Unlabeled videos count as judged negative.
    TreatAsNegative,
}

/// A (complexity, dynamic) threshold pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdPair {
    pub complexity: u32,
    pub dynamic: f64,
}

impl ThresholdPair {
    #[must_use]
    pub const fn new(complexity: u32, dynamic: f64) -> Self {
        Self { complexity, dynamic }
    }
}

impl fmt::Display for ThresholdPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C>={}, D>={:.2}", self.complexity, self.dynamic)
    }
}

/// One row of the metrics table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_name: String,
    pub accident_frame: usize,
    pub window_length: usize,
    /// Max consecutive-frame feature distance divided by the table's
    /// global reference.
    pub dynamic_change: f64,
    pub scene_complexity: u32,
    pub has_vru_interaction: bool,
    pub human_judgement: HumanJudgement,
}

impl VideoRecord {
    #[must_use]
    pub fn passes(&self, thresholds: ThresholdPair, logic: FilterLogic) -> bool {
        logic.combine(
            self.scene_complexity >= thresholds.complexity,
            self.dynamic_change >= thresholds.dynamic,
        )
    }
}

/// Counts of records dropped during a batch stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipReport {
    /// Tensor archives without a matching annotation.
    pub unannotated: usize,
    /// Tensor archives that failed to load or had invalid shapes.
    pub unreadable: usize,
    /// Videos whose clipped extraction window was empty.
    pub empty_window: usize,
    /// Archives whose video key was already taken by an earlier archive.
    #[serde(default)]
    pub duplicate: usize,
}

impl SkipReport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.unannotated + self.unreadable + self.empty_window + self.duplicate
    }
}
