//! Summary reporting module
//!
//! Human-readable summaries of an analysis run: the old-versus-new threshold
//! report and the run summary printed by the driver.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::analysis::{ConfigurationComparison, SupervisedScore};
use crate::processing::GlobalReference;
use crate::types::{SkipReport, ThresholdPair};

/// Text of `05_comparison_report.txt`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub comparison: ConfigurationComparison,
    /// Score of the new thresholds in the F1 sweep.
    pub best: SupervisedScore,
}

fn correct_line(f: &mut fmt::Formatter<'_>, correct: usize, pass: usize, pct: f64) -> fmt::Result {
    writeln!(f, "Correct:   {}/{} ({:.1}%)", correct, pass, pct)
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let old = &self.comparison.old;
        let new = &self.comparison.new;

        writeln!(f, "Threshold Optimisation Report")?;
        writeln!(f, "{}\n", "=".repeat(70))?;

        writeln!(f, "[Current configuration]")?;
        writeln!(
            f,
            "Dynamic >= {:.1}, Complexity >= {}",
            old.thresholds.dynamic, old.thresholds.complexity
        )?;
        writeln!(f, "Selected:  {}", old.pass_count)?;
        correct_line(f, old.correct_count, old.pass_count, old.precision_pct)?;
        writeln!(f)?;

        writeln!(f, "[Optimal configuration (F1)]")?;
        writeln!(
            f,
            "Dynamic >= {:.1}, Complexity >= {}",
            new.thresholds.dynamic, new.thresholds.complexity
        )?;
        writeln!(f, "Selected:  {}", new.pass_count)?;
        correct_line(f, new.correct_count, new.pass_count, new.precision_pct)?;
        writeln!(f, "Recall:    {:.4}", self.best.recall)?;
        writeln!(f, "Precision: {:.4}", self.best.precision)?;
        writeln!(f, "F1:        {:.4}\n", self.best.f1)?;

        writeln!(f, "[Comparison]")?;
        writeln!(f, "Selection change:      {:+}", self.comparison.pass_count_change)?;
        writeln!(
            f,
            "Precision:             {:.1}% (vs {:.1}%)",
            new.precision_pct, old.precision_pct
        )?;
        writeln!(f, "Newly found positives: {}", self.comparison.newly_found_positives)?;
        writeln!(f, "Dropped positives:     {}", self.comparison.dropped_positives)?;
        writeln!(f, "Added false positives: {}", self.comparison.added_false_positives)
    }
}

/// Outcome of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub output_dir: PathBuf,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub video_count: usize,
    pub skips: SkipReport,
    pub reference: GlobalReference,
    /// Best F1 thresholds, when judgements were available.
    pub best_f1: Option<(ThresholdPair, f64)>,
    pub candidate_count: usize,
    pub scheme_count: usize,
    pub files_written: usize,
}

impl RunSummary {
    /// Format a duration in seconds as MM:SS or HH:MM:SS.
    #[must_use]
    pub fn format_duration(seconds: f64) -> String {
        let total_seconds = seconds.max(0.0) as u64;
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let secs = total_seconds % 60;

        if hours > 0 {
            format!("{:02}:{:02}:{:02}", hours, minutes, secs)
        } else {
            format!("{:02}:{:02}", minutes, secs)
        }
    }

    #[must_use]
    pub fn elapsed_seconds(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }

    /// The summary as a single log line.
    #[must_use]
    pub fn as_compact_line(&self) -> String {
        format!(
            "{} videos, {} skipped, {} candidates, {} schemes in {}",
            self.video_count,
            self.skips.total(),
            self.candidate_count,
            self.scheme_count,
            Self::format_duration(self.elapsed_seconds())
        )
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n====== Analysis Summary ======\n")?;
        writeln!(f, "Videos analysed:  {}", self.video_count)?;
        writeln!(
            f,
            "Skipped:          {} (unannotated {}, unreadable {}, empty window {}, duplicate {})",
            self.skips.total(),
            self.skips.unannotated,
            self.skips.unreadable,
            self.skips.empty_window,
            self.skips.duplicate
        )?;
        match self.reference.value {
            Some(value) => writeln!(
                f,
                "Global reference: {:.4} (P{} over {} videos)",
                value, self.reference.percentile, self.reference.contributing_videos
            )?,
            None => writeln!(f, "Global reference: none (local fallback)")?,
        }
        match &self.best_f1 {
            Some((thresholds, f1)) => writeln!(f, "Best F1:          {:.4} at {}", f1, thresholds)?,
            None => writeln!(f, "Best F1:          n/a (no judgements)")?,
        }
        writeln!(f, "Candidates:       {}", self.candidate_count)?;
        writeln!(f, "Schemes:          {}", self.scheme_count)?;
        writeln!(f, "Files written:    {}", self.files_written)?;
        writeln!(f, "Duration:         {}", Self::format_duration(self.elapsed_seconds()))?;
        writeln!(f, "Output:           {}", self.output_dir.display())
    }
}
