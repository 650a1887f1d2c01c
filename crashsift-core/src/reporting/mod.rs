//! Output files of an analysis run.
//!
//! All writers go through [`write_atomic`](crate::temp_files::write_atomic),
//! so a destination file is either the previous version or the complete new
//! one.

pub mod export;
pub mod summary;

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::error::CoreResult;
use crate::temp_files::write_atomic;

pub use export::{
    MetricsSnapshot, OptimalConfig, RawMetricsRow, StrategyOverview, SweepResultRow, SweepTableRow,
    load_candidates, load_metrics_csv, load_metrics_snapshot, sweep_result_rows, write_metrics_snapshot,
    write_strategy_comparison,
};
pub use summary::{ComparisonReport, RunSummary};

/// Names of the files written into the output directory.
pub mod files {
    pub const RAW_METRICS: &str = "00_raw_metrics.csv";
    pub const GLOBAL_REFERENCE: &str = "00_global_reference.json";
    pub const DISTRIBUTION: &str = "01_distribution_analysis.json";
    pub const SWEEP_RESULTS: &str = "02_threshold_sweep_results.csv";
    pub const OPTIMAL_CONFIG: &str = "03_optimal_config.json";
    pub const SWEEP_TABLE_CSV: &str = "03_threshold_sweep_table.csv";
    pub const SWEEP_TABLE_JSON: &str = "03_threshold_sweep.json";
    pub const CANDIDATES: &str = "04_candidate_thresholds.json";
    pub const NEW_THRESHOLD_VIDEOS: &str = "04_new_threshold_filtered_videos.csv";
    pub const COMPARISON_REPORT: &str = "05_comparison_report.txt";
    pub const SCHEMES_COMPARISON: &str = "05_schemes_comparison.json";
    pub const SCHEMES_SUMMARY: &str = "05_schemes_summary.csv";
    pub const RECOMMENDATIONS: &str = "05_scheme_recommendations.json";
    pub const FINAL_DECISION: &str = "06_final_decision.json";
    pub const FINAL_VIDEOS_JSON: &str = "07_final_filtered_videos.json";
    pub const FINAL_VIDEOS_CSV: &str = "07_final_filtered_videos.csv";
    pub const FINAL_VIDEOS_TXT: &str = "07_final_filtered_videos.txt";
    pub const THRESHOLD_METHODS: &str = "threshold_methods_comparison.json";
    pub const QUANTITATIVE_ANALYSIS: &str = "quantitative_threshold_analysis.json";
    pub const IMPROVEMENT_METRICS: &str = "improvement_metrics.json";
    pub const STRATEGY_COMPARISON: &str = "strategy_comparison.json";

    /// Per-strategy video list, e.g. `filtered_combined.json`.
    #[must_use]
    pub fn strategy_videos(name: &str) -> String {
        format!("filtered_{name}.json")
    }

    /// True for file names an analysis run or a finalisation writes:
    /// numbered exports (`00_` to `07_`), the unnumbered reports and the
    /// per-strategy lists.
    #[must_use]
    pub fn is_run_artifact(name: &str) -> bool {
        let bytes = name.as_bytes();
        let numbered = bytes.len() > 3 && bytes[0] == b'0' && (b'0'..=b'7').contains(&bytes[1]) && bytes[2] == b'_';
        let known_ext = [".json", ".csv", ".txt"].iter().any(|ext| name.ends_with(ext));
        let unnumbered = [THRESHOLD_METHODS, QUANTITATIVE_ANALYSIS, IMPROVEMENT_METRICS, STRATEGY_COMPARISON]
            .contains(&name);
        let strategy = name.starts_with("filtered_") && name.ends_with(".json");
        (numbered && known_ext) || unnumbered || strategy
    }
}

/// Pretty-printed JSON.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> CoreResult<()> {
    write_atomic(path, |w| {
        serde_json::to_writer_pretty(&mut *w, value)?;
        w.write_all(b"\n")?;
        Ok(())
    })
}

/// CSV with a header row taken from the field names of `T`.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> CoreResult<()> {
    write_atomic(path, |w| {
        let mut writer = csv::Writer::from_writer(w);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    })
}

pub fn write_text(path: &Path, text: &str) -> CoreResult<()> {
    write_atomic(path, |w| {
        w.write_all(text.as_bytes())?;
        Ok(())
    })
}
