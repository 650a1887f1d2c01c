//! Core library for curating crash-video QA datasets by scene metrics.
//!
//! For every annotated accident video the crate measures how crowded the
//! scene is around the accident frame (scene complexity) and how abruptly the
//! scene changes (dynamic change, normalised against one corpus-wide
//! reference). Threshold sweeps, unsupervised heuristics and candidate
//! ranking then help choose the subset that goes into the dataset.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use crashsift_core::{CoreConfig, DecisionInput, NullProgressCallback, finalize_scheme, run_analysis};
//! use std::path::PathBuf;
//!
//! let config = CoreConfig::new(
//!     PathBuf::from("/data/Crash-1500.txt"),
//!     PathBuf::from("/data/vgg16_features"),
//!     PathBuf::from("/data/threshold_analysis"),
//! );
//!
//! let outcome = run_analysis(&config, &NullProgressCallback).unwrap();
//! println!("{}", outcome.summary);
//!
//! let final_list = finalize_scheme(&config, 1, DecisionInput::default()).unwrap();
//! println!("{} videos selected", final_list.scheme.videos.len());
//! ```

pub mod analysis;
pub mod config;
pub mod discovery;
pub mod error;
pub mod file_logging;
pub mod pipeline;
pub mod processing;
pub mod progress;
pub mod reporting;
pub mod selection;
pub mod stats;
pub mod temp_files;
pub mod types;

#[cfg(test)]
mod test_support;

// Re-exports for public API
pub use config::{CoreConfig, CoreConfigBuilder, SweepRange};
pub use discovery::{discover_tensor_files, video_key};
pub use error::{CoreError, CoreResult};
pub use pipeline::{AnalysisOutcome, FinalizeOutcome, finalize_scheme, run_analysis};
pub use processing::{GlobalReference, MetricsTable};
pub use progress::{NullProgressCallback, ProgressCallback, ProgressEvent, Stage};
pub use reporting::RunSummary;
pub use selection::{DecisionInput, DecisionRecord, SchemeResult};
pub use types::{
    FeatureAggregation, FilterLogic, HumanJudgement, SkipReport, ThresholdPair, UnknownLabelPolicy, VideoRecord,
};
