// ============================================================================
// crashsift-core/src/progress.rs
// ============================================================================
//
// PROGRESS REPORTING: Pipeline Progress Callbacks and Events
//
// The core library reports batch progress through a callback so that the
// driver can render it without the library depending on any terminal crate.
//
// KEY COMPONENTS:
// - Stage: the named steps of an analysis run
// - ProgressEvent: events emitted during a run
// - ProgressCallback: trait for receiving progress events
// - NullProgressCallback: no-op implementation

// ---- Standard library imports ----
use std::fmt;

// ============================================================================
// STAGES AND EVENTS
// ============================================================================

/// Steps of an analysis run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Pass 1: raw per-video metric extraction
    Extraction,
    /// Pass 2: normalisation against the global reference
    Normalization,
    /// Supervised and sample-count grid sweeps
    Sweep,
    /// Unsupervised heuristics, distribution and comparison reports
    Analysis,
    /// Candidate ranking and per-scheme exports
    Selection,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Extraction => "Extracting metrics",
            Stage::Normalization => "Normalizing",
            Stage::Sweep => "Sweeping thresholds",
            Stage::Analysis => "Analyzing distributions",
            Stage::Selection => "Selecting candidates",
        };
        f.write_str(name)
    }
}

/// Represents the progress events emitted during an analysis run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// A stage has started; `total` is the number of work items if known
    StageStarted { stage: Stage, total: Option<usize> },

    /// One video finished pass-1 extraction, successfully or not
    VideoProcessed {
        /// Video key (`<id>.mp4`)
        video_name: String,
        /// Videos finished so far, including this one
        completed: usize,
        /// Videos scheduled for extraction
        total: usize,
    },

    /// A stage has finished
    StageComplete { stage: Stage },
}

// ============================================================================
// PROGRESS CALLBACK
// ============================================================================

/// Trait for receiving progress events during an analysis run.
///
/// Extraction runs on a worker pool, so implementations are called from
/// several threads.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, event: ProgressEvent);
}

/// No-op implementation of ProgressCallback.
#[derive(Debug, Clone, Default)]
pub struct NullProgressCallback;

impl ProgressCallback for NullProgressCallback {
    fn on_progress(&self, _event: ProgressEvent) {}
}
