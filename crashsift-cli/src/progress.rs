// ============================================================================
// crashsift-cli/src/progress.rs
// ============================================================================
//
// PROGRESS REPORTING: Terminal Progress for Analysis Runs
//
// Renders core progress events: stage headings on stdout and an indicatif
// bar while pass 1 extracts metrics. Every event is also forwarded to the
// core's FileLoggingHandler so the run log records the same milestones.

// ---- External crate imports ----
use console::style;
use crashsift_core::file_logging::FileLoggingHandler;
use crashsift_core::{ProgressCallback, ProgressEvent, Stage};
use indicatif::{ProgressBar, ProgressStyle};

// ---- Standard library imports ----
use std::sync::Mutex;
use std::time::Duration;

/// Terminal reporter for one run.
pub struct TerminalProgress {
    progress: Mutex<Option<ProgressBar>>,
    log: FileLoggingHandler,
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalProgress {
    pub fn new() -> Self {
        Self {
            progress: Mutex::new(None),
            log: FileLoggingHandler::new(),
        }
    }

    fn start_bar(&self, total: usize) {
        self.finish_progress();
        let pb = ProgressBar::new(total as u64);
        if let Ok(bar_style) =
            ProgressStyle::default_bar().template("Extracting [{bar:40}] {pos}/{len} videos | {msg}")
        {
            pb.set_style(bar_style.progress_chars("=> "));
        }
        pb.enable_steady_tick(Duration::from_millis(120));
        if let Ok(mut guard) = self.progress.lock() {
            *guard = Some(pb);
        }
    }

    fn finish_progress(&self) {
        if let Ok(mut guard) = self.progress.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::StageStarted { stage, total } => {
                println!("\n{}", style(stage.to_string().to_uppercase()).bold().cyan());
                if let (Stage::Extraction, Some(total)) = (stage, total) {
                    self.start_bar(*total);
                }
            }
            ProgressEvent::VideoProcessed {
                video_name,
                completed,
                ..
            } => {
                if let Ok(guard) = self.progress.lock() {
                    if let Some(pb) = guard.as_ref() {
                        pb.set_position(*completed as u64);
                        pb.set_message(video_name.clone());
                    }
                }
            }
            ProgressEvent::StageComplete { stage } => {
                if *stage == Stage::Extraction {
                    self.finish_progress();
                }
                println!("  {}{} done", style("› ").magenta(), stage);
            }
        }
        self.log.on_progress(event);
    }
}
