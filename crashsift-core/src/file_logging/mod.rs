//! Log-file output for analysis runs.
//!
//! [`setup`] configures log4rs; [`FileLoggingHandler`] turns progress events
//! into log lines so a run log records how far extraction got.

pub mod setup;

pub use setup::{run_log_file_name, setup_logging};

use crate::progress::{ProgressCallback, ProgressEvent};
use log::{debug, info};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Logs stage transitions and extraction progress at 10% milestones, or at
/// least once a minute.
pub struct FileLoggingHandler {
    last_logged_percent: Mutex<usize>,
    last_log_time: Mutex<Option<Instant>>,
    stage_started: Mutex<Option<Instant>>,
}

impl Default for FileLoggingHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl FileLoggingHandler {
    pub fn new() -> Self {
        Self {
            last_logged_percent: Mutex::new(0),
            last_log_time: Mutex::new(None),
            stage_started: Mutex::new(None),
        }
    }

    fn reset_progress_state(&self) {
        if let Ok(mut last) = self.last_logged_percent.lock() {
            *last = 0;
        }
        if let Ok(mut time) = self.last_log_time.lock() {
            *time = None;
        }
    }

    /// True when `percent` should be logged now.
    fn should_log(&self, percent: usize, now: Instant) -> bool {
        let (Ok(mut last_logged), Ok(mut last_time)) = (self.last_logged_percent.lock(), self.last_log_time.lock())
        else {
            return false;
        };
        let due = match *last_time {
            Some(previous) => {
                percent >= *last_logged + 10 || now.duration_since(previous) >= Duration::from_secs(60)
            }
            None => true,
        } || percent == 100;
        if due && (percent > *last_logged || last_time.is_none()) {
            *last_logged = percent;
            *last_time = Some(now);
            true
        } else {
            false
        }
    }
}

impl ProgressCallback for FileLoggingHandler {
    fn on_progress(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::StageStarted { stage, total } => {
                self.reset_progress_state();
                if let Ok(mut started) = self.stage_started.lock() {
                    *started = Some(Instant::now());
                }
                match total {
                    Some(n) => info!("{} ({} videos)", stage, n),
                    None => info!("{}", stage),
                }
            }
            ProgressEvent::VideoProcessed {
                video_name,
                completed,
                total,
            } => {
                debug!("Processed {} ({}/{})", video_name, completed, total);
                let percent = if total == 0 { 100 } else { completed * 100 / total };
                if self.should_log(percent, Instant::now()) {
                    info!("Extraction progress: {}% ({}/{} videos)", percent, completed, total);
                }
            }
            ProgressEvent::StageComplete { stage } => {
                let elapsed = self
                    .stage_started
                    .lock()
                    .ok()
                    .and_then(|s| s.map(|t| t.elapsed()))
                    .unwrap_or_default();
                info!("{} complete in {:.1}s", stage, elapsed.as_secs_f64());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logs_first_update_and_each_ten_percent() {
        let handler = FileLoggingHandler::new();
        let now = Instant::now();
        assert!(handler.should_log(1, now));
        assert!(!handler.should_log(5, now));
        assert!(handler.should_log(11, now));
        assert!(!handler.should_log(20, now));
        assert!(handler.should_log(21, now));
        assert!(handler.should_log(100, now));
        assert!(!handler.should_log(100, now));
    }

    #[test]
    fn time_fallback_logs_slow_progress() {
        let handler = FileLoggingHandler::new();
        let now = Instant::now();
        assert!(handler.should_log(2, now));
        assert!(handler.should_log(3, now + Duration::from_secs(61)));
    }
}
