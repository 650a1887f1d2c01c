// ============================================================================
// crashsift-cli/src/logging.rs
// ============================================================================
//
// LOGGING: Console and Run-Log Initialisation
//
// Every run writes a timestamped log file (crashsift_run_YYYYMMDD_HHMMSS.log)
// into the log directory at debug level, while the console shows info (or
// debug with CRASHSIFT_VERBOSE).

// ---- External crate imports ----
use chrono::Local;
use crashsift_core::file_logging::{run_log_file_name, setup_logging};
use log::LevelFilter;

// ---- Standard library imports ----
use std::path::{Path, PathBuf};

/// Initialises logging for one run and returns the log file path.
///
/// When the log file cannot be created the run continues with console
/// logging only and `None` is returned.
pub fn init_run_logging(log_dir: &Path, verbose: bool) -> Option<PathBuf> {
    let console_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let log_file = log_dir.join(run_log_file_name(Local::now()));

    match setup_logging(Some(&log_file), console_level, LevelFilter::Debug) {
        Ok(_) => Some(log_file),
        Err(file_err) => {
            // The logger is not installed yet, so this goes straight to stderr.
            eprintln!("Warning: cannot write log file {}: {file_err}", log_file.display());
            if let Err(e) = setup_logging(None, console_level, LevelFilter::Off) {
                eprintln!("Warning: logging disabled: {e}");
            }
            None
        }
    }
}
