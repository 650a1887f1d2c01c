// crashsift-cli/src/main.rs
//
// Entry point of the crashsift driver.
//
// Responsibilities:
// - Resolving the run settings from CRASHSIFT_* environment variables.
// - Setting up console and run-log logging.
// - Running the analysis or finalising a scheme.
// - Mapping failures to a non-zero exit code.

use crashsift::logging::init_run_logging;
use crashsift::progress::TerminalProgress;
use crashsift::{DriverSettings, execute};
use crashsift_core::CoreError;
use std::process;

fn main() {
    let settings = match DriverSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    };

    if let Some(log_file) = init_run_logging(&settings.log_dir(), settings.verbose) {
        log::info!("Logging to {}", log_file.display());
    }

    let progress = TerminalProgress::new();
    match execute(&settings, &progress) {
        Ok(()) => {}
        Err(CoreError::NoVideos) => {
            log::error!("No videos could be analysed; check the annotation file and tensor directory");
            process::exit(3);
        }
        Err(e) => {
            log::error!("{e}");
            process::exit(1);
        }
    }
}
