use anyhow::Result;
use chrono::{DateTime, Local};
use log::LevelFilter;
use log4rs::{
    Handle,
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};
use std::path::Path;

const FILE_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} [{l}] {m}{n}";
const CONSOLE_PATTERN: &str = "[{l}] {m}{n}";

/// Name of the log file for a run started at `started`.
pub fn run_log_file_name(started: DateTime<Local>) -> String {
    format!("crashsift_run_{}.log", started.format("%Y%m%d_%H%M%S"))
}

/// Initializes log4rs with a stderr appender at `console_level` and, when
/// `log_file` is given, a file appender at `file_level`.
pub fn setup_logging(log_file: Option<&Path>, console_level: LevelFilter, file_level: LevelFilter) -> Result<Handle> {
    let console = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new(CONSOLE_PATTERN)))
        .build();

    let mut builder = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(console_level)))
            .build("console", Box::new(console)),
    );
    let mut root = Root::builder().appender("console");
    let mut root_level = console_level;

    if let Some(log_file) = log_file {
        // Create log directory if it doesn't exist
        if let Some(parent) = log_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file_appender = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(FILE_PATTERN)))
            .build(log_file)?;

        builder = builder.appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(file_level)))
                .build("file", Box::new(file_appender)),
        );
        root = root.appender("file");
        root_level = root_level.max(file_level);
    }

    let config = builder.build(root.build(root_level))?;
    Ok(log4rs::init_config(config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn run_log_name_uses_start_time() {
        let started = Local.with_ymd_and_hms(2025, 7, 4, 9, 5, 30).unwrap();
        assert_eq!(run_log_file_name(started), "crashsift_run_20250704_090530.log");
    }
}
