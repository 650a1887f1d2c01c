// crashsift-cli/src/lib.rs
//
// Library portion of the crashsift driver: environment-driven settings,
// logging setup, terminal progress and the two run modes.

pub mod config;
pub mod logging;
pub mod progress;
pub mod run;

// Re-export items needed by the binary or integration tests
pub use config::{DriverSettings, RunMode, load_decision_input};
pub use run::execute;
