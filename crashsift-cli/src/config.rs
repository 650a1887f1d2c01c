// ============================================================================
// crashsift-cli/src/config.rs
// ============================================================================
//
// DRIVER SETTINGS: Environment-Driven Run Configuration
//
// The driver takes no command-line arguments. A run is described by an
// optional JSON configuration file plus CRASHSIFT_* environment variables:
//
// - CRASHSIFT_CONFIG: path of the JSON CoreConfig (defaults apply otherwise)
// - CRASHSIFT_FINAL_SCHEME: finalise this 1-based scheme instead of analysing
// - CRASHSIFT_DECISION_FILE: JSON DecisionInput with rationale/alternatives
// - CRASHSIFT_VERBOSE: any non-empty value other than "0" enables debug logs
//
// Field-level overrides (CRASHSIFT_TENSOR_DIR, ...) are applied by
// CoreConfig::apply_env_overrides.

// ---- Internal crate imports ----
use crashsift_core::{CoreConfig, CoreError, CoreResult, DecisionInput};

// ---- Standard library imports ----
use std::path::{Path, PathBuf};

/// What the driver should do.
#[derive(Debug, Clone, PartialEq)]
pub enum RunMode {
    Analyze,
    Finalize { scheme_id: usize, decision_file: Option<PathBuf> },
}

#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub config: CoreConfig,
    pub mode: RunMode,
    pub verbose: bool,
}

impl DriverSettings {
    /// Reads the settings from the process environment.
    pub fn from_env() -> CoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the settings through `lookup`, which maps variable names to
    /// values.
    pub fn from_lookup<F>(lookup: F) -> CoreResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup("CRASHSIFT_CONFIG").filter(|v| !v.is_empty()) {
            Some(path) => CoreConfig::from_json_file(Path::new(&path))?,
            None => CoreConfig::default(),
        };
        config.apply_env_overrides();

        let mode = match lookup("CRASHSIFT_FINAL_SCHEME").filter(|v| !v.is_empty()) {
            Some(raw) => {
                let scheme_id = raw.trim().parse::<usize>().map_err(|_| {
                    CoreError::InvalidConfig(format!("CRASHSIFT_FINAL_SCHEME must be a scheme number, got {raw:?}"))
                })?;
                RunMode::Finalize {
                    scheme_id,
                    decision_file: lookup("CRASHSIFT_DECISION_FILE")
                        .filter(|v| !v.is_empty())
                        .map(PathBuf::from),
                }
            }
            None => RunMode::Analyze,
        };

        let verbose = lookup("CRASHSIFT_VERBOSE").is_some_and(|v| !v.is_empty() && v != "0");

        Ok(Self { config, mode, verbose })
    }

    /// Directory for run logs: the configured one, else `<output>/logs`.
    pub fn log_dir(&self) -> PathBuf {
        self.config
            .log_dir
            .clone()
            .unwrap_or_else(|| self.config.output_dir.join("logs"))
    }
}

/// Loads the caller's rationale for a final decision. No file means an empty
/// input, which the core fills from the scheme statistics.
pub fn load_decision_input(path: Option<&Path>) -> CoreResult<DecisionInput> {
    let Some(path) = path else {
        return Ok(DecisionInput::default());
    };
    if !path.is_file() {
        return Err(CoreError::not_found("decision file", path));
    }
    Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
}
