//! Configuration utility functions
//!
//! Helpers for reading `CRASHSIFT_*` environment overrides. Unparseable
//! values fall back to the supplied default.

use std::path::PathBuf;

/// Get a path value from an environment variable or use the default
pub fn get_env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or(default)
}

/// Get an optional path; an empty value clears it
pub fn get_env_opt_path(key: &str, default: Option<PathBuf>) -> Option<PathBuf> {
    match std::env::var(key) {
        Ok(val) if val.is_empty() => None,
        Ok(val) => Some(PathBuf::from(val)),
        Err(_) => default,
    }
}

/// Get a usize value from an environment variable or use the default
pub fn get_env_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Get a f64 value from an environment variable or use the default
pub fn get_env_f64(key: &str, default: f64) -> f64 {
    match std::env::var(key) {
        Ok(val) => val.parse().unwrap_or(default),
        Err(_) => default,
    }
}
