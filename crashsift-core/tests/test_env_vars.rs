use crashsift_core::CoreConfig;
use std::env;
use std::path::PathBuf;

const VARS: [&str; 5] = [
    "CRASHSIFT_TENSOR_DIR",
    "CRASHSIFT_JUDGEMENT_FILE",
    "CRASHSIFT_WINDOW",
    "CRASHSIFT_REFERENCE_PERCENTILE",
    "CRASHSIFT_TOP_K",
];

// Single test in this binary: the environment is process-wide.
#[test]
fn test_env_var_overrides() {
    // SAFETY: no other thread of this test binary reads the environment.
    unsafe {
        for var in VARS {
            env::remove_var(var);
        }
        env::set_var("CRASHSIFT_TENSOR_DIR", "/features");
        env::set_var("CRASHSIFT_JUDGEMENT_FILE", "");
        env::set_var("CRASHSIFT_WINDOW", "15");
        env::set_var("CRASHSIFT_REFERENCE_PERCENTILE", "99");
        env::set_var("CRASHSIFT_TOP_K", "not-a-number");
    }

    let mut config = CoreConfig::default();
    config.judgement_file = Some(PathBuf::from("labels.json"));
    config.apply_env_overrides();

    assert_eq!(config.tensor_dir, PathBuf::from("/features"));
    assert_eq!(config.judgement_file, None);
    assert_eq!(config.window_half_width, 15);
    assert_eq!(config.reference_percentile, 99.0);
    // Unparseable values keep the previous setting
    assert_eq!(config.top_k, CoreConfig::default().top_k);

    unsafe {
        for var in VARS {
            env::remove_var(var);
        }
    }
}
