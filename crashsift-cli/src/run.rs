// ============================================================================
// crashsift-cli/src/run.rs
// ============================================================================
//
// RUN MODES: Analysis and Finalisation
//
// `execute` dispatches on the RunMode resolved from the environment and
// prints a short summary of what was written.

// ---- Internal crate imports ----
use crate::config::{DriverSettings, RunMode, load_decision_input};

// ---- External crate imports ----
use console::style;
use crashsift_core::{CoreResult, ProgressCallback, finalize_scheme, run_analysis};
use log::info;

/// Runs the configured mode to completion.
pub fn execute(settings: &DriverSettings, progress: &dyn ProgressCallback) -> CoreResult<()> {
    match &settings.mode {
        RunMode::Analyze => {
            let outcome = run_analysis(&settings.config, progress)?;
            println!("{}", outcome.summary);

            if !outcome.recommendations.closest_to_target.is_empty() {
                println!("{}", style("RECOMMENDED SCHEMES").bold().cyan());
                for rec in &outcome.recommendations.closest_to_target {
                    println!(
                        "  #{:<3} C>={} D>={:.2}  {} videos",
                        rec.scheme_id, rec.complexity_threshold, rec.dynamic_threshold, rec.video_count
                    );
                }
                println!(
                    "\nSet CRASHSIFT_FINAL_SCHEME=<id> to export the final list for a scheme."
                );
            }
        }
        RunMode::Finalize {
            scheme_id,
            decision_file,
        } => {
            let input = load_decision_input(decision_file.as_deref())?;
            let outcome = finalize_scheme(&settings.config, *scheme_id, input)?;
            let stats = &outcome.scheme.statistics;
            println!("\n{}", style("FINAL SELECTION").bold().cyan());
            println!(
                "  Scheme #{}: Complexity >= {}, Dynamic >= {:.2}",
                stats.scheme_id, stats.complexity_threshold, stats.dynamic_threshold
            );
            println!(
                "  {} of {} videos ({:.1}%)",
                stats.filtered_count, stats.total_videos, stats.retention_rate
            );
            for path in &outcome.files_written {
                println!("  - {}", path.display());
                info!("Wrote {}", path.display());
            }
        }
    }
    Ok(())
}
