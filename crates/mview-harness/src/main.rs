#![forbid(unsafe_code)]

//! Scene harness binary.
//!
//! Runs every built-in model-backed view scene and prints one line per step.
//!
//! # Running
//!
//! ```sh
//! cargo run -p mview-harness
//! MVIEW_HARNESS_FILTER="out of order" MVIEW_LOG=debug cargo run -p mview-harness
//! ```

use std::process::ExitCode;

use mview_harness::{HarnessConfig, logging, run};

fn main() -> ExitCode {
    let config = match HarnessConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("mview-harness: {err}");
            return ExitCode::from(2);
        }
    };
    logging::init(&config);

    let summary = run(&config);
    for report in &summary.reports {
        for step in &report.steps {
            let mark = if step.passed { "ok  " } else { "FAIL" };
            println!("{mark} {} :: {}", report.scene, step.name);
        }
    }
    println!(
        "{} scene(s) passed, {} failed",
        summary.passed(),
        summary.failed()
    );

    if let Err(err) = summary.write_jsonl(&config) {
        eprintln!("mview-harness: {err}");
        return ExitCode::from(2);
    }
    if summary.failed() > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
