use indicatif::{ProgressBar, ProgressStyle};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

use cabgen_rs::config::{PipelineConfig, SampleConfig};
use cabgen_rs::pipeline::SamplePipeline;
use cabgen_rs::store::JsonDirStore;
use cabgen_rs::tools::SystemRunner;

const USAGE: &str = "usage: cabgen-rs <sample> <read1> <read2> <output_dir> [records_dir]";

fn spinner(color: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"])
            .template(&format!("{{spinner:.{color}}} {{msg}}"))
            .expect("Invalid spinner template"),
    );
    spinner
}

fn main() -> ExitCode {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if !(4..=5).contains(&args.len()) {
        eprintln!("{USAGE}");
        return ExitCode::from(2);
    }
    let sample = SampleConfig::new(
        args[0].clone(),
        PathBuf::from(&args[1]),
        PathBuf::from(&args[2]),
        PathBuf::from(&args[3]),
    );
    let records_dir = args
        .get(4)
        .map(PathBuf::from)
        .unwrap_or_else(|| sample.output_dir.join("records"));

    // 1. Configuration and result store
    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let store = match JsonDirStore::open(&records_dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Cannot open result store {}: {e}", records_dir.display());
            return ExitCode::FAILURE;
        }
    };

    // 2. One spinner for the whole sample, relabelled per stage
    let progress = spinner("green");
    progress.enable_steady_tick(std::time::Duration::from_millis(120));
    let result = SamplePipeline::new(&config, &SystemRunner, &store)
        .run_with_progress(&sample, |stage| {
            progress.set_message(format!("{}: {stage}...", sample.sample));
        });

    match result {
        Ok(result) => {
            progress.finish_with_message(format!(
                "{}: {} (coverage {:.1}x)",
                sample.sample, result.displayed_species, result.coverage
            ));
            let done = spinner("cyan");
            done.finish_with_message(format!("Record written to {}", records_dir.display()));
            ExitCode::SUCCESS
        }
        Err(e) => {
            progress.abandon_with_message(format!("{}: failed", sample.sample));
            error!("Sample {} failed: {e}", sample.sample);
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
