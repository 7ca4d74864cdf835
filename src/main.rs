//! Spreadsheet-driven outreach email generator.
//!
//! Reads lead rows from a worksheet, drafts a personalized email per row with
//! a language model, and writes the results back into output columns. Runs are
//! resumable: the cursor is persisted after every row.
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod error;
mod generate;
mod pipeline;
mod sheet;
mod signal;
mod state;
mod util;
mod workflow;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = cli::RootArgs::parse();
    init_logging(args.verbose);

    let run_dir = match args.run_dir {
        Some(dir) => dir,
        None => workflow::default_run_dir()?,
    };

    match args.command {
        cli::Command::Init(init) => workflow::run_init(&run_dir, &init),
        cli::Command::Preview(preview) => workflow::run_preview(&run_dir, &preview),
        cli::Command::Run(run) => workflow::run_run(&run_dir, &run),
        cli::Command::Resume(resume) => workflow::run_resume(&run_dir, &resume),
        cli::Command::Status(status) => workflow::run_status(&run_dir, &status),
        cli::Command::Reset(_) => workflow::run_reset(&run_dir),
    }
}
